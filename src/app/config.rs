use crate::domain::post::TagMatch;
use crate::infra::api::notion::DEFAULT_NOTION_API_BASE_URL;
use crate::infra::loader::load_yaml_from_file;
use crate::types::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};

pub const ENV_NOTION_TOKEN: &str = "NOTION_TOKEN";
pub const ENV_NOTION_DATABASE_ID: &str = "NOTION_DATABASE_ID";
pub const ENV_NOTION_API_BASE_URL: &str = "NOTION_API_BASE_URL";
pub const ENV_BLOG_SETTINGS_PATH: &str = "BLOG_SETTINGS_PATH";

/// Notionへの接続設定
#[derive(Clone)]
pub struct NotionConfig {
    pub token: String,
    pub database_id: String,
    pub base_url: String,
}

// トークンをログに出さない
impl std::fmt::Debug for NotionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotionConfig")
            .field("token", &"***")
            .field("database_id", &self.database_id)
            .field("base_url", &self.base_url)
            .finish()
    }
}

/// サイト設定（YAMLファイル、全項目省略可）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteSettings {
    /// 一覧1ページあたりの記事数
    pub posts_per_page: usize,
    /// トップページに表示する記事数
    pub front_page_posts: usize,
    /// タグの比較方法
    pub tag_match: TagMatch,
    /// 一覧ページの再生成間隔（秒）
    pub revalidate_secs: u64,
    /// Notion APIへの1リクエストあたりのタイムアウト（秒）
    pub request_timeout_secs: u64,
}

impl Default for SiteSettings {
    fn default() -> Self {
        Self {
            posts_per_page: 4,
            front_page_posts: 4,
            tag_match: TagMatch::Exact,
            revalidate_secs: 60 * 60 * 6,
            request_timeout_secs: 30,
        }
    }
}

impl SiteSettings {
    /// YAMLファイルから読み込む。パスが無ければデフォルト値
    pub fn load(path: Option<&str>) -> ConfigResult<Self> {
        let settings: Self = match path {
            Some(path) => load_yaml_from_file(path)?,
            None => Self::default(),
        };
        settings.validate()
    }

    fn validate(self) -> ConfigResult<Self> {
        if self.posts_per_page == 0 {
            return Err(ConfigError::invalid_setting(
                "posts_per_page",
                "1以上を指定してください",
            ));
        }
        if self.front_page_posts == 0 {
            return Err(ConfigError::invalid_setting(
                "front_page_posts",
                "1以上を指定してください",
            ));
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::invalid_setting(
                "request_timeout_secs",
                "1以上を指定してください",
            ));
        }
        Ok(self)
    }
}

/// アプリケーション全体の設定
#[derive(Debug, Clone)]
pub struct BlogConfig {
    pub notion: NotionConfig,
    pub site: SiteSettings,
}

impl BlogConfig {
    /// 環境変数から設定を読み込む
    /// .envファイルの読み込みは呼び出し側（main）で行う
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// 任意の参照関数から設定を組み立てる
    ///
    /// 必須の値が未設定または空白のみの場合は`MissingEnvironmentVariable`で即座に失敗する。
    pub fn from_lookup<F>(lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let optional = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        let required = |name: &str| optional(name).ok_or_else(|| ConfigError::missing_env_var(name));

        let notion = NotionConfig {
            token: required(ENV_NOTION_TOKEN)?,
            database_id: required(ENV_NOTION_DATABASE_ID)?,
            base_url: optional(ENV_NOTION_API_BASE_URL)
                .unwrap_or_else(|| DEFAULT_NOTION_API_BASE_URL.to_string()),
        };
        let site = SiteSettings::load(optional(ENV_BLOG_SETTINGS_PATH).as_deref())?;

        Ok(Self { notion, site })
    }
}

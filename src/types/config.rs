use thiserror::Error;

/// 起動時の設定エラー
///
/// Notionの接続情報（環境変数）とサイト設定YAMLのどちらかが使えない場合に返す。
/// どれも起動直後に発生し、リトライはしない。
#[derive(Error, Debug)]
pub enum ConfigError {
    /// 必須の環境変数が未設定、または空白のみ
    #[error("Notionの接続設定が不足しています: 環境変数{name}が未設定です")]
    MissingEnvironmentVariable { name: String },

    /// 設定項目の値が使えない（0件指定、ヘッダーに使えない文字など）
    #[error("設定{key}の値が不正です: {reason}")]
    InvalidSetting { key: String, reason: String },

    #[error("サイト設定ファイルを開けません: {path}")]
    UnreadableSettingsFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("サイト設定ファイルのYAMLが不正です: {path}")]
    MalformedSettingsFile {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
}

impl ConfigError {
    pub fn missing_env_var<N: Into<String>>(name: N) -> Self {
        Self::MissingEnvironmentVariable { name: name.into() }
    }

    pub fn invalid_setting<K: Into<String>, R: Into<String>>(key: K, reason: R) -> Self {
        Self::InvalidSetting {
            key: key.into(),
            reason: reason.into(),
        }
    }

    pub fn unreadable_settings_file<P: Into<String>>(path: P, source: std::io::Error) -> Self {
        Self::UnreadableSettingsFile {
            path: path.into(),
            source,
        }
    }

    pub fn malformed_settings_file<P: Into<String>>(path: P, source: serde_yaml::Error) -> Self {
        Self::MalformedSettingsFile {
            path: path.into(),
            source,
        }
    }

    /// 問題のある設定項目名（環境変数名・YAMLのキー・ファイルパス）
    pub fn setting_name(&self) -> &str {
        match self {
            Self::MissingEnvironmentVariable { name } => name,
            Self::InvalidSetting { key, .. } => key,
            Self::UnreadableSettingsFile { path, .. } | Self::MalformedSettingsFile { path, .. } => {
                path
            }
        }
    }
}

/// 設定エラーのResult型エイリアス
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

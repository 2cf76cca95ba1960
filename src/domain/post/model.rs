use crate::infra::api::notion::NotionPage;
use crate::infra::parser::parse_date;
use crate::types::{BlogError, BlogResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Notionデータベースのプロパティ名
pub mod property {
    pub const NAME: &str = "Name";
    pub const DESCRIPTION: &str = "Description";
    pub const DATE: &str = "Date";
    pub const SLUG: &str = "Slug";
    pub const TAGS: &str = "Tags";
    pub const PUBLISHED: &str = "Published";
}

// 記事のメタデータ（Notionのページを正規化したもの）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: String,
    pub title: String,
    pub description: String,
    /// Notionの`date.start`そのまま（ISO-8601）
    pub date: String,
    pub slug: String,
    pub tags: Vec<String>,
}

// 記事詳細（メタデータ + 本文markdown）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostDetail {
    pub metadata: Post,
    pub markdown: String,
}

/// タグの比較方法
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TagMatch {
    /// 大文字小文字を区別した完全一致
    #[default]
    Exact,
    /// 大文字小文字を無視した一致
    CaseInsensitive,
}

impl TagMatch {
    pub fn matches(&self, candidate: &str, wanted: &str) -> bool {
        match self {
            Self::Exact => candidate == wanted,
            Self::CaseInsensitive => candidate.to_lowercase() == wanted.to_lowercase(),
        }
    }
}

impl Post {
    /// 記事が指定タグを持つか
    pub fn has_tag(&self, tag: &str, rule: TagMatch) -> bool {
        self.tags.iter().any(|t| rule.matches(t, tag))
    }

    /// Notionのページを記事に変換する
    ///
    /// 必要なプロパティが欠けている場合は推測で埋めず、`MalformedRecord`を返す。
    pub fn from_notion_page(page: &NotionPage) -> BlogResult<Self> {
        let record = RecordReader { page };

        let date = record.date_start(property::DATE)?;
        parse_date(&date)
            .map_err(|e| BlogError::malformed(&page.id, property::DATE, e.to_string()))?;

        Ok(Self {
            id: page.id.clone(),
            title: record.first_text(property::NAME, "title")?,
            description: record.first_text(property::DESCRIPTION, "rich_text")?,
            date,
            slug: record.first_text(property::SLUG, "rich_text")?,
            tags: record.multi_select_names(property::TAGS)?,
        })
    }
}

// プロパティを取り出しつつ、欠損時にレコードIDとフィールド名付きのエラーを作る
struct RecordReader<'a> {
    page: &'a NotionPage,
}

impl<'a> RecordReader<'a> {
    fn property(&self, name: &str) -> BlogResult<&'a Value> {
        self.page
            .properties
            .get(name)
            .ok_or_else(|| self.malformed(name, "プロパティが存在しません"))
    }

    fn first_text(&self, name: &str, kind: &str) -> BlogResult<String> {
        let runs = self
            .property(name)?
            .get(kind)
            .and_then(Value::as_array)
            .ok_or_else(|| self.malformed(name, format!("{}が存在しません", kind)))?;

        runs.first()
            .and_then(|run| run.get("plain_text"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| self.malformed(name, format!("{}が空です", kind)))
    }

    fn date_start(&self, name: &str) -> BlogResult<String> {
        self.property(name)?
            .get("date")
            .and_then(|d| d.get("start"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| self.malformed(name, "date.startが存在しません"))
    }

    fn multi_select_names(&self, name: &str) -> BlogResult<Vec<String>> {
        let options = self
            .property(name)?
            .get("multi_select")
            .and_then(Value::as_array)
            .ok_or_else(|| self.malformed(name, "multi_selectが存在しません"))?;

        options
            .iter()
            .map(|option| {
                option
                    .get("name")
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .ok_or_else(|| self.malformed(name, "選択肢にnameがありません"))
            })
            .collect()
    }

    fn malformed<R: Into<String>>(&self, field: &str, reason: R) -> BlogError {
        BlogError::malformed(&self.page.id, field, reason)
    }
}

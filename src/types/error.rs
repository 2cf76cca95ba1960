use crate::types::ConfigError;
use thiserror::Error;

/// ブログデータ取得層のエラー型
/// Notionとの通信、レコードの正規化、スラッグ検索など、呼び出し元に伝播させるエラーを定義
#[derive(Error, Debug)]
pub enum BlogError {
    /// 設定エラー（トークンやデータベースIDの不足など）
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Notion APIへの通信自体が失敗した
    #[error("Notion APIへの通信に失敗: {operation} - {source}")]
    ExternalSourceUnavailable {
        operation: String,
        #[source]
        source: reqwest::Error,
    },

    /// Notion APIがエラーステータスを返した
    #[error("Notion APIがエラーを返しました: {operation} (status {status}) - {message}")]
    ExternalSourceRejected {
        operation: String,
        status: u16,
        message: String,
    },

    /// レスポンスボディを解釈できない
    #[error("Notionレスポンスの解析に失敗: {context} - {source}")]
    InvalidResponse {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// 取得したレコードに必要なプロパティが無い、または形式が不正
    #[error("レコードの形式が不正です: {record_id} の {field} - {reason}")]
    MalformedRecord {
        record_id: String,
        field: String,
        reason: String,
    },

    /// スラッグに一致する記事が存在しない
    #[error("記事が見つかりません: {slug}")]
    NotFound { slug: String },
}

impl BlogError {
    /// 通信失敗エラーを作成
    pub fn unavailable<O: Into<String>>(operation: O, source: reqwest::Error) -> Self {
        Self::ExternalSourceUnavailable {
            operation: operation.into(),
            source,
        }
    }

    /// エラーステータス応答のエラーを作成
    pub fn rejected<O: Into<String>, M: Into<String>>(operation: O, status: u16, message: M) -> Self {
        Self::ExternalSourceRejected {
            operation: operation.into(),
            status,
            message: message.into(),
        }
    }

    /// レスポンス解析エラーを作成
    pub fn invalid_response<C: Into<String>>(context: C, source: serde_json::Error) -> Self {
        Self::InvalidResponse {
            context: context.into(),
            source,
        }
    }

    /// 不正レコードエラーを作成
    pub fn malformed<I, F, R>(record_id: I, field: F, reason: R) -> Self
    where
        I: Into<String>,
        F: Into<String>,
        R: Into<String>,
    {
        Self::MalformedRecord {
            record_id: record_id.into(),
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// 記事未検出エラーを作成
    pub fn not_found<S: Into<String>>(slug: S) -> Self {
        Self::NotFound { slug: slug.into() }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// ブログデータ取得層のResult型エイリアス
pub type BlogResult<T> = std::result::Result<T, BlogError>;

use super::model::{property, Post, PostDetail};
use crate::infra::api::notion::{
    DatabaseQuery, NotionClient, PropertyFilter, PropertySort, MAX_PAGE_SIZE,
};
use crate::infra::markdown::page_to_markdown;
use crate::types::{BlogError, BlogResult};
use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

/// 公開済み記事の一覧を提供するトレイト
///
/// 毎回Notionから取得する実装と、1回のビルド中だけ結果を使い回す実装を
/// 統一的に扱うためのインターフェースです。
#[async_trait]
pub trait PostSource: Send + Sync {
    /// 公開済みの記事を日付の降順で返す
    async fn published_posts(&self) -> BlogResult<Vec<Post>>;
}

/// Notionデータベースから記事を取得するフェッチャー
///
/// クライアントとデータベースIDは生成時に受け取り、グローバルな状態は持たない。
pub struct PostFetcher<C: NotionClient> {
    client: C,
    database_id: String,
}

impl<C: NotionClient> PostFetcher<C> {
    pub fn new<D: Into<String>>(client: C, database_id: D) -> Self {
        Self {
            client,
            database_id: database_id.into(),
        }
    }

    /// 公開済みの記事を最大100件、日付の降順で取得する
    ///
    /// 1件でも必要なプロパティが欠けていればエラーを返す。
    /// 100件を超える分は取得しない（警告ログのみ）。
    pub async fn fetch_all_published_posts(&self) -> BlogResult<Vec<Post>> {
        let query = DatabaseQuery {
            page_size: Some(MAX_PAGE_SIZE),
            filter: Some(PropertyFilter::checkbox(property::PUBLISHED, true)),
            sorts: vec![PropertySort::descending(property::DATE)],
        };

        let response = self
            .client
            .query_database(&self.database_id, &query)
            .await?;

        if response.has_more {
            warn!(
                limit = MAX_PAGE_SIZE,
                "公開記事が上限件数を超えています。超過分は取得されません"
            );
        }

        let posts = response
            .results
            .iter()
            .map(Post::from_notion_page)
            .collect::<BlogResult<Vec<_>>>()?;

        debug!(count = posts.len(), "公開記事を取得");
        Ok(posts)
    }

    /// スラッグに一致する記事のメタデータと本文markdownを取得する
    ///
    /// 一致する記事が無い場合は`NotFound`を返す。
    pub async fn fetch_post_by_slug(&self, slug: &str) -> BlogResult<PostDetail> {
        let query = DatabaseQuery {
            page_size: None,
            filter: Some(PropertyFilter::rich_text(property::SLUG, slug)),
            sorts: Vec::new(),
        };

        let response = self
            .client
            .query_database(&self.database_id, &query)
            .await?;

        let page = response
            .results
            .first()
            .ok_or_else(|| BlogError::not_found(slug))?;

        let metadata = Post::from_notion_page(page)?;
        let markdown = page_to_markdown(&self.client, &page.id).await?;

        info!(slug = slug, "記事本文を取得");
        Ok(PostDetail { metadata, markdown })
    }
}

#[async_trait]
impl<C: NotionClient> PostSource for PostFetcher<C> {
    async fn published_posts(&self) -> BlogResult<Vec<Post>> {
        self.fetch_all_published_posts().await
    }
}

/// 1回のビルド中だけ記事一覧を使い回すラッパー
///
/// 最初の呼び出しで取得した結果を保持し、以降は通信せずに返す。
/// 値を破棄すればキャッシュも消えるため、ビルドごとに新しく作ること。
/// 取得に失敗した場合はキャッシュせず、次の呼び出しで再取得する。
pub struct SnapshotSource<S: PostSource> {
    inner: S,
    posts: OnceCell<Vec<Post>>,
}

impl<S: PostSource> SnapshotSource<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            posts: OnceCell::new(),
        }
    }
}

#[async_trait]
impl<S: PostSource> PostSource for SnapshotSource<S> {
    async fn published_posts(&self) -> BlogResult<Vec<Post>> {
        let posts = self
            .posts
            .get_or_try_init(|| self.inner.published_posts())
            .await?;
        Ok(posts.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::post::model::fixtures::notion_page;
    use crate::infra::api::notion::MockNotionClient;
    use serde_json::json;
    use std::sync::Arc;

    fn sample_client() -> MockNotionClient {
        MockNotionClient::new_success(vec![
            notion_page("p1", "古い記事", "old", "2024-01-10", &["Rust"], true),
            notion_page("p2", "下書き", "draft", "2024-05-01", &["Rust"], false),
            notion_page("p3", "新しい記事", "new", "2024-04-01", &["Notion"], true),
        ])
    }

    #[tokio::test]
    async fn test_fetch_all_published_posts() {
        let fetcher = PostFetcher::new(sample_client(), "db");

        let posts = fetcher.fetch_all_published_posts().await.unwrap();
        let slugs: Vec<&str> = posts.iter().map(|p| p.slug.as_str()).collect();

        assert_eq!(slugs, vec!["new", "old"], "公開済みのみ・日付降順であるべき");
    }

    #[tokio::test]
    async fn test_malformed_record_fails_whole_fetch() {
        let mut broken = notion_page("p9", "壊れた記事", "broken", "2024-02-01", &[], true);
        broken.properties.remove("Description");
        let client = MockNotionClient::new_success(vec![
            notion_page("p1", "正常", "ok", "2024-01-10", &[], true),
            broken,
        ]);
        let fetcher = PostFetcher::new(client, "db");

        let err = fetcher.fetch_all_published_posts().await.unwrap_err();
        assert!(
            matches!(err, BlogError::MalformedRecord { ref record_id, .. } if record_id == "p9")
        );
    }

    #[tokio::test]
    async fn test_fetch_error_propagates() {
        let fetcher = PostFetcher::new(MockNotionClient::new_error("接続失敗"), "db");

        let err = fetcher.fetch_all_published_posts().await.unwrap_err();
        assert!(matches!(err, BlogError::ExternalSourceRejected { .. }));
    }

    #[tokio::test]
    async fn test_fetch_post_by_slug() {
        let client = sample_client().with_blocks(
            "p3",
            vec![serde_json::from_value(json!({
                "id": "b1",
                "type": "paragraph",
                "has_children": false,
                "paragraph": { "rich_text": [{ "type": "text", "plain_text": "本文です" }] }
            }))
            .unwrap()],
        );
        let fetcher = PostFetcher::new(client, "db");

        let detail = fetcher.fetch_post_by_slug("new").await.unwrap();

        assert_eq!(detail.metadata.id, "p3");
        assert_eq!(detail.metadata.title, "新しい記事");
        assert_eq!(detail.markdown, "本文です");
    }

    #[tokio::test]
    async fn test_fetch_post_by_unknown_slug_is_not_found() {
        let fetcher = PostFetcher::new(sample_client(), "db");

        let err = fetcher.fetch_post_by_slug("missing").await.unwrap_err();

        assert!(err.is_not_found(), "NotFoundになるべき: {:?}", err);
        assert!(err.to_string().contains("missing"));
    }

    #[tokio::test]
    async fn test_snapshot_source_fetches_once() {
        let client = Arc::new(sample_client());
        let snapshot = SnapshotSource::new(PostFetcher::new(Arc::clone(&client), "db"));

        let first = snapshot.published_posts().await.unwrap();
        let second = snapshot.published_posts().await.unwrap();

        assert_eq!(first, second);
        assert_eq!(client.query_calls(), 1, "2回目以降は通信しないはず");
    }

    #[tokio::test]
    async fn test_fetcher_without_snapshot_refetches() {
        let client = Arc::new(sample_client());
        let fetcher = PostFetcher::new(Arc::clone(&client), "db");

        fetcher.published_posts().await.unwrap();
        fetcher.published_posts().await.unwrap();

        assert_eq!(client.query_calls(), 2);
    }
}

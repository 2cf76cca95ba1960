use crate::{
    app::config::SiteSettings,
    domain::{
        link::{build_page_link, build_post_link, pagination_links, route_tag_to_source_tag, PageLink},
        post::{Post, PostService},
    },
    types::BlogError,
};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tokio::task::JoinSet;
use tracing::info;

/// ビルド時に生成されなかったパスへのアクセス時の挙動
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Fallback {
    /// リクエスト時に生成が終わるまで待ってから返す
    Blocking,
}

/// タグ一覧ページの動的ルートパラメータ
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagPageParams {
    pub tag: String,
    pub page: usize,
}

impl TagPageParams {
    pub fn path(&self) -> String {
        build_page_link(Some(&self.tag), self.page)
    }
}

/// タグ一覧ページに渡すデータ
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagPageProps {
    pub posts: Vec<Post>,
    pub number_of_pages: usize,
    /// URLに含まれていたタグ（ページネーションのリンク生成に使う）
    pub current_tag: String,
    pub all_tags: Vec<String>,
    pub pagination: Vec<PageLink>,
    pub revalidate_secs: u64,
}

/// サイト全体のビルド計画
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SitePlan {
    /// トップページに載せる記事のスラッグ
    pub front_page: Vec<String>,
    pub listing_pages: Vec<String>,
    pub tag_pages: Vec<String>,
    pub posts: Vec<String>,
    pub fallback: Fallback,
}

/// 全タグについて1..=ページ数のパラメータを列挙する
///
/// タグごとのページ数はタグ単位のタスクで並行に計算し、全て揃ってから返す。
/// 返す順序は(tag, page)の昇順。
pub async fn tag_page_params(service: &PostService, page_size: usize) -> Result<Vec<TagPageParams>> {
    let tags = service
        .all_distinct_tags()
        .await
        .context("タグ一覧の取得に失敗")?;

    let mut join_set = JoinSet::new();
    for tag in tags {
        let service = service.clone();
        join_set.spawn(async move {
            let count = service.page_count_for_tag(&tag, page_size).await?;
            Ok::<_, BlogError>((tag, count))
        });
    }

    let mut params = Vec::new();
    while let Some(joined) = join_set.join_next().await {
        let (tag, count) = joined.context("タグのページ数計算タスクが異常終了しました")??;
        params.extend((1..=count).map(|page| TagPageParams {
            tag: tag.clone(),
            page,
        }));
    }

    params.sort_by(|a, b| a.tag.cmp(&b.tag).then(a.page.cmp(&b.page)));
    Ok(params)
}

/// 全記事一覧の1..=ページ数のパスを列挙する
pub async fn listing_page_paths(service: &PostService, page_size: usize) -> Result<Vec<String>> {
    let count = service
        .page_count(page_size)
        .await
        .context("ページ数の計算に失敗")?;
    Ok((1..=count).map(|page| build_page_link(None, page)).collect())
}

/// タグ一覧ページのデータを組み立てる
///
/// `tag_segment`はルーターがデコード済みのタグ（`C/C++`など）を受け取る。
/// 先頭を大文字にしてNotion上のタグ名に合わせ、ページネーションのリンクでは再びエンコードする。
pub async fn tag_page_props(
    service: &PostService,
    settings: &SiteSettings,
    tag_segment: &str,
    page: usize,
) -> Result<TagPageProps> {
    let source_tag = route_tag_to_source_tag(tag_segment);
    let page_size = settings.posts_per_page;

    let posts = service
        .posts_for_tag_and_page(&source_tag, page, page_size)
        .await
        .with_context(|| format!("タグ{}の記事取得に失敗", source_tag))?;
    let number_of_pages = service
        .page_count_for_tag(&source_tag, page_size)
        .await
        .with_context(|| format!("タグ{}のページ数計算に失敗", source_tag))?;
    let all_tags = service
        .all_distinct_tags()
        .await
        .context("タグ一覧の取得に失敗")?;

    Ok(TagPageProps {
        posts,
        number_of_pages,
        current_tag: tag_segment.to_string(),
        all_tags,
        pagination: pagination_links(Some(tag_segment), number_of_pages),
        revalidate_secs: settings.revalidate_secs,
    })
}

/// サイト全体のビルド計画を作る
///
/// 1. トップページの記事
/// 2. 全記事一覧のページ
/// 3. タグ別一覧のページ（タグ単位で並行計算）
/// 4. 記事詳細ページ
pub async fn plan_site(service: &PostService, settings: &SiteSettings) -> Result<SitePlan> {
    info!("=== ビルド計画の作成開始 ===");
    let page_size = settings.posts_per_page;

    let front_page = service
        .posts_for_front_page(settings.front_page_posts)
        .await
        .context("トップページ記事の取得に失敗")?
        .into_iter()
        .map(|post| post.slug)
        .collect();

    let listing_pages = listing_page_paths(service, page_size).await?;
    info!(count = listing_pages.len(), "一覧ページを列挙");

    let tag_pages: Vec<String> = tag_page_params(service, page_size)
        .await?
        .iter()
        .map(TagPageParams::path)
        .collect();
    info!(count = tag_pages.len(), "タグ別一覧ページを列挙");

    // 全件は1ページ目に全記事が入るサイズで取得する
    let posts = service
        .posts_for_front_page(usize::MAX)
        .await
        .context("記事一覧の取得に失敗")?
        .iter()
        .map(|post| build_post_link(&post.slug))
        .collect();

    info!("=== ビルド計画の作成完了 ===");
    Ok(SitePlan {
        front_page,
        listing_pages,
        tag_pages,
        posts,
        fallback: Fallback::Blocking,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::post::model::fixtures::notion_page;
    use crate::domain::post::{PostFetcher, SnapshotSource, TagMatch};
    use crate::infra::api::notion::MockNotionClient;
    use std::sync::Arc;

    // タグA: 5件、タグB: 1件
    fn sample_client() -> MockNotionClient {
        let mut pages = Vec::new();
        for i in 0..5 {
            let tags: &[&str] = if i == 0 { &["A", "B"] } else { &["A"] };
            pages.push(notion_page(
                &format!("p{}", i),
                &format!("記事{}", i),
                &format!("post-{}", i),
                &format!("2024-02-{:02}", 10 + i),
                tags,
                true,
            ));
        }
        MockNotionClient::new_success(pages)
    }

    fn snapshot_service(client: Arc<MockNotionClient>, tag_match: TagMatch) -> PostService {
        let source = SnapshotSource::new(PostFetcher::new(client, "db"));
        PostService::new(Arc::new(source), tag_match)
    }

    #[tokio::test]
    async fn test_tag_page_params() {
        let service = snapshot_service(Arc::new(sample_client()), TagMatch::Exact);

        let params = tag_page_params(&service, 4).await.unwrap();
        let paths: Vec<String> = params.iter().map(TagPageParams::path).collect();

        assert_eq!(
            paths,
            vec![
                "/posts/tag/A/page/1",
                "/posts/tag/A/page/2",
                "/posts/tag/B/page/1"
            ]
        );
    }

    #[tokio::test]
    async fn test_tag_page_params_propagates_errors() {
        let client = Arc::new(MockNotionClient::new_error("接続失敗"));
        let service = snapshot_service(client, TagMatch::Exact);

        assert!(tag_page_params(&service, 4).await.is_err());
    }

    #[tokio::test]
    async fn test_listing_page_paths() {
        let service = snapshot_service(Arc::new(sample_client()), TagMatch::Exact);

        let paths = listing_page_paths(&service, 2).await.unwrap();
        assert_eq!(
            paths,
            vec!["/posts/page/1", "/posts/page/2", "/posts/page/3"]
        );
    }

    #[tokio::test]
    async fn test_tag_page_props_capitalizes_segment() {
        let client = Arc::new(MockNotionClient::new_success(vec![
            notion_page("p1", "記事1", "one", "2024-02-02", &["Rust"], true),
            notion_page("p2", "記事2", "two", "2024-02-01", &["Rust", "Go"], true),
        ]));
        let service = snapshot_service(client, TagMatch::Exact);
        let settings = SiteSettings {
            posts_per_page: 1,
            ..SiteSettings::default()
        };

        let props = tag_page_props(&service, &settings, "rust", 2).await.unwrap();

        assert_eq!(props.posts.len(), 1);
        assert_eq!(props.posts[0].slug, "two");
        assert_eq!(props.number_of_pages, 2);
        assert_eq!(props.current_tag, "rust");
        assert_eq!(props.pagination[1].href, "/posts/tag/rust/page/2");
        assert_eq!(props.revalidate_secs, 21600);
        assert_eq!(props.all_tags.len(), 2);
    }

    #[tokio::test]
    async fn test_tags_with_reserved_characters_stay_one_segment() {
        let client = Arc::new(MockNotionClient::new_success(vec![
            notion_page("p1", "記事1", "one", "2024-02-02", &["C/C++", "Web Dev"], true),
        ]));
        let service = snapshot_service(client, TagMatch::Exact);

        let params = tag_page_params(&service, 4).await.unwrap();
        let paths: Vec<String> = params.iter().map(TagPageParams::path).collect();
        assert_eq!(
            paths,
            vec!["/posts/tag/C%2FC%2B%2B/page/1", "/posts/tag/Web%20Dev/page/1"]
        );

        let props = tag_page_props(&service, &SiteSettings::default(), "web Dev", 1)
            .await
            .unwrap();
        assert_eq!(props.posts.len(), 1);
        assert_eq!(props.pagination[0].href, "/posts/tag/web%20Dev/page/1");
    }

    #[tokio::test]
    async fn test_plan_site_uses_single_fetch() {
        let client = Arc::new(sample_client());
        let service = snapshot_service(Arc::clone(&client), TagMatch::Exact);
        let settings = SiteSettings::default();

        let plan = plan_site(&service, &settings).await.unwrap();

        assert_eq!(plan.front_page, vec!["post-4", "post-3", "post-2", "post-1"]);
        assert_eq!(plan.listing_pages, vec!["/posts/page/1", "/posts/page/2"]);
        assert_eq!(plan.tag_pages.len(), 3);
        assert_eq!(plan.posts.len(), 5);
        assert_eq!(plan.posts[0], "/posts/post-4");
        assert_eq!(plan.fallback, Fallback::Blocking);
        assert_eq!(client.query_calls(), 1, "スナップショットで1回だけ取得するはず");
    }

    #[test]
    fn test_fallback_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&Fallback::Blocking).unwrap(),
            "\"blocking\""
        );
    }
}

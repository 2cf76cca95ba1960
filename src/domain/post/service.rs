use super::model::{Post, TagMatch};
use super::repository::PostSource;
use crate::domain::pagination::{page_count, page_slice};
use crate::types::BlogResult;
use std::collections::HashSet;
use std::sync::Arc;

/// 記事一覧のページ分割・タグ絞り込み・件数計算を行うサービス
///
/// 各操作は呼び出しごとに`PostSource`から記事一覧を取得する。
/// 同一ビルド内で通信を減らしたい場合は`SnapshotSource`を渡す。
#[derive(Clone)]
pub struct PostService {
    source: Arc<dyn PostSource>,
    tag_match: TagMatch,
}

impl PostService {
    pub fn new(source: Arc<dyn PostSource>, tag_match: TagMatch) -> Self {
        Self { source, tag_match }
    }

    /// トップページ用に先頭からcount件を返す
    pub async fn posts_for_front_page(&self, count: usize) -> BlogResult<Vec<Post>> {
        let posts = self.source.published_posts().await?;
        Ok(posts.into_iter().take(count).collect())
    }

    /// ページ番号（1始まり）に応じた記事を返す。範囲外は空
    pub async fn posts_for_page(&self, page: usize, page_size: usize) -> BlogResult<Vec<Post>> {
        let posts = self.source.published_posts().await?;
        Ok(page_slice(&posts, page, page_size))
    }

    /// 全記事のページ数
    pub async fn page_count(&self, page_size: usize) -> BlogResult<usize> {
        let posts = self.source.published_posts().await?;
        Ok(page_count(posts.len(), page_size))
    }

    /// タグで絞り込んだ上でページ番号に応じた記事を返す
    pub async fn posts_for_tag_and_page(
        &self,
        tag: &str,
        page: usize,
        page_size: usize,
    ) -> BlogResult<Vec<Post>> {
        let posts = self.posts_with_tag(tag).await?;
        Ok(page_slice(&posts, page, page_size))
    }

    /// タグで絞り込んだ記事のページ数
    pub async fn page_count_for_tag(&self, tag: &str, page_size: usize) -> BlogResult<usize> {
        let posts = self.posts_with_tag(tag).await?;
        Ok(page_count(posts.len(), page_size))
    }

    /// 全記事のタグを重複なしで返す
    ///
    /// 並び順は保証しない（現在の実装は初出順）。
    pub async fn all_distinct_tags(&self) -> BlogResult<Vec<String>> {
        let posts = self.source.published_posts().await?;
        let mut seen = HashSet::new();
        Ok(posts
            .into_iter()
            .flat_map(|post| post.tags)
            .filter(|tag| seen.insert(tag.clone()))
            .collect())
    }

    async fn posts_with_tag(&self, tag: &str) -> BlogResult<Vec<Post>> {
        let posts = self.source.published_posts().await?;
        Ok(posts
            .into_iter()
            .filter(|post| post.has_tag(tag, self.tag_match))
            .collect())
    }
}

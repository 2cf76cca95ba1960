pub mod build;
pub mod config;

use crate::domain::post::{PostFetcher, PostService, SnapshotSource};
use crate::infra::api::notion::ReqwestNotionClient;
use anyhow::{Context, Result};
use config::BlogConfig;
use std::sync::Arc;

/// 設定からNotionフェッチャーを作成する
pub fn create_fetcher(config: &BlogConfig) -> Result<PostFetcher<ReqwestNotionClient>> {
    let client = ReqwestNotionClient::new(
        &config.notion.token,
        &config.notion.base_url,
        config.site.request_timeout_secs,
    )
    .context("Notionクライアントの初期化に失敗")?;
    Ok(PostFetcher::new(client, config.notion.database_id.clone()))
}

/// 1回のビルド用のサービスを作成する
///
/// 記事一覧はこのサービスの中でだけ使い回され、次のビルドでは取得し直す。
pub fn create_build_service(config: &BlogConfig) -> Result<PostService> {
    let fetcher = create_fetcher(config)?;
    let source = SnapshotSource::new(fetcher);
    Ok(PostService::new(Arc::new(source), config.site.tag_match))
}

use anyhow::{bail, Context, Result};
use notion_blog::app::{build::plan_site, config::BlogConfig, create_build_service, create_fetcher};
use notion_blog::infra::logging::init_logging;
use tracing::error;

const USAGE: &str = "使い方: notion-blog [plan | post <slug>]";

#[tokio::main]
async fn main() {
    // 環境変数を読み込み（.envファイルがあれば使用）
    let _ = dotenvy::dotenv();
    init_logging();

    if let Err(e) = run(std::env::args().skip(1).collect()).await {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

async fn run(args: Vec<String>) -> Result<()> {
    let config = BlogConfig::from_env().context("設定の読み込みに失敗しました")?;

    match args.iter().map(String::as_str).collect::<Vec<_>>().as_slice() {
        [] | ["plan"] => {
            // ビルド計画（生成するパスの一覧）をJSONで出力
            let service = create_build_service(&config)?;
            let plan = plan_site(&service, &config.site).await?;
            println!("{}", serde_json::to_string_pretty(&plan)?);
        }
        ["post", slug] => {
            // 記事1件の本文markdownを出力
            let fetcher = create_fetcher(&config)?;
            let detail = fetcher
                .fetch_post_by_slug(slug)
                .await
                .with_context(|| format!("記事の取得に失敗: {}", slug))?;
            println!("# {}\n", detail.metadata.title);
            println!("{}", detail.markdown);
        }
        _ => bail!("{}", USAGE),
    }

    Ok(())
}

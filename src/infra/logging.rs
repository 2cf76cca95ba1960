use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// ログ出力の既定フィルター（RUST_LOGが未設定の場合）
pub const DEFAULT_LOG_FILTER: &str = "info";

/// tracingのサブスクライバーを初期化する
///
/// RUST_LOG環境変数があればそれを優先する。
/// 既に初期化済みの場合（テストなど）は何もしない。
pub fn init_logging() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

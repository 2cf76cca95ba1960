//! 型定義モジュール
//!
//! アプリケーション全体で使用される共通的な型定義を管理します。
//! - 設定エラー型: 環境変数や設定ファイルに関するエラー
//! - ブログエラー型: Notion取得・正規化・検索のエラー

pub mod config;
pub mod error;

// 便利な再エクスポート
pub use config::{ConfigError, ConfigResult};
pub use error::{BlogError, BlogResult};

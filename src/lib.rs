//! Notionのデータベースを記事ソースとする静的ブログのデータ取得層
//!
//! - `domain::link`: 一覧ページのパス生成
//! - `domain::post`: 記事の取得・正規化・ページ分割・タグ絞り込み
//! - `infra`: Notion APIクライアント、markdown変換、設定ファイル読み込み
//! - `app`: 設定の組み立てとビルド計画の作成

pub mod app;
pub mod domain;
pub mod infra;
pub mod types;

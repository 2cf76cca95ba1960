pub mod notion;

// 便利のため、よく使用される型を再エクスポート
pub use notion::{MockNotionClient, NotionClient, ReqwestNotionClient};

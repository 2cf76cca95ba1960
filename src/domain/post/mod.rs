pub mod model;
pub mod repository;
pub mod service;

// 公開APIの再エクスポート

// model.rsから
pub use model::{Post, PostDetail, TagMatch};

// repository.rsから
pub use repository::{PostFetcher, PostSource, SnapshotSource};

// service.rsから
pub use service::PostService;

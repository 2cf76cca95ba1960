pub mod api;
pub mod loader;
pub mod logging;
pub mod markdown;
pub mod parser;

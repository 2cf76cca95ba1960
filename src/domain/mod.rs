pub mod link;
pub mod pagination;
pub mod post;

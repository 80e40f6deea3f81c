pub mod embedder;
pub mod feed;
pub mod recommend;

pub mod config;
pub mod db;
pub mod embeddings;
pub mod error;
pub mod hash;
pub mod models;
pub mod store;
pub mod text;

pub use config::FolioConfig;
pub use embeddings::{Embedding, EmbeddingBackend, EmbeddingError, GeminiEmbeddingClient};
pub use error::FolioError;
pub use models::content::{ContentItem, ContentKind, EmbeddingRecord, PublicationStatus};
pub use models::feed::{FeedFilter, FeedItem, FeedPage};
pub use store::{Author, ContentStore, Page, StoreError};

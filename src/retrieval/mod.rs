//! Local document index behind `rag_content` cards
//!
//! Text files are split into overlapping chunks and kept in SQLite. Queries
//! are ranked by character-bigram overlap.

mod chunker;
mod schema;
mod store;

pub use store::{ChunkStore, Document};

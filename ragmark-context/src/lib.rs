pub mod text;

// Re-export the chunking functions for external use
pub use text::{TextChunk, split, split_indexed};

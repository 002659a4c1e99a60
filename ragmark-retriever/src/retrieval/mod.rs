pub mod context;
pub mod indexer;
pub mod prompt;
pub mod source;

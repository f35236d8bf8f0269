//! Command handlers for the Sift CLI.
//!
//! This module organizes all CLI commands into separate submodules.

pub mod ask;
pub mod ingest;
pub mod ready;
pub mod sources;

// Re-export command types for convenience
pub use ask::AskCommand;
pub use ingest::IngestCommand;
pub use ready::ReadyCommand;
pub use sources::SourcesCommand;

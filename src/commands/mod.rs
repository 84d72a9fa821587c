//! CLI subcommand implementations

mod index;
mod init;
mod remove;
mod search;
mod stats;

pub use index::index_corpus;
pub use init::init_config;
pub use remove::remove_documents;
pub use search::{search_index, OutputFormat};
pub use stats::show_stats;

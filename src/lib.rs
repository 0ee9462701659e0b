pub mod api;
pub mod config;
pub mod edit_buffer;
pub mod engine;
pub mod error;

// Convenience re-exports
pub use api::client::NotesClient;
pub use api::types;
pub use config::AppConfig;
pub use engine::context::{ChatContext, ContextEntry};
pub use engine::session::Session;
pub use engine::tree::{BlockNode, BlockTree};
pub use error::{Error, ErrorNotice, Result};

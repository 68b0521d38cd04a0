//! QuizSmith engine: question supply and session state.
//!
//! Everything effectful lives here, behind port traits (see
//! [`infrastructure::ports`]): the chat-completion backend, the SQLite
//! question library, the best-effort remote mirror, and key-value snapshot
//! storage. Services are constructed explicitly and wired together in
//! [`app`]; nothing in this crate is a global.

pub mod app;
pub mod bank;
pub mod config;
pub mod generate;
pub mod infrastructure;
pub mod library;
pub mod session;

pub use app::Engine;
pub use config::{BankConfig, EngineConfig, GenerationConfig, MirrorConfig};

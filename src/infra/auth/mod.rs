// Auth infra layer.
// - `google_broker.rs` drives the installed-app OAuth flow against Google.
// - `file_store.rs` persists the credential to disk between runs.
// - `memory.rs` holds in-memory doubles for tests.
#![allow(unused_imports)]

pub mod file_store;
pub mod google_broker;
pub mod memory;

// Re-export for convenience
pub use file_store::FileTokenStore;
pub use google_broker::GoogleAuthBroker;
pub use memory::{MemoryTokenStore, StaticBroker};

// Sheets infra layer.
// - `sheets_client.rs` talks to the Google Sheets v4 HTTP API.
// - `in_memory.rs` is the test implementation of the same port.
#![allow(unused_imports)]

pub mod in_memory;
pub mod sheets_client;

// Re-export for convenience
pub use in_memory::InMemorySheetStore;
pub use sheets_client::SheetsApiClient;

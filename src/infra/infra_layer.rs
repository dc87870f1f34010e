// The infra module contains implementations of core traits.
// Each feature implementation goes in its own submodule.

#[path = "auth/mod.rs"]
pub mod auth;

#[path = "sheets/mod.rs"]
pub mod sheets;

// The core module contains all business logic.
// Each feature gets its own submodule.

#[path = "activity/activity_service.rs"]
pub mod activity;

#[path = "auth/credential_manager.rs"]
pub mod auth;

//! Module for user administration API endpoints.
//!
//! Creating, listing and updating accounts, plus the status, password and
//! delete operations that also end the affected user's session.

pub mod handlers;
pub mod routes;

//! Module for role and permission management API endpoints.

pub mod handlers;
pub mod routes;

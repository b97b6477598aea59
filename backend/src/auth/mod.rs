//! Authentication module for sessions and access control.
//!
//! This module provides the public interface for login and logout, session
//! verification, the revocation store and the role/permission guards.

pub mod errors;
pub mod guard;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod revocation;
pub mod routes;
pub mod service;

//! Module for project and construction task API endpoints.
//!
//! Covers project creation and listing, contractor assignment, task
//! creation and the contractor and site-incharge task updates.

pub mod handlers;
pub mod routes;

//! Central module for organizing the application's main API endpoints.
//!
//! This module groups the resource routers (users, roles, projects and
//! notifications) and the shared response envelope. Login and logout live
//! in `auth`.

pub mod common;
pub mod notification;
pub mod project;
pub mod role;
pub mod user;

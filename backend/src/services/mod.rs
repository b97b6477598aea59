//! Module for core business logic services.
//!
//! Services validate requests, check capabilities and actor bindings, and
//! orchestrate the repositories and the outbound notifiers.

pub mod assignment_service;
pub mod email_service;
pub mod notification_service;
pub mod project_service;
pub mod role_service;
pub mod task_service;
pub mod task_state;
pub mod user_service;

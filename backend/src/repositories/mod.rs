//! Data-access layer. Each repository borrows the shared pool and returns
//! `anyhow::Result`, leaving business rules to the services.

pub mod notification_repository;
pub mod project_repository;
pub mod quality_issue_repository;
pub mod role_repository;
pub mod task_repository;
pub mod user_repository;

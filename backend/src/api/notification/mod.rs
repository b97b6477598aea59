//! Module for the notification inbox and live stream.

pub mod handlers;
pub mod routes;

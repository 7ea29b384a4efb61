//! # Taskdesk Shared Library
//!
//! Stores, authentication and task lifecycle rules used by the Taskdesk API
//! server.
//!
//! ## Module Organization
//!
//! - `db`: SQLite pool and embedded migrations
//! - `models`: Database models and their queries
//! - `auth`: Passwords, sessions and permission rules
//! - `lifecycle`: Notification fan-out for task events

pub mod auth;
pub mod db;
pub mod lifecycle;
pub mod models;

/// Current version of the Taskdesk shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//! Shared configuration and error handling for CTFBoard
//!
//! This crate provides common functionality used across the CTFBoard backend:
//! - Configuration management following 12-factor principles
//! - Application error types with stable codes and process exit statuses
//! - Repository error types shared by every store adapter

pub mod config;
pub mod db;
pub mod error;

pub use config::{Config, LogFormat};
pub use db::RepositoryError;
pub use error::{Error, Result};

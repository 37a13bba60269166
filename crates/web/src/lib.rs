//! Delicious - a server-rendered directory of local stores.
//!
//! # Architecture
//!
//! - Axum web framework with Askama templates for server-side rendering
//! - `PostgreSQL` via sqlx for stores, reviews and accounts
//! - tower-sessions for login state and flash messages
//! - Full-text search on a generated `tsvector`, proximity via haversine
//!
//! The binary in `main.rs` wires configuration, tracing and Sentry around
//! [`app::build`].

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod app;
pub mod config;
pub mod db;
pub mod error;
pub mod filters;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;

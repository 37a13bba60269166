//! Delicious Core - Shared types library.
//!
//! This crate provides the domain types used by every Delicious component:
//! - `web` - The server-rendered store directory
//! - `cli` - Command-line tools for migrations, seeding and user management
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no database
//! access, no HTTP. Store-level rules that must hold no matter which query
//! produced the data (slug suffixing, pagination arithmetic, heart toggling,
//! geo distance) live here so they can be tested in isolation.
//!
//! # Modules
//!
//! - [`types`] - Typed IDs, emails, slugs, coordinates, pagination, hearts and ratings

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;

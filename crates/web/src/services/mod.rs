//! Business logic services.
//!
//! # Services
//!
//! - `auth` - Registration, password login and credential extraction
//! - `stores` - Store writes (slug pipeline), listings and read-model assembly
//! - `uploads` - Photo validation, resizing and storage

pub mod auth;
pub mod stores;
pub mod uploads;

//! Core types for Delicious.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod geo;
pub mod hearts;
pub mod id;
pub mod pagination;
pub mod rating;
pub mod slug;

pub use email::{Email, EmailError};
pub use geo::{BoundingBox, GeoError, GeoPoint};
pub use hearts::{HeartChange, Hearts};
pub use id::*;
pub use pagination::Pagination;
pub use rating::{Rating, RatingError};
pub use slug::Slug;

//! Domain models for the directory.
//!
//! Validated domain objects, separate from the database row types in `db`.

pub mod flash;
pub mod review;
pub mod session;
pub mod store;
pub mod user;

pub use flash::{Flash, FlashKind};
pub use review::{Review, ReviewForm, ReviewInput};
pub use store::{
    Location, Store, StoreForm, StoreInput, StoreSummary, TagCount, TopStore, ValidationErrors,
};
pub use user::{PublicUser, User};

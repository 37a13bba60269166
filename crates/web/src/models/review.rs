//! Review domain types.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use delicious_core::{Rating, ReviewId};

use super::ValidationErrors;

/// A review shown on a store page, with its author's name resolved.
#[derive(Debug, Clone)]
pub struct Review {
    pub id: ReviewId,
    pub author_name: String,
    pub text: String,
    pub rating: Rating,
    pub created_at: DateTime<Utc>,
}

impl Review {
    /// Filled and empty stars for display, e.g. `★★★★☆`.
    #[must_use]
    pub fn stars(&self) -> String {
        let filled = usize::try_from(self.rating.get()).unwrap_or(0);
        let empty = usize::try_from(Rating::MAX).unwrap_or(5).saturating_sub(filled);
        format!("{}{}", "★".repeat(filled), "☆".repeat(empty))
    }

    /// Creation date for display.
    #[must_use]
    pub fn created_display(&self) -> String {
        self.created_at.format("%B %-d, %Y").to_string()
    }
}

/// Review form submission.
#[derive(Debug, Deserialize)]
pub struct ReviewForm {
    #[serde(default)]
    pub text: String,
    pub rating: Option<String>,
}

/// A validated review ready to be written.
#[derive(Debug, Clone)]
pub struct ReviewInput {
    pub text: String,
    pub rating: Rating,
}

impl ReviewForm {
    /// Validate into a [`ReviewInput`].
    ///
    /// # Errors
    ///
    /// Returns every failed field at once.
    pub fn validate(self) -> Result<ReviewInput, ValidationErrors> {
        let mut errors = Vec::new();

        let text = self.text.trim().to_string();
        if text.is_empty() {
            errors.push("Your review must have text!".to_string());
        }

        let rating = self
            .rating
            .as_deref()
            .and_then(|r| r.trim().parse::<i64>().ok())
            .and_then(|r| Rating::new(r).ok());
        if rating.is_none() {
            errors.push("Please pick a rating from 1 to 5 stars.".to_string());
        }

        match rating {
            Some(rating) if errors.is_empty() => Ok(ReviewInput { text, rating }),
            _ => Err(ValidationErrors(errors)),
        }
    }
}

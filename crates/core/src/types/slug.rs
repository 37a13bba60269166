//! URL-safe store identifiers derived from store names.
//!
//! A slug is computed from the name whenever the name changes. Collisions are
//! resolved by suffixing: with `n` existing slugs of the form `base` or
//! `base-<digits>`, the new slug becomes `base-<n + 1>`. The database keeps a
//! unique index on `lower(slug)`, and the writer re-runs [`Slug::dedupe`] when
//! that index rejects an insert.

use core::fmt;
use std::collections::HashSet;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// A URL-safe slug: lowercase ASCII letters, digits and single dashes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Slug(String);

impl Slug {
    /// Slug used when a name contains nothing sluggable (e.g. only emoji).
    pub const FALLBACK: &'static str = "store";

    /// Derive a slug from a human-readable name.
    ///
    /// Non-ASCII characters are transliterated (`"Café"` becomes `"cafe"`),
    /// and every run of other characters collapses into a single dash.
    ///
    /// ```
    /// use delicious_core::Slug;
    ///
    /// assert_eq!(Slug::from_name("Wes' Café & Bar").as_str(), "wes-cafe-bar");
    /// ```
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        let ascii = deunicode::deunicode(name);
        let mut slug = String::with_capacity(ascii.len());
        let mut pending_dash = false;

        for c in ascii.chars() {
            if c.is_ascii_alphanumeric() {
                if pending_dash && !slug.is_empty() {
                    slug.push('-');
                }
                pending_dash = false;
                slug.push(c.to_ascii_lowercase());
            } else if c != '\'' {
                // apostrophes join words: "Bob's" -> "bobs"
                pending_dash = true;
            }
        }

        if slug.is_empty() {
            slug.push_str(Self::FALLBACK);
        }

        Self(slug)
    }

    /// Wrap an already stored slug without re-deriving it.
    #[must_use]
    pub fn from_stored(slug: String) -> Self {
        Self(slug)
    }

    /// Returns the slug as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the slug and returns its inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }

    /// POSIX regular expression matching this base and its numbered variants.
    ///
    /// Suitable for PostgreSQL's case-insensitive `~*` operator.
    #[must_use]
    pub fn collision_pattern(&self) -> String {
        format!("^({})(-[0-9]*)?$", regex::escape(&self.0))
    }

    /// Whether `candidate` is this base slug or one of its numbered variants,
    /// ignoring case.
    #[must_use]
    pub fn collides_with(&self, candidate: &str) -> bool {
        Regex::new(&format!("(?i){}", self.collision_pattern()))
            .is_ok_and(|re| re.is_match(candidate))
    }

    /// Pick the slug to store given the slugs that already exist.
    ///
    /// Only slugs that [collide](Self::collides_with) with this base are
    /// counted. The result is `base` when nothing collides, otherwise
    /// `base-<count + 1>`, moving further up when that exact slug is taken.
    ///
    /// ```
    /// use delicious_core::Slug;
    ///
    /// let base = Slug::from_name("Wes");
    /// assert_eq!(base.dedupe(["wes", "wes-2", "wesley"]).as_str(), "wes-3");
    /// ```
    #[must_use]
    pub fn dedupe<'a>(&self, existing: impl IntoIterator<Item = &'a str>) -> Self {
        let taken: HashSet<String> = existing
            .into_iter()
            .filter(|slug| self.collides_with(slug))
            .map(str::to_ascii_lowercase)
            .collect();

        if taken.is_empty() {
            return self.clone();
        }

        let mut suffix = taken.len() + 1;
        loop {
            let candidate = format!("{}-{suffix}", self.0);
            if !taken.contains(&candidate) {
                return Self(candidate);
            }
            suffix += 1;
        }
    }
}

impl fmt::Display for Slug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Slug {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

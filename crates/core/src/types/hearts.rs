//! A user's set of favorited ("hearted") stores.

use serde::{Deserialize, Serialize};

use super::id::StoreId;

/// What a [`Hearts::toggle`] call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HeartChange {
    Added,
    Removed,
}

/// Ordered set of hearted store ids (insertion order, no duplicates).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Hearts(Vec<StoreId>);

impl Hearts {
    /// Build from stored ids, dropping duplicates but keeping first-seen order.
    #[must_use]
    pub fn from_ids(ids: impl IntoIterator<Item = StoreId>) -> Self {
        let mut hearts = Self::default();
        for id in ids {
            if !hearts.contains(id) {
                hearts.0.push(id);
            }
        }
        hearts
    }

    /// Whether `store` is hearted.
    #[must_use]
    pub fn contains(&self, store: StoreId) -> bool {
        self.0.contains(&store)
    }

    /// Remove `store` if present, otherwise add it.
    pub fn toggle(&mut self, store: StoreId) -> HeartChange {
        if let Some(pos) = self.0.iter().position(|id| *id == store) {
            self.0.remove(pos);
            HeartChange::Removed
        } else {
            self.0.push(store);
            HeartChange::Added
        }
    }

    /// Number of hearted stores.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether nothing is hearted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Hearted ids as a slice.
    #[must_use]
    pub fn as_slice(&self) -> &[StoreId] {
        &self.0
    }

    /// Consume into the underlying ids.
    #[must_use]
    pub fn into_vec(self) -> Vec<StoreId> {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toggle_adds_exactly_once() {
        let mut hearts = Hearts::default();
        assert_eq!(hearts.toggle(StoreId::new(3)), HeartChange::Added);
        assert_eq!(hearts.as_slice(), &[StoreId::new(3)]);
    }

    #[test]
    fn test_toggle_removes_when_present() {
        let mut hearts = Hearts::from_ids([StoreId::new(1), StoreId::new(2)]);
        assert_eq!(hearts.toggle(StoreId::new(1)), HeartChange::Removed);
        assert_eq!(hearts.as_slice(), &[StoreId::new(2)]);
    }

    #[test]
    fn test_two_toggles_restore_original() {
        let original = Hearts::from_ids([StoreId::new(5), StoreId::new(9)]);
        for id in [StoreId::new(5), StoreId::new(11)] {
            let mut hearts = original.clone();
            hearts.toggle(id);
            hearts.toggle(id);
            let mut a = hearts.into_vec();
            let mut b = original.clone().into_vec();
            a.sort();
            b.sort();
            assert_eq!(a, b);
        }
    }

    #[test]
    fn test_from_ids_drops_duplicates() {
        let hearts = Hearts::from_ids([StoreId::new(1), StoreId::new(1), StoreId::new(2)]);
        assert_eq!(hearts.len(), 2);
        assert!(hearts.contains(StoreId::new(2)));
    }
}

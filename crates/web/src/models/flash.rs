//! One-shot flash messages carried across a redirect in the session.

use serde::{Deserialize, Serialize};
use tower_sessions::Session;

use super::session;

/// Flash message category (doubles as the CSS modifier).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashKind {
    Success,
    Info,
    Error,
}

impl FlashKind {
    /// CSS class suffix used by the layout.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Info => "info",
            Self::Error => "error",
        }
    }
}

/// A message shown once on the next rendered page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flash {
    pub kind: FlashKind,
    pub message: String,
}

impl Flash {
    /// Queue a message for the next page.
    ///
    /// Session failures are logged, not returned.
    pub async fn push(session: &Session, kind: FlashKind, message: impl Into<String>) {
        let mut pending: Vec<Self> = session
            .get(session::FLASH)
            .await
            .ok()
            .flatten()
            .unwrap_or_default();
        pending.push(Self {
            kind,
            message: message.into(),
        });
        if let Err(e) = session.insert(session::FLASH, pending).await {
            tracing::warn!(error = %e, "Failed to store flash message");
        }
    }

    /// Drain every queued message.
    pub async fn take(session: &Session) -> Vec<Self> {
        session
            .remove::<Vec<Self>>(session::FLASH)
            .await
            .ok()
            .flatten()
            .unwrap_or_default()
    }

    /// CSS class suffix for this message.
    #[must_use]
    pub const fn class(&self) -> &'static str {
        self.kind.as_str()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use tower_sessions::MemoryStore;

    use super::*;

    #[tokio::test]
    async fn test_flashes_drain_once_in_order() {
        let session = Session::new(None, Arc::new(MemoryStore::default()), None);
        Flash::push(&session, FlashKind::Error, "first").await;
        Flash::push(&session, FlashKind::Success, "second").await;

        let flashes = Flash::take(&session).await;
        assert_eq!(flashes.len(), 2);
        assert_eq!(flashes[0].message, "first");
        assert_eq!(flashes[0].class(), "error");
        assert_eq!(flashes[1].kind, FlashKind::Success);

        assert!(Flash::take(&session).await.is_empty());
    }
}

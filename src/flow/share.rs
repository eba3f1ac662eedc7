//! Read-only presentation of a stored confession.

use super::effects::{Clipboard, ClipboardError, Notice, Notifier};
use crate::models::ConfessionRecord;
use crate::store::{ConfessionStore, StoreError};

/// Build the shareable link for a confession id.
pub fn share_link(public_url: &str, id: &str) -> String {
    format!("{}/confession/{}", public_url.trim_end_matches('/'), id)
}

/// Fetch outcome for one share page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShareState {
    Loading,
    Loaded(ConfessionRecord),
    NotFound,
}

/// What the share page draws.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShareDisplay<'a> {
    Loading,
    NotFound {
        message: &'static str,
    },
    Confession {
        heading: &'static str,
        to: &'a str,
        message: &'a str,
        from: &'a str,
    },
}

pub struct ShareView {
    id: String,
    link: String,
    state: ShareState,
}

impl ShareView {
    pub fn new(public_url: &str, id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            link: share_link(public_url, &id),
            id,
            state: ShareState::Loading,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn link(&self) -> &str {
        &self.link
    }

    pub fn state(&self) -> &ShareState {
        &self.state
    }

    /// Issue the single fetch for this view.
    ///
    /// Only the first call reaches the store; later calls return the settled
    /// state. There is no retry at this layer.
    pub async fn load<S>(&mut self, store: &S, notifier: &dyn Notifier) -> &ShareState
    where
        S: ConfessionStore + ?Sized,
    {
        if self.state == ShareState::Loading {
            let result = store.get(&self.id).await;
            self.resolve(result, notifier);
        }
        &self.state
    }

    /// Settle the view from a fetch result. Ignored once settled.
    ///
    /// A transport failure is surfaced as a notice and, like a missing id,
    /// ends on the not-found display.
    pub fn resolve(
        &mut self,
        result: Result<ConfessionRecord, StoreError>,
        notifier: &dyn Notifier,
    ) {
        if self.state != ShareState::Loading {
            return;
        }

        self.state = match result {
            Ok(record) => ShareState::Loaded(record),
            Err(StoreError::NotFound(_)) => {
                tracing::debug!(id = %self.id, "Confession not found");
                ShareState::NotFound
            }
            Err(e) => {
                tracing::warn!(id = %self.id, "Failed to load confession: {}", e);
                notifier.notify(Notice::error("Couldn't load confession", e.to_string()));
                ShareState::NotFound
            }
        };
    }

    pub fn display(&self) -> ShareDisplay<'_> {
        match &self.state {
            ShareState::Loading => ShareDisplay::Loading,
            ShareState::NotFound => ShareDisplay::NotFound {
                message: "Confession not found",
            },
            ShareState::Loaded(record) => ShareDisplay::Confession {
                heading: "A Love Confession",
                to: &record.recipient_name,
                message: &record.message,
                from: &record.sender_name,
            },
        }
    }

    /// Copy this page's link to the clipboard and tell the user.
    pub fn share(
        &self,
        clipboard: &dyn Clipboard,
        notifier: &dyn Notifier,
    ) -> Result<(), ClipboardError> {
        match clipboard.write_text(&self.link) {
            Ok(()) => {
                notifier.notify(Notice::info(
                    "Link copied!",
                    "Share this confession with others",
                ));
                Ok(())
            }
            Err(e) => {
                notifier.notify(Notice::error("Couldn't copy link", e.to_string()));
                Err(e)
            }
        }
    }
}

/// Messages between the background and the side panel, and their delivery
///
/// The side panel is a separate page that may still be loading when the
/// background wants to talk to it, so every send is retried a bounded
/// number of times with a linear backoff.
use serde::{Deserialize, Serialize};

use crate::error::ExtensionError;
use crate::repo::RepoIdentity;
use crate::state::TabId;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    rename_all = "SCREAMING_SNAKE_CASE",
    rename_all_fields = "camelCase"
)]
pub enum PanelMessage {
    /// Background → panel: show documentation for a repo
    UpdateRepo {
        owner: String,
        name: String,
        tab_id: TabId,
        /// The repo page does not exist; show the homepage instead
        #[serde(default, skip_serializing_if = "std::ops::Not::not")]
        fallback: bool,
    },
    /// Background → panel: the panel is being closed
    Close { tab_id: TabId },
    /// Panel → background: the user dismissed the panel
    PanelClosed { tab_id: TabId },
}

impl PanelMessage {
    pub fn update(tab_id: TabId, repo: &RepoIdentity, fallback: bool) -> PanelMessage {
        PanelMessage::UpdateRepo {
            owner: repo.owner.clone(),
            name: repo.name.clone(),
            tab_id,
            fallback,
        }
    }

    pub fn tab_id(&self) -> TabId {
        match self {
            PanelMessage::UpdateRepo { tab_id, .. }
            | PanelMessage::Close { tab_id }
            | PanelMessage::PanelClosed { tab_id } => *tab_id,
        }
    }
}

/// Bounded retry with linear backoff
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub attempt_timeout_ms: u32,
    pub base_delay_ms: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_attempts: 3,
            attempt_timeout_ms: 1_000,
            base_delay_ms: 200,
        }
    }
}

impl RetryPolicy {
    /// Pause after the given failed attempt (1-based), `None` after the last
    pub fn delay_after(&self, attempt: u32) -> Option<u32> {
        if attempt >= self.max_attempts {
            None
        } else {
            Some(attempt.saturating_mul(self.base_delay_ms))
        }
    }
}

/// Channel to the panel context
#[allow(async_fn_in_trait)]
pub trait Transport {
    /// Send once; resolve only when the receiver acknowledged within `timeout_ms`
    async fn send(&self, message: &PanelMessage, timeout_ms: u32) -> Result<(), String>;

    async fn pause(&self, ms: u32);
}

/// Deliver `message`, retrying per `policy`
///
/// `still_current` is checked before every attempt so that a retry for an
/// outdated event never lands after a newer message for the same tab.
/// Returns the number of attempts used.
pub async fn deliver<T, F>(
    transport: &T,
    policy: RetryPolicy,
    message: &PanelMessage,
    still_current: F,
) -> Result<u32, ExtensionError>
where
    T: Transport,
    F: Fn() -> bool,
{
    let mut attempt = 1;
    loop {
        if !still_current() {
            log::debug!("Dropping superseded message for tab {}", message.tab_id());
            return Err(ExtensionError::Superseded);
        }

        log::debug!(
            "Sending message (attempt {}/{}): {:?}",
            attempt,
            policy.max_attempts,
            message
        );

        match transport.send(message, policy.attempt_timeout_ms).await {
            Ok(()) => return Ok(attempt),
            Err(reason) => {
                log::debug!("Message send attempt {} failed: {}", attempt, reason);
                match policy.delay_after(attempt) {
                    Some(delay) => transport.pause(delay).await,
                    None => {
                        return Err(ExtensionError::MessageDelivery {
                            attempts: attempt,
                            reason,
                        });
                    }
                }
            }
        }
        attempt += 1;
    }
}

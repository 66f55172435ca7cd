//! Per-position notification channels.
//!
//! A [`Publication`] is the single writer, any number of [`Subscription`]s
//! read. The channel keeps only the latest value: a subscriber that joins
//! late sees the current notification immediately and then every change
//! after it. Once a terminal notification ([`Notification::Finished`] or
//! [`Notification::Failed`]) is stored, further updates are rejected.

use serde::Serialize;
use tokio::sync::watch;

use lockup_core::error::ChannelError;
use lockup_core::types::{LockupState, Timestamp};

/// A value carried on a position's channel.
#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notification {
    /// Channel opened, no state published yet.
    Opened,
    /// Periodic state report.
    Update(LockupState),
    /// The governing period has just passed; rewards stop accruing.
    Expired(LockupState),
    /// The channel is done (unbonding started, or tokens redeemed).
    Finished {
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        unbonding_timestamp: Option<Timestamp>,
    },
    /// The channel broke down.
    Failed { reason: String },
}

impl Notification {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finished { .. } | Self::Failed { .. })
    }

    /// The reported state, if this notification carries one.
    pub fn state(&self) -> Option<&LockupState> {
        match self {
            Self::Update(state) | Self::Expired(state) => Some(state),
            _ => None,
        }
    }
}

/// Writing end of a notification channel.
#[derive(Debug)]
pub struct Publication {
    tx: watch::Sender<Notification>,
}

/// Reading end of a notification channel.
#[derive(Debug, Clone)]
pub struct Subscription {
    rx: watch::Receiver<Notification>,
}

/// Open a new channel.
pub fn channel() -> (Publication, Subscription) {
    let (tx, rx) = watch::channel(Notification::Opened);
    (Publication { tx }, Subscription { rx })
}

impl Publication {
    pub fn publish(&self, state: LockupState) -> Result<(), ChannelError> {
        self.push(Notification::Update(state))
    }

    pub fn announce_expiry(&self, state: LockupState) -> Result<(), ChannelError> {
        self.push(Notification::Expired(state))
    }

    pub fn finish(
        &self,
        message: impl Into<String>,
        unbonding_timestamp: Option<Timestamp>,
    ) -> Result<(), ChannelError> {
        self.push(Notification::Finished {
            message: message.into(),
            unbonding_timestamp,
        })
    }

    pub fn fail(&self, reason: impl Into<String>) -> Result<(), ChannelError> {
        self.push(Notification::Failed {
            reason: reason.into(),
        })
    }

    pub fn is_finished(&self) -> bool {
        self.tx.borrow().is_terminal()
    }

    pub fn subscribe(&self) -> Subscription {
        Subscription {
            rx: self.tx.subscribe(),
        }
    }

    /// Store `next` unless the channel already holds a terminal value.
    ///
    /// Succeeds with no subscribers attached; late subscribers replay it.
    fn push(&self, next: Notification) -> Result<(), ChannelError> {
        let mut rejected = false;
        self.tx.send_if_modified(|current| {
            if current.is_terminal() {
                rejected = true;
                false
            } else {
                *current = next;
                true
            }
        });
        if rejected {
            Err(ChannelError::Finished)
        } else {
            Ok(())
        }
    }
}

impl Subscription {
    /// The latest notification, without waiting.
    pub fn current(&self) -> Notification {
        self.rx.borrow().clone()
    }

    /// Wait for the next notification not yet seen by this subscription.
    ///
    /// Returns `None` once the publication is gone and everything was seen.
    pub async fn next(&mut self) -> Option<Notification> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(n: u128) -> LockupState {
        LockupState {
            expired: false,
            rewards_to_collect: n,
            message: format!("{n}"),
        }
    }

    #[test]
    fn starts_opened() {
        let (_publication, subscription) = channel();
        assert_eq!(subscription.current(), Notification::Opened);
    }

    #[test]
    fn late_subscriber_sees_current_value() {
        let (publication, _first) = channel();
        publication.publish(state(3)).unwrap();
        let late = publication.subscribe();
        assert_eq!(late.current(), Notification::Update(state(3)));
    }

    #[test]
    fn publish_without_subscribers_succeeds() {
        let (publication, subscription) = channel();
        drop(subscription);
        publication.publish(state(1)).unwrap();
        assert_eq!(publication.subscribe().current().state(), Some(&state(1)));
    }

    #[test]
    fn finish_is_terminal() {
        let (publication, subscription) = channel();
        publication.finish("Tokens redeemed", None).unwrap();
        assert!(publication.is_finished());
        assert_eq!(publication.publish(state(1)), Err(ChannelError::Finished));
        assert_eq!(publication.fail("late"), Err(ChannelError::Finished));
        assert!(matches!(subscription.current(), Notification::Finished { .. }));
    }

    #[test]
    fn expiry_is_not_terminal() {
        let (publication, _subscription) = channel();
        publication.announce_expiry(state(4)).unwrap();
        assert!(!publication.is_finished());
        publication.publish(state(4)).unwrap();
    }

    #[tokio::test]
    async fn next_yields_changes_then_none_after_drop() {
        let (publication, mut subscription) = channel();
        publication.publish(state(1)).unwrap();
        assert_eq!(subscription.next().await, Some(Notification::Update(state(1))));
        publication.fail("boom").unwrap();
        drop(publication);
        assert_eq!(
            subscription.next().await,
            Some(Notification::Failed {
                reason: "boom".into()
            })
        );
        assert_eq!(subscription.next().await, None);
    }

    #[test]
    fn serializes_with_kind_tag() {
        let json = serde_json::to_value(Notification::Finished {
            message: "Unbonding has started".into(),
            unbonding_timestamp: Some(10),
        })
        .unwrap();
        assert_eq!(json["kind"], "finished");
        assert_eq!(json["unbonding_timestamp"], 10);
    }
}

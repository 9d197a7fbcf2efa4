// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Realtime works change feeds.
//!
//! | Feed | Transport |
//! |------|-----------|
//! | [`WorkSubscriber`] | Postgres LISTEN on [`WORKS_CHANNEL`](crate::events::WORKS_CHANNEL) |
//! | [`MemorySubscriber`] | `tokio::sync::broadcast` from [`MemoryStore`](crate::repository::memory::MemoryStore) |

use std::convert::Infallible;

use async_trait::async_trait;
use tokio::sync::broadcast::{self, error::RecvError};
use workorder_core::StreamError;

use crate::events::WorkEvent;

/// Source of works events.
#[async_trait]
pub trait ChangeFeed: Send {
    /// Transport error.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Receive the next event.
    ///
    /// Blocks until an event is available.
    async fn recv(&mut self) -> Result<WorkEvent, StreamError<Self::Error>>;
}

/// Subscriber fed by the in-memory store.
pub struct MemorySubscriber {
    receiver: broadcast::Receiver<WorkEvent>
}

impl MemorySubscriber {
    /// Wrap a broadcast receiver.
    pub fn new(receiver: broadcast::Receiver<WorkEvent>) -> Self {
        Self {
            receiver
        }
    }
}

#[async_trait]
impl ChangeFeed for MemorySubscriber {
    type Error = Infallible;

    async fn recv(&mut self) -> Result<WorkEvent, StreamError<Infallible>> {
        self.receiver.recv().await.map_err(|e| match e {
            RecvError::Lagged(missed) => StreamError::Lagged(missed),
            RecvError::Closed => StreamError::Closed
        })
    }
}

#[cfg(feature = "postgres")]
pub use self::postgres::WorkSubscriber;

#[cfg(feature = "postgres")]
mod postgres {
    use async_trait::async_trait;
    use sqlx::{PgPool, postgres::PgListener};
    use workorder_core::StreamError;

    use super::ChangeFeed;
    use crate::events::{WORKS_CHANNEL, WorkEvent};

    /// Subscriber for works change events.
    ///
    /// Uses Postgres LISTEN/NOTIFY for cross-process notifications.
    pub struct WorkSubscriber {
        listener: PgListener
    }

    impl WorkSubscriber {
        /// Create a new subscriber connected to the database pool.
        ///
        /// Automatically subscribes to the works notification channel.
        pub async fn new(pool: &PgPool) -> Result<Self, sqlx::Error> {
            let mut listener = PgListener::connect_with(pool).await?;
            listener.listen(WORKS_CHANNEL).await?;
            Ok(Self {
                listener
            })
        }
    }

    #[async_trait]
    impl ChangeFeed for WorkSubscriber {
        type Error = sqlx::Error;

        async fn recv(&mut self) -> Result<WorkEvent, StreamError<sqlx::Error>> {
            let notification = self.listener.recv().await.map_err(StreamError::Database)?;

            serde_json::from_str(notification.payload())
                .map_err(|e| StreamError::Deserialize(e.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn lag_is_reported() {
        let (tx, rx) = broadcast::channel(1);
        let mut feed = MemorySubscriber::new(rx);
        tx.send(WorkEvent::soft_deleted(1)).unwrap();
        tx.send(WorkEvent::soft_deleted(2)).unwrap();

        assert!(matches!(feed.recv().await, Err(StreamError::Lagged(1))));
        assert_eq!(feed.recv().await.unwrap(), WorkEvent::soft_deleted(2));
    }

    #[tokio::test]
    async fn closed_when_sender_dropped() {
        let (tx, rx) = broadcast::channel::<WorkEvent>(4);
        let mut feed = MemorySubscriber::new(rx);
        drop(tx);
        assert!(feed.recv().await.unwrap_err().is_closed());
    }
}

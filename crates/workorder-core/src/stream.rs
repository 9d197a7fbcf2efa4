// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Errors for realtime change feeds.
//!
//! Feeds deliver works table events either from Postgres LISTEN/NOTIFY or
//! from an in-process broadcast channel.

use std::fmt;

/// Error type for change feed operations.
#[derive(Debug)]
pub enum StreamError<D> {
    /// Database/listener error.
    Database(D),
    /// JSON deserialization error.
    Deserialize(String),
    /// Receiver fell behind and missed events.
    Lagged(u64),
    /// Feed was shut down.
    Closed
}

impl<D> StreamError<D> {
    /// Check if the feed can never produce another event.
    pub const fn is_closed(&self) -> bool {
        matches!(self, Self::Closed)
    }
}

impl<D: fmt::Display> fmt::Display for StreamError<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Database(e) => write!(f, "database error: {}", e),
            Self::Deserialize(e) => write!(f, "deserialize error: {}", e),
            Self::Lagged(n) => write!(f, "feed lagged by {} events", n),
            Self::Closed => f.write_str("feed closed")
        }
    }
}

impl<D: std::error::Error + 'static> std::error::Error for StreamError<D> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Database(e) => Some(e),
            Self::Deserialize(_) | Self::Lagged(_) | Self::Closed => None
        }
    }
}

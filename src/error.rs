// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Crate error type.
//!
//! Every failure reported by a backend (database, identity provider,
//! in-memory store) enters through [`Error::from_backend`], which recognizes
//! expired or invalid sessions before anything else. Callers never display
//! a session error inline; the HTTP layer turns it into a redirect to the
//! login screen of the caller's [`Audience`].

use masterror::AppError;
use workorder_core::{Denied, PayloadError, TransitionError};

/// Substrings (lowercase) that identify an expired or invalid session.
const SESSION_MARKERS: &[&str] = &[
    "jwt expired",
    "invalid jwt",
    "invalid refresh token",
    "refresh token not found",
    "session not found",
    "session_not_found",
    "token is expired",
    "invalid claim"
];

/// Result alias for crate operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Error type for workorder operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Session expired or invalid; the caller must log in again.
    #[error("session expired: {0}")]
    SessionExpired(String),

    /// Work does not exist or was soft-deleted.
    #[error("work {0} not found")]
    WorkNotFound(i64),

    /// Worker does not exist or was soft-deleted.
    #[error("worker {0} not found")]
    WorkerNotFound(i64),

    /// Other record not found.
    #[error("{kind} {id} not found")]
    NotFound {
        /// Record kind.
        kind: &'static str,
        /// Record id.
        id:   i64
    },

    /// Transition refused by its allow-list or claim rules.
    #[error(transparent)]
    Transition(#[from] TransitionError),

    /// Stored status changed between the check and the commit.
    #[error("work {0} changed while the transition was being committed")]
    StaleStatus(i64),

    /// QR payload did not identify a work.
    #[error("invalid QR payload: {0}")]
    Payload(#[from] PayloadError),

    /// Request data failed validation.
    #[error("validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),

    /// Policy refused the operation.
    #[error(transparent)]
    Forbidden(#[from] Denied),

    /// Scan session is not in the state the operation needs.
    #[error("scan session is {actual}, expected {expected}")]
    InvalidScanState {
        /// State required by the operation.
        expected: &'static str,
        /// Current state.
        actual:   &'static str
    },

    /// Account provisioning failed after the identity was created.
    #[error("provisioning failed: {source}{}", compensation_note(.compensation_error))]
    Provision {
        /// Error of the dependent write.
        source:             Box<Error>,
        /// Failure to delete the new identity, if any.
        compensation_error: Option<String>
    },

    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Any other backend failure.
    #[error("backend error: {0}")]
    Backend(String)
}

fn compensation_note(compensation_error: &Option<String>) -> String {
    match compensation_error {
        Some(e) => format!(" (identity cleanup also failed: {e})"),
        None => String::new()
    }
}

impl Error {
    /// Classify a backend error message.
    ///
    /// Session markers are checked first so that expiry is never reported
    /// as a generic failure.
    pub fn from_backend(message: impl Into<String>) -> Self {
        let message = message.into();
        if is_session_expired(&message) {
            Self::SessionExpired(message)
        } else {
            Self::Backend(message)
        }
    }

    /// Check if this error requires a new login.
    pub fn is_session_expired(&self) -> bool {
        match self {
            Self::SessionExpired(_) => true,
            Self::Provision {
                source, ..
            } => source.is_session_expired(),
            _ => false
        }
    }

    /// Check if the error reports a missing record.
    pub const fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::WorkNotFound(_) | Self::WorkerNotFound(_) | Self::NotFound { .. }
        )
    }

    /// Login screen to send the caller to, if this is a session error.
    pub fn login_redirect(&self, audience: Audience) -> Option<&'static str> {
        if self.is_session_expired() {
            Some(audience.login_path())
        } else {
            None
        }
    }
}

/// Conversion of backend results into crate results.
pub trait ErrInto<T> {
    /// Convert the error through its `Into<Error>` impl.
    fn err_into(self) -> Result<T>;
}

impl<T, E: Into<Error>> ErrInto<T> for std::result::Result<T, E> {
    fn err_into(self) -> Result<T> {
        self.map_err(Into::into)
    }
}

/// Check if a backend message reports an expired or invalid session.
pub fn is_session_expired(message: &str) -> bool {
    let lower = message.to_ascii_lowercase();
    SESSION_MARKERS.iter().any(|marker| lower.contains(marker))
}

/// Which login screen a caller belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Audience {
    /// Office administrators.
    Admin,
    /// Workers.
    #[default]
    Worker
}

impl Audience {
    /// Path of the audience's login screen.
    pub const fn login_path(&self) -> &'static str {
        match self {
            Self::Admin => "/admin/login",
            Self::Worker => "/worker/login"
        }
    }
}

#[cfg(feature = "postgres")]
impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        Self::from_backend(err.to_string())
    }
}

impl From<Error> for AppError {
    fn from(err: Error) -> Self {
        match err {
            Error::SessionExpired(msg) => AppError::unauthorized(msg),
            e @ (Error::WorkNotFound(_) | Error::WorkerNotFound(_) | Error::NotFound { .. }) => {
                AppError::not_found(e.to_string())
            }
            e @ (Error::Transition(_) | Error::StaleStatus(_)) => AppError::conflict(e.to_string()),
            e @ (Error::Payload(_) | Error::Validation(_) | Error::InvalidScanState { .. }) => {
                AppError::bad_request(e.to_string())
            }
            Error::Forbidden(denied) => AppError::forbidden(denied.to_string()),
            Error::Provision {
                source, ..
            } => AppError::from(*source),
            e @ (Error::Config(_) | Error::Backend(_)) => AppError::internal(e.to_string())
        }
    }
}

// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Two-phase QR scan sessions.
//!
//! A session moves through detection, operator confirmation and commit:
//!
//! ```text
//! Scanning ──invalid──▶ Cooldown ──rearm delay──▶ Scanning
//!    │
//!    └──valid──▶ Detected ──confirm──▶ Committing ──finish──▶ Committed | Rejected
//! ```
//!
//! Frames offered outside `Scanning` are ignored, so a detected code is
//! never replaced before the operator acts on it. Committing itself is done
//! by [`WorkService::commit_scan`](crate::service::WorkService::commit_scan);
//! the session only records the outcome.

pub mod runner;

use tokio::time::Instant;
use workorder_core::{PayloadError, Work, WorkStatus, parse_payload};

pub use self::runner::{FrameSource, ScanEvent, ScanHandle, ScanLoop};
use crate::{
    config::ScanConfig,
    error::{Error, Result}
};

/// State of a scan session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanState {
    /// Accepting frames.
    Scanning,
    /// Paused after an invalid payload.
    Cooldown {
        /// When frames are accepted again.
        until: Instant
    },
    /// A work id was read; waiting for the operator.
    Detected {
        /// Detected work.
        work_id: i64
    },
    /// Operator confirmed; the transition is being applied.
    Committing {
        /// Work being updated.
        work_id: i64
    },
    /// Transition applied.
    Committed {
        /// Updated work.
        work_id: i64,
        /// Stored status after the commit.
        status:  WorkStatus
    },
    /// Transition refused or failed.
    Rejected {
        /// Work the transition targeted.
        work_id: i64,
        /// Error message.
        reason:  String
    },
    /// Session torn down.
    Stopped
}

impl ScanState {
    /// Short state name.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Scanning => "scanning",
            Self::Cooldown {
                ..
            } => "cooldown",
            Self::Detected {
                ..
            } => "detected",
            Self::Committing {
                ..
            } => "committing",
            Self::Committed {
                ..
            } => "committed",
            Self::Rejected {
                ..
            } => "rejected",
            Self::Stopped => "stopped"
        }
    }

    /// Whether a frame offered at `now` could be decoded.
    ///
    /// False while a detection awaits the operator or after it was
    /// committed; the camera is not polled then.
    pub fn accepts_frames(&self, now: Instant) -> bool {
        match *self {
            Self::Scanning => true,
            Self::Cooldown {
                until
            } => now >= until,
            _ => false
        }
    }
}

/// Result of offering a frame to a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameOutcome {
    /// Valid payload; the session is now `Detected`.
    Detected(i64),
    /// Payload did not name a work; the session cools down.
    Invalid(PayloadError),
    /// Too soon after the previous decode.
    Throttled,
    /// Session is not accepting frames.
    Ignored
}

/// One scan session.
#[derive(Debug, Clone)]
pub struct ScanSession {
    config:      ScanConfig,
    state:       ScanState,
    last_decode: Option<Instant>
}

impl ScanSession {
    /// Start a session in `Scanning`.
    pub fn new(config: ScanConfig) -> Self {
        Self {
            config,
            state: ScanState::Scanning,
            last_decode: None
        }
    }

    /// Current state.
    pub fn state(&self) -> &ScanState {
        &self.state
    }

    /// Offer a decoded QR payload seen at `now`.
    pub fn offer_frame(&mut self, payload: &str, now: Instant) -> FrameOutcome {
        if let ScanState::Cooldown {
            until
        } = self.state
            && now >= until
        {
            self.state = ScanState::Scanning;
        }
        if self.state != ScanState::Scanning {
            return FrameOutcome::Ignored;
        }
        if let Some(last) = self.last_decode
            && now.duration_since(last) < self.config.decode_interval
        {
            return FrameOutcome::Throttled;
        }
        self.last_decode = Some(now);

        match parse_payload(payload) {
            Ok(work_id) => {
                self.state = ScanState::Detected {
                    work_id
                };
                FrameOutcome::Detected(work_id)
            }
            Err(e) => {
                self.state = ScanState::Cooldown {
                    until: now + self.config.rearm_delay
                };
                FrameOutcome::Invalid(e)
            }
        }
    }

    /// Operator confirmation; moves `Detected` to `Committing`.
    pub fn confirm(&mut self) -> Result<i64> {
        match self.state {
            ScanState::Detected {
                work_id
            } => {
                self.state = ScanState::Committing {
                    work_id
                };
                Ok(work_id)
            }
            ref other => Err(self.invalid("detected", other))
        }
    }

    /// Record the commit outcome; moves `Committing` to a terminal state.
    pub fn finish(&mut self, outcome: &Result<Work>) -> Result<()> {
        let ScanState::Committing {
            work_id
        } = self.state
        else {
            return Err(self.invalid("committing", &self.state));
        };
        self.state = match outcome {
            Ok(work) => ScanState::Committed {
                work_id,
                status: work.status
            },
            Err(e) => ScanState::Rejected {
                work_id,
                reason: e.to_string()
            }
        };
        Ok(())
    }

    /// Return to `Scanning`, dropping any detected or finished work.
    ///
    /// Allowed any number of times, except while committing or after stop.
    pub fn rescan(&mut self) -> Result<()> {
        match self.state {
            ScanState::Committing {
                ..
            }
            | ScanState::Stopped => Err(self.invalid("scanning, detected or finished", &self.state)),
            _ => {
                self.state = ScanState::Scanning;
                self.last_decode = None;
                Ok(())
            }
        }
    }

    /// Tear the session down.
    pub fn stop(&mut self) {
        self.state = ScanState::Stopped;
    }

    fn invalid(&self, expected: &'static str, actual: &ScanState) -> Error {
        Error::InvalidScanState {
            expected,
            actual: actual.name()
        }
    }
}

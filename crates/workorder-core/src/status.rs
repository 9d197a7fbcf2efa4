// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Work lifecycle status.
//!
//! A status has two independent orderings:
//!
//! | Status | Storage code | Display priority |
//! |--------|--------------|------------------|
//! | [`Requesting`](WorkStatus::Requesting) | 0 | 5 |
//! | [`RequestPlanned`](WorkStatus::RequestPlanned) | 1 | 6 |
//! | [`InProgress`](WorkStatus::InProgress) | 2 | 1 |
//! | [`WaitingDropOff`](WorkStatus::WaitingDropOff) | 3 | 3 |
//! | [`PickupRequesting`](WorkStatus::PickupRequesting) | 4 | 4 |
//! | [`InDelivery`](WorkStatus::InDelivery) | 5 | 2 |
//! | [`Completed`](WorkStatus::Completed) | 6 | 7 |
//! | [`Other`](WorkStatus::Other) | any | 8 |
//!
//! Sorting must go through [`WorkStatus::priority`]; the storage code only
//! identifies the value in the database.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Priority assigned to statuses outside the known set.
pub const UNKNOWN_PRIORITY: u8 = 8;

/// Lifecycle status of a work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "i16", into = "i16")]
pub enum WorkStatus {
    /// Created and waiting for a worker.
    Requesting,

    /// Planned for a worker but not started.
    RequestPlanned,

    /// A worker scanned the work and is performing it.
    InProgress,

    /// Finished, waiting for the worker to drop it off.
    WaitingDropOff,

    /// Finished, waiting for an administrator to pick it up.
    PickupRequesting,

    /// Finished, being delivered.
    InDelivery,

    /// Received and closed.
    Completed,

    /// Storage code that does not map to a known status.
    Other(i16)
}

impl WorkStatus {
    /// Known statuses in storage order.
    pub const ALL: [WorkStatus; 7] = [
        Self::Requesting,
        Self::RequestPlanned,
        Self::InProgress,
        Self::WaitingDropOff,
        Self::PickupRequesting,
        Self::InDelivery,
        Self::Completed
    ];

    /// Decode a storage code. Unknown codes become [`WorkStatus::Other`].
    pub const fn from_code(code: i16) -> Self {
        match code {
            0 => Self::Requesting,
            1 => Self::RequestPlanned,
            2 => Self::InProgress,
            3 => Self::WaitingDropOff,
            4 => Self::PickupRequesting,
            5 => Self::InDelivery,
            6 => Self::Completed,
            other => Self::Other(other)
        }
    }

    /// Storage code written to the database.
    pub const fn code(&self) -> i16 {
        match self {
            Self::Requesting => 0,
            Self::RequestPlanned => 1,
            Self::InProgress => 2,
            Self::WaitingDropOff => 3,
            Self::PickupRequesting => 4,
            Self::InDelivery => 5,
            Self::Completed => 6,
            Self::Other(code) => *code
        }
    }

    /// Display priority, lower sorts first.
    pub const fn priority(&self) -> u8 {
        match self {
            Self::InProgress => 1,
            Self::InDelivery => 2,
            Self::WaitingDropOff => 3,
            Self::PickupRequesting => 4,
            Self::Requesting => 5,
            Self::RequestPlanned => 6,
            Self::Completed => 7,
            Self::Other(_) => UNKNOWN_PRIORITY
        }
    }

    /// Whether the code maps to one of the seven known statuses.
    pub const fn is_known(&self) -> bool {
        !matches!(self, Self::Other(_))
    }

    /// Human-readable label.
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Requesting => "requesting",
            Self::RequestPlanned => "request planned",
            Self::InProgress => "in progress",
            Self::WaitingDropOff => "waiting drop-off",
            Self::PickupRequesting => "pickup requesting",
            Self::InDelivery => "in delivery",
            Self::Completed => "completed",
            Self::Other(_) => "unknown"
        }
    }
}

impl From<i16> for WorkStatus {
    fn from(code: i16) -> Self {
        Self::from_code(code)
    }
}

impl From<WorkStatus> for i16 {
    fn from(status: WorkStatus) -> Self {
        status.code()
    }
}

impl fmt::Display for WorkStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Other(code) => write!(f, "unknown({code})"),
            known => f.write_str(known.label())
        }
    }
}

// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Work and worker records.

use std::{fmt, str::FromStr};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::status::WorkStatus;

/// One unit of assignable, billable piecework.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Work {
    /// Numeric identifier, also encoded in QR labels.
    pub id:              i64,
    /// Short description shown in lists.
    pub title:           String,
    /// Current lifecycle status.
    pub status:          WorkStatus,
    /// Assigned worker, `None` while unclaimed.
    pub worker_id:       Option<i64>,
    /// Number of units to produce.
    pub quantity:        i32,
    /// Price per unit in minor currency units.
    pub unit_price:      i64,
    /// `quantity * unit_price * price_ratio`, see [`compute_cost`].
    pub cost:            i64,
    /// Scheduled delivery.
    pub delivery_at:     Option<DateTime<Utc>>,
    /// Actual delivery, stamped on completion.
    pub delivered_at:    Option<DateTime<Utc>>,
    /// Method chosen by the worker once finished.
    pub delivery_method: Option<DeliveryMethod>,
    /// Linked instructional video.
    pub video_id:        Option<i64>,
    /// Creation timestamp.
    pub created_at:      DateTime<Utc>,
    /// Last modification timestamp.
    pub updated_at:      DateTime<Utc>,
    /// Soft-delete marker.
    pub deleted_at:      Option<DateTime<Utc>>
}

impl Work {
    /// Whether the record carries a soft-delete marker.
    pub const fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Worker other than `worker_id` holding the work, if any.
    pub fn other_claimant(&self, worker_id: i64) -> Option<i64> {
        self.worker_id.filter(|&assigned| assigned != worker_id)
    }
}

/// A person who performs works.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Worker {
    /// Numeric identifier.
    pub id:            i64,
    /// Display name.
    pub name:          String,
    /// Contact and login email.
    pub email:         String,
    /// Authentication identity in the identity provider.
    pub identity_id:   Uuid,
    /// Postal address used for pickups.
    pub address:       Option<String>,
    /// Date of birth.
    pub birth_date:    Option<NaiveDate>,
    /// Next scheduled visit by an administrator.
    pub next_visit_on: Option<NaiveDate>,
    /// Multiplier applied to the cost of works assigned to this worker.
    pub price_ratio:   f64,
    /// Assigned group.
    pub group_id:      Option<i64>,
    /// Assigned skill rank.
    pub skill_rank_id: Option<i64>,
    /// Registration timestamp.
    pub created_at:    DateTime<Utc>,
    /// Soft-delete marker.
    pub deleted_at:    Option<DateTime<Utc>>
}

/// How a finished work leaves the worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryMethod {
    /// The worker delivers it.
    Delivery,

    /// An administrator picks it up.
    Pickup,

    /// The worker drops it off at the office.
    DropOff
}

impl DeliveryMethod {
    /// Status a work moves to once this method is chosen.
    pub const fn status(&self) -> WorkStatus {
        match self {
            Self::Delivery => WorkStatus::InDelivery,
            Self::Pickup => WorkStatus::PickupRequesting,
            Self::DropOff => WorkStatus::WaitingDropOff
        }
    }

    /// Stable text form used in storage.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Delivery => "delivery",
            Self::Pickup => "pickup",
            Self::DropOff => "drop_off"
        }
    }
}

impl fmt::Display for DeliveryMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unrecognized delivery method text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown delivery method `{0}`")]
pub struct UnknownDeliveryMethod(pub String);

impl FromStr for DeliveryMethod {
    type Err = UnknownDeliveryMethod;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "delivery" => Ok(Self::Delivery),
            "pickup" => Ok(Self::Pickup),
            "drop_off" => Ok(Self::DropOff),
            other => Err(UnknownDeliveryMethod(other.to_string()))
        }
    }
}

/// Cost of a work for a worker, rounded to the nearest minor unit.
///
/// Unassigned works use a ratio of `1.0`.
pub fn compute_cost(quantity: i32, unit_price: i64, price_ratio: f64) -> i64 {
    (f64::from(quantity) * unit_price as f64 * price_ratio).round() as i64
}

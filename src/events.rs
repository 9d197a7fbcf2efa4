// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Change events for the works table.

use serde::{Deserialize, Serialize};
use workorder_core::{EntityEvent, EventKind, Work};

/// Notification channel for works events.
pub const WORKS_CHANNEL: &str = "entity_works";

/// Change to a work record.
///
/// Serialized as the Postgres NOTIFY payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WorkEvent {
    /// Work was created.
    Created {
        /// New record.
        entity: Work
    },
    /// Work fields or status changed.
    Updated {
        /// Record before the change.
        old: Work,
        /// Record after the change.
        new: Work
    },
    /// Work was soft-deleted.
    SoftDeleted {
        /// Work id.
        id: i64
    },
    /// Work was permanently removed.
    HardDeleted {
        /// Work id.
        id: i64
    },
    /// Work was restored from soft-delete.
    Restored {
        /// Work id.
        id: i64
    }
}

impl WorkEvent {
    /// Created event.
    pub const fn created(entity: Work) -> Self {
        Self::Created {
            entity
        }
    }

    /// Updated event.
    pub const fn updated(old: Work, new: Work) -> Self {
        Self::Updated {
            old,
            new
        }
    }

    /// Soft-deleted event.
    pub const fn soft_deleted(id: i64) -> Self {
        Self::SoftDeleted {
            id
        }
    }

    /// Hard-deleted event.
    pub const fn hard_deleted(id: i64) -> Self {
        Self::HardDeleted {
            id
        }
    }

    /// Restored event.
    pub const fn restored(id: i64) -> Self {
        Self::Restored {
            id
        }
    }
}

impl EntityEvent for WorkEvent {
    type Id = i64;

    fn kind(&self) -> EventKind {
        match self {
            Self::Created {
                ..
            } => EventKind::Created,
            Self::Updated {
                ..
            } => EventKind::Updated,
            Self::SoftDeleted {
                ..
            } => EventKind::SoftDeleted,
            Self::HardDeleted {
                ..
            } => EventKind::HardDeleted,
            Self::Restored {
                ..
            } => EventKind::Restored
        }
    }

    fn entity_id(&self) -> &i64 {
        match self {
            Self::Created {
                entity
            } => &entity.id,
            Self::Updated {
                new, ..
            } => &new.id,
            Self::SoftDeleted {
                id
            }
            | Self::HardDeleted {
                id
            }
            | Self::Restored {
                id
            } => id
        }
    }
}

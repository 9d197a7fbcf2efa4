// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Actors and authorization vocabulary.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Who is calling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum Role {
    /// Office administrator.
    Admin,

    /// Worker with their roster id.
    Worker {
        /// Worker record id.
        worker_id: i64
    }
}

/// Authenticated caller of an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Actor {
    /// Identity in the identity provider.
    pub identity: Uuid,

    /// Role resolved for the identity.
    pub role: Role
}

impl Actor {
    /// Administrator actor.
    pub const fn admin(identity: Uuid) -> Self {
        Self {
            identity,
            role: Role::Admin
        }
    }

    /// Worker actor.
    pub const fn worker(identity: Uuid, worker_id: i64) -> Self {
        Self {
            identity,
            role: Role::Worker {
                worker_id
            }
        }
    }

    /// Check if the actor is an administrator.
    pub const fn is_admin(&self) -> bool {
        matches!(self.role, Role::Admin)
    }

    /// Worker id when the actor is a worker.
    pub const fn worker_id(&self) -> Option<i64> {
        match self.role {
            Role::Worker {
                worker_id
            } => Some(worker_id),
            Role::Admin => None
        }
    }
}

/// Operation kind for policy checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PolicyOperation {
    /// Create a new record.
    Create,
    /// Read a single record.
    Read,
    /// Update an existing record.
    Update,
    /// Delete or restore a record.
    Delete,
    /// List records.
    List,
    /// Apply a status transition.
    Transition
}

impl PolicyOperation {
    /// Lowercase name for messages and logs.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Read => "read",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::List => "list",
            Self::Transition => "transition"
        }
    }
}

/// Authorization denial.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Denied {
    /// Operation that was refused.
    pub operation: PolicyOperation,

    /// Reason shown to the operator.
    pub reason: String
}

impl Denied {
    /// Create a denial for `operation`.
    pub fn new(operation: PolicyOperation, reason: impl Into<String>) -> Self {
        Self {
            operation,
            reason: reason.into()
        }
    }
}

impl fmt::Display for Denied {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} denied: {}", self.operation.as_str(), self.reason)
    }
}

impl std::error::Error for Denied {}

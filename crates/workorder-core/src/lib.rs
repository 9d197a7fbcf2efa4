// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Domain core for workorder.
//!
//! Pure logic shared by every storage backend and surface. Nothing here
//! performs I/O.
//!
//! # Overview
//!
//! - [`WorkStatus`]: Seven-value lifecycle status with a display priority
//!   distinct from its storage code
//! - [`sort_works`]: Stable priority/delivery-date ordering for work lists
//! - [`parse_payload`]: `workid:<id>` QR payload extraction
//! - [`Transition`]: Allow-listed status transitions producing a guarded
//!   [`StatusChange`]
//! - [`Actor`]: Authenticated caller and role
//! - [`Repository`]: Base trait for storage backends
//! - [`prelude`]: Convenient re-exports
//!
//! # Usage
//!
//! ```rust
//! use workorder_core::prelude::*;
//!
//! let id = parse_payload("WORKID:#42").unwrap();
//! assert_eq!(id, 42);
//! assert!(Transition::Complete.allows(WorkStatus::InDelivery));
//! assert!(!Transition::Complete.allows(WorkStatus::InProgress));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod model;
pub mod policy;
pub mod prelude;
pub mod qr;
pub mod sort;
pub mod status;
pub mod stream;
pub mod transition;

pub use model::{DeliveryMethod, Work, Worker, compute_cost};
pub use policy::{Actor, Denied, PolicyOperation, Role};
pub use qr::{PayloadError, encode_payload, extract_work_token, parse_payload};
pub use sort::{compare_works, sort_works};
pub use status::WorkStatus;
pub use stream::StreamError;
pub use transition::{StatusChange, Transition, TransitionError};

/// Base repository trait.
///
/// Every storage backend implements this once; the per-entity repository
/// traits (`WorkRepository`, `WorkerRepository`, ...) extend it and share its
/// error type.
///
/// # Associated Types
///
/// - `Error`: Error type for repository operations
/// - `Pool`: Underlying connection pool or store handle
pub trait Repository: Send + Sync {
    /// Error type for repository operations.
    ///
    /// Must implement `std::error::Error + Send + Sync` for async
    /// compatibility.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Underlying pool or store type.
    type Pool;

    /// Get reference to the underlying pool.
    fn pool(&self) -> &Self::Pool;
}

#[cfg(feature = "postgres")]
impl Repository for sqlx::PgPool {
    type Error = sqlx::Error;
    type Pool = sqlx::PgPool;

    fn pool(&self) -> &Self::Pool {
        self
    }
}

/// Pagination parameters for list operations.
///
/// # Example
///
/// ```rust
/// use workorder_core::Pagination;
///
/// let page = Pagination::new(10, 0); // First 10 items
/// let next = Pagination::new(10, 10); // Next 10 items
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    /// Maximum number of results to return.
    pub limit: i64,

    /// Number of results to skip.
    pub offset: i64
}

impl Pagination {
    /// Largest page a caller may request.
    pub const MAX_LIMIT: i64 = 500;

    /// Create new pagination parameters, clamping `limit` to
    /// `1..=MAX_LIMIT` and `offset` to non-negative values.
    pub const fn new(limit: i64, offset: i64) -> Self {
        let limit = if limit < 1 {
            1
        } else if limit > Self::MAX_LIMIT {
            Self::MAX_LIMIT
        } else {
            limit
        };
        let offset = if offset < 0 { 0 } else { offset };
        Self {
            limit,
            offset
        }
    }

    /// Check whether the `index`-th record of a full listing falls in
    /// this page.
    pub const fn contains(&self, index: i64) -> bool {
        index >= self.offset && index < self.offset + self.limit
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            limit:  100,
            offset: 0
        }
    }
}

/// Kind of lifecycle event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// Record was created.
    Created,

    /// Record was updated, including status transitions.
    Updated,

    /// Record was soft-deleted.
    SoftDeleted,

    /// Record was hard-deleted (permanently removed).
    HardDeleted,

    /// Record was restored from soft-delete.
    Restored
}

/// Base trait for record change events.
///
/// # Example
///
/// ```rust,ignore
/// fn log_event<E: EntityEvent>(event: &E) {
///     tracing::debug!(kind = ?event.kind(), id = ?event.entity_id(), "change observed");
/// }
/// ```
pub trait EntityEvent: Send + Sync + std::fmt::Debug {
    /// Type of record ID.
    type Id;

    /// Get the kind of event.
    fn kind(&self) -> EventKind;

    /// Get the record ID associated with this event.
    fn entity_id(&self) -> &Self::Id;
}

/// Kind of business command.
///
/// Used for auditing and routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    /// Creates a new record (e.g., ProvisionWorker).
    Create,

    /// Modifies an existing record (e.g., StartWork, CompleteWork).
    Update,

    /// Removes a record.
    Delete,

    /// Operation that doesn't fit CRUD.
    Custom
}

/// Base trait for business commands.
///
/// # Example
///
/// ```rust,ignore
/// fn audit<C: EntityCommand>(cmd: &C) {
///     tracing::info!(command = cmd.name(), kind = ?cmd.kind(), "executing");
/// }
/// ```
pub trait EntityCommand: Send + Sync + std::fmt::Debug {
    /// Get the kind of command for categorization.
    fn kind(&self) -> CommandKind;

    /// Get the command name as a string for logging/auditing.
    fn name(&self) -> &'static str;
}

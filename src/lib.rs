// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! # workorder
//!
//! Backend for a piecework office: administrators plan works and assign
//! them to home workers, workers pick works up by scanning a QR label,
//! choose how finished goods travel back, and the office closes them out.
//!
//! ## Overview
//!
//! - [`service::WorkService`]: works operations guarded by a
//!   [`policy::WorkPolicy`]
//! - [`scan`]: two-phase scan, confirm and commit session plus the camera
//!   loop that feeds it
//! - [`repository`]: storage traits with PostgreSQL and in-memory backends
//! - [`subscriber`] and [`cache`]: realtime works change feed and the list
//!   cache it keeps fresh
//! - [`account`]: administrators and compensated account provisioning
//! - [`catalog`]: groups, skill ranks, videos and notification emails
//! - [`api`]: axum router over all of the above
//! - [`error`]: crate error type with session-expiry classification
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//!
//! use workorder::{api, repository::memory::{MemoryIdentities, MemoryStore}};
//!
//! let state = Arc::new(api::AppState::new(MemoryStore::new(), MemoryIdentities::new()));
//! let app = api::router(state);
//! ```

#![warn(clippy::all)]

pub mod account;
pub mod api;
pub mod cache;
pub mod catalog;
pub mod config;
pub mod error;
pub mod events;
pub mod policy;
pub mod repository;
pub mod scan;
pub mod service;
pub mod subscriber;

pub use workorder_core;
pub use workorder_core::prelude;

pub use crate::{
    config::Config,
    error::{Error, Result},
    events::{WORKS_CHANNEL, WorkEvent},
    service::WorkService
};

// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Convenient re-exports for common usage.
//!
//! # Usage
//!
//! ```rust,ignore
//! use workorder_core::prelude::*;
//! ```

pub use crate::{
    CommandKind, EntityCommand, EntityEvent, EventKind, Pagination, Repository,
    model::{DeliveryMethod, Work, Worker, compute_cost},
    policy::{Actor, Denied, PolicyOperation, Role},
    qr::{PayloadError, encode_payload, extract_work_token, parse_payload},
    sort::{compare_works, sort_works},
    status::WorkStatus,
    stream::StreamError,
    transition::{StatusChange, Transition, TransitionError}
};

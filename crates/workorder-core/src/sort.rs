// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Display ordering for work lists.
//!
//! The order cannot be expressed as a single-column `ORDER BY`: it is a
//! custom permutation of the status set followed by the scheduled delivery
//! date.
//!
//! 1. Ascending [`WorkStatus::priority`](crate::WorkStatus::priority).
//! 2. Ascending `delivery_at`; works without a date come after dated ones.
//!
//! Works equal on both keys keep their input order.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};

use crate::model::Work;

/// Return a sorted copy of `works`.
///
/// The input is left untouched.
///
/// # Example
///
/// ```rust,ignore
/// let board = sort_works(&repo.list(filter, page).await?);
/// ```
pub fn sort_works(works: &[Work]) -> Vec<Work> {
    let mut sorted = works.to_vec();
    // `sort_by` is stable.
    sorted.sort_by(compare_works);
    sorted
}

/// Total order used by [`sort_works`].
pub fn compare_works(a: &Work, b: &Work) -> Ordering {
    a.status
        .priority()
        .cmp(&b.status.priority())
        .then_with(|| compare_delivery(a.delivery_at, b.delivery_at))
}

fn compare_delivery(a: Option<DateTime<Utc>>, b: Option<DateTime<Utc>>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal
    }
}

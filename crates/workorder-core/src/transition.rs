// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Guarded status transitions.
//!
//! Each transition has a fixed allow-list of source statuses. A work outside
//! the list is refused; it is never overwritten.
//!
//! | Transition | Allowed from | Moves to |
//! |------------|--------------|----------|
//! | [`Start`](Transition::Start) | requesting, request planned | in progress |
//! | [`Complete`](Transition::Complete) | in delivery, pickup requesting, waiting drop-off | completed |
//! | [`ChooseDelivery`](Transition::ChooseDelivery) | in progress, in delivery, pickup requesting, waiting drop-off | per method |
//!
//! `Start` also requires the work to be unclaimed or already claimed by the
//! same worker; `ChooseDelivery` requires the work to be assigned to the
//! worker.
//!
//! A successful [`Transition::check`] yields a [`StatusChange`], which storage
//! applies as a compare-and-set on the status read during the check.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    CommandKind, EntityCommand,
    model::{DeliveryMethod, Work},
    status::WorkStatus
};

const START_FROM: &[WorkStatus] = &[WorkStatus::Requesting, WorkStatus::RequestPlanned];

const COMPLETE_FROM: &[WorkStatus] = &[
    WorkStatus::InDelivery,
    WorkStatus::PickupRequesting,
    WorkStatus::WaitingDropOff
];

const CHOOSE_DELIVERY_FROM: &[WorkStatus] = &[
    WorkStatus::InProgress,
    WorkStatus::InDelivery,
    WorkStatus::PickupRequesting,
    WorkStatus::WaitingDropOff
];

/// Status change requested for a work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "transition", rename_all = "snake_case")]
pub enum Transition {
    /// A worker claims the work and starts it.
    Start {
        /// Worker taking the work.
        worker_id: i64
    },

    /// The finished work was received.
    Complete,

    /// The assigned worker picks how the work leaves them.
    ChooseDelivery {
        /// Worker making the choice.
        worker_id: i64,
        /// Chosen method.
        method:    DeliveryMethod
    }
}

impl Transition {
    /// Status the work ends up in.
    pub const fn target(&self) -> WorkStatus {
        match self {
            Self::Start {
                ..
            } => WorkStatus::InProgress,
            Self::Complete => WorkStatus::Completed,
            Self::ChooseDelivery {
                method, ..
            } => method.status()
        }
    }

    /// Statuses this transition may start from.
    pub const fn allowed_sources(&self) -> &'static [WorkStatus] {
        match self {
            Self::Start {
                ..
            } => START_FROM,
            Self::Complete => COMPLETE_FROM,
            Self::ChooseDelivery {
                ..
            } => CHOOSE_DELIVERY_FROM
        }
    }

    /// Check whether `status` is in the allow-list.
    pub fn allows(&self, status: WorkStatus) -> bool {
        self.allowed_sources().contains(&status)
    }

    /// Validate the transition against the stored work.
    ///
    /// On success returns the change to commit; `now` stamps the actual
    /// delivery time on completion.
    pub fn check(&self, work: &Work, now: DateTime<Utc>) -> Result<StatusChange, TransitionError> {
        if work.is_deleted() {
            return Err(TransitionError::Deleted {
                work_id: work.id
            });
        }
        if !self.allows(work.status) {
            return Err(TransitionError::NotAllowed {
                work_id: work.id,
                from:    work.status,
                to:      self.target()
            });
        }

        let mut change = StatusChange {
            work_id:         work.id,
            expected:        work.status,
            status:          self.target(),
            worker_id:       work.worker_id,
            delivery_method: work.delivery_method,
            delivered_at:    work.delivered_at
        };

        match *self {
            Self::Start {
                worker_id
            } => {
                if let Some(claimant) = work.other_claimant(worker_id) {
                    return Err(TransitionError::ClaimedByOther {
                        work_id: work.id,
                        claimant
                    });
                }
                change.worker_id = Some(worker_id);
            }
            Self::Complete => {
                change.delivered_at = Some(now);
            }
            Self::ChooseDelivery {
                worker_id,
                method
            } => match work.worker_id {
                Some(assigned) if assigned == worker_id => {
                    change.delivery_method = Some(method);
                }
                Some(claimant) => {
                    return Err(TransitionError::ClaimedByOther {
                        work_id: work.id,
                        claimant
                    });
                }
                None => {
                    return Err(TransitionError::NotAssigned {
                        work_id: work.id
                    });
                }
            }
        }

        Ok(change)
    }
}

impl EntityCommand for Transition {
    fn kind(&self) -> CommandKind {
        CommandKind::Update
    }

    fn name(&self) -> &'static str {
        match self {
            Self::Start {
                ..
            } => "start_work",
            Self::Complete => "complete_work",
            Self::ChooseDelivery {
                ..
            } => "choose_delivery"
        }
    }
}

/// Guarded update produced by [`Transition::check`].
///
/// Storage must apply it only while the stored status still equals
/// `expected`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusChange {
    /// Work to update.
    pub work_id:         i64,
    /// Status observed when the transition was checked.
    pub expected:        WorkStatus,
    /// New status.
    pub status:          WorkStatus,
    /// Assigned worker after the change.
    pub worker_id:       Option<i64>,
    /// Delivery method after the change.
    pub delivery_method: Option<DeliveryMethod>,
    /// Actual delivery time after the change.
    pub delivered_at:    Option<DateTime<Utc>>
}

/// Refused transition.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    /// Stored status is outside the allow-list.
    #[error("work {work_id} cannot move from {from} to {to}")]
    NotAllowed {
        /// Work id.
        work_id: i64,
        /// Stored status.
        from:    WorkStatus,
        /// Requested status.
        to:      WorkStatus
    },

    /// Another worker holds the work.
    #[error("work {work_id} is already claimed by worker {claimant}")]
    ClaimedByOther {
        /// Work id.
        work_id:  i64,
        /// Worker holding it.
        claimant: i64
    },

    /// Delivery chosen for a work nobody holds.
    #[error("work {work_id} is not assigned to any worker")]
    NotAssigned {
        /// Work id.
        work_id: i64
    },

    /// Work was soft-deleted.
    #[error("work {work_id} has been deleted")]
    Deleted {
        /// Work id.
        work_id: i64
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn work(status: WorkStatus, worker_id: Option<i64>) -> Work {
        let at = Utc.with_ymd_and_hms(2025, 2, 1, 8, 0, 0).unwrap();
        Work {
            id: 1,
            title: "hemming".into(),
            status,
            worker_id,
            quantity: 10,
            unit_price: 50,
            cost: 500,
            delivery_at: None,
            delivered_at: None,
            delivery_method: None,
            video_id: None,
            created_at: at,
            updated_at: at,
            deleted_at: None
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 2, 3, 17, 30, 0).unwrap()
    }

    #[test]
    fn complete_only_from_pre_completion_statuses() {
        for status in WorkStatus::ALL {
            let result = Transition::Complete.check(&work(status, Some(2)), now());
            let expected_ok = matches!(
                status,
                WorkStatus::InDelivery | WorkStatus::PickupRequesting | WorkStatus::WaitingDropOff
            );
            assert_eq!(result.is_ok(), expected_ok, "status {status}");
        }
    }

    #[test]
    fn complete_refusal_names_statuses() {
        let err = Transition::Complete
            .check(&work(WorkStatus::InProgress, Some(2)), now())
            .unwrap_err();
        assert_eq!(
            err,
            TransitionError::NotAllowed {
                work_id: 1,
                from:    WorkStatus::InProgress,
                to:      WorkStatus::Completed
            }
        );
    }

    #[test]
    fn complete_stamps_delivery_time_and_keeps_assignment() {
        let change = Transition::Complete
            .check(&work(WorkStatus::InDelivery, Some(2)), now())
            .expect("allowed");
        assert_eq!(change.expected, WorkStatus::InDelivery);
        assert_eq!(change.status, WorkStatus::Completed);
        assert_eq!(change.worker_id, Some(2));
        assert_eq!(change.delivered_at, Some(now()));
    }

    #[test]
    fn start_assigns_unclaimed_work() {
        let change = Transition::Start {
            worker_id: 5
        }
        .check(&work(WorkStatus::Requesting, None), now())
        .expect("allowed");
        assert_eq!(change.status, WorkStatus::InProgress);
        assert_eq!(change.worker_id, Some(5));
    }

    #[test]
    fn start_allows_same_worker_on_planned_work() {
        let start = Transition::Start {
            worker_id: 5
        };
        assert!(start.check(&work(WorkStatus::RequestPlanned, Some(5)), now()).is_ok());
    }

    #[test]
    fn start_refuses_work_claimed_by_other() {
        let err = Transition::Start {
            worker_id: 5
        }
        .check(&work(WorkStatus::Requesting, Some(9)), now())
        .unwrap_err();
        assert_eq!(
            err,
            TransitionError::ClaimedByOther {
                work_id:  1,
                claimant: 9
            }
        );
    }

    #[test]
    fn start_refuses_work_in_progress() {
        let start = Transition::Start {
            worker_id: 5
        };
        assert!(matches!(
            start.check(&work(WorkStatus::InProgress, Some(5)), now()),
            Err(TransitionError::NotAllowed { .. })
        ));
    }

    #[test]
    fn choose_delivery_requires_assignment() {
        let choose = Transition::ChooseDelivery {
            worker_id: 5,
            method:    DeliveryMethod::Pickup
        };

        let change = choose.check(&work(WorkStatus::InProgress, Some(5)), now()).expect("allowed");
        assert_eq!(change.status, WorkStatus::PickupRequesting);
        assert_eq!(change.delivery_method, Some(DeliveryMethod::Pickup));

        assert_eq!(
            choose.check(&work(WorkStatus::InProgress, None), now()),
            Err(TransitionError::NotAssigned {
                work_id: 1
            })
        );
        assert!(matches!(
            choose.check(&work(WorkStatus::InProgress, Some(6)), now()),
            Err(TransitionError::ClaimedByOther { .. })
        ));
    }

    #[test]
    fn unknown_status_is_never_a_source() {
        for transition in [
            Transition::Complete,
            Transition::Start {
                worker_id: 1
            }
        ] {
            assert!(!transition.allows(WorkStatus::Other(40)));
        }
    }

    #[test]
    fn deleted_work_is_refused() {
        let mut deleted = work(WorkStatus::InDelivery, Some(2));
        deleted.deleted_at = Some(now());
        assert_eq!(
            Transition::Complete.check(&deleted, now()),
            Err(TransitionError::Deleted {
                work_id: 1
            })
        );
    }

    #[test]
    fn command_names() {
        assert_eq!(Transition::Complete.name(), "complete_work");
        assert_eq!(Transition::Complete.kind(), CommandKind::Update);
    }
}

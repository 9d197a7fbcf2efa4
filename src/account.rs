// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Administrator accounts and account provisioning.
//!
//! Creating a worker or an administrator touches two systems: the external
//! identity provider (login credentials) and the database row. There is no
//! transaction spanning both, so provisioning runs as a sequence with
//! compensation:
//!
//! 1. create the identity;
//! 2. insert the row bound to it;
//! 3. if the insert fails, delete the identity and return the insert error.
//!
//! When the cleanup itself fails the insert error is wrapped in
//! [`Error::Provision`] so the orphaned identity is visible to the caller.

use std::{fmt, str::FromStr};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use uuid::Uuid;
use validator::Validate;
use workorder_core::{Repository, Worker};

use crate::{
    error::{ErrInto, Error, Result},
    repository::{CreateWorkerRequest, WorkerRepository}
};

/// Administrative capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    ManageWorks,
    ManageWorkers,
    ManageGroups,
    ManageSkillRanks,
    ManageVideos,
    ManageEmails,
    ManageAdmins
}

impl Permission {
    /// Every permission.
    pub const ALL: [Permission; 7] = [
        Self::ManageWorks,
        Self::ManageWorkers,
        Self::ManageGroups,
        Self::ManageSkillRanks,
        Self::ManageVideos,
        Self::ManageEmails,
        Self::ManageAdmins
    ];

    /// Storage name.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::ManageWorks => "manage_works",
            Self::ManageWorkers => "manage_workers",
            Self::ManageGroups => "manage_groups",
            Self::ManageSkillRanks => "manage_skill_ranks",
            Self::ManageVideos => "manage_videos",
            Self::ManageEmails => "manage_emails",
            Self::ManageAdmins => "manage_admins"
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unrecognized permission name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown permission `{0}`")]
pub struct UnknownPermission(pub String);

impl FromStr for Permission {
    type Err = UnknownPermission;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| UnknownPermission(s.to_owned()))
    }
}

/// Office administrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Admin {
    pub id:          i64,
    pub identity_id: Uuid,
    pub name:        String,
    pub email:       String,
    pub permissions: Vec<Permission>,
    pub created_at:  DateTime<Utc>
}

impl Admin {
    /// Check if the admin holds `permission`.
    pub fn can(&self, permission: Permission) -> bool {
        self.permissions.contains(&permission)
    }
}

/// Insertable administrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAdmin {
    pub identity_id: Uuid,
    pub name:        String,
    pub email:       String,
    pub permissions: Vec<Permission>
}

/// Request to register an administrator.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateAdminRequest {
    #[validate(length(min = 1, max = 100))]
    pub name:        String,
    #[validate(email)]
    pub email:       String,
    #[validate(length(min = 8))]
    pub password:    String,
    #[validate(length(min = 1))]
    pub permissions: Vec<Permission>
}

/// Storage for administrators.
#[async_trait]
pub trait AdminRepository: Repository<Error: Into<Error>> {
    /// Insert an administrator with their permissions.
    async fn insert_admin(&self, admin: NewAdmin) -> std::result::Result<Admin, Self::Error>;

    /// Find the administrator bound to an identity.
    async fn find_admin_by_identity(
        &self,
        identity: Uuid
    ) -> std::result::Result<Option<Admin>, Self::Error>;
}

/// External authentication backend.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Error type of the provider.
    type Error: std::error::Error + Into<Error> + Send + Sync + 'static;

    /// Create login credentials and return the new identity.
    async fn create_identity(
        &self,
        email: &str,
        password: &str
    ) -> std::result::Result<Uuid, Self::Error>;

    /// Remove an identity.
    async fn delete_identity(&self, identity: Uuid) -> std::result::Result<(), Self::Error>;
}

/// Create a worker's identity, then the worker row.
pub async fn provision_worker<R, I>(
    repo: &R,
    identities: &I,
    request: CreateWorkerRequest
) -> Result<Worker>
where
    R: WorkerRepository + ?Sized,
    I: IdentityProvider + ?Sized
{
    request.validate()?;
    let identity = identities
        .create_identity(&request.email, &request.password)
        .await
        .err_into()?;

    match repo.insert_worker(request.into_new_worker(identity)).await {
        Ok(worker) => {
            info!(worker_id = worker.id, %identity, "worker provisioned");
            Ok(worker)
        }
        Err(e) => Err(compensate(identities, identity, e.into()).await)
    }
}

/// Create an administrator's identity, then the admin row.
pub async fn provision_admin<R, I>(
    repo: &R,
    identities: &I,
    request: CreateAdminRequest
) -> Result<Admin>
where
    R: AdminRepository + ?Sized,
    I: IdentityProvider + ?Sized
{
    request.validate()?;
    let identity = identities
        .create_identity(&request.email, &request.password)
        .await
        .err_into()?;

    let admin = NewAdmin {
        identity_id: identity,
        name:        request.name,
        email:       request.email,
        permissions: request.permissions
    };
    match repo.insert_admin(admin).await {
        Ok(admin) => {
            info!(admin_id = admin.id, %identity, "admin provisioned");
            Ok(admin)
        }
        Err(e) => Err(compensate(identities, identity, e.into()).await)
    }
}

async fn compensate<I>(identities: &I, identity: Uuid, source: Error) -> Error
where
    I: IdentityProvider + ?Sized
{
    warn!(%identity, error = %source, "account insert failed, deleting identity");
    match identities.delete_identity(identity).await {
        Ok(()) => source,
        Err(cleanup) => {
            let cleanup: Error = cleanup.into();
            error!(%identity, error = %cleanup, "identity cleanup failed");
            Error::Provision {
                source:             Box::new(source),
                compensation_error: Some(cleanup.to_string())
            }
        }
    }
}

// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Reference data managed by administrators.
//!
//! Groups, skill ranks, instructional videos and notification emails share
//! one shape: a numeric id, a few columns, list/create/delete. Each type
//! implements [`CatalogEntry`] and every backend implements
//! [`CatalogRepository`] once per entry type.

use async_trait::async_trait;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use validator::Validate;
use workorder_core::{Pagination, Repository};

use crate::{account::Permission, error::Error};

/// Catalog record type.
pub trait CatalogEntry: Clone + Send + Sync + Unpin + Serialize + 'static {
    /// Request payload that creates an entry.
    type Create: Validate + DeserializeOwned + Send + Sync + 'static;

    /// Record kind, used in errors and logs.
    const KIND: &'static str;

    /// Table name.
    const TABLE: &'static str;

    /// Permission needed to manage entries.
    const PERMISSION: Permission;

    /// Record id.
    fn id(&self) -> i64;

    /// Build the record stored under `id`.
    fn build(id: i64, create: Self::Create) -> Self;
}

/// Storage for one catalog entry type.
#[async_trait]
pub trait CatalogRepository<T: CatalogEntry>: Repository<Error: Into<Error>> {
    /// List entries in id order.
    async fn list_entries(&self, page: Pagination) -> Result<Vec<T>, Self::Error>;

    /// Insert an entry.
    async fn insert_entry(&self, create: T::Create) -> Result<T, Self::Error>;

    /// Delete an entry. Returns `false` when it did not exist.
    async fn delete_entry(&self, id: i64) -> Result<bool, Self::Error>;
}

/// Worker group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
pub struct Group {
    pub id:   i64,
    pub name: String
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateGroup {
    #[validate(length(min = 1, max = 100))]
    pub name: String
}

impl CatalogEntry for Group {
    type Create = CreateGroup;

    const KIND: &'static str = "group";
    const TABLE: &'static str = "groups";
    const PERMISSION: Permission = Permission::ManageGroups;

    fn id(&self) -> i64 {
        self.id
    }

    fn build(id: i64, create: CreateGroup) -> Self {
        Self {
            id,
            name: create.name
        }
    }
}

/// Skill rank; `level` orders ranks from junior to senior.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
pub struct SkillRank {
    pub id:    i64,
    pub name:  String,
    pub level: i16
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateSkillRank {
    #[validate(length(min = 1, max = 100))]
    pub name:  String,
    #[validate(range(min = 0))]
    pub level: i16
}

impl CatalogEntry for SkillRank {
    type Create = CreateSkillRank;

    const KIND: &'static str = "skill rank";
    const TABLE: &'static str = "skill_ranks";
    const PERMISSION: Permission = Permission::ManageSkillRanks;

    fn id(&self) -> i64 {
        self.id
    }

    fn build(id: i64, create: CreateSkillRank) -> Self {
        Self {
            id,
            name: create.name,
            level: create.level
        }
    }
}

/// Instructional video a work can link to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
pub struct Video {
    pub id:    i64,
    pub title: String,
    pub url:   String
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateVideo {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(url)]
    pub url:   String
}

impl CatalogEntry for Video {
    type Create = CreateVideo;

    const KIND: &'static str = "video";
    const TABLE: &'static str = "videos";
    const PERMISSION: Permission = Permission::ManageVideos;

    fn id(&self) -> i64 {
        self.id
    }

    fn build(id: i64, create: CreateVideo) -> Self {
        Self {
            id,
            title: create.title,
            url: create.url
        }
    }
}

/// Address that receives office notifications.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
pub struct NotificationEmail {
    pub id:    i64,
    pub email: String,
    pub label: Option<String>
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateNotificationEmail {
    #[validate(email)]
    pub email: String,
    #[validate(length(max = 100))]
    pub label: Option<String>
}

impl CatalogEntry for NotificationEmail {
    type Create = CreateNotificationEmail;

    const KIND: &'static str = "notification email";
    const TABLE: &'static str = "notification_emails";
    const PERMISSION: Permission = Permission::ManageEmails;

    fn id(&self) -> i64 {
        self.id
    }

    fn build(id: i64, create: CreateNotificationEmail) -> Self {
        Self {
            id,
            email: create.email,
            label: create.label
        }
    }
}

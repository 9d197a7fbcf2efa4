// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! PostgreSQL backend over `sqlx::PgPool`.
//!
//! Rows are read into `*Row` structs and converted to domain types. Works
//! mutations send a `pg_notify` on [`WORKS_CHANNEL`] with the serialized
//! [`WorkEvent`] in the same transaction as the write.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use futures::{TryStreamExt, future};
use sqlx::{
    PgConnection, PgExecutor, PgPool, Postgres,
    postgres::{PgArguments, PgRow},
    query::QueryAs
};
use tracing::warn;
use uuid::Uuid;
use workorder_core::{DeliveryMethod, Pagination, StatusChange, Work, WorkStatus, Worker};

use super::{
    NewWork, NewWorker, WorkChanges, WorkFilter, WorkRepository, WorkerChanges, WorkerFilter,
    WorkerRepository
};
use crate::{
    account::{Admin, AdminRepository, NewAdmin, Permission},
    catalog::{
        CatalogEntry, CatalogRepository, CreateGroup, CreateNotificationEmail, CreateSkillRank,
        CreateVideo, Group, NotificationEmail, SkillRank, Video
    },
    events::{WORKS_CHANNEL, WorkEvent}
};

const WORK_COLUMNS: &str = "id, title, status, worker_id, quantity, unit_price, cost, \
                            delivery_at, delivered_at, delivery_method, video_id, created_at, \
                            updated_at, deleted_at";

const WORKER_COLUMNS: &str = "id, name, email, identity_id, address, birth_date, next_visit_on, \
                              price_ratio, group_id, skill_rank_id, created_at, deleted_at";

const ADMIN_COLUMNS: &str = "id, identity_id, name, email, permissions, created_at";

const LIVE_FOR_UPDATE: &str = " AND deleted_at IS NULL FOR UPDATE";

#[derive(Debug, sqlx::FromRow)]
struct WorkRow {
    id:              i64,
    title:           String,
    status:          i16,
    worker_id:       Option<i64>,
    quantity:        i32,
    unit_price:      i64,
    cost:            i64,
    delivery_at:     Option<DateTime<Utc>>,
    delivered_at:    Option<DateTime<Utc>>,
    delivery_method: Option<String>,
    video_id:        Option<i64>,
    created_at:      DateTime<Utc>,
    updated_at:      DateTime<Utc>,
    deleted_at:      Option<DateTime<Utc>>
}

impl TryFrom<WorkRow> for Work {
    type Error = sqlx::Error;

    fn try_from(row: WorkRow) -> Result<Self, Self::Error> {
        let delivery_method = row
            .delivery_method
            .map(|m| m.parse::<DeliveryMethod>())
            .transpose()
            .map_err(|e| sqlx::Error::Decode(Box::new(e)))?;
        let status = WorkStatus::from_code(row.status);
        if !status.is_known() {
            warn!(work_id = row.id, code = row.status, "unknown work status code");
        }
        Ok(Self {
            id: row.id,
            title: row.title,
            status,
            worker_id: row.worker_id,
            quantity: row.quantity,
            unit_price: row.unit_price,
            cost: row.cost,
            delivery_at: row.delivery_at,
            delivered_at: row.delivered_at,
            delivery_method,
            video_id: row.video_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
            deleted_at: row.deleted_at
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct WorkerRow {
    id:            i64,
    name:          String,
    email:         String,
    identity_id:   Uuid,
    address:       Option<String>,
    birth_date:    Option<NaiveDate>,
    next_visit_on: Option<NaiveDate>,
    price_ratio:   f64,
    group_id:      Option<i64>,
    skill_rank_id: Option<i64>,
    created_at:    DateTime<Utc>,
    deleted_at:    Option<DateTime<Utc>>
}

impl From<WorkerRow> for Worker {
    fn from(row: WorkerRow) -> Self {
        Self {
            id:            row.id,
            name:          row.name,
            email:         row.email,
            identity_id:   row.identity_id,
            address:       row.address,
            birth_date:    row.birth_date,
            next_visit_on: row.next_visit_on,
            price_ratio:   row.price_ratio,
            group_id:      row.group_id,
            skill_rank_id: row.skill_rank_id,
            created_at:    row.created_at,
            deleted_at:    row.deleted_at
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct AdminRow {
    id:          i64,
    identity_id: Uuid,
    name:        String,
    email:       String,
    permissions: Vec<String>,
    created_at:  DateTime<Utc>
}

impl From<AdminRow> for Admin {
    fn from(row: AdminRow) -> Self {
        let permissions = row
            .permissions
            .iter()
            .filter_map(|p| match p.parse::<Permission>() {
                Ok(permission) => Some(permission),
                Err(e) => {
                    warn!(admin_id = row.id, error = %e, "ignoring stored permission");
                    None
                }
            })
            .collect();
        Self {
            id: row.id,
            identity_id: row.identity_id,
            name: row.name,
            email: row.email,
            permissions,
            created_at: row.created_at
        }
    }
}

async fn notify(conn: &mut PgConnection, event: &WorkEvent) -> Result<(), sqlx::Error> {
    let payload = serde_json::to_string(event).map_err(|e| sqlx::Error::Encode(Box::new(e)))?;
    sqlx::query("SELECT pg_notify($1, $2)")
        .bind(WORKS_CHANNEL)
        .bind(&payload)
        .execute(conn)
        .await?;
    Ok(())
}

async fn fetch_work<'e>(
    executor: impl PgExecutor<'e>,
    id: i64,
    suffix: &str
) -> Result<Option<Work>, sqlx::Error> {
    let row: Option<WorkRow> = sqlx::query_as(&format!(
        "SELECT {WORK_COLUMNS} FROM works WHERE id = $1{suffix}"
    ))
    .bind(id)
    .fetch_optional(executor)
    .await?;
    row.map(Work::try_from).transpose()
}

/// Works writes run in a transaction together with their `pg_notify`, so a
/// change is stored only if its event is queued too. Notifications are
/// delivered on commit.
#[async_trait]
impl WorkRepository for PgPool {
    async fn insert_work(&self, work: NewWork) -> Result<Work, Self::Error> {
        let mut tx = self.begin().await?;
        let row: WorkRow = sqlx::query_as(&format!(
            "INSERT INTO works (title, status, worker_id, quantity, unit_price, cost, delivery_at, \
             video_id) VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING {WORK_COLUMNS}"
        ))
        .bind(&work.title)
        .bind(work.status.code())
        .bind(work.worker_id)
        .bind(work.quantity)
        .bind(work.unit_price)
        .bind(work.cost)
        .bind(work.delivery_at)
        .bind(work.video_id)
        .fetch_one(&mut *tx)
        .await?;
        let entity = Work::try_from(row)?;

        notify(&mut *tx, &WorkEvent::created(entity.clone())).await?;
        tx.commit().await?;
        Ok(entity)
    }

    async fn find_work(&self, id: i64) -> Result<Option<Work>, Self::Error> {
        fetch_work(self, id, " AND deleted_at IS NULL").await
    }

    async fn find_work_with_deleted(&self, id: i64) -> Result<Option<Work>, Self::Error> {
        fetch_work(self, id, "").await
    }

    async fn list_works(
        &self,
        filter: &WorkFilter,
        page: Pagination
    ) -> Result<Vec<Work>, Self::Error> {
        let mut conditions: Vec<String> = vec!["deleted_at IS NULL".into()];
        let mut param_idx: usize = 1;
        if filter.status.is_some() {
            conditions.push(format!("status = ${param_idx}"));
            param_idx += 1;
        }
        if filter.worker_id.is_some() {
            conditions.push(format!("worker_id = ${param_idx}"));
            param_idx += 1;
        }
        let limit_idx = param_idx;
        let offset_idx = param_idx + 1;

        let sql = format!(
            "SELECT {WORK_COLUMNS} FROM works WHERE {} ORDER BY id LIMIT ${limit_idx} OFFSET \
             ${offset_idx}",
            conditions.join(" AND ")
        );
        let mut q = sqlx::query_as::<_, WorkRow>(&sql);
        if let Some(status) = filter.status {
            q = q.bind(status.code());
        }
        if let Some(worker_id) = filter.worker_id {
            q = q.bind(worker_id);
        }
        q.bind(page.limit)
            .bind(page.offset)
            .fetch(self)
            .and_then(|row| future::ready(Work::try_from(row)))
            .try_collect()
            .await
    }

    async fn update_work(&self, id: i64, changes: WorkChanges) -> Result<Option<Work>, Self::Error> {
        let mut tx = self.begin().await?;
        let Some(old) = fetch_work(&mut *tx, id, LIVE_FOR_UPDATE).await? else {
            return Ok(None);
        };
        let row: WorkRow = sqlx::query_as(&format!(
            "UPDATE works SET title = $1, worker_id = $2, quantity = $3, unit_price = $4, cost = \
             $5, delivery_at = $6, video_id = $7, updated_at = NOW() WHERE id = $8 RETURNING \
             {WORK_COLUMNS}"
        ))
        .bind(&changes.title)
        .bind(changes.worker_id)
        .bind(changes.quantity)
        .bind(changes.unit_price)
        .bind(changes.cost)
        .bind(changes.delivery_at)
        .bind(changes.video_id)
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;
        let entity = Work::try_from(row)?;

        notify(&mut *tx, &WorkEvent::updated(old, entity.clone())).await?;
        tx.commit().await?;
        Ok(Some(entity))
    }

    async fn apply_status_change(&self, change: &StatusChange) -> Result<Option<Work>, Self::Error> {
        let mut tx = self.begin().await?;
        let locked = fetch_work(&mut *tx, change.work_id, LIVE_FOR_UPDATE).await?;
        let Some(old) = locked.filter(|w| w.status == change.expected) else {
            return Ok(None);
        };
        let row: WorkRow = sqlx::query_as(&format!(
            "UPDATE works SET status = $1, worker_id = $2, delivery_method = $3, delivered_at = \
             $4, updated_at = NOW() WHERE id = $5 RETURNING {WORK_COLUMNS}"
        ))
        .bind(change.status.code())
        .bind(change.worker_id)
        .bind(change.delivery_method.map(|m| m.as_str()))
        .bind(change.delivered_at)
        .bind(change.work_id)
        .fetch_one(&mut *tx)
        .await?;
        let entity = Work::try_from(row)?;

        notify(&mut *tx, &WorkEvent::updated(old, entity.clone())).await?;
        tx.commit().await?;
        Ok(Some(entity))
    }

    async fn delete_work(&self, id: i64) -> Result<bool, Self::Error> {
        let mut tx = self.begin().await?;
        let result = sqlx::query(
            "UPDATE works SET deleted_at = NOW() WHERE id = $1 AND deleted_at IS NULL"
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;
        if result.rows_affected() == 0 {
            return Ok(false);
        }
        notify(&mut *tx, &WorkEvent::soft_deleted(id)).await?;
        tx.commit().await?;
        Ok(true)
    }

    async fn restore_work(&self, id: i64) -> Result<bool, Self::Error> {
        let mut tx = self.begin().await?;
        let result = sqlx::query(
            "UPDATE works SET deleted_at = NULL WHERE id = $1 AND deleted_at IS NOT NULL"
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;
        if result.rows_affected() == 0 {
            return Ok(false);
        }
        notify(&mut *tx, &WorkEvent::restored(id)).await?;
        tx.commit().await?;
        Ok(true)
    }

    async fn hard_delete_work(&self, id: i64) -> Result<bool, Self::Error> {
        let mut tx = self.begin().await?;
        let result = sqlx::query("DELETE FROM works WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Ok(false);
        }
        notify(&mut *tx, &WorkEvent::hard_deleted(id)).await?;
        tx.commit().await?;
        Ok(true)
    }
}

#[async_trait]
impl WorkerRepository for PgPool {
    async fn insert_worker(&self, worker: NewWorker) -> Result<Worker, Self::Error> {
        let row: WorkerRow = sqlx::query_as(&format!(
            "INSERT INTO workers (name, email, identity_id, address, birth_date, next_visit_on, \
             price_ratio, group_id, skill_rank_id) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             RETURNING {WORKER_COLUMNS}"
        ))
        .bind(&worker.name)
        .bind(&worker.email)
        .bind(worker.identity_id)
        .bind(&worker.address)
        .bind(worker.birth_date)
        .bind(worker.next_visit_on)
        .bind(worker.price_ratio)
        .bind(worker.group_id)
        .bind(worker.skill_rank_id)
        .fetch_one(self)
        .await?;
        Ok(Worker::from(row))
    }

    async fn find_worker(&self, id: i64) -> Result<Option<Worker>, Self::Error> {
        let row: Option<WorkerRow> = sqlx::query_as(&format!(
            "SELECT {WORKER_COLUMNS} FROM workers WHERE id = $1 AND deleted_at IS NULL"
        ))
        .bind(id)
        .fetch_optional(self)
        .await?;
        Ok(row.map(Worker::from))
    }

    async fn find_worker_by_identity(&self, identity: Uuid) -> Result<Option<Worker>, Self::Error> {
        let row: Option<WorkerRow> = sqlx::query_as(&format!(
            "SELECT {WORKER_COLUMNS} FROM workers WHERE identity_id = $1 AND deleted_at IS NULL"
        ))
        .bind(identity)
        .fetch_optional(self)
        .await?;
        Ok(row.map(Worker::from))
    }

    async fn list_workers(
        &self,
        filter: &WorkerFilter,
        page: Pagination
    ) -> Result<Vec<Worker>, Self::Error> {
        let mut conditions: Vec<String> = vec!["deleted_at IS NULL".into()];
        let mut param_idx: usize = 1;
        if filter.group_id.is_some() {
            conditions.push(format!("group_id = ${param_idx}"));
            param_idx += 1;
        }
        if filter.skill_rank_id.is_some() {
            conditions.push(format!("skill_rank_id = ${param_idx}"));
            param_idx += 1;
        }
        let limit_idx = param_idx;
        let offset_idx = param_idx + 1;

        let sql = format!(
            "SELECT {WORKER_COLUMNS} FROM workers WHERE {} ORDER BY id LIMIT ${limit_idx} OFFSET \
             ${offset_idx}",
            conditions.join(" AND ")
        );
        let mut q = sqlx::query_as::<_, WorkerRow>(&sql);
        if let Some(group_id) = filter.group_id {
            q = q.bind(group_id);
        }
        if let Some(skill_rank_id) = filter.skill_rank_id {
            q = q.bind(skill_rank_id);
        }
        let rows = q.bind(page.limit).bind(page.offset).fetch_all(self).await?;
        Ok(rows.into_iter().map(Worker::from).collect())
    }

    async fn update_worker(
        &self,
        id: i64,
        changes: WorkerChanges
    ) -> Result<Option<Worker>, Self::Error> {
        let row: Option<WorkerRow> = sqlx::query_as(&format!(
            "UPDATE workers SET name = $1, address = $2, birth_date = $3, next_visit_on = $4, \
             price_ratio = $5, group_id = $6, skill_rank_id = $7 WHERE id = $8 AND deleted_at IS \
             NULL RETURNING {WORKER_COLUMNS}"
        ))
        .bind(&changes.name)
        .bind(&changes.address)
        .bind(changes.birth_date)
        .bind(changes.next_visit_on)
        .bind(changes.price_ratio)
        .bind(changes.group_id)
        .bind(changes.skill_rank_id)
        .bind(id)
        .fetch_optional(self)
        .await?;
        Ok(row.map(Worker::from))
    }

    async fn delete_worker(&self, id: i64) -> Result<bool, Self::Error> {
        let result = sqlx::query(
            "UPDATE workers SET deleted_at = NOW() WHERE id = $1 AND deleted_at IS NULL"
        )
        .bind(id)
        .execute(self)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn restore_worker(&self, id: i64) -> Result<bool, Self::Error> {
        let result = sqlx::query(
            "UPDATE workers SET deleted_at = NULL WHERE id = $1 AND deleted_at IS NOT NULL"
        )
        .bind(id)
        .execute(self)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl AdminRepository for PgPool {
    async fn insert_admin(&self, admin: NewAdmin) -> Result<Admin, Self::Error> {
        let permissions: Vec<&str> = admin.permissions.iter().map(Permission::as_str).collect();
        let row: AdminRow = sqlx::query_as(&format!(
            "INSERT INTO admins (identity_id, name, email, permissions) VALUES ($1, $2, $3, $4) \
             RETURNING {ADMIN_COLUMNS}"
        ))
        .bind(admin.identity_id)
        .bind(&admin.name)
        .bind(&admin.email)
        .bind(&permissions)
        .fetch_one(self)
        .await?;
        Ok(Admin::from(row))
    }

    async fn find_admin_by_identity(&self, identity: Uuid) -> Result<Option<Admin>, Self::Error> {
        let row: Option<AdminRow> = sqlx::query_as(&format!(
            "SELECT {ADMIN_COLUMNS} FROM admins WHERE identity_id = $1"
        ))
        .bind(identity)
        .fetch_optional(self)
        .await?;
        Ok(row.map(Admin::from))
    }
}

/// Query with bound arguments for catalog rows.
pub type PgQueryAs<'q, T> = QueryAs<'q, Postgres, T, PgArguments>;

/// Postgres mapping of a catalog entry.
pub trait PgCatalogEntry: CatalogEntry + for<'r> sqlx::FromRow<'r, PgRow> {
    /// Columns written on insert, in bind order.
    const INSERT_COLUMNS: &'static [&'static str];

    /// Bind the insert columns of `create`.
    fn bind_create<'q>(create: Self::Create, query: PgQueryAs<'q, Self>) -> PgQueryAs<'q, Self>;
}

impl PgCatalogEntry for Group {
    const INSERT_COLUMNS: &'static [&'static str] = &["name"];

    fn bind_create<'q>(create: CreateGroup, query: PgQueryAs<'q, Self>) -> PgQueryAs<'q, Self> {
        query.bind(create.name)
    }
}

impl PgCatalogEntry for SkillRank {
    const INSERT_COLUMNS: &'static [&'static str] = &["name", "level"];

    fn bind_create<'q>(create: CreateSkillRank, query: PgQueryAs<'q, Self>) -> PgQueryAs<'q, Self> {
        query.bind(create.name).bind(create.level)
    }
}

impl PgCatalogEntry for Video {
    const INSERT_COLUMNS: &'static [&'static str] = &["title", "url"];

    fn bind_create<'q>(create: CreateVideo, query: PgQueryAs<'q, Self>) -> PgQueryAs<'q, Self> {
        query.bind(create.title).bind(create.url)
    }
}

impl PgCatalogEntry for NotificationEmail {
    const INSERT_COLUMNS: &'static [&'static str] = &["email", "label"];

    fn bind_create<'q>(
        create: CreateNotificationEmail,
        query: PgQueryAs<'q, Self>
    ) -> PgQueryAs<'q, Self> {
        query.bind(create.email).bind(create.label)
    }
}

#[async_trait]
impl<T: PgCatalogEntry> CatalogRepository<T> for PgPool {
    async fn list_entries(&self, page: Pagination) -> Result<Vec<T>, Self::Error> {
        sqlx::query_as::<_, T>(&format!(
            "SELECT * FROM {} ORDER BY id LIMIT $1 OFFSET $2",
            T::TABLE
        ))
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(self)
        .await
    }

    async fn insert_entry(&self, create: T::Create) -> Result<T, Self::Error> {
        let placeholders: Vec<String> = (1..=T::INSERT_COLUMNS.len())
            .map(|i| format!("${i}"))
            .collect();
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({}) RETURNING *",
            T::TABLE,
            T::INSERT_COLUMNS.join(", "),
            placeholders.join(", ")
        );
        T::bind_create(create, sqlx::query_as::<_, T>(&sql))
            .fetch_one(self)
            .await
    }

    async fn delete_entry(&self, id: i64) -> Result<bool, Self::Error> {
        let result = sqlx::query(&format!("DELETE FROM {} WHERE id = $1", T::TABLE))
            .bind(id)
            .execute(self)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

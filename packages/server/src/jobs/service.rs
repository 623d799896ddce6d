//! Job and fieldwork lifecycle.
//!
//! Every mutation enriches first (network calls, outside any transaction),
//! then opens one transaction, locks the job row and writes. Fieldwork
//! mutations keep the job aggregates in step inside that same transaction.

use std::collections::HashMap;

use chrono::Utc;
use common::duration::compute_duration;
use common::Resolution;
use sea_orm::prelude::Expr;
use sea_orm::sea_query::{Func, LikeExpr, LockType};
use sea_orm::*;
use tracing::{info, instrument};

use super::aggregate;
use crate::enrichment::{EnrichedAddress, Enrichment, EnrichmentReport};
use crate::entity::{field_work, job, job_relation, job_tag, tag};
use crate::error::AppError;
use crate::extractors::auth::AuthUser;
use crate::models::fieldwork::{
    CreateFieldWorkRequest, UpdateFieldWorkRequest, VisitTimes, parse_create_fieldwork,
    parse_update_fieldwork,
};
use crate::models::job::{
    CreateJobRequest, JobListQuery, UpdateJobRequest, validate_create_job, validate_update_job,
};
use crate::models::shared::{Pagination, escape_like, normalize_optional, page_bounds};
use crate::state::AppState;

/// A job with its ordered tags and related job ids.
#[derive(Debug, Clone)]
pub struct JobDetail {
    pub job: job::Model,
    pub tags: Vec<tag::Model>,
    pub related_job_ids: Vec<i32>,
}

pub struct JobService<'a> {
    db: &'a DatabaseConnection,
    enrichment: &'a Enrichment,
}

impl<'a> JobService<'a> {
    pub fn new(db: &'a DatabaseConnection, enrichment: &'a Enrichment) -> Self {
        Self { db, enrichment }
    }

    pub fn from_state(state: &'a AppState) -> Self {
        Self::new(&state.db, &state.enrichment)
    }

    #[instrument(skip(self, actor, req), fields(job_number = %req.job_number))]
    pub async fn create_job(
        &self,
        actor: &AuthUser,
        req: CreateJobRequest,
    ) -> Result<(JobDetail, EnrichmentReport), AppError> {
        actor.require_admin()?;
        validate_create_job(&req)?;

        let job_number = req.job_number.trim().to_string();
        ensure_job_number_available(self.db, &job_number, None).await?;

        let enriched = self.enrichment.enrich(req.address.trim()).await;
        let report = enriched.report();
        let EnrichedAddress {
            address,
            location,
            property_link,
        } = enriched;
        let (lat, long, county) = match location {
            Resolution::Resolved(loc) => (Some(loc.lat), Some(loc.long), loc.county),
            Resolution::Unresolved => (None, None, None),
        };
        let property_link =
            normalize_optional(req.property_link).or_else(|| property_link.into_option());

        let txn = self.db.begin().await?;

        let new_job = job::ActiveModel {
            job_number: Set(job_number.clone()),
            client: Set(req.client.trim().to_string()),
            address: Set(address),
            lat: Set(lat),
            long: Set(long),
            county: Set(county),
            status: Set(req.status.unwrap_or_default()),
            notes: Set(normalize_optional(req.notes)),
            property_link: Set(property_link),
            plat_link: Set(normalize_optional(req.plat_link)),
            fema_link: Set(normalize_optional(req.fema_link)),
            document_url: Set(normalize_optional(req.document_url)),
            visited: Set(0),
            total_time_spent: Set(0.0),
            created_at: Set(Utc::now()),
            created_by: Set(Some(actor.user_id)),
            deleted_at: Set(None),
            deleted_by: Set(None),
            ..Default::default()
        };
        let model = new_job
            .insert(&txn)
            .await
            .map_err(|e| map_job_write_err(e, &job_number))?;

        replace_tags(&txn, model.id, &req.tag_ids).await?;
        replace_relations(&txn, model.id, &req.related_job_ids).await?;

        txn.commit().await?;

        info!(
            job_id = model.id,
            geocoded = report.geocoded,
            county = model.county.as_deref().unwrap_or("-"),
            "Job created"
        );
        let detail = load_detail(self.db, model).await?;
        Ok((detail, report))
    }

    /// Apply a partial update. The report is `None` unless the address changed.
    #[instrument(skip(self, actor, req))]
    pub async fn update_job(
        &self,
        actor: &AuthUser,
        id: i32,
        req: UpdateJobRequest,
    ) -> Result<(JobDetail, Option<EnrichmentReport>), AppError> {
        actor.require_admin()?;
        validate_update_job(&req)?;

        let current = find_active_job(self.db, id).await?;
        if req == UpdateJobRequest::default() {
            return Ok((load_detail(self.db, current).await?, None));
        }

        let job_number = req.job_number.as_deref().map(str::trim);
        if let Some(number) = job_number
            && number != current.job_number
        {
            ensure_job_number_available(self.db, number, Some(id)).await?;
        }

        let enriched = match req.address.as_deref().map(str::trim) {
            Some(address) if address != current.address => {
                Some(self.enrichment.enrich(address).await)
            }
            _ => None,
        };
        let report = enriched.as_ref().map(EnrichedAddress::report);

        let txn = self.db.begin().await?;
        let locked = find_active_job_for_update(&txn, id).await?;
        let mut active: job::ActiveModel = locked.into();

        if let Some(number) = job_number {
            active.job_number = Set(number.to_string());
        }
        if let Some(ref client) = req.client {
            active.client = Set(client.trim().to_string());
        }
        if let Some(status) = req.status {
            active.status = Set(status);
        }
        if let Some(notes) = req.notes {
            active.notes = Set(normalize_optional(notes));
        }
        if let Some(link) = req.plat_link {
            active.plat_link = Set(normalize_optional(link));
        }
        if let Some(link) = req.fema_link {
            active.fema_link = Set(normalize_optional(link));
        }
        if let Some(link) = req.document_url {
            active.document_url = Set(normalize_optional(link));
        }

        // Address, coordinates and county move together or not at all.
        let explicit_property_link = req.property_link.is_some();
        if let Some(EnrichedAddress {
            address,
            location: Resolution::Resolved(loc),
            property_link,
        }) = enriched
        {
            active.address = Set(address);
            active.lat = Set(Some(loc.lat));
            active.long = Set(Some(loc.long));
            active.county = Set(loc.county);
            if !explicit_property_link {
                active.property_link = Set(property_link.into_option());
            }
        }
        if let Some(link) = req.property_link {
            active.property_link = Set(normalize_optional(link));
        }

        let model = if active.is_changed() {
            active
                .update(&txn)
                .await
                .map_err(|e| map_job_write_err(e, job_number.unwrap_or(&current.job_number)))?
        } else {
            find_job(&txn, id).await?
        };

        if let Some(ref tag_ids) = req.tag_ids {
            replace_tags(&txn, id, tag_ids).await?;
        }
        if let Some(ref related) = req.related_job_ids {
            replace_relations(&txn, id, related).await?;
        }

        txn.commit().await?;

        info!(job_id = id, geocoded = ?report.map(|r| r.geocoded), "Job updated");
        let detail = load_detail(self.db, model).await?;
        Ok((detail, report))
    }

    /// Soft delete. The job number becomes available again.
    #[instrument(skip(self, actor))]
    pub async fn delete_job(&self, actor: &AuthUser, id: i32) -> Result<(), AppError> {
        actor.require_admin()?;

        let txn = self.db.begin().await?;
        let locked = find_active_job_for_update(&txn, id).await?;

        let mut active: job::ActiveModel = locked.into();
        active.deleted_at = Set(Some(Utc::now()));
        active.deleted_by = Set(Some(actor.user_id));
        active.update(&txn).await?;

        txn.commit().await?;

        info!(job_id = id, deleted_by = actor.user_id, "Job soft-deleted");
        Ok(())
    }

    /// Any job by id, soft-deleted ones included.
    pub async fn get_job(&self, id: i32) -> Result<JobDetail, AppError> {
        let model = find_job(self.db, id).await?;
        load_detail(self.db, model).await
    }

    /// Active jobs matching the filters, one page at a time.
    pub async fn list_jobs(
        &self,
        query: &JobListQuery,
    ) -> Result<(Vec<job::Model>, Pagination), AppError> {
        let (page, per_page) = page_bounds(query.page, query.per_page);

        let mut select = job::Entity::find().filter(job::Column::DeletedAt.is_null());

        if let Some(term) = non_blank(query.search.as_deref()) {
            select = select.filter(
                Condition::any()
                    .add(contains_ci(job::Column::JobNumber, term))
                    .add(contains_ci(job::Column::Client, term))
                    .add(contains_ci(job::Column::Address, term)),
            );
        }
        if let Some(term) = non_blank(query.job_number.as_deref()) {
            select = select.filter(contains_ci(job::Column::JobNumber, term));
        }
        if let Some(term) = non_blank(query.client.as_deref()) {
            select = select.filter(contains_ci(job::Column::Client, term));
        }
        if let Some(term) = non_blank(query.address.as_deref()) {
            select = select.filter(contains_ci(job::Column::Address, term));
        }
        if let Some(status) = query.status {
            select = select.filter(job::Column::Status.eq(status));
        }
        if let Some(county) = non_blank(query.county.as_deref()) {
            select = select.filter(
                Expr::expr(Func::upper(Expr::col(job::Column::County))).eq(county.to_uppercase()),
            );
        }

        let sort_order = if query.sort_order.as_deref() == Some("asc") {
            Order::Asc
        } else {
            Order::Desc
        };
        let sort_column = match query.sort_by.as_deref().unwrap_or("created_at") {
            "created_at" => job::Column::CreatedAt,
            "job_number" => job::Column::JobNumber,
            "client" => job::Column::Client,
            "total_time_spent" => job::Column::TotalTimeSpent,
            _ => {
                return Err(AppError::Validation(
                    "sort_by must be one of: created_at, job_number, client, total_time_spent"
                        .into(),
                ));
            }
        };

        let total = select
            .clone()
            .paginate(self.db, per_page)
            .num_items()
            .await?;

        let data = select
            .order_by(sort_column, sort_order.clone())
            .order_by(job::Column::Id, sort_order)
            .offset(Some(page.saturating_sub(1).saturating_mul(per_page)))
            .limit(Some(per_page))
            .all(self.db)
            .await?;

        Ok((data, Pagination::new(page, per_page, total)))
    }

    /// Fieldwork of a job in visit order. Works for soft-deleted jobs too.
    pub async fn get_fieldwork_for_job(
        &self,
        job_id: i32,
    ) -> Result<(job::Model, Vec<field_work::Model>), AppError> {
        let job = find_job(self.db, job_id).await?;
        let entries = field_work::Entity::find()
            .filter(field_work::Column::JobId.eq(job_id))
            .order_by_asc(field_work::Column::WorkDate)
            .order_by_asc(field_work::Column::StartTime)
            .order_by_asc(field_work::Column::Id)
            .all(self.db)
            .await?;
        Ok((job, entries))
    }

    pub async fn get_fieldwork(&self, entry_id: i32) -> Result<field_work::Model, AppError> {
        find_fieldwork(self.db, entry_id).await
    }

    #[instrument(skip(self, actor, req))]
    pub async fn create_fieldwork(
        &self,
        actor: &AuthUser,
        job_id: i32,
        req: CreateFieldWorkRequest,
    ) -> Result<(field_work::Model, job::Model), AppError> {
        actor.require_admin()?;
        let times = parse_create_fieldwork(&req)?;
        let hours = compute_duration(times.work_date, times.start_time, times.end_time)?;

        let txn = self.db.begin().await?;
        let job = find_active_job_for_update(&txn, job_id).await?;

        let entry = field_work::ActiveModel {
            job_id: Set(job.id),
            work_date: Set(times.work_date),
            start_time: Set(times.start_time),
            end_time: Set(times.end_time),
            total_time: Set(hours),
            crew: Set(normalize_optional(req.crew)),
            drone_card: Set(normalize_optional(req.drone_card)),
            notes: Set(normalize_optional(req.notes)),
            document_url: Set(normalize_optional(req.document_url)),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        let job = aggregate::record_new_entry(&txn, job, hours).await?;
        txn.commit().await?;

        info!(
            job_id,
            entry_id = entry.id,
            hours,
            logged_by = actor.user_id,
            visited = job.visited,
            "Fieldwork logged"
        );
        Ok((entry, job))
    }

    #[instrument(skip(self, actor, req))]
    pub async fn update_fieldwork(
        &self,
        actor: &AuthUser,
        entry_id: i32,
        req: UpdateFieldWorkRequest,
    ) -> Result<(field_work::Model, job::Model), AppError> {
        actor.require_admin()?;

        let txn = self.db.begin().await?;
        let entry = find_fieldwork(&txn, entry_id).await?;
        let job = find_parent_for_update(&txn, &entry).await?;
        // Read again under the job lock: edits merge against the latest row.
        let current = find_fieldwork(&txn, entry_id).await?;

        if req == UpdateFieldWorkRequest::default() {
            txn.commit().await?;
            return Ok((current, job));
        }

        let times = parse_update_fieldwork(
            &req,
            VisitTimes {
                work_date: current.work_date,
                start_time: current.start_time,
                end_time: current.end_time,
            },
        )?;

        let mut active: field_work::ActiveModel = current.into();
        if req.touches_times() {
            active.work_date = Set(times.work_date);
            active.start_time = Set(times.start_time);
            active.end_time = Set(times.end_time);
            active.total_time = Set(compute_duration(
                times.work_date,
                times.start_time,
                times.end_time,
            )?);
        }
        if let Some(crew) = req.crew {
            active.crew = Set(normalize_optional(crew));
        }
        if let Some(card) = req.drone_card {
            active.drone_card = Set(normalize_optional(card));
        }
        if let Some(notes) = req.notes {
            active.notes = Set(normalize_optional(notes));
        }
        if let Some(url) = req.document_url {
            active.document_url = Set(normalize_optional(url));
        }
        let entry = active.update(&txn).await?;

        let job = aggregate::recompute(&txn, job).await?;
        txn.commit().await?;

        info!(
            job_id = job.id,
            entry_id,
            edited_by = actor.user_id,
            total_time_spent = job.total_time_spent,
            "Fieldwork updated"
        );
        Ok((entry, job))
    }

    /// Hard delete, then recompute the parent job.
    #[instrument(skip(self, actor))]
    pub async fn delete_fieldwork(
        &self,
        actor: &AuthUser,
        entry_id: i32,
    ) -> Result<job::Model, AppError> {
        actor.require_admin()?;

        let txn = self.db.begin().await?;
        let entry = find_fieldwork(&txn, entry_id).await?;
        let job = find_parent_for_update(&txn, &entry).await?;

        field_work::Entity::delete_by_id(entry.id).exec(&txn).await?;
        let job = aggregate::recompute(&txn, job).await?;
        txn.commit().await?;

        info!(
            job_id = job.id,
            entry_id,
            visited = job.visited,
            "Fieldwork deleted"
        );
        Ok(job)
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Case-insensitive substring match on a text column.
fn contains_ci(column: job::Column, term: &str) -> Condition {
    let pattern = format!("%{}%", escape_like(term).to_lowercase());
    Condition::all().add(
        Expr::expr(Func::lower(Expr::col(column))).like(LikeExpr::new(pattern).escape('\\')),
    )
}

fn map_job_write_err(err: DbErr, job_number: &str) -> AppError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => {
            tracing::debug!("Job number race: unique index caught the write");
            AppError::DuplicateJobNumber(job_number.to_string())
        }
        _ => AppError::from(err),
    }
}

async fn ensure_job_number_available<C: ConnectionTrait>(
    db: &C,
    job_number: &str,
    exclude_id: Option<i32>,
) -> Result<(), AppError> {
    let mut select = job::Entity::find()
        .filter(job::Column::JobNumber.eq(job_number))
        .filter(job::Column::DeletedAt.is_null());
    if let Some(id) = exclude_id {
        select = select.filter(job::Column::Id.ne(id));
    }
    if select.count(db).await? > 0 {
        return Err(AppError::DuplicateJobNumber(job_number.to_string()));
    }
    Ok(())
}

async fn find_job<C: ConnectionTrait>(db: &C, id: i32) -> Result<job::Model, AppError> {
    job::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Job not found".into()))
}

async fn find_active_job<C: ConnectionTrait>(db: &C, id: i32) -> Result<job::Model, AppError> {
    let job = find_job(db, id).await?;
    if job.is_deleted() {
        return Err(AppError::NotFound("Job not found".into()));
    }
    Ok(job)
}

async fn find_active_job_for_update(
    txn: &DatabaseTransaction,
    id: i32,
) -> Result<job::Model, AppError> {
    job::Entity::find_by_id(id)
        .filter(job::Column::DeletedAt.is_null())
        .lock(LockType::Update)
        .one(txn)
        .await?
        .ok_or_else(|| AppError::NotFound("Job not found".into()))
}

/// Lock the job owning `entry`. Entries of soft-deleted jobs are read-only,
/// so they report as missing.
async fn find_parent_for_update(
    txn: &DatabaseTransaction,
    entry: &field_work::Model,
) -> Result<job::Model, AppError> {
    match find_active_job_for_update(txn, entry.job_id).await {
        Err(AppError::NotFound(_)) => Err(AppError::NotFound("Fieldwork entry not found".into())),
        other => other,
    }
}

async fn find_fieldwork<C: ConnectionTrait>(
    db: &C,
    id: i32,
) -> Result<field_work::Model, AppError> {
    field_work::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Fieldwork entry not found".into()))
}

async fn load_detail<C: ConnectionTrait>(db: &C, job: job::Model) -> Result<JobDetail, AppError> {
    let links = job_tag::Entity::find()
        .filter(job_tag::Column::JobId.eq(job.id))
        .order_by_asc(job_tag::Column::Position)
        .all(db)
        .await?;

    let tags = if links.is_empty() {
        Vec::new()
    } else {
        let mut by_id: HashMap<i32, tag::Model> = tag::Entity::find()
            .filter(tag::Column::Id.is_in(links.iter().map(|l| l.tag_id)))
            .all(db)
            .await?
            .into_iter()
            .map(|t| (t.id, t))
            .collect();
        links
            .iter()
            .filter_map(|l| by_id.remove(&l.tag_id))
            .collect()
    };

    let relations = job_relation::Entity::find()
        .filter(
            Condition::any()
                .add(job_relation::Column::LowId.eq(job.id))
                .add(job_relation::Column::HighId.eq(job.id)),
        )
        .all(db)
        .await?;
    let mut related_job_ids: Vec<i32> = relations
        .into_iter()
        .map(|r| if r.low_id == job.id { r.high_id } else { r.low_id })
        .collect();
    related_job_ids.sort_unstable();

    Ok(JobDetail {
        job,
        tags,
        related_job_ids,
    })
}

/// Replace the ordered tag list of a job. Unknown tag ids are rejected.
async fn replace_tags(
    txn: &DatabaseTransaction,
    job_id: i32,
    tag_ids: &[i32],
) -> Result<(), AppError> {
    if !tag_ids.is_empty() {
        let known = tag::Entity::find()
            .filter(tag::Column::Id.is_in(tag_ids.iter().copied()))
            .count(txn)
            .await?;
        if known != tag_ids.len() as u64 {
            return Err(AppError::Validation("Unknown tag ID in tag_ids".into()));
        }
    }

    job_tag::Entity::delete_many()
        .filter(job_tag::Column::JobId.eq(job_id))
        .exec(txn)
        .await?;

    if tag_ids.is_empty() {
        return Ok(());
    }
    let rows = tag_ids
        .iter()
        .enumerate()
        .map(|(position, &tag_id)| job_tag::ActiveModel {
            job_id: Set(job_id),
            tag_id: Set(tag_id),
            position: Set(position as i32),
        });
    job_tag::Entity::insert_many(rows)
        .exec_without_returning(txn)
        .await?;
    Ok(())
}

/// Replace the related-job set of a job. Pairs are stored once, low id first.
async fn replace_relations(
    txn: &DatabaseTransaction,
    job_id: i32,
    related: &[i32],
) -> Result<(), AppError> {
    if related.contains(&job_id) {
        return Err(AppError::Validation("A job cannot be related to itself".into()));
    }
    if !related.is_empty() {
        let known = job::Entity::find()
            .filter(job::Column::Id.is_in(related.iter().copied()))
            .filter(job::Column::DeletedAt.is_null())
            .count(txn)
            .await?;
        if known != related.len() as u64 {
            return Err(AppError::Validation(
                "Unknown or deleted job ID in related_job_ids".into(),
            ));
        }
    }

    job_relation::Entity::delete_many()
        .filter(
            Condition::any()
                .add(job_relation::Column::LowId.eq(job_id))
                .add(job_relation::Column::HighId.eq(job_id)),
        )
        .exec(txn)
        .await?;

    if related.is_empty() {
        return Ok(());
    }
    let rows = related.iter().map(|&other| job_relation::ActiveModel {
        low_id: Set(Ord::min(job_id, other)),
        high_id: Set(Ord::max(job_id, other)),
    });
    job_relation::Entity::insert_many(rows)
        .exec_without_returning(txn)
        .await?;
    Ok(())
}

//! Keeps `job.visited` and `job.total_time_spent` equal to the count and sum
//! of the job's fieldwork entries.
//!
//! Both functions expect to run on the caller's transaction with the job row
//! already locked, so concurrent fieldwork changes to one job serialize.

use common::duration::{add_hours, sum_hours};
use sea_orm::*;

use crate::entity::{field_work, job};

/// Recount and resum every fieldwork entry of `job`, then persist.
pub async fn recompute<C: ConnectionTrait>(conn: &C, job: job::Model) -> Result<job::Model, DbErr> {
    let hours: Vec<f64> = field_work::Entity::find()
        .select_only()
        .column(field_work::Column::TotalTime)
        .filter(field_work::Column::JobId.eq(job.id))
        .into_tuple()
        .all(conn)
        .await?;

    let visited = hours.len() as i32;
    let total = sum_hours(hours);
    store(conn, job, visited, total).await
}

/// Fold one newly inserted entry into the aggregates without rescanning.
pub async fn record_new_entry<C: ConnectionTrait>(
    conn: &C,
    job: job::Model,
    hours: f64,
) -> Result<job::Model, DbErr> {
    let visited = job.visited + 1;
    let total = add_hours(job.total_time_spent, hours);
    store(conn, job, visited, total).await
}

async fn store<C: ConnectionTrait>(
    conn: &C,
    job: job::Model,
    visited: i32,
    total_time_spent: f64,
) -> Result<job::Model, DbErr> {
    if job.visited == visited && job.total_time_spent == total_time_spent {
        return Ok(job);
    }
    let mut active: job::ActiveModel = job.into();
    active.visited = Set(visited);
    active.total_time_spent = Set(total_time_spent);
    active.update(conn).await
}

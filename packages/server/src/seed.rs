use sea_orm::*;
use tracing::{info, warn};

use common::UserRole;

use crate::config::AuthConfig;
use crate::entity::user;
use crate::utils::hash;

/// Create the bootstrap admin account if it does not exist yet.
///
/// Nothing is seeded without a configured password. An existing account is
/// left alone, even if its password differs.
pub async fn seed_bootstrap_admin(db: &DatabaseConnection, auth: &AuthConfig) -> Result<(), DbErr> {
    let Some(password) = auth.bootstrap_admin_password.as_deref() else {
        warn!("No bootstrap admin password configured; skipping admin seed");
        return Ok(());
    };

    let exists = user::Entity::find()
        .filter(user::Column::Username.eq(&auth.bootstrap_admin_username))
        .count(db)
        .await?
        > 0;
    if exists {
        return Ok(());
    }

    let hash = hash::hash_password(password).map_err(|e| DbErr::Custom(e.to_string()))?;
    let model = user::ActiveModel {
        username: Set(auth.bootstrap_admin_username.clone()),
        password: Set(hash),
        role: Set(UserRole::Admin),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    };

    let result = user::Entity::insert(model)
        .on_conflict(
            sea_orm::sea_query::OnConflict::column(user::Column::Username)
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(db)
        .await;

    match result {
        Ok(_) => info!("Seeded bootstrap admin '{}'", auth.bootstrap_admin_username),
        Err(DbErr::RecordNotInserted) => {}
        Err(e) => return Err(e),
    }
    Ok(())
}

/// Ensure required database indexes exist.
///
/// Schema sync cannot express partial indexes, so the one enforcing unique
/// job numbers among active jobs is created here.
pub async fn ensure_indexes(db: &DatabaseConnection) -> Result<(), DbErr> {
    db.execute_unprepared(
        r#"CREATE UNIQUE INDEX IF NOT EXISTS idx_job_active_number ON "job" (job_number) WHERE deleted_at IS NULL"#,
    )
    .await?;
    info!("Ensured index idx_job_active_number exists");

    let result = db
        .execute_unprepared(
            r#"CREATE INDEX IF NOT EXISTS idx_field_work_job ON "field_work" (job_id)"#,
        )
        .await;
    match result {
        Ok(_) => info!("Ensured index idx_field_work_job exists"),
        Err(e) => warn!("Failed to create index idx_field_work_job: {}", e),
    }

    Ok(())
}

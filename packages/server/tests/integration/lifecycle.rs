//! Service-level lifecycle checks, driven in-process against the same
//! database the HTTP server uses.

use fieldbook_server::entity::job;
use fieldbook_server::error::AppError;
use fieldbook_server::jobs::aggregate;
use fieldbook_server::models::fieldwork::{CreateFieldWorkRequest, UpdateFieldWorkRequest};
use fieldbook_server::models::job::{CreateJobRequest, JobListQuery, UpdateJobRequest};
use sea_orm::EntityTrait;
use serde_json::{Value, json};

use crate::common::{FakeGeocoder, TestApp, places};

fn job_req(job_number: &str, address: &str) -> CreateJobRequest {
    from(json!({"job_number": job_number, "client": "Acme Homes", "address": address}))
}

fn visit(start: &str, end: &str) -> CreateFieldWorkRequest {
    from(json!({"work_date": "2024-01-01", "start_time": start, "end_time": end}))
}

fn from<T: serde::de::DeserializeOwned>(value: Value) -> T {
    serde_json::from_value(value).expect("request should deserialize")
}

async fn stored_job(app: &TestApp, id: i32) -> job::Model {
    job::Entity::find_by_id(id)
        .one(&app.db)
        .await
        .unwrap()
        .expect("job row should exist")
}

mod aggregates {
    use super::*;

    #[tokio::test]
    async fn new_job_starts_with_zero_aggregates() {
        let app = TestApp::spawn().await;
        let admin = app.admin().await;

        let (detail, _) = app
            .service()
            .create_job(&admin, job_req("J-1", places::UNKNOWN))
            .await
            .unwrap();

        assert_eq!(detail.job.visited, 0);
        assert_eq!(detail.job.total_time_spent, 0.0);
    }

    #[tokio::test]
    async fn deleting_an_entry_recomputes_count_and_sum() {
        let app = TestApp::spawn().await;
        let admin = app.admin().await;
        let svc = app.service();
        let (detail, _) = svc
            .create_job(&admin, job_req("J-1", places::UNKNOWN))
            .await
            .unwrap();
        let job_id = detail.job.id;

        svc.create_fieldwork(&admin, job_id, visit("08:00", "10:00"))
            .await
            .unwrap();
        let (second, _) = svc
            .create_fieldwork(&admin, job_id, visit("10:00", "13:30"))
            .await
            .unwrap();
        let (_, job) = svc
            .create_fieldwork(&admin, job_id, visit("14:00", "15:00"))
            .await
            .unwrap();
        assert_eq!(job.visited, 3);
        assert_eq!(job.total_time_spent, 6.5);

        let job = svc.delete_fieldwork(&admin, second.id).await.unwrap();

        assert_eq!(job.visited, 2);
        assert_eq!(job.total_time_spent, 3.0);
        let stored = stored_job(&app, job_id).await;
        assert_eq!(stored.visited, 2);
        assert_eq!(stored.total_time_spent, 3.0);
    }

    #[tokio::test]
    async fn incremental_create_matches_a_full_recount() {
        let app = TestApp::spawn().await;
        let admin = app.admin().await;
        let svc = app.service();
        let (detail, _) = svc
            .create_job(&admin, job_req("J-1", places::UNKNOWN))
            .await
            .unwrap();

        let mut last = detail.job;
        for (start, end) in [("07:10", "08:17"), ("09:00", "09:01"), ("12:00", "16:43")] {
            let (_, job) = svc
                .create_fieldwork(&admin, last.id, visit(start, end))
                .await
                .unwrap();
            last = job;
        }

        let recounted = aggregate::recompute(&app.db, last.clone()).await.unwrap();
        assert_eq!(recounted.visited, last.visited);
        assert_eq!(recounted.total_time_spent, last.total_time_spent);
    }

    #[tokio::test]
    async fn mixed_mutations_match_a_full_recount() {
        let app = TestApp::spawn().await;
        let admin = app.admin().await;
        let svc = app.service();
        let (detail, _) = svc
            .create_job(&admin, job_req("J-1", places::UNKNOWN))
            .await
            .unwrap();
        let job_id = detail.job.id;

        let (first, _) = svc
            .create_fieldwork(&admin, job_id, visit("07:10", "08:17"))
            .await
            .unwrap();
        let (second, _) = svc
            .create_fieldwork(&admin, job_id, visit("09:00", "11:20"))
            .await
            .unwrap();
        svc.update_fieldwork(&admin, first.id, from(json!({"end_time": "09:44"})))
            .await
            .unwrap();
        svc.delete_fieldwork(&admin, second.id).await.unwrap();
        let (_, job) = svc
            .create_fieldwork(&admin, job_id, visit("12:00", "16:43"))
            .await
            .unwrap();

        let stored = stored_job(&app, job_id).await;
        assert_eq!(stored.visited, job.visited);
        assert_eq!(stored.total_time_spent, job.total_time_spent);

        let recounted = aggregate::recompute(&app.db, stored.clone()).await.unwrap();
        assert_eq!(recounted.visited, 2);
        assert_eq!(recounted.visited, stored.visited);
        assert_eq!(recounted.total_time_spent, stored.total_time_spent);
    }

    #[tokio::test]
    async fn editing_times_updates_the_entry_and_the_job() {
        let app = TestApp::spawn().await;
        let admin = app.admin().await;
        let svc = app.service();
        let (detail, _) = svc
            .create_job(&admin, job_req("J-1", places::UNKNOWN))
            .await
            .unwrap();
        let (entry, _) = svc
            .create_fieldwork(&admin, detail.job.id, visit("08:00", "09:00"))
            .await
            .unwrap();

        let (entry, job) = svc
            .update_fieldwork(&admin, entry.id, from(json!({"end_time": "17:30"})))
            .await
            .unwrap();

        assert_eq!(entry.total_time, 9.5);
        assert_eq!(job.visited, 1);
        assert_eq!(job.total_time_spent, 9.5);
    }

    #[tokio::test]
    async fn concurrent_edits_of_one_entry_both_land() {
        let app = TestApp::spawn().await;
        let admin = app.admin().await;
        let svc = app.service();
        let (detail, _) = svc
            .create_job(&admin, job_req("J-1", places::UNKNOWN))
            .await
            .unwrap();
        let (entry, _) = svc
            .create_fieldwork(&admin, detail.job.id, visit("08:00", "09:00"))
            .await
            .unwrap();

        let (early, late) = tokio::join!(
            svc.update_fieldwork(&admin, entry.id, from(json!({"start_time": "07:00"}))),
            svc.update_fieldwork(&admin, entry.id, from(json!({"end_time": "12:00"}))),
        );
        early.unwrap();
        late.unwrap();

        let stored = svc.get_fieldwork(entry.id).await.unwrap();
        assert_eq!(stored.total_time, 5.0);
        let job = stored_job(&app, detail.job.id).await;
        assert_eq!(job.total_time_spent, 5.0);
    }

    #[tokio::test]
    async fn editing_a_deleted_entry_reports_not_found() {
        let app = TestApp::spawn().await;
        let admin = app.admin().await;
        let svc = app.service();
        let (detail, _) = svc
            .create_job(&admin, job_req("J-1", places::UNKNOWN))
            .await
            .unwrap();
        let (entry, _) = svc
            .create_fieldwork(&admin, detail.job.id, visit("08:00", "09:00"))
            .await
            .unwrap();
        svc.delete_fieldwork(&admin, entry.id).await.unwrap();

        let err = svc
            .update_fieldwork(&admin, entry.id, from(json!({"notes": "late"})))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn empty_fieldwork_update_changes_nothing() {
        let app = TestApp::spawn().await;
        let admin = app.admin().await;
        let svc = app.service();
        let (detail, _) = svc
            .create_job(&admin, job_req("J-1", places::UNKNOWN))
            .await
            .unwrap();
        let (entry, _) = svc
            .create_fieldwork(&admin, detail.job.id, visit("08:00", "09:00"))
            .await
            .unwrap();

        let (after, job) = svc
            .update_fieldwork(&admin, entry.id, UpdateFieldWorkRequest::default())
            .await
            .unwrap();

        assert_eq!(after, entry);
        assert_eq!(job.total_time_spent, 1.0);
    }
}

mod durations {
    use super::*;

    #[tokio::test]
    async fn duration_is_end_minus_start_in_hours() {
        let app = TestApp::spawn().await;
        let admin = app.admin().await;
        let svc = app.service();
        let (detail, _) = svc
            .create_job(&admin, job_req("J-1", places::UNKNOWN))
            .await
            .unwrap();

        let (entry, _) = svc
            .create_fieldwork(&admin, detail.job.id, visit("08:00", "17:30"))
            .await
            .unwrap();

        assert_eq!(entry.total_time, 9.5);
    }

    #[tokio::test]
    async fn equal_start_and_end_is_a_zero_hour_visit() {
        let app = TestApp::spawn().await;
        let admin = app.admin().await;
        let svc = app.service();
        let (detail, _) = svc
            .create_job(&admin, job_req("J-1", places::UNKNOWN))
            .await
            .unwrap();

        let (entry, job) = svc
            .create_fieldwork(&admin, detail.job.id, visit("12:00", "12:00"))
            .await
            .unwrap();

        assert_eq!(entry.total_time, 0.0);
        assert_eq!(job.visited, 1);
    }

    #[tokio::test]
    async fn end_before_start_is_rejected_and_nothing_is_stored() {
        let app = TestApp::spawn().await;
        let admin = app.admin().await;
        let svc = app.service();
        let (detail, _) = svc
            .create_job(&admin, job_req("J-1", places::UNKNOWN))
            .await
            .unwrap();

        let err = svc
            .create_fieldwork(&admin, detail.job.id, visit("17:00", "08:00"))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Validation(_)));
        let (job, entries) = svc.get_fieldwork_for_job(detail.job.id).await.unwrap();
        assert!(entries.is_empty());
        assert_eq!(job.visited, 0);
    }

    #[tokio::test]
    async fn update_that_inverts_times_is_rejected() {
        let app = TestApp::spawn().await;
        let admin = app.admin().await;
        let svc = app.service();
        let (detail, _) = svc
            .create_job(&admin, job_req("J-1", places::UNKNOWN))
            .await
            .unwrap();
        let (entry, _) = svc
            .create_fieldwork(&admin, detail.job.id, visit("08:00", "09:00"))
            .await
            .unwrap();

        let err = svc
            .update_fieldwork(&admin, entry.id, from(json!({"start_time": "10:00"})))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(svc.get_fieldwork(entry.id).await.unwrap().total_time, 1.0);
    }
}

mod job_numbers {
    use super::*;

    #[tokio::test]
    async fn duplicate_active_job_number_is_rejected() {
        let app = TestApp::spawn().await;
        let admin = app.admin().await;
        let svc = app.service();
        svc.create_job(&admin, job_req("A1-2", places::UNKNOWN))
            .await
            .unwrap();

        let err = svc
            .create_job(&admin, job_req("A1-2", places::UNKNOWN))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::DuplicateJobNumber(ref n) if n == "A1-2"));
    }

    #[tokio::test]
    async fn job_number_is_reusable_after_soft_delete() {
        let app = TestApp::spawn().await;
        let admin = app.admin().await;
        let svc = app.service();
        let (first, _) = svc
            .create_job(&admin, job_req("A1-2", places::UNKNOWN))
            .await
            .unwrap();
        svc.delete_job(&admin, first.job.id).await.unwrap();

        let (second, _) = svc
            .create_job(&admin, job_req("A1-2", places::UNKNOWN))
            .await
            .unwrap();

        assert_ne!(first.job.id, second.job.id);
        assert_eq!(second.job.job_number, "A1-2");
    }

    #[tokio::test]
    async fn renaming_onto_an_active_number_is_rejected() {
        let app = TestApp::spawn().await;
        let admin = app.admin().await;
        let svc = app.service();
        svc.create_job(&admin, job_req("A-1", places::UNKNOWN))
            .await
            .unwrap();
        let (other, _) = svc
            .create_job(&admin, job_req("B-1", places::UNKNOWN))
            .await
            .unwrap();

        let err = svc
            .update_job(&admin, other.job.id, from(json!({"job_number": "A-1"})))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::DuplicateJobNumber(_)));
    }

    #[tokio::test]
    async fn keeping_the_same_number_on_update_is_allowed() {
        let app = TestApp::spawn().await;
        let admin = app.admin().await;
        let svc = app.service();
        let (detail, _) = svc
            .create_job(&admin, job_req("A-1", places::UNKNOWN))
            .await
            .unwrap();

        let (detail, report) = svc
            .update_job(
                &admin,
                detail.job.id,
                from(json!({"job_number": "A-1", "client": "Beta LLC"})),
            )
            .await
            .unwrap();

        assert_eq!(detail.job.client, "Beta LLC");
        assert!(report.is_none());
    }
}

mod soft_delete {
    use super::*;

    #[tokio::test]
    async fn deleted_job_leaves_the_list_but_stays_readable() {
        let app = TestApp::spawn().await;
        let admin = app.admin().await;
        let svc = app.service();
        let (detail, _) = svc
            .create_job(&admin, job_req("J-1", places::UNKNOWN))
            .await
            .unwrap();
        svc.create_fieldwork(&admin, detail.job.id, visit("08:00", "10:00"))
            .await
            .unwrap();

        svc.delete_job(&admin, detail.job.id).await.unwrap();

        let (listed, pagination) = svc.list_jobs(&JobListQuery::default()).await.unwrap();
        assert!(listed.is_empty());
        assert_eq!(pagination.total, 0);

        let fetched = svc.get_job(detail.job.id).await.unwrap();
        assert!(fetched.job.deleted_at.is_some());
        assert_eq!(fetched.job.deleted_by, Some(admin.user_id));

        let (job, entries) = svc.get_fieldwork_for_job(detail.job.id).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(job.total_time_spent, 2.0);
    }

    #[tokio::test]
    async fn deleted_job_accepts_no_changes() {
        let app = TestApp::spawn().await;
        let admin = app.admin().await;
        let svc = app.service();
        let (detail, _) = svc
            .create_job(&admin, job_req("J-1", places::UNKNOWN))
            .await
            .unwrap();
        let (entry, _) = svc
            .create_fieldwork(&admin, detail.job.id, visit("08:00", "10:00"))
            .await
            .unwrap();
        svc.delete_job(&admin, detail.job.id).await.unwrap();

        let update = svc
            .update_job(&admin, detail.job.id, from(json!({"client": "X"})))
            .await;
        let log = svc
            .create_fieldwork(&admin, detail.job.id, visit("11:00", "12:00"))
            .await;
        let edit = svc
            .update_fieldwork(&admin, entry.id, from(json!({"notes": "late"})))
            .await;
        let again = svc.delete_job(&admin, detail.job.id).await;

        assert!(matches!(update, Err(AppError::NotFound(_))));
        assert!(matches!(log, Err(AppError::NotFound(_))));
        assert!(matches!(edit, Err(AppError::NotFound(_))));
        assert!(matches!(again, Err(AppError::NotFound(_))));
    }
}

mod enrichment {
    use super::*;

    #[tokio::test]
    async fn resolved_address_fills_location_county_and_link() {
        let app = TestApp::spawn().await;
        let admin = app.admin().await;

        let (detail, report) = app
            .service()
            .create_job(&admin, job_req("J-1", places::PALM_BAY))
            .await
            .unwrap();

        assert_eq!(detail.job.address, places::PALM_BAY_FORMATTED);
        assert_eq!(detail.job.lat.as_deref(), Some("28.03"));
        assert_eq!(detail.job.long.as_deref(), Some("-80.59"));
        assert_eq!(detail.job.county.as_deref(), Some("BREVARD"));
        assert!(detail.job.property_link.is_some());
        assert!(report.geocoded && report.county_located && report.property_linked);
    }

    #[tokio::test]
    async fn failing_geocoder_keeps_the_raw_address() {
        let app = TestApp::spawn_with(FakeGeocoder::always_failing()).await;
        let admin = app.admin().await;

        let (detail, report) = app
            .service()
            .create_job(&admin, job_req("J-1", places::PALM_BAY))
            .await
            .unwrap();

        assert_eq!(detail.job.address, places::PALM_BAY);
        assert_eq!(detail.job.lat, None);
        assert_eq!(detail.job.long, None);
        assert_eq!(detail.job.county, None);
        assert!(!report.geocoded);
        assert!(!report.county_located);
    }

    #[tokio::test]
    async fn property_lookup_is_skipped_outside_the_records_county() {
        let app = TestApp::spawn().await;
        let admin = app.admin().await;

        let (detail, report) = app
            .service()
            .create_job(&admin, job_req("J-1", places::ORLANDO))
            .await
            .unwrap();

        assert_eq!(detail.job.county.as_deref(), Some("ORANGE"));
        assert_eq!(detail.job.property_link, None);
        assert!(!report.property_linked);
        assert_eq!(app.linker.calls(), 0);
    }

    #[tokio::test]
    async fn coordinates_outside_every_county_leave_county_empty() {
        let app = TestApp::spawn().await;
        let admin = app.admin().await;

        let (detail, report) = app
            .service()
            .create_job(&admin, job_req("J-1", places::OFFSHORE))
            .await
            .unwrap();

        assert!(detail.job.lat.is_some());
        assert_eq!(detail.job.county, None);
        assert!(report.geocoded);
        assert!(!report.county_located);
    }

    #[tokio::test]
    async fn explicit_property_link_wins_over_lookup() {
        let app = TestApp::spawn().await;
        let admin = app.admin().await;
        let req = from(json!({
            "job_number": "J-1",
            "client": "Acme Homes",
            "address": places::PALM_BAY,
            "property_link": "https://example.com/parcel/9",
        }));

        let (detail, _) = app.service().create_job(&admin, req).await.unwrap();

        assert_eq!(
            detail.job.property_link.as_deref(),
            Some("https://example.com/parcel/9")
        );
    }

    #[tokio::test]
    async fn new_resolved_address_replaces_location_together() {
        let app = TestApp::spawn().await;
        let admin = app.admin().await;
        let svc = app.service();
        let (detail, _) = svc
            .create_job(&admin, job_req("J-1", places::PALM_BAY))
            .await
            .unwrap();

        let (detail, report) = svc
            .update_job(
                &admin,
                detail.job.id,
                from(json!({"address": places::ORLANDO})),
            )
            .await
            .unwrap();

        assert_eq!(detail.job.address, places::ORLANDO_FORMATTED);
        assert_eq!(detail.job.lat.as_deref(), Some("28.54"));
        assert_eq!(detail.job.long.as_deref(), Some("-81.38"));
        assert_eq!(detail.job.county.as_deref(), Some("ORANGE"));
        assert_eq!(detail.job.property_link, None);
        assert!(report.is_some_and(|r| r.geocoded));
    }

    #[tokio::test]
    async fn unresolved_new_address_leaves_location_untouched() {
        let app = TestApp::spawn().await;
        let admin = app.admin().await;
        let svc = app.service();
        let (before, _) = svc
            .create_job(&admin, job_req("J-1", places::PALM_BAY))
            .await
            .unwrap();

        let (after, report) = svc
            .update_job(
                &admin,
                before.job.id,
                from(json!({"address": places::UNKNOWN, "client": "Beta LLC"})),
            )
            .await
            .unwrap();

        assert_eq!(after.job.client, "Beta LLC");
        assert_eq!(after.job.address, before.job.address);
        assert_eq!(after.job.lat, before.job.lat);
        assert_eq!(after.job.long, before.job.long);
        assert_eq!(after.job.county, before.job.county);
        assert!(report.is_some_and(|r| !r.geocoded));
    }

    #[tokio::test]
    async fn unchanged_address_is_not_geocoded_again() {
        let app = TestApp::spawn().await;
        let admin = app.admin().await;
        let svc = app.service();
        let (detail, _) = svc
            .create_job(&admin, job_req("J-1", places::PALM_BAY))
            .await
            .unwrap();
        let calls = app.linker.calls();

        let (_, report) = svc
            .update_job(
                &admin,
                detail.job.id,
                from(json!({"address": places::PALM_BAY_FORMATTED})),
            )
            .await
            .unwrap();

        assert!(report.is_none());
        assert_eq!(app.linker.calls(), calls);
    }
}

mod roles {
    use super::*;

    #[tokio::test]
    async fn crew_cannot_manage_jobs_or_fieldwork() {
        let app = TestApp::spawn().await;
        let admin = app.admin().await;
        let crew = app.crew().await;
        let svc = app.service();
        let (detail, _) = svc
            .create_job(&admin, job_req("J-1", places::UNKNOWN))
            .await
            .unwrap();
        let (entry, _) = svc
            .create_fieldwork(&admin, detail.job.id, visit("08:00", "09:00"))
            .await
            .unwrap();

        let create = svc.create_job(&crew, job_req("J-2", places::UNKNOWN)).await;
        let update = svc
            .update_job(&crew, detail.job.id, UpdateJobRequest::default())
            .await;
        let delete = svc.delete_job(&crew, detail.job.id).await;
        let log = svc
            .create_fieldwork(&crew, detail.job.id, visit("10:00", "11:00"))
            .await;
        let edit = svc
            .update_fieldwork(&crew, entry.id, from(json!({"crew": "Crew 4"})))
            .await;
        let remove = svc.delete_fieldwork(&crew, entry.id).await;

        assert!(matches!(create, Err(AppError::PermissionDenied)));
        assert!(matches!(update, Err(AppError::PermissionDenied)));
        assert!(matches!(delete, Err(AppError::PermissionDenied)));
        assert!(matches!(log, Err(AppError::PermissionDenied)));
        assert!(matches!(edit, Err(AppError::PermissionDenied)));
        assert!(matches!(remove, Err(AppError::PermissionDenied)));

        let stored = stored_job(&app, detail.job.id).await;
        assert_eq!(stored.visited, 1);
        assert_eq!(stored.total_time_spent, 1.0);
        assert_eq!(svc.get_fieldwork(entry.id).await.unwrap().crew, None);
    }
}

mod listing {
    use super::*;

    #[tokio::test]
    async fn page_past_the_end_is_empty() {
        let app = TestApp::spawn().await;
        let admin = app.admin().await;
        let svc = app.service();
        svc.create_job(&admin, job_req("J-1", places::UNKNOWN))
            .await
            .unwrap();

        let query = JobListQuery {
            page: Some(u64::MAX),
            ..Default::default()
        };
        let (listed, pagination) = svc.list_jobs(&query).await.unwrap();

        assert!(listed.is_empty());
        assert_eq!(pagination.total, 1);
        assert_eq!(pagination.total_pages, 1);
    }
}

mod relations {
    use super::*;

    #[tokio::test]
    async fn relations_are_symmetric() {
        let app = TestApp::spawn().await;
        let admin = app.admin().await;
        let svc = app.service();
        let (a, _) = svc
            .create_job(&admin, job_req("A-1", places::UNKNOWN))
            .await
            .unwrap();
        let mut req = job_req("B-1", places::UNKNOWN);
        req.related_job_ids = vec![a.job.id];

        let (b, _) = svc.create_job(&admin, req).await.unwrap();

        assert_eq!(b.related_job_ids, vec![a.job.id]);
        assert_eq!(svc.get_job(a.job.id).await.unwrap().related_job_ids, vec![b.job.id]);
    }

    #[tokio::test]
    async fn self_relation_is_rejected() {
        let app = TestApp::spawn().await;
        let admin = app.admin().await;
        let svc = app.service();
        let (a, _) = svc
            .create_job(&admin, job_req("A-1", places::UNKNOWN))
            .await
            .unwrap();

        let err = svc
            .update_job(&admin, a.job.id, from(json!({"related_job_ids": [a.job.id]})))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn failed_relation_rolls_back_the_new_job() {
        let app = TestApp::spawn().await;
        let admin = app.admin().await;
        let svc = app.service();
        let mut req = job_req("A-1", places::UNKNOWN);
        req.related_job_ids = vec![999];

        let err = svc.create_job(&admin, req).await.unwrap_err();

        assert!(matches!(err, AppError::Validation(_)));
        let (listed, _) = svc.list_jobs(&JobListQuery::default()).await.unwrap();
        assert!(listed.is_empty());
    }
}

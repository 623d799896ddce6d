pub mod field_work;
pub mod job;
pub mod job_relation;
pub mod job_tag;
pub mod tag;
pub mod user;

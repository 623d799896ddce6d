pub mod aggregate;
pub mod service;

pub use service::{JobDetail, JobService};

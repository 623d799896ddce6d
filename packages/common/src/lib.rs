pub mod county;
pub mod duration;
pub mod job_status;
pub mod resolution;
pub mod user_role;

pub use county::{County, CountyLocator, Polygon};
pub use duration::{DurationError, compute_duration};
pub use job_status::JobStatus;
pub use resolution::Resolution;
pub use user_role::UserRole;

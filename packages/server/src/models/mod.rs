pub mod auth;
pub mod fieldwork;
pub mod job;
pub mod shared;
pub mod tag;
pub mod user;

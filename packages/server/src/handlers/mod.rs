pub mod auth;
pub mod fieldwork;
pub mod geocode;
pub mod job;
pub mod tag;
pub mod user;

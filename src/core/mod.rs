//! Device polling and publishing.

pub mod app;
pub mod collector;
pub mod device;
pub mod measurement;
pub mod publisher;

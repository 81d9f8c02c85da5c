//! Request handlers grouped by concern.

pub mod flow;
pub mod health;
pub mod records;

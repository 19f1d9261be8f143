//! Request execution pipeline.

pub mod body;
pub mod classify;
pub mod dispatch;
pub mod headers;
pub mod request;
pub mod url;

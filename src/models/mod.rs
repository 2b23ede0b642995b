//! Wire types for the upload service.
//!
//! These entities are the JSON contract of the HTTP surface and the shape
//! of remote listing entries. They serialize naturally via `serde`.

pub mod remote_object;
pub mod upload;

//! HTTP handlers. Each one reads its request, calls the upload processor and
//! shapes the result; no image logic lives here.

pub mod cleanup;
pub mod uploads;

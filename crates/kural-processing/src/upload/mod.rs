//! Upload input types.

mod types;

pub use types::UploadCandidate;

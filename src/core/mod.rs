//! Core logic independent of the capture backend.
//!
//! - [`extractor`]: server URL / stream key discovery in packet text

pub mod extractor;

pub use extractor::{extract, Credential, Extraction};

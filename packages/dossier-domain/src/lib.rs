//! Record interpretation shared by every dossier crate.
//!
//! Everything in here is pure: CRM payloads come in as [`serde_json::Value`]
//! and deterministic text comes out. No IO, no clocks, no randomness.

pub mod chunk;
pub mod document;
pub mod identity;
pub mod module;
pub mod partition;
pub mod payload;

pub use identity::{IdentityProfile, derive_identity};
pub use module::Module;
pub use partition::{DIRECTORY_PARTITION, partition_name};

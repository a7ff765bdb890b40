//! CLI command implementations

pub mod backfill;
pub mod decompose;
pub mod init;
pub mod status;
pub mod validate;

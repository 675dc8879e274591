//! overcheck-core: method-collision analysis and project-wide rename.
//!
//! This crate provides:
//! - Source model seam: [`provider::SourceModelProvider`] and [`provider::Binder`]
//! - Immutable, versioned project snapshots
//! - Fragment merging and collision detection over allow-listed aggregates
//! - Reference location, rename planning, and atomic rename application
//! - Fix requests, fix-all, and a single-writer project handle

pub mod analysis;
pub mod config;
pub mod error;
pub mod fix;
pub mod output;
pub mod patch;
pub mod project;
pub mod provider;
pub mod rename;
pub mod snapshot;
pub mod text;
pub mod types;

#[cfg(test)]
mod testing;

pub use tokio_util::sync::CancellationToken;

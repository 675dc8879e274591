//! overcheck: method-collision analysis for partial aggregate types.
//!
//! Aggregates (classes, structs, records) may be split across several
//! fragments in different source units. overcheck merges the fragments of
//! every allow-listed aggregate, reports each method that shares its name
//! with a sibling, and fixes a report by renaming the member and every
//! reference to it across the project.
//!
//! The analysis and rename machinery lives in `overcheck-core` and knows
//! nothing about any language. Parsing and binding come from a
//! [`provider::SourceModelProvider`]; [`csharp`] is the reference provider.

// Core - re-exported from overcheck-core
pub use overcheck_core::analysis;
pub use overcheck_core::config;
pub use overcheck_core::error;
pub use overcheck_core::fix;
pub use overcheck_core::output;
pub use overcheck_core::patch;
pub use overcheck_core::project;
pub use overcheck_core::provider;
pub use overcheck_core::rename;
pub use overcheck_core::snapshot;
pub use overcheck_core::text;
pub use overcheck_core::types;
pub use overcheck_core::CancellationToken;

// Language providers
pub use overcheck_csharp as csharp;

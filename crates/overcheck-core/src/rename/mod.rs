//! Project-wide rename: locate, plan, apply.
//!
//! - [`find_references`]: every occurrence bound to one symbol identity
//! - [`plan_rename`]: validate a candidate name and build an [`EditPlan`]
//! - [`apply_plan`]: rewrite all affected units atomically into a new snapshot
//!
//! Planning and application are serialized per snapshot. A plan carries the
//! ID of the snapshot it was built against and is rejected anywhere else.
//!
//! [`EditPlan`]: crate::patch::EditPlan

pub mod apply;
pub mod locate;
pub mod naming;
pub mod plan;

pub use apply::apply_plan;
pub use locate::{find_references, Reference};
pub use naming::{NamingPolicy, SuffixedName, UppercaseName};
pub use plan::plan_rename;

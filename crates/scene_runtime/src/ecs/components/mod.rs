//! Built-in per-entity parts
//!
//! The transform node every entity owns and the placeholder kept for
//! unresolved behavior records.

pub mod transform;
pub mod missing;

pub use transform::TransformNode;
pub use missing::MissingBehaviorRecord;

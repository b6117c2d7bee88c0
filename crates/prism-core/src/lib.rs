//! Prism Core - Documentation-model engine for the Prism documentation tool
//!
//! This crate provides the core pipeline:
//! - Identifiers: stable structural identifiers for declarations
//! - Platform sets: atomic and composite platform-variant identifiers
//! - Model: the declaration tree with per-variant attribute maps
//! - Provider: the boundary to external declaration sources
//! - Builder: per-variant declaration-tree construction
//! - Merge: cross-variant merging and clash resolution
//! - Content: page and content-tree assembly for renderers
//!
//! The pipeline runs declaration provider → tree builder (one tree per
//! platform variant, built in parallel) → merge engine → content
//! assembler; the assembled page tree and its link index are the
//! contract handed to external renderers.

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Error types shared across the pipeline
pub mod error;

/// Stable declaration identifiers
pub mod ident;

/// Platform-variant and platform-set identifiers
pub mod platform;

/// Declaration-tree data model
pub mod model;

/// Declaration provider boundary
pub mod provider;

/// Per-variant declaration-tree construction
pub mod builder;

/// Cross-variant declaration merging
pub mod merge;

/// Content-tree and page assembly
pub mod content;

/// Convenience re-export of the identifier type
pub use ident::DeclId;

/// Convenience re-export of the variant identifier types
pub use platform::{CompositeVariantId, Variant, VariantId};

/// Convenience re-export of the declaration node
pub use model::DeclarationNode;

/// Convenience re-export of the tree builder
pub use builder::{build_forests, TreeBuilder, VariantForest};

/// Convenience re-export of the merge engine
pub use merge::{MergeEngine, MergeMode, MergeOutcome};

/// Convenience re-export of the assembler
pub use content::{AssembledDocs, Assembler, PageIndex, PageNode};

/// Convenience re-export of the error type
pub use error::CoreError;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_exists() {
        assert!(!VERSION.is_empty());
    }
}

//! Platform-variant identifiers and composite platform sets
//!
//! A build analyzes one or more platform variants (for example a
//! shared `common` variant and a `jvm` implementation of it). Every
//! variant is addressed by an atomic [`VariantId`]; groups of variants
//! that were folded together are addressed by a [`CompositeVariantId`]
//! whose `merged` projection is itself an atomic identifier, so merged
//! groups stay usable anywhere a single variant is expected.

use std::collections::BTreeSet;
use std::fmt;
use std::ops::Add;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Atomic identifier of one analyzed platform variant
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct VariantId {
    /// Name of the module the variant belongs to
    pub module_name: String,
    /// Name of the variant within its module
    pub variant_name: String,
}

impl VariantId {
    /// Create a new variant identifier
    #[must_use]
    pub fn new(module_name: impl Into<String>, variant_name: impl Into<String>) -> Self {
        Self {
            module_name: module_name.into(),
            variant_name: variant_name.into(),
        }
    }
}

impl fmt::Display for VariantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.module_name, self.variant_name)
    }
}

/// Non-empty ordered group of platform variants addressed as one unit
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CompositeVariantId {
    members: Vec<VariantId>,
}

impl CompositeVariantId {
    /// Create a composite identifier from its members
    ///
    /// Fails with [`CoreError::InvalidArgument`] when `members` is
    /// empty; a composite with no members has no `merged` projection
    /// and would poison every containment query downstream.
    pub fn new(members: impl IntoIterator<Item = VariantId>) -> Result<Self, CoreError> {
        let members: Vec<VariantId> = members.into_iter().collect();
        if members.is_empty() {
            return Err(CoreError::invalid_argument(
                "composite platform set requires at least one member",
            ));
        }
        Ok(Self { members })
    }

    /// Composite wrapping a single variant
    #[must_use]
    pub fn single(member: VariantId) -> Self {
        Self {
            members: vec![member],
        }
    }

    /// Members in original order
    #[must_use]
    pub fn members(&self) -> &[VariantId] {
        &self.members
    }

    /// Atomic projection of the whole group
    ///
    /// Concatenates all module names with `+` and all variant names
    /// with `+`, preserving member order. A single-member composite
    /// projects to that member unchanged.
    #[must_use]
    pub fn merged(&self) -> VariantId {
        let module_name = self
            .members
            .iter()
            .map(|m| m.module_name.as_str())
            .collect::<Vec<_>>()
            .join("+");
        let variant_name = self
            .members
            .iter()
            .map(|m| m.variant_name.as_str())
            .collect::<Vec<_>>()
            .join("+");
        VariantId::new(module_name, variant_name)
    }

    /// Whether an atomic identifier is covered by this group
    ///
    /// True for every member and for the group's own `merged`
    /// projection, so a folded group answers containment queries for
    /// the identifier it is addressed by after merging.
    #[must_use]
    pub fn contains(&self, candidate: &VariantId) -> bool {
        self.members.contains(candidate) || *candidate == self.merged()
    }

    /// Whether a composite identifier denotes this exact group
    ///
    /// Composite containment is full-group identity via the `merged`
    /// projection, not subset containment.
    #[must_use]
    pub fn contains_composite(&self, candidate: &CompositeVariantId) -> bool {
        candidate.merged() == self.merged()
    }
}

impl From<VariantId> for CompositeVariantId {
    fn from(member: VariantId) -> Self {
        Self::single(member)
    }
}

impl Add for CompositeVariantId {
    type Output = CompositeVariantId;

    /// Left-to-right concatenation; associative in the resulting
    /// `merged` projection
    fn add(self, rhs: CompositeVariantId) -> CompositeVariantId {
        let mut members = self.members;
        members.extend(rhs.members);
        CompositeVariantId { members }
    }
}

impl fmt::Display for CompositeVariantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.merged())
    }
}

/// Analysis platform a variant targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlatformKind {
    /// JVM targets
    Jvm,
    /// JavaScript targets
    Js,
    /// Native binary targets
    Native,
    /// WebAssembly targets
    Wasm,
    /// Platform-independent shared code
    Common,
}

impl fmt::Display for PlatformKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PlatformKind::Jvm => "jvm",
            PlatformKind::Js => "js",
            PlatformKind::Native => "native",
            PlatformKind::Wasm => "wasm",
            PlatformKind::Common => "common",
        };
        write!(f, "{name}")
    }
}

/// Full description of one analyzed platform variant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variant {
    /// Identifier used as the key of every per-variant attribute map
    pub id: VariantId,
    /// Human-readable name shown in rendered output
    pub display_name: String,
    /// Targeted platform
    pub kind: PlatformKind,
    /// Variants this one depends on; an implementation variant lists
    /// the shared variant holding its expected declarations here
    pub depends_on: Vec<VariantId>,
}

impl Variant {
    /// Create a variant description
    #[must_use]
    pub fn new(id: VariantId, display_name: impl Into<String>, kind: PlatformKind) -> Self {
        Self {
            id,
            display_name: display_name.into(),
            kind,
            depends_on: Vec::new(),
        }
    }

    /// Add a dependency edge
    #[must_use]
    pub fn with_dependency(mut self, on: VariantId) -> Self {
        self.depends_on.push(on);
        self
    }
}

/// Named platform grouping used to tag rendered content
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayVariant {
    /// Name shown to readers
    pub display_name: String,
    /// Platform the group renders for
    pub kind: PlatformKind,
    /// The variants the group covers
    pub id: CompositeVariantId,
}

impl DisplayVariant {
    /// Create a display grouping
    #[must_use]
    pub fn new(display_name: impl Into<String>, kind: PlatformKind, id: CompositeVariantId) -> Self {
        Self {
            display_name: display_name.into(),
            kind,
            id,
        }
    }
}

/// Whether any display grouping in `groups` covers `variant`
#[must_use]
pub fn any_contains(groups: &[DisplayVariant], variant: &VariantId) -> bool {
    groups.iter().any(|g| g.id.contains(variant))
}

/// Collect the atomic ids of a set of variants into an ordered set
#[must_use]
pub fn variant_ids(variants: &[Variant]) -> BTreeSet<VariantId> {
    variants.iter().map(|v| v.id.clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(module: &str, variant: &str) -> VariantId {
        VariantId::new(module, variant)
    }

    #[test]
    fn test_empty_composite_is_rejected() {
        let err = CompositeVariantId::new(Vec::new()).unwrap_err();
        assert!(matches!(err, CoreError::InvalidArgument { .. }));
    }

    #[test]
    fn test_merged_concatenates_in_order() {
        let composite =
            CompositeVariantId::new([id("core", "common"), id("core", "jvm")]).unwrap();
        assert_eq!(composite.merged(), id("core+core", "common+jvm"));
    }

    #[test]
    fn test_single_member_merges_to_itself() {
        let composite = CompositeVariantId::single(id("core", "jvm"));
        assert_eq!(composite.merged(), id("core", "jvm"));
    }

    #[test]
    fn test_atomic_containment() {
        let composite =
            CompositeVariantId::new([id("m1", "s1"), id("m2", "s2")]).unwrap();
        assert!(composite.contains(&id("m1", "s1")));
        assert!(composite.contains(&id("m2", "s2")));
        assert!(!composite.contains(&id("m3", "s3")));
    }

    #[test]
    fn test_composite_containment_is_full_group_identity() {
        let composite =
            CompositeVariantId::new([id("m1", "s1"), id("m2", "s2")]).unwrap();
        // The merged projection of the whole set is contained
        assert!(composite.contains(&composite.merged()));
        assert!(composite.contains_composite(&composite));
        // A strict subset is not
        let subset = CompositeVariantId::single(id("m1", "s1"));
        assert!(!composite.contains_composite(&subset));
    }

    #[test]
    fn test_concatenation_is_associative_in_merged_form() {
        let a = CompositeVariantId::single(id("a", "x"));
        let b = CompositeVariantId::single(id("b", "y"));
        let c = CompositeVariantId::single(id("c", "z"));

        let left = (a.clone() + b.clone()) + c.clone();
        let right = a + (b + c);
        assert_eq!(left.merged(), right.merged());
        assert_eq!(left.merged(), id("a+b+c", "x+y+z"));
    }

    #[test]
    fn test_display_variant_lookup() {
        let jvm_group = DisplayVariant::new(
            "JVM",
            PlatformKind::Jvm,
            CompositeVariantId::single(id("core", "jvm")),
        );
        let native_group = DisplayVariant::new(
            "Native",
            PlatformKind::Native,
            CompositeVariantId::single(id("core", "native")),
        );
        let groups = vec![jvm_group, native_group];

        assert!(any_contains(&groups, &id("core", "jvm")));
        assert!(!any_contains(&groups, &id("core", "js")));
    }
}

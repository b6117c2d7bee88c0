//! Declaration-tree data model
//!
//! The model is a tree of [`DeclarationNode`]s. One node represents
//! one logical declaration; everything that can differ between
//! platform variants (documentation, visibility, modality,
//! annotations) lives in per-variant maps keyed by [`VariantId`], and
//! the node's `variants` set is always the union of those map keys.
//!
//! Declaration kinds are a closed enum with the shared fields hoisted
//! into the node itself; the few kind-specific facts (a function's
//! signature, a type alias's underlying type) sit in an optional
//! [`KindDetail`] side-structure.

mod docs;
mod extra;

pub use docs::{DocBlock, DocLanguage, DocSegment};
pub use extra::{ClashResolution, Extra, ExtraFact, InheritedFrom, ObviousMember};

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::ident::{DeclId, TypeRef};
use crate::platform::VariantId;

/// Kind of declaration a node represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeclKind {
    Module,
    Package,
    Class,
    Interface,
    Object,
    Enum,
    Annotation,
    Function,
    Property,
    Parameter,
    TypeAlias,
    EnumEntry,
}

impl DeclKind {
    /// Get the display name for the declaration kind
    #[must_use]
    pub fn display_name(&self) -> &'static str {
        match self {
            DeclKind::Module => "Module",
            DeclKind::Package => "Package",
            DeclKind::Class => "Class",
            DeclKind::Interface => "Interface",
            DeclKind::Object => "Object",
            DeclKind::Enum => "Enum",
            DeclKind::Annotation => "Annotation",
            DeclKind::Function => "Function",
            DeclKind::Property => "Property",
            DeclKind::Parameter => "Parameter",
            DeclKind::TypeAlias => "Type alias",
            DeclKind::EnumEntry => "Enum entry",
        }
    }

    /// Whether the kind is a class-like container of members
    #[must_use]
    pub fn is_classlike(&self) -> bool {
        matches!(
            self,
            DeclKind::Class
                | DeclKind::Interface
                | DeclKind::Object
                | DeclKind::Enum
                | DeclKind::Annotation
        )
    }

    /// Whether a declaration of this kind gets its own page
    #[must_use]
    pub fn is_page_worthy(&self) -> bool {
        self.is_classlike()
            || matches!(
                self,
                DeclKind::Module | DeclKind::Package | DeclKind::Function | DeclKind::Property
            )
    }
}

/// Visibility level of a declaration in one variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    Protected,
    Internal,
    Private,
}

/// Modality level of a declaration in one variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Modality {
    Final,
    Open,
    Abstract,
    Sealed,
}

/// One annotation applied to a declaration
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Annotation {
    /// Identifier of the annotation class
    pub id: DeclId,
    /// Named argument values, rendered form
    #[serde(default)]
    pub values: BTreeMap<String, String>,
}

impl Annotation {
    /// Annotation with no arguments
    #[must_use]
    pub fn new(id: DeclId) -> Self {
        Self {
            id,
            values: BTreeMap::new(),
        }
    }
}

/// A generic type parameter of a declaration
#[derive(Debug, Clone, PartialEq)]
pub struct TypeParamNode {
    /// Owning declaration's identifier pointed at this parameter
    pub id: DeclId,
    /// Parameter name
    pub name: String,
    /// Declared upper bounds
    pub bounds: Vec<TypeRef>,
    /// Per-variant documentation for the parameter
    pub documentation: BTreeMap<VariantId, DocBlock>,
}

/// Kind-specific facts not shared by all declaration kinds
#[derive(Debug, Clone, PartialEq)]
pub enum KindDetail {
    /// Signature facts of a function or constructor
    Function {
        /// Return type, absent for constructors and unit returns
        return_type: Option<TypeRef>,
        /// Receiver type for extension functions
        receiver: Option<TypeRef>,
        /// Whether the callable is a constructor
        is_constructor: bool,
    },
    /// Declared type of a property
    Property {
        /// The property type
        type_ref: TypeRef,
    },
    /// Declared type of a value parameter
    Parameter {
        /// The parameter type
        type_ref: TypeRef,
    },
    /// Per-variant underlying type of a type alias
    TypeAlias {
        /// The aliased type per variant
        underlying: BTreeMap<VariantId, TypeRef>,
    },
}

/// One declaration in the documentation model
///
/// A node exclusively owns its children; container lookup goes through
/// identifier comparison, never back-pointers. Nodes are immutable
/// once their producing stage (builder or merge engine) hands them
/// out.
#[derive(Debug, Clone)]
pub struct DeclarationNode {
    /// Stable identifier; the sole key for equality and merging
    pub id: DeclId,
    /// Simple declaration name
    pub name: String,
    /// Declaration kind
    pub kind: DeclKind,
    /// Parsed documentation per variant
    pub documentation: BTreeMap<VariantId, DocBlock>,
    /// Visibility per variant
    pub visibility: BTreeMap<VariantId, Visibility>,
    /// Modality per variant
    pub modality: BTreeMap<VariantId, Modality>,
    /// Annotations per variant
    pub annotations: BTreeMap<VariantId, Vec<Annotation>>,
    /// Generic type parameters, in declaration order
    pub type_params: Vec<TypeParamNode>,
    /// Nested declarations, in source order
    pub children: Vec<DeclarationNode>,
    /// Variants this declaration exists in
    pub variants: BTreeSet<VariantId>,
    /// Variant holding the "expected" form of this declaration, if any
    pub expect_present_in: Option<VariantId>,
    /// Kind-specific facts
    pub detail: Option<KindDetail>,
    /// Open bag of cross-cutting facts
    pub extra: Extra,
}

impl DeclarationNode {
    /// Create an empty node of the given identity and kind
    #[must_use]
    pub fn new(id: DeclId, name: impl Into<String>, kind: DeclKind) -> Self {
        Self {
            id,
            name: name.into(),
            kind,
            documentation: BTreeMap::new(),
            visibility: BTreeMap::new(),
            modality: BTreeMap::new(),
            annotations: BTreeMap::new(),
            type_params: Vec::new(),
            children: Vec::new(),
            variants: BTreeSet::new(),
            expect_present_in: None,
            detail: None,
            extra: Extra::new(),
        }
    }

    /// Name to display, honoring a clash-resolved override
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.extra
            .get::<ClashResolution>()
            .map_or(self.name.as_str(), |c| c.display_name.as_str())
    }

    /// Union of the keys of all per-variant attribute maps
    ///
    /// Equal to `variants` on every well-formed node.
    #[must_use]
    pub fn variant_key_union(&self) -> BTreeSet<VariantId> {
        let mut union: BTreeSet<VariantId> = BTreeSet::new();
        union.extend(self.documentation.keys().cloned());
        union.extend(self.visibility.keys().cloned());
        union.extend(self.modality.keys().cloned());
        union.extend(self.annotations.keys().cloned());
        union
    }

    /// Depth-first search for the first node matching `predicate`
    #[must_use]
    pub fn dfs(&self, predicate: &dyn Fn(&DeclarationNode) -> bool) -> Option<&DeclarationNode> {
        if predicate(self) {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.dfs(predicate))
    }

    /// Find a direct child by identifier
    #[must_use]
    pub fn child_by_id(&self, id: &DeclId) -> Option<&DeclarationNode> {
        self.children.iter().find(|child| &child.id == id)
    }

    /// Children of the given kind
    pub fn children_of_kind(&self, kind: DeclKind) -> impl Iterator<Item = &DeclarationNode> {
        self.children.iter().filter(move |child| child.kind == kind)
    }

    /// Canonical callable signature string, empty for non-callables
    #[must_use]
    pub fn signature_string(&self) -> String {
        self.id
            .callable
            .as_ref()
            .map(crate::ident::CallableRef::signature)
            .unwrap_or_default()
    }
}

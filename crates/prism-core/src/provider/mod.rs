//! Declaration provider boundary
//!
//! The engine does not parse or type-check source code. An external
//! provider — one per analyzed platform variant — hands over typed
//! declaration facts, and everything downstream is a pure
//! transformation of those facts. [`InMemoryProvider`] serves
//! programmatic use and tests; [`JsonProvider`] loads a variant's
//! facts from serialized form.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, SourceLocation};
use crate::ident::TypeRef;
use crate::model::{Annotation, DeclKind, DocLanguage, Modality, Visibility};
use crate::platform::Variant;

/// How a declaration came to be in its scope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeclOrigin {
    /// Directly authored in the scope's source
    #[default]
    Source,
    /// Carried over from a supertype
    Inherited,
    /// Generated by the compiler
    Synthetic,
    /// Implemented by delegation
    Delegated,
}

/// A generic type parameter as reported by the provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeParamFact {
    /// Parameter name
    pub name: String,
    /// Declared upper bounds
    #[serde(default)]
    pub bounds: Vec<TypeRef>,
    /// Raw documentation for the parameter
    #[serde(default)]
    pub doc_text: Option<String>,
}

/// A value parameter as reported by the provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterFact {
    /// Parameter name
    pub name: String,
    /// Declared type
    pub type_ref: TypeRef,
    /// Raw documentation for the parameter
    #[serde(default)]
    pub doc_text: Option<String>,
}

/// One declaration as reported by the provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeclarationFact {
    /// How the declaration entered this scope
    #[serde(default)]
    pub origin: DeclOrigin,
    /// Simple name; empty only for unaddressable local declarations
    pub name: String,
    /// Declaration kind
    pub kind: DeclKind,
    /// Visibility in this variant
    #[serde(default = "default_visibility")]
    pub visibility: Visibility,
    /// Modality in this variant
    #[serde(default = "default_modality")]
    pub modality: Modality,
    /// Annotations in this variant
    #[serde(default)]
    pub annotations: Vec<Annotation>,
    /// Raw documentation text
    #[serde(default)]
    pub doc_text: Option<String>,
    /// Brief convention of `doc_text`
    #[serde(default)]
    pub doc_language: DocLanguage,
    /// Generic type parameters
    #[serde(default)]
    pub type_params: Vec<TypeParamFact>,
    /// Value parameters, for callables
    #[serde(default)]
    pub parameters: Vec<ParameterFact>,
    /// Return type, for callables
    #[serde(default)]
    pub return_type: Option<TypeRef>,
    /// Receiver type, for extension callables
    #[serde(default)]
    pub receiver: Option<TypeRef>,
    /// Aliased type, for type aliases
    #[serde(default)]
    pub underlying_type: Option<TypeRef>,
    /// Nested declarations of this scope
    #[serde(default)]
    pub members: Vec<DeclarationFact>,
    /// Chain of facts this one carries over, nearest first; walking
    /// to the end of the chain reaches the root authored declaration
    #[serde(default)]
    pub overridden_by: Vec<DeclarationFact>,
    /// Scope path that authored this fact, when it differs from the
    /// scope it is listed in
    #[serde(default)]
    pub declared_in: Option<Vec<String>>,
    /// Whether the callable is a constructor
    #[serde(default)]
    pub is_constructor: bool,
    /// Whether the declaration is local to a function body
    #[serde(default)]
    pub is_local: bool,
    /// Whether the member is boilerplate tables may suppress
    #[serde(default)]
    pub is_obvious: bool,
    /// Whether this is an "expected" declaration awaiting per-platform
    /// implementations
    #[serde(default)]
    pub is_expected: bool,
    /// Best-effort source location
    #[serde(default)]
    pub location: Option<SourceLocation>,
}

fn default_visibility() -> Visibility {
    Visibility::Public
}

fn default_modality() -> Modality {
    Modality::Final
}

impl DeclarationFact {
    /// Create a fact with defaults for everything but name and kind
    #[must_use]
    pub fn new(name: impl Into<String>, kind: DeclKind) -> Self {
        Self {
            origin: DeclOrigin::Source,
            name: name.into(),
            kind,
            visibility: Visibility::Public,
            modality: Modality::Final,
            annotations: Vec::new(),
            doc_text: None,
            doc_language: DocLanguage::default(),
            type_params: Vec::new(),
            parameters: Vec::new(),
            return_type: None,
            receiver: None,
            underlying_type: None,
            members: Vec::new(),
            overridden_by: Vec::new(),
            declared_in: None,
            is_constructor: false,
            is_local: false,
            is_obvious: false,
            is_expected: false,
            location: None,
        }
    }

    /// Set the raw documentation text
    #[must_use]
    pub fn with_doc(mut self, text: impl Into<String>, language: DocLanguage) -> Self {
        self.doc_text = Some(text.into());
        self.doc_language = language;
        self
    }

    /// Add a nested member
    #[must_use]
    pub fn with_member(mut self, member: DeclarationFact) -> Self {
        self.members.push(member);
        self
    }

    /// Add a value parameter
    #[must_use]
    pub fn with_parameter(mut self, name: impl Into<String>, type_ref: TypeRef) -> Self {
        self.parameters.push(ParameterFact {
            name: name.into(),
            type_ref,
            doc_text: None,
        });
        self
    }

    /// Set the origin
    #[must_use]
    pub fn with_origin(mut self, origin: DeclOrigin) -> Self {
        self.origin = origin;
        self
    }

    /// Mark as an expected declaration
    #[must_use]
    pub fn expected(mut self) -> Self {
        self.is_expected = true;
        self
    }
}

/// One package worth of declarations
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PackageFact {
    /// Dotted package path; empty for the root package
    pub name: String,
    /// Raw package-level documentation
    #[serde(default)]
    pub doc_text: Option<String>,
    /// Brief convention of `doc_text`
    #[serde(default)]
    pub doc_language: DocLanguage,
    /// Declarations directly in the package
    #[serde(default)]
    pub members: Vec<DeclarationFact>,
}

impl PackageFact {
    /// Create an empty package
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Add a declaration to the package
    #[must_use]
    pub fn with_member(mut self, member: DeclarationFact) -> Self {
        self.members.push(member);
        self
    }
}

/// Source of declaration facts for one platform variant
pub trait DeclarationProvider {
    /// The variant this provider describes
    fn variant(&self) -> &Variant;

    /// All packages visible in the variant
    ///
    /// This is the only provider call that can fail; a failure here is
    /// fatal to the whole build because the variant's forest cannot be
    /// built at all.
    fn packages(&self) -> Result<Vec<PackageFact>, CoreError>;
}

/// Provider over facts already in memory
#[derive(Debug, Clone)]
pub struct InMemoryProvider {
    variant: Variant,
    packages: Vec<PackageFact>,
}

impl InMemoryProvider {
    /// Create a provider from a variant description and its packages
    #[must_use]
    pub fn new(variant: Variant, packages: Vec<PackageFact>) -> Self {
        Self { variant, packages }
    }
}

impl DeclarationProvider for InMemoryProvider {
    fn variant(&self) -> &Variant {
        &self.variant
    }

    fn packages(&self) -> Result<Vec<PackageFact>, CoreError> {
        Ok(self.packages.clone())
    }
}

/// Serialized form of one variant's facts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariantFacts {
    /// The analyzed variant
    pub variant: Variant,
    /// Its packages
    #[serde(default)]
    pub packages: Vec<PackageFact>,
}

/// Provider that loads a variant's facts from serialized JSON
#[derive(Debug, Clone)]
pub struct JsonProvider {
    inner: InMemoryProvider,
}

impl JsonProvider {
    /// Load from an in-memory JSON value
    pub fn from_value(value: serde_json::Value) -> Result<Self, CoreError> {
        let facts: VariantFacts = serde_json::from_value(value)
            .map_err(|e| CoreError::invalid_argument(format!("malformed variant facts: {e}")))?;
        Ok(Self {
            inner: InMemoryProvider::new(facts.variant, facts.packages),
        })
    }

    /// Load from a JSON string
    pub fn from_json(json: &str) -> Result<Self, CoreError> {
        let facts: VariantFacts = serde_json::from_str(json)
            .map_err(|e| CoreError::invalid_argument(format!("malformed variant facts: {e}")))?;
        Ok(Self {
            inner: InMemoryProvider::new(facts.variant, facts.packages),
        })
    }

    /// Load from a JSON file on disk
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, CoreError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            CoreError::invalid_argument(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_json(&json)
    }
}

impl DeclarationProvider for JsonProvider {
    fn variant(&self) -> &Variant {
        self.inner.variant()
    }

    fn packages(&self) -> Result<Vec<PackageFact>, CoreError> {
        self.inner.packages()
    }
}

//! Stable declaration identifiers
//!
//! Every declaration in the model is keyed by a [`DeclId`]: a
//! structural identifier built from the enclosing scope path, the
//! declaration name, and (for callables) the parameter and receiver
//! type signature. Two declarations denote the same logical entity
//! exactly when their identifiers are structurally equal, which makes
//! the identifier the sole key for lookup and cross-variant merging.
//!
//! Identifiers are plain owned values. Type references inside a
//! signature form an acyclic tree; a generic bound that refers back to
//! its own type parameter is encoded as [`TypeRef::Recursive`] with a
//! depth count instead of a pointer cycle.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A reference to a type as it appears in a callable signature
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TypeRef {
    /// A named type constructor with its type arguments
    Named {
        /// Fully qualified path of the type
        path: String,
        /// Type arguments, in declaration order
        args: Vec<TypeRef>,
    },
    /// A generic type parameter with its declared bounds
    TypeParam {
        /// Upper bounds of the parameter
        bounds: Vec<TypeRef>,
    },
    /// A nullable wrapper around another type
    Nullable(Box<TypeRef>),
    /// A bound that refers back to the type parameter declaring it,
    /// counted in nesting levels from the point of use
    Recursive(u32),
    /// An unbounded projection
    Star,
}

impl TypeRef {
    /// A named type with no arguments
    #[must_use]
    pub fn named(path: impl Into<String>) -> Self {
        TypeRef::Named {
            path: path.into(),
            args: Vec::new(),
        }
    }

    /// Render this reference into `out` in its canonical form
    fn write_canonical(&self, out: &mut String) {
        match self {
            TypeRef::Named { path, args } => {
                out.push_str(path);
                if !args.is_empty() {
                    out.push('<');
                    for (i, arg) in args.iter().enumerate() {
                        if i > 0 {
                            out.push(',');
                        }
                        arg.write_canonical(out);
                    }
                    out.push('>');
                }
            }
            TypeRef::TypeParam { bounds } => {
                // The identity of a type parameter is its bound list
                out.push('[');
                for (i, bound) in bounds.iter().enumerate() {
                    if i > 0 {
                        out.push(',');
                    }
                    bound.write_canonical(out);
                }
                out.push(']');
            }
            TypeRef::Nullable(inner) => {
                inner.write_canonical(out);
                out.push('?');
            }
            TypeRef::Recursive(depth) => {
                out.push('^');
                out.push_str(&depth.to_string());
            }
            TypeRef::Star => out.push('*'),
        }
    }

    /// Canonical string form of this type reference
    #[must_use]
    pub fn canonical(&self) -> String {
        let mut out = String::new();
        self.write_canonical(&mut out);
        out
    }
}

/// The callable part of an identifier: name plus type signature
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CallableRef {
    /// Callable name
    pub name: String,
    /// Parameter types, in declaration order
    pub params: Vec<TypeRef>,
    /// Receiver type for extension callables
    pub receiver: Option<TypeRef>,
}

impl CallableRef {
    /// Create a callable reference
    #[must_use]
    pub fn new(name: impl Into<String>, params: Vec<TypeRef>, receiver: Option<TypeRef>) -> Self {
        Self {
            name: name.into(),
            params,
            receiver,
        }
    }

    /// Canonical signature string: `name(param1,param2,...)`
    #[must_use]
    pub fn signature(&self) -> String {
        let mut out = String::new();
        if let Some(receiver) = &self.receiver {
            receiver.write_canonical(&mut out);
            out.push('.');
        }
        out.push_str(&self.name);
        out.push('(');
        for (i, param) in self.params.iter().enumerate() {
            if i > 0 {
                out.push(',');
            }
            param.write_canonical(&mut out);
        }
        out.push(')');
        out
    }
}

/// Which part of a declaration an identifier points at
///
/// Generic and value parameters stay addressable without a separate
/// identifier namespace: their identifiers are the owning
/// declaration's identifier re-pointed at the parameter index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub enum IdTarget {
    /// The declaration itself
    #[default]
    Declaration,
    /// The n-th generic type parameter
    GenericParameter(usize),
    /// The n-th value parameter
    ValueParameter(usize),
}

/// Stable structural identifier of one logical declaration
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct DeclId {
    /// Ordered names of the enclosing scopes, outermost first
    pub container: Vec<String>,
    /// Simple declaration name, absent for pure-container identifiers
    pub name: Option<String>,
    /// Callable signature, present for functions and constructors
    pub callable: Option<CallableRef>,
    /// Sub-part of the declaration this identifier points at
    pub target: IdTarget,
}

impl DeclId {
    /// Identifier for a named declaration inside a scope path
    #[must_use]
    pub fn new(container: Vec<String>, name: impl Into<String>) -> Self {
        Self {
            container,
            name: Some(name.into()),
            callable: None,
            target: IdTarget::Declaration,
        }
    }

    /// Identifier for a module root
    #[must_use]
    pub fn for_module(name: impl Into<String>) -> Self {
        Self {
            container: Vec::new(),
            name: Some(name.into()),
            callable: None,
            target: IdTarget::Declaration,
        }
    }

    /// Identifier for a package: the package path is the container
    #[must_use]
    pub fn for_package(path: impl Into<String>) -> Self {
        let path = path.into();
        let container = if path.is_empty() {
            Vec::new()
        } else {
            path.split('.').map(str::to_string).collect()
        };
        Self {
            container,
            name: None,
            callable: None,
            target: IdTarget::Declaration,
        }
    }

    /// Copy with a callable signature attached
    #[must_use]
    pub fn with_callable(mut self, callable: CallableRef) -> Self {
        self.callable = Some(callable);
        self
    }

    /// Copy pointing at a sub-part of the same declaration
    #[must_use]
    pub fn with_target(mut self, target: IdTarget) -> Self {
        self.target = target;
        self
    }

    /// Identifier of a declaration named `name` inside this one's scope
    ///
    /// The current name (if any) becomes the last container segment.
    #[must_use]
    pub fn child(&self, name: impl Into<String>) -> Self {
        let mut container = self.container.clone();
        if let Some(own) = &self.name {
            container.push(own.clone());
        }
        Self {
            container,
            name: Some(name.into()),
            callable: None,
            target: IdTarget::Declaration,
        }
    }

    /// The enclosing-scope identifier, with name and callable stripped
    ///
    /// This is the form recorded as the "inherited from" origin of
    /// carried-over members.
    #[must_use]
    pub fn parent(&self) -> Self {
        Self {
            container: self.container.clone(),
            name: self.name.clone(),
            callable: None,
            target: IdTarget::Declaration,
        }
    }

    /// The package part of the container path, if any
    #[must_use]
    pub fn package_name(&self) -> Option<&str> {
        self.container.first().map(String::as_str)
    }

    /// Number of value parameters in the callable part
    #[must_use]
    pub fn param_count(&self) -> usize {
        self.callable.as_ref().map_or(0, |c| c.params.len())
    }
}

impl fmt::Display for DeclId {
    /// Canonical string form: container joined by `.`, then `/` and
    /// the callable signature when one is present
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for segment in &self.container {
            if !first {
                write!(f, ".")?;
            }
            write!(f, "{segment}")?;
            first = false;
        }
        if let Some(name) = &self.name {
            if !first {
                write!(f, ".")?;
            }
            write!(f, "{name}")?;
        }
        if let Some(callable) = &self.callable {
            write!(f, "/{}", callable.signature())?;
        }
        match self.target {
            IdTarget::Declaration => Ok(()),
            IdTarget::GenericParameter(index) => write!(f, "#generic:{index}"),
            IdTarget::ValueParameter(index) => write!(f, "#param:{index}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn widget_bar() -> DeclId {
        DeclId::new(vec!["demo".into(), "Widget".into()], "bar").with_callable(CallableRef::new(
            "bar",
            vec![TypeRef::named("kotlin.Int")],
            None,
        ))
    }

    #[test]
    fn test_identical_inputs_yield_equal_ids() {
        assert_eq!(widget_bar(), widget_bar());

        let other = DeclId::new(vec!["demo".into(), "Widget".into()], "bar").with_callable(
            CallableRef::new("bar", vec![TypeRef::named("kotlin.String")], None),
        );
        assert_ne!(widget_bar(), other);
    }

    #[test]
    fn test_canonical_string_form() {
        assert_eq!(widget_bar().to_string(), "demo.Widget.bar/bar(kotlin.Int)");

        let plain = DeclId::new(vec!["demo".into()], "Widget");
        assert_eq!(plain.to_string(), "demo.Widget");

        let package = DeclId::for_package("demo.util");
        assert_eq!(package.to_string(), "demo.util");
    }

    #[test]
    fn test_receiver_in_signature() {
        let ext = DeclId::new(vec!["demo".into()], "pretty").with_callable(CallableRef::new(
            "pretty",
            vec![],
            Some(TypeRef::named("demo.Widget")),
        ));
        assert_eq!(ext.to_string(), "demo.pretty/demo.Widget.pretty()");
    }

    #[test]
    fn test_with_target_addresses_parameters() {
        let id = widget_bar();
        let generic = id.clone().with_target(IdTarget::GenericParameter(0));
        let value = id.clone().with_target(IdTarget::ValueParameter(1));

        assert_ne!(id, generic);
        assert_ne!(generic, value);
        assert!(generic.to_string().ends_with("#generic:0"));
        assert!(value.to_string().ends_with("#param:1"));
    }

    #[test]
    fn test_parent_strips_callable() {
        let parent = widget_bar().parent();
        assert_eq!(parent.to_string(), "demo.Widget.bar");
        assert!(parent.callable.is_none());
    }

    #[test]
    fn test_child_descends_one_scope() {
        let class = DeclId::new(vec!["demo".into()], "Widget");
        let nested = class.child("Handle");
        assert_eq!(nested.to_string(), "demo.Widget.Handle");
    }

    #[test]
    fn test_recursive_bound_is_not_cyclic() {
        // T : Comparable<Box<T>> — the inner T is a depth marker
        let bound = TypeRef::Named {
            path: "kotlin.Comparable".into(),
            args: vec![TypeRef::Named {
                path: "demo.Box".into(),
                args: vec![TypeRef::Recursive(1)],
            }],
        };
        let param = TypeRef::TypeParam {
            bounds: vec![bound],
        };
        assert_eq!(param.canonical(), "[kotlin.Comparable<demo.Box<^1>>]");
    }

    #[test]
    fn test_serde_round_trip() {
        let id = widget_bar().with_target(IdTarget::ValueParameter(0));
        let json = serde_json::to_string(&id).unwrap();
        let back: DeclId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, back);
    }
}

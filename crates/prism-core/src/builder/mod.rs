//! Per-variant declaration-tree construction
//!
//! For one platform variant, [`TreeBuilder`] turns provider facts into
//! a module-rooted [`DeclarationNode`] tree. Building is a pure
//! transformation: the active variant is an explicit field, never
//! ambient state, and separate variants never share mutable state —
//! which is what lets [`build_forests`] fan variants out across a
//! rayon pool.
//!
//! The one subtle rule lives in identifier resolution: a declaration
//! authored in its scope owns its identifier, while an inherited,
//! synthetic, or delegated member walks its carried-over chain to the
//! root authored declaration and reuses the root's identifier, so the
//! same logical member keeps one identity everywhere it surfaces.

use rayon::prelude::*;

use crate::error::{CoreError, StructuralError};
use crate::ident::{CallableRef, DeclId, IdTarget, TypeRef};
use crate::model::{
    DeclKind, DeclarationNode, DocBlock, Extra, InheritedFrom, KindDetail, ObviousMember,
    TypeParamNode,
};
use crate::platform::{Variant, VariantId};
use crate::provider::{DeclOrigin, DeclarationFact, DeclarationProvider, PackageFact};

/// The result of building one variant's declaration tree
#[derive(Debug, Clone)]
pub struct VariantForest {
    /// The variant the forest was built for
    pub variant: Variant,
    /// Module-rooted declaration tree
    pub module: DeclarationNode,
    /// Declarations that had to be skipped, with why
    pub diagnostics: Vec<StructuralError>,
}

/// Builds one platform variant's declaration tree from provider facts
#[derive(Debug, Clone)]
pub struct TreeBuilder {
    module_name: String,
}

impl TreeBuilder {
    /// Create a builder for the named module
    #[must_use]
    pub fn new(module_name: impl Into<String>) -> Self {
        Self {
            module_name: module_name.into(),
        }
    }

    /// Build the variant's forest
    ///
    /// Fails only when the provider cannot supply its packages;
    /// individual unaddressable declarations are logged, recorded in
    /// the outcome diagnostics, and skipped.
    pub fn build(&self, provider: &dyn DeclarationProvider) -> Result<VariantForest, CoreError> {
        let variant = provider.variant().clone();
        let packages = provider.packages().map_err(|e| CoreError::Provider {
            variant: variant.id.clone(),
            reason: e.to_string(),
        })?;

        let mut diagnostics = Vec::new();
        let mut module = DeclarationNode::new(
            DeclId::for_module(&self.module_name),
            &self.module_name,
            DeclKind::Module,
        );
        module
            .documentation
            .insert(variant.id.clone(), DocBlock::default());
        module.variants.insert(variant.id.clone());

        for package in &packages {
            module
                .children
                .push(self.build_package(&variant.id, package, &mut diagnostics));
        }

        Ok(VariantForest {
            variant,
            module,
            diagnostics,
        })
    }

    fn build_package(
        &self,
        variant: &VariantId,
        package: &PackageFact,
        diagnostics: &mut Vec<StructuralError>,
    ) -> DeclarationNode {
        let id = DeclId::for_package(&package.name);
        let display = if package.name.is_empty() {
            "[root]".to_string()
        } else {
            package.name.clone()
        };
        let mut node = DeclarationNode::new(id.clone(), display, DeclKind::Package);

        let doc = package
            .doc_text
            .as_deref()
            .map(|text| DocBlock::parse(text, package.doc_language))
            .unwrap_or_default();
        node.documentation.insert(variant.clone(), doc);
        node.variants.insert(variant.clone());

        let scope_path = id.container.clone();
        for member in &package.members {
            match self.build_declaration(variant, &scope_path, member, diagnostics) {
                Ok(child) => node.children.push(child),
                Err(err) => {
                    tracing::error!(target: "prism::builder", %err, "skipping declaration");
                    diagnostics.push(err);
                }
            }
        }

        node
    }

    /// Build one declaration and its subtree
    fn build_declaration(
        &self,
        variant: &VariantId,
        scope_path: &[String],
        fact: &DeclarationFact,
        diagnostics: &mut Vec<StructuralError>,
    ) -> Result<DeclarationNode, StructuralError> {
        if fact.is_local || fact.name.is_empty() {
            let mut err = StructuralError::new(
                "declaration local to a function body has no stable container",
                variant.clone(),
                scope_id(scope_path).to_string(),
            );
            if let Some(location) = &fact.location {
                err = err.with_location(location.clone());
            }
            return Err(err);
        }

        let (id, inherited_from) = resolve_identity(scope_path, fact);

        let mut node = DeclarationNode::new(id.clone(), &fact.name, fact.kind);
        let doc = fact
            .doc_text
            .as_deref()
            .map(|text| DocBlock::parse(text, fact.doc_language))
            .unwrap_or_default();
        node.documentation.insert(variant.clone(), doc);
        node.visibility.insert(variant.clone(), fact.visibility);
        node.modality.insert(variant.clone(), fact.modality);
        if !fact.annotations.is_empty() {
            node.annotations
                .insert(variant.clone(), fact.annotations.clone());
        }
        node.variants.insert(variant.clone());
        if fact.is_expected {
            node.expect_present_in = Some(variant.clone());
        }

        let mut extra = Extra::new();
        if let Some(origin) = inherited_from {
            extra.insert(InheritedFrom(origin));
        }
        if fact.is_obvious {
            extra.insert(ObviousMember);
        }
        node.extra = extra;

        node.type_params = build_type_params(variant, &id, fact);
        node.detail = kind_detail(variant, fact);
        node.children = self.build_children(variant, &id, fact, diagnostics);

        Ok(node)
    }

    /// Build parameter and member children of a declaration
    fn build_children(
        &self,
        variant: &VariantId,
        id: &DeclId,
        fact: &DeclarationFact,
        diagnostics: &mut Vec<StructuralError>,
    ) -> Vec<DeclarationNode> {
        let mut children = Vec::new();

        for (index, parameter) in fact.parameters.iter().enumerate() {
            let param_id = id.clone().with_target(IdTarget::ValueParameter(index));
            let mut node = DeclarationNode::new(param_id, &parameter.name, DeclKind::Parameter);
            let doc = parameter
                .doc_text
                .as_deref()
                .map(|text| DocBlock::parse(text, fact.doc_language))
                .unwrap_or_default();
            node.documentation.insert(variant.clone(), doc);
            node.variants.insert(variant.clone());
            node.detail = Some(KindDetail::Parameter {
                type_ref: parameter.type_ref.clone(),
            });
            children.push(node);
        }

        // Nested members recurse one scope deeper; a failed member is
        // skipped without poisoning its siblings
        let nested_scope = nested_scope_path(id);
        for member in &fact.members {
            match self.build_declaration(variant, &nested_scope, member, diagnostics) {
                Ok(child) => children.push(child),
                Err(err) => {
                    tracing::error!(target: "prism::builder", %err, "skipping member");
                    diagnostics.push(err);
                }
            }
        }

        children
    }
}

/// Build all variants' forests in parallel
///
/// One worker per provider; fails if any variant's forest could not be
/// built at all.
pub fn build_forests<P>(module_name: &str, providers: &[P]) -> Result<Vec<VariantForest>, CoreError>
where
    P: DeclarationProvider + Sync,
{
    let builder = TreeBuilder::new(module_name);
    providers
        .par_iter()
        .map(|provider| builder.build(provider))
        .collect()
}

/// Resolve which identifier a fact is addressed by
///
/// Authored facts own their identifier. Carried-over facts use the
/// root authored declaration's identifier and report where the member
/// came from whenever the root lives in a different scope.
fn resolve_identity(scope_path: &[String], fact: &DeclarationFact) -> (DeclId, Option<DeclId>) {
    if fact.origin == DeclOrigin::Source {
        return (declaration_id(scope_path, fact), None);
    }

    let mut root = fact;
    while let Some(next) = root.overridden_by.first() {
        root = next;
    }
    let root_scope: Vec<String> = root
        .declared_in
        .clone()
        .unwrap_or_else(|| scope_path.to_vec());
    let id = declaration_id(&root_scope, root);

    let inherited_from = if root_scope == scope_path {
        None
    } else {
        // The immediate parent in the chain, with the callable
        // signature stripped down to its scope path
        let immediate = fact.overridden_by.first().unwrap_or(root);
        let parent_scope = immediate
            .declared_in
            .clone()
            .unwrap_or_else(|| root_scope.clone());
        Some(scope_id(&parent_scope))
    };

    (id, inherited_from)
}

/// Identifier of a fact declared directly in `scope_path`
fn declaration_id(scope_path: &[String], fact: &DeclarationFact) -> DeclId {
    let id = DeclId::new(scope_path.to_vec(), &fact.name);
    if matches!(fact.kind, DeclKind::Function) || fact.is_constructor {
        let params = fact
            .parameters
            .iter()
            .map(|p| p.type_ref.clone())
            .collect::<Vec<TypeRef>>();
        id.with_callable(CallableRef::new(&fact.name, params, fact.receiver.clone()))
    } else {
        id
    }
}

/// Scope path of declarations nested inside the identified declaration
fn nested_scope_path(id: &DeclId) -> Vec<String> {
    let mut path = id.container.clone();
    if let Some(name) = &id.name {
        path.push(name.clone());
    }
    path
}

/// Identifier addressing a scope path itself
fn scope_id(scope_path: &[String]) -> DeclId {
    match scope_path.split_last() {
        Some((name, container)) => DeclId::new(container.to_vec(), name.clone()),
        None => DeclId::default(),
    }
}

fn build_type_params(variant: &VariantId, id: &DeclId, fact: &DeclarationFact) -> Vec<TypeParamNode> {
    fact.type_params
        .iter()
        .enumerate()
        .map(|(index, param)| {
            let mut documentation = std::collections::BTreeMap::new();
            if let Some(text) = &param.doc_text {
                documentation.insert(variant.clone(), DocBlock::parse(text, fact.doc_language));
            }
            TypeParamNode {
                id: id.clone().with_target(IdTarget::GenericParameter(index)),
                name: param.name.clone(),
                bounds: param.bounds.clone(),
                documentation,
            }
        })
        .collect()
}

fn kind_detail(variant: &VariantId, fact: &DeclarationFact) -> Option<KindDetail> {
    match fact.kind {
        DeclKind::Function => Some(KindDetail::Function {
            return_type: fact.return_type.clone(),
            receiver: fact.receiver.clone(),
            is_constructor: fact.is_constructor,
        }),
        DeclKind::Property => fact.return_type.clone().map(|type_ref| KindDetail::Property {
            type_ref,
        }),
        DeclKind::TypeAlias => fact.underlying_type.clone().map(|underlying| {
            let mut map = std::collections::BTreeMap::new();
            map.insert(variant.clone(), underlying);
            KindDetail::TypeAlias { underlying: map }
        }),
        _ => None,
    }
}

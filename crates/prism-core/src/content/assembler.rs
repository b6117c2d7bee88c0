//! Page assembly from the merged declaration tree
//!
//! One page per page-worthy declaration: the module, each package,
//! each class-like, and each member name group. Page construction for
//! independent packages fans out across a rayon pool; pages share no
//! mutable state and cross-page links go through the [`PageIndex`]
//! built once at the end.

use std::cmp::Ordering;
use std::collections::BTreeSet;

use rayon::prelude::*;

use crate::ident::{DeclId, TypeRef};
use crate::merge::{MergeMode, MergeOutcome};
use crate::model::{
    ClashResolution, DeclKind, DeclarationNode, DocSegment, KindDetail, Modality, ObviousMember,
    Visibility,
};
use crate::platform::VariantId;

use super::brief::brief_segment;
use super::{
    ContentKind, ContentNode, ContentStyle, DivergentGroup, DivergentInstance, PageIndex,
    PageKind, PageNode,
};

/// The assembled page tree plus its link index
#[derive(Debug, Clone)]
pub struct AssembledDocs {
    /// Root page of the module
    pub root: PageNode,
    /// Identifier-to-page index for link resolution
    pub index: PageIndex,
}

/// Builds the content tree from a merge outcome
#[derive(Debug, Clone, Copy, Default)]
pub struct Assembler;

/// Restricts page content to one variant in separate-page mode;
/// `None` covers every variant of the node
type Scope<'a> = Option<&'a VariantId>;

impl Assembler {
    /// Create an assembler
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Assemble pages for a merged module
    #[must_use]
    pub fn assemble(&self, outcome: &MergeOutcome) -> AssembledDocs {
        let module = &outcome.module;
        let mode = outcome.mode;

        let packages: Vec<&DeclarationNode> = module
            .children_of_kind(DeclKind::Package)
            .collect();

        // Package pages are independent of each other
        let children: Vec<PageNode> = packages
            .par_iter()
            .flat_map_iter(|package| self.pages_for(*package, mode))
            .collect();

        let platforms = module.variants.clone();
        let mut content = ContentNode::new(ContentKind::Group, platforms.clone())
            .with_child(ContentNode::header(1, &module.name, platforms.clone()))
            .with_child(platform_tags(&platforms));
        if let Some(table) = package_table(&packages) {
            content = content.with_child(table);
        }

        let root = PageNode {
            name: module.name.clone(),
            kind: PageKind::Module,
            ids: vec![module.id.clone()],
            platforms,
            content,
            children,
        };
        let index = PageIndex::build(&root);

        AssembledDocs { root, index }
    }

    /// Pages for one page-worthy declaration: one page in implicit
    /// mode, one per variant in separate mode
    fn pages_for(&self, node: &DeclarationNode, mode: MergeMode) -> Vec<PageNode> {
        match mode {
            MergeMode::Implicit => vec![self.declaration_page(node, None, mode)],
            MergeMode::Separate => node
                .variants
                .iter()
                .map(|variant| self.declaration_page(node, Some(variant), mode))
                .collect(),
        }
    }

    fn declaration_page(&self, node: &DeclarationNode, scope: Scope, mode: MergeMode) -> PageNode {
        match node.kind {
            DeclKind::Package => self.package_page(node, scope, mode),
            kind if kind.is_classlike() => self.classlike_page(node, scope, mode),
            _ => self.member_page(std::slice::from_ref(&node), scope),
        }
    }

    fn package_page(&self, node: &DeclarationNode, scope: Scope, mode: MergeMode) -> PageNode {
        let platforms = scoped_platforms(node, scope);
        let display = scoped_display(node, scope);
        let mut content = ContentNode::new(ContentKind::Group, platforms.clone())
            .with_child(ContentNode::header(1, display, platforms.clone()))
            .with_child(platform_tags(&platforms));
        content = content.with_children(description_sections(node, scope));

        let types: Vec<&DeclarationNode> = node
            .children
            .iter()
            .filter(|c| c.kind.is_classlike() || c.kind == DeclKind::TypeAlias)
            .collect();
        let functions: Vec<&DeclarationNode> =
            node.children_of_kind(DeclKind::Function).collect();
        let properties: Vec<&DeclarationNode> =
            node.children_of_kind(DeclKind::Property).collect();

        for table in [
            member_table("Types", &types, scope),
            member_table("Functions", &functions, scope),
            member_table("Properties", &properties, scope),
        ]
        .into_iter()
        .flatten()
        {
            content = content.with_child(table);
        }

        let children = self.member_area_pages(node, scope, mode);

        PageNode {
            name: display.to_string(),
            kind: PageKind::Package,
            ids: vec![node.id.clone()],
            platforms,
            content,
            children,
        }
    }

    fn classlike_page(&self, node: &DeclarationNode, scope: Scope, mode: MergeMode) -> PageNode {
        let platforms = scoped_platforms(node, scope);
        let display = scoped_display(node, scope);
        let mut content = ContentNode::new(ContentKind::Group, platforms.clone())
            .with_child(ContentNode::header(1, display, platforms.clone()))
            .with_child(platform_tags(&platforms))
            .with_child(signature_block(node, scope));
        content = content.with_children(description_sections(node, scope));

        let constructors: Vec<&DeclarationNode> = node
            .children_of_kind(DeclKind::Function)
            .filter(|c| is_constructor(c))
            .collect();
        let entries: Vec<&DeclarationNode> =
            node.children_of_kind(DeclKind::EnumEntry).collect();
        let types: Vec<&DeclarationNode> = node
            .children
            .iter()
            .filter(|c| c.kind.is_classlike() || c.kind == DeclKind::TypeAlias)
            .collect();
        let functions: Vec<&DeclarationNode> = node
            .children_of_kind(DeclKind::Function)
            .filter(|c| !is_constructor(c))
            .collect();
        let properties: Vec<&DeclarationNode> =
            node.children_of_kind(DeclKind::Property).collect();

        for table in [
            member_table("Constructors", &constructors, scope),
            member_table("Entries", &entries, scope),
            member_table("Types", &types, scope),
            member_table("Functions", &functions, scope),
            member_table("Properties", &properties, scope),
        ]
        .into_iter()
        .flatten()
        {
            content = content.with_child(table);
        }

        let children = self.member_area_pages(node, scope, mode);

        PageNode {
            name: display.to_string(),
            kind: PageKind::Classlike,
            ids: vec![node.id.clone()],
            platforms,
            content,
            children,
        }
    }

    /// Sub-pages of a package or class-like: nested class-likes plus
    /// one member page per function/property name group
    fn member_area_pages(
        &self,
        node: &DeclarationNode,
        scope: Scope,
        mode: MergeMode,
    ) -> Vec<PageNode> {
        let mut pages = Vec::new();

        for child in &node.children {
            if !in_scope(child, scope) {
                continue;
            }
            if child.kind.is_classlike() {
                match scope {
                    Some(_) => pages.push(self.declaration_page(child, scope, mode)),
                    None => pages.extend(self.pages_for(child, mode)),
                }
            }
        }

        for kind in [DeclKind::Function, DeclKind::Property] {
            let members: Vec<&DeclarationNode> = node
                .children_of_kind(kind)
                .filter(|c| in_scope(c, scope) && !is_constructor(c))
                .collect();
            for group in name_groups(&members) {
                pages.push(self.member_page(&group, scope));
            }
        }

        pages
    }

    /// Page for one member name group
    ///
    /// Functions legitimately share a page between overloads. A
    /// property group resolving to more than one identifier violates
    /// an internal expectation; the page proceeds with the first
    /// identifier rather than failing the build.
    fn member_page(&self, group: &[&DeclarationNode], scope: Scope) -> PageNode {
        let first = group[0];
        let mut members: Vec<&DeclarationNode> = group.to_vec();
        members.sort_by(|a, b| divergent_order(a, b));

        if first.kind == DeclKind::Property && members.len() > 1 {
            tracing::error!(
                target: "prism::content",
                id = %first.id,
                count = members.len(),
                "property page group resolved to more than one identifier; using the first"
            );
            members.truncate(1);
        }

        let mut platforms = BTreeSet::new();
        for member in &members {
            platforms.extend(scoped_platforms(member, scope));
        }

        let mut content = ContentNode::new(ContentKind::Group, platforms.clone())
            .with_child(ContentNode::header(1, first.name.clone(), platforms.clone()))
            .with_child(platform_tags(&platforms));
        for member in &members {
            let section = ContentNode::new(ContentKind::Group, scoped_platforms(member, scope))
                .with_child(signature_block(member, scope))
                .with_children(description_sections(member, scope));
            content = content.with_child(section);
        }

        PageNode {
            name: first.name.clone(),
            kind: PageKind::Member,
            ids: members.iter().map(|m| m.id.clone()).collect(),
            platforms,
            content,
            children: Vec::new(),
        }
    }
}

/// Whether a node is visible under the given scope restriction
fn in_scope(node: &DeclarationNode, scope: Scope) -> bool {
    scope.map_or(true, |variant| node.variants.contains(variant))
}

/// Display name under a scope restriction
///
/// Clash markers apply per page: on a single-variant page the marker
/// is only shown when a clashing sibling actually exists in that
/// variant.
fn scoped_display<'a>(node: &'a DeclarationNode, scope: Scope) -> &'a str {
    match (node.extra.get::<ClashResolution>(), scope) {
        (Some(resolution), Some(variant)) if !resolution.clashing_with.contains(variant) => {
            node.name.as_str()
        }
        (Some(resolution), _) => resolution.display_name.as_str(),
        (None, _) => node.name.as_str(),
    }
}

/// The node's platform set, restricted to the scope
fn scoped_platforms(node: &DeclarationNode, scope: Scope) -> BTreeSet<VariantId> {
    match scope {
        Some(variant) if node.variants.contains(variant) => {
            std::iter::once(variant.clone()).collect()
        }
        Some(_) => BTreeSet::new(),
        None => node.variants.clone(),
    }
}

fn is_constructor(node: &DeclarationNode) -> bool {
    matches!(
        node.detail,
        Some(KindDetail::Function {
            is_constructor: true,
            ..
        })
    )
}

/// Group members by simple name, preserving first-seen order
fn name_groups<'a>(members: &[&'a DeclarationNode]) -> Vec<Vec<&'a DeclarationNode>> {
    let mut order: Vec<&str> = Vec::new();
    let mut groups: Vec<Vec<&'a DeclarationNode>> = Vec::new();
    for member in members {
        match order.iter().position(|name| *name == member.name) {
            Some(index) => groups[index].push(member),
            None => {
                order.push(&member.name);
                groups.push(vec![member]);
            }
        }
    }
    groups
}

/// Deterministic ordering for otherwise identical-looking entries
///
/// Package name first (missing packages last), then the nested
/// container path (top-level entries first), then parameter count,
/// then the canonical signature string.
pub(crate) fn divergent_order(a: &DeclarationNode, b: &DeclarationNode) -> Ordering {
    let package = match (a.id.package_name(), b.id.package_name()) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(x), Some(y)) => x.cmp(y),
    };
    package
        .then_with(|| nested_path(&a.id).cmp(nested_path(&b.id)))
        .then_with(|| a.id.param_count().cmp(&b.id.param_count()))
        .then_with(|| a.signature_string().cmp(&b.signature_string()))
}

/// Container path below the package segment; empty for top-level
/// entries, which therefore sort first
fn nested_path(id: &DeclId) -> &[String] {
    if id.container.is_empty() {
        &[]
    } else {
        &id.container[1..]
    }
}

/// Platform tag strip shown on page covers
fn platform_tags(platforms: &BTreeSet<VariantId>) -> ContentNode {
    let children = platforms.iter().map(|variant| {
        ContentNode::text(variant.to_string(), std::iter::once(variant.clone()).collect())
    });
    ContentNode::new(ContentKind::PlatformTags, platforms.clone()).with_children(children)
}

/// Signature block, divergent when variants render differently
fn signature_block(node: &DeclarationNode, scope: Scope) -> ContentNode {
    let groups = group_variants_by(node, scope, |variant| {
        Some(render_signature(node, variant))
    });
    divergent_section(node, scope, groups, |signature, platforms| {
        ContentNode::new(ContentKind::Signature, platforms.clone()).with_child(
            ContentNode::new(ContentKind::CodeBlock(signature.clone()), platforms)
                .with_style(ContentStyle::Monospace),
        )
    })
}

/// Description sections in page order: deprecation, description,
/// parameters, see-also, throws
fn description_sections(node: &DeclarationNode, scope: Scope) -> Vec<ContentNode> {
    let mut sections = Vec::new();

    let deprecations = group_variants_by(node, scope, |variant| {
        node.documentation
            .get(variant)
            .and_then(|doc| doc.deprecation.clone())
    });
    if let Some(section) = divergent_section_opt(node, scope, deprecations, |message, platforms| {
        ContentNode::new(ContentKind::Deprecation, platforms.clone()).with_child(
            ContentNode::text(message.clone(), platforms).with_style(ContentStyle::Strikethrough),
        )
    }) {
        sections.push(section);
    }

    let descriptions = group_variants_by(node, scope, |variant| {
        node.documentation.get(variant).and_then(|doc| {
            if doc.description.is_empty() {
                None
            } else {
                Some(doc.description.clone())
            }
        })
    });
    if let Some(section) = divergent_section_opt(node, scope, descriptions, |segments, platforms| {
        let children = segments.iter().map(|segment| match segment {
            DocSegment::Text(text) => ContentNode::text(text.clone(), platforms.clone()),
            DocSegment::Code(code) => {
                ContentNode::new(ContentKind::CodeBlock(code.clone()), platforms.clone())
                    .with_style(ContentStyle::Monospace)
            }
        });
        ContentNode::new(ContentKind::Description, platforms.clone()).with_children(children)
    }) {
        sections.push(section);
    }

    let params = group_variants_by(node, scope, |variant| {
        node.documentation.get(variant).and_then(|doc| {
            if doc.params.is_empty() {
                None
            } else {
                Some(doc.params.clone())
            }
        })
    });
    if let Some(section) = divergent_section_opt(node, scope, params, |params, platforms| {
        let rows = params.iter().map(|(name, doc)| {
            ContentNode::new(ContentKind::Row, platforms.clone())
                .with_child(
                    ContentNode::text(name.clone(), platforms.clone())
                        .with_style(ContentStyle::Strong),
                )
                .with_child(ContentNode::text(doc.clone(), platforms.clone()))
        });
        ContentNode::new(ContentKind::Parameters, platforms.clone()).with_children(rows)
    }) {
        sections.push(section);
    }

    let see_also = group_variants_by(node, scope, |variant| {
        node.documentation.get(variant).and_then(|doc| {
            if doc.see_also.is_empty() {
                None
            } else {
                Some(doc.see_also.clone())
            }
        })
    });
    if let Some(section) = divergent_section_opt(node, scope, see_also, |entries, platforms| {
        let children = entries
            .iter()
            .map(|entry| ContentNode::text(entry.clone(), platforms.clone()));
        ContentNode::new(ContentKind::SeeAlso, platforms.clone()).with_children(children)
    }) {
        sections.push(section);
    }

    let throws = group_variants_by(node, scope, |variant| {
        node.documentation.get(variant).and_then(|doc| {
            if doc.throws.is_empty() {
                None
            } else {
                Some(doc.throws.clone())
            }
        })
    });
    if let Some(section) = divergent_section_opt(node, scope, throws, |entries, platforms| {
        let children = entries
            .iter()
            .map(|entry| ContentNode::text(entry.clone(), platforms.clone()));
        ContentNode::new(ContentKind::Throws, platforms.clone()).with_children(children)
    }) {
        sections.push(section);
    }

    sections
}

/// Group the node's in-scope variants by an extracted value
///
/// Variants where the extractor returns `None` contribute nothing.
/// Groups keep the order in which their value was first seen, which
/// follows the ordered variant set.
fn group_variants_by<T, F>(
    node: &DeclarationNode,
    scope: Scope,
    extract: F,
) -> Vec<(T, BTreeSet<VariantId>)>
where
    T: PartialEq,
    F: Fn(&VariantId) -> Option<T>,
{
    let mut groups: Vec<(T, BTreeSet<VariantId>)> = Vec::new();
    for variant in &node.variants {
        if let Some(restricted) = scope {
            if restricted != variant {
                continue;
            }
        }
        let Some(value) = extract(variant) else {
            continue;
        };
        match groups.iter_mut().find(|(existing, _)| *existing == value) {
            Some((_, platforms)) => {
                platforms.insert(variant.clone());
            }
            None => {
                let mut platforms = BTreeSet::new();
                platforms.insert(variant.clone());
                groups.push((value, platforms));
            }
        }
    }
    groups
}

/// Render one value group per platform set, folding multiple groups
/// into a divergent node; a missing value yields an empty group node
fn divergent_section<T>(
    node: &DeclarationNode,
    scope: Scope,
    groups: Vec<(T, BTreeSet<VariantId>)>,
    render: impl Fn(&T, BTreeSet<VariantId>) -> ContentNode,
) -> ContentNode {
    divergent_section_opt(node, scope, groups, render)
        .unwrap_or_else(|| ContentNode::new(ContentKind::Group, scoped_platforms(node, scope)))
}

fn divergent_section_opt<T>(
    node: &DeclarationNode,
    scope: Scope,
    mut groups: Vec<(T, BTreeSet<VariantId>)>,
    render: impl Fn(&T, BTreeSet<VariantId>) -> ContentNode,
) -> Option<ContentNode> {
    match groups.len() {
        0 => None,
        1 => {
            let (value, platforms) = groups.remove(0);
            Some(render(&value, platforms))
        }
        _ => {
            let instances = groups
                .iter()
                .map(|(value, platforms)| DivergentInstance {
                    platforms: platforms.clone(),
                    before: None,
                    divergent: Box::new(render(value, platforms.clone())),
                    after: None,
                })
                .collect();
            Some(ContentNode::new(
                ContentKind::Divergent(DivergentGroup { instances }),
                scoped_platforms(node, scope),
            ))
        }
    }
}

/// Table of packages on the module page
fn package_table(packages: &[&DeclarationNode]) -> Option<ContentNode> {
    if packages.is_empty() {
        return None;
    }
    let mut platforms = BTreeSet::new();
    for package in packages {
        platforms.extend(package.variants.iter().cloned());
    }
    let rows = packages.iter().map(|package| {
        ContentNode::new(ContentKind::Row, package.variants.clone())
            .with_child(ContentNode::link(
                package.display_name(),
                package.id.clone(),
                package.variants.clone(),
            ))
            .with_children(brief_node(package, None))
    });
    Some(
        ContentNode::new(
            ContentKind::Table {
                caption: Some("Packages".into()),
            },
            platforms,
        )
        .with_children(rows),
    )
}

/// Member table with one row per name group
///
/// Obvious boilerplate members are suppressed. Within a row, members
/// are sorted by [`divergent_order`] so structurally identical entries
/// from unrelated origins render in a stable order.
fn member_table(
    caption: &str,
    members: &[&DeclarationNode],
    scope: Scope,
) -> Option<ContentNode> {
    let visible: Vec<&DeclarationNode> = members
        .iter()
        .copied()
        .filter(|m| in_scope(m, scope) && !m.extra.contains::<ObviousMember>())
        .collect();
    if visible.is_empty() {
        return None;
    }

    let mut platforms = BTreeSet::new();
    for member in &visible {
        platforms.extend(scoped_platforms(member, scope));
    }

    let rows = name_groups(&visible).into_iter().map(|mut group| {
        group.sort_by(|a, b| divergent_order(a, b));
        let mut row_platforms = BTreeSet::new();
        for member in &group {
            row_platforms.extend(scoped_platforms(member, scope));
        }
        let cells = group.into_iter().map(|member| {
            ContentNode::new(ContentKind::Group, scoped_platforms(member, scope))
                .with_child(ContentNode::link(
                    scoped_display(member, scope),
                    member.id.clone(),
                    scoped_platforms(member, scope),
                ))
                .with_children(brief_node(member, scope))
        });
        ContentNode::new(ContentKind::Row, row_platforms).with_children(cells)
    });

    Some(
        ContentNode::new(
            ContentKind::Table {
                caption: Some(caption.to_string()),
            },
            platforms,
        )
        .with_children(rows),
    )
}

/// Brief shown in table rows: the first in-scope variant that has one
fn brief_node(node: &DeclarationNode, scope: Scope) -> Option<ContentNode> {
    let platforms = scoped_platforms(node, scope);
    node.variants
        .iter()
        .filter(|variant| scope.map_or(true, |restricted| restricted == *variant))
        .find_map(|variant| {
            let doc = node.documentation.get(variant)?;
            brief_segment(doc)
        })
        .map(|segment| {
            let child = match segment {
                DocSegment::Text(text) => ContentNode::text(text, platforms.clone()),
                DocSegment::Code(code) => {
                    ContentNode::new(ContentKind::CodeBlock(code), platforms.clone())
                        .with_style(ContentStyle::Monospace)
                }
            };
            ContentNode::new(ContentKind::Brief, platforms).with_child(child)
        })
}

/// Render one variant's declaration signature
fn render_signature(node: &DeclarationNode, variant: &VariantId) -> String {
    let mut out = String::new();

    if let Some(visibility) = node.visibility.get(variant) {
        match visibility {
            Visibility::Public => {}
            Visibility::Protected => out.push_str("protected "),
            Visibility::Internal => out.push_str("internal "),
            Visibility::Private => out.push_str("private "),
        }
    }
    if let Some(modality) = node.modality.get(variant) {
        match modality {
            Modality::Final => {}
            Modality::Open => out.push_str("open "),
            Modality::Abstract => out.push_str("abstract "),
            Modality::Sealed => out.push_str("sealed "),
        }
    }

    let keyword = match node.kind {
        DeclKind::Class => "class",
        DeclKind::Interface => "interface",
        DeclKind::Object => "object",
        DeclKind::Enum => "enum class",
        DeclKind::Annotation => "annotation class",
        DeclKind::Function => "fun",
        DeclKind::Property => "val",
        DeclKind::TypeAlias => "typealias",
        _ => "",
    };
    if !keyword.is_empty() {
        out.push_str(keyword);
        out.push(' ');
    }

    if !node.type_params.is_empty() {
        out.push('<');
        for (i, param) in node.type_params.iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            out.push_str(&param.name);
            if let Some(bound) = param.bounds.first() {
                out.push_str(" : ");
                out.push_str(&type_display(bound));
            }
        }
        out.push_str("> ");
    }

    out.push_str(&node.name);

    match &node.detail {
        Some(KindDetail::Function {
            return_type,
            receiver: _,
            is_constructor: _,
        }) => {
            out.push('(');
            let params: Vec<&DeclarationNode> =
                node.children_of_kind(DeclKind::Parameter).collect();
            for (i, param) in params.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                out.push_str(&param.name);
                if let Some(KindDetail::Parameter { type_ref }) = &param.detail {
                    out.push_str(": ");
                    out.push_str(&type_display(type_ref));
                }
            }
            out.push(')');
            if let Some(return_type) = return_type {
                out.push_str(": ");
                out.push_str(&type_display(return_type));
            }
        }
        Some(KindDetail::Property { type_ref }) => {
            out.push_str(": ");
            out.push_str(&type_display(type_ref));
        }
        Some(KindDetail::TypeAlias { underlying }) => {
            if let Some(type_ref) = underlying.get(variant) {
                out.push_str(" = ");
                out.push_str(&type_display(type_ref));
            }
        }
        _ => {}
    }

    out
}

/// Short display form of a type reference
fn type_display(type_ref: &TypeRef) -> String {
    match type_ref {
        TypeRef::Named { path, args } => {
            let short = path.rsplit('.').next().unwrap_or(path);
            if args.is_empty() {
                short.to_string()
            } else {
                let args: Vec<String> = args.iter().map(type_display).collect();
                format!("{short}<{}>", args.join(", "))
            }
        }
        TypeRef::Nullable(inner) => format!("{}?", type_display(inner)),
        TypeRef::Star => "*".to_string(),
        other => other.canonical(),
    }
}

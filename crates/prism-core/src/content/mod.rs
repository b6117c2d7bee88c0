//! Format-agnostic content tree
//!
//! The assembler turns the merged declaration tree into pages of
//! [`ContentNode`]s. Every content node carries the set of platform
//! variants it is valid for, so a renderer can show or hide content
//! per reader-selected platform without re-deriving anything. Content
//! whose value differs between variants is wrapped in a
//! [`DivergentGroup`] so one logical declaration renders once with
//! per-platform blocks instead of duplicating tree structure.

mod assembler;
mod brief;

pub use assembler::{AssembledDocs, Assembler};
pub use brief::brief_segment;

use std::collections::{BTreeSet, HashMap};

use crate::ident::DeclId;
use crate::platform::VariantId;

/// Visual hint attached to a content node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentStyle {
    /// Table or block caption
    Caption,
    /// Monospaced rendering
    Monospace,
    /// Emphasized rendering
    Strong,
    /// Struck-through rendering, used for deprecations
    Strikethrough,
}

/// What a content node is, with its kind-specific payload
#[derive(Debug, Clone, PartialEq)]
pub enum ContentKind {
    /// Plain prose
    Text(String),
    /// Section or page heading
    Header {
        /// Heading level, 1-based
        level: u8,
        /// Heading text
        text: String,
    },
    /// Cross-page link resolved through the page index
    Link {
        /// Link text
        text: String,
        /// Identifier of the link target
        target: DeclId,
    },
    /// Verbatim code
    CodeBlock(String),
    /// Neutral grouping of children
    Group,
    /// Platform tags shown on a page cover
    PlatformTags,
    /// Declaration signature
    Signature,
    /// One-line summary shown in tables
    Brief,
    /// Full description section
    Description,
    /// Deprecation notice
    Deprecation,
    /// Parameter documentation section
    Parameters,
    /// See-also section
    SeeAlso,
    /// Throws section
    Throws,
    /// Table of members
    Table {
        /// Table caption
        caption: Option<String>,
    },
    /// One table row
    Row,
    /// Per-platform divergent rendering of one logical entry
    Divergent(DivergentGroup),
}

/// Per-platform instances of one logical piece of content
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DivergentGroup {
    /// The instances, in first-seen variant order
    pub instances: Vec<DivergentInstance>,
}

/// One platform-specific rendering inside a divergent group
#[derive(Debug, Clone, PartialEq)]
pub struct DivergentInstance {
    /// Variants this instance applies to
    pub platforms: BTreeSet<VariantId>,
    /// Content shown before the divergent part
    pub before: Option<Box<ContentNode>>,
    /// The divergent content itself
    pub divergent: Box<ContentNode>,
    /// Content shown after the divergent part
    pub after: Option<Box<ContentNode>>,
}

/// One node of the content tree
#[derive(Debug, Clone, PartialEq)]
pub struct ContentNode {
    /// What the node is
    pub kind: ContentKind,
    /// Variants the node is valid for
    pub platforms: BTreeSet<VariantId>,
    /// Nested content
    pub children: Vec<ContentNode>,
    /// Visual hints
    pub styles: Vec<ContentStyle>,
}

impl ContentNode {
    /// Create a node with no children
    #[must_use]
    pub fn new(kind: ContentKind, platforms: BTreeSet<VariantId>) -> Self {
        Self {
            kind,
            platforms,
            children: Vec::new(),
            styles: Vec::new(),
        }
    }

    /// Plain text node
    #[must_use]
    pub fn text(text: impl Into<String>, platforms: BTreeSet<VariantId>) -> Self {
        Self::new(ContentKind::Text(text.into()), platforms)
    }

    /// Heading node
    #[must_use]
    pub fn header(level: u8, text: impl Into<String>, platforms: BTreeSet<VariantId>) -> Self {
        Self::new(
            ContentKind::Header {
                level,
                text: text.into(),
            },
            platforms,
        )
    }

    /// Link node
    #[must_use]
    pub fn link(
        text: impl Into<String>,
        target: DeclId,
        platforms: BTreeSet<VariantId>,
    ) -> Self {
        Self::new(
            ContentKind::Link {
                text: text.into(),
                target,
            },
            platforms,
        )
    }

    /// Append a child, builder style
    #[must_use]
    pub fn with_child(mut self, child: ContentNode) -> Self {
        self.children.push(child);
        self
    }

    /// Append children, builder style
    #[must_use]
    pub fn with_children(mut self, children: impl IntoIterator<Item = ContentNode>) -> Self {
        self.children.extend(children);
        self
    }

    /// Attach a style hint, builder style
    #[must_use]
    pub fn with_style(mut self, style: ContentStyle) -> Self {
        self.styles.push(style);
        self
    }

    /// Depth-first search for the first node matching `predicate`
    #[must_use]
    pub fn dfs(&self, predicate: &dyn Fn(&ContentNode) -> bool) -> Option<&ContentNode> {
        if predicate(self) {
            return Some(self);
        }
        for child in &self.children {
            if let Some(found) = child.dfs(predicate) {
                return Some(found);
            }
        }
        if let ContentKind::Divergent(group) = &self.kind {
            for instance in &group.instances {
                if let Some(found) = instance.divergent.dfs(predicate) {
                    return Some(found);
                }
            }
        }
        None
    }
}

/// Kind of page in the page tree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageKind {
    /// Root page of the whole module
    Module,
    /// One package
    Package,
    /// One class-like declaration
    Classlike,
    /// One member (function or property) group
    Member,
}

/// One page of assembled documentation
#[derive(Debug, Clone)]
pub struct PageNode {
    /// Page title
    pub name: String,
    /// What the page documents
    pub kind: PageKind,
    /// Identifiers documented on this page; member pages holding an
    /// overload group carry one identifier per overload
    pub ids: Vec<DeclId>,
    /// Variants the page covers
    pub platforms: BTreeSet<VariantId>,
    /// The page's content tree
    pub content: ContentNode,
    /// Sub-pages
    pub children: Vec<PageNode>,
}

impl PageNode {
    /// Total number of pages in this subtree, this page included
    #[must_use]
    pub fn page_count(&self) -> usize {
        1 + self.children.iter().map(PageNode::page_count).sum::<usize>()
    }

    /// Depth-first search for the first page matching `predicate`
    #[must_use]
    pub fn dfs(&self, predicate: &dyn Fn(&PageNode) -> bool) -> Option<&PageNode> {
        if predicate(self) {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.dfs(predicate))
    }
}

/// Read-only index from declaration identifiers to page paths
///
/// Built once after assembly; the only mechanism renderers use to
/// resolve identifier-addressed links.
#[derive(Debug, Clone, Default)]
pub struct PageIndex {
    paths: HashMap<DeclId, Vec<String>>,
}

impl PageIndex {
    /// Build the index for a page tree
    #[must_use]
    pub fn build(root: &PageNode) -> Self {
        let mut index = PageIndex::default();
        index.visit(root, &[]);
        index
    }

    fn visit(&mut self, page: &PageNode, prefix: &[String]) {
        let mut path = prefix.to_vec();
        path.push(page.name.clone());
        for id in &page.ids {
            // First registration wins so a clash between pages keeps
            // the earliest, deterministic target
            self.paths.entry(id.clone()).or_insert_with(|| path.clone());
        }
        for child in &page.children {
            self.visit(child, &path);
        }
    }

    /// Path of page names leading to the page documenting `id`
    #[must_use]
    pub fn lookup(&self, id: &DeclId) -> Option<&[String]> {
        self.paths.get(id).map(Vec::as_slice)
    }

    /// Number of indexed identifiers
    #[must_use]
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    /// Whether the index is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

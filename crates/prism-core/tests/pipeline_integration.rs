//! Integration tests for the full pipeline: provider facts through
//! tree building, merging, and page assembly

use std::collections::BTreeSet;

use prism_core::builder::build_forests;
use prism_core::content::{Assembler, ContentKind, PageKind};
use prism_core::merge::{MergeEngine, MergeMode};
use prism_core::model::{DeclKind, DocLanguage};
use prism_core::platform::{PlatformKind, Variant, VariantId};
use prism_core::provider::{DeclarationFact, InMemoryProvider, JsonProvider, PackageFact};

fn jvm() -> Variant {
    Variant::new(VariantId::new("core", "jvm"), "JVM", PlatformKind::Jvm)
}

fn common() -> Variant {
    Variant::new(VariantId::new("core", "common"), "Common", PlatformKind::Common)
}

fn variant_set(variants: &[&VariantId]) -> BTreeSet<VariantId> {
    variants.iter().map(|v| (*v).clone()).collect()
}

#[test]
fn test_single_variant_build_and_assembly() {
    // One variant declares class Foo with member function bar(); the
    // assembled output has one page for Foo and one for bar, each
    // tagged with the jvm platform set
    let packages = vec![PackageFact::new("demo").with_member(
        DeclarationFact::new("Foo", DeclKind::Class)
            .with_member(DeclarationFact::new("bar", DeclKind::Function)),
    )];
    let providers = vec![InMemoryProvider::new(jvm(), packages)];

    let forests = build_forests("demo-module", &providers).unwrap();
    let outcome = MergeEngine::new(MergeMode::Implicit).merge(&forests).unwrap();
    let docs = Assembler::new().assemble(&outcome);

    let foo_pages: Vec<_> = collect_page_names(&docs.root)
        .into_iter()
        .filter(|(name, _)| name == "Foo")
        .collect();
    let bar_pages: Vec<_> = collect_page_names(&docs.root)
        .into_iter()
        .filter(|(name, _)| name == "bar")
        .collect();
    assert_eq!(foo_pages.len(), 1);
    assert_eq!(bar_pages.len(), 1);

    let jvm_only = variant_set(&[&jvm().id]);
    let foo = docs.root.dfs(&|p| p.name == "Foo").unwrap();
    let bar = docs.root.dfs(&|p| p.name == "bar").unwrap();
    assert_eq!(foo.platforms, jvm_only);
    assert_eq!(bar.platforms, jvm_only);
    assert_eq!(foo.kind, PageKind::Classlike);
    assert_eq!(bar.kind, PageKind::Member);
}

#[test]
fn test_logically_identical_functions_merge_across_variants() {
    // "common" and "jvm" both declare top-level baz(): one merged node
    // whose platform set covers both variants
    let make_packages = || {
        vec![PackageFact::new("demo")
            .with_member(DeclarationFact::new("baz", DeclKind::Function))]
    };
    let providers = vec![
        InMemoryProvider::new(common(), make_packages()),
        InMemoryProvider::new(jvm(), make_packages()),
    ];

    let forests = build_forests("demo-module", &providers).unwrap();
    let outcome = MergeEngine::new(MergeMode::Implicit).merge(&forests).unwrap();

    let baz = outcome.module.dfs(&|n| n.name == "baz").unwrap();
    assert_eq!(baz.variants, variant_set(&[&common().id, &jvm().id]));

    // Exactly one baz node exists in the merged tree
    let package = &outcome.module.children[0];
    let baz_count = package.children.iter().filter(|n| n.name == "baz").count();
    assert_eq!(baz_count, 1);
}

#[test]
fn test_expected_and_actual_class_merge() {
    // "common" declares the expected class A, "jvm" its actual
    // implementation with the same identifier; documentation is keyed
    // by both variants and children union
    let common_packages = vec![PackageFact::new("demo").with_member(
        DeclarationFact::new("A", DeclKind::Class)
            .expected()
            .with_doc("Expected side.", DocLanguage::Paragraphed)
            .with_member(DeclarationFact::new("shared", DeclKind::Function)),
    )];
    let jvm_packages = vec![PackageFact::new("demo").with_member(
        DeclarationFact::new("A", DeclKind::Class)
            .with_doc("Actual side.", DocLanguage::Paragraphed)
            .with_member(DeclarationFact::new("shared", DeclKind::Function))
            .with_member(DeclarationFact::new("jvmOnly", DeclKind::Function)),
    )];
    let providers = vec![
        InMemoryProvider::new(common(), common_packages),
        InMemoryProvider::new(jvm(), jvm_packages),
    ];

    let forests = build_forests("demo-module", &providers).unwrap();
    let outcome = MergeEngine::new(MergeMode::Implicit).merge(&forests).unwrap();

    let a = outcome.module.dfs(&|n| n.name == "A").unwrap();
    assert!(a.documentation.contains_key(&common().id));
    assert!(a.documentation.contains_key(&jvm().id));
    assert_eq!(a.expect_present_in, Some(common().id.clone()));

    // Children are the union of both variants' members
    let names: Vec<&str> = a.children.iter().map(|c| c.name.as_str()).collect();
    assert!(names.contains(&"shared"));
    assert!(names.contains(&"jvmOnly"));
    let shared = a.children.iter().find(|c| c.name == "shared").unwrap();
    assert_eq!(shared.variants, variant_set(&[&common().id, &jvm().id]));
    let jvm_only = a.children.iter().find(|c| c.name == "jvmOnly").unwrap();
    assert_eq!(jvm_only.variants, variant_set(&[&jvm().id]));
}

#[test]
fn test_json_fixture_drives_the_pipeline() {
    let fixture = serde_json::json!({
        "variant": {
            "id": { "module_name": "core", "variant_name": "jvm" },
            "display_name": "JVM",
            "kind": "jvm",
            "depends_on": []
        },
        "packages": [
            {
                "name": "demo",
                "members": [
                    {
                        "name": "Widget",
                        "kind": "class",
                        "doc_text": "A drawable widget.\n\nDetails follow.",
                        "members": [
                            {
                                "name": "draw",
                                "kind": "function",
                                "doc_text": "Draws the widget. Needs attachment.",
                                "doc_language": "flat-text"
                            }
                        ]
                    }
                ]
            }
        ]
    });
    let providers = vec![JsonProvider::from_value(fixture).unwrap()];

    let forests = build_forests("demo-module", &providers).unwrap();
    let outcome = MergeEngine::new(MergeMode::Implicit).merge(&forests).unwrap();
    let docs = Assembler::new().assemble(&outcome);

    // Flat-text docs brief to the first sentence in the member table
    let widget = docs.root.dfs(&|p| p.name == "Widget").unwrap();
    let brief = widget
        .content
        .dfs(&|n| {
            matches!(&n.kind, ContentKind::Text(text) if text == "Draws the widget.")
        });
    assert!(brief.is_some());
}

#[test]
fn test_separate_mode_pages_and_clash_resolution_per_page() {
    let make_packages = || {
        vec![PackageFact::new("demo").with_member(
            DeclarationFact::new("Widget", DeclKind::Class)
                .with_member(DeclarationFact::new("draw", DeclKind::Function)),
        )]
    };
    let providers = vec![
        InMemoryProvider::new(common(), make_packages()),
        InMemoryProvider::new(jvm(), make_packages()),
    ];

    let forests = build_forests("demo-module", &providers).unwrap();
    let outcome = MergeEngine::new(MergeMode::Separate).merge(&forests).unwrap();

    // Attribute maps merge regardless of mode
    let widget = outcome.module.dfs(&|n| n.name == "Widget").unwrap();
    assert_eq!(widget.variants.len(), 2);

    // But each variant renders its own page
    let docs = Assembler::new().assemble(&outcome);
    let widget_pages: Vec<_> = collect_page_names(&docs.root)
        .into_iter()
        .filter(|(name, _)| name == "Widget")
        .collect();
    assert_eq!(widget_pages.len(), 2);
}

#[test]
fn test_json_fixture_loads_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("jvm.json");
    let fixture = serde_json::json!({
        "variant": {
            "id": { "module_name": "core", "variant_name": "jvm" },
            "display_name": "JVM",
            "kind": "jvm",
            "depends_on": []
        },
        "packages": [
            { "name": "demo", "members": [ { "name": "baz", "kind": "function" } ] }
        ]
    });
    std::fs::write(&path, serde_json::to_string_pretty(&fixture).unwrap()).unwrap();

    let provider = JsonProvider::from_path(&path).unwrap();
    let forests = build_forests("demo-module", &[provider]).unwrap();
    assert_eq!(forests.len(), 1);
    assert!(forests[0].module.dfs(&|n| n.name == "baz").is_some());
}

#[test]
fn test_provider_failure_aborts_the_build() {
    struct FailingProvider {
        variant: Variant,
    }

    impl prism_core::provider::DeclarationProvider for FailingProvider {
        fn variant(&self) -> &Variant {
            &self.variant
        }

        fn packages(&self) -> Result<Vec<PackageFact>, prism_core::CoreError> {
            Err(prism_core::CoreError::invalid_argument(
                "symbol database unavailable",
            ))
        }
    }

    let providers = vec![FailingProvider { variant: jvm() }];
    let err = build_forests("demo-module", &providers).unwrap_err();
    assert!(matches!(err, prism_core::CoreError::Provider { .. }));
}

fn collect_page_names(root: &prism_core::PageNode) -> Vec<(String, PageKind)> {
    let mut names = vec![(root.name.clone(), root.kind)];
    for child in &root.children {
        names.extend(collect_page_names(child));
    }
    names
}

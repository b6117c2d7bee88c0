//! Benchmark suite for declaration-tree building and merging
//!
//! Exercises the pipeline over synthetic multi-variant forests so
//! regressions in the grouping and clash-resolution paths show up as
//! throughput drops.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use prism_core::builder::build_forests;
use prism_core::content::Assembler;
use prism_core::ident::TypeRef;
use prism_core::merge::{MergeEngine, MergeMode};
use prism_core::model::{DeclKind, DocLanguage};
use prism_core::platform::{PlatformKind, Variant, VariantId};
use prism_core::provider::{DeclarationFact, InMemoryProvider, PackageFact};

/// Generate one variant's packages with the given number of classes
fn generate_packages(num_classes: usize) -> Vec<PackageFact> {
    let mut package = PackageFact::new("demo.generated");
    for i in 0..num_classes {
        let mut class = DeclarationFact::new(format!("Widget{i}"), DeclKind::Class)
            .with_doc("A generated widget.\n\nWith a longer tail.", DocLanguage::Paragraphed);
        for j in 0..8 {
            class = class.with_member(
                DeclarationFact::new(format!("method{j}"), DeclKind::Function)
                    .with_parameter("value", TypeRef::named("kotlin.Int"))
                    .with_doc("Does something. Then more.", DocLanguage::FlatText),
            );
        }
        package = package.with_member(class);
    }
    vec![package]
}

fn generate_providers(num_classes: usize) -> Vec<InMemoryProvider> {
    let variants = [
        Variant::new(VariantId::new("core", "common"), "Common", PlatformKind::Common),
        Variant::new(VariantId::new("core", "jvm"), "JVM", PlatformKind::Jvm),
        Variant::new(VariantId::new("core", "js"), "JS", PlatformKind::Js),
    ];
    variants
        .into_iter()
        .map(|variant| InMemoryProvider::new(variant, generate_packages(num_classes)))
        .collect()
}

/// Benchmark per-variant forest construction
fn bench_build_forests(c: &mut Criterion) {
    let mut group = c.benchmark_group("build_forests");

    for size in [10_usize, 100, 500] {
        let providers = generate_providers(size);
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &providers, |b, providers| {
            b.iter(|| black_box(build_forests("bench-module", providers).unwrap()));
        });
    }

    group.finish();
}

/// Benchmark cross-variant merging of prebuilt forests
fn bench_merge(c: &mut Criterion) {
    let mut group = c.benchmark_group("merge");

    for size in [10_usize, 100, 500] {
        let providers = generate_providers(size);
        let forests = build_forests("bench-module", &providers).unwrap();
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &forests, |b, forests| {
            let engine = MergeEngine::new(MergeMode::Implicit);
            b.iter(|| black_box(engine.merge(forests).unwrap()));
        });
    }

    group.finish();
}

/// Benchmark page assembly over a merged tree
fn bench_assemble(c: &mut Criterion) {
    let mut group = c.benchmark_group("assemble");

    for size in [10_usize, 100] {
        let providers = generate_providers(size);
        let forests = build_forests("bench-module", &providers).unwrap();
        let outcome = MergeEngine::new(MergeMode::Implicit).merge(&forests).unwrap();
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &outcome, |b, outcome| {
            let assembler = Assembler::new();
            b.iter(|| black_box(assembler.assemble(outcome)));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_build_forests, bench_merge, bench_assemble);
criterion_main!(benches);

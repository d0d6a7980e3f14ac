//! Benchmark suite for the sigil render path.
//!
//! This module provides performance benchmarks for:
//! - Template compilation (cold and cached)
//! - Rendering compiled templates against module results
//! - Directory scanning and activation predicates
//! - A full render pass with in-memory probes
//!
//! # Running Benchmarks
//!
//! ```bash
//! # Run all benchmarks
//! cargo bench
//!
//! # Save baseline for comparison
//! cargo bench -- --save-baseline main
//!
//! # Compare against baseline
//! cargo bench -- --baseline main
//! ```
//!
//! Criterion writes its JSON estimates and HTML reports to `target/criterion/`.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::collections::HashMap;
use std::fs;
use std::sync::Arc;
use tempfile::TempDir;

use sigil::{
    compile, Ast, ContextBuilder, Detection, DirListing, FormatCache, MockCommandRunner,
    ModuleDescriptor, ModuleRegistry, ModuleResult, Prompt, PromptConfig, Renderer, StaticProbe,
};

const TEMPLATES: [(&str, &str); 3] = [
    ("short", "$character"),
    ("typical", "$username$directory$git_branch$git_status$rust$cmd_duration$line_break$character"),
    (
        "nested",
        "[[$a (@$b)](bold red) [$c [\\[$d\\]](fg:#ff8800)](dimmed) ($e)](underline)",
    ),
];

// ============================================================================
// Template Benchmarks
// ============================================================================

/// Benchmark compiling templates from scratch and through the cache.
fn bench_compile(c: &mut Criterion) {
    let mut group = c.benchmark_group("compile");

    for (name, template) in TEMPLATES {
        group.throughput(Throughput::Bytes(template.len() as u64));
        group.bench_with_input(BenchmarkId::new("cold", name), &template, |b, template| {
            b.iter(|| black_box(compile(black_box(template))))
        });
    }

    let cache = FormatCache::new();
    group.bench_function("cached", |b| {
        b.iter(|| black_box(cache.get_or_compile(black_box(TEMPLATES[1].1))))
    });

    group.finish();
}

/// Benchmark rendering a prompt made of many small modules.
fn bench_render(c: &mut Criterion) {
    let mut group = c.benchmark_group("render");

    for module_count in [4, 16, 64] {
        let names: Vec<String> = (0..module_count).map(|i| format!("m{}", i)).collect();
        let formats: HashMap<String, Arc<Ast>> = names
            .iter()
            .map(|name| {
                let ast = compile("[$symbol$value( \\($extra\\))]($style) ").unwrap();
                (name.clone(), Arc::new(ast))
            })
            .collect();
        let results: HashMap<String, ModuleResult> = names
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let result = ModuleResult::new()
                    .with("symbol", "> ")
                    .with("value", format!("v{}", i))
                    .with_opt("extra", (i % 2 == 0).then(|| "x".to_string()))
                    .with_style("style", "bold green");
                (name.clone(), result)
            })
            .collect();
        let top = names.iter().map(|n| format!("${}", n)).collect::<String>();
        let ast = compile(&top).unwrap();

        group.throughput(Throughput::Elements(module_count as u64));
        group.bench_with_input(BenchmarkId::new("modules", module_count), &ast, |b, ast| {
            let renderer = Renderer::new(&formats, &results);
            b.iter(|| black_box(renderer.render(black_box(ast))))
        });
    }

    group.finish();
}

// ============================================================================
// Detection Benchmarks
// ============================================================================

/// Benchmark the directory scan and evaluating predicates against it.
fn bench_detect(c: &mut Criterion) {
    let mut group = c.benchmark_group("detect");

    let predicates = [
        Detection::files(&["Cargo.toml"]).with_extensions(&["rs"]),
        Detection::files(&["package.json", ".node-version"]).with_folders(&["node_modules"]),
        Detection::files(&["pyproject.toml", "requirements.txt"]).with_extensions(&["py"]),
        Detection::files(&["go.mod"]).with_extensions(&["go"]),
    ];

    for file_count in [10, 100, 1000] {
        let temp_dir = create_project(file_count);

        group.throughput(Throughput::Elements(file_count as u64));
        group.bench_with_input(
            BenchmarkId::new("scan", file_count),
            &temp_dir,
            |b, dir| b.iter(|| black_box(DirListing::from_dir(black_box(dir.path())))),
        );

        let listing = DirListing::from_dir(temp_dir.path()).unwrap();
        group.bench_with_input(
            BenchmarkId::new("match", file_count),
            &listing,
            |b, listing| {
                b.iter(|| {
                    predicates
                        .iter()
                        .filter(|p| p.matches_listing(black_box(listing)))
                        .count()
                })
            },
        );
    }

    group.finish();
}

// ============================================================================
// Render Pass Benchmarks
// ============================================================================

/// Benchmark a complete render pass with in-memory probes.
fn bench_prompt(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let temp_dir = create_project(50);

    let mut registry = ModuleRegistry::new();
    for i in 0..8 {
        let probe = StaticProbe::new().with_var("value", &format!("v{}", i));
        registry.register(
            ModuleDescriptor::new(format!("m{}", i), "bench module", Arc::new(probe))
                .with_detection(Detection::files(&["Cargo.toml"]))
                .with_format("[$value]($style) ")
                .with_style("bold"),
        );
    }
    let prompt = Prompt::new(PromptConfig::default().with_format("$all"))
        .with_registry(registry)
        .with_runner(Arc::new(MockCommandRunner::new()));

    c.bench_function("prompt/render_pass", |b| {
        b.iter(|| {
            let ctx = ContextBuilder::new(temp_dir.path()).build();
            rt.block_on(async { black_box(prompt.render(ctx).await) })
        })
    });
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Create a Rust project with the specified number of source files.
fn create_project(file_count: usize) -> TempDir {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");

    fs::write(
        temp_dir.path().join("Cargo.toml"),
        "[package]\nname = \"bench\"\nversion = \"0.1.0\"\n",
    )
    .expect("Failed to write Cargo.toml");
    fs::create_dir_all(temp_dir.path().join("src")).expect("Failed to create src dir");

    for i in 0..file_count {
        let ext = ["rs", "toml", "md", "txt"][i % 4];
        fs::write(temp_dir.path().join(format!("file_{}.{}", i, ext)), "")
            .expect("Failed to write file");
    }

    temp_dir
}

criterion_group!(benches, bench_compile, bench_render, bench_detect, bench_prompt);
criterion_main!(benches);

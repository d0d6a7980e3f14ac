//! Integration tests for the template language and the render pass

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use sigil::detect::detect;
use sigil::format::plain_text;
use sigil::testing::{assert_segment_style, assert_text};
use sigil::{
    compile, parse_style, ContextBuilder, Detection, DirListing, MockCommandRunner,
    ModuleDescriptor, ModuleRegistry, ModuleResult, Prompt, PromptConfig, Renderer, Segment,
    StaticProbe,
};
use tempfile::TempDir;

/// Render `template` at the top level against the given modules.
fn render(template: &str, modules: &[(&str, &str, ModuleResult)]) -> Vec<Segment> {
    let formats: HashMap<String, Arc<sigil::Ast>> = modules
        .iter()
        .map(|(name, format, _)| (name.to_string(), Arc::new(compile(format).unwrap())))
        .collect();
    let results: HashMap<String, ModuleResult> = modules
        .iter()
        .map(|(name, _, result)| (name.to_string(), result.clone()))
        .collect();
    let ast = compile(template).unwrap();
    Renderer::new(&formats, &results).render(&ast)
}

fn text(template: &str, modules: &[(&str, &str, ModuleResult)]) -> String {
    plain_text(&render(template, modules))
}

#[test]
fn test_all_absent_renders_literal_text_outside_groups() {
    assert_eq!(text("pre [$x] mid $y post", &[]), "pre  mid  post");
    assert_eq!(text("(a $x b)[c](bold)", &[]), "c");
}

#[test]
fn test_group_without_variables_always_renders() {
    let segments = render("[on ](bold)(here)", &[]);
    assert_text(&segments, "on here");
    assert_segment_style(&segments, "on ", Some(parse_style("bold")));
}

#[test]
fn test_conditional_group_follows_its_variable() {
    let region = [("region", "$v", ModuleResult::new().with("v", "us-east-1"))];
    assert_eq!(text("aws(@$region)", &region), "aws@us-east-1");
    assert_eq!(text("aws(@$region)", &[]), "aws");
}

#[test]
fn test_absent_module_variables_suppress_the_module() {
    let gone = [("gone", "<$v>", ModuleResult::new().with_opt("v", None::<String>))];
    assert_eq!(text("[$gone]", &gone), "");
    assert_eq!(text("$gone", &gone), "");
}

#[test]
fn test_nested_styles_resolve_innermost() {
    let segments = render("[a [b](red) c](green)", &[]);
    assert_eq!(
        segments
            .iter()
            .filter(|s| !s.text.is_empty())
            .cloned()
            .collect::<Vec<_>>(),
        vec![
            Segment::styled("a ", parse_style("green")),
            Segment::styled("b", parse_style("red")),
            Segment::styled(" c", parse_style("green")),
        ]
    );
}

#[test]
fn test_module_output_takes_the_enclosing_group_style() {
    let b = [("b", "$v", ModuleResult::new().with("v", "B"))];
    let segments = render("[a [$b](red) c](green)", &b);
    assert_segment_style(&segments, "B", Some(parse_style("red")));
    assert_segment_style(&segments, "a ", Some(parse_style("green")));
    assert_text(&segments, "a B c");
}

#[test]
fn test_escapes_at_any_depth() {
    assert_eq!(text(r"\$ \[ \] \( \) \\", &[]), r"$ [ ] ( ) \");
    assert_eq!(text(r"[[(\$\(\))](bold)]", &[]), "$()");
}

#[test]
fn test_to_template_round_trip() {
    for template in [
        "on [$symbol$branch](bold purple) (@$region)",
        r"\$5 [\[x\]](fg:#ff8800)",
        "${custom.deploy}[]()",
        "[$a [$b]($style) c](green)",
    ] {
        let ast = compile(template).unwrap();
        let again = compile(&ast.to_template()).unwrap();
        assert_eq!(ast, again, "round trip of {:?}", template);
    }
}

#[tokio::test]
async fn test_one_listing_serves_every_module() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("Cargo.toml"), "").unwrap();
    std::fs::write(dir.path().join("main.py"), "").unwrap();

    let listing = DirListing::from_dir(dir.path()).unwrap();
    let modules = [
        ModuleDescriptor::new("rust", "rust", Arc::new(StaticProbe::new()))
            .with_detection(Detection::files(&["Cargo.toml"])),
        ModuleDescriptor::new("python", "python", Arc::new(StaticProbe::new()))
            .with_detection(Detection::files(&[]).with_extensions(&["py"])),
        ModuleDescriptor::new("golang", "golang", Arc::new(StaticProbe::new()))
            .with_detection(Detection::files(&["go.mod"])),
    ];
    let refs: Vec<&ModuleDescriptor> = modules.iter().collect();
    let runner = MockCommandRunner::new();
    let ctx = ContextBuilder::new(dir.path()).build();

    let active = detect(&refs, &PromptConfig::default(), &listing, &ctx, &runner).await;
    let names: Vec<&str> = active.iter().map(|d| d.name.as_str()).collect();

    assert_eq!(names, vec!["rust", "python"]);
    assert_eq!(runner.call_count(), 0);
}

#[tokio::test]
async fn test_slow_module_is_isolated_by_its_timeout() {
    let mut registry = ModuleRegistry::new();
    registry.register(
        ModuleDescriptor::new("slow", "slow", Arc::new(StaticProbe::hanging())).with_format("$v "),
    );
    registry.register(
        ModuleDescriptor::new("fast", "fast", Arc::new(StaticProbe::new().with_var("v", "F")))
            .with_format("$v "),
    );

    let config = PromptConfig::default()
        .with_format("[$slow]$fast>")
        .with_add_newline(false)
        .with_command_timeout(100);
    let prompt = Prompt::new(config)
        .with_registry(registry)
        .with_runner(Arc::new(MockCommandRunner::new()));

    let start = Instant::now();
    let rendered = prompt
        .render(ContextBuilder::new(std::env::temp_dir()).build())
        .await;

    assert_eq!(rendered, "F >");
    assert!(start.elapsed() < Duration::from_secs(2));
}

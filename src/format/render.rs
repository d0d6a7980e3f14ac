//! Template rendering.
//!
//! Walks a compiled [`Ast`] with an explicit work stack. Each open group or
//! module expansion is a frame that records whether it saw any variable
//! reference and whether any of them resolved, which is all suppression
//! needs to know once the frame closes.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, warn};

use super::ast::{interpolate_style, Ast, Node};
use crate::context::Shell;
use crate::modules::ModuleResult;
use crate::style::StyleSpec;

/// How many module expansions may be nested inside one another.
pub const MAX_EXPANSION_DEPTH: usize = 8;

/// A run of text with one resolved style.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub text: String,
    /// `None` means no style was applied at any level.
    pub style: Option<StyleSpec>,
}

impl Segment {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            style: None,
        }
    }

    pub fn styled(text: impl Into<String>, style: StyleSpec) -> Self {
        Self {
            text: text.into(),
            style: Some(style),
        }
    }
}

/// Renders templates against the results of one evaluation pass.
pub struct Renderer<'a> {
    formats: &'a HashMap<String, Arc<Ast>>,
    results: &'a HashMap<String, ModuleResult>,
    all: Vec<&'a str>,
}

struct Scope<'a> {
    module: Option<&'a str>,
    result: Option<&'a ModuleResult>,
    depth: usize,
    parent: Option<usize>,
}

enum FrameKind {
    Root,
    Group(Option<StyleSpec>),
    Expansion,
}

struct Frame {
    kind: FrameKind,
    segments: Vec<Segment>,
    has_vars: bool,
    any_present: bool,
}

impl Frame {
    fn new(kind: FrameKind) -> Self {
        Self {
            kind,
            segments: Vec::new(),
            has_vars: false,
            any_present: false,
        }
    }

    fn mark(&mut self, present: bool) {
        self.has_vars = true;
        self.any_present |= present;
    }

    fn suppressed(&self) -> bool {
        self.has_vars && !self.any_present
    }
}

enum Work<'a> {
    Node(&'a Node, usize),
    Expand(&'a str, usize),
    Close,
}

impl<'a> Renderer<'a> {
    /// `formats` holds the compiled format of every known module, `results`
    /// the bindings of every module that was evaluated this pass.
    pub fn new(
        formats: &'a HashMap<String, Arc<Ast>>,
        results: &'a HashMap<String, ModuleResult>,
    ) -> Self {
        Self {
            formats,
            results,
            all: Vec::new(),
        }
    }

    /// Modules expanded by `$all`, in display order.
    #[must_use]
    pub fn with_all(mut self, modules: Vec<&'a str>) -> Self {
        self.all = modules;
        self
    }

    /// Render a single module as if the template were `$name`.
    pub fn render_module(&self, name: &str) -> Vec<Segment> {
        let ast = Ast::from(vec![Node::Variable(name.to_string())]);
        self.render(&ast)
    }

    /// Render a top-level template.
    pub fn render<'b>(&'b self, ast: &'b Ast) -> Vec<Segment> {
        let mut scopes = vec![Scope {
            module: None,
            result: None,
            depth: 0,
            parent: None,
        }];
        let mut frames = vec![Frame::new(FrameKind::Root)];
        let mut work: Vec<Work<'b>> = ast.nodes().iter().rev().map(|n| Work::Node(n, 0)).collect();

        while let Some(item) = work.pop() {
            match item {
                Work::Node(Node::Text(text), _) => {
                    top(&mut frames).segments.push(Segment::plain(text.as_str()));
                }
                Work::Node(Node::Variable(name), scope) => {
                    let bound = scopes[scope].result.and_then(|r| r.get(name));
                    if let Some(value) = bound {
                        let frame = top(&mut frames);
                        frame.mark(value.is_some());
                        if let Some(value) = value {
                            frame.segments.push(Segment::plain(value));
                        }
                    } else if name == "all" && scopes[scope].module.is_none() {
                        if self.all.is_empty() {
                            top(&mut frames).mark(false);
                            continue;
                        }
                        frames.push(Frame::new(FrameKind::Expansion));
                        work.push(Work::Close);
                        work.extend(self.all.iter().rev().map(|m| Work::Expand(*m, scope)));
                    } else if self.formats.contains_key(name.as_str()) {
                        work.push(Work::Expand(name.as_str(), scope));
                    } else {
                        top(&mut frames).mark(false);
                    }
                }
                Work::Node(Node::Group(group), scope) => {
                    let style = group
                        .style
                        .as_deref()
                        .map(|raw| resolve_style(raw, scopes[scope].result));
                    frames.push(Frame::new(FrameKind::Group(style)));
                    work.push(Work::Close);
                    work.extend(group.children.iter().rev().map(|n| Work::Node(n, scope)));
                }
                Work::Expand(name, parent) => {
                    let depth = scopes[parent].depth + 1;
                    if depth > MAX_EXPANSION_DEPTH {
                        warn!(module = name, "Module expansion deeper than {}", MAX_EXPANSION_DEPTH);
                        top(&mut frames).mark(false);
                        continue;
                    }
                    if in_chain(&scopes, parent, name) {
                        debug!(module = name, "Module expands itself; treating as absent");
                        top(&mut frames).mark(false);
                        continue;
                    }

                    match (self.formats.get(name), self.results.get(name)) {
                        (Some(format), Some(result)) if !result.is_all_absent() => {
                            scopes.push(Scope {
                                module: Some(name),
                                result: Some(result),
                                depth,
                                parent: Some(parent),
                            });
                            let idx = scopes.len() - 1;
                            frames.push(Frame::new(FrameKind::Expansion));
                            work.push(Work::Close);
                            work.extend(format.nodes().iter().rev().map(|n| Work::Node(n, idx)));
                        }
                        _ => top(&mut frames).mark(false),
                    }
                }
                Work::Close => close_frame(&mut frames),
            }
        }

        frames
            .pop()
            .map(|root| root.segments)
            .unwrap_or_default()
    }
}

fn top(frames: &mut [Frame]) -> &mut Frame {
    // The root frame is only popped after the work stack drains.
    let last = frames.len() - 1;
    &mut frames[last]
}

fn in_chain(scopes: &[Scope<'_>], from: usize, name: &str) -> bool {
    let mut cursor = Some(from);
    while let Some(idx) = cursor {
        if scopes[idx].module == Some(name) {
            return true;
        }
        cursor = scopes[idx].parent;
    }
    false
}

fn resolve_style(raw: &str, result: Option<&ModuleResult>) -> StyleSpec {
    let resolved = interpolate_style(raw, |name| result.and_then(|r| r.style(name)));
    StyleSpec::parse(&resolved)
}

fn close_frame(frames: &mut Vec<Frame>) {
    if frames.len() < 2 {
        return;
    }
    let Some(frame) = frames.pop() else {
        return;
    };
    let parent = top(frames);
    let suppressed = frame.suppressed();

    match frame.kind {
        FrameKind::Group(style) => {
            if frame.has_vars {
                parent.mark(frame.any_present);
            }
            if suppressed {
                return;
            }
            parent
                .segments
                .extend(frame.segments.into_iter().map(|mut segment| {
                    if segment.style.is_none() {
                        segment.style = style;
                    }
                    segment
                }));
        }
        FrameKind::Expansion => {
            parent.mark(!suppressed);
            if !suppressed {
                parent.segments.extend(frame.segments);
            }
        }
        FrameKind::Root => parent.segments.extend(frame.segments),
    }
}

/// Concatenate segment text without any styling.
pub fn plain_text(segments: &[Segment]) -> String {
    segments.iter().map(|s| s.text.as_str()).collect()
}

/// Serialize segments into the final prompt string for `shell`.
///
/// Adjacent segments with the same style are painted as one run. For bash
/// and zsh every escape sequence is wrapped in the shell's zero-width
/// markers.
pub fn paint_all(segments: &[Segment], shell: Shell) -> String {
    let mut painted = String::new();
    let mut run = String::new();
    let mut run_style: Option<StyleSpec> = None;

    for segment in segments {
        if segment.text.is_empty() {
            continue;
        }
        if !run.is_empty() && segment.style != run_style {
            paint_run(&mut painted, &run, run_style);
            run.clear();
        }
        run_style = segment.style;
        run.push_str(&segment.text);
    }
    paint_run(&mut painted, &run, run_style);

    wrap_escapes(&painted, shell)
}

fn paint_run(out: &mut String, text: &str, style: Option<StyleSpec>) {
    match style {
        Some(style) => out.push_str(&style.paint(text)),
        None => out.push_str(text),
    }
}

fn wrap_escapes(painted: &str, shell: Shell) -> String {
    let (open, close) = match shell {
        Shell::Bash => ("\\[", "\\]"),
        Shell::Zsh => ("%{", "%}"),
        _ => return painted.to_string(),
    };

    let mut out = String::with_capacity(painted.len() + 16);
    let mut rest = painted;
    while let Some(start) = rest.find('\x1b') {
        out.push_str(&rest[..start]);
        let sequence = &rest[start..];
        let end = sequence.find('m').map_or(sequence.len(), |i| i + 1);
        out.push_str(open);
        out.push_str(&sequence[..end]);
        out.push_str(close);
        rest = &sequence[end..];
    }
    out.push_str(rest);
    out
}

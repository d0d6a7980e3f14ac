//! The render pass.
//!
//! [`Prompt`] owns the configuration, the module registry, the command
//! runner and the format cache, and turns a [`Context`] into the final
//! prompt string:
//!
//! 1. compile the top-level format and work out which modules it needs;
//! 2. scan the working directory once;
//! 3. filter the needed modules through their detection predicates;
//! 4. evaluate the active modules concurrently;
//! 5. render the top-level template against the results and paint it.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, warn};

use crate::config::{ModuleConfig, PromptConfig, DEFAULT_FORMAT};
use crate::context::Context;
use crate::detect::{detect, DirListing};
use crate::error::{Result, SigilError};
use crate::exec::{CommandRunner, TokioCommandRunner};
use crate::format::{paint_all, plain_text, Ast, FormatCache, Renderer};
use crate::modules::{ModuleDescriptor, ModuleRegistry, ModuleResult};
use crate::scheduler::{evaluate, evaluate_all, ProbeOutcome};

/// Variable that expands every module not referenced explicitly.
const ALL: &str = "all";

/// Everything `sigil module <name>` reports about one module.
#[derive(Debug)]
pub struct ModuleReport {
    pub name: String,
    pub description: String,
    pub disabled: bool,
    pub active: bool,
    /// `None` when the module was not evaluated.
    pub outcome: Option<ProbeOutcome>,
    pub elapsed: Duration,
    pub result: ModuleResult,
    /// Painted output for the context's shell.
    pub rendered: String,
    /// Output without styling.
    pub text: String,
}

/// One row of `sigil modules`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModuleStatus {
    pub name: String,
    pub description: String,
    pub disabled: bool,
    pub active: bool,
}

/// Modules a template needs and the subset `$all` stands for.
#[derive(Debug, Default)]
struct Plan {
    needed: Vec<String>,
    all: Vec<String>,
}

/// The prompt renderer.
pub struct Prompt {
    config: Arc<PromptConfig>,
    registry: ModuleRegistry,
    runner: Arc<dyn CommandRunner>,
    cache: FormatCache,
}

impl Prompt {
    /// A prompt with the built-in and configured custom modules, running
    /// commands for real.
    pub fn new(config: PromptConfig) -> Self {
        let registry = ModuleRegistry::from_config(&config);
        let runner = Arc::new(TokioCommandRunner::new(config.command_timeout()));
        Self {
            config: Arc::new(config),
            registry,
            runner,
            cache: FormatCache::new(),
        }
    }

    #[must_use]
    pub fn with_runner(mut self, runner: Arc<dyn CommandRunner>) -> Self {
        self.runner = runner;
        self
    }

    #[must_use]
    pub fn with_registry(mut self, registry: ModuleRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn config(&self) -> &PromptConfig {
        &self.config
    }

    pub fn registry(&self) -> &ModuleRegistry {
        &self.registry
    }

    /// Render the prompt. Never fails; broken pieces render as absent.
    pub async fn render(&self, context: Context) -> String {
        let body = self.render_pass(Arc::new(context)).await;
        if self.config.add_newline {
            format!("\n{}", body)
        } else {
            body
        }
    }

    async fn render_pass(&self, context: Arc<Context>) -> String {
        let top = self.top_level_format();
        let formats = self.module_formats();
        let plan = self.plan(&top, &formats);
        debug!("Render needs {} modules: {:?}", plan.needed.len(), plan.needed);

        let needed: Vec<&ModuleDescriptor> = plan
            .needed
            .iter()
            .filter_map(|name| self.registry.get(name))
            .collect();

        let listing = Arc::new(DirListing::scan(&context.current_dir, self.config.scan_timeout()).await);
        let active = detect(&needed, &self.config, &listing, &context, self.runner.as_ref()).await;
        let results = evaluate(
            &active,
            &self.config,
            Arc::clone(&context),
            listing,
            Arc::clone(&self.runner),
        )
        .await;

        let renderer = Renderer::new(&formats, &results)
            .with_all(plan.all.iter().map(String::as_str).collect());
        paint_all(&renderer.render(&top), context.shell)
    }

    /// Evaluate one module on its own and report what happened.
    pub async fn explain_module(&self, name: &str, context: Context) -> Result<ModuleReport> {
        let descriptor = self
            .registry
            .get(name)
            .ok_or_else(|| SigilError::UnknownModule {
                name: name.to_string(),
            })?;
        let module_config = self.config.module(name);
        let context = Arc::new(context);

        let listing = Arc::new(DirListing::scan(&context.current_dir, self.config.scan_timeout()).await);
        let active = detect(
            &[descriptor],
            &self.config,
            &listing,
            &context,
            self.runner.as_ref(),
        )
        .await;

        let mut report = ModuleReport {
            name: descriptor.name.clone(),
            description: descriptor.description.clone(),
            disabled: descriptor.is_disabled(&module_config),
            active: !active.is_empty(),
            outcome: None,
            elapsed: Duration::ZERO,
            result: ModuleResult::absent(),
            rendered: String::new(),
            text: String::new(),
        };
        if !report.active {
            return Ok(report);
        }

        let evaluation = evaluate_all(
            &active,
            &self.config,
            Arc::clone(&context),
            listing,
            Arc::clone(&self.runner),
        )
        .await
        .pop();

        if let Some(evaluation) = evaluation {
            let formats = self.module_formats();
            let results = HashMap::from([(evaluation.module.clone(), evaluation.result.clone())]);
            let segments = Renderer::new(&formats, &results).render_module(name);

            report.rendered = paint_all(&segments, context.shell);
            report.text = plain_text(&segments);
            report.elapsed = evaluation.elapsed;
            report.outcome = Some(evaluation.outcome);
            report.result = evaluation.result;
        }
        Ok(report)
    }

    /// Every registered module and whether it would be active in the
    /// context's directory.
    pub async fn list_modules(&self, context: &Context) -> Vec<ModuleStatus> {
        let all: Vec<&ModuleDescriptor> = self.registry.iter().collect();
        let listing = DirListing::scan(&context.current_dir, self.config.scan_timeout()).await;
        let active: HashSet<&str> = detect(&all, &self.config, &listing, context, self.runner.as_ref())
            .await
            .into_iter()
            .map(|d| d.name.as_str())
            .collect();

        all.into_iter()
            .map(|descriptor| ModuleStatus {
                name: descriptor.name.clone(),
                description: descriptor.description.clone(),
                disabled: descriptor.is_disabled(&self.config.module(&descriptor.name)),
                active: active.contains(descriptor.name.as_str()),
            })
            .collect()
    }

    /// The configured top-level format, or the default one if it does not
    /// compile.
    fn top_level_format(&self) -> Arc<Ast> {
        match self.cache.get_or_compile(&self.config.format) {
            Ok(ast) => ast,
            Err(e) => {
                warn!("{}; using '{}'", SigilError::format("format", e), DEFAULT_FORMAT);
                self.cache
                    .get_or_compile(DEFAULT_FORMAT)
                    .unwrap_or_else(|_| Arc::new(Ast::default()))
            }
        }
    }

    /// Compiled formats of every registered module. A module whose formats
    /// all fail to compile is left out and renders as absent.
    fn module_formats(&self) -> HashMap<String, Arc<Ast>> {
        self.registry
            .iter()
            .filter_map(|descriptor| {
                let module_config = self.config.module(&descriptor.name);
                self.module_format(descriptor, &module_config)
                    .map(|ast| (descriptor.name.clone(), ast))
            })
            .collect()
    }

    fn module_format(&self, descriptor: &ModuleDescriptor, config: &ModuleConfig) -> Option<Arc<Ast>> {
        if let Some(format) = &config.format {
            match self.cache.get_or_compile(format) {
                Ok(ast) => return Some(ast),
                Err(e) => warn!(
                    "{}; using the module's default",
                    SigilError::format(format!("{}.format", descriptor.name), e)
                ),
            }
        }
        match self.cache.get_or_compile(&descriptor.default_format) {
            Ok(ast) => Some(ast),
            Err(e) => {
                warn!(
                    "{}",
                    SigilError::format(format!("default {}.format", descriptor.name), e)
                );
                None
            }
        }
    }

    /// Walk module references from the top-level template, module formats
    /// included, and resolve what `$all` stands for.
    fn plan(&self, top: &Ast, formats: &HashMap<String, Arc<Ast>>) -> Plan {
        let top_vars = top.variables();
        let mut reached = BTreeSet::new();
        let mut pending: Vec<&str> = top_vars
            .iter()
            .copied()
            .filter(|v| formats.contains_key(*v))
            .collect();
        drain(&mut pending, &mut reached, formats);

        let mut all: Vec<&str> = Vec::new();
        if top_vars.contains(ALL) {
            all = self
                .registry
                .iter()
                .map(|d| d.name.as_str())
                .filter(|name| !reached.contains(name) && formats.contains_key(*name))
                .collect();
            pending.extend(all.iter().copied());
            drain(&mut pending, &mut reached, formats);
        }

        let needed = self
            .registry
            .iter()
            .map(|d| d.name.as_str())
            .filter(|name| reached.contains(name))
            .map(str::to_string)
            .collect();

        Plan {
            needed,
            all: all.into_iter().map(str::to_string).collect(),
        }
    }
}

/// Mark every module reachable from `pending` through module formats.
fn drain<'a>(
    pending: &mut Vec<&'a str>,
    reached: &mut BTreeSet<&'a str>,
    formats: &'a HashMap<String, Arc<Ast>>,
) {
    while let Some(name) = pending.pop() {
        if !reached.insert(name) {
            continue;
        }
        if let Some(ast) = formats.get(name) {
            pending.extend(
                ast.variables()
                    .into_iter()
                    .filter(|v| formats.contains_key(*v) && !reached.contains(v)),
            );
        }
    }
}

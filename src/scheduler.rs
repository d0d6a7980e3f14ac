//! Concurrent, timeout-bounded module evaluation.
//!
//! Every active module's probe runs as its own tokio task. The tasks share
//! only the context snapshot, the directory listing and the command runner,
//! all behind `Arc`. A probe that fails, panics or outlives its timeout
//! yields an absent result; nothing a single probe does can stop the render.
//!
//! The timeout is applied to the task handle, not inside the task, so a probe
//! that blocks its worker thread is abandoned on time as well. Its task is
//! aborted and left behind.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::config::PromptConfig;
use crate::context::Context;
use crate::detect::DirListing;
use crate::error::SigilError;
use crate::exec::CommandRunner;
use crate::modules::{ModuleDescriptor, ModuleResult, ProbeContext};

/// How a probe ended.
#[derive(Debug)]
pub enum ProbeOutcome {
    Completed,
    /// The probe, or a command it ran, exceeded its budget.
    TimedOut(SigilError),
    Failed(SigilError),
}

impl ProbeOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed)
    }

    pub fn error(&self) -> Option<&SigilError> {
        match self {
            Self::Completed => None,
            Self::TimedOut(e) | Self::Failed(e) => Some(e),
        }
    }

    fn from_error(module: &str, error: anyhow::Error) -> Self {
        let error = match error.downcast::<SigilError>() {
            Ok(error) => error,
            Err(error) => SigilError::probe(module, format!("{:#}", error)),
        };

        if error.is_timeout() {
            warn!("{}", error);
            Self::TimedOut(error)
        } else {
            if error.is_recoverable() {
                debug!("Module '{}': {}", module, error);
            } else {
                warn!("Module '{}': {}", module, error);
            }
            Self::Failed(error)
        }
    }
}

impl fmt::Display for ProbeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Completed => f.write_str("completed"),
            Self::TimedOut(_) => f.write_str("timed out"),
            Self::Failed(e) => write!(f, "failed: {}", e),
        }
    }
}

/// One module's result with its outcome and timing.
#[derive(Debug)]
pub struct Evaluation {
    pub module: String,
    pub result: ModuleResult,
    pub outcome: ProbeOutcome,
    pub elapsed: Duration,
}

/// Budget for one module: its config table, then the descriptor, then the
/// global `command_timeout`.
pub fn module_timeout(descriptor: &ModuleDescriptor, config: &PromptConfig) -> Duration {
    config
        .module(&descriptor.name)
        .timeout_ms
        .map(Duration::from_millis)
        .or(descriptor.timeout)
        .unwrap_or_else(|| config.command_timeout())
}

/// Run every module in `active` and wait for all of them, each at most for
/// its own timeout.
///
/// Evaluations come back in the order of `active`.
pub async fn evaluate_all(
    active: &[&ModuleDescriptor],
    config: &PromptConfig,
    context: Arc<Context>,
    listing: Arc<DirListing>,
    runner: Arc<dyn CommandRunner>,
) -> Vec<Evaluation> {
    let pending: Vec<_> = active
        .iter()
        .map(|descriptor| {
            let module_config = config.module(&descriptor.name);
            let timeout = module_timeout(descriptor, config);
            let style = descriptor.style(&module_config).to_string();
            let probe = Arc::clone(&descriptor.probe);
            let ctx = ProbeContext {
                module: descriptor.name.clone(),
                context: Arc::clone(&context),
                listing: Arc::clone(&listing),
                runner: Arc::clone(&runner),
                config: Arc::new(module_config),
            };

            let start = Instant::now();
            let handle = tokio::spawn(async move { probe.probe(&ctx).await });
            settle(descriptor.name.clone(), handle, timeout, style, start)
        })
        .collect();

    join_all(pending).await
}

/// Wait for one probe task, abandoning it once `timeout` has passed.
async fn settle(
    module: String,
    mut handle: JoinHandle<anyhow::Result<ModuleResult>>,
    timeout: Duration,
    style: String,
    start: Instant,
) -> Evaluation {
    let joined = tokio::time::timeout(timeout, &mut handle).await;
    let elapsed = start.elapsed();

    let (result, outcome) = match joined {
        Ok(Ok(Ok(mut result))) => {
            result.default_style("style", &style);
            debug!("Module '{}' completed in {:?}", module, elapsed);
            (result, ProbeOutcome::Completed)
        }
        Ok(Ok(Err(e))) => (ModuleResult::absent(), ProbeOutcome::from_error(&module, e)),
        Ok(Err(e)) => {
            warn!("Module '{}' panicked: {}", module, e);
            let error = SigilError::probe(&module, format!("task panicked: {}", e));
            (ModuleResult::absent(), ProbeOutcome::Failed(error))
        }
        Err(_elapsed) => {
            handle.abort();
            let error = SigilError::probe_timeout(&module, timeout);
            warn!("{}", error);
            (ModuleResult::absent(), ProbeOutcome::TimedOut(error))
        }
    };

    Evaluation {
        module,
        result,
        outcome,
        elapsed,
    }
}

/// Run every module in `active` and key the results by module name.
pub async fn evaluate(
    active: &[&ModuleDescriptor],
    config: &PromptConfig,
    context: Arc<Context>,
    listing: Arc<DirListing>,
    runner: Arc<dyn CommandRunner>,
) -> HashMap<String, ModuleResult> {
    into_results(evaluate_all(active, config, context, listing, runner).await)
}

pub fn into_results(evaluations: Vec<Evaluation>) -> HashMap<String, ModuleResult> {
    evaluations
        .into_iter()
        .map(|evaluation| (evaluation.module, evaluation.result))
        .collect()
}

//! Sigil - a fast, cross-shell prompt
//!
//! On every shell redraw sigil gathers facts about the environment (git
//! branch, toolchain versions, cloud profile, exit status, ...), renders them
//! through a small template language and prints one styled string.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`style`] - Style strings (`bold fg:#ff8800`) to terminal attributes
//! - [`format`] - Template compiler, renderer and compiled-format cache
//! - [`detect`] - The shared directory scan and module activation predicates
//! - [`scheduler`] - Concurrent, timeout-bounded probe evaluation
//! - [`modules`] - The `Probe` trait, module registry and built-in modules
//! - [`prompt`] - The render pass tying everything together
//! - [`config`] - Configuration loading and validation
//! - [`context`] - The per-render context snapshot
//! - [`exec`] - External command execution
//! - [`git`] - Repository discovery and status parsing
//! - [`error`] - Custom error types and handling
//! - [`testing`] - Testing infrastructure (mocks, fixtures, assertions)
//!
//! # Example
//!
//! ```rust,ignore
//! use sigil::{ContextBuilder, Prompt, PromptConfig, Shell};
//!
//! let config = PromptConfig::load_or_default();
//! let context = ContextBuilder::new(std::env::current_dir()?)
//!     .with_shell(Shell::Zsh)
//!     .capture_env()
//!     .build();
//!
//! let prompt = Prompt::new(config).render(context).await;
//! print!("{}", prompt);
//! ```

pub mod config;
pub mod context;
pub mod detect;
pub mod error;
pub mod exec;
pub mod format;
pub mod git;
pub mod modules;
pub mod prompt;
pub mod scheduler;
pub mod style;
pub mod testing;

// Re-export commonly used types
pub use error::{IntoSigilError, Result, SigilError};

// Re-export config and context types
pub use config::{CustomModuleConfig, ModuleConfig, PromptConfig, ValidationReport};
pub use context::{Context, ContextBuilder, ExitStatus, Shell};

// Re-export the template language
pub use format::{compile, Ast, FormatCache, FormatError, Node, Renderer, Segment};
pub use style::{parse_style, Color, StyleSpec};

// Re-export evaluation types
pub use detect::{Detection, DirListing};
pub use exec::{CommandOutput, CommandRunner, TokioCommandRunner};
pub use modules::{ModuleDescriptor, ModuleRegistry, ModuleResult, Probe, ProbeContext};
pub use prompt::{ModuleReport, ModuleStatus, Prompt};
pub use scheduler::{Evaluation, ProbeOutcome};

// Re-export testing types for convenience
pub use testing::{MockCommandRunner, StaticProbe};

// TestFixture is only available in test builds
#[cfg(test)]
pub use testing::TestFixture;

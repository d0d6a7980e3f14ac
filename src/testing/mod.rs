//! Testing infrastructure for sigil.
//!
//! This module provides mocks, fixtures, and assertions for testing probes,
//! detection and the scheduler without spawning real processes.
//!
//! # Architecture
//!
//! The testing infrastructure is organized into:
//! - **Mocks**: a scripted [`CommandRunner`](crate::exec::CommandRunner) and a
//!   configurable [`Probe`](crate::modules::Probe), plus helpers that build a
//!   ready-to-use [`ProbeContext`](crate::modules::ProbeContext)
//! - **Fixtures**: temporary directory and repository layouts (test-only)
//! - **Assertions**: custom assertions over module results and segments
//!
//! # Example
//!
//! ```rust,ignore
//! use sigil::testing::{probe_context_with, MockCommandRunner, StaticProbe};
//!
//! let runner = MockCommandRunner::new()
//!     .with_output("node --version", "v20.11.0\n");
//! let ctx = probe_context_with(runner, |b| b, ModuleConfig::new());
//!
//! let probe = StaticProbe::new().with_var("version", "v1.0.0");
//! ```

pub mod assertions;
#[cfg(test)]
pub mod fixtures;
pub mod mocks;

// Re-export commonly used types
pub use assertions::*;
#[cfg(test)]
pub use fixtures::*;
pub use mocks::*;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ModuleConfig;
    use crate::context::ExitStatus;
    use crate::modules::Probe;
    use std::sync::Arc;

    #[test]
    fn test_probe_context_defaults() {
        let ctx = probe_context(|b| b, ModuleConfig::new());
        assert_eq!(ctx.module, "test");
        assert!(ctx.listing.is_empty());
        assert_eq!(ctx.listing.dir(), ctx.cwd());
        assert!(ctx.context.exit_status.success());
    }

    #[test]
    fn test_probe_context_configure() {
        let ctx = probe_context(
            |b| b.with_exit_status(ExitStatus::Code(3)).with_jobs(2),
            ModuleConfig::new().with_symbol("S"),
        );
        assert_eq!(ctx.context.exit_status, ExitStatus::Code(3));
        assert_eq!(ctx.context.jobs, 2);
        assert_eq!(ctx.symbol("default"), "S");
    }

    #[tokio::test]
    async fn test_probe_context_shares_runner() {
        let runner = MockCommandRunner::new().with_output("echo hi", "hi\n");
        let ctx = probe_context_with(runner, |b| b, ModuleConfig::new());
        let other = ctx.clone();
        assert!(Arc::ptr_eq(&ctx.runner, &other.runner));

        let output = ctx.runner.run_shell("echo hi", None, ctx.cwd()).await.unwrap();
        assert_eq!(output.stdout, "hi\n");
    }

    #[tokio::test]
    async fn test_fixture_backed_listing() {
        let fixture = TestFixture::with_files(&["Cargo.toml"]);
        let listing = crate::detect::DirListing::from_dir(fixture.path()).unwrap();
        assert!(listing.has_file("Cargo.toml"));

        let ctx = probe_context(|b| b, ModuleConfig::new());
        let result = StaticProbe::new().with_var("x", "1").probe(&ctx).await.unwrap();
        assert_var(&result, "x", "1");
    }
}

use std::path::Path;

use async_trait::async_trait;

use super::{ModuleResult, Probe, ProbeContext};

/// The working directory, home-contracted and truncated to the last few
/// components.
pub struct DirectoryProbe;

#[async_trait]
impl Probe for DirectoryProbe {
    async fn probe(&self, ctx: &ProbeContext) -> anyhow::Result<ModuleResult> {
        let length = ctx.config.option_u64("truncation_length").unwrap_or(3) as usize;
        let truncation_symbol = ctx.option_str("truncation_symbol", "");
        let home_symbol = ctx.option_str("home_symbol", "~");

        let dir = if ctx.context.logical_dir.as_os_str().is_empty() {
            &ctx.context.current_dir
        } else {
            &ctx.context.logical_dir
        };
        let contracted = contract_home(dir, ctx.context.home_dir.as_deref(), home_symbol);
        let path = truncate(&contracted, length, truncation_symbol);

        let read_only = tokio::fs::metadata(&ctx.context.current_dir)
            .await
            .map(|m| m.permissions().readonly())
            .unwrap_or(false);

        Ok(ModuleResult::new()
            .with("path", path)
            .with_opt(
                "read_only",
                read_only.then(|| ctx.option_str("read_only", "🔒").to_string()),
            )
            .with_style("read_only_style", ctx.option_str("read_only_style", "red")))
    }
}

/// Replace a leading home directory with `symbol`.
fn contract_home(path: &Path, home: Option<&Path>, symbol: &str) -> String {
    let rest = home.and_then(|home| path.strip_prefix(home).ok());
    match rest {
        Some(rest) if rest.as_os_str().is_empty() => symbol.to_string(),
        Some(rest) => {
            let tail: Vec<_> = rest
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect();
            format!("{}/{}", symbol, tail.join("/"))
        }
        None => path.to_string_lossy().into_owned(),
    }
}

/// Keep the last `length` components; 0 disables truncation.
fn truncate(path: &str, length: usize, symbol: &str) -> String {
    let components: Vec<&str> = path.split('/').filter(|c| !c.is_empty()).collect();
    if length == 0 || components.len() <= length {
        return path.to_string();
    }
    format!("{}{}", symbol, components[components.len() - length..].join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ModuleConfig;
    use crate::testing::probe_context;
    use std::path::PathBuf;

    #[test]
    fn test_contract_home() {
        let home = Path::new("/home/alice");
        assert_eq!(contract_home(Path::new("/home/alice"), Some(home), "~"), "~");
        assert_eq!(
            contract_home(Path::new("/home/alice/src/sigil"), Some(home), "~"),
            "~/src/sigil"
        );
        assert_eq!(contract_home(Path::new("/etc/nginx"), Some(home), "~"), "/etc/nginx");
        assert_eq!(contract_home(Path::new("/home/alicex"), Some(home), "~"), "/home/alicex");
        assert_eq!(contract_home(Path::new("/tmp"), None, "~"), "/tmp");
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("~/a/b/c", 3, ""), "a/b/c");
        assert_eq!(truncate("~/a/b", 3, ""), "~/a/b");
        assert_eq!(truncate("/usr/local/share/man", 2, "…/"), "…/share/man");
        assert_eq!(truncate("/usr/local/share/man", 0, ""), "/usr/local/share/man");
        assert_eq!(truncate("/", 3, ""), "/");
    }

    #[tokio::test]
    async fn test_probe() {
        let home = tempfile::tempdir().unwrap();
        let work = home.path().join("projects/sigil");
        std::fs::create_dir_all(&work).unwrap();

        let ctx = probe_context(
            |b| {
                b.with_home_dir(Some(home.path().to_path_buf()))
                    .with_logical_dir(work.clone())
            },
            ModuleConfig::new(),
        );
        let result = DirectoryProbe.probe(&ctx).await.unwrap();
        assert_eq!(result.value("path"), Some("~/projects/sigil"));
        assert_eq!(result.get("read_only"), Some(None));
        assert_eq!(result.style("read_only_style"), Some("red"));
    }

    #[tokio::test]
    async fn test_probe_truncation_option() {
        let ctx = probe_context(
            |b| b.with_home_dir(None).with_logical_dir(PathBuf::from("/a/b/c/d")),
            ModuleConfig::new().with_option("truncation_length", 2),
        );
        let result = DirectoryProbe.probe(&ctx).await.unwrap();
        assert_eq!(result.value("path"), Some("c/d"));
    }
}

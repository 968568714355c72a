use std::borrow::Cow;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use log::{debug, info, trace};
use unparser::{Style, unparse};

use crate::assembler::assemble;
use crate::config::Config;
use crate::error::BundleError;
use crate::graph_builder::GraphBuilder;
use crate::manifest::BundleTarget;
use crate::resolver::{ModuleResolver, ScriptLocation};

/// The printed bundle together with what produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bundle {
    /// Output bytes. String literals keep the exact bytes of their source files.
    pub code: Vec<u8>,
    pub module_count: usize,
    /// Every file parsed for this bundle, entry first.
    pub parsed_files: Vec<PathBuf>,
}

#[derive(Debug)]
pub struct Bundler {
    config: Config,
}

impl Bundler {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Bundles `target` and returns the output in memory.
    pub fn bundle_to_string(&self, target: &BundleTarget) -> Result<Bundle> {
        let started = Instant::now();
        info!("Bundling {:?}", target.entry);

        let entry = ScriptLocation::new(&target.entry, None)?;
        let resolver = ModuleResolver::new(&self.config, &entry, &target.project_root);
        let graph = GraphBuilder::new(resolver, entry).build()?;
        info!(
            "Discovered {} modules in {:.2?}",
            graph.module_count(),
            started.elapsed()
        );

        let module_count = graph.module_count();
        let parsed_files = graph.parsed_files;
        let bundle = assemble(&graph.module_table, graph.module_trees, graph.main_tree);
        if log::log_enabled!(log::Level::Trace) {
            match serde_json::to_string(&bundle) {
                Ok(json) => trace!("Bundle tree: {}", json),
                Err(err) => trace!("Could not serialize bundle tree: {}", err),
            }
        }

        let style = if self.config.minify {
            Style::Compact
        } else {
            Style::Pretty
        };
        debug!("Printing bundle in {:?} style", style);
        let mut code = Vec::new();
        if self.config.metadata {
            code.extend_from_slice(metadata_comment(&target.entry, module_count).as_bytes());
        }
        code.extend(lua_parser::text::encode(&unparse(&bundle, style)));

        info!("Bundled {} modules in {:.2?}", module_count, started.elapsed());
        Ok(Bundle {
            code,
            module_count,
            parsed_files,
        })
    }

    /// Bundles `target` into `output_path`, creating missing parent directories.
    pub fn bundle(&self, target: &BundleTarget, output_path: &Path) -> Result<Bundle> {
        let bundle = self.bundle_to_string(target)?;
        write_output(output_path, &bundle.code)?;
        info!("Bundle written to: {:?}", output_path);
        Ok(bundle)
    }
}

impl Bundle {
    /// The output as text, with invalid UTF-8 replaced.
    pub fn source(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.code)
    }
}

/// `-- Bundled by luapack <version> from <entry> (<n> modules)`, without a timestamp so that
/// output stays reproducible.
fn metadata_comment(entry: &Path, module_count: usize) -> String {
    let entry_name = entry
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let plural = if module_count == 1 { "" } else { "s" };
    format!(
        "-- Bundled by luapack {} from {} ({} module{})\n",
        env!("CARGO_PKG_VERSION"),
        entry_name,
        module_count,
        plural
    )
}

fn write_output(output_path: &Path, code: &[u8]) -> Result<()> {
    let write_error = |source| BundleError::Write {
        path: output_path.to_path_buf(),
        source,
    };
    if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .map_err(write_error)
            .with_context(|| format!("Failed to create output directory {:?}", parent))?;
    }
    fs::write(output_path, code).map_err(write_error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_metadata_comment() {
        assert_eq!(
            metadata_comment(Path::new("/work/src/main.lua"), 3),
            format!(
                "-- Bundled by luapack {} from main.lua (3 modules)\n",
                env!("CARGO_PKG_VERSION")
            )
        );
        assert!(metadata_comment(Path::new("main.lua"), 1).ends_with("(1 module)\n"));
    }

    #[test]
    fn test_write_output_reports_the_path() -> anyhow::Result<()> {
        let temp_dir = tempfile::TempDir::new()?;
        let blocker = temp_dir.path().join("file");
        fs::write(&blocker, "")?;

        let target = blocker.join("out.lua");
        let error = write_output(&target, b"return 1\n").expect_err("parent is a file");
        let bundle_error = error
            .chain()
            .find_map(|cause| cause.downcast_ref::<BundleError>())
            .expect("a write error in the chain");
        assert!(matches!(bundle_error, BundleError::Write { path, .. } if path == &target));
        Ok(())
    }
}

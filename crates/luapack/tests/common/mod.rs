#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use luapack::{Bundle, BundleTarget, Bundler, Config};
use tempfile::TempDir;

/// A throwaway project directory.
pub struct Project {
    _temp_dir: TempDir,
    pub root: PathBuf,
}

impl Project {
    pub fn new(files: &[(&str, &str)]) -> anyhow::Result<Self> {
        let temp_dir = TempDir::new()?;
        let root = dunce::canonicalize(temp_dir.path())?;
        let project = Self {
            _temp_dir: temp_dir,
            root,
        };
        for (path, content) in files {
            project.write(path, content)?;
        }
        Ok(project)
    }

    pub fn write(&self, relative: &str, content: &str) -> anyhow::Result<()> {
        self.write_bytes(relative, content.as_bytes())
    }

    pub fn write_bytes(&self, relative: &str, content: &[u8]) -> anyhow::Result<()> {
        let path = self.root.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, content)?;
        Ok(())
    }

    pub fn path(&self, relative: &str) -> PathBuf {
        self.root.join(relative)
    }

    /// Bundles `source` (a file or directory relative to the project root).
    pub fn bundle_with(&self, source: &str, config: Config) -> anyhow::Result<Bundle> {
        let target = BundleTarget::from_source(&self.path(source))?;
        let config = target.apply_to(config);
        Bundler::new(config).bundle_to_string(&target)
    }

    pub fn bundle(&self, source: &str) -> anyhow::Result<Bundle> {
        self.bundle_with(source, pretty())
    }
}

pub fn pretty() -> Config {
    Config {
        minify: false,
        ..Config::default()
    }
}

pub fn compact() -> Config {
    Config::default()
}

pub fn file_names(paths: &[PathBuf], root: &Path) -> Vec<String> {
    paths
        .iter()
        .map(|path| {
            path.strip_prefix(root)
                .unwrap_or(path)
                .to_string_lossy()
                .replace('\\', "/")
        })
        .collect()
}

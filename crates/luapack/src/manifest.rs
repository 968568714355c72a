//! `package.json` manifests and the bundle target they describe.
//!
//! A manifest is bundleable when it carries a `luapack` object naming the entry script:
//!
//! ```json
//! {
//!     "name": "game",
//!     "version": "1.2.0",
//!     "luapack": { "main": "src/main.lua", "output": "dist/game.lua", "minify": false }
//! }
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::debug;
use serde::Deserialize;

use crate::config::Config;
use crate::error::{BundleError, BundleResult};

pub const MANIFEST_FILE_NAME: &str = "package.json";

/// The `luapack` object of a manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct BuildOptions {
    pub main: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub minify: Option<bool>,
    pub metadata: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    pub name: Option<String>,
    pub version: Option<String>,
    /// Directory containing the manifest; `main` and `output` are relative to it.
    pub directory: PathBuf,
    pub build: Option<BuildOptions>,
}

#[derive(Deserialize)]
struct ManifestFile {
    name: Option<String>,
    version: Option<String>,
    luapack: Option<BuildOptions>,
}

impl Manifest {
    /// Reads `<directory>/package.json`. A missing file is `Ok(None)`.
    pub fn read(directory: &Path) -> BundleResult<Option<Self>> {
        let path = directory.join(MANIFEST_FILE_NAME);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(BundleError::Read { path, source }),
        };
        let file: ManifestFile = serde_json::from_str(&content)
            .map_err(|err| BundleError::configuration(&path, format!("invalid manifest: {err}")))?;
        debug!("Read manifest {:?} (package {:?})", path, file.name);
        Ok(Some(Self {
            name: file.name,
            version: file.version,
            directory: directory.to_path_buf(),
            build: file.luapack,
        }))
    }

    pub fn path(&self) -> PathBuf {
        self.directory.join(MANIFEST_FILE_NAME)
    }

    /// Absolute path of the declared entry script, if the manifest declares one.
    pub fn main_path(&self) -> Option<PathBuf> {
        let main = self.build.as_ref()?.main.as_ref()?;
        Some(self.directory.join(main))
    }

    pub fn output_path(&self) -> Option<PathBuf> {
        let output = self.build.as_ref()?.output.as_ref()?;
        Some(self.directory.join(output))
    }

    /// Overrides configuration with the manifest's build options.
    pub fn apply_to(&self, mut config: Config) -> Config {
        if let Some(build) = &self.build {
            if let Some(minify) = build.minify {
                config.minify = minify;
            }
            if let Some(metadata) = build.metadata {
                config.metadata = metadata;
            }
        }
        config
    }
}

/// What a single bundling run consumes: the entry script plus the project it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleTarget {
    /// Canonical path of the entry script.
    pub entry: PathBuf,
    /// Relative dependency roots are resolved against this directory.
    pub project_root: PathBuf,
    pub manifest: Option<Manifest>,
}

impl BundleTarget {
    /// Interprets the CLI source argument: a project directory with a manifest, or a
    /// single entry script. Nothing is parsed before this succeeds.
    pub fn from_source(source: &Path) -> BundleResult<Self> {
        if !source.exists() {
            return Err(BundleError::configuration(source, "source path does not exist"));
        }

        if source.is_file() {
            let entry = canonicalize(source)?;
            let project_root = std::env::current_dir()
                .map_err(|source| BundleError::Read {
                    path: PathBuf::from("."),
                    source,
                })?;
            return Ok(Self {
                entry,
                project_root,
                manifest: None,
            });
        }

        let directory = canonicalize(source)?;
        let Some(manifest) = Manifest::read(&directory)? else {
            return Err(BundleError::configuration(
                directory.join(MANIFEST_FILE_NAME),
                "project manifest not found",
            ));
        };
        if manifest.build.is_none() {
            return Err(BundleError::configuration(
                manifest.path(),
                "manifest has no `luapack` section",
            ));
        }
        let Some(main) = manifest.main_path() else {
            return Err(BundleError::configuration(
                manifest.path(),
                "`luapack.main` is missing",
            ));
        };
        if !main.is_file() {
            return Err(BundleError::configuration(
                &main,
                "entry script declared by `luapack.main` does not exist",
            ));
        }

        Ok(Self {
            entry: canonicalize(&main)?,
            project_root: directory,
            manifest: Some(manifest),
        })
    }

    pub fn manifest_output(&self) -> Option<PathBuf> {
        self.manifest.as_ref().and_then(Manifest::output_path)
    }

    pub fn apply_to(&self, config: Config) -> Config {
        match &self.manifest {
            Some(manifest) => manifest.apply_to(config),
            None => config,
        }
    }
}

pub(crate) fn canonicalize(path: &Path) -> BundleResult<PathBuf> {
    dunce::canonicalize(path).map_err(|source| BundleError::Read {
        path: path.to_path_buf(),
        source,
    })
}

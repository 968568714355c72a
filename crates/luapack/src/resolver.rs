use std::path::{MAIN_SEPARATOR_STR, Path, PathBuf};
use std::rc::Rc;

use cow_utils::CowUtils;
use log::debug;
use rustc_hash::FxHashMap;

use crate::config::Config;
use crate::error::BundleResult;
use crate::manifest::{Manifest, canonicalize};

/// An installed dependency whose manifest declares a `luapack.main` entry script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Package {
    pub name: String,
    pub manifest: Manifest,
    pub main: PathBuf,
    pub main_dir: PathBuf,
}

impl Package {
    pub fn root(&self) -> &Path {
        &self.manifest.directory
    }
}

/// A script on disk, optionally owned by a [`Package`]. Two locations denote the same
/// module exactly when their canonical paths are equal.
#[derive(Debug, Clone)]
pub struct ScriptLocation {
    pub path: PathBuf,
    pub directory: PathBuf,
    pub package: Option<Rc<Package>>,
}

impl PartialEq for ScriptLocation {
    fn eq(&self, other: &Self) -> bool {
        self.path == other.path
    }
}

impl Eq for ScriptLocation {}

impl ScriptLocation {
    /// Canonicalizes `path`, which must exist.
    pub fn new(path: &Path, package: Option<Rc<Package>>) -> BundleResult<Self> {
        let path = canonicalize(path)?;
        let directory = path.parent().map(Path::to_path_buf).unwrap_or_default();
        Ok(Self {
            path,
            directory,
            package,
        })
    }
}

#[derive(Debug)]
pub struct ModuleResolver {
    extension: String,
    entry_dir: PathBuf,
    dependency_roots: Vec<PathBuf>,
    /// Keyed by package directory. `None` records a directory whose manifest is missing
    /// or declares no entry script.
    packages: FxHashMap<PathBuf, Option<Rc<Package>>>,
}

impl ModuleResolver {
    pub fn new(config: &Config, entry: &ScriptLocation, project_root: &Path) -> Self {
        let dependency_roots = config
            .dependency_dirs
            .iter()
            .map(|dir| project_root.join(dir))
            .collect();
        Self {
            extension: config.extension.clone(),
            entry_dir: entry.directory.clone(),
            dependency_roots,
            packages: FxHashMap::default(),
        }
    }

    /// Maps a dotted module name to a script, trying in order: the requesting script's
    /// directory, the entry script's directory, the requesting package's main directory,
    /// and finally an installed dependency package of that name.
    pub fn resolve(
        &mut self,
        from: &ScriptLocation,
        module_name: &str,
    ) -> BundleResult<Option<ScriptLocation>> {
        let relative = module_name.cow_replace(".", MAIN_SEPARATOR_STR);
        let file_name = format!("{relative}.{}", self.extension);

        let candidates = [
            (from.directory.join(&file_name), from.package.clone()),
            (self.entry_dir.join(&file_name), None),
        ];
        for (candidate, package) in candidates {
            if let Some(location) = Self::try_candidate(&candidate, package)? {
                debug!("Resolved '{}' to {:?}", module_name, location.path);
                return Ok(Some(location));
            }
        }

        if let Some(package) = &from.package {
            let candidate = package.main_dir.join(&file_name);
            if let Some(location) = Self::try_candidate(&candidate, Some(Rc::clone(package)))? {
                debug!(
                    "Resolved '{}' inside package '{}' to {:?}",
                    module_name, package.name, location.path
                );
                return Ok(Some(location));
            }
        }

        if let Some(package) = self.find_package(module_name, &relative)? {
            debug!("Resolved '{}' to package main {:?}", module_name, package.main);
            let main = package.main.clone();
            return ScriptLocation::new(&main, Some(package)).map(Some);
        }

        debug!("Module '{}' not found from {:?}", module_name, from.path);
        Ok(None)
    }

    fn try_candidate(
        candidate: &Path,
        package: Option<Rc<Package>>,
    ) -> BundleResult<Option<ScriptLocation>> {
        debug!("Trying {:?}", candidate);
        if candidate.is_file() {
            ScriptLocation::new(candidate, package).map(Some)
        } else {
            Ok(None)
        }
    }

    fn find_package(&mut self, name: &str, relative: &str) -> BundleResult<Option<Rc<Package>>> {
        for root in &self.dependency_roots {
            let directory = root.join(relative);
            if let Some(cached) = self.packages.get(&directory) {
                if cached.is_some() {
                    return Ok(cached.clone());
                }
                continue;
            }

            let package = Self::read_package(name, &directory)?;
            let found = package.clone();
            self.packages.insert(directory, package);
            if found.is_some() {
                return Ok(found);
            }
        }
        Ok(None)
    }

    fn read_package(name: &str, directory: &Path) -> BundleResult<Option<Rc<Package>>> {
        let Some(manifest) = Manifest::read(directory)? else {
            return Ok(None);
        };
        let Some(main) = manifest.main_path().filter(|main| main.is_file()) else {
            debug!(
                "Manifest {:?} declares no bundleable entry script",
                manifest.path()
            );
            return Ok(None);
        };
        let main = canonicalize(&main)?;
        let main_dir = main.parent().map(Path::to_path_buf).unwrap_or_default();
        let package = Package {
            name: name.to_owned(),
            manifest,
            main,
            main_dir,
        };
        debug!("Package '{}' at {:?}", package.name, package.root());
        Ok(Some(Rc::new(package)))
    }

    /// Number of package directories whose manifest has been looked up.
    pub fn cached_packages(&self) -> usize {
        self.packages.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;
    use std::io;
    use tempfile::TempDir;

    fn write(root: &Path, relative: &str, content: &str) -> io::Result<()> {
        let path = root.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, content)
    }

    struct Fixture {
        _temp_dir: TempDir,
        root: PathBuf,
    }

    impl Fixture {
        fn new(files: &[(&str, &str)]) -> anyhow::Result<Self> {
            let temp_dir = TempDir::new()?;
            for (path, content) in files {
                write(temp_dir.path(), path, content)?;
            }
            let root = dunce::canonicalize(temp_dir.path())?;
            Ok(Self {
                _temp_dir: temp_dir,
                root,
            })
        }

        fn location(&self, relative: &str) -> anyhow::Result<ScriptLocation> {
            Ok(ScriptLocation::new(&self.root.join(relative), None)?)
        }

        fn resolver(&self, entry: &ScriptLocation) -> ModuleResolver {
            ModuleResolver::new(&Config::default(), entry, &self.root)
        }
    }

    #[test]
    fn test_requester_directory_wins_over_entry_directory() -> anyhow::Result<()> {
        let fixture = Fixture::new(&[
            ("main.lua", ""),
            ("util/helper.lua", "return 'root'"),
            ("lib/inner.lua", ""),
            ("lib/util/helper.lua", "return 'nested'"),
        ])?;
        let entry = fixture.location("main.lua")?;
        let inner = fixture.location("lib/inner.lua")?;
        let mut resolver = fixture.resolver(&entry);

        let from_inner = resolver.resolve(&inner, "util.helper")?;
        assert_eq!(
            from_inner.map(|location| location.path),
            Some(fixture.root.join("lib/util/helper.lua"))
        );

        let from_entry = resolver.resolve(&entry, "util.helper")?;
        assert_eq!(
            from_entry.map(|location| location.path),
            Some(fixture.root.join("util/helper.lua"))
        );
        Ok(())
    }

    #[test]
    fn test_falls_back_to_entry_directory() -> anyhow::Result<()> {
        let fixture = Fixture::new(&[
            ("main.lua", ""),
            ("config.lua", ""),
            ("lib/deep/inner.lua", ""),
        ])?;
        let entry = fixture.location("main.lua")?;
        let inner = fixture.location("lib/deep/inner.lua")?;
        let mut resolver = fixture.resolver(&entry);

        let resolved = resolver.resolve(&inner, "config")?;
        assert_eq!(
            resolved.map(|location| location.path),
            Some(fixture.root.join("config.lua"))
        );
        assert_eq!(resolver.resolve(&inner, "absent")?, None);
        Ok(())
    }

    #[test]
    fn test_dependency_package_and_its_internal_modules() -> anyhow::Result<()> {
        let fixture = Fixture::new(&[
            ("main.lua", ""),
            (
                "node_modules/json/package.json",
                r#"{"name": "json", "luapack": {"main": "src/init.lua"}}"#,
            ),
            ("node_modules/json/src/init.lua", ""),
            ("node_modules/json/src/encode.lua", ""),
            ("node_modules/json/src/codec/utf8.lua", ""),
        ])?;
        let entry = fixture.location("main.lua")?;
        let mut resolver = fixture.resolver(&entry);

        let Some(package_main) = resolver.resolve(&entry, "json")? else {
            panic!("package should resolve");
        };
        let package_dir = fixture.root.join("node_modules/json");
        assert_eq!(package_main.path, package_dir.join("src/init.lua"));
        let package = package_main.package.clone().expect("tagged with its package");
        assert_eq!(package.name, "json");
        assert_eq!(package.root(), package_dir.as_path());

        // Sibling of the package main, found relative to the requester and tagged.
        let Some(encode) = resolver.resolve(&package_main, "encode")? else {
            panic!("sibling should resolve");
        };
        assert!(encode.package.is_some());

        // Nested module requested from a nested file resolves against the package main dir.
        let Some(utf8) = resolver.resolve(&encode, "codec.utf8")? else {
            panic!("nested module should resolve");
        };
        let Some(from_nested) = resolver.resolve(&utf8, "encode")? else {
            panic!("package-relative module should resolve");
        };
        assert_eq!(from_nested, encode);
        assert!(from_nested.package.is_some());
        Ok(())
    }

    #[test]
    fn test_manifest_without_section_is_unresolvable_and_cached() -> anyhow::Result<()> {
        let fixture = Fixture::new(&[
            ("main.lua", ""),
            ("node_modules/plain/package.json", r#"{"name": "plain"}"#),
            ("node_modules/plain/index.lua", ""),
        ])?;
        let entry = fixture.location("main.lua")?;
        let mut resolver = fixture.resolver(&entry);

        assert_eq!(resolver.resolve(&entry, "plain")?, None);
        assert_eq!(resolver.resolve(&entry, "plain")?, None);
        assert_eq!(resolver.cached_packages(), 1);
        Ok(())
    }

    #[test]
    fn test_configured_dependency_roots_in_order() -> anyhow::Result<()> {
        let fixture = Fixture::new(&[
            ("main.lua", ""),
            (
                "vendor/log/package.json",
                r#"{"luapack": {"main": "log.lua"}}"#,
            ),
            ("vendor/log/log.lua", ""),
            (
                "node_modules/log/package.json",
                r#"{"luapack": {"main": "log.lua"}}"#,
            ),
            ("node_modules/log/log.lua", ""),
        ])?;
        let entry = fixture.location("main.lua")?;
        let config = Config {
            dependency_dirs: vec![PathBuf::from("vendor"), PathBuf::from("node_modules")],
            ..Config::default()
        };
        let mut resolver = ModuleResolver::new(&config, &entry, &fixture.root);

        let resolved = resolver.resolve(&entry, "log")?;
        assert_eq!(
            resolved.map(|location| location.path),
            Some(fixture.root.join("vendor/log/log.lua"))
        );
        Ok(())
    }

    #[test]
    fn test_dotted_spelling_normalizes_to_one_location() -> anyhow::Result<()> {
        let fixture = Fixture::new(&[("main.lua", ""), ("a/b.lua", "")])?;
        let entry = fixture.location("main.lua")?;
        let mut resolver = fixture.resolver(&entry);

        let direct = resolver.resolve(&entry, "a.b")?;
        let spelled = ScriptLocation::new(&fixture.root.join("a/../a/./b.lua"), None)?;
        assert_eq!(direct, Some(spelled));
        Ok(())
    }
}

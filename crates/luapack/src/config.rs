use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::combine::Combine;
use crate::dirs::{CONFIG_FILE_NAME, system_config_file, user_config_file};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Config {
    /// Print the bundle with the compact back end instead of the pretty printer
    pub minify: bool,

    /// Prepend a one-line `-- Bundled by luapack ...` comment to the output
    pub metadata: bool,

    /// File extension appended to module paths during resolution
    pub extension: String,

    /// Directories searched, in order, for installed dependency packages.
    /// Relative entries are resolved against the project root.
    pub dependency_dirs: Vec<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            minify: true,
            metadata: false,
            extension: "lua".to_owned(),
            dependency_dirs: vec![PathBuf::from("node_modules")],
        }
    }
}

/// One `luapack.toml` file. Every key is optional so that files can be layered.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct ConfigFile {
    pub minify: Option<bool>,
    pub metadata: Option<bool>,
    pub extension: Option<String>,
    pub dependency_dirs: Option<Vec<PathBuf>>,
}

impl Combine for ConfigFile {
    fn combine(self, other: Self) -> Self {
        Self {
            minify: self.minify.combine(other.minify),
            metadata: self.metadata.combine(other.metadata),
            extension: self.extension.combine(other.extension),
            dependency_dirs: self.dependency_dirs.combine(other.dependency_dirs),
        }
    }
}

impl ConfigFile {
    /// Load a single config file from a path
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }

    fn load_if_exists(path: &Path, context: &str) -> Result<Option<Self>> {
        if !path.is_file() {
            return Ok(None);
        }
        log::debug!("Loading {} from: {:?}", context, path);
        Self::load(path)
            .with_context(|| format!("Failed to load {} from {:?}", context, path))
            .map(Some)
    }

    pub fn apply_to(self, mut config: Config) -> Config {
        if let Some(minify) = self.minify {
            config.minify = minify;
        }
        if let Some(metadata) = self.metadata {
            config.metadata = metadata;
        }
        if let Some(extension) = self.extension {
            config.extension = extension;
        }
        if let Some(dependency_dirs) = self.dependency_dirs {
            config.dependency_dirs = dependency_dirs;
        }
        config
    }
}

/// Configuration values from environment variables with LUAPACK_ prefix
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvConfig {
    pub minify: Option<bool>,
    pub metadata: Option<bool>,
    pub extension: Option<String>,
    pub dependency_dirs: Option<Vec<PathBuf>>,
}

impl EnvConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(value) = env::var("LUAPACK_MINIFY") {
            config.minify = parse_bool(&value);
        }

        if let Ok(value) = env::var("LUAPACK_METADATA") {
            config.metadata = parse_bool(&value);
        }

        if let Ok(value) = env::var("LUAPACK_EXTENSION") {
            let value = value.trim().trim_start_matches('.');
            if !value.is_empty() {
                config.extension = Some(value.to_owned());
            }
        }

        // Comma-separated list of dependency roots
        if let Ok(value) = env::var("LUAPACK_DEPENDENCY_DIRS") {
            let paths: Vec<PathBuf> = value
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(PathBuf::from)
                .collect();
            if !paths.is_empty() {
                config.dependency_dirs = Some(paths);
            }
        }

        config
    }

    pub fn apply_to(self, config: Config) -> Config {
        ConfigFile {
            minify: self.minify,
            metadata: self.metadata,
            extension: self.extension,
            dependency_dirs: self.dependency_dirs,
        }
        .apply_to(config)
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    use cow_utils::CowUtils;
    match value.trim().cow_to_lowercase().as_ref() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

impl Config {
    /// Load configuration with hierarchical precedence, lowest first:
    /// defaults, system config, user config, `luapack.toml` in the current directory,
    /// `LUAPACK_*` environment variables, and finally the file passed with `--config`.
    pub fn load(cli_config_path: Option<&Path>) -> Result<Self> {
        let mut layered = ConfigFile::default();

        if let Some(path) = system_config_file() {
            if let Some(file) = ConfigFile::load_if_exists(&path, "system config")? {
                layered = file.combine(layered);
            }
        }

        if let Some(path) = user_config_file() {
            if let Some(file) = ConfigFile::load_if_exists(&path, "user config")? {
                layered = file.combine(layered);
            }
        }

        if let Some(file) = ConfigFile::load_if_exists(Path::new(CONFIG_FILE_NAME), "project config")? {
            layered = file.combine(layered);
        }

        let mut config = layered.apply_to(Self::default());
        config = EnvConfig::from_env().apply_to(config);

        if let Some(path) = cli_config_path {
            // An explicit path must exist.
            let file = ConfigFile::load(path)
                .with_context(|| format!("Failed to load CLI config from {:?}", path))?;
            config = file.apply_to(config);
        }

        log::debug!("Effective configuration: {:?}", config);
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    struct EnvGuard {
        vars: Vec<&'static str>,
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            for var in &self.vars {
                unsafe {
                    env::remove_var(var);
                }
            }
        }
    }

    struct DirGuard(PathBuf);

    impl Drop for DirGuard {
        fn drop(&mut self) {
            let _ = env::set_current_dir(&self.0);
        }
    }

    #[test]
    fn test_parse_bool() {
        assert_eq!(parse_bool("true"), Some(true));
        assert_eq!(parse_bool("TRUE"), Some(true));
        assert_eq!(parse_bool(" yes "), Some(true));
        assert_eq!(parse_bool("on"), Some(true));
        assert_eq!(parse_bool("0"), Some(false));
        assert_eq!(parse_bool("Off"), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }

    #[test]
    fn test_config_file_combine() {
        let project = ConfigFile {
            minify: Some(false),
            dependency_dirs: Some(vec![PathBuf::from("lua_modules")]),
            ..ConfigFile::default()
        };
        let user = ConfigFile {
            minify: Some(true),
            metadata: Some(true),
            dependency_dirs: Some(vec![PathBuf::from("node_modules")]),
            ..ConfigFile::default()
        };

        let config = project.combine(user).apply_to(Config::default());

        assert!(!config.minify);
        assert!(config.metadata);
        assert_eq!(config.extension, "lua");
        assert_eq!(
            config.dependency_dirs,
            vec![PathBuf::from("lua_modules"), PathBuf::from("node_modules")]
        );
    }

    #[test]
    fn test_load_from_file() -> anyhow::Result<()> {
        let temp_dir = TempDir::new()?;
        let config_path = temp_dir.path().join(CONFIG_FILE_NAME);
        fs::write(
            &config_path,
            r#"
minify = false
extension = "luau"
dependency-dirs = ["vendor", "node_modules"]
"#,
        )?;

        let file = ConfigFile::load(&config_path)?;

        assert_eq!(
            file,
            ConfigFile {
                minify: Some(false),
                metadata: None,
                extension: Some("luau".to_owned()),
                dependency_dirs: Some(vec![PathBuf::from("vendor"), PathBuf::from("node_modules")]),
            }
        );
        Ok(())
    }

    #[test]
    fn test_unknown_keys_are_rejected() -> anyhow::Result<()> {
        let temp_dir = TempDir::new()?;
        let config_path = temp_dir.path().join(CONFIG_FILE_NAME);
        fs::write(&config_path, "minfy = true\n")?;

        assert!(ConfigFile::load(&config_path).is_err());
        Ok(())
    }

    #[test]
    #[serial_test::serial]
    fn test_env_config_parsing() {
        let _guard = EnvGuard {
            vars: vec![
                "LUAPACK_MINIFY",
                "LUAPACK_METADATA",
                "LUAPACK_EXTENSION",
                "LUAPACK_DEPENDENCY_DIRS",
            ],
        };

        unsafe {
            env::set_var("LUAPACK_MINIFY", "off");
            env::set_var("LUAPACK_METADATA", "not-a-bool");
            env::set_var("LUAPACK_EXTENSION", ".luau");
            env::set_var("LUAPACK_DEPENDENCY_DIRS", "vendor, ,lua_modules");
        }

        let env_config = EnvConfig::from_env();

        assert_eq!(
            env_config,
            EnvConfig {
                minify: Some(false),
                metadata: None,
                extension: Some("luau".to_owned()),
                dependency_dirs: Some(vec![PathBuf::from("vendor"), PathBuf::from("lua_modules")]),
            }
        );
    }

    #[test]
    #[serial_test::serial]
    fn test_hierarchical_config_loading() -> anyhow::Result<()> {
        let temp_dir = TempDir::new()?;
        fs::write(
            temp_dir.path().join(CONFIG_FILE_NAME),
            "minify = false\nmetadata = true\nextension = \"luau\"\n",
        )?;
        let cli_config = temp_dir.path().join("cli.toml");
        fs::write(&cli_config, "extension = \"lua\"\n")?;

        let _dir_guard = DirGuard(env::current_dir()?);
        env::set_current_dir(&temp_dir)?;

        let _env_guard = EnvGuard {
            vars: vec!["LUAPACK_METADATA"],
        };
        unsafe {
            env::set_var("LUAPACK_METADATA", "false");
        }

        let config = Config::load(Some(&cli_config))?;

        // Project file
        assert!(!config.minify);
        // Environment overrides the project file
        assert!(!config.metadata);
        // The CLI file overrides everything
        assert_eq!(config.extension, "lua");
        assert_eq!(config.dependency_dirs, vec![PathBuf::from("node_modules")]);
        Ok(())
    }

    #[test]
    #[serial_test::serial]
    fn test_missing_cli_config_is_an_error() -> anyhow::Result<()> {
        let temp_dir = TempDir::new()?;
        assert!(Config::load(Some(&temp_dir.path().join("absent.toml"))).is_err());
        Ok(())
    }
}

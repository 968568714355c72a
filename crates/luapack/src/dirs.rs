//! Where the user and system `luapack.toml` files live.

use std::env;
use std::path::{Path, PathBuf};

use etcetera::BaseStrategy;
use log::warn;

const APP_DIR: &str = "luapack";
pub const CONFIG_FILE_NAME: &str = "luapack.toml";

/// The per-user config file: `$XDG_CONFIG_HOME/luapack/luapack.toml` (or `~/.config/...`) on
/// Linux and macOS, `%APPDATA%\luapack\luapack.toml` on Windows.
pub fn user_config_file() -> Option<PathBuf> {
    let strategy = etcetera::choose_base_strategy().ok()?;
    Some(strategy.config_dir().join(APP_DIR).join(CONFIG_FILE_NAME))
}

/// System-wide config files in lookup order.
///
/// Unix-like systems search each entry of `XDG_CONFIG_DIRS` (`/etc/xdg` when unset or empty)
/// and then `/etc/luapack`. Windows uses `%SYSTEMDRIVE%\ProgramData\luapack`.
#[allow(unused_variables)]
fn system_config_candidates(xdg_config_dirs: Option<&str>, system_drive: Option<&str>) -> Vec<PathBuf> {
    #[cfg(windows)]
    {
        system_drive
            .map(|drive| {
                Path::new(drive)
                    .join("ProgramData")
                    .join(APP_DIR)
                    .join(CONFIG_FILE_NAME)
            })
            .into_iter()
            .collect()
    }

    #[cfg(not(windows))]
    {
        let dirs = xdg_config_dirs
            .filter(|value| !value.is_empty())
            .unwrap_or("/etc/xdg");
        dirs.split(':')
            .filter(|dir| !dir.is_empty())
            .map(|dir| Path::new(dir).join(APP_DIR).join(CONFIG_FILE_NAME))
            .chain(std::iter::once(
                Path::new("/etc").join(APP_DIR).join(CONFIG_FILE_NAME),
            ))
            .collect()
    }
}

fn first_existing(candidates: Vec<PathBuf>) -> Option<PathBuf> {
    candidates
        .into_iter()
        .find(|candidate| match candidate.try_exists() {
            Ok(exists) => exists && candidate.is_file(),
            Err(err) => {
                warn!("Failed to query configuration file {}: {err}", candidate.display());
                false
            }
        })
}

/// The first system config file that exists, if any.
pub fn system_config_file() -> Option<PathBuf> {
    first_existing(system_config_candidates(
        env::var("XDG_CONFIG_DIRS").ok().as_deref(),
        env::var("SYSTEMDRIVE").ok().as_deref(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    #[cfg(not(windows))]
    fn test_xdg_candidates() {
        let default = system_config_candidates(None, None);
        assert_eq!(
            default,
            vec![
                PathBuf::from("/etc/xdg/luapack/luapack.toml"),
                PathBuf::from("/etc/luapack/luapack.toml"),
            ]
        );
        assert_eq!(system_config_candidates(Some(""), None), default);
        assert_eq!(
            system_config_candidates(Some("/opt/a::/opt/b"), None),
            vec![
                PathBuf::from("/opt/a/luapack/luapack.toml"),
                PathBuf::from("/opt/b/luapack/luapack.toml"),
                PathBuf::from("/etc/luapack/luapack.toml"),
            ]
        );
    }

    #[test]
    #[cfg(windows)]
    fn test_windows_candidates() {
        assert_eq!(
            system_config_candidates(None, Some("C:\\")),
            vec![PathBuf::from("C:\\ProgramData\\luapack\\luapack.toml")]
        );
        assert!(system_config_candidates(None, None).is_empty());
    }

    #[test]
    fn test_first_existing_skips_missing_and_directories() -> anyhow::Result<()> {
        let context = TempDir::new()?;
        let missing = context.path().join("missing.toml");
        let directory = context.path().join("dir.toml");
        fs::create_dir_all(&directory)?;
        let present = context.path().join("present.toml");
        fs::write(&present, "minify = false\n")?;

        assert_eq!(
            first_existing(vec![missing.clone(), directory, present.clone()]),
            Some(present)
        );
        assert_eq!(first_existing(vec![missing]), None);
        Ok(())
    }

    #[test]
    fn test_user_config_file_name() {
        if let Some(path) = user_config_file() {
            assert!(path.ends_with(Path::new("luapack").join(CONFIG_FILE_NAME)));
        }
    }
}

use std::io;
use std::path::PathBuf;

use lua_parser::ParseError;
use thiserror::Error;

/// Fatal conditions of a bundling run. Every variant names the file it concerns.
#[derive(Debug, Error)]
pub enum BundleError {
    #[error("{message} ({})", path.display())]
    Configuration { path: PathBuf, message: String },

    #[error("cannot resolve module '{module}' required from {}", from.display())]
    Resolution { module: String, from: PathBuf },

    #[error("{}:{line}: require expects a single string literal argument", file.display())]
    UnsupportedRequire { file: PathBuf, line: usize },

    #[error("{}:{line}: module '{module}' resolves to the entry script, which cannot be required", file.display())]
    EntryRequired {
        file: PathBuf,
        line: usize,
        module: String,
    },

    #[error("{}: identifier '{name}' uses the reserved `__luapack_` prefix", file.display())]
    ReservedIdentifier { file: PathBuf, name: String },

    #[error("failed to parse {}: {source}", file.display())]
    Parse {
        file: PathBuf,
        #[source]
        source: ParseError,
    },

    #[error("failed to read {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write {}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl BundleError {
    pub fn configuration(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Configuration {
            path: path.into(),
            message: message.into(),
        }
    }
}

pub type BundleResult<T> = Result<T, BundleError>;

#[cfg(test)]
mod tests {
    use super::*;
    use lua_parser::ParseErrorKind;

    #[test]
    fn test_messages_locate_the_fault() {
        let unsupported = BundleError::UnsupportedRequire {
            file: PathBuf::from("src/main.lua"),
            line: 12,
        };
        assert_eq!(
            unsupported.to_string(),
            "src/main.lua:12: require expects a single string literal argument"
        );

        let resolution = BundleError::Resolution {
            module: "util.missing".to_owned(),
            from: PathBuf::from("src/main.lua"),
        };
        assert_eq!(
            resolution.to_string(),
            "cannot resolve module 'util.missing' required from src/main.lua"
        );

        let parse = BundleError::Parse {
            file: PathBuf::from("broken.lua"),
            source: ParseError::new(ParseErrorKind::InvalidEscape("\\q".to_owned()), 3),
        };
        assert_eq!(
            parse.to_string(),
            "failed to parse broken.lua: [3] invalid escape sequence '\\q'"
        );
    }
}

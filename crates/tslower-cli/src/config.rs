//! `tslower.json` loading.
//!
//! The file has the shape of [`TransformOptions`]; every field is optional:
//!
//! ```json
//! { "parser": { "typescript": true, "allowDecorators": false }, "codegen": { "minify": true } }
//! ```

use std::path::Path;

use tracing::debug;
use tslower_parser::TransformOptions;

use crate::error::CliError;

pub const CONFIG_FILE_NAME: &str = "tslower.json";

/// Load options from `explicit`, or from `tslower.json` in `cwd` when it
/// exists. An explicit path that does not exist is an error; a missing
/// default file just means defaults.
pub fn load(explicit: Option<&Path>, cwd: &Path) -> Result<TransformOptions, CliError> {
    let path = match explicit {
        Some(path) => {
            if !path.is_file() {
                return Err(CliError::ConfigNotFound {
                    path: path.to_path_buf(),
                });
            }
            path.to_path_buf()
        }
        None => {
            let path = cwd.join(CONFIG_FILE_NAME);
            if !path.is_file() {
                debug!(cwd = %cwd.display(), "no config file, using defaults");
                return Ok(TransformOptions::default());
            }
            path
        }
    };
    read(&path)
}

fn read(path: &Path) -> Result<TransformOptions, CliError> {
    let text = std::fs::read_to_string(path).map_err(|source| CliError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let options: TransformOptions = serde_json::from_str(&text).map_err(|source| CliError::ConfigParse {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = %path.display(), ?options, "loaded config");
    Ok(options)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_default_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let options = load(None, dir.path()).unwrap();
        assert_eq!(options, TransformOptions::default());
    }

    #[test]
    fn test_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            r#"{"parser": {"allowDecorators": false}, "codegen": {"minify": true}}"#,
        )
        .unwrap();
        let options = load(None, dir.path()).unwrap();
        assert!(options.parser.typescript);
        assert!(!options.parser.allow_decorators);
        assert!(options.codegen.minify);
        assert_eq!(options.codegen.indent, "  ");
    }

    #[test]
    fn test_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.json");
        assert!(matches!(load(Some(&path), dir.path()), Err(CliError::ConfigNotFound { .. })));

        std::fs::write(&path, "{\"parser\": {\"typescript\": false}}").unwrap();
        assert!(!load(Some(&path), dir.path()).unwrap().parser.typescript);

        std::fs::write(&path, "{\"parser\": 1}").unwrap();
        assert!(matches!(load(Some(&path), dir.path()), Err(CliError::ConfigParse { .. })));
    }
}

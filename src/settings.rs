//! User settings for dcsim, read from `settings.toml` in the user's config directory.
//!
//! Settings only change defaults: anything given on the command line wins.
use crate::get_dcsim_config_dir;
use crate::input::read_toml;
use crate::log::DEFAULT_LOG_LEVEL;
use anyhow::{Context, Result};
use documented::DocumentedFields;
use serde::{Deserialize, Serialize};
use std::fmt::Write;
use std::path::{Path, PathBuf};

const SETTINGS_FILE_NAME: &str = "settings.toml";

/// Heading of a freshly written settings file. Setting lines start with `# ` and lines of
/// documentation with `## `.
const SETTINGS_FILE_HEADING: &str = "## dcsim settings
##
## Each setting is listed with its default value. Delete the leading \"# \" of a setting to
## change it.
";

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

/// Where dcsim looks for `settings.toml`
pub fn get_settings_file_path() -> PathBuf {
    get_dcsim_config_dir().join(SETTINGS_FILE_NAME)
}

/// User settings
#[derive(Debug, DocumentedFields, Serialize, Deserialize, PartialEq)]
pub struct Settings {
    /// Log level used unless DCSIM_LOG_LEVEL is set (off, error, warn, info, debug or trace)
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Replace the files of an existing output folder without asking for --overwrite
    #[serde(default)]
    pub overwrite: bool,
    /// Also write the capacity of every carrier of every sector each year
    #[serde(default)]
    pub debug_model: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            overwrite: false,
            debug_model: false,
        }
    }
}

impl Settings {
    /// Load the user's settings.
    ///
    /// A missing settings file is not an error: every setting then takes its default.
    pub fn load() -> Result<Settings> {
        Self::load_from_path(&get_settings_file_path())
    }

    fn load_from_path(file_path: &Path) -> Result<Settings> {
        if !file_path.is_file() {
            return Ok(Settings::default());
        }

        read_toml(file_path)
    }

    /// A settings file listing every setting, commented out, with its default value
    pub fn default_file_contents() -> Result<String> {
        let defaults = toml::to_string(&Settings::default())
            .context("Could not write default settings as TOML")?;

        let mut out = SETTINGS_FILE_HEADING.to_string();
        for line in defaults.lines() {
            let Some((field, _)) = line.split_once('=') else {
                continue;
            };
            let field = field.trim();
            let docs = Settings::get_field_docs(field)
                .ok()
                .with_context(|| format!("Setting {field} is undocumented"))?;

            out.push('\n');
            for doc_line in docs.lines() {
                writeln!(out, "## {}", doc_line.trim())?;
            }
            writeln!(out, "# {}", line.trim())?;
        }

        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_settings_load_from_path_no_file() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join(SETTINGS_FILE_NAME); // NB: doesn't exist
        assert_eq!(
            Settings::load_from_path(&file_path).unwrap(),
            Settings::default()
        );
    }

    #[test]
    fn test_settings_load_from_path() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join(SETTINGS_FILE_NAME);

        {
            let mut file = File::create(&file_path).unwrap();
            writeln!(file, "log_level = \"warn\"").unwrap();
        }

        assert_eq!(
            Settings::load_from_path(&file_path).unwrap(),
            Settings {
                log_level: "warn".to_string(),
                debug_model: false,
                overwrite: false
            }
        );
    }

    #[test]
    fn test_default_file_contents() {
        let contents = Settings::default_file_contents().unwrap();
        assert!(contents.starts_with("## dcsim settings\n"));
        assert!(contents.contains("## Log level used unless DCSIM_LOG_LEVEL is set"));
        assert!(contents.contains("\n# log_level = \"info\"\n"));

        // As written the file sets nothing
        assert_eq!(
            toml::from_str::<Settings>(&contents).unwrap(),
            Settings::default()
        );

        // Uncommenting every setting gives back the defaults
        let uncommented = contents
            .lines()
            .filter_map(|line| line.strip_prefix("# "))
            .collect::<Vec<_>>()
            .join("\n");
        assert_eq!(
            toml::from_str::<Settings>(&uncommented).unwrap(),
            Settings::default()
        );
    }
}

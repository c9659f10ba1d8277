//! The `settings` subcommands, which find, show and edit the user's `settings.toml`.
use crate::error::FailureKind;
use crate::settings::{Settings, get_settings_file_path};
use anyhow::{Context, Result};
use clap::Subcommand;
use std::fs;
use std::path::Path;

/// Subcommands of `dcsim settings`
#[derive(Subcommand)]
pub enum SettingsSubcommands {
    /// Open settings.toml in a text editor, creating it first if needed
    Edit,
    /// Print the location of settings.toml
    Path,
    /// Print a settings.toml listing every setting with its default
    DumpDefault,
}

impl SettingsSubcommands {
    /// Run the subcommand
    pub fn execute(self) -> Result<()> {
        match self {
            Self::Edit => handle_edit_command()?,
            Self::Path => handle_path_command(),
            Self::DumpDefault => handle_dump_default_command()?,
        }

        Ok(())
    }
}

/// Write the default settings file to `file_path` unless a file is already there
fn ensure_settings_file_exists(file_path: &Path) -> Result<()> {
    if file_path.is_file() {
        return Ok(());
    }

    if let Some(dir_path) = file_path.parent() {
        fs::create_dir_all(dir_path)
            .context(FailureKind::Io)
            .with_context(|| format!("Failed to create directory: {}", dir_path.display()))?;
    }

    fs::write(file_path, Settings::default_file_contents()?)
        .context(FailureKind::Io)
        .with_context(|| format!("Failed to write {}", file_path.display()))?;

    Ok(())
}

fn handle_edit_command() -> Result<()> {
    let file_path = get_settings_file_path();
    ensure_settings_file_exists(&file_path)?;

    println!("Editing {}", file_path.display());
    edit::edit_file(&file_path)
        .context(FailureKind::Io)
        .with_context(|| format!("Could not open an editor for {}", file_path.display()))?;

    Ok(())
}

fn handle_path_command() {
    println!("{}", get_settings_file_path().display());
}

fn handle_dump_default_command() -> Result<()> {
    print!("{}", Settings::default_file_contents()?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_ensure_settings_file_exists() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("dcsim").join("settings.toml");
        ensure_settings_file_exists(&file_path).unwrap();
        let contents = fs::read_to_string(&file_path).unwrap();
        assert_eq!(contents, Settings::default_file_contents().unwrap());

        // An existing file is left alone
        fs::write(&file_path, "log_level = \"warn\"\n").unwrap();
        ensure_settings_file_exists(&file_path).unwrap();
        assert_eq!(
            fs::read_to_string(&file_path).unwrap(),
            "log_level = \"warn\"\n"
        );
    }
}

//! Init command - write a default configuration file.

use std::path::{Path, PathBuf};

use texmerge::config::{config_file_path, ConfigFile};

use crate::error::CliError;

/// Run the init command.
pub fn run(path: Option<PathBuf>, force: bool) -> Result<(), CliError> {
    let path = path.unwrap_or_else(config_file_path);
    write_default_config(&path, force)?;

    println!("Configuration file: {}", path.display());
    println!();
    println!("Set base_dir and output_dir, and optionally a mod order manifest.");
    println!("CLI arguments override config file values when specified.");
    Ok(())
}

fn write_default_config(path: &Path, force: bool) -> Result<(), CliError> {
    if path.exists() && !force {
        return Err(CliError::Config(format!(
            "{} already exists. Use --force to overwrite it",
            path.display()
        )));
    }

    ConfigFile::default().save_to(path)?;
    Ok(())
}

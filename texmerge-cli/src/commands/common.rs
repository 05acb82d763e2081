//! Common types and utilities shared across CLI commands.

use std::path::PathBuf;

use clap::{Args, ValueEnum};
use texmerge::config::{config_file_path, ConfigFile, ManifestKind, MergeConfig, ThreadCount};

use crate::error::CliError;

/// Manifest format selection for CLI arguments.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum ManifestFormatArg {
    /// JSON array of {index, name, active, path} rows
    Json,
    /// Mod manager modlist.txt (highest priority first)
    Modlist,
}

impl From<ManifestFormatArg> for ManifestKind {
    fn from(format: ManifestFormatArg) -> Self {
        match format {
            ManifestFormatArg::Json => ManifestKind::Json,
            ManifestFormatArg::Modlist => ManifestKind::ModList,
        }
    }
}

/// Merge inputs shared by `merge` and `plan`. Each overrides config.ini.
#[derive(Debug, Clone, Default, Args)]
pub struct SourceArgs {
    /// Configuration file (default: <config dir>/texmerge/config.ini)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Base game data directory (tier 0)
    #[arg(long, value_name = "DIR")]
    pub base: Option<PathBuf>,

    /// Mod order manifest
    #[arg(long, value_name = "FILE")]
    pub manifest: Option<PathBuf>,

    /// Manifest format
    #[arg(long, value_enum)]
    pub manifest_format: Option<ManifestFormatArg>,

    /// Mod folders for modlist manifests
    #[arg(long, value_name = "DIR")]
    pub mods_dir: Option<PathBuf>,

    /// Output directory
    #[arg(long, value_name = "DIR")]
    pub output: Option<PathBuf>,

    /// Copy worker threads (default: CPU cores)
    #[arg(long)]
    pub threads: Option<usize>,

    /// Asset subdirectory name
    #[arg(long, value_name = "NAME")]
    pub asset_dir: Option<String>,
}

/// Load the config file and apply CLI overrides.
///
/// An explicit `--config` must exist; the default location is optional.
pub fn load_config(args: &SourceArgs) -> Result<ConfigFile, CliError> {
    let mut config = match &args.config {
        Some(path) => ConfigFile::load_from(path)?,
        None => {
            let path = config_file_path();
            if path.exists() {
                ConfigFile::load_from(&path)?
            } else {
                ConfigFile::default()
            }
        }
    };

    // CLI takes precedence, then config
    if let Some(base) = &args.base {
        config.paths.base_dir = Some(base.clone());
    }
    if let Some(output) = &args.output {
        config.paths.output_dir = Some(output.clone());
    }
    if let Some(manifest) = &args.manifest {
        config.manifest.path = Some(manifest.clone());
    }
    if let Some(format) = args.manifest_format {
        config.manifest.kind = format.into();
    }
    if let Some(mods_dir) = &args.mods_dir {
        config.manifest.mods_dir = Some(mods_dir.clone());
    }
    if let Some(threads) = args.threads {
        config.merge.threads = ThreadCount::Fixed(threads);
    }
    if let Some(asset_dir) = &args.asset_dir {
        config.merge.asset_dir = asset_dir.clone();
    }

    Ok(config)
}

/// Build the merge configuration from config file and CLI overrides.
pub fn resolve_merge_config(args: &SourceArgs) -> Result<(ConfigFile, MergeConfig), CliError> {
    let file = load_config(args)?;
    let config = file.to_merge_config().map_err(|e| {
        CliError::Config(format!(
            "{}. Set it in config.ini or pass it on the command line (see --help)",
            e
        ))
    })?;
    Ok((file, config))
}

//! INI configuration file.
//!
//! ```ini
//! [paths]
//! base_dir = /games/Skyrim/Data
//! output_dir = /mo2/mods/Merged Textures
//! log_file = /tmp/texmerge.log
//!
//! [manifest]
//! path = /mo2/profiles/Default/modlist.txt
//! format = modlist
//! mods_dir = /mo2/mods
//!
//! [merge]
//! threads = auto
//! asset_dir = textures
//! extensions = dds,png,tga,bmp
//! fold_case = true
//! clean_output = false
//! prune_empty_dirs = true
//!
//! [progress]
//! interval_ms = 250
//! ```
//!
//! Empty values are treated as unset.

use std::path::{Path, PathBuf};
use std::time::Duration;

use ini::Ini;

use super::merge::{MergeConfig, ThreadCount};
use super::{ConfigError, ConfigResult};
use crate::manifest::ManifestFormat;
use crate::merge::enumerator::DEFAULT_EXTENSIONS;
use crate::merge::progress::DEFAULT_POLL_INTERVAL;
use crate::merge::resolver::DEFAULT_ASSET_DIR;

/// Manifest encoding selected in the config file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ManifestKind {
    #[default]
    Json,
    ModList,
}

impl ManifestKind {
    /// Parse a config value (`json` or `modlist`).
    pub fn from_config_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "json" => Some(ManifestKind::Json),
            "modlist" | "mo2" => Some(ManifestKind::ModList),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ManifestKind::Json => "json",
            ManifestKind::ModList => "modlist",
        }
    }
}

/// `[paths]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathsSettings {
    pub base_dir: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub log_file: Option<PathBuf>,
}

/// `[manifest]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManifestSettings {
    pub path: Option<PathBuf>,
    pub kind: ManifestKind,
    /// Mod folders for `modlist` manifests. Derived from the manifest
    /// location (`<root>/profiles/<profile>/modlist.txt` → `<root>/mods`)
    /// when unset.
    pub mods_dir: Option<PathBuf>,
}

/// `[merge]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeSettings {
    pub threads: ThreadCount,
    pub asset_dir: String,
    pub extensions: Vec<String>,
    pub fold_case: bool,
    pub clean_output: bool,
    pub prune_empty_dirs: bool,
}

impl Default for MergeSettings {
    fn default() -> Self {
        Self {
            threads: ThreadCount::Auto,
            asset_dir: DEFAULT_ASSET_DIR.to_string(),
            extensions: DEFAULT_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
            fold_case: true,
            clean_output: false,
            prune_empty_dirs: true,
        }
    }
}

/// `[progress]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressSettings {
    pub interval_ms: u64,
}

impl Default for ProgressSettings {
    fn default() -> Self {
        Self {
            interval_ms: DEFAULT_POLL_INTERVAL.as_millis() as u64,
        }
    }
}

/// Contents of the configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigFile {
    pub paths: PathsSettings,
    pub manifest: ManifestSettings,
    pub merge: MergeSettings,
    pub progress: ProgressSettings,
}

/// Default location of the configuration file.
pub fn config_file_path() -> PathBuf {
    dirs::config_dir()
        .map(|dir| dir.join("texmerge").join("config.ini"))
        .unwrap_or_else(|| PathBuf::from("texmerge.ini"))
}

impl ConfigFile {
    /// Load and parse a configuration file.
    pub fn load_from(path: &Path) -> ConfigResult<Self> {
        let ini = Ini::load_from_file(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Self::from_ini(&ini)
    }

    /// Parse configuration from an INI document.
    pub fn from_ini(ini: &Ini) -> ConfigResult<Self> {
        let mut config = ConfigFile::default();

        config.paths.base_dir = get(ini, "paths", "base_dir").map(PathBuf::from);
        config.paths.output_dir = get(ini, "paths", "output_dir").map(PathBuf::from);
        config.paths.log_file = get(ini, "paths", "log_file").map(PathBuf::from);

        config.manifest.path = get(ini, "manifest", "path").map(PathBuf::from);
        config.manifest.mods_dir = get(ini, "manifest", "mods_dir").map(PathBuf::from);
        if let Some(value) = get(ini, "manifest", "format") {
            config.manifest.kind = ManifestKind::from_config_str(value)
                .ok_or_else(|| invalid("manifest", "format", value, "expected json or modlist"))?;
        }

        if let Some(value) = get(ini, "merge", "threads") {
            config.merge.threads = parse_threads(value)?;
        }
        if let Some(value) = get(ini, "merge", "asset_dir") {
            config.merge.asset_dir = value.to_string();
        }
        if let Some(value) = get(ini, "merge", "extensions") {
            config.merge.extensions = value
                .split(',')
                .map(|ext| ext.trim().to_string())
                .filter(|ext| !ext.is_empty())
                .collect();
        }
        if let Some(value) = get(ini, "merge", "fold_case") {
            config.merge.fold_case = parse_bool("merge", "fold_case", value)?;
        }
        if let Some(value) = get(ini, "merge", "clean_output") {
            config.merge.clean_output = parse_bool("merge", "clean_output", value)?;
        }
        if let Some(value) = get(ini, "merge", "prune_empty_dirs") {
            config.merge.prune_empty_dirs = parse_bool("merge", "prune_empty_dirs", value)?;
        }

        if let Some(value) = get(ini, "progress", "interval_ms") {
            config.progress.interval_ms = value
                .parse::<u64>()
                .ok()
                .filter(|ms| *ms > 0)
                .ok_or_else(|| {
                    invalid("progress", "interval_ms", value, "expected a positive integer")
                })?;
        }

        Ok(config)
    }

    /// Render the configuration as an INI document.
    pub fn to_ini(&self) -> Ini {
        let mut ini = Ini::new();

        ini.with_section(Some("paths"))
            .set("base_dir", path_value(&self.paths.base_dir))
            .set("output_dir", path_value(&self.paths.output_dir))
            .set("log_file", path_value(&self.paths.log_file));

        ini.with_section(Some("manifest"))
            .set("path", path_value(&self.manifest.path))
            .set("format", self.manifest.kind.as_str())
            .set("mods_dir", path_value(&self.manifest.mods_dir));

        let threads = match self.merge.threads {
            ThreadCount::Auto => "auto".to_string(),
            ThreadCount::Fixed(n) => n.to_string(),
        };
        ini.with_section(Some("merge"))
            .set("threads", threads)
            .set("asset_dir", self.merge.asset_dir.as_str())
            .set("extensions", self.merge.extensions.join(","))
            .set("fold_case", self.merge.fold_case.to_string())
            .set("clean_output", self.merge.clean_output.to_string())
            .set("prune_empty_dirs", self.merge.prune_empty_dirs.to_string());

        ini.with_section(Some("progress"))
            .set("interval_ms", self.progress.interval_ms.to_string());

        ini
    }

    /// Write the configuration to `path`, creating parent directories.
    pub fn save_to(&self, path: &Path) -> ConfigResult<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| ConfigError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        self.to_ini()
            .write_to_file(path)
            .map_err(|source| ConfigError::Write {
                path: path.to_path_buf(),
                source,
            })
    }

    /// Build the runtime merge configuration.
    ///
    /// `base_dir` and `output_dir` are required. A configured manifest path
    /// enables priority mode.
    pub fn to_merge_config(&self) -> ConfigResult<MergeConfig> {
        let base_dir = self
            .paths
            .base_dir
            .clone()
            .ok_or(ConfigError::Missing {
                section: "paths",
                key: "base_dir",
            })?;
        let output_dir = self
            .paths
            .output_dir
            .clone()
            .ok_or(ConfigError::Missing {
                section: "paths",
                key: "output_dir",
            })?;

        let mut config = MergeConfig::new(base_dir, output_dir)
            .with_threads(self.merge.threads.resolve())
            .with_asset_dir(self.merge.asset_dir.clone())
            .with_extensions(self.merge.extensions.clone())
            .with_fold_case(self.merge.fold_case)
            .with_clean_output(self.merge.clean_output)
            .with_prune_empty_dirs(self.merge.prune_empty_dirs)
            .with_progress_interval(Duration::from_millis(self.progress.interval_ms));

        if let Some(path) = &self.manifest.path {
            let format = match self.manifest.kind {
                ManifestKind::Json => ManifestFormat::Json,
                ManifestKind::ModList => ManifestFormat::ModList {
                    mods_dir: self
                        .manifest
                        .mods_dir
                        .clone()
                        .or_else(|| derive_mods_dir(path))
                        .ok_or(ConfigError::Missing {
                            section: "manifest",
                            key: "mods_dir",
                        })?,
                },
            };
            config = config.with_manifest(path.clone(), format);
        }

        Ok(config)
    }
}

/// `<root>/profiles/<profile>/modlist.txt` → `<root>/mods`.
pub fn derive_mods_dir(manifest_path: &Path) -> Option<PathBuf> {
    let profile_dir = manifest_path.parent()?;
    let profiles_dir = profile_dir.parent()?;
    if !profiles_dir
        .file_name()?
        .to_string_lossy()
        .eq_ignore_ascii_case("profiles")
    {
        return None;
    }
    Some(profiles_dir.parent()?.join("mods"))
}

/// Parse a thread count value (`auto` or an integer).
pub fn parse_threads(value: &str) -> ConfigResult<ThreadCount> {
    let value = value.trim();
    if value.eq_ignore_ascii_case("auto") {
        return Ok(ThreadCount::Auto);
    }
    value
        .parse::<usize>()
        .map(ThreadCount::Fixed)
        .map_err(|_| invalid("merge", "threads", value, "expected 'auto' or an integer"))
}

fn get<'a>(ini: &'a Ini, section: &str, key: &str) -> Option<&'a str> {
    ini.section(Some(section))
        .and_then(|props| props.get(key))
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

fn parse_bool(section: &'static str, key: &'static str, value: &str) -> ConfigResult<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        _ => Err(invalid(section, key, value, "expected true or false")),
    }
}

fn invalid(section: &'static str, key: &'static str, value: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        section,
        key,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn path_value(path: &Option<PathBuf>) -> String {
    path.as_ref()
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn parse(text: &str) -> ConfigResult<ConfigFile> {
        ConfigFile::from_ini(&Ini::load_from_str(text).unwrap())
    }

    #[test]
    fn test_defaults_from_empty_file() {
        let config = parse("").unwrap();
        assert_eq!(config, ConfigFile::default());
        assert_eq!(config.merge.asset_dir, "textures");
        assert_eq!(config.progress.interval_ms, 250);
    }

    #[test]
    fn test_parse_all_sections() {
        let config = parse(
            "[paths]\nbase_dir = /game/Data\noutput_dir = /out\nlog_file = /tmp/merge.log\n\
             [manifest]\npath = /mo2/profiles/Default/modlist.txt\nformat = modlist\n\
             [merge]\nthreads = 6\nasset_dir = Textures\nextensions = dds, png\n\
             fold_case = no\nclean_output = yes\nprune_empty_dirs = off\n\
             [progress]\ninterval_ms = 100\n",
        )
        .unwrap();

        assert_eq!(config.paths.base_dir, Some(PathBuf::from("/game/Data")));
        assert_eq!(config.paths.log_file, Some(PathBuf::from("/tmp/merge.log")));
        assert_eq!(config.manifest.kind, ManifestKind::ModList);
        assert_eq!(config.merge.threads, ThreadCount::Fixed(6));
        assert_eq!(config.merge.asset_dir, "Textures");
        assert_eq!(config.merge.extensions, vec!["dds", "png"]);
        assert!(!config.merge.fold_case);
        assert!(config.merge.clean_output);
        assert!(!config.merge.prune_empty_dirs);
        assert_eq!(config.progress.interval_ms, 100);
    }

    #[test]
    fn test_invalid_values_name_the_key() {
        let err = parse("[merge]\nthreads = many\n").unwrap_err();
        assert!(err.to_string().contains("[merge] threads"));

        let err = parse("[merge]\nfold_case = maybe\n").unwrap_err();
        assert!(err.to_string().contains("fold_case"));

        let err = parse("[manifest]\nformat = xml\n").unwrap_err();
        assert!(err.to_string().contains("format"));

        let err = parse("[progress]\ninterval_ms = 0\n").unwrap_err();
        assert!(err.to_string().contains("interval_ms"));
    }

    #[test]
    fn test_zero_threads_parses_but_fails_validation() {
        let config = parse("[paths]\nbase_dir=/b\noutput_dir=/o\n[merge]\nthreads = 0\n").unwrap();
        assert_eq!(config.merge.threads, ThreadCount::Fixed(0));

        let merge = config.to_merge_config().unwrap();
        assert!(merge.validate().is_err());
    }

    #[test]
    fn test_to_merge_config_requires_paths() {
        let err = parse("[paths]\noutput_dir = /o\n")
            .unwrap()
            .to_merge_config()
            .unwrap_err();
        assert!(err.to_string().contains("base_dir"));

        let err = parse("[paths]\nbase_dir = /b\n")
            .unwrap()
            .to_merge_config()
            .unwrap_err();
        assert!(err.to_string().contains("output_dir"));
    }

    #[test]
    fn test_to_merge_config_modlist_derives_mods_dir() {
        let config = parse(
            "[paths]\nbase_dir=/b\noutput_dir=/o\n\
             [manifest]\npath=/mo2/profiles/Default/modlist.txt\nformat=modlist\n",
        )
        .unwrap()
        .to_merge_config()
        .unwrap();

        let manifest = config.manifest.unwrap();
        assert_eq!(
            manifest.format,
            ManifestFormat::ModList {
                mods_dir: PathBuf::from("/mo2/mods")
            }
        );
    }

    #[test]
    fn test_to_merge_config_modlist_without_mods_dir() {
        let err = parse(
            "[paths]\nbase_dir=/b\noutput_dir=/o\n\
             [manifest]\npath=/somewhere/modlist.txt\nformat=modlist\n",
        )
        .unwrap()
        .to_merge_config()
        .unwrap_err();
        assert!(err.to_string().contains("mods_dir"));
    }

    #[test]
    fn test_derive_mods_dir() {
        assert_eq!(
            derive_mods_dir(Path::new("/mo2/Profiles/Main/modlist.txt")),
            Some(PathBuf::from("/mo2/mods"))
        );
        assert_eq!(derive_mods_dir(Path::new("/x/modlist.txt")), None);
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested/config.ini");

        let mut config = ConfigFile::default();
        config.paths.base_dir = Some(PathBuf::from("/game/Data"));
        config.paths.output_dir = Some(PathBuf::from("/out"));
        config.manifest.path = Some(PathBuf::from("/cfg/order.json"));
        config.merge.threads = ThreadCount::Fixed(2);
        config.merge.clean_output = true;

        config.save_to(&path).unwrap();
        let loaded = ConfigFile::load_from(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_missing_file() {
        let temp = TempDir::new().unwrap();
        let err = ConfigFile::load_from(&temp.path().join("nope.ini")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_parse_threads() {
        assert_eq!(parse_threads("AUTO").unwrap(), ThreadCount::Auto);
        assert_eq!(parse_threads(" 12 ").unwrap(), ThreadCount::Fixed(12));
        assert!(parse_threads("-1").is_err());
    }
}

//! Settings: CLI flags over environment over config file over defaults.

use anyhow::{Context, Result};
use fbr_core::{Algorithm, BackupOptions, DEFAULT_MAX_COUNT};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Config file name looked up in the home directory.
pub const CONFIG_FILE_NAME: &str = "file-backup-rotate.yaml";

/// On-disk config file.
///
/// ```yaml
/// args:
///   filePath: /home/me/game/save.dat
///   maxCount: 5
/// ```
#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    #[serde(default)]
    pub args: ArgsConfig,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ArgsConfig {
    pub file_path: Option<PathBuf>,
    pub max_count: Option<usize>,
    pub algorithm: Option<String>,
    pub verbose: Option<bool>,
    pub atomic: Option<bool>,
    pub prune: Option<bool>,
}

impl FileConfig {
    /// Parse YAML config text.
    pub fn parse(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content).context("Failed to parse config file")
    }

    /// Load the config file.
    ///
    /// An explicit path must exist. Without one, `~/file-backup-rotate.yaml`
    /// is used if present. Returns the config and the file it came from.
    pub fn load(explicit: Option<&Path>) -> Result<(Self, Option<PathBuf>)> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => match default_config_path() {
                Some(path) if path.is_file() => path,
                _ => return Ok((Self::default(), None)),
            },
        };

        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config = Self::parse(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        Ok((config, Some(path)))
    }

    /// Whether debug logging is wanted, from the flag or the config file.
    pub fn verbose(&self, flag: bool) -> bool {
        flag || self.args.verbose.unwrap_or(false)
    }
}

/// `~/file-backup-rotate.yaml`, if a home directory is known.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(CONFIG_FILE_NAME))
}

/// Values supplied on the command line or through the environment.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Overrides {
    pub file: Option<PathBuf>,
    pub max_count: Option<usize>,
    pub algorithm: Option<String>,
    pub verbose: bool,
    pub atomic: bool,
    pub prune: bool,
}

/// Fully resolved settings for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub file: PathBuf,
    pub options: BackupOptions,
}

impl Settings {
    /// Merge overrides with the config file and defaults.
    pub fn resolve(overrides: Overrides, config: &FileConfig) -> Result<Self> {
        let args = &config.args;

        let file = overrides
            .file
            .or_else(|| args.file_path.clone())
            .context("No file given (use --file, FBR_FILE or args.filePath in the config file)")?;

        let max_count = overrides
            .max_count
            .or(args.max_count)
            .unwrap_or(DEFAULT_MAX_COUNT);
        if max_count < 1 {
            anyhow::bail!("Invalid max count: {} (must be at least 1)", max_count);
        }

        let algorithm = match overrides.algorithm.as_deref().or(args.algorithm.as_deref()) {
            Some(name) => Algorithm::parse(name)?,
            None => Algorithm::default(),
        };

        Ok(Self {
            file,
            options: BackupOptions {
                max_count,
                algorithm,
                verbose: config.verbose(overrides.verbose),
                atomic: overrides.atomic || args.atomic.unwrap_or(false),
                prune: overrides.prune || args.prune.unwrap_or(false),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_config() {
        let config = FileConfig::parse(
            "args:\n  filePath: save.dat\n  maxCount: 3\n  algorithm: blake3\n  prune: true\n",
        )
        .unwrap();
        assert_eq!(config.args.file_path, Some(PathBuf::from("save.dat")));
        assert_eq!(config.args.max_count, Some(3));
        assert_eq!(config.args.algorithm.as_deref(), Some("blake3"));
        assert_eq!(config.args.prune, Some(true));
    }

    #[test]
    fn test_parse_empty_config() {
        assert_eq!(FileConfig::parse("").unwrap(), FileConfig::default());
    }

    #[test]
    fn test_parse_rejects_unknown_keys() {
        assert!(FileConfig::parse("args:\n  maxCnt: 3\n").is_err());
        assert!(FileConfig::parse("other: 1\n").is_err());
    }

    #[test]
    fn test_load_explicit_missing_fails() {
        let temp_dir = TempDir::new().unwrap();
        assert!(FileConfig::load(Some(temp_dir.path().join("nope.yaml").as_path())).is_err());
    }

    #[test]
    fn test_load_explicit() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("conf.yaml");
        fs::write(&path, "args:\n  maxCount: 7\n").unwrap();

        let (config, used) = FileConfig::load(Some(path.as_path())).unwrap();
        assert_eq!(config.args.max_count, Some(7));
        assert_eq!(used, Some(path));
    }

    #[test]
    fn test_verbose_from_config_or_flag() {
        let quiet = FileConfig::default();
        assert!(!quiet.verbose(false));
        assert!(quiet.verbose(true));

        let loud = FileConfig::parse("args:\n  verbose: true\n").unwrap();
        assert!(loud.verbose(false));
    }

    #[test]
    fn test_resolve_defaults() {
        let overrides = Overrides {
            file: Some(PathBuf::from("save.dat")),
            ..Overrides::default()
        };
        let settings = Settings::resolve(overrides, &FileConfig::default()).unwrap();
        assert_eq!(settings.file, PathBuf::from("save.dat"));
        assert_eq!(settings.options, BackupOptions::default());
    }

    #[test]
    fn test_resolve_precedence() {
        let config = FileConfig::parse(
            "args:\n  filePath: from-config\n  maxCount: 9\n  algorithm: blake3\n",
        )
        .unwrap();
        let overrides = Overrides {
            max_count: Some(2),
            ..Overrides::default()
        };

        let settings = Settings::resolve(overrides, &config).unwrap();
        assert_eq!(settings.file, PathBuf::from("from-config"));
        assert_eq!(settings.options.max_count, 2);
        assert_eq!(settings.options.algorithm, Algorithm::Blake3);
    }

    #[test]
    fn test_resolve_requires_file() {
        assert!(Settings::resolve(Overrides::default(), &FileConfig::default()).is_err());
    }

    #[test]
    fn test_resolve_rejects_zero_and_bad_algorithm() {
        let zero = Overrides {
            file: Some(PathBuf::from("f")),
            max_count: Some(0),
            ..Overrides::default()
        };
        assert!(Settings::resolve(zero, &FileConfig::default()).is_err());

        let bad = Overrides {
            file: Some(PathBuf::from("f")),
            algorithm: Some("md5".to_string()),
            ..Overrides::default()
        };
        assert!(Settings::resolve(bad, &FileConfig::default()).is_err());
    }
}

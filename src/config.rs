use serde::Deserialize;
use std::path::{Path, PathBuf};

use anyhow::Context as _;

#[derive(Clone, Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub input: InputConfig,
    #[serde(default)]
    pub partition: PartitionConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("read config {}", path.display()))?;
        let cfg: Config =
            toml::from_str(&raw).with_context(|| format!("parse config {}", path.display()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.partition.k < 2 {
            anyhow::bail!(
                "invalid partition.k={} (cross-validation needs at least 2 folds)",
                self.partition.k
            );
        }
        if self.input.delimiter.is_empty() {
            anyhow::bail!("invalid input.delimiter (must be non-empty)");
        }

        fn check_prefix(name: &str, v: &str) -> anyhow::Result<()> {
            if v.trim().is_empty() {
                anyhow::bail!("invalid {name} (must be non-empty)");
            }
            if v.contains('/') || v.contains('\\') {
                anyhow::bail!("invalid {name}={v:?} (must be a bare file name prefix)");
            }
            Ok(())
        }

        check_prefix("output.test_prefix", &self.output.test_prefix)?;
        check_prefix("output.train_prefix", &self.output.train_prefix)?;
        if self.output.test_prefix == self.output.train_prefix {
            anyhow::bail!(
                "output.test_prefix and output.train_prefix must differ, both are {:?}",
                self.output.test_prefix
            );
        }

        Ok(())
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct InputConfig {
    #[serde(default = "default_input_path")]
    pub path: PathBuf,
    /// Field separator used when parsing `user::item::value` lines for statistics.
    #[serde(default = "default_delimiter")]
    pub delimiter: String,
    /// Reject the whole input if any line fails to parse as a preference.
    #[serde(default)]
    pub validate: bool,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            path: default_input_path(),
            delimiter: default_delimiter(),
            validate: false,
        }
    }
}

fn default_input_path() -> PathBuf {
    PathBuf::from("ratings.dat")
}

fn default_delimiter() -> String {
    "::".to_string()
}

#[derive(Clone, Debug, Deserialize)]
pub struct PartitionConfig {
    #[serde(default = "default_k")]
    pub k: usize,
    #[serde(default = "default_seed")]
    pub seed: u64,
}

impl Default for PartitionConfig {
    fn default() -> Self {
        Self {
            k: default_k(),
            seed: default_seed(),
        }
    }
}

fn default_k() -> usize {
    5
}

fn default_seed() -> u64 {
    11_109
}

#[derive(Clone, Debug, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_out_dir")]
    pub dir: PathBuf,
    #[serde(default = "default_test_prefix")]
    pub test_prefix: String,
    #[serde(default = "default_train_prefix")]
    pub train_prefix: String,
    /// Also emit `partition.json` and `folds.csv` next to the fold files.
    #[serde(default = "default_write_manifest")]
    pub write_manifest: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_out_dir(),
            test_prefix: default_test_prefix(),
            train_prefix: default_train_prefix(),
            write_manifest: default_write_manifest(),
        }
    }
}

fn default_out_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_test_prefix() -> String {
    "test".to_string()
}

fn default_train_prefix() -> String {
    "train".to_string()
}

fn default_write_manifest() -> bool {
    true
}

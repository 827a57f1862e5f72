use std::path::{Path, PathBuf};

use anyhow::Context as _;
use serde::{Deserialize, Serialize};

use crate::ratings::DatasetStats;
use crate::schema::{FILE_FOLDS_CSV, FILE_MANIFEST_JSON, FOLDS_HEADER};
use crate::types::FoldRange;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    pub version: String,
    pub run_id: String,
    pub git_sha: String,
    pub generated_at_unix_ms: u64,
    pub input_path: PathBuf,
    pub input_sha256: String,
    pub delimiter: String,
    pub seed: u64,
    pub k: usize,
    pub fold_size: usize,
    pub records: usize,
    pub stats: DatasetStats,
    pub folds: Vec<FoldEntry>,
    #[serde(default)]
    pub notes: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FoldEntry {
    pub fold: usize,
    pub test_file: String,
    pub train_file: String,
    pub test_range: FoldRange,
    pub test_records: usize,
    pub train_records: usize,
}

impl FoldEntry {
    pub fn test_fraction(&self, records: usize) -> f64 {
        if records == 0 {
            0.0
        } else {
            self.test_records as f64 / records as f64
        }
    }
}

impl Manifest {
    pub fn write_to_dir(&self, out_dir: &Path) -> anyhow::Result<PathBuf> {
        let out_path = out_dir.join(FILE_MANIFEST_JSON);
        let json = serde_json::to_vec_pretty(self).context("serialize partition.json")?;
        std::fs::write(&out_path, json).with_context(|| format!("write {}", out_path.display()))?;
        Ok(out_path)
    }

    pub fn read_from_dir(out_dir: &Path) -> anyhow::Result<Self> {
        let path = out_dir.join(FILE_MANIFEST_JSON);
        let raw = std::fs::read(&path).with_context(|| format!("read {}", path.display()))?;
        serde_json::from_slice(&raw).context("decode partition.json")
    }

    pub fn write_folds_csv(&self, out_dir: &Path) -> anyhow::Result<PathBuf> {
        let path = out_dir.join(FILE_FOLDS_CSV);
        let mut wtr = csv::WriterBuilder::new()
            .has_headers(false)
            .from_path(&path)
            .with_context(|| format!("open {}", path.display()))?;
        wtr.write_record(FOLDS_HEADER)
            .context("write folds header")?;

        for f in &self.folds {
            wtr.write_record([
                f.fold.to_string(),
                f.test_file.clone(),
                f.train_file.clone(),
                f.test_range.start.to_string(),
                f.test_range.end.to_string(),
                f.test_records.to_string(),
                f.train_records.to_string(),
                format!("{:.6}", f.test_fraction(self.records)),
            ])
            .context("write folds row")?;
        }

        wtr.flush().context("flush folds.csv")?;
        Ok(path)
    }
}

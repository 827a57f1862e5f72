use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::Context as _;
use serde::Serialize;
use tracing::{info, warn};

use crate::manifest::Manifest;
use crate::ratings::{load_records, split_records};
use crate::types::Record;

const VERSION: &str = "partition_verify_v1";

#[derive(Debug, Clone, Serialize)]
pub struct VerifyReport {
    pub version: String,
    pub out_dir: PathBuf,
    pub run_id: String,
    pub folds_checked: usize,
    pub input_checked: bool,
    pub ok: bool,
    pub problems: Vec<String>,
}

type Multiset = HashMap<Vec<u8>, usize>;

fn add_records(set: &mut Multiset, records: &[Record]) {
    for r in records {
        *set.entry(r.bytes.clone()).or_default() += 1;
    }
}

fn read_records(path: &Path) -> anyhow::Result<Vec<Record>> {
    let raw = std::fs::read(path).with_context(|| format!("read {}", path.display()))?;
    Ok(split_records(&raw))
}

/// Re-reads the fold files under `out_dir` and checks them against `partition.json` and,
/// when it is still readable, the original input file.
pub fn verify_partition(out_dir: &Path) -> anyhow::Result<VerifyReport> {
    let manifest = Manifest::read_from_dir(out_dir)
        .with_context(|| format!("read manifest in {}", out_dir.display()))?;

    let mut problems: Vec<String> = Vec::new();

    if manifest.folds.len() != manifest.k {
        problems.push(format!(
            "manifest lists {} folds but k={}",
            manifest.folds.len(),
            manifest.k
        ));
    }

    let input: Option<Multiset> = match load_records(&manifest.input_path) {
        Ok(ds) => {
            if ds.sha256 != manifest.input_sha256 {
                problems.push(format!(
                    "input {} changed since partitioning (sha256 {} != {})",
                    manifest.input_path.display(),
                    ds.sha256,
                    manifest.input_sha256
                ));
            }
            let mut set = Multiset::new();
            add_records(&mut set, &ds.records);
            Some(set)
        }
        Err(e) => {
            warn!(
                input = %manifest.input_path.display(),
                error = %e,
                "input not readable; checking fold files against manifest only"
            );
            None
        }
    };

    let mut tests_union = Multiset::new();
    let mut tests_total = 0usize;
    let mut folds_checked = 0usize;

    for entry in &manifest.folds {
        let test = match read_records(&out_dir.join(&entry.test_file)) {
            Ok(v) => v,
            Err(e) => {
                problems.push(format!("fold {}: {e:#}", entry.fold));
                continue;
            }
        };
        let train = match read_records(&out_dir.join(&entry.train_file)) {
            Ok(v) => v,
            Err(e) => {
                problems.push(format!("fold {}: {e:#}", entry.fold));
                continue;
            }
        };
        folds_checked += 1;

        if entry.test_range.len() != entry.test_records {
            problems.push(format!(
                "fold {}: test range {}..{} does not match {} test records",
                entry.fold, entry.test_range.start, entry.test_range.end, entry.test_records
            ));
        }
        if test.len() != entry.test_records {
            problems.push(format!(
                "fold {}: {} has {} records, manifest says {}",
                entry.fold,
                entry.test_file,
                test.len(),
                entry.test_records
            ));
        }
        if train.len() != entry.train_records {
            problems.push(format!(
                "fold {}: {} has {} records, manifest says {}",
                entry.fold,
                entry.train_file,
                train.len(),
                entry.train_records
            ));
        }
        if test.len() + train.len() != manifest.records {
            problems.push(format!(
                "fold {}: test+train={} but dataset has {} records",
                entry.fold,
                test.len() + train.len(),
                manifest.records
            ));
        }

        if let Some(input) = &input {
            let mut fold_set = Multiset::new();
            add_records(&mut fold_set, &test);
            add_records(&mut fold_set, &train);
            if &fold_set != input {
                problems.push(format!(
                    "fold {}: test+train is not a permutation of the input",
                    entry.fold
                ));
            }
        }

        tests_total += test.len();
        add_records(&mut tests_union, &test);
    }

    if folds_checked == manifest.folds.len() {
        if tests_total != manifest.records {
            problems.push(format!(
                "test files hold {tests_total} records in total, dataset has {}",
                manifest.records
            ));
        }
        if let Some(input) = &input {
            if &tests_union != input {
                problems.push("union of test files differs from the input".to_string());
            }
        }
    }

    let ok = problems.is_empty();
    info!(
        out_dir = %out_dir.display(),
        folds_checked,
        input_checked = input.is_some(),
        ok,
        problems = problems.len(),
        "verify done"
    );

    Ok(VerifyReport {
        version: VERSION.to_string(),
        out_dir: out_dir.to_path_buf(),
        run_id: manifest.run_id,
        folds_checked,
        input_checked: input.is_some(),
        ok,
        problems,
    })
}

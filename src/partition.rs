use std::io::{BufWriter, Write as _};
use std::path::{Path, PathBuf};

use anyhow::Context as _;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::manifest::{FoldEntry, Manifest};
use crate::ratings::{load_records, summarize};
use crate::schema::{env_git_sha, fold_file_name, make_run_id, MANIFEST_VERSION};
use crate::types::{now_ms, FoldRange, Record};

#[derive(Debug, Clone)]
pub struct PartitionResult {
    pub run_id: String,
    pub out_dir: PathBuf,
    pub records: usize,
    pub fold_size: usize,
    pub folds: Vec<FoldEntry>,
    pub manifest_path: Option<PathBuf>,
    pub folds_csv_path: Option<PathBuf>,
}

/// Test slice of one fold plus the records on either side of it, which together form
/// the training set.
#[derive(Debug, Clone, Copy)]
pub struct FoldSplit<'a, T> {
    pub fold: usize,
    pub range: FoldRange,
    pub test: &'a [T],
    head: &'a [T],
    tail: &'a [T],
}

impl<'a, T> FoldSplit<'a, T> {
    pub fn train(&self) -> impl Iterator<Item = &'a T> + 'a {
        self.head.iter().chain(self.tail.iter())
    }

    pub fn train_len(&self) -> usize {
        self.head.len() + self.tail.len()
    }
}

pub fn fold_size(n: usize, k: usize) -> usize {
    if k == 0 {
        return 0;
    }
    n.div_ceil(k)
}

pub fn fold_range(n: usize, k: usize, fold: usize) -> FoldRange {
    let size = fold_size(n, k);
    let start = fold.saturating_mul(size).min(n);
    let end = start.saturating_add(size).min(n);
    FoldRange { start, end }
}

pub fn shuffle_records<T>(records: &mut [T], seed: u64) {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    records.shuffle(&mut rng);
}

pub fn split_fold<T>(records: &[T], k: usize, fold: usize) -> FoldSplit<'_, T> {
    let range = fold_range(records.len(), k, fold);
    FoldSplit {
        fold,
        range,
        test: &records[range.as_range()],
        head: &records[..range.start],
        tail: &records[range.end..],
    }
}

pub fn run_partition(cfg: &Config) -> anyhow::Result<PartitionResult> {
    cfg.validate()?;

    let k = cfg.partition.k;
    let seed = cfg.partition.seed;
    let out_dir = cfg.output.dir.clone();
    let input_path = cfg.input.path.clone();

    let dataset = load_records(&input_path)
        .with_context(|| format!("load ratings {}", input_path.display()))?;
    let stats = summarize(&dataset.records, &cfg.input.delimiter, cfg.input.validate)
        .with_context(|| format!("summarize {}", input_path.display()))?;

    std::fs::create_dir_all(&out_dir).with_context(|| format!("create {}", out_dir.display()))?;

    let mut records = dataset.records;
    let n = records.len();
    let size = fold_size(n, k);
    info!(
        input = %input_path.display(),
        records = n,
        users = stats.users,
        items = stats.items,
        k,
        seed,
        fold_size = size,
        "loaded ratings"
    );

    let mut notes: Vec<String> = Vec::new();
    if n == 0 {
        warn!(input = %input_path.display(), "input has no records; all fold files will be empty");
        notes.push("empty_input: every fold file is empty".to_string());
    } else if n < k {
        warn!(records = n, k, "fewer records than folds; trailing test sets are empty");
        notes.push(format!("fewer_records_than_folds: records={n} k={k}"));
    }
    if stats.unparsed > 0 {
        warn!(unparsed = stats.unparsed, "some records did not parse as preferences");
        notes.push(format!("unparsed_records={}", stats.unparsed));
    }

    shuffle_records(&mut records, seed);

    let mut folds: Vec<FoldEntry> = Vec::with_capacity(k);
    for fold in 0..k {
        let split = split_fold(&records, k, fold);
        let test_file = fold_file_name(&cfg.output.test_prefix, fold);
        let train_file = fold_file_name(&cfg.output.train_prefix, fold);

        let test_records = write_records(&out_dir.join(&test_file), split.test)?;
        let train_records = write_records(&out_dir.join(&train_file), split.train())?;

        debug!(
            fold,
            test_start = split.range.start,
            test_end = split.range.end,
            test_records,
            train_records,
            "wrote fold"
        );

        folds.push(FoldEntry {
            fold,
            test_file,
            train_file,
            test_range: split.range,
            test_records,
            train_records,
        });
    }

    let generated_at_unix_ms = now_ms();
    let run_id = make_run_id(generated_at_unix_ms);

    let (manifest_path, folds_csv_path) = if cfg.output.write_manifest {
        let manifest = Manifest {
            version: MANIFEST_VERSION.to_string(),
            run_id: run_id.clone(),
            git_sha: env_git_sha(),
            generated_at_unix_ms,
            input_path: std::fs::canonicalize(&input_path).unwrap_or_else(|_| input_path.clone()),
            input_sha256: dataset.sha256,
            delimiter: cfg.input.delimiter.clone(),
            seed,
            k,
            fold_size: size,
            records: n,
            stats,
            folds: folds.clone(),
            notes,
        };
        let json = manifest.write_to_dir(&out_dir)?;
        let csv = manifest.write_folds_csv(&out_dir)?;
        (Some(json), Some(csv))
    } else {
        (None, None)
    };

    info!(out_dir = %out_dir.display(), run_id = %run_id, folds = k, "partition done");

    Ok(PartitionResult {
        run_id,
        out_dir,
        records: n,
        fold_size: size,
        folds,
        manifest_path,
        folds_csv_path,
    })
}

fn write_records<'a>(
    path: &Path,
    records: impl IntoIterator<Item = &'a Record>,
) -> anyhow::Result<usize> {
    let file =
        std::fs::File::create(path).with_context(|| format!("create {}", path.display()))?;
    let mut w = BufWriter::new(file);
    let mut written = 0usize;
    for r in records {
        w.write_all(&r.bytes)
            .and_then(|_| w.write_all(b"\n"))
            .with_context(|| format!("write {}", path.display()))?;
        written += 1;
    }
    w.flush().with_context(|| format!("flush {}", path.display()))?;
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fold_size_is_ceiling_division() {
        assert_eq!(fold_size(10, 5), 2);
        assert_eq!(fold_size(11, 5), 3);
        assert_eq!(fold_size(3, 5), 1);
        assert_eq!(fold_size(0, 5), 0);
        assert_eq!(fold_size(7, 0), 0);
    }

    #[test]
    fn ranges_are_clamped_to_len() {
        // 11 records, k=5 -> size 3: [0,3) [3,6) [6,9) [9,11) [11,11)
        let got: Vec<(usize, usize)> = (0..5)
            .map(|f| {
                let r = fold_range(11, 5, f);
                (r.start, r.end)
            })
            .collect();
        assert_eq!(got, vec![(0, 3), (3, 6), (6, 9), (9, 11), (11, 11)]);
    }

    #[test]
    fn test_slices_cover_everything_once() {
        let data: Vec<u32> = (0..23).collect();
        let k = 4;
        let mut seen: Vec<u32> = Vec::new();
        for fold in 0..k {
            let split = split_fold(&data, k, fold);
            assert_eq!(split.test.len() + split.train_len(), data.len());
            assert!(split.train().all(|x| !split.test.contains(x)));
            seen.extend_from_slice(split.test);
        }
        assert_eq!(seen, data);
    }

    #[test]
    fn shuffle_is_deterministic_per_seed() {
        let mut a: Vec<u32> = (0..100).collect();
        let mut b = a.clone();
        let mut c = a.clone();
        shuffle_records(&mut a, 11_109);
        shuffle_records(&mut b, 11_109);
        shuffle_records(&mut c, 42);
        assert_eq!(a, b);
        assert_ne!(a, c);

        let mut sorted = a.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, (0..100).collect::<Vec<u32>>());
    }
}

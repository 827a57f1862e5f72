pub const MANIFEST_VERSION: &str = "partition_v1";

pub const FILE_MANIFEST_JSON: &str = "partition.json";
pub const FILE_FOLDS_CSV: &str = "folds.csv";
pub const FILE_VERIFY_JSON: &str = "verify.json";

pub const FOLDS_HEADER: [&str; 8] = [
    "fold",
    "test_file",
    "train_file",
    "test_start",
    "test_end",
    "test_records",
    "train_records",
    "test_fraction",
];

pub fn fold_file_name(prefix: &str, fold: usize) -> String {
    format!("{prefix}.{fold}")
}

pub fn make_run_id(start_unix_ms: u64) -> String {
    format!("part_{start_unix_ms}")
}

pub fn env_git_sha() -> String {
    std::env::var("GIT_SHA").unwrap_or_else(|_| "unknown".to_string())
}

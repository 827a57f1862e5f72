use std::path::PathBuf;

use anyhow::Context as _;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use ratings_partition::config::Config;
use ratings_partition::partition::run_partition;

#[derive(Parser, Debug)]
#[command(
    name = "ratings_partition",
    version,
    about = "Split a ratings file into k shuffled train/test folds"
)]
struct Args {
    /// Optional TOML config; command-line flags override its values.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Ratings file, one rating per line (default: ratings.dat).
    #[arg(long)]
    input: Option<PathBuf>,

    /// Number of folds (default: 5).
    #[arg(short = 'k', long)]
    k: Option<usize>,

    /// Shuffle seed (default: 11109).
    #[arg(long)]
    seed: Option<u64>,

    /// Directory receiving test.<i> / train.<i> (default: current dir).
    #[arg(long)]
    out_dir: Option<PathBuf>,

    /// Field separator for user/item/value parsing (default: "::").
    #[arg(long)]
    delimiter: Option<String>,

    /// Fail on the first line that does not parse as user<delim>item[<delim>value].
    #[arg(long)]
    validate: bool,

    #[arg(long)]
    test_prefix: Option<String>,

    #[arg(long)]
    train_prefix: Option<String>,

    /// Skip partition.json and folds.csv.
    #[arg(long)]
    no_manifest: bool,
}

impl Args {
    fn into_config(self) -> anyhow::Result<Config> {
        let mut cfg = match &self.config {
            Some(path) => Config::load(path).context("load config")?,
            None => Config::default(),
        };
        if let Some(v) = self.input {
            cfg.input.path = v;
        }
        if let Some(v) = self.k {
            cfg.partition.k = v;
        }
        if let Some(v) = self.seed {
            cfg.partition.seed = v;
        }
        if let Some(v) = self.out_dir {
            cfg.output.dir = v;
        }
        if let Some(v) = self.delimiter {
            cfg.input.delimiter = v;
        }
        if self.validate {
            cfg.input.validate = true;
        }
        if let Some(v) = self.test_prefix {
            cfg.output.test_prefix = v;
        }
        if let Some(v) = self.train_prefix {
            cfg.output.train_prefix = v;
        }
        if self.no_manifest {
            cfg.output.write_manifest = false;
        }
        cfg.validate()?;
        Ok(cfg)
    }
}

fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cfg = Args::parse().into_config()?;
    let res = run_partition(&cfg)
        .with_context(|| format!("partition {}", cfg.input.path.display()))?;

    println!("run_id={}", res.run_id);
    println!("out_dir={}", res.out_dir.display());
    println!("records={}", res.records);
    println!("k={}", res.folds.len());
    println!("fold_size={}", res.fold_size);
    for f in &res.folds {
        println!(
            "fold.{}={} test={} train={}",
            f.fold, f.test_file, f.test_records, f.train_records
        );
    }
    if let Some(p) = &res.manifest_path {
        println!("manifest_json={}", p.display());
    }
    if let Some(p) = &res.folds_csv_path {
        println!("folds_csv={}", p.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tmp_config(contents: &str) -> PathBuf {
        let mut p = std::env::temp_dir();
        p.push(format!(
            "ratings_partition_cli_{}_{}.toml",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_nanos()
        ));
        std::fs::write(&p, contents).expect("write tmp config");
        p
    }

    #[test]
    fn flags_override_config_file() {
        let path = tmp_config(
            "[input]\npath = \"from_file.dat\"\n\n[partition]\nk = 3\nseed = 1\n\n[output]\nwrite_manifest = true\n",
        );
        let path_arg = path.display().to_string();
        let args = Args::try_parse_from([
            "ratings_partition",
            "--config",
            path_arg.as_str(),
            "-k",
            "7",
            "--validate",
            "--no-manifest",
            "--train-prefix",
            "fit",
        ])
        .expect("parse args");
        let cfg = args.into_config().expect("config");

        assert_eq!(cfg.partition.k, 7);
        assert_eq!(cfg.partition.seed, 1);
        assert_eq!(cfg.input.path, PathBuf::from("from_file.dat"));
        assert!(cfg.input.validate);
        assert!(!cfg.output.write_manifest);
        assert_eq!(cfg.output.train_prefix, "fit");
        assert_eq!(cfg.output.test_prefix, "test");
    }

    #[test]
    fn no_flags_keep_defaults() {
        let cfg = Args::try_parse_from(["ratings_partition"])
            .expect("parse args")
            .into_config()
            .expect("config");
        assert_eq!(cfg.partition.k, 5);
        assert_eq!(cfg.partition.seed, 11_109);
        assert!(cfg.output.write_manifest);
    }

    #[test]
    fn invalid_override_is_rejected() {
        let err = Args::try_parse_from(["ratings_partition", "-k", "1"])
            .expect("parse args")
            .into_config()
            .unwrap_err();
        assert!(format!("{err:#}").contains("partition.k"));
    }
}

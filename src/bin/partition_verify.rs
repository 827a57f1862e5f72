use std::path::PathBuf;

use anyhow::Context as _;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use ratings_partition::schema::FILE_VERIFY_JSON;
use ratings_partition::verify::verify_partition;

#[derive(Debug, Parser)]
#[command(
    name = "partition_verify",
    about = "Check fold files against partition.json and the input ratings"
)]
struct Args {
    /// Directory holding partition.json and the fold files.
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,

    /// Report file name, written inside out_dir.
    #[arg(long, default_value = FILE_VERIFY_JSON)]
    json_out: String,
}

fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args = Args::parse();
    let report = verify_partition(&args.out_dir)
        .with_context(|| format!("verify {}", args.out_dir.display()))?;

    let out_path = args.out_dir.join(&args.json_out);
    let json = serde_json::to_vec_pretty(&report).context("serialize json")?;
    std::fs::write(&out_path, json).with_context(|| format!("write {}", out_path.display()))?;

    println!("run_id={}", report.run_id);
    println!("folds_checked={}", report.folds_checked);
    println!("input_checked={}", report.input_checked);
    println!("ok={}", report.ok);
    for p in &report.problems {
        println!("problem={p}");
    }
    println!("json_out={}", out_path.display());

    if !report.ok {
        anyhow::bail!("{} problem(s) found", report.problems.len());
    }
    Ok(())
}

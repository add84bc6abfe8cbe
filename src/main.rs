mod logging;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use clap_complete::Shell;
use std::collections::BTreeMap;
use std::io::{self, IsTerminal};
use std::path::PathBuf;

use mdstat::alerts::{self, Severity};
use mdstat::collectors::{mdstat as collector, sysfs};
use mdstat::config::Config;
use mdstat::util::report;
use mdstat::Snapshot;

#[derive(Parser, Debug)]
#[command(name = "mdstat", about = "Linux software RAID status reader", version)]
struct Cli {
    /// Status file to read instead of the configured one (default /proc/mdstat)
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Only show this array (e.g. md0)
    #[arg(short, long)]
    array: Option<String>,

    /// Print the parsed snapshot as JSON and exit
    #[arg(long, conflicts_with_all = ["check", "config"])]
    json: bool,

    /// One-shot health check: exit 0=OK, 1=WARNING, 2=CRITICAL (nagios/cron compatible)
    #[arg(long, conflicts_with = "config")]
    check: bool,

    /// Read each array's mismatch count from sysfs
    #[arg(long)]
    mismatch: bool,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,

    /// Print config file path and current values, then exit
    #[arg(long)]
    config: bool,

    /// Print shell completions and exit
    #[arg(long, value_name = "SHELL")]
    completions: Option<Shell>,

    /// Log parser decisions to stderr
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Some(shell) = cli.completions {
        clap_complete::generate(shell, &mut Cli::command(), "mdstat", &mut io::stdout());
        return Ok(());
    }

    let cfg = Config::load();
    logging::init(if cli.verbose { "debug" } else { cfg.logging.level.as_str() });

    if cli.config {
        return run_print_config(&cfg);
    }
    if cli.check {
        std::process::exit(run_check(&cli, &cfg));
    }

    let snapshot = load_snapshot(&cli, &cfg)?;
    let mismatches = if cli.mismatch || cfg.report.show_mismatch {
        sysfs::mismatch_counts(&cfg.general.sysfs_block_dir, &snapshot)
    } else {
        BTreeMap::new()
    };

    if cli.json {
        return run_json_snapshot(&snapshot, &mismatches);
    }

    let active_alerts = alerts::evaluate(&snapshot, &mismatches, &cfg.alerts);
    let color = cfg.report.color && !cli.no_color && io::stdout().is_terminal();
    print!("{}", report::generate(&snapshot, &mismatches, &active_alerts, color));
    Ok(())
}

fn load_snapshot(cli: &Cli, cfg: &Config) -> Result<Snapshot> {
    let path = cli.file.as_ref().unwrap_or(&cfg.general.mdstat_path);
    let mut snapshot = collector::read_mdstat_from(path)
        .with_context(|| format!("failed to read RAID status from {}", path.display()))?;

    if let Some(name) = &cli.array {
        snapshot.arrays.retain(|a| &a.name == name);
        if snapshot.arrays.is_empty() {
            anyhow::bail!("no array named {} in {}", name, path.display());
        }
    }
    Ok(snapshot)
}

fn run_json_snapshot(snapshot: &Snapshot, mismatches: &BTreeMap<String, u64>) -> Result<()> {
    use serde_json::{json, Value};

    let mut out = serde_json::to_value(snapshot)?;
    if !mismatches.is_empty() {
        if let Some(arrays) = out.get_mut("arrays").and_then(Value::as_array_mut) {
            for array in arrays.iter_mut() {
                let count = array.get("name")
                    .and_then(Value::as_str)
                    .and_then(|name| mismatches.get(name))
                    .copied();
                if let Some(obj) = array.as_object_mut() {
                    obj.insert("mismatch_cnt".into(), json!(count));
                }
            }
        }
    }
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}

/// Returns the process exit code.
fn run_check(cli: &Cli, cfg: &Config) -> i32 {
    let snapshot = match load_snapshot(cli, cfg) {
        Ok(s)  => s,
        Err(e) => {
            println!("[{}] {:#}", Severity::Critical.label(), e);
            return Severity::Critical.exit_code();
        }
    };
    let mismatches = if cli.mismatch || cfg.report.show_mismatch {
        sysfs::mismatch_counts(&cfg.general.sysfs_block_dir, &snapshot)
    } else {
        BTreeMap::new()
    };

    let active_alerts = alerts::evaluate(&snapshot, &mismatches, &cfg.alerts);
    if active_alerts.iter().all(|a| a.severity == Severity::Info) {
        println!("OK, {} array(s), no problems", snapshot.arrays.len());
    }
    for a in &active_alerts {
        println!("[{}] {}{}", a.severity.label(), a.prefix(), a.message);
    }

    alerts::worst(&active_alerts).map(|s| s.exit_code()).unwrap_or(0)
}

fn run_print_config(cfg: &Config) -> Result<()> {
    let path = Config::config_path()
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_else(|| "(unknown)".to_string());
    println!("Config: {}", path);
    println!();
    println!("[general]");
    println!("  mdstat_path     = {}", cfg.general.mdstat_path.display());
    println!("  sysfs_block_dir = {}", cfg.general.sysfs_block_dir.display());
    println!();
    println!("[report]");
    println!("  color         = {}", cfg.report.color);
    println!("  show_mismatch = {}", cfg.report.show_mismatch);
    println!();
    println!("[alerts]");
    println!("  mismatch_warn = {}", cfg.alerts.mismatch_warn);
    println!("  warn_on_check = {}", cfg.alerts.warn_on_check);
    println!();
    println!("[logging]");
    println!("  level = {}", cfg.logging.level);
    Ok(())
}

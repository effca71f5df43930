// Nightly orchestrator: optionally collates the day's obs_seq.final
// files, then runs the surface and radar diagnostic plotters as child
// processes. A failed collate aborts the run; the plotting stages all
// run and their exit codes are gathered into one report.

use std::process::Command;

use anyhow::{bail, Result};
use chrono::{Local, NaiveDate};
use clap::{CommandFactory, Parser};
use log::{error, info};

use obs_seq_diag::orchestrate::{build_stages, run_sequence, DiagPaths, Stage};

#[derive(Parser, Debug)]
#[command(about = "Run the nightly obs_seq diagnostic chain")]
struct Args {
    /// YYYYMMDD to process if --realtime is not set
    #[arg(short = 'd', long)]
    date: Option<String>,

    /// Process today's date
    #[arg(long)]
    realtime: bool,

    /// Skip the obs_seq collation step, just make plots
    #[arg(long)]
    nofile: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let date = if args.realtime {
        Local::now().format("%Y%m%d").to_string()
    } else if let Some(date) = args.date {
        if NaiveDate::parse_from_str(&date, "%Y%m%d").is_err() {
            bail!("`{date}` is not a YYYYMMDD date");
        }
        date
    } else {
        error!("no date given, pass --date YYYYMMDD or --realtime");
        Args::command().print_help()?;
        std::process::exit(1);
    };
    info!("processing {date}");

    let paths = DiagPaths::default();
    let (collate, plots) = build_stages(&date, &paths, !args.nofile);

    let report = run_sequence(collate.as_ref(), &plots, spawn_stage);

    if !report.success() {
        for failed in report.failed() {
            error!("stage `{}` exited with code {}", failed.name, failed.code);
        }
        bail!("{} of {} stages failed", report.failed().len(), report.stages.len());
    }
    info!("all {} stages finished cleanly", report.stages.len());
    Ok(())
}

/// Spawn one stage and block until it returns. Spawn failures (missing
/// executable) are folded into the report as exit code 127.
fn spawn_stage(stage: &Stage) -> i32 {
    info!("cmd: {}", stage.command_line());
    match Command::new(&stage.program).args(&stage.args).status() {
        Ok(status) => status.code().unwrap_or(-1),
        Err(e) => {
            error!("failed to spawn `{}`: {e}", stage.program.display());
            127
        }
    }
}

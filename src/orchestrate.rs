use std::path::PathBuf;

/// Where the external executables and data trees live. Defaults mirror
/// the operational WoF layout; every field can be overridden for local
/// runs.
#[derive(Debug, Clone)]
pub struct DiagPaths {
    pub collate: PathBuf,
    pub sfc_innov: PathBuf,
    pub radar_innov: PathBuf,
    pub radar_rms: PathBuf,
    pub scratch_root: PathBuf,
    pub image_dir: PathBuf,
}

impl Default for DiagPaths {
    fn default() -> Self {
        Self {
            collate: PathBuf::from("obs_seq_collate"),
            sfc_innov: PathBuf::from("plot_sfc_innov"),
            radar_innov: PathBuf::from("plot_radar_innov"),
            radar_rms: PathBuf::from("plot_radar_rms"),
            scratch_root: PathBuf::from("/scratch/wof/realtime"),
            image_dir: PathBuf::from("/www/www.nssl.noaa.gov/projects/wof/news-e/diagnostics"),
        }
    }
}

/// One child-process invocation.
#[derive(Debug, Clone)]
pub struct Stage {
    pub name: &'static str,
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl Stage {
    /// Rendered command line, for logging only.
    pub fn command_line(&self) -> String {
        let mut s = self.program.display().to_string();
        for a in &self.args {
            s.push(' ');
            s.push_str(a);
        }
        s
    }
}

/// Exit code of one completed stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageResult {
    pub name: &'static str,
    pub code: i32,
}

#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub stages: Vec<StageResult>,
}

impl RunReport {
    pub fn success(&self) -> bool {
        self.stages.iter().all(|s| s.code == 0)
    }

    pub fn failed(&self) -> Vec<&StageResult> {
        self.stages.iter().filter(|s| s.code != 0).collect()
    }
}

/// Build the nightly sequence for `date` (YYYYMMDD): the optional
/// collate step plus the five plotting invocations (surface, then
/// reflectivity and radial-velocity innovation/rms).
pub fn build_stages(date: &str, paths: &DiagPaths, run_collate: bool) -> (Option<Stage>, Vec<Stage>) {
    let year = date.get(..4).unwrap_or(date);
    let obs_file = format!("obs_seq.final.{date}.nc");
    let image_dir = paths.image_dir.display().to_string();

    let collate = run_collate.then(|| Stage {
        name: "obs_seq_collate",
        program: paths.collate.clone(),
        args: vec![
            "-d".into(),
            format!("{}/{}/{}*", paths.scratch_root.display(), date, year),
            "-f".into(),
            "obs_seq.final*".into(),
            "-p".into(),
            "obs_seq.final".into(),
        ],
    });

    let plot_args = |extra: &[&str]| -> Vec<String> {
        let mut args = vec!["-f".into(), obs_file.clone(), "--dir".into(), image_dir.clone()];
        args.extend(extra.iter().map(|s| s.to_string()));
        args
    };

    let plots = vec![
        Stage {
            name: "surface innovation",
            program: paths.sfc_innov.clone(),
            args: plot_args(&[]),
        },
        Stage {
            name: "reflectivity innovation",
            program: paths.radar_innov.clone(),
            args: plot_args(&[]),
        },
        Stage {
            name: "reflectivity rms",
            program: paths.radar_rms.clone(),
            args: plot_args(&[]),
        },
        Stage {
            name: "radial velocity innovation",
            program: paths.radar_innov.clone(),
            args: plot_args(&["-v", "VR"]),
        },
        Stage {
            name: "radial velocity rms",
            program: paths.radar_rms.clone(),
            args: plot_args(&["-v", "VR"]),
        },
    ];

    (collate, plots)
}

/// Run the sequence through `run` (a closure so tests can fake exit
/// codes without spawning anything).
///
/// A failed collate aborts before any plotting runs. The plotting
/// stages all run regardless of each other's outcome; every exit code
/// lands in the report so the caller can fail the whole run with a
/// per-stage account instead of the old fire-and-forget.
pub fn run_sequence<F>(collate: Option<&Stage>, plots: &[Stage], mut run: F) -> RunReport
where
    F: FnMut(&Stage) -> i32,
{
    let mut report = RunReport::default();

    if let Some(stage) = collate {
        let code = run(stage);
        report.stages.push(StageResult { name: stage.name, code });
        if code != 0 {
            return report;
        }
    }

    for stage in plots {
        let code = run(stage);
        report.stages.push(StageResult { name: stage.name, code });
    }

    report
}

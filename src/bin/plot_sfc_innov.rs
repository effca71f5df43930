// 5-panel surface innovation diagnostic for one obs_seq.final netCDF
// file. Each panel pools the LAND_SFC and METAR flavor of a field,
// bins the innovations over the 9 hour window and plots innovation,
// RMSI, prior spread and ob counts against wall-clock time.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use log::{info, warn};
use rayon::prelude::*;

use obs_seq_diag::binning::{bin_series, canonical_bins, Field, TimeBin};
use obs_seq_diag::obs_seq::{self, KindMap, ObsSet};
use obs_seq_diag::plot::{
    render_figure, InnovOrientation, PanelData, PanelSpec, PlotConfig, SURFACE_PANELS,
};

#[derive(Parser, Debug)]
#[command(about = "Surface innovation diagnostics from an obs_seq.final netCDF file")]
struct Args {
    /// obs_seq.final.YYYYMMDD.nc file to process
    #[arg(short = 'f', long)]
    file: PathBuf,

    /// Directory the image is written into
    #[arg(long, default_value = ".")]
    dir: PathBuf,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let token = obs_seq::date_token(&args.file)?;
    let (dataset, kind_names) = obs_seq::load_with_kinds(&args.file)?;
    info!("loaded {} obs from {}", dataset.len(), args.file.display());

    let bins = canonical_bins();
    let specs: &[PanelSpec] = &SURFACE_PANELS;
    let panels: Vec<Option<PanelData>> = specs
        .par_iter()
        .map(|spec| build_panel(spec, &dataset, &kind_names, &bins))
        .collect::<Result<_>>()?;

    let out = args.dir.join(format!("SFC_ObsDiag_{token}.png"));
    let label = format!("Diagnostics for SFC {token}");
    render_figure(&out, &label, &panels, &PlotConfig::default())
        .with_context(|| format!("rendering {}", out.display()))?;
    info!("wrote {}", out.display());

    Ok(())
}

/// Select both kinds of one panel together (set union), bin, and hand
/// the series to the renderer. Panels whose kinds are absent from the
/// file come back as `None` and leave a blank slot.
fn build_panel(
    spec: &PanelSpec,
    dataset: &ObsSet,
    kind_names: &KindMap,
    bins: &[TimeBin],
) -> Result<Option<PanelData>> {
    let title = format!("{} and {}", spec.land, spec.metar);

    let codes: Vec<i64> = [spec.land, spec.metar]
        .iter()
        .filter_map(|name| kind_names.get(*name).copied())
        .collect();
    if codes.is_empty() {
        warn!("no kind attribute for `{title}`, leaving panel blank");
        return Ok(None);
    }

    let field = dataset.select_kinds(&codes)?;
    if field.is_empty() {
        warn!("no obs of `{title}` in this file, leaving panel blank");
        return Ok(None);
    }

    info!("plotting: {title}");
    let series = bin_series(&field, Field::Innov, bins, None, true);

    Ok(Some(PanelData {
        title,
        y_min: spec.y_min,
        y_max: spec.y_max,
        series,
        orientation: InnovOrientation::HxMinusY,
        shaded: true,
    }))
}

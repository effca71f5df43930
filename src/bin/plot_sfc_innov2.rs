// Variant of the surface innovation diagnostic that bins the LAND_SFC
// and METAR flavors of each field independently. When both carry data
// the two series are merged with observation-count weights; when only
// one does, that series is plotted alone under its own name.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use log::{info, warn};
use rayon::prelude::*;

use obs_seq_diag::binning::{bin_series, canonical_bins, BinStat, Field, TimeBin};
use obs_seq_diag::combine::weighted_merge;
use obs_seq_diag::obs_seq::{self, KindMap, ObsSet};
use obs_seq_diag::plot::{
    render_figure, InnovOrientation, PanelData, PanelSpec, PlotConfig, SURFACE_PANELS_WEIGHTED,
};

#[derive(Parser, Debug)]
#[command(about = "Surface innovation diagnostics, count-weighted across obs kinds")]
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
    let specs: &[PanelSpec] = &SURFACE_PANELS_WEIGHTED;
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

/// Bin one kind on its own; `None` when the kind name is absent from
/// the file attributes or matches no records (an explicit empty check,
/// not a swallowed exception).
fn kind_series(
    name: &str,
    dataset: &ObsSet,
    kind_names: &KindMap,
    bins: &[TimeBin],
) -> Result<Option<Vec<BinStat>>> {
    let Some(&code) = kind_names.get(name) else {
        return Ok(None);
    };
    let field = dataset.select_kinds(&[code])?;
    if field.is_empty() {
        return Ok(None);
    }
    Ok(Some(bin_series(&field, Field::Innov, bins, None, true)))
}

fn build_panel(
    spec: &PanelSpec,
    dataset: &ObsSet,
    kind_names: &KindMap,
    bins: &[TimeBin],
) -> Result<Option<PanelData>> {
    let land = kind_series(spec.land, dataset, kind_names, bins)?;
    let metar = kind_series(spec.metar, dataset, kind_names, bins)?;

    let (title, series) = match (land, metar) {
        (Some(a), Some(b)) => {
            let merged = weighted_merge(&a, &b)?;
            (format!("{} + {}", spec.land, spec.metar), merged)
        }
        (Some(a), None) => (spec.land.to_string(), a),
        (None, Some(b)) => (spec.metar.to_string(), b),
        (None, None) => {
            warn!(
                "neither `{}` nor `{}` in this file, leaving panel blank",
                spec.land, spec.metar
            );
            return Ok(None);
        }
    };

    info!("plotting: {title}");
    Ok(Some(PanelData {
        title,
        y_min: spec.y_min,
        y_max: spec.y_max,
        series,
        orientation: InnovOrientation::YMinusHx,
        shaded: false,
    }))
}

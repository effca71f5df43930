use std::path::Path;

use anyhow::Result;
use chrono::{Duration, NaiveDate, NaiveDateTime};
use log::warn;
use plotters::coord::types::RangedDateTime;
use plotters::coord::Shift;
use plotters::prelude::*;

use crate::binning::BinStat;

/// Explicit rendering configuration, instead of mutable module-level
/// plotting state.
#[derive(Debug, Clone)]
pub struct PlotConfig {
    pub width: u32,
    pub height: u32,
    /// Wall-clock time that `anal_min == 0` maps to on the x axis.
    pub analysis_start: NaiveDateTime,
}

impl Default for PlotConfig {
    fn default() -> Self {
        Self {
            width: 1200,
            height: 1400,
            // 18 UTC launch of the assimilation window.
            analysis_start: NaiveDate::from_ymd_opt(2017, 5, 16)
                .unwrap()
                .and_hms_opt(18, 0, 0)
                .unwrap(),
        }
    }
}

/// Sign convention for the plotted innovation line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InnovOrientation {
    /// Negate the binned mean and label it as forecast minus ob.
    HxMinusY,
    /// Plot the binned mean as-is, ob minus forecast.
    YMinusHx,
}

impl InnovOrientation {
    fn sign(self) -> f64 {
        match self {
            InnovOrientation::HxMinusY => -1.0,
            InnovOrientation::YMinusHx => 1.0,
        }
    }

    fn label(self) -> &'static str {
        match self {
            InnovOrientation::HxMinusY => "Prior Innov [Hx - y]",
            InnovOrientation::YMinusHx => "Prior Innov [y - Hx]",
        }
    }
}

/// One row of the panel layout: the two observation-type names plotted
/// together and the y range of the panel.
#[derive(Debug, Clone, Copy)]
pub struct PanelSpec {
    pub land: &'static str,
    pub metar: &'static str,
    pub y_min: f64,
    pub y_max: f64,
}

const fn panel(land: &'static str, metar: &'static str, y_min: f64, y_max: f64) -> PanelSpec {
    PanelSpec { land, metar, y_min, y_max }
}

pub const SURFACE_PANELS: [PanelSpec; 5] = [
    panel("LAND_SFC_TEMPERATURE", "METAR_TEMPERATURE_2_METER", -3.0, 3.0),
    panel("LAND_SFC_DEWPOINT", "METAR_DEWPOINT_2_METER", -3.0, 3.0),
    panel("LAND_SFC_ALTIMETER", "METAR_ALTIMETER", -3.0, 3.0),
    panel("LAND_SFC_U_WIND_COMPONENT", "METAR_U_10_METER_WIND", -5.0, 5.0),
    panel("LAND_SFC_V_WIND_COMPONENT", "METAR_V_10_METER_WIND", -5.0, 5.0),
];

/// The weighted-merge variant tightens the altimeter panel.
pub const SURFACE_PANELS_WEIGHTED: [PanelSpec; 5] = [
    panel("LAND_SFC_TEMPERATURE", "METAR_TEMPERATURE_2_METER", -3.0, 3.0),
    panel("LAND_SFC_DEWPOINT", "METAR_DEWPOINT_2_METER", -3.0, 3.0),
    panel("LAND_SFC_ALTIMETER", "METAR_ALTIMETER", -1.0, 1.0),
    panel("LAND_SFC_U_WIND_COMPONENT", "METAR_U_10_METER_WIND", -5.0, 5.0),
    panel("LAND_SFC_V_WIND_COMPONENT", "METAR_V_10_METER_WIND", -5.0, 5.0),
];

/// Everything one panel needs to draw itself.
#[derive(Debug, Clone)]
pub struct PanelData {
    pub title: String,
    pub y_min: f64,
    pub y_max: f64,
    pub series: Vec<BinStat>,
    pub orientation: InnovOrientation,
    /// Tint the lower/upper halves of the panel (warm/cold bias cue).
    pub shaded: bool,
}

/// Render the stacked panels into one PNG. A `None` panel leaves its
/// slot blank (that observation type was absent from the file).
pub fn render_figure(
    path: &Path,
    suptitle: &str,
    panels: &[Option<PanelData>],
    cfg: &PlotConfig,
) -> Result<()> {
    let root = BitMapBackend::new(path, (cfg.width, cfg.height)).into_drawing_area();
    root.fill(&WHITE)?;
    let root = root.titled(suptitle, ("sans-serif", 20))?;

    let areas = root.split_evenly((panels.len(), 1));
    for (area, panel) in areas.iter().zip(panels) {
        if let Some(p) = panel {
            draw_panel(area, p, cfg)?;
        }
    }

    root.present()?;
    Ok(())
}

fn draw_panel(
    area: &DrawingArea<BitMapBackend, Shift>,
    p: &PanelData,
    cfg: &PlotConfig,
) -> Result<()> {
    if p.series.len() < 2 {
        warn!("panel `{}` has fewer than two bins, skipping", p.title);
        return Ok(());
    }

    let t0 = cfg.analysis_start;
    let at = |min: f64| t0 + Duration::minutes(min as i64);
    let x0 = at(p.series[0].start_min);
    let x1 = at(p.series[p.series.len() - 1].start_min);
    let obs_max = p.series.iter().map(|b| b.num_obs).max().unwrap_or(0).max(1) as f64 * 1.05;

    let mut chart = ChartBuilder::on(area)
        .caption(&p.title, ("sans-serif", 15))
        .margin(8)
        .x_label_area_size(26)
        .y_label_area_size(48)
        .right_y_label_area_size(48)
        .build_cartesian_2d(RangedDateTime::from(x0..x1), p.y_min..p.y_max)?
        .set_secondary_coord(RangedDateTime::from(x0..x1), 0.0..obs_max);

    chart
        .configure_mesh()
        .x_labels(10)
        .x_label_formatter(&|t: &NaiveDateTime| t.format("%H:%M").to_string())
        .y_desc("Innov / RMSI / Spread")
        .label_style(("sans-serif", 11))
        .draw()?;
    chart
        .configure_secondary_axes()
        .y_desc("No. of Obs")
        .draw()?;

    if p.shaded {
        let (lower, upper, alpha) = band_colors(&p.title);
        let mid = 0.5 * (p.y_min + p.y_max);
        chart.draw_series([
            Rectangle::new([(x0, p.y_min), (x1, mid)], lower.mix(alpha).filled()),
            Rectangle::new([(x0, mid), (x1, p.y_max)], upper.mix(alpha).filled()),
        ])?;
    }

    // Reference line at zero innovation.
    chart.draw_series(LineSeries::new([(x0, 0.0), (x1, 0.0)], BLACK.stroke_width(1)))?;

    let sign = p.orientation.sign();
    let lines: [(&'static str, ShapeStyle, Vec<Vec<(NaiveDateTime, f64)>>); 3] = [
        (
            "Prior Spread",
            BLUE.stroke_width(1),
            masked_segments(&p.series, t0, |b| b.spread),
        ),
        (
            "RMSI",
            RED.stroke_width(2),
            masked_segments(&p.series, t0, |b| b.rms),
        ),
        (
            p.orientation.label(),
            BLACK.stroke_width(2),
            masked_segments(&p.series, t0, move |b| b.mean.map(|m| sign * m)),
        ),
    ];
    for (label, style, segments) in lines {
        for (i, segment) in segments.into_iter().enumerate() {
            let drawn = chart.draw_series(LineSeries::new(segment, style))?;
            if i == 0 {
                drawn.label(label).legend(move |(x, y)| {
                    PathElement::new(vec![(x, y), (x + 16, y)], style)
                });
            }
        }
    }

    let obs: Vec<(NaiveDateTime, f64)> = p
        .series
        .iter()
        .map(|b| (at(b.start_min), b.num_obs as f64))
        .collect();
    chart.draw_secondary_series(LineSeries::new(obs, GREEN.stroke_width(1)))?;

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperLeft)
        .background_style(WHITE.mix(0.85))
        .border_style(BLACK)
        .label_font(("sans-serif", 11))
        .draw()?;

    Ok(())
}

/// Lower/upper band tints keyed off the field in the panel title.
fn band_colors(title: &str) -> (RGBColor, RGBColor, f64) {
    if title.contains("TEMP") {
        (BLUE, RED, 0.2)
    } else if title.contains("DEW") {
        (RGBColor(139, 69, 19), RGBColor(0, 128, 0), 0.2)
    } else {
        (BLUE, RED, 0.1)
    }
}

/// Split a masked series into runs of contiguous valid bins so the
/// polyline breaks over no-data bins instead of bridging them.
fn masked_segments<F>(
    series: &[BinStat],
    t0: NaiveDateTime,
    pick: F,
) -> Vec<Vec<(NaiveDateTime, f64)>>
where
    F: Fn(&BinStat) -> Option<f64>,
{
    let mut out = Vec::new();
    let mut run = Vec::new();
    for b in series {
        match pick(b) {
            Some(v) => run.push((t0 + Duration::minutes(b.start_min as i64), v)),
            None => {
                if !run.is_empty() {
                    out.push(std::mem::take(&mut run));
                }
            }
        }
    }
    if !run.is_empty() {
        out.push(run);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stat(start_min: f64, mean: Option<f64>) -> BinStat {
        BinStat {
            start_min,
            mean,
            rms: mean.map(f64::abs),
            spread: None,
            num_obs: mean.is_some() as usize,
        }
    }

    #[test]
    fn segments_break_over_masked_bins() {
        let t0 = PlotConfig::default().analysis_start;
        let series = vec![
            stat(0.0, Some(1.0)),
            stat(15.0, Some(2.0)),
            stat(30.0, None),
            stat(45.0, Some(3.0)),
        ];
        let segs = masked_segments(&series, t0, |b| b.mean);
        assert_eq!(segs.len(), 2);
        assert_eq!(segs[0].len(), 2);
        assert_eq!(segs[1].len(), 1);
        assert_eq!(segs[0][1].0, t0 + Duration::minutes(15));
    }

    #[test]
    fn all_masked_yields_no_segments() {
        let t0 = PlotConfig::default().analysis_start;
        let series = vec![stat(0.0, None), stat(15.0, None)];
        assert!(masked_segments(&series, t0, |b| b.mean).is_empty());
    }

    #[test]
    fn orientation_flips_sign_only_for_hx_minus_y() {
        assert_eq!(InnovOrientation::HxMinusY.sign(), -1.0);
        assert_eq!(InnovOrientation::YMinusHx.sign(), 1.0);
    }

    #[test]
    fn band_colors_follow_the_field() {
        let (_, _, strong) = band_colors("LAND_SFC_TEMPERATURE and METAR_TEMPERATURE_2_METER");
        let (_, _, faint) = band_colors("LAND_SFC_ALTIMETER and METAR_ALTIMETER");
        assert_eq!(strong, 0.2);
        assert_eq!(faint, 0.1);
    }
}

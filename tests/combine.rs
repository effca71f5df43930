// The plot_sfc_innov2 path end to end: select each kind on its own,
// bin, then merge with observation-count weights.

use std::path::PathBuf;

use obs_seq_diag::binning::{bin_series, Field, TimeBin};
use obs_seq_diag::combine::weighted_merge;
use obs_seq_diag::obs_seq::{ObsRecord, ObsSet};

fn obs(kind: i64, anal_min: f64, innov: f64) -> ObsRecord {
    ObsRecord {
        kind,
        anal_min,
        dart_qc: 0.0,
        innov,
        sd_hxa: 1.0,
        height: f64::NAN,
    }
}

fn dataset() -> ObsSet {
    ObsSet {
        records: vec![
            // Bin [0, 45]: two LAND obs, two METAR obs -> plain average.
            obs(25, 10.0, 1.0),
            obs(25, 20.0, 3.0),
            obs(38, 15.0, 5.0),
            obs(38, 25.0, 7.0),
            // Bin [90, 135]: METAR only.
            obs(38, 100.0, -2.0),
        ],
        source: PathBuf::from("obs_seq.final.20170516.nc"),
    }
}

const BINS: [TimeBin; 3] = [
    TimeBin { start_min: 0.0, end_min: 45.0 },
    TimeBin { start_min: 45.0, end_min: 90.0 },
    TimeBin { start_min: 90.0, end_min: 135.0 },
];

#[test]
fn merge_of_independent_kind_series() {
    let d = dataset();
    let land = bin_series(&d.select_kinds(&[25]).unwrap(), Field::Innov, &BINS, None, true);
    let metar = bin_series(&d.select_kinds(&[38]).unwrap(), Field::Innov, &BINS, None, true);

    let merged = weighted_merge(&land, &metar).unwrap();
    assert_eq!(merged.len(), BINS.len());

    // Equal counts: the merged mean is the arithmetic average of the
    // two means (2.0 and 6.0).
    assert_eq!(merged[0].num_obs, 4);
    assert!((merged[0].mean.unwrap() - 4.0).abs() < 1e-9);

    // Nothing anywhere: stays masked.
    assert_eq!(merged[1].num_obs, 0);
    assert_eq!(merged[1].mean, None);

    // One-sided bin: METAR passes through unmodified.
    assert_eq!(merged[2].num_obs, 1);
    assert_eq!(merged[2].mean, metar[2].mean);
    assert_eq!(merged[2].rms, metar[2].rms);
    assert_eq!(merged[2].spread, metar[2].spread);
}

#[test]
fn empty_selection_is_detectable_before_binning() {
    // The caller's explicit "no obs of this kind at all" check, which
    // replaces exception suppression around the selection.
    let d = dataset();
    let none = d.select_kinds(&[99]).unwrap();
    assert!(none.is_empty());
}

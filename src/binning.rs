use std::str::FromStr;

use crate::error::DiagError;
use crate::obs_seq::{ObsRecord, ObsSet};

/// Obs with dart_qc below this were assimilated. Compared with a
/// tolerance instead of `== 0` to guard against float noise in the file.
pub const QC_ASSIMILATED_MAX: f64 = 0.1;

/// Inclusive time bin in minutes since analysis start.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeBin {
    pub start_min: f64,
    pub end_min: f64,
}

impl TimeBin {
    pub fn contains(&self, anal_min: f64) -> bool {
        anal_min >= self.start_min && anal_min <= self.end_min
    }
}

/// The canonical schedule: 36 bins over a 9 hour window, a 45 minute
/// wide bin stepped every 15 minutes. Consecutive bins overlap by two
/// 15-minute slots; the overlap is deliberate smoothing.
pub fn canonical_bins() -> Vec<TimeBin> {
    (0..36)
        .map(|t| TimeBin {
            start_min: (15 * t) as f64,
            end_min: (15 * (t + 3)) as f64,
        })
        .collect()
}

/// Numeric columns of an observation record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Innov,
    AnalMin,
    DartQc,
    SdHxa,
    Height,
}

impl Field {
    pub fn get(self, r: &ObsRecord) -> f64 {
        match self {
            Field::Innov => r.innov,
            Field::AnalMin => r.anal_min,
            Field::DartQc => r.dart_qc,
            Field::SdHxa => r.sd_hxa,
            Field::Height => r.height,
        }
    }
}

impl FromStr for Field {
    type Err = DiagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "innov" => Ok(Field::Innov),
            "anal_min" => Ok(Field::AnalMin),
            "dart_qc" => Ok(Field::DartQc),
            "sdHxa" => Ok(Field::SdHxa),
            "height" => Ok(Field::Height),
            other => Err(DiagError::BadThreshold(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Gt,
    Ge,
    Lt,
    Le,
}

/// Extra row filter applied after the QC cut, e.g. `height > 2000`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Threshold {
    pub field: Field,
    pub op: CmpOp,
    pub value: f64,
}

impl Threshold {
    pub fn matches(&self, r: &ObsRecord) -> bool {
        let v = self.field.get(r);
        match self.op {
            CmpOp::Gt => v > self.value,
            CmpOp::Ge => v >= self.value,
            CmpOp::Lt => v < self.value,
            CmpOp::Le => v <= self.value,
        }
    }
}

impl FromStr for Threshold {
    type Err = DiagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut it = s.split_whitespace();
        let (field, op, value) = match (it.next(), it.next(), it.next(), it.next()) {
            (Some(f), Some(o), Some(v), None) => (f, o, v),
            _ => return Err(DiagError::BadThreshold(s.to_string())),
        };
        let op = match op {
            ">" => CmpOp::Gt,
            ">=" => CmpOp::Ge,
            "<" => CmpOp::Lt,
            "<=" => CmpOp::Le,
            _ => return Err(DiagError::BadThreshold(s.to_string())),
        };
        let value: f64 = value
            .parse()
            .map_err(|_| DiagError::BadThreshold(s.to_string()))?;
        Ok(Threshold {
            field: field.parse()?,
            op,
            value,
        })
    }
}

/// Aggregate for one time bin. `None` means the bin had no surviving
/// records; "no data" is never collapsed to 0.0.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BinStat {
    pub start_min: f64,
    pub mean: Option<f64>,
    pub rms: Option<f64>,
    pub spread: Option<f64>,
    pub num_obs: usize,
}

/// Bin `field` of the record set over `bins`.
///
/// Per bin: records with `anal_min` inside the inclusive bin range, then
/// (if `dart_qc` is set) only assimilated obs, then the optional
/// threshold cut. Over the survivors: mean and rms of `field`, mean of
/// the prior spread, and the count of non-zero `field` values. The
/// output always has one entry per bin, in bin order.
pub fn bin_series(
    set: &ObsSet,
    field: Field,
    bins: &[TimeBin],
    threshold: Option<&Threshold>,
    dart_qc: bool,
) -> Vec<BinStat> {
    bins.iter()
        .map(|bin| {
            let subset: Vec<&ObsRecord> = set
                .records
                .iter()
                .filter(|r| bin.contains(r.anal_min))
                .filter(|r| !dart_qc || r.dart_qc < QC_ASSIMILATED_MAX)
                .filter(|&r| threshold.map_or(true, |t| t.matches(r)))
                .collect();

            let values = subset.iter().map(|&r| field.get(r));
            let num_obs = values.clone().filter(|&v| v != 0.0).count();

            BinStat {
                start_min: bin.start_min,
                mean: mean_finite(values.clone()),
                rms: mean_finite(values.map(|v| v * v)).map(f64::sqrt),
                spread: mean_finite(subset.iter().map(|&r| r.sd_hxa)),
                num_obs,
            }
        })
        .collect()
}

/// Mean over the finite entries; `None` for an empty (or all-NaN) set.
fn mean_finite(values: impl Iterator<Item = f64>) -> Option<f64> {
    let mut sum = 0.0;
    let mut n = 0usize;
    for v in values.filter(|v| v.is_finite()) {
        sum += v;
        n += 1;
    }
    if n == 0 {
        None
    } else {
        Some(sum / n as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_schedule_shape() {
        let bins = canonical_bins();
        assert_eq!(bins.len(), 36);
        assert_eq!(bins[0], TimeBin { start_min: 0.0, end_min: 45.0 });
        assert_eq!(bins[35], TimeBin { start_min: 525.0, end_min: 570.0 });
        // 45 minute window stepped every 15 minutes -> overlap
        assert!(bins[1].start_min < bins[0].end_min);
    }

    #[test]
    fn threshold_parses() {
        let t: Threshold = "height > 2000".parse().unwrap();
        assert_eq!(t.field, Field::Height);
        assert_eq!(t.op, CmpOp::Gt);
        assert_eq!(t.value, 2000.0);

        let t: Threshold = "sdHxa <= 1.5".parse().unwrap();
        assert_eq!(t.field, Field::SdHxa);
        assert_eq!(t.op, CmpOp::Le);

        assert!("height".parse::<Threshold>().is_err());
        assert!("height ~ 2".parse::<Threshold>().is_err());
        assert!("pressure > 2".parse::<Threshold>().is_err());
        assert!("height > two".parse::<Threshold>().is_err());
    }

    #[test]
    fn bin_edges_are_inclusive() {
        let bin = TimeBin { start_min: 30.0, end_min: 75.0 };
        assert!(bin.contains(30.0));
        assert!(bin.contains(75.0));
        assert!(!bin.contains(75.1));
        assert!(!bin.contains(29.9));
    }
}

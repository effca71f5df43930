use crate::binning::BinStat;
use crate::error::DiagError;

/// Merge two bin series with observation-count weights.
///
/// Per bin the weight of `a` is `n_a / (n_a + n_b)`; mean, rms and
/// spread are blended with it and the counts are summed. A bin where one
/// side has no obs passes the other side through unmodified; a bin where
/// neither side has obs stays masked. Whole-file-empty selections are
/// the caller's job to catch (`ObsSet::is_empty`) before binning at all.
pub fn weighted_merge(a: &[BinStat], b: &[BinStat]) -> Result<Vec<BinStat>, DiagError> {
    if a.len() != b.len() {
        return Err(DiagError::BinLengthMismatch {
            left: a.len(),
            right: b.len(),
        });
    }

    let merged = a
        .iter()
        .zip(b)
        .map(|(sa, sb)| {
            let n_a = sa.num_obs as f64;
            let n_b = sb.num_obs as f64;
            let total = n_a + n_b;
            if total == 0.0 {
                return BinStat {
                    start_min: sa.start_min,
                    mean: None,
                    rms: None,
                    spread: None,
                    num_obs: 0,
                };
            }
            let w_a = n_a / total;
            BinStat {
                start_min: sa.start_min,
                mean: blend(sa.mean, sb.mean, w_a),
                rms: blend(sa.rms, sb.rms, w_a),
                spread: blend(sa.spread, sb.spread, w_a),
                num_obs: sa.num_obs + sb.num_obs,
            }
        })
        .collect();

    Ok(merged)
}

/// Weighted blend of two masked values. A zero-weight side is dropped
/// entirely so its mask cannot leak into the result; with both weights
/// active a masked side masks the blend.
fn blend(a: Option<f64>, b: Option<f64>, w_a: f64) -> Option<f64> {
    if w_a == 0.0 {
        return b;
    }
    if w_a == 1.0 {
        return a;
    }
    match (a, b) {
        (Some(x), Some(y)) => Some(w_a * x + (1.0 - w_a) * y),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stat(start_min: f64, mean: f64, num_obs: usize) -> BinStat {
        BinStat {
            start_min,
            mean: Some(mean),
            rms: Some(mean.abs()),
            spread: Some(1.0),
            num_obs,
        }
    }

    #[test]
    fn length_mismatch_is_an_error() {
        let a = vec![stat(0.0, 1.0, 1)];
        assert!(matches!(
            weighted_merge(&a, &[]),
            Err(DiagError::BinLengthMismatch { left: 1, right: 0 })
        ));
    }

    #[test]
    fn equal_counts_average() {
        let a = vec![stat(0.0, 2.0, 5)];
        let b = vec![stat(0.0, 4.0, 5)];
        let m = weighted_merge(&a, &b).unwrap();
        assert!((m[0].mean.unwrap() - 3.0).abs() < 1e-12);
        assert_eq!(m[0].num_obs, 10);
    }

    #[test]
    fn zero_count_side_passes_other_through() {
        let mut b = stat(0.0, 4.0, 0);
        b.mean = None;
        b.rms = None;
        b.spread = None;
        let a = vec![stat(0.0, 2.0, 7)];
        let m = weighted_merge(&a, &[b]).unwrap();
        assert_eq!(m[0].mean, Some(2.0));
        assert_eq!(m[0].spread, Some(1.0));
        assert_eq!(m[0].num_obs, 7);
    }

    #[test]
    fn both_empty_stays_masked() {
        let empty = BinStat {
            start_min: 15.0,
            mean: None,
            rms: None,
            spread: None,
            num_obs: 0,
        };
        let m = weighted_merge(&[empty], &[empty]).unwrap();
        assert_eq!(m[0].mean, None);
        assert_eq!(m[0].rms, None);
        assert_eq!(m[0].num_obs, 0);
        assert_eq!(m[0].start_min, 15.0);
    }
}

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use log::debug;
use netcdf::AttributeValue;

use crate::error::DiagError;

/// One observation out of an obs_seq.final netCDF file.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObsRecord {
    /// Observation-type code (e.g. LAND_SFC_TEMPERATURE = 25).
    pub kind: i64,
    /// Minutes since the analysis start time.
    pub anal_min: f64,
    /// DART quality-control flag; 0 means the ob was assimilated.
    pub dart_qc: f64,
    /// Innovation, observation minus forecast at the ob location.
    pub innov: f64,
    /// Prior ensemble spread at the ob location.
    pub sd_hxa: f64,
    /// Station height in meters, NaN when the file does not carry it.
    pub height: f64,
}

/// Flat record set loaded from one obs_seq file.
#[derive(Debug, Clone)]
pub struct ObsSet {
    pub records: Vec<ObsRecord>,
    pub source: PathBuf,
}

/// Symbolic observation-type name -> kind code, from global attributes.
pub type KindMap = HashMap<String, i64>;

impl ObsSet {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Subset of records whose kind matches any of `kinds` (set union).
    ///
    /// An empty `kinds` list is a caller bug and is rejected; an empty
    /// *result* is a legitimate "this file has none of those obs" state
    /// the caller must test with `is_empty`.
    pub fn select_kinds(&self, kinds: &[i64]) -> Result<ObsSet, DiagError> {
        if kinds.is_empty() {
            return Err(DiagError::NoSelector);
        }
        let records = self
            .records
            .iter()
            .filter(|r| kinds.contains(&r.kind))
            .copied()
            .collect();
        Ok(ObsSet {
            records,
            source: self.source.clone(),
        })
    }
}

/// Load the record set from `path`.
pub fn load(path: &Path) -> Result<ObsSet, DiagError> {
    let file = open(path)?;
    read_records(&file, path)
}

/// Load the record set plus the kind map from the global attributes.
pub fn load_with_kinds(path: &Path) -> Result<(ObsSet, KindMap), DiagError> {
    let file = open(path)?;
    let set = read_records(&file, path)?;
    let kinds = read_kind_map(&file);
    debug!("{}: {} obs, {} kind names", path.display(), set.len(), kinds.len());
    Ok((set, kinds))
}

fn open(path: &Path) -> Result<netcdf::File, DiagError> {
    netcdf::open(path).map_err(|source| DiagError::OpenObsSeq {
        path: path.to_path_buf(),
        source,
    })
}

fn read_records(file: &netcdf::File, path: &Path) -> Result<ObsSet, DiagError> {
    let kind = column_i64(file, "kind")?;
    let anal_min = column_f64(file, "anal_min")?;
    let dart_qc = column_f64(file, "dart_qc")?;
    let innov = column_f64(file, "innov")?;
    let sd_hxa = column_f64(file, "sdHxa")?;

    // Height is only present in some collations.
    let height = match file.variable("height") {
        Some(var) => var.get_values::<f64, _>(..)?,
        None => vec![f64::NAN; kind.len()],
    };

    let records = kind
        .iter()
        .zip(&anal_min)
        .zip(&dart_qc)
        .zip(&innov)
        .zip(&sd_hxa)
        .zip(&height)
        .map(|(((((&kind, &anal_min), &dart_qc), &innov), &sd_hxa), &height)| ObsRecord {
            kind,
            anal_min,
            dart_qc,
            innov,
            sd_hxa,
            height,
        })
        .collect();

    Ok(ObsSet {
        records,
        source: path.to_path_buf(),
    })
}

fn column_f64(file: &netcdf::File, name: &str) -> Result<Vec<f64>, DiagError> {
    let var = file
        .variable(name)
        .ok_or_else(|| DiagError::MissingVariable(name.to_string()))?;
    Ok(var.get_values::<f64, _>(..)?)
}

fn column_i64(file: &netcdf::File, name: &str) -> Result<Vec<i64>, DiagError> {
    let var = file
        .variable(name)
        .ok_or_else(|| DiagError::MissingVariable(name.to_string()))?;
    Ok(var.get_values::<i64, _>(..)?)
}

/// Collect every integer-valued global attribute as a kind mapping.
/// String and float attributes (titles, creation stamps) are skipped.
fn read_kind_map(file: &netcdf::File) -> KindMap {
    let mut map = KindMap::new();
    for attr in file.attributes() {
        let value = match attr.value() {
            Ok(v) => v,
            Err(_) => continue,
        };
        let code = match value {
            AttributeValue::Schar(v) => v as i64,
            AttributeValue::Uchar(v) => v as i64,
            AttributeValue::Short(v) => v as i64,
            AttributeValue::Ushort(v) => v as i64,
            AttributeValue::Int(v) => v as i64,
            AttributeValue::Uint(v) => v as i64,
            AttributeValue::Longlong(v) => v,
            AttributeValue::Ulonglong(v) => v as i64,
            _ => continue,
        };
        map.insert(attr.name().to_string(), code);
    }
    map
}

/// Pull the 8-digit date token out of `obs_seq.final.YYYYMMDD.nc`.
/// The image file name and plot label are derived from it.
pub fn date_token(path: &Path) -> Result<String, DiagError> {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| DiagError::BadDateToken(path.display().to_string()))?;
    let stem = name
        .strip_suffix(".nc")
        .ok_or_else(|| DiagError::BadDateToken(name.to_string()))?;
    if stem.len() < 8 {
        return Err(DiagError::BadDateToken(name.to_string()));
    }
    let token = &stem[stem.len() - 8..];
    if !token.bytes().all(|b| b.is_ascii_digit()) {
        return Err(DiagError::BadDateToken(name.to_string()));
    }
    Ok(token.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(records: Vec<ObsRecord>) -> ObsSet {
        ObsSet {
            records,
            source: PathBuf::from("obs_seq.final.20170516.nc"),
        }
    }

    fn rec(kind: i64, innov: f64) -> ObsRecord {
        ObsRecord {
            kind,
            anal_min: 0.0,
            dart_qc: 0.0,
            innov,
            sd_hxa: 1.0,
            height: f64::NAN,
        }
    }

    #[test]
    fn select_is_a_union() {
        let s = set(vec![rec(25, 1.0), rec(38, 2.0), rec(12, 3.0)]);
        let out = s.select_kinds(&[25, 38]).unwrap();
        assert_eq!(out.len(), 2);
        assert!(out.records.iter().all(|r| r.kind == 25 || r.kind == 38));
    }

    #[test]
    fn select_without_kinds_is_an_error() {
        let s = set(vec![rec(25, 1.0)]);
        assert!(matches!(s.select_kinds(&[]), Err(DiagError::NoSelector)));
    }

    #[test]
    fn select_can_be_empty_without_error() {
        let s = set(vec![rec(25, 1.0)]);
        let out = s.select_kinds(&[99]).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn date_token_from_obs_seq_name() {
        let t = date_token(Path::new("/data/obs_seq.final.20170516.nc")).unwrap();
        assert_eq!(t, "20170516");
    }

    #[test]
    fn date_token_rejects_odd_names() {
        assert!(date_token(Path::new("obs_seq.final.nc")).is_err());
        assert!(date_token(Path::new("obs_seq.final.20170516.txt")).is_err());
        assert!(date_token(Path::new("obs_seq.final.2017051a.nc")).is_err());
    }
}

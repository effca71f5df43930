use std::path::PathBuf;

use thiserror::Error;

/// Failures the diagnostic tools can hit before any plot is drawn.
#[derive(Debug, Error)]
pub enum DiagError {
    #[error("cannot open obs_seq netCDF file {path}: {source}")]
    OpenObsSeq {
        path: PathBuf,
        #[source]
        source: netcdf::Error,
    },

    #[error("obs_seq file is missing required variable `{0}`")]
    MissingVariable(String),

    #[error("no observation kinds supplied for selection")]
    NoSelector,

    #[error("bin series length mismatch: {left} vs {right}")]
    BinLengthMismatch { left: usize, right: usize },

    #[error("no YYYYMMDD date token in file name `{0}`")]
    BadDateToken(String),

    #[error("bad threshold expression `{0}`, expected `<field> <op> <value>`")]
    BadThreshold(String),

    #[error(transparent)]
    NetCdf(#[from] netcdf::Error),
}

// Shared logic for the obs_seq.final diagnostic tools.
//
// Three binaries sit on top of this library:
//   plot_sfc_innov   - 5-panel surface innovation diagnostic, pooled kinds
//   plot_sfc_innov2  - variant with count-weighted merge of the two kinds
//   cron_diag        - nightly orchestrator for the collate + plotting chain

pub mod binning;
pub mod combine;
pub mod error;
pub mod obs_seq;
pub mod orchestrate;
pub mod plot;

pub use error::DiagError;

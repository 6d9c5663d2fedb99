//! Trackpoint extraction and enrichment for TCX workout recordings.
//!
//! One batch transform: the raw bytes of a Garmin TrainingCenterDatabase v2
//! document go in, an ordered table of enriched rows comes out (elapsed time,
//! relative altitude, speed, Savitzky-Golay smoothed channels, climb rate and
//! an altitude color encoding). Chart and map rendering is left to the caller;
//! the table exposes read-only accessors shaped for that.

use thiserror::Error;

mod altitude_colors;
mod csv_export;
mod savgol_smoother;
mod table_cache;
mod tcx_parser;
mod trackpoint_enricher;

pub use csv_export::write_csv;
pub use table_cache::TableCache;
pub use tcx_parser::{parse_trackpoints, RawSample, TCX_NAMESPACE};
pub use trackpoint_enricher::{
    enrich_trackpoints, ChartChannel, EnrichedRow, EnrichedTable, TableSummary,
    MAX_PLAUSIBLE_SPEED_KMH,
};

/// Fatal error categories for one enrichment run. There is no partial-result
/// mode: any of these aborts the whole transform.
#[derive(Error, Debug)]
pub enum TcxError {
    #[error("input is not well-formed XML: {0}")]
    MalformedInput(String),
    #[error("no trackpoints found in document")]
    NoData,
    #[error("trackpoint {0}: {1}")]
    FieldExtraction(usize, String),
    #[error("insufficient data for smoothing: {0} rows retained, need at least {1}")]
    InsufficientData(usize, usize),
}

use serde::Serialize;

use crate::altitude_colors::altitude_hex;
use crate::savgol_smoother::{savgol_smooth, smoothing_window, MIN_WINDOW};
use crate::tcx_parser::{self, RawSample};
use crate::TcxError;

/// Upper bound of the speed validity band in km/h. Rows outside `[0, 100]`
/// are sensor glitches and are dropped entirely.
pub const MAX_PLAUSIBLE_SPEED_KMH: f64 = 100.0;

/// One retained sample with all derived columns. Rows are ordered by time
/// ascending and keyed by the wall-clock `index` string.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichedRow {
    /// Wall-clock time of day, `HH:MM:SS`. Not globally unique across a
    /// recording spanning midnight; duplicate keys are tolerated.
    pub index: String,
    /// Original timestamp text from the source document.
    pub timestamp: String,
    pub elapsed_seconds: i64,
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: f64,
    pub relative_altitude: f64,
    pub cumulative_distance: f64,
    pub heart_rate: u32,
    pub speed_kmh: f64,
    pub altitude_smooth: f64,
    pub relative_altitude_smooth: f64,
    pub speed_smooth: f64,
    pub heart_rate_smooth: f64,
    /// First difference of `altitude_smooth`; `None` on the first retained
    /// row, which has no predecessor.
    pub climb_rate_smooth: Option<f64>,
    /// Lowercase `#rrggbb` from the magma gradient, indexed by smoothed
    /// altitude against the raw altitude range.
    pub altitude_color: String,
}

/// The finished dataset: owned here, read-only for display code.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedTable {
    pub rows: Vec<EnrichedRow>,
}

/// Row count and the original first/last timestamp strings, for the summary
/// line above the charts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSummary {
    pub rows: usize,
    pub start_time: String,
    pub end_time: String,
}

/// The five smoothed time-series the display layer charts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartChannel {
    Altitude,
    RelativeAltitude,
    ClimbRate,
    Speed,
    HeartRate,
}

impl EnrichedTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn summary(&self) -> Option<TableSummary> {
        let first = self.rows.first()?;
        let last = self.rows.last()?;
        Some(TableSummary {
            rows: self.rows.len(),
            start_time: first.timestamp.clone(),
            end_time: last.timestamp.clone(),
        })
    }

    /// `(latitude, longitude)` per retained row, one map dot each.
    pub fn map_points(&self) -> Vec<(f64, f64)> {
        self.rows.iter().map(|row| (row.latitude, row.longitude)).collect()
    }

    /// `(index, value)` pairs in table order for one smoothed channel. The
    /// climb-rate series omits the first row's missing value.
    pub fn chart_series(&self, channel: ChartChannel) -> Vec<(&str, f64)> {
        self.rows
            .iter()
            .filter_map(|row| {
                let value = match channel {
                    ChartChannel::Altitude => Some(row.altitude_smooth),
                    ChartChannel::RelativeAltitude => Some(row.relative_altitude_smooth),
                    ChartChannel::ClimbRate => row.climb_rate_smooth,
                    ChartChannel::Speed => Some(row.speed_smooth),
                    ChartChannel::HeartRate => Some(row.heart_rate_smooth),
                };
                value.map(|v| (row.index.as_str(), v))
            })
            .collect()
    }
}

/// The whole transform: parse, derive, filter, smooth, color. Deterministic
/// for identical input bytes, no side effects beyond the returned table.
pub fn enrich_trackpoints(data: &[u8]) -> Result<EnrichedTable, TcxError> {
    let samples = tcx_parser::parse_trackpoints(data)?;
    let derived = derive_rows(&samples);
    let retained = filter_rows(derived);
    let rows = smooth_rows(retained)?;
    Ok(EnrichedTable { rows })
}

/// A row after derivation but before filtering and smoothing.
#[derive(Debug, Clone, PartialEq)]
struct DerivedRow {
    index: String,
    timestamp: String,
    elapsed_seconds: i64,
    latitude: f64,
    longitude: f64,
    altitude: f64,
    relative_altitude: f64,
    cumulative_distance: f64,
    heart_rate: u32,
    speed_kmh: f64,
}

/// Baseline, elapsed time, relative altitude, index key and raw-sequence
/// speed. Speed deltas run over the unfiltered sample order; the first
/// sample's speed is 0 by rule.
fn derive_rows(samples: &[RawSample]) -> Vec<DerivedRow> {
    let Some(first) = samples.first() else {
        return Vec::new();
    };
    let baseline_time = first.timestamp;
    let baseline_altitude = first.altitude;

    let mut rows = Vec::with_capacity(samples.len());
    let mut previous: Option<(f64, i64)> = None;
    for sample in samples {
        let elapsed_seconds = (sample.timestamp - baseline_time).num_seconds();
        let speed_kmh = match previous {
            None => 0.0,
            Some((prev_distance, prev_elapsed)) => {
                // A zero time delta makes this non-finite; the validity
                // filter drops the row instead of propagating it.
                let delta_seconds = (elapsed_seconds - prev_elapsed) as f64;
                (sample.cumulative_distance - prev_distance) / delta_seconds * 3.6
            }
        };
        previous = Some((sample.cumulative_distance, elapsed_seconds));

        rows.push(DerivedRow {
            index: sample.timestamp.format("%H:%M:%S").to_string(),
            timestamp: sample.raw_timestamp.clone(),
            elapsed_seconds,
            latitude: sample.latitude,
            longitude: sample.longitude,
            altitude: sample.altitude,
            relative_altitude: sample.altitude - baseline_altitude,
            cumulative_distance: sample.cumulative_distance,
            heart_rate: sample.heart_rate,
            speed_kmh,
        });
    }
    rows
}

/// Keeps rows with a plausible speed and a positive cumulative distance.
/// NaN and infinite speeds (zero time deltas) fail the band check.
fn filter_rows(rows: Vec<DerivedRow>) -> Vec<DerivedRow> {
    let before = rows.len();
    let retained: Vec<DerivedRow> = rows
        .into_iter()
        .filter(|row| {
            row.speed_kmh >= 0.0
                && row.speed_kmh <= MAX_PLAUSIBLE_SPEED_KMH
                && row.cumulative_distance > 0.0
        })
        .collect();
    log::debug!("retained {} of {} rows after validity filter", retained.len(), before);
    retained
}

/// Smooths the four channels over the filtered sequence, then derives climb
/// rate and the color column from the smoothed altitude.
fn smooth_rows(rows: Vec<DerivedRow>) -> Result<Vec<EnrichedRow>, TcxError> {
    if rows.len() < MIN_WINDOW {
        return Err(TcxError::InsufficientData(rows.len(), MIN_WINDOW));
    }
    let window = smoothing_window(rows.len());
    log::debug!("smoothing {} rows with window {}", rows.len(), window);

    let altitude: Vec<f64> = rows.iter().map(|r| r.altitude).collect();
    let relative_altitude: Vec<f64> = rows.iter().map(|r| r.relative_altitude).collect();
    let speed: Vec<f64> = rows.iter().map(|r| r.speed_kmh).collect();
    let heart_rate: Vec<f64> = rows.iter().map(|r| f64::from(r.heart_rate)).collect();

    let altitude_smooth = savgol_smooth(&altitude, window);
    let relative_altitude_smooth = savgol_smooth(&relative_altitude, window);
    let speed_smooth = savgol_smooth(&speed, window);
    let heart_rate_smooth = savgol_smooth(&heart_rate, window);

    // The color scale spans the unsmoothed altitude column.
    let altitude_min = altitude.iter().copied().fold(f64::INFINITY, f64::min);
    let altitude_max = altitude.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    let enriched = rows
        .into_iter()
        .enumerate()
        .map(|(i, row)| EnrichedRow {
            index: row.index,
            timestamp: row.timestamp,
            elapsed_seconds: row.elapsed_seconds,
            latitude: row.latitude,
            longitude: row.longitude,
            altitude: row.altitude,
            relative_altitude: row.relative_altitude,
            cumulative_distance: row.cumulative_distance,
            heart_rate: row.heart_rate,
            speed_kmh: row.speed_kmh,
            altitude_smooth: altitude_smooth[i],
            relative_altitude_smooth: relative_altitude_smooth[i],
            speed_smooth: speed_smooth[i],
            heart_rate_smooth: heart_rate_smooth[i],
            climb_rate_smooth: (i > 0).then(|| altitude_smooth[i] - altitude_smooth[i - 1]),
            altitude_color: altitude_hex(altitude_smooth[i], altitude_min, altitude_max),
        })
        .collect();

    Ok(enriched)
}

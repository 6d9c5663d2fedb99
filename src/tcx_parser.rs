use chrono::{DateTime, FixedOffset};
use roxmltree::{Document, Node};

use crate::TcxError;

/// Schema namespace the trackpoints must live under. Elements with the same
/// local name in any other namespace are invisible to the extraction.
pub const TCX_NAMESPACE: &str = "http://www.garmin.com/xmlschemas/TrainingCenterDatabase/v2";

/// One trackpoint as it appears in the source document. Every field is
/// required; a trackpoint missing any of them rejects the whole file.
#[derive(Debug, Clone, PartialEq)]
pub struct RawSample {
    /// Original `<Time>` text, kept verbatim for the summary surface.
    pub raw_timestamp: String,
    pub timestamp: DateTime<FixedOffset>,
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: f64,
    pub cumulative_distance: f64,
    pub heart_rate: u32,
}

/// Parses the byte buffer as XML and extracts all trackpoints in document
/// order. Fails on the first malformed trackpoint rather than skipping it.
pub fn parse_trackpoints(data: &[u8]) -> Result<Vec<RawSample>, TcxError> {
    let text = std::str::from_utf8(data).map_err(|e| TcxError::MalformedInput(e.to_string()))?;
    let document = Document::parse(text).map_err(|e| TcxError::MalformedInput(e.to_string()))?;

    let mut samples = Vec::new();
    for node in document
        .descendants()
        .filter(|n| n.has_tag_name((TCX_NAMESPACE, "Trackpoint")))
    {
        samples.push(extract_sample(samples.len(), node)?);
    }

    if samples.is_empty() {
        return Err(TcxError::NoData);
    }

    log::debug!("extracted {} trackpoints", samples.len());
    Ok(samples)
}

fn extract_sample(index: usize, trackpoint: Node) -> Result<RawSample, TcxError> {
    let time_text = required_text(index, trackpoint, "Time")?;
    let timestamp = DateTime::parse_from_rfc3339(time_text)
        .map_err(|e| TcxError::FieldExtraction(index, format!("invalid Time '{time_text}': {e}")))?;

    let position = child_element(trackpoint, "Position")
        .ok_or_else(|| TcxError::FieldExtraction(index, "missing Position".to_string()))?;
    let latitude = parse_field(index, required_text(index, position, "LatitudeDegrees")?, "LatitudeDegrees")?;
    let longitude = parse_field(index, required_text(index, position, "LongitudeDegrees")?, "LongitudeDegrees")?;

    let altitude = parse_field(index, required_text(index, trackpoint, "AltitudeMeters")?, "AltitudeMeters")?;
    let cumulative_distance =
        parse_field(index, required_text(index, trackpoint, "DistanceMeters")?, "DistanceMeters")?;

    let heart_rate_bpm = child_element(trackpoint, "HeartRateBpm")
        .ok_or_else(|| TcxError::FieldExtraction(index, "missing HeartRateBpm".to_string()))?;
    let heart_rate_text = required_text(index, heart_rate_bpm, "Value")?;
    let heart_rate: u32 = heart_rate_text.parse().map_err(|_| {
        TcxError::FieldExtraction(index, format!("invalid HeartRateBpm Value '{heart_rate_text}'"))
    })?;

    Ok(RawSample {
        raw_timestamp: time_text.to_string(),
        timestamp,
        latitude,
        longitude,
        altitude,
        cumulative_distance,
        heart_rate,
    })
}

fn child_element<'a, 'input>(node: Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
    node.children().find(|c| c.has_tag_name((TCX_NAMESPACE, name)))
}

fn required_text<'a>(index: usize, node: Node<'a, '_>, name: &str) -> Result<&'a str, TcxError> {
    child_element(node, name)
        .and_then(|c| c.text())
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| TcxError::FieldExtraction(index, format!("missing {name}")))
}

fn parse_field(index: usize, text: &str, name: &str) -> Result<f64, TcxError> {
    text.parse()
        .map_err(|_| TcxError::FieldExtraction(index, format!("invalid {name} '{text}'")))
}

// BLOB layout for a stored series: [version: u8][wincode Vec<HistoryPoint>].

use crate::models::{BoundedSeries, HISTORY_CAPACITY, HistoryPoint};

pub(super) const BLOB_VERSION: u8 = 1;

pub(super) fn with_version_prefix(version: u8, payload: Vec<u8>) -> Vec<u8> {
    let mut out = Vec::with_capacity(1 + payload.len());
    out.push(version);
    out.extend_from_slice(&payload);
    out
}

/// Payload after the version byte; an empty blob has no payload.
pub(super) fn blob_payload(bytes: &[u8], expected_version: u8) -> Option<&[u8]> {
    match bytes.split_first() {
        Some((version, payload)) if *version == expected_version => Some(payload),
        _ => None,
    }
}

pub(super) fn encode_series(series: &BoundedSeries) -> anyhow::Result<Vec<u8>> {
    let payload = wincode::serialize(&series.to_vec())
        .map_err(|e| anyhow::anyhow!("wincode series: {}", e))?;
    Ok(with_version_prefix(BLOB_VERSION, payload))
}

/// Strict decode for read-modify-write: an empty blob is an empty series,
/// an unknown version or corrupt payload is an error.
pub(super) fn try_decode_series(bytes: &[u8]) -> anyhow::Result<BoundedSeries> {
    if bytes.is_empty() {
        return Ok(BoundedSeries::new(HISTORY_CAPACITY));
    }
    let payload = blob_payload(bytes, BLOB_VERSION)
        .ok_or_else(|| anyhow::anyhow!("unknown series blob version {}", bytes[0]))?;
    let points = wincode::deserialize::<Vec<HistoryPoint>>(payload)
        .map_err(|e| anyhow::anyhow!("wincode deserialize series: {}", e))?;
    Ok(BoundedSeries::from_points(points, HISTORY_CAPACITY))
}

/// Lenient decode for reads: anything undecodable reads as an empty series.
pub(super) fn decode_series(bytes: &[u8]) -> BoundedSeries {
    try_decode_series(bytes).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "undecodable series blob, reading as empty");
        BoundedSeries::new(HISTORY_CAPACITY)
    })
}

//! Index samples and the chronologically ordered series built from them.

use std::io::Write;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;

/// A per-scene reduction as returned by a sample source, before the
/// missing-value drop.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawSample {
    pub timestamp: DateTime<Utc>,
    /// `None` when the scene had no valid pixel over the AOI.
    pub value: Option<f64>,
}

impl RawSample {
    pub fn new(timestamp: DateTime<Utc>, value: Option<f64>) -> Self {
        Self { timestamp, value }
    }
}

/// Mean index value over the AOI for one scene.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IndexSample {
    #[serde(rename = "date")]
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

/// Samples ordered by non-decreasing timestamp.
///
/// Samples sharing a timestamp are kept, in the order the source returned them.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct IndexSeries {
    name: String,
    samples: Vec<IndexSample>,
}

impl IndexSeries {
    /// Drop missing values and sort chronologically.
    pub fn assemble<I>(name: &str, raw: I) -> Self
    where
        I: IntoIterator<Item = RawSample>,
    {
        let mut dropped = 0usize;
        let mut samples: Vec<IndexSample> = raw
            .into_iter()
            .filter_map(|s| match s.value {
                Some(value) if value.is_finite() => Some(IndexSample {
                    timestamp: s.timestamp,
                    value,
                }),
                _ => {
                    debug!("dropping {} sample at {}: no value", name, s.timestamp);
                    dropped += 1;
                    None
                }
            })
            .collect();

        // Stable, so equal timestamps keep arrival order.
        samples.sort_by_key(|s| s.timestamp);

        debug!(
            "assembled {} {} samples ({} dropped)",
            samples.len(),
            name,
            dropped
        );

        Self {
            name: name.to_string(),
            samples,
        }
    }

    /// Name of the index (used for labels and CSV headers).
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn samples(&self) -> &[IndexSample] {
        &self.samples
    }

    pub fn iter(&self) -> std::slice::Iter<'_, IndexSample> {
        self.samples.iter()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// First and last timestamp, if any samples exist.
    pub fn time_span(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        Some((self.samples.first()?.timestamp, self.samples.last()?.timestamp))
    }

    /// Minimum and maximum value, if any samples exist.
    pub fn value_range(&self) -> Option<(f64, f64)> {
        self.samples.iter().fold(None, |acc, s| match acc {
            None => Some((s.value, s.value)),
            Some((lo, hi)) => Some((lo.min(s.value), hi.max(s.value))),
        })
    }

    /// Write `date,value` rows (RFC 3339 dates) to any writer.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut wtr = csv::Writer::from_writer(writer);
        for sample in &self.samples {
            wtr.serialize(sample)?;
        }
        if self.samples.is_empty() {
            wtr.write_record(["date", "value"])?;
        }
        wtr.flush()?;
        Ok(())
    }

    /// Write the series as CSV to a file, replacing it.
    pub fn save_csv(&self, path: &Path) -> Result<()> {
        let file = std::fs::File::create(path)?;
        self.write_csv(std::io::BufWriter::new(file))
    }
}

impl<'a> IntoIterator for &'a IndexSeries {
    type Item = &'a IndexSample;
    type IntoIter = std::slice::Iter<'a, IndexSample>;

    fn into_iter(self) -> Self::IntoIter {
        self.samples.iter()
    }
}

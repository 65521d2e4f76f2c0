// Persisted history: metric kinds, timestamped points, bounded per-metric series.

use std::collections::VecDeque;
use std::fmt;

use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use wincode::{SchemaRead, SchemaWrite};

/// Maximum points kept per application per metric kind.
pub const HISTORY_CAPACITY: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    Cpu,
    Memory,
    Disk,
    Network,
}

impl MetricKind {
    pub const ALL: [MetricKind; 4] = [
        MetricKind::Cpu,
        MetricKind::Memory,
        MetricKind::Disk,
        MetricKind::Network,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKind::Cpu => "cpu",
            MetricKind::Memory => "memory",
            MetricKind::Disk => "disk",
            MetricKind::Network => "network",
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One persisted sample. `timestamp` is Unix epoch milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, SchemaRead, SchemaWrite)]
pub struct HistoryPoint {
    pub timestamp: i64,
    pub value: f64,
}

/// Oldest-first series that drops from the front once `capacity` is reached.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundedSeries {
    points: VecDeque<HistoryPoint>,
    capacity: usize,
}

impl BoundedSeries {
    pub fn new(capacity: usize) -> Self {
        Self {
            points: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Builds a series from stored points, keeping only the newest `capacity`.
    pub fn from_points(points: Vec<HistoryPoint>, capacity: usize) -> Self {
        let mut series = Self {
            points: VecDeque::from(points),
            capacity,
        };
        series.trim();
        series
    }

    pub fn push(&mut self, point: HistoryPoint) {
        self.points.push_back(point);
        self.trim();
    }

    fn trim(&mut self) {
        while self.points.len() > self.capacity {
            self.points.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn iter(&self) -> impl Iterator<Item = &HistoryPoint> {
        self.points.iter()
    }

    pub fn last(&self) -> Option<&HistoryPoint> {
        self.points.back()
    }

    pub fn to_vec(&self) -> Vec<HistoryPoint> {
        self.points.iter().copied().collect()
    }
}

impl Serialize for BoundedSeries {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.points.iter())
    }
}

/// Rolling history for one canonical application name.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppUsageHistory {
    pub name: String,
    pub cpu: BoundedSeries,
    pub memory: BoundedSeries,
    pub disk: BoundedSeries,
    pub network: BoundedSeries,
}

impl AppUsageHistory {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cpu: BoundedSeries::new(HISTORY_CAPACITY),
            memory: BoundedSeries::new(HISTORY_CAPACITY),
            disk: BoundedSeries::new(HISTORY_CAPACITY),
            network: BoundedSeries::new(HISTORY_CAPACITY),
        }
    }

    pub fn series(&self, kind: MetricKind) -> &BoundedSeries {
        match kind {
            MetricKind::Cpu => &self.cpu,
            MetricKind::Memory => &self.memory,
            MetricKind::Disk => &self.disk,
            MetricKind::Network => &self.network,
        }
    }

    pub fn series_mut(&mut self, kind: MetricKind) -> &mut BoundedSeries {
        match kind {
            MetricKind::Cpu => &mut self.cpu,
            MetricKind::Memory => &mut self.memory,
            MetricKind::Disk => &mut self.disk,
            MetricKind::Network => &mut self.network,
        }
    }

    /// Appends a point unless `value` is zero, negative or non-finite.
    /// Returns whether the point was stored.
    pub fn record(&mut self, kind: MetricKind, timestamp: i64, value: f64) -> bool {
        if !(value.is_finite() && value > 0.0) {
            return false;
        }
        self.series_mut(kind).push(HistoryPoint { timestamp, value });
        true
    }
}

// Domain models

mod history;
mod process;
mod system;
mod usage;

pub use history::{AppUsageHistory, BoundedSeries, HISTORY_CAPACITY, HistoryPoint, MetricKind};
pub use process::{
    ConnectionSet, CpuMemoryMap, CpuMemorySample, DiskIoMap, DiskIoSample, MetricSet,
    ProcessRecord, RawMetricSample,
};
pub use system::{CpuTotals, MemoryTotals, NetworkTotals, SystemTotals};
pub use usage::{AggregatedAppUsage, AppUsageEntry};

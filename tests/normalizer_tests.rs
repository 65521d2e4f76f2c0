// Ranking and formatting of aggregated usage

mod common;

use appusage::models::{AggregatedAppUsage, MetricKind};
use appusage::normalizer::*;
use common::numeric;

fn cpu(name: &str, total: f64, processes: u32) -> AggregatedAppUsage {
    AggregatedAppUsage {
        cpu_total: total,
        cpu_processes: processes,
        process_count: processes,
        ..AggregatedAppUsage::new(name)
    }
}

fn memory(name: &str, bytes: u64, processes: u32) -> AggregatedAppUsage {
    AggregatedAppUsage {
        memory_total_bytes: bytes,
        memory_processes: processes,
        process_count: processes,
        ..AggregatedAppUsage::new(name)
    }
}

#[test]
fn single_app_takes_the_whole_cpu_share() {
    let rows = cpu_shares(&[cpu("Google Chrome", 15.0, 2)]);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].name, "Google Chrome");
    assert_eq!(rows[0].value, "100.00%");
    assert_eq!(rows[0].process_count, 2);
}

#[test]
fn cpu_shares_sum_to_one_hundred() {
    let usages = vec![
        cpu("a", 12.5, 1),
        cpu("b", 3.3, 2),
        cpu("c", 40.1, 3),
        cpu("d", 0.7, 1),
    ];
    let rows = cpu_shares(&usages);
    let sum: f64 = rows.iter().map(|r| numeric(&r.value)).sum();
    assert!((sum - 100.0).abs() < 0.05, "sum was {}", sum);
    let names: Vec<&str> = rows.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["c", "a", "b", "d"]);
}

#[test]
fn zero_total_cpu_reads_zero_percent() {
    let rows = cpu_shares(&[cpu("a", 0.0, 1), cpu("b", 0.0, 3)]);
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().all(|r| r.value == "0%"));
}

#[test]
fn identities_without_cpu_readings_are_not_ranked() {
    let usages = vec![cpu("a", 5.0, 1), memory("b", 1_000, 1)];
    let rows = cpu_shares(&usages);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].name, "a");
}

#[test]
fn rankings_are_capped_at_top_n() {
    let usages: Vec<AggregatedAppUsage> = (0..30)
        .map(|i| memory(&format!("app{i}"), (i + 1) * 1_000_000, 1))
        .collect();
    let rows = memory_ranking(&usages);
    assert_eq!(rows.len(), TOP_N);
    assert_eq!(rows[0].name, "app29");
    assert_eq!(rows[0].value, "30.00 MB");
    assert_eq!(rows[TOP_N - 1].name, "app10");
}

#[test]
fn megabytes_are_decimal() {
    let rows = memory_ranking(&[memory("a", 1_500_000, 2)]);
    assert_eq!(rows[0].value, "1.50 MB");
    assert_eq!(rows[0].process_count, 2);

    let disk = AggregatedAppUsage {
        disk_total_bytes: 2_345_678,
        disk_processes: 1,
        ..AggregatedAppUsage::new("d")
    };
    let rows = disk_ranking(&[disk]);
    assert_eq!(rows[0].value, "2.35 MB");
}

#[test]
fn ties_keep_aggregation_order() {
    let usages = vec![
        memory("first", 5_000_000, 1),
        memory("second", 5_000_000, 1),
        memory("third", 5_000_000, 1),
    ];
    let names: Vec<String> = memory_ranking(&usages).into_iter().map(|r| r.name).collect();
    assert_eq!(names, vec!["first", "second", "third"]);

    let usages = vec![cpu("x", 1.0, 1), cpu("y", 1.0, 1)];
    let names: Vec<String> = cpu_shares(&usages).into_iter().map(|r| r.name).collect();
    assert_eq!(names, vec!["x", "y"]);
}

#[test]
fn network_ranking_sorts_by_process_count() {
    let usages = vec![
        AggregatedAppUsage {
            connection_count: 1,
            network_processes: 1,
            ..AggregatedAppUsage::new("one")
        },
        AggregatedAppUsage {
            connection_count: 4,
            network_processes: 4,
            ..AggregatedAppUsage::new("four")
        },
        AggregatedAppUsage::new("none"),
    ];
    let rows = network_ranking(&usages);
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].name, "four");
    assert_eq!(rows[0].value, "4 connections");
    assert_eq!(rows[1].value, "1 connections");
}

#[test]
fn rank_dispatches_by_kind() {
    let usages = vec![cpu("a", 2.0, 1), memory("b", 3_000_000, 1)];
    assert_eq!(rank(MetricKind::Cpu, &usages)[0].name, "a");
    assert_eq!(rank(MetricKind::Memory, &usages)[0].name, "b");
    assert!(rank(MetricKind::Disk, &usages).is_empty());
    assert!(rank(MetricKind::Network, &usages).is_empty());
}

#[test]
fn history_values_drop_zeros_and_convert_units() {
    let usage = AggregatedAppUsage {
        cpu_total: 12.5,
        memory_total_bytes: 250_000_000,
        disk_total_bytes: 0,
        connection_count: 3,
        ..AggregatedAppUsage::new("a")
    };
    assert_eq!(
        history_values(&usage),
        vec![
            (MetricKind::Cpu, 12.5),
            (MetricKind::Memory, 250.0),
            (MetricKind::Network, 3.0),
        ]
    );
    assert!(history_values(&AggregatedAppUsage::new("idle")).is_empty());
}

#[test]
fn round2_rounds_half_away_from_zero() {
    assert_eq!(round2(1.005_1), 1.01);
    assert_eq!(round2(2.344), 2.34);
}

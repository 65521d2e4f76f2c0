// HistoryRepo tests: connect, init, upsert, bounded series, list, reconnect

use appusage::error::UsageError;
use appusage::history_repo::{HistoryRepo, HistoryStore};
use appusage::models::*;
use tempfile::TempDir;

async fn open(dir: &TempDir) -> HistoryRepo {
    let path = dir.path().join("history.db");
    let repo = HistoryRepo::connect(path.to_str().unwrap(), 2)
        .await
        .unwrap();
    repo.init().await.unwrap();
    repo
}

#[tokio::test]
async fn history_repo_connect_and_init() {
    let dir = TempDir::new().unwrap();
    let repo = open(&dir).await;
    // Second init is a no-op (IF NOT EXISTS)
    repo.init().await.unwrap();
    assert!(repo.list_applications().await.unwrap().is_empty());
}

#[tokio::test]
async fn history_repo_creates_parent_directory() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("data").join("history.db");
    let repo = HistoryRepo::connect(path.to_str().unwrap(), 1)
        .await
        .unwrap();
    repo.init().await.unwrap();
    assert!(path.exists());
}

#[tokio::test]
async fn history_repo_first_point_creates_record() {
    let dir = TempDir::new().unwrap();
    let repo = open(&dir).await;

    repo.record("Google Chrome", MetricKind::Cpu, 1_000, 42.5)
        .await
        .unwrap();

    let history = repo.get_history("Google Chrome").await.unwrap().unwrap();
    assert_eq!(history.name, "Google Chrome");
    assert_eq!(
        history.cpu.to_vec(),
        vec![HistoryPoint {
            timestamp: 1_000,
            value: 42.5
        }]
    );
    assert!(history.memory.is_empty());
    assert!(history.disk.is_empty());
    assert!(history.network.is_empty());
}

#[tokio::test]
async fn history_repo_keeps_last_hundred_points_in_order() {
    let dir = TempDir::new().unwrap();
    let repo = open(&dir).await;

    for ts in 1..=150i64 {
        repo.record("VS Code", MetricKind::Memory, ts, ts as f64)
            .await
            .unwrap();
    }

    let history = repo.get_history("VS Code").await.unwrap().unwrap();
    assert_eq!(history.memory.len(), HISTORY_CAPACITY);
    let stamps: Vec<i64> = history.memory.iter().map(|p| p.timestamp).collect();
    let expected: Vec<i64> = (51..=150).collect();
    assert_eq!(stamps, expected);
    assert_eq!(history.memory.last().map(|p| p.value), Some(150.0));
}

#[tokio::test]
async fn history_repo_zero_value_does_not_create_record() {
    let dir = TempDir::new().unwrap();
    let repo = open(&dir).await;

    repo.record("Node.js", MetricKind::Disk, 1, 0.0).await.unwrap();
    repo.upsert_points("Node.js", 2, &[(MetricKind::Cpu, -1.0), (MetricKind::Network, f64::NAN)])
        .await
        .unwrap();

    assert!(repo.get_history("Node.js").await.unwrap().is_none());
    assert!(repo.list_applications().await.unwrap().is_empty());
}

#[tokio::test]
async fn history_repo_zero_value_leaves_existing_series_untouched() {
    let dir = TempDir::new().unwrap();
    let repo = open(&dir).await;

    repo.record("Docker", MetricKind::Cpu, 1, 3.0).await.unwrap();
    repo.record("Docker", MetricKind::Cpu, 2, 0.0).await.unwrap();

    let history = repo.get_history("Docker").await.unwrap().unwrap();
    assert_eq!(history.cpu.len(), 1);
}

#[tokio::test]
async fn history_repo_metric_series_are_independent() {
    let dir = TempDir::new().unwrap();
    let repo = open(&dir).await;

    repo.upsert_points(
        "Microsoft Teams",
        10,
        &[
            (MetricKind::Cpu, 5.0),
            (MetricKind::Memory, 300.0),
            (MetricKind::Network, 2.0),
        ],
    )
    .await
    .unwrap();
    repo.upsert_points("Microsoft Teams", 20, &[(MetricKind::Cpu, 7.0)])
        .await
        .unwrap();

    let history = repo.get_history("Microsoft Teams").await.unwrap().unwrap();
    assert_eq!(history.cpu.len(), 2);
    assert_eq!(history.memory.len(), 1);
    assert_eq!(history.disk.len(), 0);
    assert_eq!(history.network.len(), 1);
    assert_eq!(history.series(MetricKind::Network).last().map(|p| p.value), Some(2.0));
}

#[tokio::test]
async fn history_repo_list_applications_most_recent_first() {
    let dir = TempDir::new().unwrap();
    let repo = open(&dir).await;

    repo.record("a", MetricKind::Cpu, 100, 1.0).await.unwrap();
    repo.record("b", MetricKind::Cpu, 300, 1.0).await.unwrap();
    repo.record("c", MetricKind::Cpu, 200, 1.0).await.unwrap();

    assert_eq!(repo.list_applications().await.unwrap(), vec!["b", "c", "a"]);
}

#[tokio::test]
async fn history_repo_unknown_app_is_none() {
    let dir = TempDir::new().unwrap();
    let repo = open(&dir).await;
    assert!(repo.get_history("nope").await.unwrap().is_none());
}

#[tokio::test]
async fn history_repo_persists_across_reconnect() {
    let dir = TempDir::new().unwrap();
    {
        let repo = open(&dir).await;
        repo.record("WhatsApp", MetricKind::Memory, 5, 120.0)
            .await
            .unwrap();
    }
    let repo = open(&dir).await;
    let history = repo.get_history("WhatsApp").await.unwrap().unwrap();
    assert_eq!(history.memory.to_vec()[0].value, 120.0);
}

#[tokio::test]
async fn history_repo_concurrent_writers_lose_nothing() {
    let dir = TempDir::new().unwrap();
    let repo = std::sync::Arc::new(open(&dir).await);

    let mut handles = Vec::new();
    for ts in 0..20i64 {
        let repo = repo.clone();
        handles.push(tokio::spawn(async move {
            repo.record("OneDrive", MetricKind::Disk, ts, 1.0 + ts as f64)
                .await
                .unwrap();
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let history = repo.get_history("OneDrive").await.unwrap().unwrap();
    assert_eq!(history.disk.len(), 20);
}

#[tokio::test]
async fn history_repo_undecodable_series_fails_write_and_is_kept() {
    let dir = TempDir::new().unwrap();
    let repo = open(&dir).await;
    for ts in 1..=5i64 {
        repo.record("Docker", MetricKind::Cpu, ts, ts as f64)
            .await
            .unwrap();
    }

    // Blob written by a newer build: unknown version prefix.
    let path = dir.path().join("history.db");
    let raw = sqlx::SqlitePool::connect(&format!("sqlite:{}", path.to_str().unwrap()))
        .await
        .unwrap();
    let newer: Vec<u8> = vec![0x02, 0xDE, 0xAD, 0xBE, 0xEF];
    sqlx::query("UPDATE app_usage SET cpu_data = $1 WHERE name = $2")
        .bind(&newer)
        .bind("Docker")
        .execute(&raw)
        .await
        .unwrap();

    let err = repo
        .record("Docker", MetricKind::Memory, 6, 10.0)
        .await
        .unwrap_err();
    assert!(matches!(err, UsageError::PersistenceFailure { .. }), "{err}");

    let (cpu_data, memory_data): (Vec<u8>, Vec<u8>) =
        sqlx::query_as("SELECT cpu_data, memory_data FROM app_usage WHERE name = $1")
            .bind("Docker")
            .fetch_one(&raw)
            .await
            .unwrap();
    assert_eq!(cpu_data, newer);
    assert_eq!(memory_data.len(), 1 + 8, "memory series should still be empty");

    // Reads stay lenient: the undecodable series reads as empty.
    let history = repo.get_history("Docker").await.unwrap().unwrap();
    assert!(history.cpu.is_empty());
    assert!(history.memory.is_empty());
}

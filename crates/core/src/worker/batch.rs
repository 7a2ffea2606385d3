//! Bulk-then-individual fallback combinator.
//!
//! Try an all-or-nothing bulk operation first; if it fails, run the
//! per-item operation on every item independently so one bad item cannot
//! sink the rest.

use std::fmt::Display;
use std::future::Future;

use serde::{Deserialize, Serialize};

/// How a batch was carried out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchMode {
    Bulk,
    Individual,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchFailure<T> {
    pub item: T,
    pub error: String,
}

/// Per-item outcome of a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchReport<T> {
    pub mode: BatchMode,
    pub succeeded: Vec<T>,
    pub failed: Vec<BatchFailure<T>>,
    /// Why the bulk attempt was abandoned, if it was.
    pub bulk_error: Option<String>,
}

/// Run `bulk` over all items; on failure fall back to `each` per item.
pub async fn bulk_or_each<T, E, B, BFut, F, FFut>(items: Vec<T>, bulk: B, each: F) -> BatchReport<T>
where
    T: Clone,
    E: Display,
    B: FnOnce(Vec<T>) -> BFut,
    BFut: Future<Output = Result<(), E>>,
    F: FnMut(T) -> FFut,
    FFut: Future<Output = Result<(), E>>,
{
    match bulk(items.clone()).await {
        Ok(()) => BatchReport { mode: BatchMode::Bulk, succeeded: items, failed: Vec::new(), bulk_error: None },
        Err(e) => {
            tracing::warn!("bulk operation failed, retrying items individually: {e}");
            let mut report = each_independent(items, each).await;
            report.bulk_error = Some(e.to_string());
            report
        }
    }
}

/// Run `each` on every item in order, collecting outcomes without stopping.
pub async fn each_independent<T, E, F, FFut>(items: Vec<T>, mut each: F) -> BatchReport<T>
where
    T: Clone,
    E: Display,
    F: FnMut(T) -> FFut,
    FFut: Future<Output = Result<(), E>>,
{
    let mut succeeded = Vec::with_capacity(items.len());
    let mut failed = Vec::new();

    for item in items {
        match each(item.clone()).await {
            Ok(()) => succeeded.push(item),
            Err(e) => failed.push(BatchFailure { item, error: e.to_string() }),
        }
    }

    BatchReport { mode: BatchMode::Individual, succeeded, failed, bulk_error: None }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[tokio::test]
    async fn test_bulk_success_skips_individual() {
        let individual = Mutex::new(0);
        let report = bulk_or_each(
            vec![1, 2, 3],
            |_| async { Ok::<(), String>(()) },
            |_| {
                *individual.lock().unwrap() += 1;
                async { Ok(()) }
            },
        )
        .await;

        assert_eq!(report.mode, BatchMode::Bulk);
        assert_eq!(report.succeeded, vec![1, 2, 3]);
        assert!(report.failed.is_empty());
        assert_eq!(*individual.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_bulk_failure_isolates_bad_items() {
        let report = bulk_or_each(
            vec![1, 2, 3, 4],
            |_| async { Err::<(), String>("one item failed".into()) },
            |n| async move { if n % 2 == 0 { Err(format!("{n} is even")) } else { Ok(()) } },
        )
        .await;

        assert_eq!(report.mode, BatchMode::Individual);
        assert_eq!(report.succeeded, vec![1, 3]);
        assert_eq!(report.failed.len(), 2);
        assert_eq!(report.failed[0], BatchFailure { item: 2, error: "2 is even".into() });
        assert_eq!(report.bulk_error.as_deref(), Some("one item failed"));
    }

    #[tokio::test]
    async fn test_each_independent_keeps_order() {
        let report =
            each_independent(vec!["a", "b"], |s| async move { if s == "a" { Err("nope") } else { Ok(()) } }).await;
        assert_eq!(report.succeeded, vec!["b"]);
        assert_eq!(report.failed[0].item, "a");
        assert_eq!(report.failed.len(), 1);
    }
}

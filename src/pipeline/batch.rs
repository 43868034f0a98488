use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use super::convert::{convert_one, ConversionOutcome, SourceItem};

/// Overall verdict for one conversion batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchDecision {
    AllSucceeded,
    PartialFailure,
    TotalFailure,
}

/// One failed item, as surfaced to the caller alongside any successes.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct FailureDetail {
    pub source: String,
    pub reason: String,
}

/// Aggregate of every item's outcome for one request, plus the derived
/// decision. Holds exactly one outcome per source item; outcome order is
/// unspecified because parallel completion order is not deterministic.
#[derive(Debug)]
pub struct BatchResult {
    pub outcomes: Vec<ConversionOutcome>,
    pub decision: BatchDecision,
}

impl BatchResult {
    pub fn from_outcomes(outcomes: Vec<ConversionOutcome>) -> Self {
        let converted = outcomes.iter().filter(|o| o.is_converted()).count();
        let decision = if converted == 0 {
            BatchDecision::TotalFailure
        } else if converted == outcomes.len() {
            BatchDecision::AllSucceeded
        } else {
            BatchDecision::PartialFailure
        };
        Self { outcomes, decision }
    }

    /// Output names of every converted item.
    pub fn converted_names(&self) -> Vec<String> {
        self.outcomes
            .iter()
            .filter_map(|o| match o {
                ConversionOutcome::Converted { output, .. } => Some(output.clone()),
                ConversionOutcome::Failed { .. } => None,
            })
            .collect()
    }

    pub fn failures(&self) -> Vec<FailureDetail> {
        self.outcomes
            .iter()
            .filter_map(|o| match o {
                ConversionOutcome::Failed { source, reason } => Some(FailureDetail {
                    source: source.clone(),
                    reason: reason.clone(),
                }),
                ConversionOutcome::Converted { .. } => None,
            })
            .collect()
    }
}

/// Convert every source item into `output_dir`, fanning the CPU-bound work
/// out across at most `pool_size` blocking workers.
///
/// The semaphore bounds how many conversions run at once, so a large batch
/// never spawns one thread per item. Workers share nothing: each converts
/// a disjoint item into a disjoint output file. All outcomes are collected
/// regardless of completion order, one per item.
pub async fn convert_batch(
    items: Vec<SourceItem>,
    output_dir: &Path,
    pool_size: usize,
) -> BatchResult {
    let total = items.len();
    let semaphore = Arc::new(Semaphore::new(pool_size.max(1)));
    let mut tasks: JoinSet<ConversionOutcome> = JoinSet::new();

    for item in items {
        let semaphore = semaphore.clone();
        let output_dir = output_dir.to_path_buf();
        tasks.spawn(async move {
            let _permit = match semaphore.acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => {
                    return ConversionOutcome::Failed {
                        source: item.source_name.clone(),
                        reason: "worker pool shut down".into(),
                    }
                }
            };
            let source_name = item.source_name.clone();
            match tokio::task::spawn_blocking(move || convert_one(&item, &output_dir)).await {
                Ok(outcome) => outcome,
                Err(e) => ConversionOutcome::Failed {
                    source: source_name,
                    reason: format!("conversion worker aborted: {e}"),
                },
            }
        });
    }

    let mut outcomes = Vec::with_capacity(total);
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(outcome) => outcomes.push(outcome),
            Err(e) => {
                tracing::error!(error = %e, "conversion task join failed");
                outcomes.push(ConversionOutcome::Failed {
                    source: "<unknown>".into(),
                    reason: format!("conversion task aborted: {e}"),
                });
            }
        }
    }

    let result = BatchResult::from_outcomes(outcomes);
    tracing::info!(
        total,
        converted = result.converted_names().len(),
        failed = result.failures().len(),
        decision = ?result.decision,
        "batch conversion finished"
    );
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::testutil::write_test_dicom;

    fn well_formed(dir: &Path, name: &str) -> SourceItem {
        let path = dir.join(name);
        write_test_dicom(&path, 8, 8, &[42u8; 64]);
        item(path, name)
    }

    fn malformed(dir: &Path, name: &str) -> SourceItem {
        let path = dir.join(name);
        std::fs::write(&path, b"not a dicom").unwrap();
        item(path, name)
    }

    fn item(path: std::path::PathBuf, name: &str) -> SourceItem {
        let stem = name.strip_suffix(".dcm").unwrap_or(name);
        SourceItem {
            path,
            source_name: name.to_string(),
            output_name: format!("{stem}.png"),
        }
    }

    #[tokio::test]
    async fn all_well_formed_items_succeed() {
        let src = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let items = vec![
            well_formed(src.path(), "a.dcm"),
            well_formed(src.path(), "b.dcm"),
            well_formed(src.path(), "c.dcm"),
        ];

        let result = convert_batch(items, out.path(), 2).await;
        assert_eq!(result.decision, BatchDecision::AllSucceeded);
        assert_eq!(result.outcomes.len(), 3);
        assert_eq!(result.converted_names().len(), 3);
        for name in result.converted_names() {
            assert!(out.path().join(name).exists());
        }
    }

    #[tokio::test]
    async fn mixed_batch_keeps_one_outcome_per_item() {
        let src = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let items = vec![
            well_formed(src.path(), "good_one.dcm"),
            malformed(src.path(), "bad.dcm"),
            well_formed(src.path(), "good_two.dcm"),
            malformed(src.path(), "worse.dcm"),
        ];

        let result = convert_batch(items, out.path(), 4).await;
        assert_eq!(result.decision, BatchDecision::PartialFailure);
        assert_eq!(result.outcomes.len(), 4);

        let failures = result.failures();
        assert_eq!(failures.len(), 2);
        let mut failed_sources: Vec<_> =
            failures.iter().map(|f| f.source.as_str()).collect();
        failed_sources.sort_unstable();
        assert_eq!(failed_sources, vec!["bad.dcm", "worse.dcm"]);
        assert!(failures.iter().all(|f| !f.reason.is_empty()));

        let mut converted = result.converted_names();
        converted.sort_unstable();
        assert_eq!(converted, vec!["good_one.png", "good_two.png"]);
    }

    #[tokio::test]
    async fn all_malformed_is_total_failure() {
        let src = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let items = vec![
            malformed(src.path(), "x.dcm"),
            malformed(src.path(), "y.dcm"),
        ];

        let result = convert_batch(items, out.path(), 2).await;
        assert_eq!(result.decision, BatchDecision::TotalFailure);
        assert_eq!(result.failures().len(), 2);
        assert!(result.converted_names().is_empty());
    }

    #[tokio::test]
    async fn pool_size_one_still_converts_everything() {
        let src = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let items: Vec<_> = (0..6)
            .map(|i| well_formed(src.path(), &format!("scan_{i}.dcm")))
            .collect();

        let result = convert_batch(items, out.path(), 1).await;
        assert_eq!(result.decision, BatchDecision::AllSucceeded);
        assert_eq!(result.outcomes.len(), 6);
    }

    #[test]
    fn decision_derivation() {
        use ConversionOutcome::*;
        let ok = Converted {
            source: "a.dcm".into(),
            output: "a.png".into(),
        };
        let bad = Failed {
            source: "b.dcm".into(),
            reason: "broken".into(),
        };

        let all = BatchResult::from_outcomes(vec![ok.clone(), ok.clone()]);
        assert_eq!(all.decision, BatchDecision::AllSucceeded);

        let mixed = BatchResult::from_outcomes(vec![ok.clone(), bad.clone()]);
        assert_eq!(mixed.decision, BatchDecision::PartialFailure);

        let none = BatchResult::from_outcomes(vec![bad.clone(), bad]);
        assert_eq!(none.decision, BatchDecision::TotalFailure);
    }
}

//! Section orchestrator
//!
//! Fans section jobs out under a concurrency limit and a run deadline, and
//! gathers exactly one result per descriptor, placed by outline position
//! regardless of completion order.

use crate::pipeline::section::SectionRunner;
use crate::pipeline::types::{
    AggregateStatus, ErrorInfo, FailureKind, ProgressEvent, RunReport, SectionDescriptor,
    SectionResult,
};
use futures_util::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::Instant;

/// Run every descriptor through `runner`
///
/// At most `concurrency_limit` jobs run at once. When `deadline` passes,
/// unfinished jobs are aborted and their slots are filled with
/// `Timeout` failures. A job that panics yields an `Internal` failure for
/// its slot only.
pub async fn run(
    descriptors: &[SectionDescriptor],
    runner: Arc<dyn SectionRunner>,
    concurrency_limit: usize,
    deadline: Instant,
    progress: Option<&UnboundedSender<ProgressEvent>>,
) -> RunReport {
    let started = Instant::now();
    let limit = concurrency_limit.max(1);
    let semaphore = Arc::new(Semaphore::new(limit));
    let mut join_set: JoinSet<(usize, SectionResult)> = JoinSet::new();

    tracing::info!(
        sections = descriptors.len(),
        concurrency_limit = limit,
        "Starting section generation"
    );

    for (slot, descriptor) in descriptors.iter().enumerate() {
        let semaphore = semaphore.clone();
        let runner = runner.clone();
        let descriptor = descriptor.clone();
        let progress = progress.cloned();

        join_set.spawn(async move {
            let _permit = match semaphore.acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => {
                    let error = ErrorInfo::new(FailureKind::Internal, "concurrency limiter closed");
                    return (slot, SectionResult::failed(slot, error, 0));
                }
            };

            emit(progress.as_ref(), ProgressEvent::SectionStarted { index: slot });

            let outcome = AssertUnwindSafe(runner.generate(&descriptor))
                .catch_unwind()
                .await;
            let result = match outcome {
                Ok(result) => result,
                Err(_) => {
                    tracing::error!(index = slot, "Section job panicked");
                    SectionResult::failed(
                        slot,
                        ErrorInfo::new(FailureKind::Internal, "section job panicked"),
                        0,
                    )
                }
            };
            (slot, result)
        });
    }

    let mut slots: Vec<Option<SectionResult>> = vec![None; descriptors.len()];
    let mut deadline_hit = false;

    loop {
        match tokio::time::timeout_at(deadline, join_set.join_next()).await {
            Ok(Some(Ok((slot, mut result)))) => {
                result.index = slot;
                tracing::debug!(index = slot, status = ?result.status, "Section finished");
                emit(
                    progress,
                    ProgressEvent::SectionCompleted {
                        index: slot,
                        status: result.status,
                    },
                );
                slots[slot] = Some(result);
            }
            Ok(Some(Err(e))) => {
                // slot stays empty and is reported as Internal below
                tracing::error!(error = %e, "Section job was lost");
            }
            Ok(None) => break,
            Err(_) => {
                deadline_hit = true;
                let pending = slots.iter().filter(|s| s.is_none()).count();
                tracing::warn!(pending = pending, "Run deadline elapsed, aborting pending sections");
                join_set.abort_all();
                break;
            }
        }
    }

    let results: Vec<SectionResult> = slots
        .into_iter()
        .enumerate()
        .map(|(slot, result)| match result {
            Some(result) => result,
            None => {
                let result = if deadline_hit {
                    SectionResult::timed_out(slot)
                } else {
                    SectionResult::failed(
                        slot,
                        ErrorInfo::new(FailureKind::Internal, "section job did not report a result"),
                        0,
                    )
                };
                emit(
                    progress,
                    ProgressEvent::SectionCompleted {
                        index: slot,
                        status: result.status,
                    },
                );
                result
            }
        })
        .collect();

    let status = AggregateStatus::from_results(&results);
    let elapsed = started.elapsed();
    tracing::info!(
        status = %status,
        elapsed_ms = elapsed.as_millis() as u64,
        "Section generation finished"
    );

    RunReport {
        results,
        status,
        elapsed,
    }
}

fn emit(progress: Option<&UnboundedSender<ProgressEvent>>, event: ProgressEvent) {
    if let Some(tx) = progress {
        // the receiver may already be gone (client disconnected)
        let _ = tx.send(event);
    }
}

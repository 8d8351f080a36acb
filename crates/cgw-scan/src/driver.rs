//! # Session Driver
//!
//! Folds [`ScanEvent`]s into a [`Session`].

use tokio::sync::mpsc;

use cgw_state::{ScanSummary, Session, Stage, StageError};

use crate::scanner::{event_capacity, ScanError, ScanEvent, Scanner};

/// Apply one scan event. Returns `true` once the session has left
/// SCANNING because every check settled.
///
/// Events for any scan other than the session's current one fail with
/// [`StageError::StaleScan`].
pub fn apply_event(session: &mut Session, event: &ScanEvent) -> Result<bool, StageError> {
    match event {
        ScanEvent::CheckStarted { scan_id, check_id } => {
            session.mark_running(*scan_id, check_id)?;
            Ok(false)
        }
        ScanEvent::CheckSettled {
            scan_id,
            check_id,
            outcome,
            duration_ms,
        } => {
            let completed = session.settle(*scan_id, check_id, *outcome, *duration_ms)?;
            if completed {
                tracing::info!(
                    session_id = %session.id(),
                    %scan_id,
                    to = %session.stage(),
                    "scan complete"
                );
            }
            Ok(completed)
        }
        ScanEvent::ScanFinished { scan_id, .. } => {
            if session.scan_id() != Some(*scan_id) {
                return Err(StageError::StaleScan {
                    current: session.scan_id(),
                    got: *scan_id,
                });
            }
            Ok(session.stage() != Stage::Scanning)
        }
    }
}

/// Start a scan on `session`, run it to completion and apply every event
/// as it arrives.
pub async fn drive(session: &mut Session, scanner: &mut Scanner) -> Result<ScanSummary, ScanError> {
    let ticket = session.start_scan()?;
    let (tx, mut rx) = mpsc::channel(event_capacity(ticket.plan.len()));

    let target = &mut *session;
    let consume = async move {
        while let Some(event) = rx.recv().await {
            apply_event(target, &event)?;
        }
        Ok::<(), StageError>(())
    };

    let (run, applied) = tokio::join!(scanner.run(&ticket, tx), consume);
    applied?;
    run?;
    Ok(session.summary())
}

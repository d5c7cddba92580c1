//! Outcome events delivered from a running conversion to its observer.
//!
//! A conversion emits zero or more [`ConversionOutcome::Progress`] events
//! followed by exactly one terminal event, [`ConversionOutcome::Success`] or
//! [`ConversionOutcome::Failure`]. Events travel over a Tokio mpsc channel
//! owned by [`crate::worker::ConversionHandle`]; this module holds the
//! event type and the sending half used by the pipeline routines.
//!
//! # Ordering
//!
//! [`ProgressReporter`] remembers the highest percent it has emitted and
//! never sends a lower one, so observers always see a non-decreasing
//! sequence even if a routine miscomputes a value.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use tracing::warn;

/// One event in a conversion's observable lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "value", rename_all = "snake_case")]
pub enum ConversionOutcome {
    /// Non-terminal: percent complete, 0–100.
    Progress(u8),
    /// Terminal: the output file was written to this path.
    Success(PathBuf),
    /// Terminal: human-readable reason, prefixed with the routine name.
    Failure(String),
}

impl ConversionOutcome {
    /// `true` for [`ConversionOutcome::Success`] and [`ConversionOutcome::Failure`].
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ConversionOutcome::Progress(_))
    }
}

/// Percent of paragraphs processed, rounded to the nearest integer.
///
/// An empty document counts as complete (100) rather than dividing by zero.
pub fn percent_complete(processed: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    let processed = processed.min(total) as u128;
    let total = total as u128;
    // round-half-up without going through floats
    ((processed * 200 + total) / (total * 2)) as u8
}

/// Sending side for progress events, shared by the routines of one conversion.
///
/// Cloning is cheap; all clones share the same high-water mark. Terminal
/// events are not sent through this type; the worker sends those itself once
/// every routine has returned.
#[derive(Debug, Clone)]
pub struct ProgressReporter {
    tx: UnboundedSender<ConversionOutcome>,
    high_water: Arc<AtomicU8>,
}

impl ProgressReporter {
    pub(crate) fn new(tx: UnboundedSender<ConversionOutcome>) -> Self {
        Self {
            tx,
            high_water: Arc::new(AtomicU8::new(0)),
        }
    }

    /// Emit a progress event. Values above 100 are capped; values below the
    /// last emitted percent are raised to it.
    pub fn report(&self, percent: u8) {
        let percent = percent.min(100);
        let previous = self.high_water.fetch_max(percent, Ordering::SeqCst);
        if percent < previous {
            warn!("Progress went backwards ({} < {}), holding at {}", percent, previous, previous);
        }
        // A dropped receiver only means nobody is watching; the conversion
        // still runs to completion.
        let _ = self.tx.send(ConversionOutcome::Progress(percent.max(previous)));
    }

    /// Emit progress for `processed` of `total` paragraphs.
    pub fn report_paragraphs(&self, processed: usize, total: usize) {
        self.report(percent_complete(processed, total));
    }

    /// Highest percent emitted so far.
    pub fn last_percent(&self) -> u8 {
        self.high_water.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc::unbounded_channel;

    fn drain(rx: &mut tokio::sync::mpsc::UnboundedReceiver<ConversionOutcome>) -> Vec<ConversionOutcome> {
        let mut out = Vec::new();
        while let Ok(ev) = rx.try_recv() {
            out.push(ev);
        }
        out
    }

    #[test]
    fn percent_rounds_to_nearest() {
        assert_eq!(percent_complete(1, 3), 33);
        assert_eq!(percent_complete(2, 3), 67);
        assert_eq!(percent_complete(3, 3), 100);
        assert_eq!(percent_complete(1, 8), 13); // 12.5 rounds up
        assert_eq!(percent_complete(1, 200), 1); // 0.5 rounds up
        assert_eq!(percent_complete(0, 5), 0);
    }

    #[test]
    fn percent_of_empty_document_is_complete() {
        assert_eq!(percent_complete(0, 0), 100);
    }

    #[test]
    fn percent_never_exceeds_100() {
        assert_eq!(percent_complete(7, 5), 100);
        assert_eq!(percent_complete(usize::MAX, usize::MAX), 100);
    }

    #[test]
    fn reporter_emits_each_paragraph() {
        let (tx, mut rx) = unbounded_channel();
        let reporter = ProgressReporter::new(tx);
        for i in 1..=4 {
            reporter.report_paragraphs(i, 4);
        }
        assert_eq!(
            drain(&mut rx),
            vec![
                ConversionOutcome::Progress(25),
                ConversionOutcome::Progress(50),
                ConversionOutcome::Progress(75),
                ConversionOutcome::Progress(100),
            ]
        );
        assert_eq!(reporter.last_percent(), 100);
    }

    #[test]
    fn reporter_holds_high_water_mark() {
        let (tx, mut rx) = unbounded_channel();
        let reporter = ProgressReporter::new(tx);
        let clone = reporter.clone();
        reporter.report(60);
        clone.report(40);
        reporter.report(250);
        assert_eq!(
            drain(&mut rx),
            vec![
                ConversionOutcome::Progress(60),
                ConversionOutcome::Progress(60),
                ConversionOutcome::Progress(100),
            ]
        );
    }

    #[test]
    fn reporter_survives_dropped_receiver() {
        let (tx, rx) = unbounded_channel();
        drop(rx);
        let reporter = ProgressReporter::new(tx);
        reporter.report(10);
        assert_eq!(reporter.last_percent(), 10);
    }

    #[test]
    fn terminal_classification() {
        assert!(!ConversionOutcome::Progress(100).is_terminal());
        assert!(ConversionOutcome::Success(PathBuf::from("a.csv")).is_terminal());
        assert!(ConversionOutcome::Failure("x".into()).is_terminal());
    }

    #[test]
    fn outcome_json_shape() {
        let json = serde_json::to_string(&ConversionOutcome::Progress(42)).unwrap();
        assert_eq!(json, r#"{"event":"progress","value":42}"#);
    }
}

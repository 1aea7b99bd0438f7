use events::{Event, EventEnvelope};
use std::collections::BTreeMap;
use tokio::sync::broadcast::{error::TryRecvError, Receiver};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SuiteSummary {
    pub rounds_verified: u32,
    pub failed_attempts: u32,
    pub failure: Option<String>,
    pub cleaned: bool,
    pub clean_error: Option<String>,
}

/// Per-suite tally built from pass events.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub passes: u32,
    pub failed_passes: u32,
    pub suites: BTreeMap<String, SuiteSummary>,
    pub missed_events: u64,
}

impl RunSummary {
    /// Consume everything currently buffered on `rx`.
    pub fn drain(rx: &mut Receiver<EventEnvelope>) -> Self {
        let mut summary = Self::default();
        loop {
            match rx.try_recv() {
                Ok(envelope) => summary.record(&envelope.event),
                Err(TryRecvError::Lagged(n)) => summary.missed_events += n,
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
            }
        }
        summary
    }

    pub fn record(&mut self, event: &Event) {
        match event {
            Event::PassFinished { success, .. } => {
                self.passes += 1;
                if !success {
                    self.failed_passes += 1;
                }
            }
            Event::SuiteVerified { suite, .. } => self.entry(suite).rounds_verified += 1,
            Event::VerifyAttemptFailed { suite, .. } => self.entry(suite).failed_attempts += 1,
            Event::SuiteFailed { suite, reason, .. } => self.entry(suite).failure = Some(reason.clone()),
            Event::SuiteCleaned { suite, .. } => self.entry(suite).cleaned = true,
            Event::CleanFailed { suite, error, .. } => self.entry(suite).clean_error = Some(error.clone()),
            _ => {}
        }
    }

    fn entry(&mut self, suite: &str) -> &mut SuiteSummary {
        self.suites.entry(suite.to_string()).or_default()
    }

    pub fn print(&self) {
        if self.suites.is_empty() {
            return;
        }

        println!();
        println!("Summary ({} passes, {} failed)", self.passes, self.failed_passes);
        for (name, suite) in &self.suites {
            let status = if let Some(ref failure) = suite.failure {
                format!("FAILED  {}", failure)
            } else if let Some(ref error) = suite.clean_error {
                format!("CLEAN FAILED  {}", error)
            } else if suite.cleaned {
                "cleaned".to_string()
            } else {
                format!(
                    "passed  {} rounds, {} failed attempts",
                    suite.rounds_verified, suite.failed_attempts
                )
            };
            println!("  {:<48} {}", name, status);
        }
        if self.missed_events > 0 {
            println!("  ({} events dropped)", self.missed_events);
        }
        println!();
    }
}

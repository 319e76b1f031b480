use std::fmt;

/// Result of handling one file (or file pair) in a batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    /// Decoded, transformed and written
    Processed,
    /// Passed through unchanged
    Copied,
    /// Left alone on purpose
    Skipped(String),
    /// An I/O or codec step failed
    Failed(String),
}

impl fmt::Display for ItemOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemOutcome::Processed => write!(f, "processed"),
            ItemOutcome::Copied => write!(f, "copied"),
            ItemOutcome::Skipped(reason) => write!(f, "skipped: {}", reason),
            ItemOutcome::Failed(reason) => write!(f, "failed: {}", reason),
        }
    }
}

/// Counters aggregated over a whole run
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BatchStats {
    pub processed: usize,
    pub copied: usize,
    pub skipped: usize,
    pub failed: usize,
    /// Label lines or annotation objects dropped inside otherwise handled files
    pub dropped_entries: usize,
}

impl BatchStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, outcome: &ItemOutcome) {
        match outcome {
            ItemOutcome::Processed => self.processed += 1,
            ItemOutcome::Copied => self.copied += 1,
            ItemOutcome::Skipped(_) => self.skipped += 1,
            ItemOutcome::Failed(_) => self.failed += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.processed + self.copied + self.skipped + self.failed
    }

    pub fn log_summary(&self, title: &str) {
        log::info!("=== {} ===", title);
        log::info!("Total items: {}", self.total());
        log::info!("Processed: {}", self.processed);
        log::info!("Copied unchanged: {}", self.copied);
        if self.skipped > 0 {
            log::warn!("Skipped: {}", self.skipped);
        }
        if self.dropped_entries > 0 {
            log::warn!("Dropped entries: {}", self.dropped_entries);
        }
        if self.failed > 0 {
            log::error!("Failed: {}", self.failed);
        }
    }
}

/// Log an outcome for a named item at the level that matches its kind
pub fn log_outcome(name: &str, outcome: &ItemOutcome) {
    match outcome {
        ItemOutcome::Processed | ItemOutcome::Copied => log::info!("'{}' {}", name, outcome),
        ItemOutcome::Skipped(_) => log::warn!("'{}' {}", name, outcome),
        ItemOutcome::Failed(_) => log::error!("'{}' {}", name, outcome),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_counts() {
        let mut stats = BatchStats::new();
        stats.record(&ItemOutcome::Processed);
        stats.record(&ItemOutcome::Copied);
        stats.record(&ItemOutcome::Skipped("no label".into()));
        stats.record(&ItemOutcome::Skipped("not an image".into()));
        stats.record(&ItemOutcome::Failed("disk full".into()));

        assert_eq!(stats.processed, 1);
        assert_eq!(stats.copied, 1);
        assert_eq!(stats.skipped, 2);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.total(), 5);
    }

    #[test]
    fn test_outcome_display() {
        assert_eq!(
            ItemOutcome::Skipped("no label".into()).to_string(),
            "skipped: no label"
        );
    }
}

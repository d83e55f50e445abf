//! Progress bar adapter using indicatif.

use std::sync::{Mutex, PoisonError};

use indicatif::{ProgressBar as IndicatifBar, ProgressStyle};
use produce_qa_core::{Grade, ProgressEvent, ProgressSink};

/// Progress bar adapter for CLI output.
///
/// Without a bar, each graded image gets a one-line status on stderr. Both
/// modes end with a grade tally.
pub struct ProgressBar {
    bar: Option<IndicatifBar>,
    quiet: bool,
    tally: Mutex<[usize; 4]>,
}

impl ProgressBar {
    /// Creates a new progress bar.
    ///
    /// # Arguments
    ///
    /// * `total` - Total number of items, if known
    /// * `quiet` - If true, suppress all output
    /// * `show_bar` - If true, show progress bar; otherwise show per-item status
    #[must_use]
    pub fn new(total: Option<u64>, quiet: bool, show_bar: bool) -> Self {
        let bar = (show_bar && !quiet).then(|| {
            let bar = total.map_or_else(IndicatifBar::new_spinner, IndicatifBar::new);
            if let Ok(style) = ProgressStyle::default_bar().template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}",
            ) {
                bar.set_style(style.progress_chars("#>-"));
            }
            bar
        });

        Self {
            bar,
            quiet,
            tally: Mutex::new([0; 4]),
        }
    }

    fn record(&self, grade: Grade) {
        let slot = match grade {
            Grade::A => 0,
            Grade::B => 1,
            Grade::C => 2,
            Grade::D => 3,
        };
        self.tally.lock().unwrap_or_else(PoisonError::into_inner)[slot] += 1;
    }

    /// Grade counts as `A 3, B 1, C 0, D 0`.
    fn tally_line(&self) -> String {
        let counts = *self.tally.lock().unwrap_or_else(PoisonError::into_inner);
        Grade::ALL
            .iter()
            .zip(counts)
            .map(|(g, n)| format!("{g} {n}"))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl ProgressSink for ProgressBar {
    fn on_event(&self, event: ProgressEvent) {
        if let ProgressEvent::Completed { report } = &event {
            self.record(report.grade);
        }
        if self.quiet {
            return;
        }

        match event {
            ProgressEvent::Started { path, index, total } => {
                if let Some(bar) = &self.bar {
                    if let Some(t) = total {
                        bar.set_length(t as u64);
                    }
                    bar.set_position(index as u64);
                    bar.set_message(path);
                }
            }
            ProgressEvent::Completed { report } => {
                if let Some(bar) = &self.bar {
                    bar.inc(1);
                } else {
                    eprintln!(
                        "{}: grade {} ({:.1}), {} defect(s)",
                        report.path, report.grade, report.overall_score, report.defect_count
                    );
                }
            }
            ProgressEvent::Skipped { path, reason } => {
                if let Some(bar) = &self.bar {
                    bar.inc(1);
                }
                eprintln!("WARN: Skipping {path}: {reason}");
            }
            ProgressEvent::Finished { processed, skipped } => {
                let summary = format!(
                    "Done: {processed} graded, {skipped} skipped ({})",
                    self.tally_line()
                );
                if let Some(bar) = &self.bar {
                    bar.finish_with_message(summary);
                } else {
                    eprintln!("{summary}");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tally_counts_grades_even_when_quiet() {
        let sink = ProgressBar::new(None, true, false);
        for grade in [Grade::A, Grade::C, Grade::A] {
            sink.record(grade);
        }
        assert_eq!(sink.tally_line(), "A 2, B 0, C 1, D 0");
        assert!(sink.bar.is_none());
    }
}

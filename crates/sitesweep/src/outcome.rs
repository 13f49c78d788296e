//! The `FOUND_COUNT` line and how a caller classifies a finished run.

const PREFIX: &str = "FOUND_COUNT:";

/// The machine-readable count line printed on stdout after a run.
pub fn format_found_count(count: usize) -> String {
    format!("{PREFIX} {count}")
}

/// Find the last `FOUND_COUNT: <n>` line in captured stdout.
pub fn parse_found_count(stdout: &str) -> Option<usize> {
    stdout
        .lines()
        .rev()
        .filter_map(|line| line.trim().strip_prefix(PREFIX))
        .find_map(|rest| rest.trim().parse().ok())
}

/// How a caller should treat a finished run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Success { count: usize },
    /// Fewer records than requested. Still a success.
    Shortfall { count: usize, requested: usize },
    Failed,
}

impl RunOutcome {
    /// Classify from the exit status, the reported count, and the requested limit.
    pub fn classify(exit_ok: bool, count: Option<usize>, limit: Option<usize>) -> Self {
        if !exit_ok {
            return RunOutcome::Failed;
        }
        let count = count.unwrap_or(0);
        match limit {
            Some(requested) if count < requested => RunOutcome::Shortfall { count, requested },
            _ => RunOutcome::Success { count },
        }
    }

    pub fn is_success(&self) -> bool {
        !matches!(self, RunOutcome::Failed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_found_count_line() {
        assert_eq!(format_found_count(3), "FOUND_COUNT: 3");
        let stdout = "Opening URL\nFOUND_COUNT: 12\n{\"site\":\"x\"}\n";
        assert_eq!(parse_found_count(stdout), Some(12));
        assert_eq!(parse_found_count("FOUND_COUNT: 1\nFOUND_COUNT: 4"), Some(4));
        assert_eq!(parse_found_count("nothing here"), None);
        assert_eq!(parse_found_count("FOUND_COUNT: many"), None);
    }

    #[test]
    fn test_classify() {
        assert_eq!(RunOutcome::classify(false, Some(5), Some(5)), RunOutcome::Failed);
        assert_eq!(
            RunOutcome::classify(true, Some(3), Some(5)),
            RunOutcome::Shortfall {
                count: 3,
                requested: 5
            }
        );
        assert_eq!(
            RunOutcome::classify(true, Some(5), Some(5)),
            RunOutcome::Success { count: 5 }
        );
        assert_eq!(
            RunOutcome::classify(true, None, None),
            RunOutcome::Success { count: 0 }
        );
        assert!(RunOutcome::classify(true, Some(0), Some(2)).is_success());
    }
}

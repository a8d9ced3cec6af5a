//! Formatted terminal output.
//!
//! We keep formatting code in one place so:
//! - the fitting code stays clean and testable
//! - output changes are localized (important for future snapshot tests)

use crate::fit::{BatchReport, FitSession};
use crate::io::ingest::RowError;

/// Format the full session summary (pattern stats + everything fitted so far).
pub fn format_session(session: &FitSession) -> String {
    let mut out = String::new();
    let pattern = session.pattern();
    let (lo, hi) = pattern.angle_range();

    out.push_str("=== pvfit - Pseudo-Voigt Peak Fit ===\n");
    out.push_str(&format!(
        "Pattern: {} samples x {} cakes | two-theta=[{lo:.4}, {hi:.4}]\n",
        pattern.n_samples(),
        pattern.n_cakes(),
    ));
    out.push_str(&format!(
        "Cakes: {} from {:.1} deg\n",
        pattern.direction().display_name(),
        pattern.first_cake_angle()
    ));
    out.push_str(&format!(
        "Options: max_iterations={}\n",
        session.options().max_iterations
    ));

    let store = session.store();
    if store.is_empty() {
        out.push_str("\nNo peaks fitted yet.\n");
        return out;
    }

    out.push_str("\nFitted windows:\n");
    for outcome in store.outcomes() {
        let flag = if outcome.quality.converged { " " } else { "!" };
        out.push_str(&format!(
            "{flag} {:<14} cake={} window=[{:.4}, {:.4}] n={} iter={} rmse={:.4} bg={:.4} converged={}\n",
            truncate(&outcome.label, 14),
            outcome.cake,
            outcome.peak_bounds.0,
            outcome.peak_bounds.1,
            outcome.quality.n_points,
            outcome.quality.iterations,
            outcome.quality.rmse,
            outcome.background,
            yes_no(outcome.quality.converged),
        ));
    }

    out.push_str("\nPer-maximum results:\n");
    out.push_str(&format!(
        "{:<12} {:>5} {:>9} {:>9} {:>10} {:>8} {:<4}\n",
        "name", "cake", "center", "fwhm", "height", "snr", "conv"
    ));
    out.push_str(&format!(
        "{:-<12} {:-<5} {:-<9} {:-<9} {:-<10} {:-<8} {:-<4}\n",
        "", "", "", "", "", "", ""
    ));
    for outcome in store.outcomes() {
        for maximum in &outcome.maxima {
            out.push_str(&format!(
                "{:<12} {:>5} {:>9.4} {:>9.4} {:>10.3} {:>8} {:<4}\n",
                truncate(&maximum.name, 12),
                outcome.cake,
                maximum.params.center,
                maximum.fwhm,
                maximum.height,
                fmt_opt(maximum.snr),
                yes_no(outcome.quality.converged),
            ));
        }
    }

    out
}

/// Format one batch's report: what was recorded, what failed and why.
pub fn format_batch(report: &BatchReport) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "Cake {}: {} recorded, {} failed\n",
        report.cake,
        report.recorded.len(),
        report.failures.len()
    ));
    for label in &report.recorded {
        out.push_str(&format!("  + {label}\n"));
    }
    for failure in &report.failures {
        out.push_str(&format!("  (failed {}) {}\n", failure.label, failure.error));
    }
    out
}

/// Format ingest row errors, capped at `limit` lines.
pub fn format_row_errors(errors: &[RowError], limit: usize) -> String {
    let mut out = String::new();
    for e in errors.iter().take(limit) {
        out.push_str(&format!("  (line {}) {}\n", e.line, e.message));
    }
    if errors.len() > limit {
        out.push_str(&format!(
            "  ... and {} more rejected rows\n",
            errors.len() - limit
        ));
    }
    out
}

fn yes_no(v: bool) -> &'static str {
    if v { "yes" } else { "NO" }
}

fn fmt_opt(v: Option<f64>) -> String {
    match v {
        Some(x) => format!("{x:.2}"),
        None => "-".to_string(),
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out = String::new();
    for (i, ch) in s.chars().enumerate() {
        if i + 1 >= max {
            break;
        }
        out.push(ch);
    }
    out.push('.');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::synthetic::demo;
    use crate::fit::FitOptions;

    #[test]
    fn session_summary_lists_every_fitted_maximum() {
        let (config, specs) = demo(5).unwrap();
        let pattern = crate::data::synthetic::generate(&config).unwrap();
        let mut session = FitSession::new(pattern, FitOptions::default());
        let report = session.fit_peaks(&specs, 1).unwrap();
        assert!(report.is_clean(), "failures: {:?}", report.failures);

        let text = session.describe();
        assert!(text.contains("Pattern:"), "{text}");
        assert!(text.contains("clockwise"), "{text}");
        for spec in &specs {
            for name in spec.maxima_names() {
                assert!(text.contains(name.as_str()), "missing '{name}' in:\n{text}");
            }
        }
    }

    #[test]
    fn empty_session_summary_says_so() {
        let (config, _) = demo(5).unwrap();
        let pattern = crate::data::synthetic::generate(&config).unwrap();
        let session = FitSession::new(pattern, FitOptions::default());
        assert!(session.describe().contains("No peaks fitted yet"));
    }

    #[test]
    fn batch_report_shows_recorded_and_failed_labels() {
        let report = BatchReport {
            cake: 3,
            recorded: vec!["(10)".to_string()],
            failures: vec![crate::fit::SpecFailure {
                label: "ghost".to_string(),
                error: crate::error::AppError::data("no samples inside [9, 9.5]"),
            }],
        };
        let text = format_batch(&report);
        assert!(text.contains("Cake 3: 1 recorded, 1 failed"), "{text}");
        assert!(text.contains("+ (10)"), "{text}");
        assert!(text.contains("(failed ghost) no samples"), "{text}");
    }

    #[test]
    fn row_errors_are_capped() {
        let errors: Vec<RowError> = (0..5)
            .map(|i| RowError {
                line: i + 10,
                message: "bad".to_string(),
            })
            .collect();
        let text = format_row_errors(&errors, 3);
        assert_eq!(text.lines().count(), 4);
        assert!(text.contains("and 2 more"), "{text}");
    }

    #[test]
    fn truncate_keeps_short_names_intact() {
        assert_eq!(truncate("110+002", 12), "110+002");
        assert_eq!(truncate("a-very-long-label", 8), "a-very-.");
    }
}

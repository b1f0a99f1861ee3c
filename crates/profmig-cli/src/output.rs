//! Terminal summary and exit-code mapping for a finished batch.

use profmig_core::BatchReport;

/// Every profile succeeded or was skipped.
pub(crate) const EXIT_SUCCESS: i32 = 0;
/// At least one profile failed, was unresolvable or finished with warnings.
pub(crate) const EXIT_INCOMPLETE: i32 = 1;
/// The batch never started because its configuration was rejected.
pub(crate) const EXIT_CONFIGURATION: i32 = 2;

pub(crate) fn exit_code(report: &BatchReport) -> i32 {
    if report.failed().is_empty()
        && report.unresolvable().is_empty()
        && report.completed_with_warnings().is_empty()
    {
        EXIT_SUCCESS
    } else {
        EXIT_INCOMPLETE
    }
}

pub(crate) fn render_summary(report: &BatchReport) {
    for line in summary_lines(report) {
        println!("{line}");
    }
}

pub(crate) fn summary_lines(report: &BatchReport) -> Vec<String> {
    let mut lines = vec![
        format!("run: {}", report.run_id()),
        format!(
            "profiles: {} total, {} eligible, {:.1}s elapsed",
            report.total(),
            report.eligible(),
            elapsed_seconds(report)
        ),
        format!(
            "succeeded: {}  warnings: {}  skipped: {}  failed: {}  unresolvable: {}",
            report.succeeded().len(),
            report.completed_with_warnings().len(),
            report.skipped().len(),
            report.failed().len(),
            report.unresolvable().len()
        ),
    ];

    push_section(&mut lines, "succeeded", report.succeeded().iter().cloned());
    push_section(
        &mut lines,
        "completed with warnings",
        report
            .completed_with_warnings()
            .iter()
            .map(|warned| format!("{} ({})", warned.path, warned.warnings.join("; "))),
    );
    push_section(&mut lines, "skipped", report.skipped().iter().cloned());
    push_section(
        &mut lines,
        "failed",
        report
            .failed()
            .iter()
            .map(|failed| format!("{} [{}] {}", failed.path, failed.stage, failed.message)),
    );
    push_section(&mut lines, "unresolvable", report.unresolvable().iter().cloned());
    lines
}

fn push_section(lines: &mut Vec<String>, title: &str, entries: impl Iterator<Item = String>) {
    let mut entries = entries.peekable();
    if entries.peek().is_none() {
        return;
    }
    lines.push(format!("{title}:"));
    lines.extend(entries.map(|entry| format!("  {entry}")));
}

fn elapsed_seconds(report: &BatchReport) -> f64 {
    let millis = u32::try_from(report.elapsed().num_milliseconds().max(0)).unwrap_or(u32::MAX);
    f64::from(millis) / 1000.0
}

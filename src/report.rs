use std::fmt::Write;

use crate::config::CouncilConfig;
use crate::models::ClassGroup;
use crate::rank::{self, RankScope};
use crate::stats::{self, ScopeDetail, StatisticsReport};

fn write_summary(output: &mut String, report: &StatisticsReport) {
    let _ = writeln!(output, "## Summary");
    let _ = writeln!(output, "- Students: {}", report.student_count);
    let _ = writeln!(output, "- Class average: {:.2}", report.class_average);
    let _ = writeln!(output, "- Highest average: {:.2}", report.max_average);
    let _ = writeln!(output, "- Pass rate: {:.1}%", report.pass_rate);

    if let ScopeDetail::Annual {
        admitted, repeating, ..
    } = &report.detail
    {
        let _ = writeln!(output, "- Promoted: {admitted}, repeating: {repeating}");
    }
}

fn write_detail(output: &mut String, detail: &ScopeDetail) {
    match detail {
        ScopeDetail::Term {
            subject_performance,
        } => {
            let _ = writeln!(output, "## Subject Performance");
            for entry in subject_performance {
                let _ = writeln!(output, "- {}: {:.2}", entry.subject.label(), entry.average);
            }
        }
        ScopeDetail::Annual {
            term_progression, ..
        } => {
            let _ = writeln!(output, "## Term Progression");
            for entry in term_progression {
                let _ = writeln!(output, "- {}: {:.2}", entry.term, entry.average);
            }
        }
    }
}

/// Markdown council report for one class and scope.
pub fn build_report(class: &ClassGroup, scope: RankScope, config: &CouncilConfig) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Class Council Report");
    let _ = writeln!(
        output,
        "{} ({}) - {}, {}",
        config.school.name, config.school.district, class.name, config.school.school_year
    );
    let _ = writeln!(output, "Scope: {scope}");
    let _ = writeln!(output);

    let Some(report) = stats::compute_class_statistics(&class.students, scope, config) else {
        let _ = writeln!(output, "No students enrolled in this class.");
        return output;
    };

    write_summary(&mut output, &report);

    let _ = writeln!(output);
    let _ = writeln!(output, "## Score Distribution");
    for entry in &report.distribution {
        let _ = writeln!(output, "- {}: {}", entry.band, entry.count);
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Top Performers");
    if report.top_performers.is_empty() {
        let _ = writeln!(output, "No distinctions awarded.");
    } else {
        for entry in &report.top_performers {
            let _ = writeln!(output, "- {} ({:.2})", entry.name, entry.average);
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## At Risk (9.00 - 9.99)");
    if report.at_risk.is_empty() {
        let _ = writeln!(output, "No students just below the pass mark.");
    } else {
        for entry in &report.at_risk {
            let _ = writeln!(output, "- {} ({:.2})", entry.name, entry.average);
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Conduct");
    if report.behavior_flags.is_empty() {
        let _ = writeln!(output, "No conduct concerns.");
    } else {
        for flag in report.behavior_preview() {
            let _ = writeln!(
                output,
                "- {} ({}): {}, decision {}",
                flag.name,
                flag.term,
                flag.behavior.label(),
                flag.decision
            );
        }
        let hidden = report.behavior_flags.len() - report.behavior_preview().len();
        if hidden > 0 {
            let _ = writeln!(output, "- and {hidden} more");
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Attendance");
    if report.absence_flags.is_empty() {
        let _ = writeln!(output, "No attendance concerns.");
    } else {
        for flag in report.absence_preview() {
            let _ = writeln!(output, "- {} ({}): {}", flag.name, flag.term, flag.absence.label());
        }
        let hidden = report.absence_flags.len() - report.absence_preview().len();
        if hidden > 0 {
            let _ = writeln!(output, "- and {hidden} more");
        }
    }

    let _ = writeln!(output);
    write_detail(&mut output, &report.detail);

    let _ = writeln!(output);
    let _ = writeln!(output, "## Standings");
    for entry in rank::standings(&class.students, scope) {
        let position = entry
            .rank
            .map(|rank| rank.to_string())
            .unwrap_or_else(|| "-".to_string());
        let _ = writeln!(output, "{}. {} ({:.2})", position, entry.name, entry.average);
    }

    output
}

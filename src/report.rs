use std::collections::HashMap;
use std::fmt::Write;

use uuid::Uuid;

use sociometric::models::{AnalysisResult, RiskAlert, Severity};

fn student_names(result: &AnalysisResult) -> HashMap<Uuid, &str> {
    result
        .students
        .iter()
        .map(|student| (student.id, student.name.as_str()))
        .collect()
}

fn alert_subject<'a>(alert: &'a RiskAlert, names: &HashMap<Uuid, &'a str>) -> &'a str {
    match (alert.student_id, alert.cluster_id.as_deref()) {
        (Some(id), _) => names.get(&id).copied().unwrap_or("unknown student"),
        (None, Some(cluster)) => cluster,
        (None, None) => "group",
    }
}

pub fn sorted_alerts(alerts: &[RiskAlert]) -> Vec<&RiskAlert> {
    let mut sorted: Vec<&RiskAlert> = alerts.iter().collect();
    sorted.sort_by(|a, b| b.severity.cmp(&a.severity).then_with(|| a.id.cmp(&b.id)));
    sorted
}

pub fn build_report(result: &AnalysisResult) -> String {
    let summary = &result.executive_summary;
    let names = student_names(result);
    let mut output = String::new();

    let _ = writeln!(output, "# Sociometric Report: group {}", result.group_id);
    let _ = writeln!(
        output,
        "Generated {} for {} students ({} responded, {:.0}% coverage)",
        result.analyzed_at.format("%Y-%m-%d %H:%M UTC"),
        summary.total_students,
        summary.respondents,
        summary.response_coverage
    );
    if result.diagnostics.skipped_responses > 0 {
        let _ = writeln!(
            output,
            "{} malformed responses were skipped.",
            result.diagnostics.skipped_responses
        );
    }
    let _ = writeln!(output);

    let _ = writeln!(output, "## Social Status");
    for (status, count) in &summary.status_distribution {
        let _ = writeln!(output, "- {}: {}", status.as_str(), count);
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Bullying Roles");
    for (role, count) in &summary.role_distribution {
        let _ = writeln!(output, "- {}: {}", role.as_str(), count);
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Alerts");

    if result.alerts.is_empty() {
        let _ = writeln!(output, "No alerts raised for this group.");
    } else {
        let _ = writeln!(
            output,
            "{} alerts, {} critical.",
            result.alerts.len(),
            summary.critical_alerts
        );
        for alert in sorted_alerts(&result.alerts) {
            let _ = writeln!(
                output,
                "- [{}] {} ({}): {}",
                alert.severity.as_str(),
                alert_subject(alert, &names),
                alert.alert_type.as_str(),
                alert.evidence.join("; ")
            );
            if alert.severity == Severity::Critical {
                if let Some(first) = alert.recommendations.first() {
                    let _ = writeln!(output, "  - next step: {first}");
                }
            }
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Clusters");

    if result.clusters.is_empty() {
        let _ = writeln!(output, "No clusters of strong mutual ties found.");
    } else {
        for cluster in &result.clusters {
            let members: Vec<&str> = cluster
                .members
                .iter()
                .map(|id| names.get(id).copied().unwrap_or("unknown student"))
                .collect();
            let _ = writeln!(
                output,
                "- {} ({}): {} | density {:.1}%, cohesion {:.1}%",
                cluster.id,
                cluster.cluster_type.as_str(),
                members.join(", "),
                cluster.density,
                cluster.cohesion
            );
        }
    }

    let metrics = &result.metrics;
    let _ = writeln!(output);
    let _ = writeln!(output, "## Network");
    let _ = writeln!(output, "- density: {:.1}%", metrics.density);
    let _ = writeln!(output, "- reciprocity: {:.1}%", metrics.reciprocity);
    let _ = writeln!(output, "- transitivity: {:.1}%", metrics.transitivity);
    let _ = writeln!(output, "- modularity: {:.1}", metrics.modularity);
    match metrics.average_path_length {
        Some(length) => {
            let _ = writeln!(output, "- average path length: {length:.2}");
        }
        None => {
            let _ = writeln!(output, "- average path length: n/a");
        }
    }
    let _ = writeln!(output, "- isolated students: {}", metrics.isolated_count);

    let _ = writeln!(output);
    let _ = writeln!(output, "## Recommendations");
    for line in &summary.recommendations {
        let _ = writeln!(output, "- {line}");
    }

    output
}

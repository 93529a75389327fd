use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::alerts::generate_alerts;
use crate::clusters::{detect_clusters, membership};
use crate::config::Thresholds;
use crate::indices::calculate_indices;
use crate::models::{
    AnalysisResult, BullyingRole, ExecutiveSummary, RawResponse, RelationType, RiskAlert,
    RiskLevel, Severity, SocialCluster, SocialRelation, SocialStatus, SociogramEdge,
    SociogramNode, Sociogram, SociometricIndex, Student,
};
use crate::network::calculate_metrics;
use crate::relations::{build_relations, QuestionCatalog};

const SUMMARY_RECOMMENDATIONS: &[&str] = &[
    "Review every critical alert with the tutor and the counselling team this week",
    "Repeat the sociometric survey at the end of the term to measure change",
    "Use the detected clusters when forming cooperative work teams",
    "Share the group-level findings with the teaching team without naming students",
];

fn node_color(index: &SociometricIndex) -> &'static str {
    match index.bullying_role {
        BullyingRole::Aggressor => "#b91c1c",
        BullyingRole::Victim => "#ea580c",
        BullyingRole::AggressiveVictim => "#7e22ce",
        BullyingRole::Bystander | BullyingRole::Uninvolved => match index.social_status {
            SocialStatus::Popular => "#16a34a",
            SocialStatus::Average => "#2563eb",
            SocialStatus::Isolated => "#9ca3af",
            SocialStatus::Rejected => "#dc2626",
            SocialStatus::Controversial => "#ca8a04",
        },
    }
}

fn edge_color(relation_type: RelationType) -> &'static str {
    match relation_type {
        RelationType::Choice => "#22c55e",
        RelationType::Rejection => "#ef4444",
        RelationType::Aggression => "#7f1d1d",
        RelationType::Victimization => "#f97316",
    }
}

/// Node size grows linearly with popularity, from 10 to 50.
pub fn node_size(popularity: f64) -> f64 {
    10.0 + popularity.clamp(0.0, 100.0) * 0.4
}

pub fn build_sociogram(
    students: &[Student],
    relations: &[SocialRelation],
    indices: &[SociometricIndex],
    clusters: &[SocialCluster],
) -> Sociogram {
    let cluster_of = membership(clusters);

    let nodes = students
        .iter()
        .zip(indices)
        .map(|(student, index)| SociogramNode {
            id: student.id,
            label: student.name.clone(),
            size: node_size(index.popularity),
            color: node_color(index).to_string(),
            status: index.social_status,
            role: index.bullying_role,
            cluster_id: cluster_of.get(&student.id).cloned(),
        })
        .collect();

    let edges = relations
        .iter()
        .map(|relation| SociogramEdge {
            source: relation.origin_id,
            target: relation.target_id,
            relation_type: relation.relation_type,
            color: edge_color(relation.relation_type).to_string(),
            width: relation.intensity,
            reciprocal: relation.reciprocal,
        })
        .collect();

    Sociogram { nodes, edges }
}

pub fn build_summary(
    students: &[Student],
    responses: &[RawResponse],
    relations: &[SocialRelation],
    indices: &[SociometricIndex],
    clusters: &[SocialCluster],
    alerts: &[RiskAlert],
) -> ExecutiveSummary {
    let roster: HashSet<Uuid> = students.iter().map(|s| s.id).collect();
    let respondents = responses
        .iter()
        .map(|r| r.student_id)
        .filter(|id| roster.contains(id))
        .collect::<HashSet<_>>()
        .len();
    let response_coverage = if students.is_empty() {
        0.0
    } else {
        respondents as f64 / students.len() as f64 * 100.0
    };

    let mut status_distribution: BTreeMap<SocialStatus, usize> =
        SocialStatus::ALL.iter().map(|s| (*s, 0)).collect();
    let mut role_distribution: BTreeMap<BullyingRole, usize> =
        BullyingRole::ALL.iter().map(|r| (*r, 0)).collect();
    let mut risk_distribution: BTreeMap<RiskLevel, usize> =
        Severity::ALL.iter().map(|l| (*l, 0)).collect();

    for index in indices {
        *status_distribution.entry(index.social_status).or_insert(0) += 1;
        *role_distribution.entry(index.bullying_role).or_insert(0) += 1;
        *risk_distribution.entry(index.risk_level).or_insert(0) += 1;
    }

    ExecutiveSummary {
        total_students: students.len(),
        respondents,
        response_coverage,
        total_relations: relations.len(),
        cluster_count: clusters.len(),
        critical_alerts: alerts
            .iter()
            .filter(|a| a.severity == Severity::Critical)
            .count(),
        at_risk_students: indices
            .iter()
            .filter(|i| i.risk_level >= RiskLevel::High)
            .count(),
        status_distribution,
        role_distribution,
        risk_distribution,
        recommendations: SUMMARY_RECOMMENDATIONS
            .iter()
            .map(|line| line.to_string())
            .collect(),
    }
}

/// Run the full pipeline for one group. Each call is independent and pure
/// apart from logging, so separate groups may be analysed concurrently.
pub fn analyze(
    group_id: &str,
    students: &[Student],
    responses: &[RawResponse],
    catalog: &impl QuestionCatalog,
    thresholds: &Thresholds,
    analyzed_at: DateTime<Utc>,
) -> AnalysisResult {
    let build = build_relations(students, responses, catalog);
    let relations = build.relations;
    let indices = calculate_indices(students, &relations, thresholds);
    let clusters = detect_clusters(students, &relations, &indices, thresholds);
    let metrics = calculate_metrics(students, &relations, &clusters);
    let alerts = generate_alerts(&indices, &clusters, &relations, thresholds, analyzed_at);
    let sociogram = build_sociogram(students, &relations, &indices, &clusters);
    let executive_summary =
        build_summary(students, responses, &relations, &indices, &clusters, &alerts);

    tracing::info!(
        group = %group_id,
        students = students.len(),
        relations = relations.len(),
        clusters = clusters.len(),
        alerts = alerts.len(),
        skipped = build.diagnostics.skipped_responses,
        "sociometric analysis complete"
    );

    AnalysisResult {
        group_id: group_id.to_string(),
        analyzed_at,
        students: students.to_vec(),
        relations,
        indices,
        clusters,
        metrics,
        alerts,
        sociogram,
        executive_summary,
        diagnostics: build.diagnostics,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AlertType, ClusterType, Question, ResponseValue};
    use crate::relations::QuestionBank;

    const CHOICE: u128 = 1001;
    const REJECTION: u128 = 1002;
    const AGGRESSION: u128 = 1003;

    fn student(n: u128) -> Student {
        Student {
            id: Uuid::from_u128(n),
            name: format!("Student {n}"),
            group_id: "5A".to_string(),
            age: Some(11),
            gender: None,
        }
    }

    fn bank() -> QuestionBank {
        let question = |id: u128, text: &str, category: &str| Question {
            id: Uuid::from_u128(id),
            text: text.to_string(),
            category: Some(category.to_string()),
            subject_id: None,
        };
        QuestionBank::new(vec![
            question(CHOICE, "Who would you choose to work with?", "choice"),
            question(REJECTION, "Who would you not choose to work with?", "rejection"),
            question(AGGRESSION, "Who is the target of aggression?", "aggression"),
        ])
    }

    fn answer(from: u128, question: u128, targets: &[u128]) -> RawResponse {
        let value = targets
            .iter()
            .map(|n| Uuid::from_u128(*n).to_string())
            .collect::<Vec<_>>()
            .join(",");
        RawResponse {
            student_id: Uuid::from_u128(from),
            question_id: Uuid::from_u128(question),
            value: ResponseValue::Nominations(value),
            timestamp: now(),
        }
    }

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-03-02T09:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn run(students: &[Student], responses: &[RawResponse]) -> AnalysisResult {
        analyze("5A", students, responses, &bank(), &Thresholds::default(), now())
    }

    fn index_of(result: &AnalysisResult, n: u128) -> &SociometricIndex {
        result
            .indices
            .iter()
            .find(|i| i.student_id == Uuid::from_u128(n))
            .unwrap()
    }

    #[test]
    fn mutual_pair_density_counts_both_directions() {
        let students: Vec<Student> = (1..=3).map(student).collect();
        let responses = vec![answer(1, CHOICE, &[2]), answer(2, CHOICE, &[1])];
        let result = run(&students, &responses);

        assert_eq!(result.relations.len(), 2);
        assert!(result.relations.iter().all(|r| r.reciprocal));
        assert_eq!(index_of(&result, 3).isolation, 100.0);
        // two directed choices out of six possible
        assert!((result.metrics.density - 33.33).abs() < 0.01);
        assert_eq!(result.metrics.reciprocity, 100.0);
        assert_eq!(result.clusters.len(), 1);
        assert_eq!(result.executive_summary.respondents, 2);
        assert!((result.executive_summary.response_coverage - 66.67).abs() < 0.01);
    }

    #[test]
    fn targeted_and_rejected_student_is_critical_victim() {
        let students: Vec<Student> = (1..=4).map(student).collect();
        let mut responses = Vec::new();
        for peer in 2..=4 {
            responses.push(answer(peer, AGGRESSION, &[1]));
            responses.push(answer(peer, REJECTION, &[1]));
        }
        let result = run(&students, &responses);

        let target = index_of(&result, 1);
        assert_eq!(target.popularity, 0.0);
        assert_eq!(target.bullying_role, BullyingRole::Victim);
        assert_eq!(target.risk_level, RiskLevel::Critical);

        let alert = result
            .alerts
            .iter()
            .find(|a| a.alert_type == AlertType::VulnerableVictim)
            .unwrap();
        assert_eq!(alert.student_id, Some(Uuid::from_u128(1)));
        assert_eq!(alert.severity, Severity::Critical);
        assert!(result.executive_summary.critical_alerts >= 1);
    }

    #[test]
    fn named_bully_is_not_classified_as_victim() {
        let students: Vec<Student> = (1..=4).map(student).collect();
        let question = |id: u128, text: &str| Question {
            id: Uuid::from_u128(id),
            text: text.to_string(),
            category: None,
            subject_id: None,
        };
        let questions = vec![
            question(1004, "Who bullies other classmates?"),
            question(REJECTION, "Who would you not choose to work with?"),
        ];
        let mut responses = Vec::new();
        for peer in 2..=4 {
            responses.push(answer(peer, 1004, &[1]));
            responses.push(answer(peer, REJECTION, &[1]));
        }
        let result = analyze(
            "5A",
            &students,
            &responses,
            &QuestionBank::new(questions),
            &Thresholds::default(),
            now(),
        );

        assert_ne!(index_of(&result, 1).bullying_role, BullyingRole::Victim);
        assert!(result
            .alerts
            .iter()
            .all(|a| a.alert_type != AlertType::VulnerableVictim));
        assert!(result
            .relations
            .iter()
            .all(|r| r.relation_type == RelationType::Rejection));
        assert_eq!(result.diagnostics.ignored_responses, 3);
    }

    #[test]
    fn silent_class_is_fully_isolated() {
        let students: Vec<Student> = (1..=5).map(student).collect();
        let result = run(&students, &[]);

        assert_eq!(result.metrics.density, 0.0);
        assert_eq!(result.metrics.isolated_count, 5);
        let isolation_alerts: HashSet<Option<Uuid>> = result
            .alerts
            .iter()
            .filter(|a| a.alert_type == AlertType::Isolation)
            .map(|a| a.student_id)
            .collect();
        assert_eq!(isolation_alerts.len(), 5);
        assert_eq!(result.executive_summary.status_distribution[&SocialStatus::Isolated], 5);
        assert_eq!(result.executive_summary.response_coverage, 0.0);
    }

    #[test]
    fn two_mutual_pairs_form_two_dyads() {
        let students: Vec<Student> = (1..=4).map(student).collect();
        let responses = vec![
            answer(1, CHOICE, &[2]),
            answer(2, CHOICE, &[1]),
            answer(3, CHOICE, &[4]),
            answer(4, CHOICE, &[3]),
        ];
        let result = run(&students, &responses);

        assert_eq!(result.clusters.len(), 2);
        assert_eq!(result.executive_summary.cluster_count, 2);
        assert!(result
            .clusters
            .iter()
            .all(|c| c.cluster_type == ClusterType::Dyad && c.members.len() == 2));
        assert!(result.sociogram.nodes.iter().all(|n| n.cluster_id.is_some()));
    }

    #[test]
    fn empty_roster_produces_empty_result() {
        let result = run(&[], &[]);
        assert!(result.indices.is_empty());
        assert!(result.clusters.is_empty());
        assert!(result.alerts.is_empty());
        assert!(result.sociogram.nodes.is_empty());
        assert_eq!(result.metrics.isolated_count, 0);
        assert_eq!(result.executive_summary.total_students, 0);
        assert_eq!(result.executive_summary.status_distribution.len(), 5);
        assert!(serde_json::to_string(&result).is_ok());
    }

    #[test]
    fn rerunning_identical_input_is_stable() {
        let students: Vec<Student> = (1..=6).map(student).collect();
        let responses = vec![
            answer(1, CHOICE, &[2, 3]),
            answer(2, CHOICE, &[1, 3]),
            answer(3, CHOICE, &[1]),
            answer(4, REJECTION, &[5, 6]),
            answer(5, AGGRESSION, &[6]),
            answer(6, CHOICE, &[4]),
        ];
        let first = run(&students, &responses);
        let second = run(&students, &responses);

        assert_eq!(first.indices, second.indices);
        assert_eq!(first.metrics, second.metrics);
        assert_eq!(first.alerts, second.alerts);
    }

    #[test]
    fn sociogram_projects_every_student_and_relation() {
        let students: Vec<Student> = (1..=3).map(student).collect();
        let responses = vec![answer(1, CHOICE, &[2]), answer(3, REJECTION, &[2])];
        let result = run(&students, &responses);

        assert_eq!(result.sociogram.nodes.len(), 3);
        assert_eq!(result.sociogram.edges.len(), 2);
        let rejection = result
            .sociogram
            .edges
            .iter()
            .find(|e| e.relation_type == RelationType::Rejection)
            .unwrap();
        assert_eq!(rejection.color, "#ef4444");
        assert_eq!(node_size(0.0), 10.0);
        assert_eq!(node_size(100.0), 50.0);
    }

    #[test]
    fn clustered_students_appear_once() {
        let students: Vec<Student> = (1..=6).map(student).collect();
        let responses = vec![
            answer(1, CHOICE, &[2]),
            answer(2, CHOICE, &[1, 3]),
            answer(3, CHOICE, &[2]),
            answer(5, CHOICE, &[6]),
            answer(6, CHOICE, &[5]),
        ];
        let result = run(&students, &responses);
        let roster: HashSet<Uuid> = students.iter().map(|s| s.id).collect();

        let mut seen = HashSet::new();
        for cluster in &result.clusters {
            for member in &cluster.members {
                assert!(roster.contains(member));
                assert!(seen.insert(*member));
            }
        }
        assert_eq!(seen.len(), 5);
    }
}

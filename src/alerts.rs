use chrono::{DateTime, Duration, Utc};

use crate::config::Thresholds;
use crate::indices::degree_counts;
use crate::models::{
    AlertType, BullyingRole, ClusterType, RiskAlert, RiskLevel, Severity, SocialCluster,
    SocialRelation, SociometricIndex,
};

const CLUSTER_FOLLOW_UP_DAYS: i64 = 14;

pub fn follow_up_days(severity: Severity) -> i64 {
    match severity {
        Severity::Critical => 1,
        Severity::High => 3,
        Severity::Medium => 7,
        Severity::Low => 14,
    }
}

pub fn recommendations(alert_type: AlertType) -> Vec<String> {
    let lines: &[&str] = match alert_type {
        AlertType::Isolation => &[
            "Arrange structured cooperative work with well-integrated classmates",
            "Schedule an individual conversation with the tutor",
            "Inform the family and agree on a shared follow-up plan",
        ],
        AlertType::MassRejection => &[
            "Explore the reasons for rejection through individual interviews",
            "Work on social skills and conflict resolution in tutorial sessions",
            "Avoid public comparisons and assign visible positive roles",
        ],
        AlertType::AggressorIdentified => &[
            "Activate the school coexistence protocol",
            "Hold a restorative meeting with the student and the family",
            "Increase supervision during breaks and unstructured time",
        ],
        AlertType::VulnerableVictim => &[
            "Activate the anti-bullying protocol immediately",
            "Guarantee the student's safety and assign a reference adult",
            "Contact the family the same day",
            "Refer to the counselling department for emotional support",
        ],
        AlertType::ProblematicCluster => &[
            "Observe the group during breaks and group work",
            "Rearrange seating and work teams to break negative dynamics",
            "Run a group session on respect and peer relations",
        ],
    };
    lines.iter().map(|line| line.to_string()).collect()
}

fn student_alert(
    index: &SociometricIndex,
    alert_type: AlertType,
    severity: Severity,
    description: String,
    evidence: Vec<String>,
    detected_at: DateTime<Utc>,
) -> RiskAlert {
    RiskAlert {
        id: format!("{}:{}", alert_type.as_str(), index.student_id),
        student_id: Some(index.student_id),
        cluster_id: None,
        alert_type,
        severity,
        description,
        evidence,
        recommendations: recommendations(alert_type),
        detected_at,
        follow_up_at: Some(detected_at + Duration::days(follow_up_days(severity))),
    }
}

pub fn generate_alerts(
    indices: &[SociometricIndex],
    clusters: &[SocialCluster],
    relations: &[SocialRelation],
    thresholds: &Thresholds,
    detected_at: DateTime<Utc>,
) -> Vec<RiskAlert> {
    let t = &thresholds.alerts;
    let counts = degree_counts(relations);
    let mut alerts = Vec::new();

    for index in indices {
        let c = counts.get(&index.student_id).copied().unwrap_or_default();

        if index.isolation > t.isolation {
            let severity = if index.isolation > t.isolation_critical {
                Severity::Critical
            } else {
                Severity::High
            };
            alerts.push(student_alert(
                index,
                AlertType::Isolation,
                severity,
                "Student is largely disconnected from the peer network".to_string(),
                vec![
                    format!("isolation index {:.1}%", index.isolation),
                    format!("{} nominations received, {} given", c.incoming, c.outgoing),
                ],
                detected_at,
            ));
        }

        if index.rejection > t.rejection {
            let severity = if index.rejection > t.rejection_critical {
                Severity::Critical
            } else {
                Severity::High
            };
            alerts.push(student_alert(
                index,
                AlertType::MassRejection,
                severity,
                "Student is rejected by a large share of the group".to_string(),
                vec![
                    format!("rejection index {:.1}%", index.rejection),
                    format!("{} rejection nominations received", c.rejections_received),
                    format!("popularity index {:.1}%", index.popularity),
                ],
                detected_at,
            ));
        }

        if index.bullying_role == BullyingRole::Aggressor {
            alerts.push(student_alert(
                index,
                AlertType::AggressorIdentified,
                Severity::High,
                "Peers consistently identify aggressive behaviour by this student".to_string(),
                vec![
                    format!("aggression directed at {} classmates", c.aggression_given),
                    format!("social influence {:.1}%", index.social_influence),
                ],
                detected_at,
            ));
        }

        if index.bullying_role == BullyingRole::Victim && index.risk_level == RiskLevel::Critical {
            alerts.push(student_alert(
                index,
                AlertType::VulnerableVictim,
                Severity::Critical,
                "Student shows signs of victimization combined with strong rejection".to_string(),
                vec![
                    format!("{} peers report aggression or victimization", c.victim_signals()),
                    format!("rejection index {:.1}%", index.rejection),
                    format!("{} choice nominations received", c.choices_received),
                ],
                detected_at,
            ));
        }
    }

    for cluster in clusters
        .iter()
        .filter(|cluster| cluster.cluster_type == ClusterType::Problematic)
    {
        alerts.push(RiskAlert {
            id: format!("{}:{}", AlertType::ProblematicCluster.as_str(), cluster.id),
            student_id: None,
            cluster_id: Some(cluster.id.clone()),
            alert_type: AlertType::ProblematicCluster,
            severity: Severity::Medium,
            description: "Subgroup with a high share of internal aggression".to_string(),
            evidence: vec![
                format!("{} members", cluster.members.len()),
                format!("cohesion {:.1}%", cluster.cohesion),
                format!("density {:.1}%", cluster.density),
            ],
            recommendations: recommendations(AlertType::ProblematicCluster),
            detected_at,
            follow_up_at: Some(detected_at + Duration::days(CLUSTER_FOLLOW_UP_DAYS)),
        });
    }

    tracing::debug!(alerts = alerts.len(), "alerts generated");
    alerts
}

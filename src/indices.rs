use std::collections::HashMap;

use uuid::Uuid;

use crate::config::Thresholds;
use crate::models::{
    BullyingRole, RelationType, RiskLevel, SocialRelation, SocialStatus, SociometricIndex, Student,
};

/// Per-student relation counts. Every relation counts once regardless of
/// intensity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DegreeCounts {
    pub incoming: usize,
    pub outgoing: usize,
    pub choices_received: usize,
    pub rejections_received: usize,
    pub aggression_received: usize,
    pub victimization_received: usize,
    pub aggression_given: usize,
}

impl DegreeCounts {
    pub fn total(&self) -> usize {
        self.incoming + self.outgoing
    }

    /// Nominations pointing at this student as a target of bullying.
    pub fn victim_signals(&self) -> usize {
        self.aggression_received + self.victimization_received
    }
}

pub fn degree_counts(relations: &[SocialRelation]) -> HashMap<Uuid, DegreeCounts> {
    let mut counts: HashMap<Uuid, DegreeCounts> = HashMap::new();

    for relation in relations {
        let origin = counts.entry(relation.origin_id).or_default();
        origin.outgoing += 1;
        if relation.relation_type == RelationType::Aggression {
            origin.aggression_given += 1;
        }

        let target = counts.entry(relation.target_id).or_default();
        target.incoming += 1;
        match relation.relation_type {
            RelationType::Choice => target.choices_received += 1,
            RelationType::Rejection => target.rejections_received += 1,
            RelationType::Aggression => target.aggression_received += 1,
            RelationType::Victimization => target.victimization_received += 1,
        }
    }

    counts
}

fn percent(count: usize, possible: usize) -> f64 {
    if possible == 0 {
        0.0
    } else {
        (count as f64 / possible as f64 * 100.0).clamp(0.0, 100.0)
    }
}

pub fn classify_status(
    popularity: f64,
    rejection: f64,
    isolation: f64,
    thresholds: &Thresholds,
) -> SocialStatus {
    let t = &thresholds.status;
    if popularity > t.popular_min_popularity && rejection < t.popular_max_rejection {
        SocialStatus::Popular
    } else if popularity > t.controversial_min_popularity
        && rejection > t.controversial_min_rejection
    {
        SocialStatus::Controversial
    } else if rejection > t.rejected_min_rejection {
        SocialStatus::Rejected
    } else if isolation > t.isolated_min_isolation {
        SocialStatus::Isolated
    } else {
        SocialStatus::Average
    }
}

pub fn classify_role(counts: &DegreeCounts, thresholds: &Thresholds) -> BullyingRole {
    let t = &thresholds.bullying;
    let aggressive = counts.aggression_given > t.aggressor_min_aggression;
    let signals = counts.victim_signals();

    if aggressive && signals <= t.aggressor_max_victim_signals {
        BullyingRole::Aggressor
    } else if aggressive && signals > t.aggressive_victim_min_victim_signals {
        BullyingRole::AggressiveVictim
    } else if signals > t.victim_min_victim_signals {
        BullyingRole::Victim
    } else if counts.choices_received > t.bystander_min_choices {
        BullyingRole::Bystander
    } else {
        BullyingRole::Uninvolved
    }
}

pub fn classify_risk(
    role: BullyingRole,
    status: SocialStatus,
    rejection: f64,
    isolation: f64,
    thresholds: &Thresholds,
) -> RiskLevel {
    let t = &thresholds.risk;
    if role == BullyingRole::Victim && rejection > t.critical_victim_min_rejection {
        RiskLevel::Critical
    } else if role == BullyingRole::Aggressor || status == SocialStatus::Rejected {
        RiskLevel::High
    } else if status == SocialStatus::Isolated || isolation > t.medium_min_isolation {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    }
}

pub fn calculate_indices(
    students: &[Student],
    relations: &[SocialRelation],
    thresholds: &Thresholds,
) -> Vec<SociometricIndex> {
    let peers = students.len().saturating_sub(1);
    let counts = degree_counts(relations);
    let max_degree = students
        .iter()
        .filter_map(|student| counts.get(&student.id))
        .map(DegreeCounts::total)
        .max()
        .unwrap_or(0);

    students
        .iter()
        .map(|student| {
            let c = counts.get(&student.id).copied().unwrap_or_default();

            let popularity = percent(c.choices_received, peers);
            let rejection = percent(c.rejections_received, peers);
            let isolation = if peers == 0 {
                0.0
            } else {
                100.0 - percent(c.total(), 2 * peers)
            };
            let centrality = percent(c.total(), max_degree);
            let aggression_share = percent(c.aggression_given, peers);
            let social_influence = (popularity
                - thresholds.bullying.influence_aggression_penalty * aggression_share)
                .clamp(0.0, 100.0);

            let social_status = classify_status(popularity, rejection, isolation, thresholds);
            let bullying_role = classify_role(&c, thresholds);
            let risk_level =
                classify_risk(bullying_role, social_status, rejection, isolation, thresholds);

            SociometricIndex {
                student_id: student.id,
                popularity,
                rejection,
                isolation,
                centrality,
                social_influence,
                social_status,
                bullying_role,
                risk_level,
            }
        })
        .collect()
}

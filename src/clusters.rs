//! Social cluster detection over strong mutual-choice ties.
//!
//! Clusters are the connected components (two or more members) of the
//! undirected graph whose edges are choices that are either reciprocal or
//! repeated. Density, cohesion and type are then scored over every relation
//! between members, not only the strong ties. Members are listed most
//! popular first.

use std::collections::{HashMap, HashSet};

use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::visit::Dfs;
use uuid::Uuid;

use crate::config::Thresholds;
use crate::models::{
    ClusterType, RelationType, SocialCluster, SocialRelation, SociometricIndex, Student,
};

pub fn is_strong_tie(relation: &SocialRelation, thresholds: &Thresholds) -> bool {
    relation.relation_type == RelationType::Choice
        && (relation.reciprocal
            || relation.intensity >= thresholds.clusters.strong_tie_min_intensity)
}

/// Undirected graph of strong ties, one node per student in roster order.
pub fn strong_tie_graph(
    students: &[Student],
    relations: &[SocialRelation],
    thresholds: &Thresholds,
) -> (UnGraph<Uuid, ()>, HashMap<Uuid, NodeIndex>) {
    let mut graph = UnGraph::new_undirected();
    let nodes: HashMap<Uuid, NodeIndex> = students
        .iter()
        .map(|student| (student.id, graph.add_node(student.id)))
        .collect();

    for relation in relations.iter().filter(|r| is_strong_tie(r, thresholds)) {
        if let (Some(&a), Some(&b)) = (nodes.get(&relation.origin_id), nodes.get(&relation.target_id)) {
            graph.update_edge(a, b, ());
        }
    }

    (graph, nodes)
}

#[derive(Debug, Clone, Copy, Default)]
struct InternalCounts {
    total: usize,
    positive: usize,
    negative: usize,
    aggression: usize,
}

fn internal_counts(members: &HashSet<Uuid>, relations: &[SocialRelation]) -> InternalCounts {
    let mut counts = InternalCounts::default();
    for relation in relations
        .iter()
        .filter(|r| members.contains(&r.origin_id) && members.contains(&r.target_id))
    {
        counts.total += 1;
        if relation.relation_type == RelationType::Choice {
            counts.positive += 1;
        }
        if relation.relation_type.is_negative() {
            counts.negative += 1;
        }
        if relation.relation_type == RelationType::Aggression {
            counts.aggression += 1;
        }
    }
    counts
}

fn classify_cluster(size: usize, counts: &InternalCounts, thresholds: &Thresholds) -> ClusterType {
    if size == 2 {
        return ClusterType::Dyad;
    }

    let ratio = if counts.total == 0 {
        0.0
    } else {
        counts.aggression as f64 / counts.total as f64 * 100.0
    };

    if ratio > thresholds.clusters.problematic_min_aggression_ratio {
        ClusterType::Problematic
    } else if ratio < thresholds.clusters.positive_max_aggression_ratio {
        ClusterType::Positive
    } else {
        ClusterType::Neutral
    }
}

pub fn score_cluster(
    id: String,
    members: Vec<Uuid>,
    relations: &[SocialRelation],
    thresholds: &Thresholds,
) -> SocialCluster {
    let member_set: HashSet<Uuid> = members.iter().copied().collect();
    let counts = internal_counts(&member_set, relations);
    let size = members.len();

    let possible = size * size.saturating_sub(1);
    let density = if possible == 0 {
        0.0
    } else {
        (counts.total as f64 / possible as f64 * 100.0).min(100.0)
    };

    let signed = counts.positive + counts.negative;
    let cohesion = if signed == 0 {
        50.0
    } else {
        counts.positive as f64 / signed as f64 * 100.0
    };

    SocialCluster {
        id,
        cluster_type: classify_cluster(size, &counts, thresholds),
        members,
        density,
        cohesion,
    }
}

pub fn detect_clusters(
    students: &[Student],
    relations: &[SocialRelation],
    indices: &[SociometricIndex],
    thresholds: &Thresholds,
) -> Vec<SocialCluster> {
    let (graph, nodes) = strong_tie_graph(students, relations, thresholds);
    let popularity: HashMap<Uuid, f64> = indices
        .iter()
        .map(|index| (index.student_id, index.popularity))
        .collect();
    let mut visited: HashSet<NodeIndex> = HashSet::new();
    let mut clusters = Vec::new();

    for student in students {
        let Some(&start) = nodes.get(&student.id) else {
            continue;
        };
        if visited.contains(&start) {
            continue;
        }

        let mut members = Vec::new();
        let mut dfs = Dfs::new(&graph, start);
        while let Some(node) = dfs.next(&graph) {
            visited.insert(node);
            members.push(graph[node]);
        }

        if members.len() < 2 {
            continue;
        }
        members.sort_by(|a, b| {
            let pa = popularity.get(a).copied().unwrap_or(0.0);
            let pb = popularity.get(b).copied().unwrap_or(0.0);
            pb.partial_cmp(&pa).unwrap_or(std::cmp::Ordering::Equal)
        });

        let id = format!("cluster-{}", clusters.len() + 1);
        clusters.push(score_cluster(id, members, relations, thresholds));
    }

    tracing::debug!(clusters = clusters.len(), "clusters detected");
    clusters
}

/// Map each clustered student to its cluster id.
pub fn membership(clusters: &[SocialCluster]) -> HashMap<Uuid, String> {
    clusters
        .iter()
        .flat_map(|cluster| cluster.members.iter().map(|member| (*member, cluster.id.clone())))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn student(n: u128) -> Student {
        Student {
            id: Uuid::from_u128(n),
            name: format!("Student {n}"),
            group_id: "5A".to_string(),
            age: None,
            gender: None,
        }
    }

    fn relation(from: u128, to: u128, relation_type: RelationType, reciprocal: bool) -> SocialRelation {
        SocialRelation {
            origin_id: Uuid::from_u128(from),
            target_id: Uuid::from_u128(to),
            relation_type,
            intensity: 1,
            reciprocal,
        }
    }

    fn mutual(a: u128, b: u128) -> Vec<SocialRelation> {
        vec![
            relation(a, b, RelationType::Choice, true),
            relation(b, a, RelationType::Choice, true),
        ]
    }

    #[test]
    fn disjoint_pairs_form_two_dyads() {
        let students: Vec<Student> = (1..=4).map(student).collect();
        let mut relations = mutual(1, 2);
        relations.extend(mutual(3, 4));

        let clusters = detect_clusters(&students, &relations, &[], &Thresholds::default());
        assert_eq!(clusters.len(), 2);
        assert!(clusters.iter().all(|c| c.cluster_type == ClusterType::Dyad));
        assert!(clusters.iter().all(|c| c.members.len() == 2));
        assert!(clusters.iter().all(|c| (c.density - 100.0).abs() < 0.01));
    }

    #[test]
    fn members_are_ordered_by_popularity() {
        let students: Vec<Student> = (1..=2).map(student).collect();
        let relations = mutual(1, 2);
        let indices: Vec<SociometricIndex> = [(1, 10.0), (2, 90.0)]
            .into_iter()
            .map(|(n, popularity)| SociometricIndex {
                student_id: Uuid::from_u128(n),
                popularity,
                rejection: 0.0,
                isolation: 0.0,
                centrality: 0.0,
                social_influence: popularity,
                social_status: crate::models::SocialStatus::Average,
                bullying_role: crate::models::BullyingRole::Uninvolved,
                risk_level: crate::models::RiskLevel::Low,
            })
            .collect();

        let clusters = detect_clusters(&students, &relations, &indices, &Thresholds::default());
        assert_eq!(clusters[0].members, vec![Uuid::from_u128(2), Uuid::from_u128(1)]);
    }

    #[test]
    fn one_way_single_choices_do_not_cluster() {
        let students: Vec<Student> = (1..=3).map(student).collect();
        let relations = vec![
            relation(1, 2, RelationType::Choice, false),
            relation(2, 3, RelationType::Choice, false),
        ];
        let clusters = detect_clusters(&students, &relations, &[], &Thresholds::default());
        assert!(clusters.is_empty());
    }

    #[test]
    fn repeated_choice_counts_as_strong_tie() {
        let students: Vec<Student> = (1..=2).map(student).collect();
        let mut repeated = relation(1, 2, RelationType::Choice, false);
        repeated.intensity = 2;
        let clusters = detect_clusters(&students, &[repeated], &[], &Thresholds::default());
        assert_eq!(clusters.len(), 1);
        assert!((clusters[0].density - 50.0).abs() < 0.01);
    }

    #[test]
    fn aggression_inside_triad_is_problematic() {
        let students: Vec<Student> = (1..=3).map(student).collect();
        let mut relations = mutual(1, 2);
        relations.extend(mutual(2, 3));
        relations.push(relation(1, 3, RelationType::Aggression, false));
        relations.push(relation(3, 1, RelationType::Aggression, false));

        let clusters = detect_clusters(&students, &relations, &[], &Thresholds::default());
        assert_eq!(clusters.len(), 1);
        let cluster = &clusters[0];
        assert_eq!(cluster.members.len(), 3);
        assert_eq!(cluster.cluster_type, ClusterType::Problematic);
        assert!((cluster.density - 100.0).abs() < 0.01);
        assert!((cluster.cohesion - 66.67).abs() < 0.01);
    }

    #[test]
    fn friendly_triad_is_positive_and_partitions_students() {
        let students: Vec<Student> = (1..=5).map(student).collect();
        let mut relations = mutual(1, 2);
        relations.extend(mutual(2, 3));
        relations.extend(mutual(4, 5));

        let clusters = detect_clusters(&students, &relations, &[], &Thresholds::default());
        assert_eq!(clusters.len(), 2);
        assert_eq!(clusters[0].cluster_type, ClusterType::Positive);
        assert_eq!(clusters[0].cohesion, 100.0);

        let members = membership(&clusters);
        assert_eq!(members.len(), 5);
        let total: usize = clusters.iter().map(|c| c.members.len()).sum();
        assert_eq!(total, members.len());
    }
}

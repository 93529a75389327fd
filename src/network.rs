use std::collections::{HashMap, HashSet};

use petgraph::algo::dijkstra;
use petgraph::graph::UnGraph;
use uuid::Uuid;

use crate::models::{NetworkMetrics, RelationType, SocialCluster, SocialRelation, Student};

/// Undirected choice adjacency over the roster, indexed in roster order.
pub struct ChoiceMatrix {
    index: HashMap<Uuid, usize>,
    adjacent: Vec<Vec<bool>>,
}

impl ChoiceMatrix {
    pub fn new(students: &[Student], relations: &[SocialRelation]) -> Self {
        let index: HashMap<Uuid, usize> = students
            .iter()
            .enumerate()
            .map(|(i, student)| (student.id, i))
            .collect();
        let n = students.len();
        let mut adjacent = vec![vec![false; n]; n];

        for relation in relations
            .iter()
            .filter(|r| r.relation_type == RelationType::Choice)
        {
            if let (Some(&a), Some(&b)) = (index.get(&relation.origin_id), index.get(&relation.target_id)) {
                if a != b {
                    adjacent[a][b] = true;
                    adjacent[b][a] = true;
                }
            }
        }

        Self { index, adjacent }
    }

    fn len(&self) -> usize {
        self.adjacent.len()
    }

    pub fn connected(&self, a: usize, b: usize) -> bool {
        self.adjacent[a][b]
    }

    pub fn degree(&self, a: usize) -> usize {
        self.adjacent[a].iter().filter(|edge| **edge).count()
    }

    pub fn edge_count(&self) -> usize {
        (0..self.len()).map(|a| self.degree(a)).sum::<usize>() / 2
    }

    pub fn position(&self, id: &Uuid) -> Option<usize> {
        self.index.get(id).copied()
    }
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64 * 100.0
    }
}

/// Share of connected two-paths that close into a triangle.
///
/// Walks every ordered triple, so this is O(N³). Fine for a classroom; a
/// cohort in the hundreds would want matrix-multiplication triangle counting.
pub fn transitivity(matrix: &ChoiceMatrix) -> f64 {
    let n = matrix.len();
    let mut triads = 0usize;
    let mut triangles = 0usize;

    for a in 0..n {
        for b in 0..n {
            if a == b || !matrix.connected(a, b) {
                continue;
            }
            for c in 0..n {
                if c == a || c == b || !matrix.connected(b, c) {
                    continue;
                }
                triads += 1;
                if matrix.connected(a, c) {
                    triangles += 1;
                }
            }
        }
    }

    ratio(triangles, triads)
}

/// Mean hop count over every reachable ordered pair.
pub fn average_path_length(matrix: &ChoiceMatrix) -> Option<f64> {
    let n = matrix.len();
    let mut graph: UnGraph<(), ()> = UnGraph::with_capacity(n, matrix.edge_count());
    let nodes: Vec<_> = (0..n).map(|_| graph.add_node(())).collect();
    for a in 0..n {
        for b in (a + 1)..n {
            if matrix.connected(a, b) {
                graph.add_edge(nodes[a], nodes[b], ());
            }
        }
    }

    let mut total = 0usize;
    let mut pairs = 0usize;
    for &start in &nodes {
        for (node, hops) in dijkstra(&graph, start, None, |_| 1usize) {
            if node != start {
                total += hops;
                pairs += 1;
            }
        }
    }

    (pairs > 0).then(|| total as f64 / pairs as f64)
}

/// Newman modularity of the detected clusters on the choice graph, floored
/// at zero and scaled to a percentage.
///
/// Q = Σ_c [ l_c / m - (d_c / 2m)² ], where l_c is the number of edges inside
/// cluster c and d_c the summed degree of its members.
pub fn modularity(matrix: &ChoiceMatrix, clusters: &[SocialCluster]) -> f64 {
    let m = matrix.edge_count();
    if m == 0 || clusters.is_empty() {
        return 0.0;
    }
    let m = m as f64;

    let q: f64 = clusters
        .iter()
        .map(|cluster| {
            let members: Vec<usize> = cluster
                .members
                .iter()
                .filter_map(|id| matrix.position(id))
                .collect();

            let mut internal = 0usize;
            for (i, &a) in members.iter().enumerate() {
                for &b in &members[i + 1..] {
                    if matrix.connected(a, b) {
                        internal += 1;
                    }
                }
            }
            let degree: usize = members.iter().map(|&a| matrix.degree(a)).sum();

            internal as f64 / m - (degree as f64 / (2.0 * m)).powi(2)
        })
        .sum();

    (q.max(0.0) * 100.0).min(100.0)
}

pub fn calculate_metrics(
    students: &[Student],
    relations: &[SocialRelation],
    clusters: &[SocialCluster],
) -> NetworkMetrics {
    let n = students.len();
    let choices: Vec<&SocialRelation> = relations
        .iter()
        .filter(|r| r.relation_type == RelationType::Choice)
        .collect();
    let reciprocal = choices.iter().filter(|r| r.reciprocal).count();

    let roster: HashSet<Uuid> = students.iter().map(|s| s.id).collect();
    let connected: HashSet<Uuid> = relations
        .iter()
        .flat_map(|r| [r.origin_id, r.target_id])
        .filter(|id| roster.contains(id))
        .collect();

    let matrix = ChoiceMatrix::new(students, relations);

    NetworkMetrics {
        density: ratio(choices.len(), n * n.saturating_sub(1)).min(100.0),
        reciprocity: ratio(reciprocal, choices.len()),
        transitivity: transitivity(&matrix),
        average_path_length: average_path_length(&matrix),
        modularity: modularity(&matrix, clusters),
        isolated_count: n - connected.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ClusterType;

    fn student(n: u128) -> Student {
        Student {
            id: Uuid::from_u128(n),
            name: format!("Student {n}"),
            group_id: "5A".to_string(),
            age: None,
            gender: None,
        }
    }

    fn choice(from: u128, to: u128, reciprocal: bool) -> SocialRelation {
        SocialRelation {
            origin_id: Uuid::from_u128(from),
            target_id: Uuid::from_u128(to),
            relation_type: RelationType::Choice,
            intensity: 1,
            reciprocal,
        }
    }

    fn cluster(id: &str, members: &[u128]) -> SocialCluster {
        SocialCluster {
            id: id.to_string(),
            members: members.iter().map(|n| Uuid::from_u128(*n)).collect(),
            density: 100.0,
            cohesion: 100.0,
            cluster_type: ClusterType::Dyad,
        }
    }

    #[test]
    fn empty_relations_produce_zeroed_metrics() {
        let students: Vec<Student> = (1..=5).map(student).collect();
        let metrics = calculate_metrics(&students, &[], &[]);
        assert_eq!(metrics.density, 0.0);
        assert_eq!(metrics.reciprocity, 0.0);
        assert_eq!(metrics.transitivity, 0.0);
        assert_eq!(metrics.modularity, 0.0);
        assert_eq!(metrics.average_path_length, None);
        assert_eq!(metrics.isolated_count, 5);
    }

    #[test]
    fn mutual_pair_density_and_reciprocity() {
        let students: Vec<Student> = (1..=3).map(student).collect();
        let relations = vec![choice(1, 2, true), choice(2, 1, true)];
        let metrics = calculate_metrics(&students, &relations, &[]);
        assert!((metrics.density - 33.33).abs() < 0.01);
        assert_eq!(metrics.reciprocity, 100.0);
        assert_eq!(metrics.isolated_count, 1);
        assert_eq!(metrics.average_path_length, Some(1.0));
    }

    #[test]
    fn closed_triangle_is_fully_transitive() {
        let students: Vec<Student> = (1..=3).map(student).collect();
        let closed = vec![choice(1, 2, false), choice(2, 3, false), choice(3, 1, false)];
        let open = vec![choice(1, 2, false), choice(2, 3, false)];

        let matrix = ChoiceMatrix::new(&students, &closed);
        assert_eq!(transitivity(&matrix), 100.0);

        let matrix = ChoiceMatrix::new(&students, &open);
        assert_eq!(transitivity(&matrix), 0.0);
        let path = average_path_length(&matrix).unwrap();
        assert!((path - 4.0 / 3.0).abs() < 0.001);
    }

    #[test]
    fn separated_dyads_have_positive_modularity() {
        let students: Vec<Student> = (1..=4).map(student).collect();
        let relations = vec![
            choice(1, 2, true),
            choice(2, 1, true),
            choice(3, 4, true),
            choice(4, 3, true),
        ];
        let clusters = vec![cluster("cluster-1", &[1, 2]), cluster("cluster-2", &[3, 4])];
        let matrix = ChoiceMatrix::new(&students, &relations);
        // two edges, each cluster: 1/2 - (2/4)^2 = 0.25
        assert!((modularity(&matrix, &clusters) - 50.0).abs() < 0.01);

        let merged = vec![cluster("cluster-1", &[1, 2, 3, 4])];
        assert_eq!(modularity(&matrix, &merged), 0.0);
    }

    #[test]
    fn extra_choice_never_lowers_density() {
        let students: Vec<Student> = (1..=4).map(student).collect();
        let mut relations = vec![choice(1, 2, false)];
        let before = calculate_metrics(&students, &relations, &[]).density;
        relations.push(choice(3, 4, false));
        let after = calculate_metrics(&students, &relations, &[]).density;
        assert!(after >= before);
    }
}

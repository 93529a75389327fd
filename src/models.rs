use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Student {
    pub id: Uuid,
    pub name: String,
    pub group_id: String,
    pub age: Option<u32>,
    pub gender: Option<String>,
}

/// Answer payload after boundary normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", tag = "kind", content = "value")]
pub enum ResponseValue {
    /// Delimited list of nominated student ids.
    Nominations(String),
    /// Numeric intensity-scale answer about the question's subject.
    Intensity(f64),
}

impl ResponseValue {
    /// Normalize a stored answer. Numbers become intensities, JSON arrays are
    /// flattened into a comma-delimited list, and any other text is treated
    /// as a delimited nomination list.
    pub fn from_stored(raw: &str) -> Self {
        let trimmed = raw.trim();
        if let Ok(value) = trimmed.parse::<f64>() {
            return ResponseValue::Intensity(value);
        }

        if trimmed.starts_with('[') {
            if let Ok(items) = serde_json::from_str::<Vec<serde_json::Value>>(trimmed) {
                let joined = items
                    .iter()
                    .map(|item| match item {
                        serde_json::Value::String(text) => text.clone(),
                        other => other.to_string(),
                    })
                    .collect::<Vec<_>>()
                    .join(",");
                return ResponseValue::Nominations(joined);
            }
        }

        ResponseValue::Nominations(trimmed.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawResponse {
    pub student_id: Uuid,
    pub question_id: Uuid,
    pub value: ResponseValue,
    pub timestamp: DateTime<Utc>,
}

/// Survey question metadata used to classify responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: Uuid,
    pub text: String,
    pub category: Option<String>,
    /// Student an intensity-scale item asks about.
    pub subject_id: Option<Uuid>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RelationType {
    Choice,
    Rejection,
    Aggression,
    Victimization,
}

impl RelationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationType::Choice => "choice",
            RelationType::Rejection => "rejection",
            RelationType::Aggression => "aggression",
            RelationType::Victimization => "victimization",
        }
    }

    pub fn is_negative(&self) -> bool {
        matches!(self, RelationType::Rejection | RelationType::Aggression)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SocialRelation {
    pub origin_id: Uuid,
    pub target_id: Uuid,
    #[serde(rename = "type")]
    pub relation_type: RelationType,
    pub intensity: u32,
    pub reciprocal: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SocialStatus {
    Popular,
    Average,
    Isolated,
    Rejected,
    Controversial,
}

impl SocialStatus {
    pub const ALL: [SocialStatus; 5] = [
        SocialStatus::Popular,
        SocialStatus::Average,
        SocialStatus::Isolated,
        SocialStatus::Rejected,
        SocialStatus::Controversial,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SocialStatus::Popular => "popular",
            SocialStatus::Average => "average",
            SocialStatus::Isolated => "isolated",
            SocialStatus::Rejected => "rejected",
            SocialStatus::Controversial => "controversial",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BullyingRole {
    Aggressor,
    Victim,
    AggressiveVictim,
    Bystander,
    Uninvolved,
}

impl BullyingRole {
    pub const ALL: [BullyingRole; 5] = [
        BullyingRole::Aggressor,
        BullyingRole::Victim,
        BullyingRole::AggressiveVictim,
        BullyingRole::Bystander,
        BullyingRole::Uninvolved,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BullyingRole::Aggressor => "aggressor",
            BullyingRole::Victim => "victim",
            BullyingRole::AggressiveVictim => "aggressive-victim",
            BullyingRole::Bystander => "bystander",
            BullyingRole::Uninvolved => "uninvolved",
        }
    }
}

/// Four-step scale shared by student risk levels and alert severities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

pub type RiskLevel = Severity;

impl Severity {
    pub const ALL: [Severity; 4] = [
        Severity::Low,
        Severity::Medium,
        Severity::High,
        Severity::Critical,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SociometricIndex {
    pub student_id: Uuid,
    pub popularity: f64,
    pub rejection: f64,
    pub isolation: f64,
    pub centrality: f64,
    pub social_influence: f64,
    pub social_status: SocialStatus,
    pub bullying_role: BullyingRole,
    pub risk_level: RiskLevel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ClusterType {
    Dyad,
    Positive,
    Neutral,
    Problematic,
}

impl ClusterType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClusterType::Dyad => "dyad",
            ClusterType::Positive => "positive",
            ClusterType::Neutral => "neutral",
            ClusterType::Problematic => "problematic",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SocialCluster {
    pub id: String,
    pub members: Vec<Uuid>,
    pub density: f64,
    pub cohesion: f64,
    #[serde(rename = "type")]
    pub cluster_type: ClusterType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkMetrics {
    pub density: f64,
    pub reciprocity: f64,
    pub transitivity: f64,
    pub average_path_length: Option<f64>,
    pub modularity: f64,
    pub isolated_count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AlertType {
    Isolation,
    MassRejection,
    AggressorIdentified,
    VulnerableVictim,
    ProblematicCluster,
}

impl AlertType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertType::Isolation => "isolation",
            AlertType::MassRejection => "mass-rejection",
            AlertType::AggressorIdentified => "aggressor-identified",
            AlertType::VulnerableVictim => "vulnerable-victim",
            AlertType::ProblematicCluster => "problematic-cluster",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAlert {
    pub id: String,
    /// Empty for cluster-level alerts.
    pub student_id: Option<Uuid>,
    pub cluster_id: Option<String>,
    #[serde(rename = "type")]
    pub alert_type: AlertType,
    pub severity: Severity,
    pub description: String,
    pub evidence: Vec<String>,
    pub recommendations: Vec<String>,
    pub detected_at: DateTime<Utc>,
    pub follow_up_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SociogramNode {
    pub id: Uuid,
    pub label: String,
    pub size: f64,
    pub color: String,
    pub status: SocialStatus,
    pub role: BullyingRole,
    pub cluster_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SociogramEdge {
    pub source: Uuid,
    pub target: Uuid,
    #[serde(rename = "type")]
    pub relation_type: RelationType,
    pub color: String,
    pub width: u32,
    pub reciprocal: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Sociogram {
    pub nodes: Vec<SociogramNode>,
    pub edges: Vec<SociogramEdge>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutiveSummary {
    pub total_students: usize,
    pub respondents: usize,
    pub response_coverage: f64,
    pub total_relations: usize,
    pub cluster_count: usize,
    pub critical_alerts: usize,
    pub at_risk_students: usize,
    pub status_distribution: BTreeMap<SocialStatus, usize>,
    pub role_distribution: BTreeMap<BullyingRole, usize>,
    pub risk_distribution: BTreeMap<RiskLevel, usize>,
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildDiagnostics {
    /// Responses dropped because their value could not be parsed.
    pub skipped_responses: usize,
    /// Responses whose question or respondent could not be resolved.
    pub ignored_responses: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub group_id: String,
    pub analyzed_at: DateTime<Utc>,
    pub students: Vec<Student>,
    pub relations: Vec<SocialRelation>,
    pub indices: Vec<SociometricIndex>,
    pub clusters: Vec<SocialCluster>,
    pub metrics: NetworkMetrics,
    pub alerts: Vec<RiskAlert>,
    pub sociogram: Sociogram,
    pub executive_summary: ExecutiveSummary,
    pub diagnostics: BuildDiagnostics,
}

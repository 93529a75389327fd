use std::collections::{BTreeMap, HashMap, HashSet};

use uuid::Uuid;

use crate::error::{AnalysisError, Result};
use crate::models::{
    BuildDiagnostics, Question, RawResponse, RelationType, ResponseValue, SocialRelation, Student,
};

/// Question metadata lookups the relation builder depends on.
pub trait QuestionCatalog {
    /// Relation type a question measures, `None` for questions that are not
    /// sociometric.
    fn relation_type(&self, question_id: Uuid) -> Option<RelationType>;

    /// Student an intensity-scale question is about.
    fn implied_target(&self, question_id: Uuid, origin: Uuid) -> Option<Uuid>;
}

// Whole-word phrases, checked in this order so "would not choose" hits
// rejection before choice. Aggression phrases must name the respondent as
// the actor: a nominee of "who bullies others?" is the aggressor, not the
// target, so direction-free words like "bully" are left unmapped.
const KEYWORDS: &[(RelationType, &[&str])] = &[
    (
        RelationType::Victimization,
        &[
            "victim",
            "victims",
            "picked on",
            "is bullied",
            "gets bullied",
            "are bullied",
            "mistreated",
            "left out",
        ],
    ),
    (
        RelationType::Aggression,
        &[
            "target of aggression",
            "you pick on",
            "you hit",
            "you insult",
            "you threaten",
        ],
    ),
    (
        RelationType::Rejection,
        &[
            "reject",
            "rejected",
            "not choose",
            "not like",
            "would not",
            "wouldn't",
            "like least",
            "least like",
            "dislike",
            "avoid",
        ],
    ),
    (
        RelationType::Choice,
        &[
            "choose",
            "prefer",
            "friend",
            "friends",
            "like",
            "sit with",
            "work with",
            "play with",
        ],
    ),
];

/// In-memory catalog classifying questions by category, falling back to
/// keywords in the question text.
#[derive(Debug, Clone, Default)]
pub struct QuestionBank {
    questions: HashMap<Uuid, Question>,
}

impl QuestionBank {
    pub fn new(questions: impl IntoIterator<Item = Question>) -> Self {
        Self {
            questions: questions.into_iter().map(|q| (q.id, q)).collect(),
        }
    }
}

pub fn classify_category(category: &str) -> Option<RelationType> {
    match category.trim().to_lowercase().as_str() {
        "choice" | "positive" | "preference" | "acceptance" => Some(RelationType::Choice),
        "rejection" | "negative" => Some(RelationType::Rejection),
        "aggression" => Some(RelationType::Aggression),
        "victimization" | "victim" => Some(RelationType::Victimization),
        _ => None,
    }
}

pub fn classify_text(text: &str) -> Option<RelationType> {
    let lowered = text.to_lowercase();
    let words: Vec<&str> = lowered
        .split(|c: char| !c.is_alphanumeric() && c != '\'')
        .filter(|word| !word.is_empty())
        .collect();
    let padded = format!(" {} ", words.join(" "));

    KEYWORDS
        .iter()
        .find(|(_, phrases)| {
            phrases
                .iter()
                .any(|phrase| padded.contains(&format!(" {phrase} ")))
        })
        .map(|(relation_type, _)| *relation_type)
}

impl QuestionCatalog for QuestionBank {
    fn relation_type(&self, question_id: Uuid) -> Option<RelationType> {
        let question = self.questions.get(&question_id)?;
        question
            .category
            .as_deref()
            .and_then(classify_category)
            .or_else(|| classify_text(&question.text))
    }

    fn implied_target(&self, question_id: Uuid, origin: Uuid) -> Option<Uuid> {
        self.questions
            .get(&question_id)?
            .subject_id
            .filter(|subject| *subject != origin)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RelationBuild {
    pub relations: Vec<SocialRelation>,
    pub diagnostics: BuildDiagnostics,
}

type RelationKey = (Uuid, Uuid, RelationType);

/// Split a delimited nomination list into student ids. Blank entries are
/// dropped; any entry that is not an id makes the whole answer malformed.
pub fn parse_nominations(response: &RawResponse, text: &str) -> Result<Vec<Uuid>> {
    text.split([',', ';'])
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(|token| {
            Uuid::parse_str(token).map_err(|_| AnalysisError::MalformedResponse {
                student_id: response.student_id,
                question_id: response.question_id,
                reason: format!("`{token}` is not a student id"),
            })
        })
        .collect()
}

fn record(relations: &mut BTreeMap<RelationKey, SocialRelation>, key: RelationKey) {
    relations
        .entry(key)
        .and_modify(|relation| relation.intensity += 1)
        .or_insert_with(|| SocialRelation {
            origin_id: key.0,
            target_id: key.1,
            relation_type: key.2,
            intensity: 1,
            reciprocal: false,
        });
}

fn mark_reciprocity(relations: &mut BTreeMap<RelationKey, SocialRelation>) {
    let mirrored: Vec<RelationKey> = relations
        .keys()
        .filter(|(origin, target, relation_type)| {
            relations.contains_key(&(*target, *origin, *relation_type))
        })
        .copied()
        .collect();

    for key in mirrored {
        if let Some(relation) = relations.get_mut(&key) {
            relation.reciprocal = true;
        }
    }
}

pub fn build_relations(
    students: &[Student],
    responses: &[RawResponse],
    catalog: &impl QuestionCatalog,
) -> RelationBuild {
    let roster: HashSet<Uuid> = students.iter().map(|student| student.id).collect();
    let mut relations: BTreeMap<RelationKey, SocialRelation> = BTreeMap::new();
    let mut diagnostics = BuildDiagnostics::default();

    for response in responses {
        let origin = response.student_id;
        if !roster.contains(&origin) {
            tracing::debug!(student = %origin, "response from student outside roster ignored");
            diagnostics.ignored_responses += 1;
            continue;
        }

        let Some(relation_type) = catalog.relation_type(response.question_id) else {
            diagnostics.ignored_responses += 1;
            continue;
        };

        match &response.value {
            ResponseValue::Nominations(text) => {
                let targets = match parse_nominations(response, text) {
                    Ok(targets) => targets,
                    Err(err) => {
                        tracing::warn!(error = %err, "skipping malformed response");
                        diagnostics.skipped_responses += 1;
                        continue;
                    }
                };

                let mut seen = HashSet::new();
                for target in targets {
                    if target == origin || !roster.contains(&target) || !seen.insert(target) {
                        continue;
                    }
                    record(&mut relations, (origin, target, relation_type));
                }
            }
            ResponseValue::Intensity(value) => {
                if !value.is_finite() {
                    let err = AnalysisError::MalformedResponse {
                        student_id: origin,
                        question_id: response.question_id,
                        reason: format!("intensity `{value}` is not a number"),
                    };
                    tracing::warn!(error = %err, "skipping malformed response");
                    diagnostics.skipped_responses += 1;
                    continue;
                }
                if *value <= 0.0 {
                    continue;
                }

                match catalog.implied_target(response.question_id, origin) {
                    Some(target) if target != origin && roster.contains(&target) => {
                        record(&mut relations, (origin, target, relation_type));
                    }
                    _ => diagnostics.ignored_responses += 1,
                }
            }
        }
    }

    mark_reciprocity(&mut relations);

    tracing::debug!(
        relations = relations.len(),
        skipped = diagnostics.skipped_responses,
        ignored = diagnostics.ignored_responses,
        "relations built"
    );

    RelationBuild {
        relations: relations.into_values().collect(),
        diagnostics,
    }
}

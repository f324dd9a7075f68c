use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use thiserror::Error;

use super::error::TemplateError;
use super::template::{QuestionKind, QuestionTemplate, SlotValue};

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read template file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("template JSON decode failed: {0}")]
    Json(#[from] serde_json::Error),
    #[error("template `{id}` is invalid: {source}")]
    Template {
        id: String,
        #[source]
        source: TemplateError,
    },
    #[error("duplicate template id `{0}`")]
    DuplicateId(String),
}

/// Immutable set of templates defined at process start.
#[derive(Debug, Clone, Default)]
pub struct TemplateCatalog {
    templates: Vec<QuestionTemplate>,
}

impl TemplateCatalog {
    pub fn new(templates: Vec<QuestionTemplate>) -> Result<Self, CatalogError> {
        let mut ids = HashSet::new();
        for template in &templates {
            template.validate().map_err(|source| CatalogError::Template {
                id: template.id.clone(),
                source,
            })?;
            if !ids.insert(template.id.as_str()) {
                return Err(CatalogError::DuplicateId(template.id.clone()));
            }
        }
        Ok(Self { templates })
    }

    /// Accepts a JSON array of templates.
    pub fn from_json_str(json: &str) -> Result<Self, CatalogError> {
        let templates: Vec<QuestionTemplate> = serde_json::from_str(json)?;
        Self::new(templates)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&raw)
    }

    pub fn builtin() -> Result<Self, CatalogError> {
        Self::new(builtin_templates())
    }

    pub fn templates(&self) -> &[QuestionTemplate] {
        &self.templates
    }

    pub fn get(&self, id: &str) -> Option<&QuestionTemplate> {
        self.templates.iter().find(|t| t.id == id)
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

fn numbers(values: impl IntoIterator<Item = i64>) -> Vec<SlotValue> {
    values.into_iter().map(|v| SlotValue::Number(v as f64)).collect()
}

fn words(values: &[&str]) -> Vec<SlotValue> {
    values.iter().map(|v| SlotValue::Text(v.to_string())).collect()
}

const NAMES: [&str; 6] = ["Maya", "Leo", "Aisha", "Tom", "Priya", "Sam"];

#[allow(clippy::too_many_arguments)]
fn math_template(
    id: &str,
    skill_area: &str,
    kind: QuestionKind,
    difficulty_level: u8,
    template: &str,
    slots: Vec<(&str, Vec<SlotValue>)>,
    formula: &str,
    explanation: &str,
) -> QuestionTemplate {
    QuestionTemplate {
        id: id.to_string(),
        subject: "math".to_string(),
        skill_area: skill_area.to_string(),
        kind,
        difficulty_level,
        template: template.to_string(),
        slots: slots
            .into_iter()
            .map(|(name, pool)| (name.to_string(), pool))
            .collect::<BTreeMap<_, _>>(),
        correct_answer_formula: formula.to_string(),
        explanation_template: explanation.to_string(),
        distractor_count: None,
    }
}

fn builtin_templates() -> Vec<QuestionTemplate> {
    vec![
        math_template(
            "math-add-story-1",
            "addition",
            QuestionKind::WordProblem,
            1,
            "{name} has {a} {item} and gets {b} more. How many {item} does {name} have now?",
            vec![
                ("name", words(&NAMES)),
                ("item", words(&["apples", "marbles", "stickers", "shells"])),
                ("a", numbers(2..=12)),
                ("b", numbers(1..=9)),
            ],
            "a + b",
            "{name} starts with {a} and adds {b}: {a} + {b} = {answer}.",
        ),
        math_template(
            "math-add-calc-2",
            "addition",
            QuestionKind::Calculation,
            2,
            "What is {a} + {b} + {c}?",
            vec![
                ("a", numbers(10..=60)),
                ("b", numbers(10..=60)),
                ("c", numbers(5..=30)),
            ],
            "a + b + c",
            "Add the tens and ones column by column: {a} + {b} + {c} = {answer}.",
        ),
        math_template(
            "math-sub-story-1",
            "subtraction",
            QuestionKind::WordProblem,
            1,
            "{name} had {a} cookies and shared {b} with friends. How many cookies are left?",
            vec![
                ("name", words(&NAMES)),
                ("a", numbers(10..=20)),
                ("b", numbers(1..=9)),
            ],
            "a - b",
            "Take {b} away from {a}: {a} - {b} = {answer}.",
        ),
        math_template(
            "math-mul-calc-2",
            "multiplication",
            QuestionKind::Calculation,
            2,
            "What is {a} x {b}?",
            vec![("a", numbers(2..=9)), ("b", numbers(2..=9))],
            "a * b",
            "{a} groups of {b} make {answer}.",
        ),
        math_template(
            "math-mul-story-3",
            "multiplication",
            QuestionKind::WordProblem,
            3,
            "A box holds {a} pencils. {name} has {b} full boxes and {c} loose pencils. How many pencils in total?",
            vec![
                ("name", words(&NAMES)),
                ("a", numbers(6..=12)),
                ("b", numbers(3..=9)),
                ("c", numbers(1..=5)),
            ],
            "a * b + c",
            "{b} boxes of {a} is {a} x {b}, plus {c} loose pencils gives {answer}.",
        ),
        math_template(
            "math-div-calc-3",
            "division",
            QuestionKind::Calculation,
            3,
            "What is {a} divided by {b}?",
            vec![
                ("a", numbers([12, 18, 24, 30, 36, 48, 60, 72])),
                ("b", numbers([2, 3, 4, 6])),
            ],
            "a / b",
            "{a} split into {b} equal parts is {answer}.",
        ),
        math_template(
            "math-pct-concept-3",
            "percentages",
            QuestionKind::Concept,
            3,
            "What is {p}% of {n}?",
            vec![
                ("p", numbers([10, 20, 25, 50, 75])),
                ("n", numbers([40, 80, 120, 200, 360])),
            ],
            "p * n / 100",
            "{p}% means {p} out of every 100, so {p}% of {n} is {answer}.",
        ),
    ]
}

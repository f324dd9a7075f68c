use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::error::TemplateError;
use super::formula::Formula;

pub const ANSWER_PLACEHOLDER: &str = "answer";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionKind {
    WordProblem,
    Calculation,
    Concept,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SlotValue {
    Number(f64),
    Text(String),
}

impl SlotValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(v) => Some(*v),
            Self::Text(_) => None,
        }
    }

    pub fn render(&self) -> String {
        match self {
            Self::Number(v) => format_number(*v),
            Self::Text(s) => s.clone(),
        }
    }
}

impl From<f64> for SlotValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<&str> for SlotValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl fmt::Display for SlotValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionTemplate {
    pub id: String,
    pub subject: String,
    pub skill_area: String,
    pub kind: QuestionKind,
    pub difficulty_level: u8,
    pub template: String,
    pub slots: BTreeMap<String, Vec<SlotValue>>,
    pub correct_answer_formula: String,
    pub explanation_template: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distractor_count: Option<usize>,
}

impl QuestionTemplate {
    /// Checks every authoring rule and returns the parsed pieces needed to
    /// render the template.
    pub fn prepare(&self) -> Result<PreparedTemplate, TemplateError> {
        if self.id.trim().is_empty() {
            return Err(TemplateError::Invalid("template id is empty".to_string()));
        }
        if self.difficulty_level == 0 {
            return Err(TemplateError::Invalid(format!(
                "difficulty level of `{}` must be at least 1",
                self.id
            )));
        }
        if self.distractor_count == Some(0) {
            return Err(TemplateError::Invalid(format!(
                "distractor count of `{}` must be at least 1",
                self.id
            )));
        }
        if let Some((name, _)) = self.slots.iter().find(|(_, pool)| pool.is_empty()) {
            return Err(TemplateError::EmptySlotPool(name.clone()));
        }

        let question = parse_segments(&self.template, false)?;
        let explanation = parse_segments(&self.explanation_template, true)?;
        for segment in question.iter().chain(explanation.iter()) {
            if let Segment::Slot(name) = segment {
                if !self.slots.contains_key(name) {
                    return Err(TemplateError::UnknownPlaceholder(name.clone()));
                }
            }
        }

        let formula = Formula::parse(&self.correct_answer_formula)?;
        for name in formula.slot_names() {
            match self.slots.get(&name) {
                None => return Err(TemplateError::UnknownSlot(name)),
                Some(pool) if pool.iter().any(|v| v.as_number().is_none()) => {
                    return Err(TemplateError::NonNumericSlot(name))
                }
                Some(_) => {}
            }
        }

        Ok(PreparedTemplate {
            question,
            explanation,
            formula,
        })
    }

    pub fn validate(&self) -> Result<(), TemplateError> {
        self.prepare().map(|_| ())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    Literal(String),
    Slot(String),
    Answer,
}

#[derive(Debug, Clone)]
pub struct PreparedTemplate {
    pub question: Vec<Segment>,
    pub explanation: Vec<Segment>,
    pub formula: Formula,
}

pub fn render_segments(
    segments: &[Segment],
    values: &BTreeMap<String, SlotValue>,
    answer: &str,
) -> String {
    let mut out = String::new();
    for segment in segments {
        match segment {
            Segment::Literal(text) => out.push_str(text),
            Segment::Slot(name) => {
                if let Some(value) = values.get(name) {
                    out.push_str(&value.render());
                }
            }
            Segment::Answer => out.push_str(answer),
        }
    }
    out
}

/// Splits `{name}` placeholders out of `text`. `{answer}` is only legal when
/// `allow_answer` is set.
pub fn parse_segments(text: &str, allow_answer: bool) -> Result<Vec<Segment>, TemplateError> {
    let mut segments = Vec::new();
    let mut rest = text;

    while let Some(open) = rest.find('{') {
        if open > 0 {
            segments.push(Segment::Literal(rest[..open].to_string()));
        }
        let after = &rest[open + 1..];
        let close = after
            .find('}')
            .ok_or_else(|| TemplateError::UnterminatedPlaceholder(text.to_string()))?;
        let name = after[..close].trim();
        if name.is_empty() || name.contains('{') {
            return Err(TemplateError::UnterminatedPlaceholder(text.to_string()));
        }
        if name == ANSWER_PLACEHOLDER {
            if !allow_answer {
                return Err(TemplateError::UnknownPlaceholder(name.to_string()));
            }
            segments.push(Segment::Answer);
        } else {
            segments.push(Segment::Slot(name.to_string()));
        }
        rest = &after[close + 1..];
    }

    if !rest.is_empty() {
        segments.push(Segment::Literal(rest.to_string()));
    }
    Ok(segments)
}

/// Renders with at most two decimals, trimming trailing zeros.
pub fn format_number(value: f64) -> String {
    let rounded = round2(value);
    if rounded == 0.0 {
        return "0".to_string();
    }
    if rounded.fract() == 0.0 && rounded.abs() < 1e15 {
        return format!("{}", rounded as i64);
    }
    let text = format!("{rounded:.2}");
    text.trim_end_matches('0').trim_end_matches('.').to_string()
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

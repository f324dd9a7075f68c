use std::time::Instant;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[derive(Default)]
pub enum DifficultyLevel {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl DifficultyLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Easy => "easy",
            Self::Medium => "medium",
            Self::Hard => "hard",
        }
    }

    pub fn harder(&self) -> Self {
        match self {
            Self::Easy => Self::Medium,
            _ => Self::Hard,
        }
    }

    pub fn easier(&self) -> Self {
        match self {
            Self::Hard => Self::Medium,
            _ => Self::Easy,
        }
    }

    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "easy" => Self::Easy,
            "hard" => Self::Hard,
            _ => Self::Medium,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Indicator {
    SlowResponse,
    ExcessiveHints,
    ConsecutiveErrors,
    QuickCorrectResponse,
    CorrectStreak,
}

impl Indicator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SlowResponse => "slow_response",
            Self::ExcessiveHints => "excessive_hints",
            Self::ConsecutiveErrors => "consecutive_errors",
            Self::QuickCorrectResponse => "quick_correct_response",
            Self::CorrectStreak => "correct_streak",
        }
    }
}

/// Live per-atom signal, owned by the adaptive manager until the atom
/// session ends.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AtomMetrics {
    pub consecutive_correct: u32,
    pub consecutive_incorrect: u32,
    pub total_attempts: u32,
    pub total_response_time: f64,
    pub average_response_time: f64,
    pub hints_requested: u32,
    pub struggling_indicators: Vec<Indicator>,
    pub mastery_indicators: Vec<Indicator>,
    pub first_attempt_correct: Option<bool>,
    pub started_at: i64,
    #[serde(skip, default = "Instant::now")]
    pub last_activity: Instant,
    /// Set once the record has been ended or evicted.
    #[serde(skip)]
    pub closed: bool,
}

impl AtomMetrics {
    pub fn new(started_at: i64) -> Self {
        Self {
            consecutive_correct: 0,
            consecutive_incorrect: 0,
            total_attempts: 0,
            total_response_time: 0.0,
            average_response_time: 0.0,
            hints_requested: 0,
            struggling_indicators: Vec::new(),
            mastery_indicators: Vec::new(),
            first_attempt_correct: None,
            started_at,
            last_activity: Instant::now(),
            closed: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AtomPerformanceRecord {
    pub atom_id: String,
    pub attempts: u32,
    pub time_taken_seconds: f64,
    pub hints_used: u32,
    pub success: bool,
    pub first_attempt_success: bool,
    pub timestamp: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentModifications {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub simplified_instructions: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub step_by_step: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub additional_hints: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extension_challenge: Option<String>,
}

impl ContentModifications {
    pub fn scaffolding() -> Self {
        Self {
            simplified_instructions: Some(
                "Let's take this one step at a time. Read each step, then try it before moving on."
                    .to_string(),
            ),
            step_by_step: vec![
                "1. Read the question slowly and find the numbers you need.".to_string(),
                "2. Decide which operation connects those numbers.".to_string(),
                "3. Work it out and check your answer against the question.".to_string(),
            ],
            additional_hints: vec![
                "Try drawing a picture or writing the numbers down.".to_string(),
                "Look back at a similar example you solved before.".to_string(),
            ],
            extension_challenge: None,
        }
    }

    pub fn extension() -> Self {
        Self {
            extension_challenge: Some(
                "Bonus challenge: solve it a second way and explain why both methods agree."
                    .to_string(),
            ),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdaptationDecision {
    pub should_adapt: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_difficulty: Option<DifficultyLevel>,
    pub reason: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modifications: Option<ContentModifications>,
}

impl AdaptationDecision {
    pub fn keep(reason: impl Into<String>) -> Self {
        Self {
            should_adapt: false,
            new_difficulty: None,
            reason: reason.into(),
            modifications: None,
        }
    }
}

/// One question or micro-activity as seen by the adaptive layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearningAtom {
    pub id: String,
    pub title: String,
    pub description: String,
    pub difficulty: DifficultyLevel,
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

use serde::{Deserialize, Serialize};

pub const MIN_DIFFICULTY_LEVEL: u8 = 1;
pub const MAX_DIFFICULTY_LEVEL: u8 = 5;

const INCREASE_ACCURACY: f64 = 85.0;
const INCREASE_CONSISTENCY: f64 = 80.0;
const INCREASE_ENGAGEMENT: f64 = 90.0;
const INCREASE_RECENT_SCORE: f64 = 80.0;
const INCREASE_WINDOW: usize = 3;

const DECREASE_ACCURACY: f64 = 60.0;
const DECREASE_CONSISTENCY: f64 = 50.0;
const DECREASE_ENGAGEMENT: f64 = 60.0;
const DECREASE_RECENT_SCORE: f64 = 65.0;
const DECREASE_WINDOW: usize = 2;

const CELEBRATE_ACCURACY: f64 = 75.0;

const REALTIME_WINDOW: usize = 3;
const FAST_RESPONSE_SECS: f64 = 15.0;
const SLOW_RESPONSE_SECS: f64 = 60.0;

/// Aggregates computed from stored performance records. Percentages are 0-100.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoricalPerformanceMetrics {
    pub accuracy_rate: f64,
    pub consistency_score: f64,
    pub engagement_level: f64,
    #[serde(default)]
    pub recent_scores: Vec<f64>,
    #[serde(default)]
    pub strength_areas: Vec<String>,
    #[serde(default)]
    pub challenge_areas: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestionContext {
    pub user_id: String,
    pub subject: String,
    pub skill_area: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EncouragementStrategy {
    Challenge,
    Support,
    Celebrate,
    Encourage,
}

impl EncouragementStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Challenge => "challenge",
            Self::Support => "support",
            Self::Celebrate => "celebrate",
            Self::Encourage => "encourage",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DifficultyAdjustment {
    pub previous_difficulty_level: u8,
    pub new_difficulty_level: u8,
    pub reason: String,
    pub encouragement_strategy: EncouragementStrategy,
    pub recommended_interventions: Vec<String>,
    pub suggested_practice_areas: Vec<String>,
}

/// Recommends the starting difficulty for the next session of a skill.
pub fn suggest(
    current_difficulty: u8,
    metrics: &HistoricalPerformanceMetrics,
    context: &SuggestionContext,
) -> DifficultyAdjustment {
    let current = current_difficulty.clamp(MIN_DIFFICULTY_LEVEL, MAX_DIFFICULTY_LEVEL);

    let adjustment = if should_increase(metrics) {
        DifficultyAdjustment {
            previous_difficulty_level: current,
            new_difficulty_level: (current + 1).min(MAX_DIFFICULTY_LEVEL),
            reason: format!(
                "Strong, consistent performance (accuracy {:.0}%, consistency {:.0}%, engagement {:.0}%) indicates readiness for more challenge.",
                metrics.accuracy_rate, metrics.consistency_score, metrics.engagement_level
            ),
            encouragement_strategy: EncouragementStrategy::Challenge,
            recommended_interventions: strings(&[
                "Introduce multi-step problems",
                "Offer optional extension activities",
                "Reduce hint availability",
            ]),
            suggested_practice_areas: practice_areas(
                &metrics.strength_areas,
                &["advanced_problem_solving", "real_world_applications"],
            ),
        }
    } else if should_decrease(metrics) {
        DifficultyAdjustment {
            previous_difficulty_level: current,
            new_difficulty_level: current.saturating_sub(1).max(MIN_DIFFICULTY_LEVEL),
            reason: format!(
                "Recent performance (accuracy {:.0}%, consistency {:.0}%, engagement {:.0}%) suggests the learner needs more support.",
                metrics.accuracy_rate, metrics.consistency_score, metrics.engagement_level
            ),
            encouragement_strategy: EncouragementStrategy::Support,
            recommended_interventions: strings(&[
                "Provide worked examples before practice",
                "Break problems into smaller steps",
                "Increase hint availability",
                "Schedule a short review of prerequisite skills",
            ]),
            suggested_practice_areas: practice_areas(
                &metrics.challenge_areas,
                &["foundational_review", "guided_practice"],
            ),
        }
    } else {
        let strategy = if metrics.accuracy_rate >= CELEBRATE_ACCURACY {
            EncouragementStrategy::Celebrate
        } else {
            EncouragementStrategy::Encourage
        };
        DifficultyAdjustment {
            previous_difficulty_level: current,
            new_difficulty_level: current,
            reason: "Performance is steady at the current level; keep building fluency."
                .to_string(),
            encouragement_strategy: strategy,
            recommended_interventions: strings(&[
                "Continue mixed practice at the current level",
                "Review mistakes from the last session",
            ]),
            suggested_practice_areas: practice_areas(&metrics.challenge_areas, &["mixed_practice"]),
        }
    };

    tracing::debug!(
        user_id = %context.user_id,
        subject = %context.subject,
        skill_area = %context.skill_area,
        previous = adjustment.previous_difficulty_level,
        new = adjustment.new_difficulty_level,
        strategy = adjustment.encouragement_strategy.as_str(),
        "difficulty suggestion computed"
    );
    adjustment
}

fn should_increase(metrics: &HistoricalPerformanceMetrics) -> bool {
    metrics.accuracy_rate >= INCREASE_ACCURACY
        && metrics.consistency_score >= INCREASE_CONSISTENCY
        && metrics.engagement_level >= INCREASE_ENGAGEMENT
        && last_n(&metrics.recent_scores, INCREASE_WINDOW)
            .is_some_and(|scores| scores.iter().all(|s| *s >= INCREASE_RECENT_SCORE))
}

fn should_decrease(metrics: &HistoricalPerformanceMetrics) -> bool {
    metrics.accuracy_rate <= DECREASE_ACCURACY
        || metrics.consistency_score <= DECREASE_CONSISTENCY
        || metrics.engagement_level <= DECREASE_ENGAGEMENT
        || last_n(&metrics.recent_scores, DECREASE_WINDOW)
            .is_some_and(|scores| scores.iter().all(|s| *s <= DECREASE_RECENT_SCORE))
}

fn last_n(values: &[f64], n: usize) -> Option<&[f64]> {
    if values.len() < n {
        return None;
    }
    Some(&values[values.len() - n..])
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn practice_areas(areas: &[String], fillers: &[&str]) -> Vec<String> {
    let mut out: Vec<String> = areas.iter().take(2).cloned().collect();
    out.extend(fillers.iter().map(|s| s.to_string()));
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RealtimeAdjustment {
    Easier,
    Harder,
    Maintain,
}

/// Question-by-question nudge from the last three answers. Needs three
/// answered questions before it will move in either direction.
pub fn get_realtime_adjustment(
    question_number: usize,
    recent_answers: &[bool],
    response_time_seconds: f64,
) -> RealtimeAdjustment {
    if question_number < REALTIME_WINDOW || recent_answers.len() < REALTIME_WINDOW {
        return RealtimeAdjustment::Maintain;
    }
    let window = &recent_answers[recent_answers.len() - REALTIME_WINDOW..];
    let correct = window.iter().filter(|a| **a).count();

    if correct == REALTIME_WINDOW && response_time_seconds < FAST_RESPONSE_SECS {
        RealtimeAdjustment::Harder
    } else if correct == 0 || (correct == 1 && response_time_seconds > SLOW_RESPONSE_SECS) {
        RealtimeAdjustment::Easier
    } else {
        RealtimeAdjustment::Maintain
    }
}

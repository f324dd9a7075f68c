use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde_json::Value;

use crate::adaptive::types::{
    AdaptationDecision, AtomMetrics, AtomPerformanceRecord, ContentModifications, DifficultyLevel,
    Indicator, LearningAtom,
};
use crate::config::SessionThresholds;

/// Tracks per-atom streaks, timing and hint usage for live learning sessions.
///
/// The outer map lock is held only to look up, insert or remove an entry;
/// updates to a single atom are serialized by that atom's own mutex.
pub struct AdaptiveDifficultyManager {
    thresholds: SessionThresholds,
    atoms: RwLock<HashMap<String, Arc<Mutex<AtomMetrics>>>>,
}

impl Default for AdaptiveDifficultyManager {
    fn default() -> Self {
        Self::new(SessionThresholds::default())
    }
}

impl AdaptiveDifficultyManager {
    pub fn new(thresholds: SessionThresholds) -> Self {
        Self {
            thresholds,
            atoms: RwLock::new(HashMap::new()),
        }
    }

    pub fn thresholds(&self) -> &SessionThresholds {
        &self.thresholds
    }

    /// Returns `false` and keeps the existing record when the atom is
    /// already live.
    pub fn start_atom_session(&self, atom_id: &str) -> bool {
        let mut atoms = self.atoms.write();
        if atoms.contains_key(atom_id) {
            tracing::warn!(atom_id, "atom session already active, keeping existing metrics");
            return false;
        }
        atoms.insert(
            atom_id.to_string(),
            Arc::new(Mutex::new(AtomMetrics::new(Utc::now().timestamp_millis()))),
        );
        tracing::debug!(atom_id, "atom session started");
        true
    }

    pub fn record_atom_interaction(
        &self,
        atom_id: &str,
        is_correct: bool,
        response_time_seconds: f64,
        hints_used: u32,
    ) -> bool {
        let Some(entry) = self.entry(atom_id) else {
            tracing::warn!(atom_id, "interaction recorded for unknown atom session");
            return false;
        };
        self.apply_interaction(atom_id, &entry, is_correct, response_time_seconds, hints_used)
    }

    fn apply_interaction(
        &self,
        atom_id: &str,
        entry: &Mutex<AtomMetrics>,
        is_correct: bool,
        response_time_seconds: f64,
        hints_used: u32,
    ) -> bool {
        let mut metrics = entry.lock();
        if metrics.closed {
            tracing::warn!(atom_id, "interaction arrived after atom session ended");
            return false;
        }
        let t = &self.thresholds;
        let response_time_seconds = response_time_seconds.max(0.0);

        metrics.total_attempts = metrics.total_attempts.saturating_add(1);
        metrics.total_response_time += response_time_seconds;
        metrics.average_response_time = metrics.total_response_time / metrics.total_attempts as f64;
        metrics.hints_requested = metrics.hints_requested.saturating_add(hints_used);
        if metrics.first_attempt_correct.is_none() {
            metrics.first_attempt_correct = Some(is_correct);
        }

        if is_correct {
            metrics.consecutive_correct = metrics.consecutive_correct.saturating_add(1);
            metrics.consecutive_incorrect = 0;
        } else {
            metrics.consecutive_incorrect = metrics.consecutive_incorrect.saturating_add(1);
            metrics.consecutive_correct = 0;
        }

        let mut struggling = Vec::new();
        if response_time_seconds > t.slow_response_secs {
            struggling.push(Indicator::SlowResponse);
        }
        if hints_used > t.excessive_hints {
            struggling.push(Indicator::ExcessiveHints);
        }
        if metrics.consecutive_incorrect >= t.struggle_consecutive_incorrect {
            struggling.push(Indicator::ConsecutiveErrors);
        }

        let mut mastery = Vec::new();
        if response_time_seconds < t.quick_response_secs && hints_used == 0 {
            mastery.push(Indicator::QuickCorrectResponse);
        }
        if metrics.consecutive_correct >= t.mastery_consecutive_correct {
            mastery.push(Indicator::CorrectStreak);
        }

        let cap = t.indicator_cap();
        append_capped(&mut metrics.struggling_indicators, struggling, cap);
        append_capped(&mut metrics.mastery_indicators, mastery, cap);
        metrics.last_activity = Instant::now();

        tracing::debug!(
            atom_id,
            is_correct,
            attempts = metrics.total_attempts,
            consecutive_correct = metrics.consecutive_correct,
            consecutive_incorrect = metrics.consecutive_incorrect,
            "atom interaction recorded"
        );
        true
    }

    /// Struggle is checked before mastery, so a learner showing both is
    /// routed to support.
    pub fn should_adapt_difficulty(&self, atom_id: &str) -> AdaptationDecision {
        let Some(entry) = self.entry(atom_id) else {
            return AdaptationDecision::keep("no active session for atom");
        };
        let metrics = entry.lock();
        let t = &self.thresholds;

        if metrics.total_attempts < t.min_attempts {
            return AdaptationDecision::keep("not enough attempts to judge performance");
        }

        if metrics.struggling_indicators.len() >= t.struggle_indicator_count
            || metrics.consecutive_incorrect >= t.struggle_consecutive_incorrect
        {
            return AdaptationDecision {
                should_adapt: true,
                new_difficulty: Some(DifficultyLevel::Easy),
                reason: format!(
                    "learner is struggling ({} struggle signals, {} consecutive incorrect)",
                    metrics.struggling_indicators.len(),
                    metrics.consecutive_incorrect
                ),
                modifications: Some(ContentModifications::scaffolding()),
            };
        }

        if metrics.mastery_indicators.len() >= t.mastery_indicator_count
            || metrics.consecutive_correct >= t.mastery_consecutive_correct
        {
            return AdaptationDecision {
                should_adapt: true,
                new_difficulty: Some(DifficultyLevel::Hard),
                reason: format!(
                    "learner shows mastery ({} mastery signals, {} consecutive correct)",
                    metrics.mastery_indicators.len(),
                    metrics.consecutive_correct
                ),
                modifications: Some(ContentModifications::extension()),
            };
        }

        AdaptationDecision::keep("performance within expected range")
    }

    pub fn generate_adaptive_variant(
        &self,
        original: &LearningAtom,
        target: DifficultyLevel,
        modifications: &ContentModifications,
        reason: &str,
    ) -> LearningAtom {
        generate_adaptive_variant_at(original, target, modifications, reason, Utc::now())
    }

    /// Removes the live record. `None` if no session existed.
    ///
    /// `success` counts any attempted session as successful; see DESIGN.md.
    pub fn end_atom_session(&self, atom_id: &str) -> Option<AtomPerformanceRecord> {
        let Some(entry) = self.atoms.write().remove(atom_id) else {
            tracing::warn!(atom_id, "end requested for unknown atom session");
            return None;
        };
        let mut metrics = entry.lock();
        metrics.closed = true;
        let record = AtomPerformanceRecord {
            atom_id: atom_id.to_string(),
            attempts: metrics.total_attempts,
            time_taken_seconds: metrics.total_response_time,
            hints_used: metrics.hints_requested,
            success: metrics.consecutive_correct > 0 || metrics.total_attempts > 0,
            first_attempt_success: metrics.first_attempt_correct == Some(true),
            timestamp: Utc::now().timestamp_millis(),
        };
        tracing::info!(
            atom_id,
            attempts = record.attempts,
            success = record.success,
            "atom session ended"
        );
        Some(record)
    }

    pub fn metrics(&self, atom_id: &str) -> Option<AtomMetrics> {
        self.entry(atom_id).map(|entry| entry.lock().clone())
    }

    pub fn active_atoms(&self) -> usize {
        self.atoms.read().len()
    }

    /// Drops records with no activity for `max_idle`. Returns how many.
    pub fn evict_idle(&self, max_idle: Duration) -> usize {
        let mut atoms = self.atoms.write();
        let before = atoms.len();
        atoms.retain(|_, entry| {
            let mut metrics = entry.lock();
            let keep = metrics.last_activity.elapsed() < max_idle;
            if !keep {
                metrics.closed = true;
            }
            keep
        });
        before - atoms.len()
    }

    fn entry(&self, atom_id: &str) -> Option<Arc<Mutex<AtomMetrics>>> {
        self.atoms.read().get(atom_id).cloned()
    }
}

fn append_capped(list: &mut Vec<Indicator>, new: Vec<Indicator>, cap: usize) {
    list.extend(new);
    if list.len() > cap {
        let overflow = list.len() - cap;
        list.drain(..overflow);
    }
}

/// Builds a new atom; the original is never touched.
pub fn generate_adaptive_variant_at(
    original: &LearningAtom,
    target: DifficultyLevel,
    modifications: &ContentModifications,
    reason: &str,
    now: DateTime<Utc>,
) -> LearningAtom {
    let millis = now.timestamp_millis();
    let description = match target {
        DifficultyLevel::Easy => {
            let mut prefix = modifications
                .simplified_instructions
                .clone()
                .unwrap_or_else(|| "Let's break this down into smaller steps.".to_string());
            for step in &modifications.step_by_step {
                prefix.push('\n');
                prefix.push_str(step);
            }
            format!("{prefix}\n\n{}", original.description)
        }
        DifficultyLevel::Hard => {
            let challenge = modifications.extension_challenge.clone().unwrap_or_else(|| {
                "Bonus challenge: can you explain your reasoning to someone else?".to_string()
            });
            format!("{}\n\n{challenge}", original.description)
        }
        DifficultyLevel::Medium => original.description.clone(),
    };

    let mut metadata = original.metadata.clone();
    metadata.insert(
        "adaptiveModifications".to_string(),
        serde_json::to_value(modifications).unwrap_or(Value::Null),
    );
    metadata.insert(
        "originalDifficulty".to_string(),
        Value::String(original.difficulty.as_str().to_string()),
    );
    metadata.insert("adaptationReason".to_string(), Value::String(reason.to_string()));
    metadata.insert("adaptationTimestamp".to_string(), Value::String(now.to_rfc3339()));

    LearningAtom {
        id: format!("{}_{}_{}", original.id, target.as_str(), millis),
        title: original.title.clone(),
        description,
        difficulty: target,
        metadata,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_atom() -> LearningAtom {
        LearningAtom {
            id: "atom-7".to_string(),
            title: "Two-digit addition".to_string(),
            description: "Add 34 and 58.".to_string(),
            difficulty: DifficultyLevel::Medium,
            metadata: serde_json::Map::new(),
        }
    }

    #[test]
    fn test_restart_keeps_state() {
        let manager = AdaptiveDifficultyManager::default();
        assert!(manager.start_atom_session("a"));
        manager.record_atom_interaction("a", true, 5.0, 0);
        assert!(!manager.start_atom_session("a"));
        assert_eq!(manager.metrics("a").unwrap().total_attempts, 1);
    }

    #[test]
    fn test_record_without_session_is_noop() {
        let manager = AdaptiveDifficultyManager::default();
        assert!(!manager.record_atom_interaction("ghost", true, 5.0, 0));
        assert_eq!(manager.active_atoms(), 0);
    }

    #[test]
    fn test_counters_saturate() {
        let manager = AdaptiveDifficultyManager::default();
        manager.start_atom_session("a");
        assert!(manager.record_atom_interaction("a", true, 5.0, u32::MAX));
        assert!(manager.record_atom_interaction("a", true, 5.0, u32::MAX));
        assert!(manager.record_atom_interaction("a", true, 5.0, 1));
        let metrics = manager.metrics("a").unwrap();
        assert_eq!(metrics.hints_requested, u32::MAX);
        assert_eq!(metrics.total_attempts, 3);
        assert_eq!(metrics.consecutive_correct, 3);
    }

    #[test]
    fn test_interaction_after_end_is_rejected() {
        let manager = AdaptiveDifficultyManager::default();
        manager.start_atom_session("a");
        manager.record_atom_interaction("a", true, 5.0, 0);
        let held = manager.entry("a").unwrap();

        let record = manager.end_atom_session("a").unwrap();
        assert!(!manager.apply_interaction("a", &held, false, 5.0, 0));
        assert_eq!(record.attempts, 1);
        assert_eq!(held.lock().total_attempts, 1);
    }

    #[test]
    fn test_interaction_after_eviction_is_rejected() {
        let manager = AdaptiveDifficultyManager::default();
        manager.start_atom_session("a");
        let held = manager.entry("a").unwrap();

        assert_eq!(manager.evict_idle(Duration::ZERO), 1);
        assert!(!manager.apply_interaction("a", &held, true, 5.0, 0));
        assert_eq!(held.lock().total_attempts, 0);
    }

    #[test]
    fn test_average_and_hints() {
        let manager = AdaptiveDifficultyManager::default();
        manager.start_atom_session("a");
        manager.record_atom_interaction("a", false, 20.0, 1);
        manager.record_atom_interaction("a", true, 40.0, 3);
        let metrics = manager.metrics("a").unwrap();
        assert_eq!(metrics.total_attempts, 2);
        assert_eq!(metrics.average_response_time, 30.0);
        assert_eq!(metrics.hints_requested, 4);
        assert_eq!(metrics.struggling_indicators, vec![Indicator::ExcessiveHints]);
        assert_eq!(metrics.consecutive_correct, 1);
        assert_eq!(metrics.consecutive_incorrect, 0);
    }

    #[test]
    fn test_indicator_tags_per_condition() {
        let manager = AdaptiveDifficultyManager::default();
        manager.start_atom_session("a");
        manager.record_atom_interaction("a", false, 61.0, 3);
        manager.record_atom_interaction("a", false, 61.0, 0);
        let metrics = manager.metrics("a").unwrap();
        assert_eq!(
            metrics.struggling_indicators,
            vec![
                Indicator::SlowResponse,
                Indicator::ExcessiveHints,
                Indicator::SlowResponse,
                Indicator::ConsecutiveErrors,
            ]
        );
        assert!(metrics.mastery_indicators.is_empty());
    }

    #[test]
    fn test_boundary_values_do_not_trigger() {
        let manager = AdaptiveDifficultyManager::default();
        manager.start_atom_session("a");
        manager.record_atom_interaction("a", true, 60.0, 2);
        manager.record_atom_interaction("a", true, 10.0, 0);
        let metrics = manager.metrics("a").unwrap();
        assert!(metrics.struggling_indicators.is_empty());
        assert!(metrics.mastery_indicators.is_empty());
        assert!(!manager.should_adapt_difficulty("a").should_adapt);
    }

    #[test]
    fn test_indicator_cap() {
        let manager = AdaptiveDifficultyManager::new(SessionThresholds {
            max_indicators: 3,
            ..Default::default()
        });
        manager.start_atom_session("a");
        for _ in 0..10 {
            manager.record_atom_interaction("a", true, 1.0, 0);
        }
        let metrics = manager.metrics("a").unwrap();
        assert_eq!(metrics.mastery_indicators.len(), 3);
        assert_eq!(metrics.mastery_indicators[2], Indicator::CorrectStreak);
    }

    #[test]
    fn test_unknown_atom_does_not_adapt() {
        let manager = AdaptiveDifficultyManager::default();
        assert!(!manager.should_adapt_difficulty("ghost").should_adapt);
    }

    #[test]
    fn test_end_success_policy() {
        let manager = AdaptiveDifficultyManager::default();
        manager.start_atom_session("a");
        manager.record_atom_interaction("a", true, 5.0, 0);
        manager.record_atom_interaction("a", false, 5.0, 0);
        let record = manager.end_atom_session("a").unwrap();
        assert!(record.success);
        assert!(record.first_attempt_success);
        assert_eq!(record.attempts, 2);
        assert_eq!(record.time_taken_seconds, 10.0);

        manager.start_atom_session("b");
        let record = manager.end_atom_session("b").unwrap();
        assert!(!record.success);
        assert!(!record.first_attempt_success);
    }

    #[test]
    fn test_variant_easy_prefixes_description() {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let original = sample_atom();
        let mods = ContentModifications::scaffolding();
        let variant =
            generate_adaptive_variant_at(&original, DifficultyLevel::Easy, &mods, "struggling", now);

        assert_eq!(variant.id, format!("atom-7_easy_{}", now.timestamp_millis()));
        assert!(variant.description.starts_with("Let's take this one step at a time."));
        assert!(variant.description.ends_with("Add 34 and 58."));
        assert!(variant.description.contains("1. Read the question slowly"));
        assert_eq!(variant.metadata["originalDifficulty"], "medium");
        assert_eq!(variant.metadata["adaptationReason"], "struggling");
        assert_eq!(variant.metadata["adaptationTimestamp"], now.to_rfc3339().as_str());
        assert!(variant.metadata["adaptiveModifications"]["stepByStep"].is_array());
        assert!(original.metadata.is_empty());
        assert_eq!(original.description, "Add 34 and 58.");
    }

    #[test]
    fn test_variant_hard_suffixes_description() {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let variant = generate_adaptive_variant_at(
            &sample_atom(),
            DifficultyLevel::Hard,
            &ContentModifications::extension(),
            "mastery",
            now,
        );
        assert!(variant.description.starts_with("Add 34 and 58."));
        assert!(variant.description.ends_with("explain why both methods agree."));
        assert_eq!(variant.difficulty, DifficultyLevel::Hard);
    }
}

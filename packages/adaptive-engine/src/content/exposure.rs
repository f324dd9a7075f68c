use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};

use super::compiler::CompiledQuestion;
use super::pool::QuestionPool;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionKey {
    pub subject: String,
    pub skill_area: String,
    pub session_id: String,
}

impl SessionKey {
    pub fn new(subject: &str, skill_area: &str, session_id: &str) -> Self {
        Self {
            subject: subject.to_string(),
            skill_area: skill_area.to_string(),
            session_id: session_id.to_string(),
        }
    }
}

#[derive(Debug)]
struct ExposureSet {
    order: Vec<String>,
    seen: HashSet<String>,
    last_activity: Instant,
}

impl ExposureSet {
    fn new() -> Self {
        Self {
            order: Vec::new(),
            seen: HashSet::new(),
            last_activity: Instant::now(),
        }
    }

    fn insert(&mut self, id: &str) {
        if self.seen.insert(id.to_string()) {
            self.order.push(id.to_string());
        }
    }
}

/// Hands out pool questions without repeats inside a session.
///
/// Selection policy is first unseen in pool order. Each session key owns its
/// own mutex, so the check-and-insert is atomic per key while different
/// sessions proceed independently.
pub struct SessionExposureTracker {
    pool: Arc<QuestionPool>,
    sessions: RwLock<HashMap<SessionKey, Arc<Mutex<ExposureSet>>>>,
}

impl SessionExposureTracker {
    pub fn new(pool: Arc<QuestionPool>) -> Self {
        Self {
            pool,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub fn pool(&self) -> &Arc<QuestionPool> {
        &self.pool
    }

    /// Returns `None` when every matching question was already served in this
    /// session. Callers may widen the difficulty filter or reuse.
    pub fn next_question(
        &self,
        subject: &str,
        skill_area: &str,
        session_id: &str,
        difficulty_level: u8,
    ) -> Option<Arc<CompiledQuestion>> {
        let key = SessionKey::new(subject, skill_area, session_id);
        let entry = self.session_entry(&key);
        let mut exposure = entry.lock();
        exposure.last_activity = Instant::now();

        let next = self
            .pool
            .candidates(subject, skill_area, difficulty_level)
            .iter()
            .find(|question| !exposure.seen.contains(&question.id))
            .cloned();

        match next {
            Some(question) => {
                exposure.insert(&question.id);
                Some(question)
            }
            None => {
                tracing::debug!(
                    subject,
                    skill_area,
                    session_id,
                    difficulty_level,
                    served = exposure.order.len(),
                    "no question available for session"
                );
                None
            }
        }
    }

    /// Tries `difficulty_level` first, then walks outward (one easier, one
    /// harder, two easier, ...) up to `max_distance`.
    pub fn next_question_nearest(
        &self,
        subject: &str,
        skill_area: &str,
        session_id: &str,
        difficulty_level: u8,
        max_distance: u8,
    ) -> Option<Arc<CompiledQuestion>> {
        for distance in 0..=max_distance {
            let mut levels = Vec::with_capacity(2);
            if let Some(lower) = difficulty_level.checked_sub(distance).filter(|l| *l >= 1) {
                levels.push(lower);
            }
            if distance > 0 {
                if let Some(upper) = difficulty_level.checked_add(distance) {
                    levels.push(upper);
                }
            }
            for level in levels {
                if let Some(question) = self.next_question(subject, skill_area, session_id, level) {
                    return Some(question);
                }
            }
        }
        None
    }

    pub fn served(&self, key: &SessionKey) -> Vec<String> {
        let entry = self.sessions.read().get(key).cloned();
        entry
            .map(|exposure| exposure.lock().order.clone())
            .unwrap_or_default()
    }

    /// Discards the exposure set. Returns `false` if the session was unknown.
    pub fn end_session(&self, key: &SessionKey) -> bool {
        self.sessions.write().remove(key).is_some()
    }

    pub fn active_sessions(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn evict_idle(&self, max_idle: Duration) -> usize {
        let mut sessions = self.sessions.write();
        let before = sessions.len();
        sessions.retain(|_, exposure| exposure.lock().last_activity.elapsed() < max_idle);
        before - sessions.len()
    }

    fn session_entry(&self, key: &SessionKey) -> Arc<Mutex<ExposureSet>> {
        if let Some(entry) = self.sessions.read().get(key) {
            return Arc::clone(entry);
        }
        let mut sessions = self.sessions.write();
        Arc::clone(
            sessions
                .entry(key.clone())
                .or_insert_with(|| Arc::new(Mutex::new(ExposureSet::new()))),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::catalog::TemplateCatalog;
    use crate::content::compiler::QuestionCompiler;

    fn tracker(per_template: u64) -> SessionExposureTracker {
        let catalog = TemplateCatalog::builtin().unwrap();
        let pool =
            QuestionPool::precompile(&catalog, &QuestionCompiler::default(), per_template).unwrap();
        SessionExposureTracker::new(Arc::new(pool))
    }

    #[test]
    fn test_first_unseen_then_exhausted() {
        let tracker = tracker(3);
        let ids: Vec<String> = (0..3)
            .map(|_| {
                tracker
                    .next_question("math", "division", "s1", 3)
                    .unwrap()
                    .id
                    .clone()
            })
            .collect();
        assert_eq!(ids, vec!["math-div-calc-3-0", "math-div-calc-3-1", "math-div-calc-3-2"]);
        assert!(tracker.next_question("math", "division", "s1", 3).is_none());
    }

    #[test]
    fn test_sessions_are_independent() {
        let tracker = tracker(2);
        let a = tracker.next_question("math", "division", "s1", 3).unwrap();
        let b = tracker.next_question("math", "division", "s2", 3).unwrap();
        assert_eq!(a.id, b.id);
        assert_eq!(tracker.active_sessions(), 2);
    }

    #[test]
    fn test_end_session_resets_exposure() {
        let tracker = tracker(1);
        let key = SessionKey::new("math", "division", "s1");
        assert!(tracker.next_question("math", "division", "s1", 3).is_some());
        assert_eq!(tracker.served(&key), vec!["math-div-calc-3-0"]);
        assert!(tracker.end_session(&key));
        assert!(!tracker.end_session(&key));
        assert!(tracker.next_question("math", "division", "s1", 3).is_some());
    }

    #[test]
    fn test_nearest_widens_filter() {
        let tracker = tracker(1);
        let first = tracker
            .next_question_nearest("math", "addition", "s1", 1, 2)
            .unwrap();
        assert_eq!(first.difficulty_level, 1);
        let second = tracker
            .next_question_nearest("math", "addition", "s1", 1, 2)
            .unwrap();
        assert_eq!(second.difficulty_level, 2);
        assert!(tracker
            .next_question_nearest("math", "addition", "s1", 1, 2)
            .is_none());
    }

    #[test]
    fn test_evict_idle() {
        let tracker = tracker(1);
        tracker.next_question("math", "division", "s1", 3);
        assert_eq!(tracker.evict_idle(Duration::from_secs(3600)), 0);
        assert_eq!(tracker.evict_idle(Duration::ZERO), 1);
        assert_eq!(tracker.active_sessions(), 0);
    }
}

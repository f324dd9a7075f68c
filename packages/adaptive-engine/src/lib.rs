//! Adaptive content engine.
//!
//! - [`content`] compiles parameterized templates into reproducible questions
//!   and hands them out without repeats per session.
//! - [`adaptive`] tracks in-session performance per learning atom and
//!   suggests cross-session starting difficulty.
//! - [`engine`] wires the stores together from an [`config::EngineConfig`].
//!
//! ```rust
//! use adaptive_engine::config::EngineConfig;
//! use adaptive_engine::engine::AdaptiveEngine;
//!
//! let engine = AdaptiveEngine::from_config(EngineConfig::default()).unwrap();
//! let question = engine
//!     .exposure()
//!     .next_question("math", "multiplication", "session-1", 2)
//!     .unwrap();
//! assert_eq!(question.options[question.correct_index], question.correct_answer);
//!
//! let sessions = engine.sessions();
//! sessions.start_atom_session(&question.id);
//! sessions.record_atom_interaction(&question.id, true, 8.0, 0);
//! let record = sessions.end_atom_session(&question.id).unwrap();
//! assert_eq!(record.attempts, 1);
//! ```

pub mod adaptive;
pub mod config;
pub mod content;
pub mod engine;
pub mod logging;
pub mod workers;

pub use adaptive::{AdaptationDecision, AdaptiveDifficultyManager, AtomPerformanceRecord};
pub use config::{EngineConfig, SessionThresholds};
pub use content::{CompiledQuestion, QuestionCompiler, QuestionTemplate, SessionExposureTracker};
pub use engine::{AdaptiveEngine, EngineError};

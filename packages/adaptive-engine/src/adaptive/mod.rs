pub mod session;
pub mod suggest;
pub mod types;

pub use session::{generate_adaptive_variant_at, AdaptiveDifficultyManager};
pub use suggest::{
    get_realtime_adjustment, suggest, DifficultyAdjustment, EncouragementStrategy,
    HistoricalPerformanceMetrics, RealtimeAdjustment, SuggestionContext,
};
pub use types::{
    AdaptationDecision, AtomMetrics, AtomPerformanceRecord, ContentModifications, DifficultyLevel,
    Indicator, LearningAtom,
};

#![allow(dead_code)]

use std::sync::Once;

use adaptive_engine::config::EngineConfig;
use adaptive_engine::engine::AdaptiveEngine;

static INIT_LOGGING: Once = Once::new();

pub fn init_test_logging() {
    INIT_LOGGING.call_once(|| {
        let config = EngineConfig {
            log_level: "warn".to_string(),
            ..Default::default()
        };
        let _guard = adaptive_engine::logging::init_tracing(&config);
    });
}

pub fn create_test_engine(pool_per_template: u64) -> AdaptiveEngine {
    init_test_logging();
    let config = EngineConfig {
        pool_per_template,
        ..Default::default()
    };
    AdaptiveEngine::from_config(config).expect("builtin catalog compiles")
}

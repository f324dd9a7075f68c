use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Instant;

use super::catalog::TemplateCatalog;
use super::compiler::{CompiledQuestion, QuestionCompiler};
use super::error::CompileError;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct PoolKey {
    subject: String,
    skill_area: String,
    difficulty_level: u8,
}

/// In-memory pool of questions compiled once at startup, in catalog order
/// then seed order.
#[derive(Debug, Default)]
pub struct QuestionPool {
    buckets: HashMap<PoolKey, Vec<Arc<CompiledQuestion>>>,
    total: usize,
}

impl QuestionPool {
    pub fn precompile(
        catalog: &TemplateCatalog,
        compiler: &QuestionCompiler,
        per_template: u64,
    ) -> Result<Self, CompileError> {
        let start = Instant::now();
        let mut pool = Self::default();

        for template in catalog.templates() {
            let batch = compiler.compile_batch(template, per_template)?;
            let key = PoolKey {
                subject: template.subject.clone(),
                skill_area: template.skill_area.clone(),
                difficulty_level: template.difficulty_level,
            };
            pool.total += batch.len();
            pool.buckets
                .entry(key)
                .or_default()
                .extend(batch.into_iter().map(Arc::new));
        }

        tracing::info!(
            templates = catalog.len(),
            questions = pool.total,
            per_template,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "question pool precompiled"
        );
        Ok(pool)
    }

    pub fn candidates(
        &self,
        subject: &str,
        skill_area: &str,
        difficulty_level: u8,
    ) -> &[Arc<CompiledQuestion>] {
        let key = PoolKey {
            subject: subject.to_string(),
            skill_area: skill_area.to_string(),
            difficulty_level,
        };
        self.buckets.get(&key).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn difficulty_levels(&self, subject: &str, skill_area: &str) -> BTreeSet<u8> {
        self.buckets
            .keys()
            .filter(|k| k.subject == subject && k.skill_area == skill_area)
            .map(|k| k.difficulty_level)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.total
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }
}

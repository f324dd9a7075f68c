use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::error::CompileError;
use super::rng::SeededRng;
use super::template::{
    format_number, render_segments, round2, PreparedTemplate, QuestionKind, QuestionTemplate,
    SlotValue,
};

const DEFAULT_DISTRACTOR_COUNT: usize = 3;
const DEFAULT_MAX_BACKFILL_ATTEMPTS: usize = 24;
const OFFSET_MIN: i64 = 1;
const OFFSET_MAX: i64 = 10;
const SCALE_FACTORS: [f64; 4] = [0.5, 1.5, 2.0, 3.0];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompilerConfig {
    pub distractor_count: usize,
    pub max_backfill_attempts: usize,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            distractor_count: DEFAULT_DISTRACTOR_COUNT,
            max_backfill_attempts: DEFAULT_MAX_BACKFILL_ATTEMPTS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompiledQuestion {
    pub id: String,
    pub template_id: String,
    pub seed: u64,
    pub subject: String,
    pub skill_area: String,
    pub kind: QuestionKind,
    pub difficulty_level: u8,
    pub question_text: String,
    pub options: Vec<String>,
    pub correct_index: usize,
    pub correct_answer: String,
    pub explanation: String,
}

impl CompiledQuestion {
    pub fn is_correct(&self, option_index: usize) -> bool {
        option_index == self.correct_index
    }
}

pub fn compiled_question_id(template_id: &str, seed: u64) -> String {
    format!("{template_id}-{seed}")
}

#[derive(Debug, Clone, Default)]
pub struct QuestionCompiler {
    config: CompilerConfig,
}

impl QuestionCompiler {
    pub fn new(config: CompilerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    /// Same `(template, seed)` always yields the same question.
    pub fn compile(
        &self,
        template: &QuestionTemplate,
        seed: u64,
    ) -> Result<CompiledQuestion, CompileError> {
        let prepared = template
            .prepare()
            .map_err(|err| CompileError::template(&template.id, err))?;
        self.compile_prepared(template, &prepared, seed)
    }

    /// Compiles seeds `0..count`.
    pub fn compile_batch(
        &self,
        template: &QuestionTemplate,
        count: u64,
    ) -> Result<Vec<CompiledQuestion>, CompileError> {
        let prepared = template
            .prepare()
            .map_err(|err| CompileError::template(&template.id, err))?;
        (0..count)
            .map(|seed| self.compile_prepared(template, &prepared, seed))
            .collect()
    }

    fn compile_prepared(
        &self,
        template: &QuestionTemplate,
        prepared: &PreparedTemplate,
        seed: u64,
    ) -> Result<CompiledQuestion, CompileError> {
        let mut rng = SeededRng::new(seed);

        let mut values: BTreeMap<String, SlotValue> = BTreeMap::new();
        for (name, pool) in &template.slots {
            if let Some(value) = rng.pick(pool) {
                values.insert(name.clone(), value.clone());
            }
        }

        let answer = prepared
            .formula
            .evaluate(|name| values.get(name).and_then(SlotValue::as_number))
            .map_err(|err| CompileError::template(&template.id, err))?;
        let answer = round2(answer);
        let answer_text = format_number(answer);

        let needed = template
            .distractor_count
            .unwrap_or(self.config.distractor_count);
        let distractors = self.generate_distractors(&mut rng, answer, needed);
        if distractors.len() < needed {
            return Err(CompileError::DistractorExhaustion {
                template_id: template.id.clone(),
                seed,
                needed,
                produced: distractors.len(),
            });
        }

        let mut options = Vec::with_capacity(needed + 1);
        options.push(answer_text.clone());
        options.extend(distractors);
        rng.shuffle(&mut options);
        let correct_index = options
            .iter()
            .position(|option| *option == answer_text)
            .unwrap_or_default();

        Ok(CompiledQuestion {
            id: compiled_question_id(&template.id, seed),
            template_id: template.id.clone(),
            seed,
            subject: template.subject.clone(),
            skill_area: template.skill_area.clone(),
            kind: template.kind,
            difficulty_level: template.difficulty_level,
            question_text: render_segments(&prepared.question, &values, &answer_text),
            options,
            correct_index,
            correct_answer: answer_text.clone(),
            explanation: render_segments(&prepared.explanation, &values, &answer_text),
        })
    }

    /// Offsets above and below the answer plus a scaled variant, then
    /// alternating `+k`/`-k` back-fill. Uniqueness is judged on the rendered
    /// string, so two values that round to the same text count once.
    fn generate_distractors(&self, rng: &mut SeededRng, correct: f64, needed: usize) -> Vec<String> {
        let positive = correct > 0.0;
        let mut taken = vec![format_number(correct)];
        let mut out = Vec::with_capacity(needed);

        let up = correct + rng.range_inclusive(OFFSET_MIN, OFFSET_MAX) as f64;
        let delta = rng.range_inclusive(OFFSET_MIN, OFFSET_MAX) as f64;
        let down = if positive {
            (correct - delta).max(1.0)
        } else {
            correct - delta
        };
        let factor = rng.pick(&SCALE_FACTORS).copied().unwrap_or(2.0);
        let scaled = correct * factor;

        for candidate in [up, down, scaled] {
            if out.len() >= needed {
                break;
            }
            push_unique(&mut taken, &mut out, candidate);
        }

        let mut attempt = 0;
        while out.len() < needed && attempt < self.config.max_backfill_attempts {
            let offset = (attempt / 2 + 1) as f64;
            let candidate = if attempt % 2 == 0 {
                correct + offset
            } else {
                correct - offset
            };
            attempt += 1;
            if positive && candidate <= 0.0 {
                continue;
            }
            push_unique(&mut taken, &mut out, candidate);
        }

        out
    }
}

fn push_unique(taken: &mut Vec<String>, out: &mut Vec<String>, candidate: f64) {
    let text = format_number(candidate);
    if taken.contains(&text) {
        return;
    }
    taken.push(text.clone());
    out.push(text);
}

use thiserror::Error;

/// Content-authoring defects in a template. Always surfaced to the caller.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TemplateError {
    #[error("invalid formula `{formula}`: {message}")]
    InvalidFormula { formula: String, message: String },
    #[error("formula references unknown slot `{0}`")]
    UnknownSlot(String),
    #[error("formula references non-numeric slot `{0}`")]
    NonNumericSlot(String),
    #[error("placeholder `{{{0}}}` has no matching slot")]
    UnknownPlaceholder(String),
    #[error("unterminated placeholder in `{0}`")]
    UnterminatedPlaceholder(String),
    #[error("slot `{0}` has an empty value pool")]
    EmptySlotPool(String),
    #[error("formula evaluation failed: {0}")]
    Evaluation(String),
    #[error("invalid template: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompileError {
    #[error("template `{template_id}`: {source}")]
    Template {
        template_id: String,
        #[source]
        source: TemplateError,
    },
    #[error(
        "template `{template_id}` seed {seed}: needed {needed} distinct distractors, produced {produced}"
    )]
    DistractorExhaustion {
        template_id: String,
        seed: u64,
        needed: usize,
        produced: usize,
    },
}

impl CompileError {
    pub fn template(template_id: &str, source: TemplateError) -> Self {
        Self::Template {
            template_id: template_id.to_string(),
            source,
        }
    }
}

pub mod catalog;
pub mod compiler;
pub mod error;
pub mod exposure;
pub mod formula;
pub mod pool;
pub mod rng;
pub mod template;

pub use catalog::{CatalogError, TemplateCatalog};
pub use compiler::{CompiledQuestion, CompilerConfig, QuestionCompiler};
pub use error::{CompileError, TemplateError};
pub use exposure::{SessionExposureTracker, SessionKey};
pub use pool::QuestionPool;
pub use template::{QuestionKind, QuestionTemplate, SlotValue};

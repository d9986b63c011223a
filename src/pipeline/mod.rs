//! Natural-language request handling: normalisation, intent, trace and orchestration

pub mod preprocess;
pub mod intent;
pub mod trace;
pub mod orchestrator;

pub use intent::{classify_intent, Intent};
pub use orchestrator::{ProviderHealth, QueryBundle, QueryPipeline, QueryResponse};
pub use preprocess::preprocess;
pub use trace::PipelineTrace;

pub mod ai;
pub mod assembler;
pub mod config;
pub mod error;
pub mod explain;
pub mod export;
pub mod fragment;
pub mod prompt;
pub mod request;
pub mod session;

// Re-export main types for convenience
pub use ai::GeminiClient;
pub use assembler::{assemble, assemble_all, SlideAssembler};
pub use config::Config;
pub use error::{extract_error_message, ConfigError, TransitionError};
pub use explain::{explain, spawn_explain, FragmentSource, FragmentStream, NoopSink, SlideSink};
pub use export::SlideExporter;
pub use fragment::{Fragment, ImageData, Slide};
pub use request::{Phase, RequestState};
pub use session::{ExplainEvent, ExplainRequest, ExplainSession};

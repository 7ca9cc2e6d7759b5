// Public modules
pub mod command;
pub mod context;
pub mod context_file;
pub mod error;
pub mod info;
pub mod logger;
pub mod pipeline;
pub mod retry;

// Re-export common types for convenience
pub use command::{CommandExtension, CommandRunner, ExecutionCommand, Outcome};
pub use context::ExecutionContext;
pub use context_file::ContextFile;
pub use error::{Error, ErrorCode, Result};
pub use info::{ExecutionInfo, ExecutionStatus};
pub use logger::ExecutionLogger;
pub use pipeline::{
    ConnectAttempt, ExistingPipeline, PipelineBackend, PipelineConnector, PipelineDataImporter,
    PipelineTarget, RunPipelineCommand, RunPipelineParams, TriggerKind,
};
pub use retry::RetryPolicy;

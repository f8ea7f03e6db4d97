//! Reply pipeline.
//!
//! `EmailPipeline::process_email` drives one email through the role agents:
//! 1. Analyzer on the raw email
//! 2. Sentiment on the raw email (optional)
//! 3. Drafter or casual drafter on the analysis
//! 4. Policy and example justifiers on the raw email (optional)
//! 5. Reviewer on the draft, whose verdict ends the run or starts another attempt

pub mod orchestrator;
pub mod types;

pub use orchestrator::{EmailPipeline, EmailPipelineBuilder};
pub use types::{
    APPROVAL_MARKER, MAX_ATTEMPTS_MESSAGE, PipelineOutcome, PipelineRun, ResponseBundle,
    ReviewVerdict, Stage, Tone,
};

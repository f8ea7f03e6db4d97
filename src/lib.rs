//! Reply Assist: retrieval-grounded email replies through a reviewed
//! multi-agent pipeline.

pub mod agent;
pub mod config;
pub mod email;
pub mod embeddings;
pub mod error;
pub mod llm;
pub mod pipeline;
pub mod retrieval;

//! Lektor - Lecture Video RAG
//!
//! A Retrieval-Augmented Generation pipeline for question answering and
//! summarization over lecture videos.
//!
//! The name "Lektor" comes from the Norwegian word for "lecturer."
//!
//! # Overview
//!
//! Lektor allows you to:
//! - Acquire transcripts for YouTube videos with multi-tier fallback
//!   (captions first, speech recognition as a last resort)
//! - Chunk transcripts into overlapping token windows and index them
//!   in a persistent vector store
//! - Ask questions about a video and get grounded answers with sources
//! - Generate brief, bullet-point, or detailed summaries backed by
//!   retrieved context
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - `config` - Configuration management
//! - `chunking` - Token-windowed transcript chunking
//! - `embedding` - Embedding generation (remote and local backends)
//! - `vector_store` - Vector database abstraction
//! - `transcript` - Transcript acquisition fallback chain
//! - `llm` - Chat-completion client
//! - `rag` - Ingest, question answering, and contextual summarization
//! - `orchestrator` - Pipeline coordination
//!
//! # Example
//!
//! ```rust,no_run
//! use lektor::config::Settings;
//! use lektor::orchestrator::Orchestrator;
//! use lektor::rag::SummaryType;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let orchestrator = Orchestrator::new(settings)?;
//!
//!     let summary = orchestrator
//!         .summarize_video("https://youtu.be/dQw4w9WgXcQ", SummaryType::Detailed)
//!         .await?;
//!     println!("{}", summary.text);
//!
//!     Ok(())
//! }
//! ```

pub mod chunking;
pub mod config;
pub mod embedding;
pub mod error;
pub mod llm;
pub mod orchestrator;
pub mod rag;
pub mod transcript;
pub mod vector_store;

pub use error::{LektorError, Result};

//! # Brain Service Core
//!
//! Coordination layer for a semantic knowledge store serving a staged
//! content pipeline. Content items ("gather items") are produced by
//! ordered departments; this crate ingests them with vector embeddings,
//! detects near-duplicates, aggregates context from earlier departments,
//! and analyzes content coverage against a department's scope.
//!
//! The heavy lifting lives with three external collaborators, each behind
//! an async trait so it can be substituted in tests:
//!
//! - [`services::embedding::EmbeddingProvider`] — turns text into vectors
//! - [`services::graph::GraphStore`] — persists nodes and answers
//!   parameterized similarity queries
//! - [`services::llm::LlmProvider`] — free-text completions for themes,
//!   summaries, and coverage analysis
//!
//! Components are constructed once at process start and passed in as
//! `Arc` references; there is no global state.

pub mod models;
pub mod services;
pub mod utils;

pub use services::gather::BrainService;
pub use utils::error::{AppError, AppResult};

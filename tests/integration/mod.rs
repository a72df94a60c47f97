//! Integration tests
//!
//! End-to-end flows over substitutable collaborators: a deterministic
//! embedding provider, an in-memory graph store that evaluates the
//! similarity/recency queries from their parameters, and a scripted LLM.

mod support;

mod context_test;
mod coverage_test;

#![doc = "showroom-core: core logic library for showroom-tool."]

//! This crate turns Showroom lab repositories into a typed document and
//! generates structured artifacts (summary, review, catalog description) from
//! it with schema-constrained LLM calls.
//!
//! # Usage
//! Call [`pipeline::fetch_showroom`] with a [`git::GitCli`] to obtain a
//! [`model::Showroom`], then [`pipeline::analyze`] with any
//! [`contract::LlmProvider`] to attach an artifact to it.

pub mod artifacts;
pub mod cache;
pub mod config;
pub mod contract;
pub mod download;
pub mod error;
pub mod extract;
pub mod git;
pub mod invoke;
pub mod model;
pub mod output;
pub mod pipeline;
pub mod prompt;
pub mod provider;
pub mod schema;
pub mod title;

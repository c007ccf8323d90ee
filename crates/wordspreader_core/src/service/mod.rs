//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into the word store API.
//! - Keep presentation layers decoupled from storage details.

pub mod word_service;

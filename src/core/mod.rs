//! Core business logic module

pub mod credentials;
pub mod error;
pub mod service;
pub mod types;
pub mod workflow;

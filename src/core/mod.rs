// src/core/mod.rs
pub mod avatar;
pub mod engine;
pub mod journey;
pub mod learner;
pub mod types;
pub mod unlock;
pub mod user;
pub mod workflow;

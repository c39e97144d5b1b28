//! Shared building blocks for jira-slack-nudge: domain types, the error
//! taxonomy, environment configuration and rule-set loading.

pub mod config;
pub mod error;
pub mod rules;
pub mod types;

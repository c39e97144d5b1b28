//! Notification engine: turns rules into delivered digests.
//!
//! For each rule the engine searches the tracker, groups the matches by
//! assignee, renders a block message and hands it to the chat notifier.
//! Rules are evaluated concurrently and independently; the outcome of every
//! rule is collected into a [`RunReport`].

pub mod grouping;
pub mod processor;
pub mod render;
pub mod report;
pub mod runner;

pub use grouping::{AssigneeGroup, group_by_assignee};
pub use processor::RuleProcessor;
pub use render::MessageRenderer;
pub use report::{RuleOutcome, RuleReport, RunReport, Stage};
pub use runner::NotificationRunner;

//! Matching and load-balancing engine behind the care navigation workflows.
//!
//! The orchestration layer hands over strongly typed beneficiary profiles; this crate scores
//! risk, assigns care navigators, ranks preferred-network providers, and keeps navigator
//! caseloads balanced. Persistence stays behind the repository traits in
//! [`matching::repository`].

pub mod beneficiary;
pub mod config;
pub mod error;
pub mod matching;
pub mod risk;
pub mod telemetry;

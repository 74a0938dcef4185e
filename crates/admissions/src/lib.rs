//! Admission lifecycle engine for school admissions intake and approval.
//!
//! The crate is organized around the `workflows::admission` module: a single
//! authoritative state machine over admission applications, the fee-snapshot
//! billing engine, the append-only audit trail, the SLA aging classifier, the
//! batch transition processor, and the funnel aggregator. Storage and every
//! outward-facing concern (permissions, proof storage, notifications, student
//! record provisioning) sit behind traits so deployments and tests can swap
//! implementations freely.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;

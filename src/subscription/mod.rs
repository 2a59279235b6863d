//! Provides structures and traits related to subscription management.
//!
//! This module includes the `Link` trait through which consumers request the value
//! or cancel, the closure-backed `Subscriber`, and the lock-free building blocks used
//! to hand demand over to an upstream link that may not exist yet.
pub mod demand;
pub mod link_cell;
pub mod subscribe;

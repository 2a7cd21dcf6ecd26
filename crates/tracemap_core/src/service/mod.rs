//! Core use-case services.
//!
//! # Responsibility
//! - House the sample write path, the only supported mutation surface for
//!   sample rows and derived trajectories.
//!
//! # Invariants
//! - Services never bypass repository persistence contracts.

pub mod sample_service;

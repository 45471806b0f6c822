//! Domain layer: entities, repository contracts and redirect accounting.
//!
//! # Architecture
//!
//! - [`entities`] - Core business data structures
//! - [`repositories`] - Data access trait definitions
//! - [`redirect_error`] - Failure taxonomy of the redirect path
//! - [`hit_event`] - Hit accounting event model
//! - [`hit_worker`] - Asynchronous hit counter worker
//!
//! # Hit Accounting Flow
//!
//! 1. The redirect handler resolves a segment to a record
//! 2. A [`hit_event::HitEvent`] is sent to a bounded channel (non-blocking)
//! 3. [`hit_worker::run_hit_worker`] applies the atomic increment with retry
//!
//! With strict accounting the handler performs the increment itself and
//! fails the request if it does not succeed.

pub mod entities;
pub mod hit_event;
pub mod hit_worker;
pub mod redirect_error;
pub mod repositories;

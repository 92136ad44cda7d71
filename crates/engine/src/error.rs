//! The module contains the errors the engine can throw.
//!
//! The errors are:
//!
//! - [`KeyNotFound`] thrown when a truck, load, fuel purchase or breakdown is
//!   not present.
//! - [`InvalidTransition`] thrown when a load status change is not allowed.
//! - [`InvariantViolation`] thrown when a recomputation would persist corrupt
//!   derived state. The whole write is rolled back.
//! - [`ExternalLookup`] raised by the distance lookup. The deadhead step
//!   recovers from it, callers never see it from a mutation.
//! - [`ConcurrentRecomputation`] thrown when a truck stays locked by another
//!   pipeline for longer than the configured wait.
//!
//!  [`KeyNotFound`]: EngineError::KeyNotFound
//!  [`InvalidTransition`]: EngineError::InvalidTransition
//!  [`InvariantViolation`]: EngineError::InvariantViolation
//!  [`ExternalLookup`]: EngineError::ExternalLookup
//!  [`ConcurrentRecomputation`]: EngineError::ConcurrentRecomputation
use sea_orm::DbErr;
use thiserror::Error;

use crate::distance::DistanceError;

/// Engine custom errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("\"{0}\" key not found!")]
    KeyNotFound(String),
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error("Invalid id: {0}")]
    InvalidId(String),
    #[error("Invalid status transition: {0}")]
    InvalidTransition(String),
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),
    #[error("Distance lookup failed: {0}")]
    ExternalLookup(#[from] DistanceError),
    #[error("Recomputation already in progress: {0}")]
    ConcurrentRecomputation(String),
    #[error(transparent)]
    Database(#[from] DbErr),
}

impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::KeyNotFound(a), Self::KeyNotFound(b)) => a == b,
            (Self::InvalidAmount(a), Self::InvalidAmount(b)) => a == b,
            (Self::InvalidId(a), Self::InvalidId(b)) => a == b,
            (Self::InvalidTransition(a), Self::InvalidTransition(b)) => a == b,
            (Self::InvariantViolation(a), Self::InvariantViolation(b)) => a == b,
            (Self::ExternalLookup(a), Self::ExternalLookup(b)) => a == b,
            (Self::ConcurrentRecomputation(a), Self::ConcurrentRecomputation(b)) => a == b,
            (Self::Database(a), Self::Database(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}

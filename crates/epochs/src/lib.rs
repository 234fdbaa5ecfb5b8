//! Arithmetic for fixed-width attestation epochs.
//!
//! An epoch with index `k` covers the half-open window
//! `[start + k * period, start + (k + 1) * period)`. Indices are signed so
//! that instants before `start` still map to an epoch.

use {
  chrono::{DateTime, TimeDelta, Utc},
  serde::{Deserialize, Serialize},
  std::fmt::{self, Display, Formatter},
  thiserror::Error,
};

pub use {clock::Clock, config::EpochConfig, range::EpochRange};

#[derive(Debug, Error, PartialEq)]
pub enum Error {
  #[error("epoch period must be positive, got {0}s")]
  NonPositivePeriod(i64),
}

mod clock;
mod config;
mod range;

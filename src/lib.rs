//! # philtrack: kinematic reduction for particle-tracking experiments
//!
//! philtrack turns linked observation tables (one row per particle per frame,
//! as produced by an external detect-and-link tracker) into per-particle
//! kinematic records and per-condition summaries, written as CSV.
//!
//! ```text
//! Condition ──< file ── Linker ──> ObservationTable
//!                                      │
//!                                      ▼
//!                               kinematics::reduce
//!                                      │
//!                  ParticleRow (ParticleRecord ⋈ SizeRecord)
//!                                      │
//!                 ConditionAccumulator ──> ConditionSummary
//! ```
//!
//! The crate also ships the small address-book tool that lived alongside the
//! tracking script, in [`contacts`].
//!
//! ## Example Usage
//!
//! ```rust
//! use philtrack::kinematics::reduce;
//! use philtrack::observation::Observation;
//!
//! let observations = vec![
//!     Observation::new(0, 0, 0.0, 0.0, 255.0),
//!     Observation::new(0, 1, 3.0, 4.0, 510.0),
//! ];
//! let reduction = reduce(&observations, 1.0, 1.0, 255.0)?;
//! assert_eq!(reduction.rows().len(), 1);
//! assert!((reduction.rows()[0].particle.total_displacement - 5.0).abs() < 1e-12);
//! # Ok::<(), philtrack::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod contacts;
pub mod error;
pub mod export;
pub mod kinematics;
pub mod linking;
pub mod observation;
pub mod pipeline;
pub mod settings;
pub mod summary;

pub use error::{Error, Result};

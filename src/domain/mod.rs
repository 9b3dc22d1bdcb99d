//! Domain layer: entities and forestry computations
//!
//! This layer is independent of external concerns (no I/O, no CLI, no config loading).

pub mod aggregate;
pub mod classes;
pub mod entities;
pub mod error;
pub mod indicators;
pub mod metrics;
pub mod stats;
pub mod volume;

pub use aggregate::{Aggregate, LevelAggregate, PlotAggregate};
pub use classes::{ClassFrequency, ClassIntervals};
pub use entities::*;
pub use error::{DomainError, DomainResult};
pub use indicators::{level_expansion_factor, LevelIndicators};
pub use metrics::{
    compute_basal_area, compute_dap, compute_expansion_factor, compute_sampling_error,
    compute_volume, compute_z_score, VolumeEstimate, HECTARE_M2,
};
pub use stats::{student_t, SamplingDesign, SamplingStatistics};
pub use volume::VolumeEquation;

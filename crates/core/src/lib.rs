//! # RiverShift Core
//!
//! Core types, traits and I/O for the RiverShift river change library.
//!
//! This crate provides:
//! - `Feature` / `FeatureCollection`: polygon layers with ordered attributes
//! - `CRS`: Coordinate Reference System handling, WGS84 ⇄ UTM transforms
//! - Algorithm trait for consistent API
//! - Shapefile I/O with `.prj` sidecars

pub mod crs;
pub mod error;
pub mod io;
pub mod vector;

pub use crs::CRS;
pub use error::{Error, Result};
pub use vector::{AttributeValue, Feature, FeatureCollection};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::crs::{UtmZone, CRS};
    pub use crate::error::{Error, Result};
    pub use crate::vector::{AttributeValue, Feature, FeatureCollection};
    pub use crate::Algorithm;
}

/// Core trait for all algorithms in RiverShift.
///
/// Algorithms are pure functions that transform input data according to parameters.
pub trait Algorithm {
    /// Input type for the algorithm
    type Input;
    /// Output type for the algorithm
    type Output;
    /// Parameters controlling algorithm behavior
    type Params: Default;
    /// Error type for algorithm execution
    type Error: std::error::Error;

    /// Returns the algorithm name
    fn name(&self) -> &'static str;

    /// Returns a description of what the algorithm does
    fn description(&self) -> &'static str;

    /// Execute the algorithm
    fn execute(&self, input: Self::Input, params: Self::Params) -> std::result::Result<Self::Output, Self::Error>;

    /// Execute with default parameters
    fn execute_default(&self, input: Self::Input) -> std::result::Result<Self::Output, Self::Error> {
        self.execute(input, Self::Params::default())
    }
}

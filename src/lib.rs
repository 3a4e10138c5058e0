//! Core library of the DEM uncertainty modelling tool.
//!
//! Spatial uncertainty of a gridded elevation dataset is estimated with a
//! Monte-Carlo approach: the input grid is perturbed with simulated Gaussian
//! random fields, each field is smoothed with a moving-window statistical
//! filter and the smoothed field is added back to the original grid to form
//! one plausible "scenario" of the dataset.
//!
//! The main components are:
//! - `field::RandomFieldGenerator`: draws (optionally truncated) Gaussian
//!   random fields of a fixed shape.
//! - `kernel::StatisticalKernel`: reduces one kernel window to a scalar
//!   using a selected statistical operator, with nodata masking.
//! - `convolution::WindowConvolver`: slides a kernel over a grid and
//!   collects the reduced values into a smaller output grid.
//! - `raster::Grid`: gridded data read from / written to GDAL datasets.

pub mod convolution;
pub mod data;
pub mod error;
pub mod field;
pub mod kernel;
pub mod raster;
pub mod text;

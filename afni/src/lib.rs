//! Typed access to the AFNI command-line programs.
//!
//! Nothing here reads or writes voxel data. Datasets are handled by name,
//! programs are invoked through a [`Runner`], and only headers are opened to
//! learn a dataset's [`Grid`].

mod dataset;
mod error;
mod grid;
mod invocation;
mod runner;

pub use dataset::{Dataset, Format, View};
pub use error::{DatasetError, GridError, ToolError};
pub use grid::{probe_grid, Grid};
pub use invocation::{Calc, Datum, Invocation, Program};
pub use runner::{version, Runner, SystemRunner, ToolOutput};

//! Handles to the intermediate volumes of a run.
//!
//! Each step takes the handle produced by the one before it, so the order
//! threshold, mask, smooth, combine is enforced by the types.

use afni::Dataset;
use std::{fmt, path::PathBuf};

/// Clip level separating background noise from tissue in the INV2 image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Threshold(pub(crate) f64);

impl Threshold {
    pub(crate) fn value(&self) -> f64 {
        self.0
    }
}

impl fmt::Display for Threshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Binary mask of voxels above the threshold.
#[derive(Debug)]
pub(crate) struct CoarseMask(pub(crate) Dataset);

/// The coarse mask after smoothing, or the coarse mask itself when
/// smoothing is disabled.
#[derive(Debug)]
pub(crate) struct SmoothedMask(pub(crate) Dataset);

/// INV2 with its bias field removed by `3dUnifize`.
#[derive(Debug)]
pub(crate) struct Unifized(pub(crate) Dataset);

/// The volume the UNI image gets multiplied by.
#[derive(Debug)]
pub(crate) struct WeightMap(pub(crate) Dataset);

/// Multiplicative gain the bias correction applied; dividing by it restores
/// bias-weighted intensities.
#[derive(Debug)]
pub(crate) struct BiasField(pub(crate) Dataset);

/// The files AFNI actually wrote for the finished volume, still inside the
/// scratch directory.
#[derive(Debug)]
pub(crate) struct Combined {
    pub(crate) files: Vec<PathBuf>,
}

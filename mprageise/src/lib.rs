//! Background denoising of MP2RAGE UNI images ("MPRAGEising") on top of AFNI.
//!
//! A run estimates a clip level from the INV2 image, turns it into a soft head
//! mask and multiplies the UNI image by it. In [`Mode::Reintroduce`] the
//! result is also divided by a bias field map so the bias-weighted
//! intensities come back.

mod artifacts;
mod cancel;
mod config;
mod error;
mod naming;
mod pipeline;
mod scratch;
mod step;

pub use cancel::Cancel;
pub use config::{Mode, Params, Request, Weighting, DEFAULT_BLUR_FWHM, DEFAULT_CLIP_FRACTION};
pub use error::{
    Error, EXIT_GRID_MISMATCH, EXIT_INPUT_NOT_FOUND, EXIT_INTERRUPTED, EXIT_IO_FAILURE,
    EXIT_TOOL_FAILURE, EXIT_USAGE,
};
pub use naming::default_output;
pub use pipeline::{check, clean, Outcome};
pub use scratch::Scratch;
pub use step::Step;

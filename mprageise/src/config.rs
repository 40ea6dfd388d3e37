use crate::error::Error;
use std::path::PathBuf;
use strum::{Display, EnumString};

/// `3dClipLevel -mfrac`: fraction of the median used as the clip level.
pub const DEFAULT_CLIP_FRACTION: f64 = 0.5;
/// Full width at half maximum (mm) of the gaussian that softens the mask edge.
pub const DEFAULT_BLUR_FWHM: f64 = 4.0;

/// What happens to the bias field of the UNI image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString)]
pub enum Mode {
    /// Multiply the weighting into the UNI image, the bias stays removed.
    #[default]
    #[strum(to_string = "remove", serialize = "remove-bias", serialize = "0")]
    Remove,
    /// Additionally divide by the bias field map to restore the
    /// bias-weighted intensities inside the head.
    #[strum(
        to_string = "reintroduce",
        serialize = "reintroduce-bias",
        serialize = "1"
    )]
    Reintroduce,
}

/// What the UNI image is multiplied by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum Weighting {
    /// The smoothed binary head mask.
    #[default]
    Mask,
    /// The smoothed mask times the min/max normalised, unifized INV2 image.
    Intensity,
}

/// Tunables of the run. The defaults match AFNI's own defaults where one
/// exists.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Params {
    pub clip_fraction: f64,
    /// `0` disables smoothing.
    pub blur_fwhm: f64,
    pub weighting: Weighting,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            clip_fraction: DEFAULT_CLIP_FRACTION,
            blur_fwhm: DEFAULT_BLUR_FWHM,
            weighting: Weighting::default(),
        }
    }
}

impl Params {
    pub fn validate(&self) -> Result<(), Error> {
        if !(self.clip_fraction > 0.0 && self.clip_fraction < 1.0) {
            return Err(Error::Usage(format!(
                "clip fraction must be between 0 and 1, got {}",
                self.clip_fraction
            )));
        }
        if !(self.blur_fwhm.is_finite() && self.blur_fwhm >= 0.0) {
            return Err(Error::Usage(format!(
                "blur FWHM must be zero or a positive number of mm, got {}",
                self.blur_fwhm
            )));
        }
        Ok(())
    }

    pub(crate) fn smoothing(&self) -> bool {
        self.blur_fwhm > 0.0
    }
}

/// One INV2/UNI pair to clean.
#[derive(Debug, Clone)]
pub struct Request {
    pub inv2: PathBuf,
    pub uni: PathBuf,
    pub mode: Mode,
    /// A dataset path, or a directory that receives the default name.
    pub output: Option<PathBuf>,
    /// A saved bias field map, reintroduce mode only.
    pub bias_field: Option<PathBuf>,
    pub params: Params,
    /// Leave the scratch directory behind for inspection.
    pub keep_temp: bool,
}

impl Request {
    pub fn new<P: Into<PathBuf>, Q: Into<PathBuf>>(inv2: P, uni: Q) -> Request {
        Request {
            inv2: inv2.into(),
            uni: uni.into(),
            mode: Mode::default(),
            output: None,
            bias_field: None,
            params: Params::default(),
            keep_temp: false,
        }
    }

    pub(crate) fn validate(&self) -> Result<(), Error> {
        self.params.validate()?;
        if self.bias_field.is_some() && self.mode == Mode::Remove {
            return Err(Error::Usage(
                "a bias field map can only be used when reintroducing the bias field".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn mode_spellings() {
        for s in ["remove", "remove-bias", "0"] {
            assert_eq!(Mode::from_str(s).unwrap(), Mode::Remove, "{}", s);
        }
        for s in ["reintroduce", "reintroduce-bias", "1"] {
            assert_eq!(Mode::from_str(s).unwrap(), Mode::Reintroduce, "{}", s);
        }
        assert!(Mode::from_str("2").is_err());
        assert_eq!(Mode::Reintroduce.to_string(), "reintroduce");
        assert_eq!(Mode::default(), Mode::Remove);
    }

    #[test]
    fn weighting_spellings() {
        assert_eq!(Weighting::from_str("mask").unwrap(), Weighting::Mask);
        assert_eq!(Weighting::from_str("intensity").unwrap(), Weighting::Intensity);
        assert_eq!(Weighting::Intensity.to_string(), "intensity");
    }

    #[test]
    fn default_with_override() {
        let p = Params {
            blur_fwhm: 0.0,
            ..Default::default()
        };
        assert_eq!(p.clip_fraction, DEFAULT_CLIP_FRACTION);
        assert!(!p.smoothing());
        assert!(p.validate().is_ok());
        assert!(Params::default().smoothing());
    }

    #[test]
    fn out_of_range_params() {
        for clip_fraction in [0.0, 1.0, -0.2, f64::NAN] {
            let p = Params {
                clip_fraction,
                ..Default::default()
            };
            assert!(matches!(p.validate(), Err(Error::Usage(_))), "{}", clip_fraction);
        }
        for blur_fwhm in [-1.0, f64::INFINITY, f64::NAN] {
            let p = Params {
                blur_fwhm,
                ..Default::default()
            };
            assert!(matches!(p.validate(), Err(Error::Usage(_))), "{}", blur_fwhm);
        }
    }

    #[test]
    fn bias_map_needs_reintroduce() {
        let mut r = Request::new("INV2.nii.gz", "UNI.nii.gz");
        r.bias_field = Some(PathBuf::from("bias.nii.gz"));
        assert!(matches!(r.validate(), Err(Error::Usage(_))));
        r.mode = Mode::Reintroduce;
        assert!(r.validate().is_ok());
    }
}

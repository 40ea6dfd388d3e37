use clap::Parser;
use mprageise::{Mode, Params, Request, Weighting};
use std::{ffi::OsString, path::PathBuf};

const AFTER_HELP: &str = "\
Nota bene:
   1. The default output goes next to the UNI image.
   2. If you're unsure why one would need to reintroduce the bias field, you probably don't.
   3. Do not use this for the MP2RAGE T1 map.";

pub fn get_args() -> CliOpts {
    CliOpts::parse_from(single_dash_long_flags(std::env::args_os()))
}

/// `-mode` is accepted as a spelling of `--mode`: clap would otherwise read
/// it as a cluster of short flags.
fn single_dash_long_flags<I: IntoIterator<Item = OsString>>(args: I) -> Vec<OsString> {
    args.into_iter()
        .map(|a| {
            if a == "-mode" {
                OsString::from("--mode")
            } else {
                a
            }
        })
        .collect()
}

/// Background denoise MP2RAGE UNI images (MPRAGEising) whilst either
/// removing or reintroducing the bias field.
#[derive(Parser, Debug)]
#[clap(version = clap::crate_version!(), after_help = AFTER_HELP)]
pub struct CliOpts {
    #[clap(short, long, parse(from_occurrences))]
    pub verbose: u8,

    /// MP2RAGE INV2 image (e.g. /path/to/inv2.nii.gz or inv2+orig)
    #[clap(short, long, parse(from_os_str))]
    pub inv2: PathBuf,

    /// MP2RAGE UNI image (e.g. /path/to/uni.nii.gz or uni+orig)
    #[clap(short, long, parse(from_os_str))]
    pub uni: PathBuf,

    /// Bias field handling: remove (default) or reintroduce
    #[clap(long)]
    pub mode: Option<Mode>,

    /// Reintroduce the bias field (1) or not (0), same as --mode
    #[clap(short = 'r', long = "re-bias", conflicts_with = "mode")]
    pub re_bias: Option<Mode>,

    /// Output dataset, or a folder that receives the default name
    #[clap(short, long, parse(from_os_str))]
    pub output: Option<PathBuf>,

    /// Saved bias field map to divide back in (reintroduce mode)
    #[clap(short = 'b', long, parse(from_os_str))]
    pub bias_field: Option<PathBuf>,

    /// Fraction passed to 3dClipLevel -mfrac
    #[clap(long, default_value_t = mprageise::DEFAULT_CLIP_FRACTION)]
    pub clip_fraction: f64,

    /// FWHM (mm) of the mask smoothing, 0 disables it
    #[clap(long, default_value_t = mprageise::DEFAULT_BLUR_FWHM)]
    pub blur_fwhm: f64,

    /// Multiply UNI by the smoothed mask, or by the mask times the normalised INV2
    #[clap(long, default_value_t = Weighting::default())]
    pub weighting: Weighting,

    /// Keep intermediate datasets for inspection
    #[clap(long)]
    pub keep_temp: bool,

    /// Directory holding the AFNI binaries, instead of searching PATH
    #[clap(long, parse(from_os_str))]
    pub afni_dir: Option<PathBuf>,
}

impl CliOpts {
    pub fn request(&self) -> Request {
        Request {
            inv2: self.inv2.clone(),
            uni: self.uni.clone(),
            mode: self.mode.or(self.re_bias).unwrap_or_default(),
            output: self.output.clone(),
            bias_field: self.bias_field.clone(),
            params: Params {
                clip_fraction: self.clip_fraction,
                blur_fwhm: self.blur_fwhm,
                weighting: self.weighting,
            },
            keep_temp: self.keep_temp,
        }
    }
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<CliOpts, clap::Error> {
        let argv = std::iter::once("mprageise")
            .chain(args.iter().copied())
            .map(OsString::from);
        CliOpts::try_parse_from(single_dash_long_flags(argv))
    }

    #[test]
    fn defaults() {
        let opts = parse(&["-i", "INV2.nii.gz", "-u", "UNI.nii.gz"]).unwrap();
        let r = opts.request();
        assert_eq!(r.inv2, PathBuf::from("INV2.nii.gz"));
        assert_eq!(r.uni, PathBuf::from("UNI.nii.gz"));
        assert_eq!(r.mode, Mode::Remove);
        assert_eq!(r.output, None);
        assert_eq!(r.params, Params::default());
        assert!(!r.keep_temp);
        assert_eq!(opts.verbose, 0);
        assert_eq!(opts.afni_dir, None);
    }

    #[test]
    fn mode_spellings() {
        for args in [
            vec!["--mode", "reintroduce"],
            vec!["-mode", "reintroduce"],
            vec!["-r", "1"],
            vec!["--re-bias", "reintroduce-bias"],
        ] {
            let mut full = vec!["-i", "a.nii", "-u", "b.nii"];
            full.extend(args.iter());
            let r = parse(&full).unwrap().request();
            assert_eq!(r.mode, Mode::Reintroduce, "{:?}", args);
        }
        let r = parse(&["-i", "a.nii", "-u", "b.nii", "-r", "0"]).unwrap().request();
        assert_eq!(r.mode, Mode::Remove);
    }

    #[test]
    fn mode_and_re_bias_conflict() {
        assert!(parse(&["-i", "a.nii", "-u", "b.nii", "--mode", "remove", "-r", "1"]).is_err());
    }

    #[test]
    fn inputs_are_required() {
        assert!(parse(&["-i", "a.nii"]).is_err());
        assert!(parse(&["-u", "b.nii"]).is_err());
    }

    #[test]
    fn bad_mode_rejected() {
        assert!(parse(&["-i", "a.nii", "-u", "b.nii", "--mode", "sideways"]).is_err());
    }

    #[test]
    fn tunables() {
        let opts = parse(&[
            "-i",
            "a.nii",
            "-u",
            "b.nii",
            "-o",
            "out/",
            "-b",
            "bias.nii",
            "--clip-fraction",
            "0.4",
            "--blur-fwhm",
            "0",
            "--weighting",
            "intensity",
            "--keep-temp",
            "--afni-dir",
            "/opt/afni",
            "-vv",
        ])
        .unwrap();
        let r = opts.request();
        assert_eq!(r.output, Some(PathBuf::from("out/")));
        assert_eq!(r.bias_field, Some(PathBuf::from("bias.nii")));
        assert_eq!(r.params.clip_fraction, 0.4);
        assert_eq!(r.params.blur_fwhm, 0.0);
        assert_eq!(r.params.weighting, Weighting::Intensity);
        assert!(r.keep_temp);
        assert_eq!(opts.verbose, 2);
        assert_eq!(opts.afni_dir, Some(PathBuf::from("/opt/afni")));
    }
}

use crate::dataset::Dataset;
use std::fmt;
use strum::{AsRefStr, Display, EnumIter, EnumString};

/// The AFNI programs this crate knows how to drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, AsRefStr, Display, EnumIter, EnumString)]
pub enum Program {
    #[strum(serialize = "3dClipLevel")]
    ClipLevel,
    #[strum(serialize = "3dcalc")]
    Calc,
    #[strum(serialize = "3dmerge")]
    Merge,
    #[strum(serialize = "3dUnifize")]
    Unifize,
    #[strum(serialize = "3dinfo")]
    Info,
    #[strum(serialize = "afni")]
    Afni,
}

/// Voxel storage type of a dataset written by AFNI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum Datum {
    Float,
}

const PREFIX_FLAG: &str = "-prefix";

/// One call of an AFNI program, fully argued.
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    program: Program,
    args: Vec<String>,
}

impl Invocation {
    pub fn new(program: Program) -> Invocation {
        Invocation {
            program,
            args: Vec::new(),
        }
    }

    pub fn arg<S: Into<String>>(mut self, arg: S) -> Invocation {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Invocation
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn program(&self) -> Program {
        self.program
    }

    pub fn arguments(&self) -> &[String] {
        &self.args
    }

    /// The value passed to `-prefix`, if the program writes a dataset.
    pub fn prefix(&self) -> Option<&str> {
        self.args
            .iter()
            .position(|a| a == PREFIX_FLAG)
            .and_then(|i| self.args.get(i + 1))
            .map(String::as_str)
    }

    /// `3dClipLevel -mfrac <fraction> <input>`: the automatic clip level.
    pub fn clip_level<S: Into<String>>(input: S, mfrac: f64) -> Invocation {
        Invocation::new(Program::ClipLevel)
            .arg("-mfrac")
            .arg(mfrac.to_string())
            .arg(input)
    }

    /// `3dmerge -1blur_fwhm <fwhm> -doall`: gaussian smoothing of every sub-brick.
    pub fn blur(input: &Dataset, fwhm_mm: f64, datum: Datum, prefix: &Dataset) -> Invocation {
        Invocation::new(Program::Merge)
            .arg("-1blur_fwhm")
            .arg(fwhm_mm.to_string())
            .arg("-doall")
            .arg("-datum")
            .arg(datum.to_string())
            .arg(PREFIX_FLAG)
            .arg(prefix.path().display().to_string())
            .arg(input.path().display().to_string())
    }

    /// `3dUnifize -quiet`: bias-field removing intensity normalisation.
    pub fn unifize<S: Into<String>>(input: S, prefix: &Dataset) -> Invocation {
        Invocation::new(Program::Unifize)
            .arg("-quiet")
            .arg(PREFIX_FLAG)
            .arg(prefix.path().display().to_string())
            .arg(input)
    }

    /// `3dinfo -dminus`: minimum value of the first sub-brick.
    pub fn info_min<S: Into<String>>(input: S) -> Invocation {
        Invocation::new(Program::Info).arg("-dminus").arg(input)
    }

    /// `3dinfo -dmaxus`: maximum value of the first sub-brick.
    pub fn info_max<S: Into<String>>(input: S) -> Invocation {
        Invocation::new(Program::Info).arg("-dmaxus").arg(input)
    }

    pub fn version() -> Invocation {
        Invocation::new(Program::Afni).arg("-ver")
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", quote(arg))?;
        }
        Ok(())
    }
}

fn quote(arg: &str) -> String {
    let plain = !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./+=:,".contains(c));
    if plain {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', r"'\''"))
    }
}

/// Builder for `3dcalc`, binding inputs to the letters `a`, `b`, `c`, ...
/// in the order they are added.
#[derive(Debug, Clone)]
pub struct Calc {
    inputs: Vec<String>,
    expr: String,
    datum: Option<Datum>,
}

impl Calc {
    pub fn new<S: Into<String>>(expr: S) -> Calc {
        Calc {
            inputs: Vec::new(),
            expr: expr.into(),
            datum: None,
        }
    }

    pub fn input<S: Into<String>>(mut self, input: S) -> Calc {
        self.inputs.push(input.into());
        self
    }

    pub fn datum(mut self, datum: Datum) -> Calc {
        self.datum = Some(datum);
        self
    }

    pub fn write(self, prefix: &Dataset) -> Invocation {
        let mut inv = Invocation::new(Program::Calc);
        for (letter, input) in ('a'..='z').zip(self.inputs) {
            inv = inv.arg(format!("-{}", letter)).arg(input);
        }
        inv = inv.arg("-expr").arg(self.expr);
        if let Some(datum) = self.datum {
            inv = inv.arg("-datum").arg(datum.to_string());
        }
        inv.arg(PREFIX_FLAG).arg(prefix.path().display().to_string())
    }
}

use crate::{config::Mode, error::Error};
use afni::Dataset;
use std::path::{Path, MAIN_SEPARATOR};

const CLEANED_SUFFIX: &str = "_MPRAGEised";
const REBIASED_SUFFIX: &str = "_rebiased";

/// `<uni>_MPRAGEised` (plus `_rebiased` when reintroducing) next to the UNI
/// image, in the UNI image's format.
pub fn default_output(uni: &Dataset, mode: Mode) -> Dataset {
    let stem = match mode {
        Mode::Remove => format!("{}{}", uni.stem(), CLEANED_SUFFIX),
        Mode::Reintroduce => format!("{}{}{}", uni.stem(), CLEANED_SUFFIX, REBIASED_SUFFIX),
    };
    uni.with_stem(stem)
}

/// Where the result goes.
///
/// An existing directory, a path ending in a separator, or a name with
/// neither an extension nor an AFNI view is taken as a folder for the default
/// name. Anything else must name a dataset.
pub(crate) fn resolve_output(
    uni: &Dataset,
    mode: Mode,
    output: Option<&Path>,
) -> Result<Dataset, Error> {
    let output = match output {
        None => return Ok(default_output(uni, mode)),
        Some(p) => p,
    };
    if is_folder(output) {
        return Ok(default_output(uni, mode).with_dir(output));
    }
    Dataset::parse(output).map_err(|e| Error::Usage(e.to_string()))
}

fn is_folder(p: &Path) -> bool {
    if p.is_dir() {
        return true;
    }
    let s = p.to_string_lossy();
    if s.ends_with(MAIN_SEPARATOR) || s.ends_with('/') {
        return true;
    }
    match p.file_name().and_then(|n| n.to_str()) {
        Some(name) => !name.contains('.') && !name.contains('+'),
        None => true,
    }
}

use crate::error::DatasetError;
use std::{
    fmt,
    path::{Path, PathBuf},
    str::FromStr,
};
use strum::{Display, EnumString};

const NIFTI_GZ_EXT: &str = ".nii.gz";
const NIFTI_EXT: &str = ".nii";
const HEAD_EXT: &str = ".HEAD";
const BRIK_EXT: &str = ".BRIK";
const BRIK_GZ_EXT: &str = ".BRIK.gz";

/// AFNI coordinate view, the part after `+` in a dataset name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum View {
    Orig,
    Tlrc,
    Acpc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    NiftiGz,
    Nifti,
    Afni(View),
}

impl Format {
    /// What follows the stem in the name AFNI programs accept.
    pub fn suffix(&self) -> String {
        match self {
            Format::NiftiGz => NIFTI_GZ_EXT.to_string(),
            Format::Nifti => NIFTI_EXT.to_string(),
            Format::Afni(view) => format!("+{}", view),
        }
    }
}

/// A volume as AFNI sees it: a directory, a stem and a storage format.
///
/// NIfTI datasets are a single file. AFNI datasets are a `.HEAD` file plus a
/// `.BRIK` or `.BRIK.gz` file, addressed together as `stem+view`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Dataset {
    dir: PathBuf,
    stem: String,
    format: Format,
}

impl Dataset {
    pub fn new<P: Into<PathBuf>, S: Into<String>>(dir: P, stem: S, format: Format) -> Dataset {
        Dataset {
            dir: dir.into(),
            stem: stem.into(),
            format,
        }
    }

    /// Recognise a dataset from a path.
    ///
    /// A name containing `.nii` is NIfTI (gzipped when it ends in `.nii.gz`).
    /// A name containing `+` is an AFNI dataset whose stem is everything
    /// before the last `+`; a trailing `.HEAD`, `.BRIK` or `.BRIK.gz` is
    /// accepted and ignored.
    pub fn parse<P: AsRef<Path>>(path: P) -> Result<Dataset, DatasetError> {
        let path = path.as_ref();
        let unsupported = || DatasetError::UnsupportedFormat(path.to_path_buf());
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(unsupported)?;
        let dir = path.parent().map(Path::to_path_buf).unwrap_or_default();

        let (stem, format) = if name.contains(NIFTI_EXT) {
            if let Some(stem) = name.strip_suffix(NIFTI_GZ_EXT) {
                (stem, Format::NiftiGz)
            } else if let Some(stem) = name.strip_suffix(NIFTI_EXT) {
                (stem, Format::Nifti)
            } else {
                return Err(unsupported());
            }
        } else if let Some((stem, rest)) = name.rsplit_once('+') {
            let view = [BRIK_GZ_EXT, BRIK_EXT, HEAD_EXT, "."]
                .iter()
                .find_map(|ext| rest.strip_suffix(ext))
                .unwrap_or(rest);
            let view = View::from_str(view).map_err(|_| DatasetError::UnknownView {
                path: path.to_path_buf(),
                view: view.to_string(),
            })?;
            (stem, Format::Afni(view))
        } else {
            return Err(unsupported());
        };

        if stem.is_empty() {
            return Err(unsupported());
        }
        Ok(Dataset::new(dir, stem, format))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn stem(&self) -> &str {
        &self.stem
    }

    pub fn format(&self) -> Format {
        self.format
    }

    /// The name to hand to AFNI, both as an input and as a `-prefix`.
    pub fn path(&self) -> PathBuf {
        self.dir.join(format!("{}{}", self.stem, self.format.suffix()))
    }

    /// `path[index]`, selecting one sub-brick of a multi-volume dataset.
    pub fn select(&self, index: usize) -> String {
        format!("{}[{}]", self.path().display(), index)
    }

    /// The file holding the header.
    pub fn header_path(&self) -> PathBuf {
        match self.format {
            Format::NiftiGz | Format::Nifti => self.path(),
            Format::Afni(_) => self.with_extension(HEAD_EXT),
        }
    }

    /// Every file the dataset may consist of on disk.
    pub fn files(&self) -> Vec<PathBuf> {
        match self.format {
            Format::NiftiGz | Format::Nifti => vec![self.path()],
            Format::Afni(_) => vec![
                self.with_extension(HEAD_EXT),
                self.with_extension(BRIK_EXT),
                self.with_extension(BRIK_GZ_EXT),
            ],
        }
    }

    pub fn existing_files(&self) -> Vec<PathBuf> {
        self.files().into_iter().filter(|f| f.is_file()).collect()
    }

    /// True when both the header and the voxel data are present.
    pub fn exists(&self) -> bool {
        match self.format {
            Format::NiftiGz | Format::Nifti => self.path().is_file(),
            Format::Afni(_) => {
                self.with_extension(HEAD_EXT).is_file()
                    && (self.with_extension(BRIK_EXT).is_file()
                        || self.with_extension(BRIK_GZ_EXT).is_file())
            }
        }
    }

    pub fn with_stem<S: Into<String>>(&self, stem: S) -> Dataset {
        Dataset::new(self.dir.clone(), stem, self.format)
    }

    pub fn with_dir<P: Into<PathBuf>>(&self, dir: P) -> Dataset {
        Dataset::new(dir, self.stem.clone(), self.format)
    }

    fn with_extension(&self, ext: &str) -> PathBuf {
        let mut name = self.path().into_os_string();
        name.push(ext);
        PathBuf::from(name)
    }
}

impl fmt::Display for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path().display())
    }
}

use crate::{
    dataset::{Dataset, Format},
    error::GridError,
};
use nifti::NiftiHeader;
use std::{fmt, path::Path};

/// Spacing difference (mm) under which two grids are considered the same.
const SPACING_TOLERANCE: f64 = 1e-4;

const AFNI_DIMENSIONS: &str = "DATASET_DIMENSIONS";
const AFNI_DELTA: &str = "DELTA";

/// Spatial sampling of a volume: voxel counts and voxel sizes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Grid {
    pub dims: [usize; 3],
    pub spacing: [f64; 3],
}

impl Grid {
    pub fn matches(&self, other: &Grid) -> bool {
        self.dims == other.dims
            && self
                .spacing
                .iter()
                .zip(other.spacing.iter())
                .all(|(a, b)| (a - b).abs() <= SPACING_TOLERANCE)
    }
}

impl fmt::Display for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [nx, ny, nz] = self.dims;
        let [dx, dy, dz] = self.spacing;
        write!(f, "{}x{}x{} @ {:.3}x{:.3}x{:.3} mm", nx, ny, nz, dx, dy, dz)
    }
}

/// Read the grid of a dataset from its header, without touching voxel data.
pub fn probe_grid(dataset: &Dataset) -> Result<Grid, GridError> {
    let path = dataset.header_path();
    match dataset.format() {
        Format::NiftiGz | Format::Nifti => nifti_grid(&path),
        Format::Afni(_) => afni_grid(&path),
    }
}

fn nifti_grid(path: &Path) -> Result<Grid, GridError> {
    let header = NiftiHeader::from_file(path).map_err(|source| GridError::Nifti {
        path: path.to_path_buf(),
        source,
    })?;
    let ndim = header.dim[0] as usize;
    let mut dims = [1usize; 3];
    let mut spacing = [1f64; 3];
    for axis in 0..3 {
        if axis < ndim {
            dims[axis] = header.dim[axis + 1] as usize;
            spacing[axis] = f64::from(header.pixdim[axis + 1]).abs();
        }
    }
    Ok(Grid { dims, spacing })
}

fn afni_grid(path: &Path) -> Result<Grid, GridError> {
    let text = std::fs::read_to_string(path).map_err(|source| GridError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let dims = head_attribute(&text, AFNI_DIMENSIONS).ok_or_else(|| {
        GridError::MissingAttribute {
            path: path.to_path_buf(),
            name: AFNI_DIMENSIONS,
        }
    })?;
    let delta = head_attribute(&text, AFNI_DELTA).ok_or_else(|| GridError::MissingAttribute {
        path: path.to_path_buf(),
        name: AFNI_DELTA,
    })?;

    let malformed = |name| GridError::MalformedAttribute {
        path: path.to_path_buf(),
        name,
    };
    if dims.len() < 3 || dims[..3].iter().any(|d| *d < 1.0 || d.fract() != 0.0) {
        return Err(malformed(AFNI_DIMENSIONS));
    }
    if delta.len() < 3 {
        return Err(malformed(AFNI_DELTA));
    }
    Ok(Grid {
        dims: [dims[0] as usize, dims[1] as usize, dims[2] as usize],
        spacing: [delta[0].abs(), delta[1].abs(), delta[2].abs()],
    })
}

/// Numeric values of one attribute in a `.HEAD` file.
///
/// Each attribute is a `type = ...`, `name = ...`, `count = N` block followed
/// by N whitespace separated values, possibly over several lines.
fn head_attribute(text: &str, wanted: &str) -> Option<Vec<f64>> {
    let mut lines = text.lines();
    while let Some(line) = lines.next() {
        let name = match line.trim().strip_prefix("name") {
            Some(rest) => rest.trim_start().trim_start_matches('=').trim(),
            None => continue,
        };
        if name != wanted {
            continue;
        }
        let count = lines
            .next()?
            .trim()
            .strip_prefix("count")?
            .trim_start()
            .trim_start_matches('=')
            .trim()
            .parse::<usize>()
            .ok()?;

        let mut values = Vec::with_capacity(count);
        for line in lines.by_ref() {
            for token in line.split_whitespace() {
                values.push(token.parse::<f64>().ok()?);
            }
            if values.len() >= count {
                break;
            }
        }
        if values.len() != count {
            return None;
        }
        return Some(values);
    }
    None
}

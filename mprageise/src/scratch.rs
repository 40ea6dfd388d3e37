use afni::{Dataset, Format};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const SCRATCH_PREFIX: &str = ".mprageise-";

/// The private directory holding one run's intermediate datasets.
///
/// Created next to the output so the final move is a rename on the same
/// filesystem. Removed when dropped, on success and on every error path,
/// unless the run asked to keep it.
pub struct Scratch {
    dir: Option<TempDir>,
    path: PathBuf,
    keep: bool,
}

impl Scratch {
    pub fn create_in(parent: &Path, keep: bool) -> std::io::Result<Scratch> {
        let parent = if parent.as_os_str().is_empty() {
            Path::new(".")
        } else {
            parent
        };
        let dir = tempfile::Builder::new()
            .prefix(SCRATCH_PREFIX)
            .tempdir_in(parent)?;
        let path = dir.path().to_path_buf();
        log::debug!("scratch directory: {}", path.display());
        Ok(Scratch {
            dir: Some(dir),
            path,
            keep,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn dataset(&self, stem: &str, format: Format) -> Dataset {
        Dataset::new(&self.path, stem, format)
    }
}

impl Drop for Scratch {
    fn drop(&mut self) {
        let dir = match self.dir.take() {
            Some(d) => d,
            None => return,
        };
        if self.keep {
            let kept = dir.keep();
            log::warn!("kept intermediate files in {}", kept.display());
            return;
        }
        match dir.close() {
            Ok(()) => log::debug!("removed scratch directory {}", self.path.display()),
            Err(e) => log::warn!(
                "could not remove scratch directory {}: {}",
                self.path.display(),
                e
            ),
        }
    }
}

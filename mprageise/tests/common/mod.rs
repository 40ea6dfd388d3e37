#![allow(dead_code)]

use afni::{Dataset, Format, Invocation, Program, Runner, ToolError, ToolOutput};
use mprageise::Cancel;
use nifti::{writer::WriterOptions, NiftiHeader};
use std::{
    cell::RefCell,
    fs,
    path::{Path, PathBuf},
};

pub const CLIP_LEVEL: &str = "412.5\n";

/// Stands in for AFNI: answers the query programs with fixed numbers and
/// writes a small file for every `-prefix` it is given.
pub struct FakeRunner {
    pub calls: RefCell<Vec<Invocation>>,
    pub clip_level: String,
    pub fail_on: Option<Program>,
    pub interrupt_on: Option<(Program, Cancel)>,
}

impl Default for FakeRunner {
    fn default() -> Self {
        Self {
            calls: RefCell::new(Vec::new()),
            clip_level: CLIP_LEVEL.to_string(),
            fail_on: None,
            interrupt_on: None,
        }
    }
}

impl FakeRunner {
    pub fn programs(&self) -> Vec<Program> {
        self.calls.borrow().iter().map(|c| c.program()).collect()
    }

    pub fn exprs(&self) -> Vec<String> {
        self.calls.borrow().iter().filter_map(expr_of).collect()
    }

    pub fn last(&self) -> Invocation {
        self.calls.borrow().last().cloned().unwrap()
    }
}

fn expr_of(inv: &Invocation) -> Option<String> {
    let args = inv.arguments();
    args.iter()
        .position(|a| a == "-expr")
        .and_then(|i| args.get(i + 1))
        .cloned()
}

impl Runner for FakeRunner {
    fn run(&self, invocation: &Invocation) -> Result<ToolOutput, ToolError> {
        self.calls.borrow_mut().push(invocation.clone());
        let program = invocation.program();

        if let Some((p, cancel)) = &self.interrupt_on {
            if *p == program {
                cancel.cancel();
                return Err(ToolError::Exit {
                    program,
                    code: None,
                    stdout: String::new(),
                    stderr: String::new(),
                });
            }
        }
        if self.fail_on == Some(program) {
            return Err(ToolError::Exit {
                program,
                code: Some(1),
                stdout: String::new(),
                stderr: "** FATAL ERROR: fake failure\n".to_string(),
            });
        }

        match program {
            Program::ClipLevel => Ok(ToolOutput::new(self.clip_level.clone())),
            Program::Info if invocation.arguments().iter().any(|a| a == "-dminus") => {
                Ok(ToolOutput::new("0\n"))
            }
            Program::Info => Ok(ToolOutput::new("1000\n")),
            Program::Afni => Ok(ToolOutput::new("AFNI_fake\n")),
            _ => {
                let prefix = invocation.prefix().expect("writer without -prefix");
                let dataset = Dataset::parse(prefix).expect("bad prefix");
                let content = format!("{} {}", program, expr_of(invocation).unwrap_or_default());
                write_dataset(&dataset, content.as_bytes());
                Ok(ToolOutput::default())
            }
        }
    }
}

pub fn write_dataset(dataset: &Dataset, content: &[u8]) {
    match dataset.format() {
        Format::Nifti | Format::NiftiGz => fs::write(dataset.path(), content).unwrap(),
        Format::Afni(_) => {
            fs::write(dataset.header_path(), content).unwrap();
            let mut brik = dataset.path().into_os_string();
            brik.push(".BRIK");
            fs::write(brik, content).unwrap();
        }
    }
}

pub fn write_nifti(path: &Path, dims: (usize, usize, usize)) {
    let mut header = NiftiHeader::default();
    header.pixdim = [1.0; 8];
    let data = ndarray::Array3::<f32>::zeros(dims);
    WriterOptions::new(path)
        .reference_header(&header)
        .write_nifti(&data)
        .unwrap();
}

pub fn write_afni(dir: &Path, stem: &str, dims: (usize, usize, usize)) -> PathBuf {
    let head = format!(
        "\ntype = integer-attribute\nname = DATASET_DIMENSIONS\ncount = 5\n {} {} {} 0 0\n\n\
         type = float-attribute\nname = DELTA\ncount = 3\n 1 1 1\n",
        dims.0, dims.1, dims.2
    );
    fs::write(dir.join(format!("{}+orig.HEAD", stem)), head).unwrap();
    fs::write(dir.join(format!("{}+orig.BRIK", stem)), b"voxels").unwrap();
    dir.join(format!("{}+orig", stem))
}

/// INV2.nii.gz and UNI.nii.gz on the same 64^3 grid.
pub fn inputs(dir: &Path) -> (PathBuf, PathBuf) {
    let inv2 = dir.join("INV2.nii.gz");
    let uni = dir.join("UNI.nii.gz");
    write_nifti(&inv2, (64, 64, 64));
    write_nifti(&uni, (64, 64, 64));
    (inv2, uni)
}

/// Scratch directories still present under `dir`.
pub fn leftovers(dir: &Path) -> Vec<PathBuf> {
    fs::read_dir(dir)
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.file_name().unwrap().to_string_lossy().starts_with(".mprageise-"))
        .collect()
}

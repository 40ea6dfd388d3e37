use crate::{
    artifacts::{BiasField, CoarseMask, Combined, SmoothedMask, Threshold, Unifized, WeightMap},
    cancel::Cancel,
    config::{Mode, Params, Request, Weighting},
    error::Error,
    naming,
    scratch::Scratch,
    step::Step,
};
use afni::{probe_grid, Calc, Dataset, Datum, Format, Grid, Invocation, Runner, ToolError, ToolOutput};
use std::{
    fs,
    path::{Path, PathBuf},
};

/// Intermediates are plain NIfTI, the cheapest format for AFNI to write.
const INTERMEDIATE_FORMAT: Format = Format::Nifti;
const RESULT_STEM: &str = "result";

const BIAS_FIELD_EXPR: &str = "ispositive(a)*b/a+not(ispositive(a))";
const REMOVE_EXPR: &str = "a*b";
const REINTRODUCE_EXPR: &str = "a*b/c";

/// What a successful run produced.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    pub output: PathBuf,
    pub threshold: f64,
    pub mode: Mode,
}

#[derive(Debug)]
struct Inputs {
    inv2: Dataset,
    uni: Dataset,
    bias_field: Option<Dataset>,
    output: Dataset,
}

/// Clean one UNI image.
///
/// Inputs are validated before any AFNI program runs. Intermediates live in a
/// scratch directory that is removed on every exit path, and the result is
/// moved into place only after the last step succeeded.
pub fn clean(request: &Request, runner: &dyn Runner, cancel: &Cancel) -> Result<Outcome, Error> {
    let inputs = validate(request)?;
    match request.mode {
        Mode::Remove => log::info!("removing bias field"),
        Mode::Reintroduce => log::info!("reintroducing bias field"),
    }

    let run = Run::stage(request, &inputs, runner, cancel)?;
    let threshold = run.estimate_threshold()?;
    let coarse = run.build_mask(threshold)?;
    let smoothed = run.smooth_mask(coarse)?;

    let mut unifized = None;
    let weights = match request.params.weighting {
        Weighting::Mask => WeightMap(smoothed.0),
        Weighting::Intensity => {
            let u = run.unifize()?;
            let w = run.weight(smoothed, &u)?;
            unifized = Some(u);
            w
        }
    };

    log::info!("MPRAGEising {}", inputs.uni);
    let combined = match request.mode {
        Mode::Remove => run.combine(&weights, None)?,
        Mode::Reintroduce => {
            let bias = match &inputs.bias_field {
                Some(saved) => BiasField(saved.clone()),
                None => {
                    let u = match unifized.take() {
                        Some(u) => u,
                        None => run.unifize()?,
                    };
                    run.estimate_bias_field(&u)?
                }
            };
            run.combine(&weights, Some(&bias))?
        }
    };

    let output = run.persist(combined)?;
    log::info!("done: {}", output.display());
    Ok(Outcome {
        output,
        threshold: threshold.value(),
        mode: request.mode,
    })
}

/// Everything `clean` checks before its first AFNI invocation: parameters,
/// inputs, grids and the output name. Runs no external program.
pub fn check(request: &Request) -> Result<(), Error> {
    validate(request).map(|_| ())
}

fn validate(request: &Request) -> Result<Inputs, Error> {
    request.validate()?;

    let inv2 = locate(&request.inv2)?;
    let uni = locate(&request.uni)?;
    let bias_field = request.bias_field.as_deref().map(locate).transpose()?;

    let inv2_grid = grid_of(&inv2)?;
    let uni_grid = grid_of(&uni)?;
    ensure_same_grid(&inv2, inv2_grid, &uni, uni_grid)?;
    if let Some(bias) = &bias_field {
        ensure_same_grid(&uni, uni_grid, bias, grid_of(bias)?)?;
    }
    log::debug!("grid: {}", uni_grid);

    let output = naming::resolve_output(&uni, request.mode, request.output.as_deref())?;
    for input in [&inv2, &uni].into_iter().chain(bias_field.as_ref()) {
        if same_dataset(input, &output) {
            return Err(Error::Usage(format!(
                "output {} would overwrite the input of the same name",
                output
            )));
        }
    }

    Ok(Inputs {
        inv2,
        uni,
        bias_field,
        output,
    })
}

fn locate(path: &Path) -> Result<Dataset, Error> {
    let dataset = match Dataset::parse(path) {
        Ok(d) => d,
        Err(_) if !path.exists() => {
            return Err(Error::InputNotFound {
                path: path.to_path_buf(),
            })
        }
        Err(e) => return Err(Error::Usage(e.to_string())),
    };
    if !dataset.exists() {
        return Err(Error::InputNotFound {
            path: path.to_path_buf(),
        });
    }
    Ok(dataset)
}

fn grid_of(dataset: &Dataset) -> Result<Grid, Error> {
    probe_grid(dataset).map_err(|source| Error::UnreadableInput {
        path: dataset.path(),
        source,
    })
}

fn ensure_same_grid(
    expected: &Dataset,
    expected_grid: Grid,
    found: &Dataset,
    found_grid: Grid,
) -> Result<(), Error> {
    if expected_grid.matches(&found_grid) {
        return Ok(());
    }
    Err(Error::GridMismatch {
        expected: expected.path(),
        expected_grid,
        found: found.path(),
        found_grid,
    })
}

fn same_dataset(a: &Dataset, b: &Dataset) -> bool {
    fn dir_of(d: &Dataset) -> PathBuf {
        let dir = if d.dir().as_os_str().is_empty() {
            Path::new(".")
        } else {
            d.dir()
        };
        fs::canonicalize(dir).unwrap_or_else(|_| dir.to_path_buf())
    }
    a.stem() == b.stem() && a.format() == b.format() && dir_of(a) == dir_of(b)
}

/// State of one run between staging and persisting.
struct Run<'a> {
    runner: &'a dyn Runner,
    cancel: &'a Cancel,
    params: &'a Params,
    inputs: &'a Inputs,
    scratch: Scratch,
}

impl<'a> Run<'a> {
    fn stage(
        request: &'a Request,
        inputs: &'a Inputs,
        runner: &'a dyn Runner,
        cancel: &'a Cancel,
    ) -> Result<Run<'a>, Error> {
        checkpoint(cancel, Step::Stage)?;
        let out_dir = inputs.output.dir();
        if !out_dir.as_os_str().is_empty() && !out_dir.is_dir() {
            fs::create_dir_all(out_dir).map_err(|e| {
                Error::io(
                    Step::Stage,
                    format!("could not create output folder {}", out_dir.display()),
                    e,
                )
            })?;
        }
        let scratch = Scratch::create_in(out_dir, request.keep_temp).map_err(|e| {
            Error::io(
                Step::Stage,
                format!("could not create a scratch directory in {}", out_dir.display()),
                e,
            )
        })?;
        Ok(Run {
            runner,
            cancel,
            params: &request.params,
            inputs,
            scratch,
        })
    }

    fn inv2(&self) -> String {
        self.inputs.inv2.select(0)
    }

    fn intermediate(&self, stem: &str) -> Dataset {
        self.scratch.dataset(stem, INTERMEDIATE_FORMAT)
    }

    fn invoke(&self, step: Step, invocation: &Invocation) -> Result<ToolOutput, Error> {
        checkpoint(self.cancel, step)?;
        log::debug!("[{}] {}", step, invocation);
        self.runner.run(invocation).map_err(|source| {
            if self.cancel.is_cancelled() {
                Error::Interrupted { step }
            } else {
                Error::ExternalToolFailure { step, source }
            }
        })
    }

    /// Run a program that must leave `target` behind.
    fn produce(&self, step: Step, invocation: &Invocation, target: &Dataset) -> Result<(), Error> {
        self.invoke(step, invocation)?;
        if !target.exists() {
            return Err(missing_output(step, invocation, target));
        }
        Ok(())
    }

    fn query(&self, step: Step, invocation: &Invocation) -> Result<f64, Error> {
        self.invoke(step, invocation)?
            .scalar(invocation)
            .map_err(|source| Error::ExternalToolFailure { step, source })
    }

    fn estimate_threshold(&self) -> Result<Threshold, Error> {
        let step = Step::EstimateThreshold;
        let inv = Invocation::clip_level(self.inv2(), self.params.clip_fraction);
        let value = self.query(step, &inv)?;
        if !(value.is_finite() && value > 0.0) {
            return Err(Error::ExternalToolFailure {
                step,
                source: ToolError::Unexpected {
                    program: inv.program(),
                    detail: format!("an unusable clip level of {}", value),
                },
            });
        }
        log::info!("clip level: {}", value);
        Ok(Threshold(value))
    }

    fn build_mask(&self, threshold: Threshold) -> Result<CoarseMask, Error> {
        let mask = self.intermediate("mask");
        let inv = Calc::new(format!("step(a-{})", threshold))
            .input(self.inv2())
            .datum(Datum::Float)
            .write(&mask);
        self.produce(Step::BuildMask, &inv, &mask)?;
        Ok(CoarseMask(mask))
    }

    fn smooth_mask(&self, coarse: CoarseMask) -> Result<SmoothedMask, Error> {
        if !self.params.smoothing() {
            log::debug!("mask smoothing disabled");
            return Ok(SmoothedMask(coarse.0));
        }
        let smoothed = self.intermediate("mask_smooth");
        let inv = Invocation::blur(&coarse.0, self.params.blur_fwhm, Datum::Float, &smoothed);
        self.produce(Step::SmoothMask, &inv, &smoothed)?;
        Ok(SmoothedMask(smoothed))
    }

    fn unifize(&self) -> Result<Unifized, Error> {
        let unifized = self.intermediate("inv2_unifized");
        let inv = Invocation::unifize(self.inv2(), &unifized);
        self.produce(Step::Unifize, &inv, &unifized)?;
        Ok(Unifized(unifized))
    }

    /// Mask times the unifized INV2 scaled to `[0, 1]`.
    fn weight(&self, mask: SmoothedMask, source: &Unifized) -> Result<WeightMap, Error> {
        let step = Step::Weight;
        let src = source.0.path().display().to_string();
        let min_inv = Invocation::info_min(src.as_str());
        let max_inv = Invocation::info_max(src.as_str());
        let min = self.query(step, &min_inv)?;
        let max = self.query(step, &max_inv)?;
        if !(max > min) {
            return Err(Error::ExternalToolFailure {
                step,
                source: ToolError::Unexpected {
                    program: max_inv.program(),
                    detail: format!("a flat intensity range [{}, {}]", min, max),
                },
            });
        }

        let weights = self.intermediate("weights");
        let inv = Calc::new(format!("((a-({}))/{})*b", min, max - min))
            .input(src)
            .input(mask.0.path().display().to_string())
            .datum(Datum::Float)
            .write(&weights);
        self.produce(step, &inv, &weights)?;
        Ok(WeightMap(weights))
    }

    fn estimate_bias_field(&self, unifized: &Unifized) -> Result<BiasField, Error> {
        let bias = self.intermediate("bias_field");
        let inv = Calc::new(BIAS_FIELD_EXPR)
            .input(self.inv2())
            .input(unifized.0.path().display().to_string())
            .datum(Datum::Float)
            .write(&bias);
        self.produce(Step::EstimateBiasField, &inv, &bias)?;
        Ok(BiasField(bias))
    }

    /// UNI times the weights, divided by the bias field when one is given.
    /// No `-datum`, so AFNI keeps the UNI voxel type.
    fn combine(&self, weights: &WeightMap, bias: Option<&BiasField>) -> Result<Combined, Error> {
        let step = Step::Combine;
        let result = self.scratch.dataset(RESULT_STEM, self.inputs.output.format());
        let calc = match bias {
            None => Calc::new(REMOVE_EXPR),
            Some(_) => Calc::new(REINTRODUCE_EXPR),
        }
        .input(self.inputs.uni.path().display().to_string())
        .input(weights.0.path().display().to_string());
        let calc = match bias {
            Some(b) => calc.input(b.0.path().display().to_string()),
            None => calc,
        };
        let inv = calc.write(&result);
        self.invoke(step, &inv)?;

        let files = self.result_files(step)?;
        if files.is_empty() {
            return Err(missing_output(step, &inv, &result));
        }
        Ok(Combined { files })
    }

    /// Files in scratch belonging to the result dataset. AFNI picks the view
    /// and BRIK compression itself, so they are found rather than assumed.
    fn result_files(&self, step: Step) -> Result<Vec<PathBuf>, Error> {
        let entries = fs::read_dir(self.scratch.path()).map_err(|e| {
            Error::io(
                step,
                format!("could not list {}", self.scratch.path().display()),
                e,
            )
        })?;
        let dotted = format!("{}.", RESULT_STEM);
        let viewed = format!("{}+", RESULT_STEM);
        let mut files = entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| {
                p.file_name()
                    .and_then(|n| n.to_str())
                    .map(|n| n.starts_with(&dotted) || n.starts_with(&viewed))
                    .unwrap_or(false)
            })
            .collect::<Vec<_>>();
        files.sort();
        Ok(files)
    }

    /// Move the result out of scratch, replacing a previous output.
    fn persist(&self, combined: Combined) -> Result<PathBuf, Error> {
        let step = Step::Persist;
        checkpoint(self.cancel, step)?;
        let output = &self.inputs.output;

        for stale in output.existing_files() {
            log::warn!("replacing {}", stale.display());
            fs::remove_file(&stale).map_err(|e| {
                Error::io(step, format!("could not remove {}", stale.display()), e)
            })?;
        }

        let mut written = Vec::with_capacity(combined.files.len());
        for file in &combined.files {
            let name = file
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            let suffix = name.strip_prefix(RESULT_STEM).unwrap_or(&name);
            let target = output.dir().join(format!("{}{}", output.stem(), suffix));
            fs::rename(file, &target).map_err(|e| {
                Error::io(
                    step,
                    format!("could not move result to {}", target.display()),
                    e,
                )
            })?;
            log::debug!("{} -> {}", file.display(), target.display());
            written.push(target);
        }

        let primary = written
            .iter()
            .find(|p| p.to_string_lossy().ends_with(".HEAD"))
            .or_else(|| written.first())
            .cloned()
            .unwrap_or_else(|| output.path());
        Ok(Dataset::parse(&primary)
            .map(|d| d.path())
            .unwrap_or(primary))
    }
}

fn checkpoint(cancel: &Cancel, step: Step) -> Result<(), Error> {
    if cancel.is_cancelled() {
        return Err(Error::Interrupted { step });
    }
    Ok(())
}

fn missing_output(step: Step, invocation: &Invocation, target: &Dataset) -> Error {
    Error::ExternalToolFailure {
        step,
        source: ToolError::Unexpected {
            program: invocation.program(),
            detail: format!("success but wrote no {}", target),
        },
    }
}

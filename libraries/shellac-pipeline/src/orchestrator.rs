//! Batch orchestration: plan all assets, sequence names, execute.
//!
//! Per-asset work runs on a bounded worker pool in two pooled phases
//! with a serial naming pass between them, so ordinal prefixes reflect
//! the complete set of outputs the run will emit. Asset-local failures
//! degrade the batch and are reported; classification and naming
//! problems abort the run.

use std::collections::VecDeque;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::{mpsc, Mutex, PoisonError};
use std::thread;
use std::time::Duration;

use tempfile::TempDir;

use shellac_core::{
    AudioAsset, AudioEngine, EncodeFormat, MasterError, MasteringTargets, ProcessingPlan,
    RestoreFilters, Result, Role,
};

use crate::classifier::{classify, ClassifiedAsset};
use crate::gain::{plan_gain, verify_levels};
use crate::namer::{ensure_distinct_stems, output_file_name, role_stem, Sequencer};
use crate::room_tone::{part_boundary_plan, plan_room_tone};
use crate::sample::{select_sample_sources, RETAIL_SAMPLE_STEM};
use crate::scanner::AssetScanner;
use crate::splitter::plan_parts;
use crate::trim::plan_trim;

/// Delay before the single retry of a failed engine call.
const RETRY_DELAY: Duration = Duration::from_millis(500);

/// Slack allowed when verifying inserted padding levels, in dB.
const PAD_TOLERANCE_DB: f64 = 0.1;

/// Everything the orchestrator needs for one batch run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Directory holding the raw recordings
    pub input_dir: PathBuf,
    /// Directory receiving the delivered files, created when missing
    pub output_dir: PathBuf,
    /// Compliance targets
    pub targets: MasteringTargets,
    /// Delivery encoding parameters
    pub format: EncodeFormat,
    /// Restoration chain; `None` disables pre-master cleanup
    pub restore: Option<RestoreFilters>,
    /// Explicit opening-credits designation
    pub opening: Option<PathBuf>,
    /// Explicit closing-credits designation
    pub closing: Option<PathBuf>,
    /// Worker pool size; defaults to available CPU parallelism
    pub workers: Option<usize>,
}

impl RunConfig {
    /// Config with default targets, format, and restoration for the
    /// given directories.
    pub fn new(input_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            input_dir: input_dir.into(),
            output_dir: output_dir.into(),
            targets: MasteringTargets::default(),
            format: EncodeFormat::default(),
            restore: Some(RestoreFilters::default()),
            opening: None,
            closing: None,
            workers: None,
        }
    }

    fn effective_workers(&self) -> usize {
        self.workers.unwrap_or_else(|| {
            thread::available_parallelism()
                .map(NonZeroUsize::get)
                .unwrap_or(2)
        })
    }
}

/// Pipeline stage names for failure reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Container probing at enumeration
    Probe,
    /// Restoration chain
    Restore,
    /// Level and silence measurement
    Measure,
    /// Plan computation
    Plan,
    /// Edge trimming
    Trim,
    /// Gain and limiting
    Gain,
    /// Post-gain re-measurement
    Verify,
    /// Room tone insertion
    Pad,
    /// Part extraction
    Split,
    /// Final encoding
    Encode,
    /// Retail sample derivation
    Sample,
}

impl Stage {
    /// Human-readable stage name
    pub fn label(&self) -> &'static str {
        match self {
            Stage::Probe => "probe",
            Stage::Restore => "restore",
            Stage::Measure => "measure",
            Stage::Plan => "plan",
            Stage::Trim => "trim",
            Stage::Gain => "gain",
            Stage::Verify => "verify",
            Stage::Pad => "room tone",
            Stage::Split => "split",
            Stage::Encode => "encode",
            Stage::Sample => "retail sample",
        }
    }
}

/// One asset (or derived file) that could not be delivered.
#[derive(Debug)]
pub struct AssetFailure {
    /// Source file the failure belongs to
    pub source: PathBuf,
    /// Stage that failed
    pub stage: Stage,
    /// What went wrong
    pub error: MasterError,
}

impl AssetFailure {
    fn new(source: impl Into<PathBuf>, stage: Stage, error: MasterError) -> Self {
        let source = source.into();
        let error = error.for_asset(&source);
        tracing::error!(
            file = %source.display(),
            stage = stage.label(),
            error = %error,
            "asset failed"
        );
        Self {
            source,
            stage,
            error,
        }
    }
}

/// One delivered file.
#[derive(Debug, Clone)]
pub struct FinishedOutput {
    /// Source recording the output came from
    pub source: PathBuf,
    /// Structural role of the source
    pub role: Role,
    /// Part number for split outputs
    pub part: Option<u32>,
    /// Delivered file name
    pub file_name: String,
    /// Delivered file path
    pub path: PathBuf,
    /// Delivered duration in seconds
    pub duration_seconds: f64,
}

/// Outcome of a batch run.
#[derive(Debug)]
pub struct RunReport {
    /// Delivered files in sequence order
    pub outputs: Vec<FinishedOutput>,
    /// Assets that could not be delivered
    pub failures: Vec<AssetFailure>,
    /// Path of the retail sample, when one was produced
    pub retail_sample: Option<PathBuf>,
    /// Number of assets discovered in the input directory
    pub assets_in: usize,
}

impl RunReport {
    /// Whether every discovered asset was delivered
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    /// Number of distinct source recordings that produced output
    pub fn processed_assets(&self) -> usize {
        let mut sources: Vec<&Path> = self.outputs.iter().map(|o| o.source.as_path()).collect();
        sources.dedup();
        sources.len()
    }
}

/// An asset with its plan and the scratch space its intermediates live in.
struct PlannedAsset {
    classified: ClassifiedAsset,
    plan: ProcessingPlan,
    stem: String,
    /// Dropped (and cleaned up) when the asset's pipeline ends, on every
    /// exit path.
    workspace: TempDir,
    /// The intermediate measurements were taken on: the restored copy,
    /// or the source itself when restoration is off.
    measured: PathBuf,
}

/// A planned asset with its assigned output names, ready to execute.
struct WorkOrder {
    planned: PlannedAsset,
    /// `(part, file_name)` pairs in part order; a single `(None, name)`
    /// entry for unsplit assets.
    names: Vec<(Option<u32>, String)>,
}

/// Drives a batch run against an audio engine.
pub struct Orchestrator<'a> {
    engine: &'a dyn AudioEngine,
    config: RunConfig,
}

impl<'a> Orchestrator<'a> {
    /// Create an orchestrator for one run
    pub fn new(engine: &'a dyn AudioEngine, config: RunConfig) -> Self {
        Self { engine, config }
    }

    /// Run the whole batch.
    ///
    /// Returns a report on success, even a degraded one; an error means
    /// the run itself could not proceed (bad configuration, unusable
    /// input directory, ambiguous classification, naming conflict).
    pub fn run(&self) -> Result<RunReport> {
        self.config.targets.validate()?;
        std::fs::create_dir_all(&self.config.output_dir)?;

        let paths = AssetScanner::new().scan(&self.config.input_dir)?;
        let assets_in = paths.len();
        let mut failures = Vec::new();

        let assets = self.probe_all(paths, &mut failures);
        let mut classified = classify(
            &assets,
            self.config.opening.as_deref(),
            self.config.closing.as_deref(),
        )?;
        classified.sort_by_key(|c| c.role.sort_key());

        let stems: Vec<String> = classified
            .iter()
            .map(|c| role_stem(c.role, c.asset.stem()))
            .collect();
        ensure_distinct_stems(stems.iter().map(String::as_str))?;

        let planned = self.plan_all(classified, &mut failures);
        let orders = self.sequence(planned);

        tracing::info!(
            assets = orders.len(),
            outputs = orders.iter().map(|o| o.names.len()).sum::<usize>(),
            workers = self.config.effective_workers(),
            "executing"
        );

        let mut outputs = Vec::new();
        let results = run_pool(
            self.config.effective_workers(),
            orders,
            |order| self.execute_asset(order),
        );
        for result in results {
            match result {
                Ok(finished) => outputs.extend(finished),
                Err(failure) => failures.push(failure),
            }
        }

        let retail_sample = self.derive_sample(&outputs, &mut failures);

        tracing::info!(
            delivered = outputs.len(),
            failed = failures.len(),
            "run complete"
        );
        Ok(RunReport {
            outputs,
            failures,
            retail_sample,
            assets_in,
        })
    }

    fn probe_all(&self, paths: Vec<PathBuf>, failures: &mut Vec<AssetFailure>) -> Vec<AudioAsset> {
        let mut assets = Vec::with_capacity(paths.len());
        for path in paths {
            match with_retry("probe", &path, || self.engine.probe(&path)) {
                Ok(info) => assets.push(AudioAsset::new(
                    &path,
                    info.duration_seconds,
                    info.sample_rate,
                    info.channels,
                    info.format,
                )),
                Err(err) => failures.push(AssetFailure::new(path, Stage::Probe, err)),
            }
        }
        assets
    }

    fn plan_all(
        &self,
        classified: Vec<ClassifiedAsset>,
        failures: &mut Vec<AssetFailure>,
    ) -> Vec<PlannedAsset> {
        let results = run_pool(
            self.config.effective_workers(),
            classified,
            |item| self.plan_asset(item),
        );
        let mut planned = Vec::new();
        for result in results {
            match result {
                Ok(asset) => planned.push(asset),
                Err(failure) => failures.push(failure),
            }
        }
        planned
    }

    /// Prepare one asset and compute its full plan. Pure decisions over
    /// measurements; nothing here mutates audio except the optional
    /// restoration copy inside the asset's own scratch directory.
    fn plan_asset(&self, classified: ClassifiedAsset) -> std::result::Result<PlannedAsset, AssetFailure> {
        let source = classified.asset.path.clone();
        let fail = |stage, err| AssetFailure::new(&source, stage, err);

        let workspace = TempDir::new().map_err(|e| fail(Stage::Plan, e.into()))?;
        let targets = &self.config.targets;

        let measured = match &self.config.restore {
            Some(filters) => {
                let restored = workspace.path().join("restored.wav");
                with_retry("restore", &source, || {
                    self.engine.restore(&source, filters, &restored)
                })
                .map_err(|e| fail(Stage::Restore, e))?;
                restored
            }
            None => source.clone(),
        };

        let metrics = with_retry("analyze", &source, || self.engine.analyze(&measured))
            .map_err(|e| fail(Stage::Measure, e))?;

        let gain = plan_gain(&metrics, targets, &source).map_err(|e| fail(Stage::Plan, e))?;

        // Tone must still sit under the noise-floor ceiling after the
        // planned gain lifts it, so the scan qualifies quiet at the
        // shifted threshold.
        let floor_db = targets.noise_floor_ceiling_db - gain.gain_db;
        let scan = with_retry("scan_silence", &source, || {
            self.engine
                .scan_silence(&measured, targets.silence_threshold_db, floor_db)
        })
        .map_err(|e| fail(Stage::Measure, e))?;

        let trim = plan_trim(&scan, metrics.duration_seconds, targets, &source)
            .map_err(|e| fail(Stage::Plan, e))?;
        let room_tone = plan_room_tone(&scan, &trim, targets);

        let processed_seconds = trim.remaining(metrics.duration_seconds) + room_tone.added_seconds();
        let parts = plan_parts(processed_seconds, targets);

        let plan = ProcessingPlan {
            trim,
            gain,
            room_tone,
            parts,
            processed_seconds,
        };
        plan.validate(metrics.duration_seconds, targets)
            .map_err(|e| fail(Stage::Plan, e))?;

        tracing::info!(
            file = %classified.asset.display_name(),
            role = %classified.role.label(),
            gain_db = plan.gain.gain_db,
            trim_head = plan.trim.head_seconds,
            trim_tail = plan.trim.tail_seconds,
            outputs = plan.output_count(),
            "planned"
        );

        let stem = role_stem(classified.role, classified.asset.stem());
        Ok(PlannedAsset {
            classified,
            plan,
            stem,
            workspace,
            measured,
        })
    }

    /// Serial naming pass: every output of the run takes its ordinal
    /// here, in role order, before any audio is mutated.
    fn sequence(&self, planned: Vec<PlannedAsset>) -> Vec<WorkOrder> {
        let total: usize = planned.iter().map(|p| p.plan.output_count()).sum();
        let mut sequencer = Sequencer::new(total);
        let extension = self.config.format.codec.extension();

        planned
            .into_iter()
            .map(|asset| {
                let names = if asset.plan.is_split() {
                    asset
                        .plan
                        .parts
                        .iter()
                        .map(|part| {
                            let prefix = sequencer.assign();
                            (
                                Some(part.index),
                                output_file_name(&prefix, &asset.stem, Some(part.index), extension),
                            )
                        })
                        .collect()
                } else {
                    let prefix = sequencer.assign();
                    vec![(None, output_file_name(&prefix, &asset.stem, None, extension))]
                };
                WorkOrder {
                    planned: asset,
                    names,
                }
            })
            .collect()
    }

    /// Execute one asset's plan end to end.
    fn execute_asset(&self, order: WorkOrder) -> std::result::Result<Vec<FinishedOutput>, AssetFailure> {
        let WorkOrder { planned, names } = order;
        let source = planned.classified.asset.path.clone();
        let fail = |stage, err| AssetFailure::new(&source, stage, err);
        let ws = planned.workspace.path();
        let plan = &planned.plan;
        let targets = &self.config.targets;

        let mut current = planned.measured.clone();

        if !plan.trim.is_noop() {
            let trimmed = ws.join("trimmed.wav");
            with_retry("trim", &source, || {
                self.engine.trim(
                    &current,
                    plan.trim.head_seconds,
                    plan.trim.tail_seconds,
                    &trimmed,
                )
            })
            .map_err(|e| fail(Stage::Trim, e))?;
            current = trimmed;
        }

        if plan.gain.gain_db.abs() > f64::EPSILON || plan.gain.expects_limiting {
            let gained = ws.join("gained.wav");
            with_retry("apply_gain", &source, || {
                self.engine
                    .apply_gain(&current, plan.gain.gain_db, plan.gain.limiter_db, &gained)
            })
            .map_err(|e| fail(Stage::Gain, e))?;
            current = gained;
        }

        // Re-measurement after gain is mandatory, never assumed.
        let after = with_retry("analyze", &source, || self.engine.analyze(&current))
            .map_err(|e| fail(Stage::Verify, e))?;
        verify_levels(&after, targets, &source).map_err(|e| fail(Stage::Verify, e))?;

        if !plan.room_tone.is_noop() {
            let padded = ws.join("padded.wav");
            let head = plan.room_tone.head_seconds.unwrap_or(0.0);
            let tail = plan.room_tone.tail_seconds.unwrap_or(0.0);
            with_retry("insert_padding", &source, || {
                self.engine
                    .insert_padding(&current, head, tail, &plan.room_tone.source, &padded)
            })
            .map_err(|e| fail(Stage::Pad, e))?;
            current = padded;

            if head > 0.0 {
                self.verify_pad(&current, 0.0, head, ws, &source)
                    .map_err(|e| fail(Stage::Pad, e))?;
            }
            if tail > 0.0 {
                self.verify_pad(&current, plan.processed_seconds - tail, tail, ws, &source)
                    .map_err(|e| fail(Stage::Pad, e))?;
            }
        }

        let mut outputs = Vec::with_capacity(names.len());
        if plan.is_split() {
            let last = plan.parts.len() as u32;
            for (part, (part_no, name)) in plan.parts.iter().zip(&names) {
                debug_assert_eq!(Some(part.index), *part_no);
                let raw = ws.join(format!("part{}.wav", part.index));
                with_retry("cut", &source, || {
                    self.engine
                        .cut(&current, part.start_seconds, part.duration(), &raw)
                })
                .map_err(|e| fail(Stage::Split, e))?;

                let boundary = part_boundary_plan(part.index == 1, part.index == last, targets);
                let mut part_file = raw;
                let mut part_duration = part.duration();
                if !boundary.is_noop() {
                    let padded = ws.join(format!("part{}_padded.wav", part.index));
                    let head = boundary.head_seconds.unwrap_or(0.0);
                    let tail = boundary.tail_seconds.unwrap_or(0.0);
                    with_retry("insert_padding", &source, || {
                        self.engine
                            .insert_padding(&part_file, head, tail, &boundary.source, &padded)
                    })
                    .map_err(|e| fail(Stage::Pad, e))?;
                    part_duration += boundary.added_seconds();
                    part_file = padded;

                    if head > 0.0 {
                        self.verify_pad(&part_file, 0.0, head, ws, &source)
                            .map_err(|e| fail(Stage::Pad, e))?;
                    }
                    if tail > 0.0 {
                        self.verify_pad(&part_file, part_duration - tail, tail, ws, &source)
                            .map_err(|e| fail(Stage::Pad, e))?;
                    }
                }

                outputs.push(self.encode_output(
                    &planned,
                    &part_file,
                    name,
                    *part_no,
                    part_duration,
                )?);
            }
        } else {
            let (_, name) = &names[0];
            outputs.push(self.encode_output(
                &planned,
                &current,
                name,
                None,
                plan.processed_seconds,
            )?);
        }

        tracing::info!(
            file = %planned.classified.asset.display_name(),
            outputs = outputs.len(),
            "mastered"
        );
        Ok(outputs)
    }

    /// Cut an inserted padding window back out and check its level
    /// against the noise-floor ceiling. A miss is a tone sourcing bug.
    fn verify_pad(
        &self,
        path: &Path,
        start: f64,
        seconds: f64,
        ws: &Path,
        source: &Path,
    ) -> Result<()> {
        let window = ws.join("pad_check.wav");
        with_retry("cut", source, || {
            self.engine.cut(path, start, seconds, &window)
        })?;
        let metrics = with_retry("analyze", source, || self.engine.analyze(&window))?;
        let ceiling = self.config.targets.noise_floor_ceiling_db;
        if metrics.rms_db > ceiling + PAD_TOLERANCE_DB {
            return Err(MasterError::internal(format!(
                "inserted tone at {start} s measures {:.1} dB RMS, above the {ceiling} dB ceiling",
                metrics.rms_db
            )));
        }
        Ok(())
    }

    fn encode_output(
        &self,
        planned: &PlannedAsset,
        input: &Path,
        name: &str,
        part: Option<u32>,
        duration_seconds: f64,
    ) -> std::result::Result<FinishedOutput, AssetFailure> {
        let source = &planned.classified.asset.path;
        let out_path = self.config.output_dir.join(name);
        with_retry("encode", source, || {
            self.engine
                .encode(input, &self.config.format, Some(source), &out_path)
        })
        .map_err(|e| AssetFailure::new(source, Stage::Encode, e))?;

        Ok(FinishedOutput {
            source: source.clone(),
            role: planned.classified.role,
            part,
            file_name: name.to_string(),
            path: out_path,
            duration_seconds,
        })
    }

    /// Derive the retail sample from the delivered outputs.
    fn derive_sample(
        &self,
        outputs: &[FinishedOutput],
        failures: &mut Vec<AssetFailure>,
    ) -> Option<PathBuf> {
        let Some(segments) = select_sample_sources(outputs) else {
            if !outputs.is_empty() {
                tracing::warn!("no opening or body output delivered; skipping the retail sample");
            }
            return None;
        };

        let name = format!("{RETAIL_SAMPLE_STEM}.{}", self.config.format.codec.extension());
        let path = self.config.output_dir.join(&name);
        let result = with_retry("excerpt", &path, || {
            self.engine.excerpt(
                &segments,
                self.config.targets.sample_cap_seconds,
                &self.config.format,
                &path,
            )
        });
        match result {
            Ok(()) => {
                tracing::info!(file = %name, segments = segments.len(), "retail sample written");
                Some(path)
            }
            Err(err) => {
                failures.push(AssetFailure::new(&path, Stage::Sample, err));
                None
            }
        }
    }
}

/// Run one engine call, retrying once with backoff when the failure is
/// worth retrying.
fn with_retry<T>(operation: &str, source: &Path, call: impl Fn() -> Result<T>) -> Result<T> {
    match call() {
        Err(err) if err.is_retryable() => {
            tracing::warn!(
                file = %source.display(),
                operation,
                error = %err,
                "engine call failed, retrying once"
            );
            thread::sleep(RETRY_DELAY);
            call()
        }
        other => other,
    }
}

/// Order-preserving bounded worker pool over scoped threads.
fn run_pool<T, R>(workers: usize, jobs: Vec<T>, task: impl Fn(T) -> R + Sync) -> Vec<R>
where
    T: Send,
    R: Send,
{
    if jobs.is_empty() {
        return Vec::new();
    }
    let worker_count = workers.max(1).min(jobs.len());
    let queue: Mutex<VecDeque<(usize, T)>> = Mutex::new(jobs.into_iter().enumerate().collect());
    let (tx, rx) = mpsc::channel();

    thread::scope(|scope| {
        for _ in 0..worker_count {
            let tx = tx.clone();
            let queue = &queue;
            let task = &task;
            scope.spawn(move || loop {
                let next = queue
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .pop_front();
                let Some((index, job)) = next else { break };
                let _ = tx.send((index, task(job)));
            });
        }
    });
    drop(tx);

    let mut results: Vec<(usize, R)> = rx.into_iter().collect();
    results.sort_by_key(|(index, _)| *index);
    results.into_iter().map(|(_, result)| result).collect()
}

//! One vcut run: configure, analyze, assemble, report.

use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::Local;
use serde::Serialize;
use tracing::{info, warn};

use vcut_media::fs_utils::ensure_dir;
use vcut_media::silence_removal::{
    analyze_video, remove_silence, AnalysisReport, AudioReadError, FfmpegToolkit, PipelineError,
    PipelineResult, SilenceAnalysis, WriteError,
};
use vcut_media::{MediaError, MediaResult};
use vcut_models::format_seconds;

use crate::cli::Args;
use crate::config::RunConfig;
use crate::output::output_path;

/// What a run produced.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    #[serde(flatten)]
    pub analysis: AnalysisReport,
    /// Written video, absent for dry runs.
    pub output: Option<PathBuf>,
    pub output_duration: f64,
    pub elapsed_secs: f64,
}

impl RunReport {
    fn new(analysis: &SilenceAnalysis, output: Option<PathBuf>, started: Instant) -> Self {
        Self {
            analysis: analysis.report(),
            output,
            output_duration: analysis.intervals.keep_duration(),
            elapsed_secs: started.elapsed().as_secs_f64(),
        }
    }

    /// Human-readable summary lines.
    pub fn summary(&self) -> String {
        let a = &self.analysis;
        let mut lines = vec![
            format!("Input:     {}", a.input.display()),
            format!(
                "Duration:  {} -> {} ({:.1}% kept)",
                format_seconds(a.total_duration),
                format_seconds(self.output_duration),
                a.stats.keep_ratio * 100.0
            ),
            format!(
                "Silence:   {} interval(s), {} removed (threshold {:.1} dB, min {:.2}s)",
                a.silence.len(),
                format_seconds(a.stats.total_cut_secs),
                a.threshold_db,
                a.min_silence_length
            ),
        ];
        match &self.output {
            Some(path) => lines.push(format!("Output:    {}", path.display())),
            None => lines.push("Output:    none (dry run)".to_string()),
        }
        lines.push(format!("Elapsed:   {:.2}s", self.elapsed_secs));
        lines.join("\n")
    }
}

/// Map a toolkit setup failure onto the phase it blocks.
fn toolkit_error(err: MediaError, output_dir: &Path) -> PipelineError {
    if err.is_tool_missing() {
        return AudioReadError::Media(err).into();
    }
    WriteError::Persist {
        path: output_dir.to_path_buf(),
        source: err,
    }
    .into()
}

async fn write_report(path: &Path, report: &RunReport) -> MediaResult<()> {
    let json = serde_json::to_string_pretty(report)?;
    tokio::fs::write(path, json).await?;
    Ok(())
}

/// Write the JSON report, returning whether it landed.
///
/// A report failure never fails the run: the video has already been written.
async fn persist_report(path: &Path, report: &RunReport) -> bool {
    match write_report(path, report).await {
        Ok(()) => {
            info!(report = %path.display(), "Report written");
            true
        }
        Err(e) => {
            warn!(report = %path.display(), error = %e, "Failed to write report");
            false
        }
    }
}

/// Execute a run for `args`.
pub async fn run(args: &Args) -> PipelineResult<RunReport> {
    let started = Instant::now();
    let config = RunConfig::load(args)?;

    info!(
        input = %config.input_path.display(),
        output_dir = %config.output_dir.display(),
        threshold_db = config.removal.effective_threshold_db(),
        min_silence_length = config.removal.min_silence_length,
        chunk_size = config.removal.chunk_size,
        "Starting silence removal"
    );

    let report = if args.dry_run {
        let scratch = std::env::temp_dir();
        let toolkit = FfmpegToolkit::new(config.encoding.clone(), &scratch)
            .map_err(|e| toolkit_error(e, &scratch))?;

        let analysis = analyze_video(&toolkit, &config.input_path, &config.removal).await?;
        if analysis.intervals.is_all_silence() {
            warn!("Entire video is silence; a real run would fail");
        }
        RunReport::new(&analysis, None, started)
    } else {
        ensure_dir(&config.output_dir)
            .await
            .map_err(|source| WriteError::Persist {
                path: config.output_dir.clone(),
                source,
            })?;
        let toolkit = FfmpegToolkit::new(config.encoding.clone(), &config.output_dir)
            .map_err(|e| toolkit_error(e, &config.output_dir))?;

        let output = output_path(&config.input_path, &config.output_dir, Local::now());
        let outcome = remove_silence(&toolkit, &config.input_path, &output, &config.removal).await?;
        RunReport::new(&outcome.analysis, Some(outcome.output.path), started)
    };

    if let Some(path) = &args.report {
        persist_report(path, &report).await;
    }

    Ok(report)
}

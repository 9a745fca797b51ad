//! Runtime configuration settings

use crate::analysis::CeilingPolicy;
use crate::compose::params::{DEFAULT_DURATION, DEFAULT_SECTIONS};
use crate::compose::ComposeParams;
use crate::error::{LightsongError, Result};
use crate::source::{find_data_dir, SegmentFilter, DEFAULT_MIN_SPAN};
use crate::types::ScaleName;
use std::path::PathBuf;

/// Runtime settings for the batch pipeline
#[derive(Debug, Clone)]
pub struct Settings {
    /// Light-curve directory
    pub data_dir: PathBuf,
    /// Output directory
    pub output: PathBuf,
    /// Stars to compose; empty means every star in the data directory
    pub ids: Vec<String>,
    pub scale: ScaleName,
    /// Seconds per section
    pub duration: f64,
    /// Maximum number of sections
    pub sections: usize,
    /// Median filter width
    pub window: usize,
    /// Minimum segment span kept by the loader
    pub min_span: f64,
    pub ceiling: CeilingPolicy,
    /// Number of composition worker threads
    pub threads: usize,
    /// Scan the data directory recursively
    pub recursive: bool,
    /// Recompose even if artifacts exist
    pub force: bool,
    /// Render MIDI files next to the JSON artifacts
    pub write_midi: bool,
    /// Show progress bars
    pub show_progress: bool,
    /// Dry run mode - list stars without composing
    pub dry_run: bool,
}

impl Settings {
    /// Create settings from CLI arguments
    pub fn from_cli(cli: &super::cli::Cli) -> Result<Self> {
        if cli.ids.is_empty() && !cli.all {
            return Err(LightsongError::ConfigError(
                "no star ids given (pass ids or --all)".to_string(),
            ));
        }

        // One core stays free for the MIDI render worker
        let default_threads = num_cpus::get().saturating_sub(1).max(1);

        let settings = Self {
            data_dir: find_data_dir(cli.data.as_deref()),
            output: cli.output.clone(),
            ids: cli.ids.clone(),
            scale: cli.scale.parse()?,
            duration: cli.duration,
            sections: cli.sections,
            window: cli.window,
            min_span: cli.min_span,
            ceiling: if cli.legacy_ceiling {
                CeilingPolicy::Wrap
            } else {
                CeilingPolicy::Clamp
            },
            threads: cli.threads.unwrap_or(default_threads).max(1),
            recursive: cli.recursive,
            force: cli.force,
            write_midi: !cli.no_midi,
            show_progress: !cli.quiet,
            dry_run: cli.dry_run,
        };
        settings.compose_params().validate()?;
        Ok(settings)
    }

    /// Core pipeline parameters derived from these settings
    pub fn compose_params(&self) -> ComposeParams {
        ComposeParams {
            window: self.window,
            duration: self.duration,
            sections: self.sections,
            ceiling: self.ceiling,
            ..ComposeParams::default()
        }
    }

    /// Loader cleaning rules derived from these settings
    pub fn segment_filter(&self) -> SegmentFilter {
        SegmentFilter {
            min_span: self.min_span,
            ..SegmentFilter::default()
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("lightcurves"),
            output: PathBuf::from("./output"),
            ids: Vec::new(),
            scale: ScaleName::JazzMinor,
            duration: DEFAULT_DURATION,
            sections: DEFAULT_SECTIONS,
            window: crate::analysis::DEFAULT_WINDOW,
            min_span: DEFAULT_MIN_SPAN,
            ceiling: CeilingPolicy::default(),
            threads: num_cpus::get().saturating_sub(1).max(1),
            recursive: false,
            force: false,
            write_midi: true,
            show_progress: true,
            dry_run: false,
        }
    }
}

//! CLI argument parsing and configuration

use clap::Parser;
use std::path::PathBuf;

/// lightsong - Turn stellar light curves into music
///
/// Reads photometric light curves, follows each star's brightness with a
/// melody and its transits with percussion, and writes the result as JSON
/// and Standard MIDI files.
#[derive(Parser, Debug)]
#[command(name = "lightsong")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Star ids to compose (see --all)
    #[arg(value_name = "ID")]
    pub ids: Vec<String>,

    /// Compose every star found in the data directory
    #[arg(long, default_value = "false", conflicts_with = "ids")]
    pub all: bool,

    /// Light-curve directory (defaults to $LIGHTSONG_DATA_PATH, then the
    /// platform data directory, then ./lightcurves)
    #[arg(long, value_name = "DIR")]
    pub data: Option<PathBuf>,

    /// Output directory for JSON/MIDI files
    #[arg(short, long, value_name = "DIR", default_value = "./output")]
    pub output: PathBuf,

    /// Musical scale
    #[arg(short, long, value_name = "SCALE", default_value = "jazz_minor")]
    #[arg(value_parser = ["blues", "jazz_minor", "marwa", "pentatonic", "todi"])]
    pub scale: String,

    /// Seconds per section
    #[arg(short, long, value_name = "SECS", default_value = "90")]
    pub duration: f64,

    /// Maximum number of sections
    #[arg(long, value_name = "N", default_value = "4")]
    pub sections: usize,

    /// Median filter width in samples (odd)
    #[arg(long, value_name = "W", default_value = "15")]
    pub window: usize,

    /// Discard light-curve segments spanning less than this many time units
    #[arg(long, value_name = "UNITS", default_value = "70")]
    pub min_span: f64,

    /// Reproduce the legacy quantizer, which maps the loudest values to silence
    #[arg(long, default_value = "false")]
    pub legacy_ceiling: bool,

    /// Number of worker threads (defaults to CPU count - 1)
    #[arg(short = 'j', long, value_name = "N")]
    pub threads: Option<usize>,

    /// Scan the data directory recursively
    #[arg(short, long, default_value = "false")]
    pub recursive: bool,

    /// Recompose stars even if artifacts already exist
    #[arg(long, default_value = "false")]
    pub force: bool,

    /// Skip MIDI rendering (JSON only)
    #[arg(long, default_value = "false")]
    pub no_midi: bool,

    /// Print the available scales and exit
    #[arg(long, default_value = "false")]
    pub list_scales: bool,

    /// Verbose output (can be repeated: -v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (suppress progress bars)
    #[arg(short, long, default_value = "false")]
    pub quiet: bool,

    /// Dry run - show the stars that would be composed without composing
    #[arg(long, default_value = "false")]
    pub dry_run: bool,
}

impl Cli {
    /// Get the log level based on verbosity flags
    pub fn log_level(&self) -> tracing::Level {
        match self.verbose {
            0 => tracing::Level::WARN,
            1 => tracing::Level::INFO,
            2 => tracing::Level::DEBUG,
            _ => tracing::Level::TRACE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::parse_from(["lightsong", "4912991"]);
        assert_eq!(cli.ids, vec!["4912991"]);
        assert_eq!(cli.scale, "jazz_minor");
        assert_eq!(cli.duration, 90.0);
        assert_eq!(cli.sections, 4);
        assert_eq!(cli.window, 15);
        assert_eq!(cli.min_span, 70.0);
        assert!(!cli.legacy_ceiling);
        assert_eq!(cli.log_level(), tracing::Level::WARN);
    }

    #[test]
    fn test_rejects_unknown_scale() {
        assert!(Cli::try_parse_from(["lightsong", "-s", "lydian", "1"]).is_err());
    }

    #[test]
    fn test_all_conflicts_with_ids() {
        assert!(Cli::try_parse_from(["lightsong", "--all", "1"]).is_err());
        assert!(Cli::try_parse_from(["lightsong", "--all"]).is_ok());
    }

    #[test]
    fn test_verbosity() {
        let cli = Cli::parse_from(["lightsong", "-vv", "--all"]);
        assert_eq!(cli.log_level(), tracing::Level::DEBUG);
    }
}

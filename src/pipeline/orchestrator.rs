//! Batch orchestration
//!
//! Resolves which stars to compose, composes them in parallel, and hands
//! finished compositions to a MIDI render worker over a bounded channel.

use crate::cache::{CacheKey, CacheOutcome, DiskStore};
use crate::compose::Sonifier;
use crate::config::Settings;
use crate::error::{LightsongError, Result};
use crate::export;
use crate::source::{DirectorySource, LightCurveSource};
use crate::types::Composition;
use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Pipeline result summary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineResult {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl PipelineResult {
    fn empty() -> Self {
        Self {
            total: 0,
            successful: 0,
            failed: 0,
            skipped: 0,
        }
    }
}

/// Run the full batch pipeline
pub fn run(settings: &Settings) -> Result<PipelineResult> {
    let pipeline_start = Instant::now();

    configure_thread_pool(settings.threads)?;

    let source: Arc<dyn LightCurveSource> = Arc::new(
        DirectorySource::new(&settings.data_dir, settings.segment_filter())
            .with_recursive(settings.recursive),
    );

    let ids = resolve_ids(settings, source.as_ref())?;
    if ids.is_empty() {
        info!("No stars to compose");
        return Ok(PipelineResult::empty());
    }

    let store = Arc::new(DiskStore::new(&settings.output));
    let sonifier = Sonifier::new(source, store.clone(), settings.compose_params())?;

    if settings.dry_run {
        return run_dry_run(&ids, settings, &sonifier, &store);
    }

    let (to_compose, skipped_existing): (Vec<String>, Vec<String>) =
        ids.into_iter().partition(|id| {
            let key = sonifier.key(id, settings.scale, settings.duration);
            if settings.force {
                return true;
            }
            if artifacts_exist(&store, &key, settings.write_midi) {
                debug!("Skipping {} (already composed)", id);
                false
            } else {
                true
            }
        });

    let skipped_existing_count = skipped_existing.len();
    if skipped_existing_count > 0 {
        info!(
            "Skipping {} already-composed stars (use --force to recompose)",
            skipped_existing_count
        );
    }

    let total = to_compose.len() + skipped_existing_count;
    if to_compose.is_empty() {
        info!("All stars already composed, nothing to do");
        return Ok(PipelineResult {
            total,
            successful: 0,
            failed: 0,
            skipped: skipped_existing_count,
        });
    }

    if settings.force {
        debug!("Force mode enabled, discarding cached compositions");
        for id in &to_compose {
            sonifier.invalidate(id, settings.scale, settings.duration)?;
        }
    }

    std::fs::create_dir_all(&settings.output)
        .map_err(|e| LightsongError::output_error(&settings.output, e))?;

    info!("Composing {} stars in {}", to_compose.len(), settings.scale);
    let compose_start = Instant::now();
    let stats = compose_all(&to_compose, &sonifier, &store, settings);
    info!(
        "Composition completed in {:.2}s",
        compose_start.elapsed().as_secs_f64()
    );
    info!(
        "Total pipeline time: {:.2}s",
        pipeline_start.elapsed().as_secs_f64()
    );

    Ok(PipelineResult {
        total,
        successful: stats.successful,
        failed: stats.failed,
        skipped: stats.skipped + skipped_existing_count,
    })
}

/// Explicit ids from the settings, or every star the source lists
fn resolve_ids(settings: &Settings, source: &dyn LightCurveSource) -> Result<Vec<String>> {
    if !settings.ids.is_empty() {
        let mut seen = HashSet::new();
        let ids = settings
            .ids
            .iter()
            .filter(|id| seen.insert(id.as_str()))
            .cloned()
            .collect();
        return Ok(ids);
    }

    info!("Listing light curves in {}", settings.data_dir.display());
    Ok(source.list()?.into_iter().map(|entry| entry.id).collect())
}

fn midi_path(store: &DiskStore, key: &CacheKey) -> PathBuf {
    store.path_for(key).with_extension("mid")
}

fn artifacts_exist(store: &DiskStore, key: &CacheKey, with_midi: bool) -> bool {
    store.contains(key) && (!with_midi || midi_path(store, key).is_file())
}

/// Dry run mode - show stars that would be composed without composing
fn run_dry_run(
    ids: &[String],
    settings: &Settings,
    sonifier: &Sonifier,
    store: &DiskStore,
) -> Result<PipelineResult> {
    println!();
    println!("=== DRY RUN MODE ===");
    println!();
    println!(
        "Scale {}, {} sections of {}s, window {}",
        settings.scale, settings.sections, settings.duration, settings.window
    );
    println!();

    let mut cached = 0;
    for id in ids {
        let key = sonifier.key(id, settings.scale, settings.duration);
        let done = artifacts_exist(store, &key, settings.write_midi);
        if done {
            cached += 1;
        }
        println!(
            "  {:<16} → {}{}",
            id,
            store.path_for(&key).display(),
            if done && !settings.force { "  (cached)" } else { "" }
        );
    }

    println!();
    println!("─────────────────────────────────────────");
    println!();
    let pending = if settings.force { ids.len() } else { ids.len() - cached };
    println!("Would compose {} of {} stars", pending, ids.len());
    if settings.write_midi {
        println!("Would write JSON and MIDI to {}", settings.output.display());
    } else {
        println!("Would write JSON to {}", settings.output.display());
    }
    println!();

    Ok(PipelineResult {
        total: ids.len(),
        successful: 0,
        failed: 0,
        skipped: ids.len(), // All "skipped" in dry run mode
    })
}

/// Configure the Rayon thread pool
fn configure_thread_pool(num_threads: usize) -> Result<()> {
    match rayon::ThreadPoolBuilder::new()
        .num_threads(num_threads)
        .build_global()
    {
        Ok(()) => {
            debug!("Configured thread pool with {} threads", num_threads);
        }
        Err(e) => {
            // Already initialized by an earlier run in this process
            if e.to_string().contains("already been initialized") {
                debug!("Thread pool already initialized, using existing pool");
            } else {
                return Err(LightsongError::ConfigError(format!(
                    "Failed to configure thread pool: {}",
                    e
                )));
            }
        }
    }
    Ok(())
}

struct ComposeStats {
    successful: usize,
    failed: usize,
    skipped: usize,
}

/// Job for the MIDI render worker
struct RenderJob {
    id: String,
    composition: Arc<Composition>,
    path: PathBuf,
}

/// Render failure reported back by the worker
struct RenderFailure {
    id: String,
    error: LightsongError,
}

/// Compose stars in parallel, rendering MIDI on a dedicated worker
fn compose_all(
    ids: &[String],
    sonifier: &Sonifier,
    store: &DiskStore,
    settings: &Settings,
) -> ComposeStats {
    // Small queue: composers block when rendering falls behind
    const RENDER_CHANNEL_CAPACITY: usize = 4;
    const RENDER_SEND_TIMEOUT: Duration = Duration::from_secs(30);

    let (render_tx, render_handle, failure_rx) = if settings.write_midi {
        let (tx, rx) = bounded::<RenderJob>(RENDER_CHANNEL_CAPACITY);
        // Unbounded so the worker never blocks on send while we wait on join()
        let (failure_tx, failure_rx) = unbounded::<RenderFailure>();
        let handle = thread::spawn(move || render_worker(rx, failure_tx));
        (Some(tx), Some(handle), Some(failure_rx))
    } else {
        (None, None, None)
    };

    let progress_bar = if settings.show_progress {
        let pb = ProgressBar::new(ids.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=>-"),
        );
        Some(pb)
    } else {
        None
    };

    let successful = AtomicUsize::new(0);
    let failed = AtomicUsize::new(0);
    let skipped = AtomicUsize::new(0);

    ids.par_iter().for_each(|id| {
        match sonifier.compose(id, settings.scale, settings.duration) {
            Ok((composition, outcome)) => {
                if outcome == CacheOutcome::Hit {
                    debug!("{} was already composed, re-rendering outputs", id);
                }
                if let Some(ref tx) = render_tx {
                    let key = sonifier.key(id, settings.scale, settings.duration);
                    let job = RenderJob {
                        id: id.clone(),
                        composition,
                        path: midi_path(store, &key),
                    };
                    match tx.send_timeout(job, RENDER_SEND_TIMEOUT) {
                        Ok(()) => {}
                        Err(crossbeam_channel::SendTimeoutError::Timeout(_)) => {
                            warn!(
                                "Render queue blocked for {}s, skipping MIDI for {}",
                                RENDER_SEND_TIMEOUT.as_secs(),
                                id
                            );
                        }
                        Err(crossbeam_channel::SendTimeoutError::Disconnected(_)) => {
                            debug!("Render channel closed, skipping MIDI for {}", id);
                        }
                    }
                }
                successful.fetch_add(1, Ordering::Relaxed);
                if let Some(ref pb) = progress_bar {
                    pb.set_message(id.clone());
                }
            }
            Err(e) => {
                if e.is_recoverable() {
                    warn!("Skipping {}: {}", id, e);
                    skipped.fetch_add(1, Ordering::Relaxed);
                } else {
                    error!("Failed {}: {}", id, e);
                    failed.fetch_add(1, Ordering::Relaxed);
                }
            }
        }
        if let Some(ref pb) = progress_bar {
            pb.inc(1);
        }
    });

    if let Some(pb) = progress_bar {
        pb.finish_with_message("Composition complete");
    }

    // Closing the job channel lets the worker drain and exit
    drop(render_tx);

    if let Some(handle) = render_handle {
        match handle.join() {
            Ok(()) => debug!("Render worker completed"),
            Err(panic_info) => {
                let panic_msg = if let Some(s) = panic_info.downcast_ref::<&str>() {
                    s.to_string()
                } else if let Some(s) = panic_info.downcast_ref::<String>() {
                    s.clone()
                } else {
                    "unknown panic".to_string()
                };
                error!(
                    "Render worker panicked: {}. Some MIDI files may be missing.",
                    panic_msg
                );
            }
        }
    }

    let mut stats = ComposeStats {
        successful: successful.load(Ordering::Relaxed),
        failed: failed.load(Ordering::Relaxed),
        skipped: skipped.load(Ordering::Relaxed),
    };

    if let Some(failure_rx) = failure_rx {
        for failure in failure_rx {
            error!("Failed to render {}: {}", failure.id, failure.error);
            stats.successful = stats.successful.saturating_sub(1);
            stats.failed += 1;
        }
    }

    stats
}

/// Worker thread writing MIDI files
fn render_worker(rx: Receiver<RenderJob>, failures: Sender<RenderFailure>) {
    for job in rx {
        debug!("Rendering MIDI for {}", job.id);
        match export::write_midi(&job.composition, &job.path) {
            Ok(()) => info!("Wrote {}", job.path.display()),
            Err(error) => {
                if failures.send(RenderFailure { id: job.id, error }).is_err() {
                    // Receiver dropped, we're shutting down
                    break;
                }
            }
        }
    }
}

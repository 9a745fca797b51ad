//! Light curves stored as JSON documents on disk
//!
//! One document per object:
//!
//! ```json
//! { "id": "4912991", "name": "K00123.01",
//!   "segments": [ { "time": [131.5, 131.52, null], "flux": [1.2e4, 1.21e4, 1.19e4] } ] }
//! ```
//!
//! `null` marks a missing (non-finite) sample.

use super::{LightCurveSource, SegmentFilter, StarEntry};
use crate::error::{LightsongError, Result};
use crate::types::LightCurveSegment;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Environment variable naming the light-curve directory
pub const DATA_PATH_ENV: &str = "LIGHTSONG_DATA_PATH";

/// On-disk light-curve document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LightCurveFile {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub segments: Vec<RawSegment>,
}

/// Uncleaned samples as stored; `None` is a missing value
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawSegment {
    pub time: Vec<Option<f64>>,
    pub flux: Vec<Option<f64>>,
}

/// Just the identifying fields, for catalog listing
#[derive(Debug, Deserialize)]
struct StarHeader {
    id: String,
    #[serde(default)]
    name: Option<String>,
}

/// Reads `*.json` light-curve documents below a root directory
#[derive(Debug, Clone)]
pub struct DirectorySource {
    root: PathBuf,
    recursive: bool,
    filter: SegmentFilter,
}

impl DirectorySource {
    pub fn new(root: impl Into<PathBuf>, filter: SegmentFilter) -> Self {
        Self {
            root: root.into(),
            recursive: true,
            filter,
        }
    }

    pub fn with_recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Every JSON document below the root
    fn documents(&self) -> Result<Vec<PathBuf>> {
        if !self.root.is_dir() {
            return Err(LightsongError::ConfigError(format!(
                "light-curve directory does not exist: {}",
                self.root.display()
            )));
        }

        let walker = if self.recursive {
            WalkDir::new(&self.root)
        } else {
            WalkDir::new(&self.root).max_depth(1)
        };

        let mut paths: Vec<PathBuf> = walker
            .into_iter()
            .filter_map(|e| e.ok())
            .map(|e| e.into_path())
            .filter(|p| p.is_file() && p.extension().and_then(|e| e.to_str()) == Some("json"))
            .collect();
        paths.sort();
        Ok(paths)
    }

    /// Locate the document for `id`: `<root>/<id>.json` first, then a scan
    fn locate(&self, id: &str) -> Result<PathBuf> {
        let direct = self.root.join(format!("{}.json", id));
        if direct.is_file() {
            return Ok(direct);
        }

        for path in self.documents()? {
            match read_header(&path) {
                Ok(header) if header.id == id => return Ok(path),
                Ok(_) => {}
                Err(e) => debug!("Ignoring {}: {}", path.display(), e),
            }
        }
        Err(LightsongError::StarNotFound(id.to_string()))
    }
}

fn read_header(path: &Path) -> std::result::Result<StarHeader, String> {
    let file = File::open(path).map_err(|e| e.to_string())?;
    serde_json::from_reader(BufReader::new(file)).map_err(|e| e.to_string())
}

fn nan_for_missing(values: &[Option<f64>]) -> Vec<f64> {
    values.iter().map(|v| v.unwrap_or(f64::NAN)).collect()
}

impl LightCurveSource for DirectorySource {
    fn load(&self, id: &str) -> Result<Vec<LightCurveSegment>> {
        let path = self.locate(id)?;
        let file = File::open(&path).map_err(|e| LightsongError::source_error(id, e.to_string()))?;
        let doc: LightCurveFile = serde_json::from_reader(BufReader::new(file))
            .map_err(|e| LightsongError::source_error(id, format!("{}: {}", path.display(), e)))?;

        let total = doc.segments.len();
        let segments: Vec<LightCurveSegment> = doc
            .segments
            .iter()
            .enumerate()
            .filter_map(|(i, raw)| {
                if raw.time.len() != raw.flux.len() {
                    warn!(
                        "{}: segment {} has {} times but {} fluxes, skipping",
                        id,
                        i,
                        raw.time.len(),
                        raw.flux.len()
                    );
                    return None;
                }
                self.filter
                    .clean(&nan_for_missing(&raw.time), &nan_for_missing(&raw.flux))
            })
            .collect();

        info!(
            "Loaded {} of {} segments for {} from {}",
            segments.len(),
            total,
            id,
            path.display()
        );
        Ok(segments)
    }

    fn list(&self) -> Result<Vec<StarEntry>> {
        let mut entries = Vec::new();
        for path in self.documents()? {
            match read_header(&path) {
                Ok(header) => entries.push(StarEntry {
                    id: header.id,
                    name: header.name,
                }),
                Err(e) => warn!("Skipping unreadable light curve {}: {}", path.display(), e),
            }
        }

        info!("Found {} light curves in {}", entries.len(), self.root.display());
        if entries.is_empty() {
            warn!("No light curves found in {}", self.root.display());
        }
        Ok(entries)
    }

    fn name(&self) -> &'static str {
        "directory"
    }
}

/// Resolve the light-curve directory
///
/// Search order:
/// 1. Explicit path (the `--data` option)
/// 2. LIGHTSONG_DATA_PATH environment variable
/// 3. ProjectDirs data: ~/.local/share/lightsong/lightcurves (Linux XDG)
/// 4. Current directory: ./lightcurves
pub fn find_data_dir(explicit: Option<&Path>) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }

    if let Some(env_path) = std::env::var_os(DATA_PATH_ENV).map(PathBuf::from) {
        if env_path.is_dir() {
            return env_path;
        }
        warn!("{}={} is not a directory, ignoring", DATA_PATH_ENV, env_path.display());
    }

    if let Some(dirs) = ProjectDirs::from("org", "lightsong", "lightsong") {
        let data_path = dirs.data_dir().join("lightcurves");
        if data_path.is_dir() {
            return data_path;
        }
    }

    PathBuf::from("lightcurves")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_doc(dir: &Path, file: &str, id: &str, segments: usize) {
        let doc = LightCurveFile {
            id: id.to_string(),
            name: Some(format!("KOI-{}", id)),
            segments: (0..segments)
                .map(|s| {
                    let time = (0..200).map(|i| Some(s as f64 * 100.0 + i as f64 * 0.5)).collect();
                    let mut flux: Vec<Option<f64>> =
                        (0..200).map(|i| Some(1000.0 + (i as f64 / 7.0).sin())).collect();
                    flux[17] = None;
                    RawSegment { time, flux }
                })
                .collect(),
        };
        std::fs::write(dir.join(file), serde_json::to_string(&doc).unwrap()).unwrap();
    }

    #[test]
    fn test_load_by_file_stem() {
        let dir = TempDir::new().unwrap();
        write_doc(dir.path(), "4912991.json", "4912991", 3);

        let source = DirectorySource::new(dir.path(), SegmentFilter::default());
        let segments = source.load("4912991").unwrap();
        assert_eq!(segments.len(), 3);
        assert!(segments.iter().all(|s| s.len() == 199));
    }

    #[test]
    fn test_load_by_document_id() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        write_doc(&dir.path().join("nested"), "star.json", "12351927", 1);

        let source = DirectorySource::new(dir.path(), SegmentFilter::default());
        assert_eq!(source.load("12351927").unwrap().len(), 1);

        let flat = source.clone().with_recursive(false);
        assert!(matches!(flat.load("12351927"), Err(LightsongError::StarNotFound(_))));
    }

    #[test]
    fn test_missing_star() {
        let dir = TempDir::new().unwrap();
        let source = DirectorySource::new(dir.path(), SegmentFilter::default());
        let err = source.load("nope").unwrap_err();
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_corrupt_document() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("bad.json"), "{ not json").unwrap();
        let source = DirectorySource::new(dir.path(), SegmentFilter::default());
        assert!(matches!(source.load("bad"), Err(LightsongError::SourceError { .. })));
        assert!(source.list().unwrap().is_empty());
    }

    #[test]
    fn test_list() {
        let dir = TempDir::new().unwrap();
        write_doc(dir.path(), "a.json", "6805414", 1);
        write_doc(dir.path(), "b.json", "3644071", 1);
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let source = DirectorySource::new(dir.path(), SegmentFilter::default());
        let ids: Vec<String> = source.list().unwrap().into_iter().map(|e| e.id).collect();
        assert_eq!(ids, vec!["6805414", "3644071"]);
    }

    #[test]
    fn test_explicit_data_dir_wins() {
        let dir = TempDir::new().unwrap();
        assert_eq!(find_data_dir(Some(dir.path())), dir.path());
    }
}

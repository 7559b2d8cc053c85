//! Named, frame-indexed store of encoded face frames.
//!
//! Entries are loaded from a directory of per-animation folders or appended at
//! runtime. One reserved entry, [`PROCEDURAL_ANIMATION_NAME`], always exists and
//! receives frames generated while the robot is running.

use std::fs;
use std::path::Path;
use std::time::SystemTime;

use hashbrown::HashMap;

use crate::bitmap::{FaceBitmap, DEFAULT_THRESHOLD};
use crate::codec::{encode, RleFrame};
use crate::error::FaceError;

/// Reserved entry for runtime-streamed imagery.
pub const PROCEDURAL_ANIMATION_NAME: &str = "_PROCEDURAL_";

/// Highest frame number accepted from a file name. Gaps below it are padded
/// with blank frames, so larger numbers are skipped.
pub const MAX_FRAME_NUMBER: usize = 10_000;

#[derive(Clone, Debug, Default)]
struct FaceEntry {
    frames: Vec<RleFrame>,
    last_loaded: Option<SystemTime>,
}

#[derive(Debug)]
pub struct FaceAssetStore {
    entries: HashMap<String, FaceEntry>,
}

impl Default for FaceAssetStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Frame number embedded in `<name>_<N>.<ext>`: the digits between the last `_`
/// and the last `.`.
pub fn parse_frame_number(file_name: &str) -> Option<usize> {
    let underscore = file_name.rfind('_')?;
    let dot = file_name.rfind('.')?;
    if dot <= underscore + 1 {
        return None;
    }
    file_name[underscore + 1..dot].parse().ok()
}

fn io_error(path: &Path, e: std::io::Error) -> FaceError {
    FaceError::Io {
        path: path.to_path_buf(),
        reason: e.to_string(),
    }
}

fn load_frame(path: &Path) -> Result<RleFrame, FaceError> {
    let img = image::open(path)
        .map_err(|e| FaceError::Image {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?
        .to_luma8();
    let bitmap = FaceBitmap::from_luma(
        img.width() as usize,
        img.height() as usize,
        img.as_raw(),
        DEFAULT_THRESHOLD,
    )?;
    Ok(encode(&bitmap))
}

impl FaceAssetStore {
    pub fn new() -> Self {
        let mut entries = HashMap::new();
        entries.insert(PROCEDURAL_ANIMATION_NAME.to_string(), FaceEntry::default());
        Self { entries }
    }

    /// Scan `dir` for per-animation folders and (re)load every folder whose
    /// modification time is newer than its last load. Returns the number of
    /// entries loaded.
    pub fn read_directory(&mut self, dir: impl AsRef<Path>) -> Result<usize, FaceError> {
        let dir = dir.as_ref();
        let mut loaded = 0;
        for entry in fs::read_dir(dir).map_err(|e| io_error(dir, e))? {
            let entry = entry.map_err(|e| io_error(dir, e))?;
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }
            let Some(name) = path.file_name().and_then(|n| n.to_str()).map(str::to_owned) else {
                continue;
            };
            if name == PROCEDURAL_ANIMATION_NAME {
                let err = FaceError::ReservedName { name };
                log::error!("FaceAssetStore.ReadDirectory: {err}, skipping {}", path.display());
                continue;
            }

            let modified = entry
                .metadata()
                .and_then(|m| m.modified())
                .map_err(|e| io_error(&path, e))?;
            if let Some(last) = self.entries.get(&name).and_then(|e| e.last_loaded) {
                if modified <= last {
                    log::debug!("FaceAssetStore.ReadDirectory: '{name}' unchanged, skipping");
                    continue;
                }
            }

            let frames = Self::load_folder(&path)?;
            log::debug!(
                "FaceAssetStore.ReadDirectory: loaded '{name}' with {} frames",
                frames.len()
            );
            self.entries.insert(
                name,
                FaceEntry {
                    frames,
                    last_loaded: Some(modified),
                },
            );
            loaded += 1;
        }
        Ok(loaded)
    }

    fn load_folder(path: &Path) -> Result<Vec<RleFrame>, FaceError> {
        let mut numbered: Vec<(usize, RleFrame)> = Vec::new();
        for file in fs::read_dir(path).map_err(|e| io_error(path, e))? {
            let file_path = file.map_err(|e| io_error(path, e))?.path();
            if !file_path.is_file() {
                continue;
            }
            let file_name = file_path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or_default();
            let number = match parse_frame_number(file_name) {
                Some(n) if n > MAX_FRAME_NUMBER => {
                    log::warn!(
                        "FaceAssetStore.LoadFolder: frame number {n} in '{}' exceeds {MAX_FRAME_NUMBER}, skipping",
                        file_path.display()
                    );
                    continue;
                }
                Some(n) if n > 0 => n,
                _ => {
                    log::warn!(
                        "FaceAssetStore.LoadFolder: no frame number in '{}', skipping",
                        file_path.display()
                    );
                    continue;
                }
            };
            match load_frame(&file_path) {
                Ok(frame) => numbered.push((number, frame)),
                Err(e) => log::warn!("FaceAssetStore.LoadFolder: {e}"),
            }
        }

        let count = numbered.iter().map(|(n, _)| *n).max().unwrap_or(0);
        let empty = encode(&FaceBitmap::blank());
        let mut frames = vec![empty; count];
        for (number, frame) in numbered {
            frames[number - 1] = frame;
        }
        Ok(frames)
    }

    /// Append an already-encoded frame, creating the entry if needed.
    pub fn add_frame(&mut self, name: &str, frame: RleFrame) {
        self.entries
            .entry(name.to_string())
            .or_default()
            .frames
            .push(frame);
    }

    pub fn add_image(&mut self, name: &str, bitmap: &FaceBitmap) {
        self.add_frame(name, encode(bitmap));
    }

    pub fn add_procedural_image(&mut self, bitmap: &FaceBitmap) {
        self.add_image(PROCEDURAL_ANIMATION_NAME, bitmap);
    }

    /// Drop all frames of one entry. The entry itself stays known.
    pub fn clear_animation(&mut self, name: &str) {
        if let Some(entry) = self.entries.get_mut(name) {
            entry.frames.clear();
        }
    }

    /// Drop every entry except the (now empty) reserved one.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.entries
            .insert(PROCEDURAL_ANIMATION_NAME.to_string(), FaceEntry::default());
    }

    #[inline]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Zero for unknown names.
    pub fn num_frames(&self, name: &str) -> usize {
        self.entries.get(name).map_or(0, |e| e.frames.len())
    }

    pub fn frame(&self, name: &str, index: usize) -> Option<&RleFrame> {
        self.entries.get(name)?.frames.get(index)
    }

    pub fn decode_frame(&self, name: &str, index: usize) -> Option<FaceBitmap> {
        self.frame(name, index).map(RleFrame::decode)
    }

    pub fn last_loaded(&self, name: &str) -> Option<SystemTime> {
        self.entries.get(name)?.last_loaded
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

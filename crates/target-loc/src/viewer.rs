//! Optional display of annotated frames.

use std::path::{Path, PathBuf};

use crate::Frame;

pub trait FrameViewer {
    fn show(&mut self, frame: &Frame);

    /// Tear down whatever `show` created. Safe to call repeatedly.
    fn close(&mut self);
}

/// Overwrites a PNG with the latest annotated frame.
pub struct SnapshotViewer {
    path: PathBuf,
    written: bool,
}

impl SnapshotViewer {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            written: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl FrameViewer for SnapshotViewer {
    fn show(&mut self, frame: &Frame) {
        match frame.image().save(&self.path) {
            Ok(()) => self.written = true,
            Err(err) => log::warn!("cannot write snapshot {}: {err}", self.path.display()),
        }
    }

    fn close(&mut self) {
        if !self.written {
            return;
        }
        self.written = false;
        if let Err(err) = std::fs::remove_file(&self.path) {
            log::debug!("cannot remove snapshot {}: {err}", self.path.display());
        }
    }
}

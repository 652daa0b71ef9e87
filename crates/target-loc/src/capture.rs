//! Capture backends and the open/close lifecycle that follows the mode.

use std::path::{Path, PathBuf};

use crate::config::SourceConfig;
use crate::{CaptureError, Frame};

/// An open capture device. Dropping it releases the device.
pub trait FrameSource {
    fn grab(&mut self) -> Result<Frame, CaptureError>;
}

/// Something that can open a [`FrameSource`].
pub trait CaptureBackend {
    type Source: FrameSource;

    fn open(&mut self) -> Result<Self::Source, CaptureError>;

    /// Human-readable description for logs.
    fn describe(&self) -> String;
}

/// Owns the capture handle and opens or releases it on demand.
pub struct CaptureManager<B: CaptureBackend> {
    backend: B,
    source: Option<B::Source>,
    open_count: u64,
}

impl<B: CaptureBackend> CaptureManager<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            source: None,
            open_count: 0,
        }
    }

    /// Open the device now and report why if it cannot be opened.
    pub fn probe(&mut self) -> Result<(), CaptureError> {
        if self.source.is_none() {
            let source = self.backend.open()?;
            self.install(source);
        }
        Ok(())
    }

    /// Make sure the device is open; `false` if opening failed.
    pub fn ensure_open(&mut self) -> bool {
        if self.source.is_some() {
            return true;
        }
        match self.backend.open() {
            Ok(source) => {
                self.install(source);
                true
            }
            Err(err) => {
                log::warn!("cannot open {}: {err}", self.backend.describe());
                false
            }
        }
    }

    /// Release the device if it is open.
    pub fn ensure_closed(&mut self) {
        if self.source.take().is_some() {
            log::info!("released {}", self.backend.describe());
        }
    }

    pub fn is_open(&self) -> bool {
        self.source.is_some()
    }

    /// Number of successful opens so far.
    pub fn open_count(&self) -> u64 {
        self.open_count
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Open if needed and read one frame.
    ///
    /// A failed read drops the handle so a later call reopens the device.
    pub fn grab(&mut self) -> Option<Frame> {
        if !self.ensure_open() {
            return None;
        }
        let source = self.source.as_mut()?;
        match source.grab() {
            Ok(frame) => Some(frame),
            Err(err) => {
                log::warn!("frame grab from {} failed: {err}", self.backend.describe());
                self.source = None;
                None
            }
        }
    }

    fn install(&mut self, source: B::Source) {
        self.source = Some(source);
        self.open_count += 1;
        log::info!("opened {}", self.backend.describe());
    }
}

/// Replays the PNG/JPEG files of a directory in name order, looping.
#[derive(Clone, Debug)]
pub struct ImageSequenceBackend {
    dir: PathBuf,
}

impl ImageSequenceBackend {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

fn is_frame_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| matches!(e.to_ascii_lowercase().as_str(), "png" | "jpg" | "jpeg"))
        .unwrap_or(false)
}

impl CaptureBackend for ImageSequenceBackend {
    type Source = ImageSequence;

    fn open(&mut self) -> Result<ImageSequence, CaptureError> {
        let io_err = |source: std::io::Error| CaptureError::Io {
            path: self.dir.clone(),
            source,
        };
        let mut paths = Vec::new();
        for entry in std::fs::read_dir(&self.dir).map_err(io_err)? {
            let path = entry.map_err(io_err)?.path();
            if path.is_file() && is_frame_file(&path) {
                paths.push(path);
            }
        }
        if paths.is_empty() {
            return Err(CaptureError::NoFrames(self.dir.clone()));
        }
        paths.sort();
        log::debug!("{} frames in {}", paths.len(), self.dir.display());
        Ok(ImageSequence { paths, next: 0 })
    }

    fn describe(&self) -> String {
        format!("frame directory {}", self.dir.display())
    }
}

#[derive(Debug)]
pub struct ImageSequence {
    paths: Vec<PathBuf>,
    next: usize,
}

impl FrameSource for ImageSequence {
    fn grab(&mut self) -> Result<Frame, CaptureError> {
        let path = &self.paths[self.next % self.paths.len()];
        self.next = (self.next + 1) % self.paths.len();
        let img = image::open(path).map_err(|source| CaptureError::Decode {
            path: path.clone(),
            source,
        })?;
        Ok(Frame::new(img.to_rgb8()))
    }
}

#[cfg(feature = "opencv")]
pub use self::camera::{OpenCvCamera, OpenCvStream};

#[cfg(feature = "opencv")]
mod camera {
    use image::RgbImage;
    use opencv::{core::Mat, imgproc, prelude::*, videoio};

    use super::{CaptureBackend, FrameSource};
    use crate::{CaptureError, Frame};

    fn device_err(e: opencv::Error) -> CaptureError {
        CaptureError::Device(e.to_string())
    }

    /// A V4L/DirectShow/AVFoundation camera opened through OpenCV.
    #[derive(Clone, Debug)]
    pub struct OpenCvCamera {
        index: i32,
    }

    impl OpenCvCamera {
        pub fn new(index: i32) -> Self {
            Self { index }
        }
    }

    impl CaptureBackend for OpenCvCamera {
        type Source = OpenCvStream;

        fn open(&mut self) -> Result<OpenCvStream, CaptureError> {
            let cap = videoio::VideoCapture::new(self.index, videoio::CAP_ANY).map_err(device_err)?;
            if !cap.is_opened().map_err(device_err)? {
                return Err(CaptureError::Device(format!(
                    "camera {} is not available",
                    self.index
                )));
            }
            Ok(OpenCvStream {
                cap,
                bgr: Mat::default(),
                rgb: Mat::default(),
            })
        }

        fn describe(&self) -> String {
            format!("camera {}", self.index)
        }
    }

    pub struct OpenCvStream {
        cap: videoio::VideoCapture,
        bgr: Mat,
        rgb: Mat,
    }

    impl FrameSource for OpenCvStream {
        fn grab(&mut self) -> Result<Frame, CaptureError> {
            if !self.cap.read(&mut self.bgr).map_err(device_err)? || self.bgr.rows() <= 0 {
                return Err(CaptureError::Device("camera returned no frame".into()));
            }
            imgproc::cvt_color_def(&self.bgr, &mut self.rgb, imgproc::COLOR_BGR2RGB)
                .map_err(device_err)?;
            let size = self.rgb.size().map_err(device_err)?;
            let data = self.rgb.data_bytes().map_err(device_err)?.to_vec();
            RgbImage::from_raw(size.width as u32, size.height as u32, data)
                .map(Frame::new)
                .ok_or_else(|| CaptureError::Device("unexpected frame layout".into()))
        }
    }

    impl Drop for OpenCvStream {
        fn drop(&mut self) {
            let _ = self.cap.release();
        }
    }
}

/// The backend selected by [`SourceConfig`].
pub enum SourceBackend {
    Frames(ImageSequenceBackend),
    #[cfg(feature = "opencv")]
    Camera(OpenCvCamera),
}

pub enum SourceStream {
    Frames(ImageSequence),
    #[cfg(feature = "opencv")]
    Camera(OpenCvStream),
}

impl SourceBackend {
    pub fn from_config(source: &SourceConfig) -> Result<Self, CaptureError> {
        match source {
            SourceConfig::Frames { dir } => Ok(Self::Frames(ImageSequenceBackend::new(dir))),
            #[cfg(feature = "opencv")]
            SourceConfig::Device { index } => Ok(Self::Camera(OpenCvCamera::new(*index))),
            #[cfg(not(feature = "opencv"))]
            SourceConfig::Device { index } => Err(CaptureError::Unsupported(format!(
                "camera {index} requested but target-loc was built without the `opencv` feature; \
                 use a frame directory instead"
            ))),
        }
    }
}

impl CaptureBackend for SourceBackend {
    type Source = SourceStream;

    fn open(&mut self) -> Result<SourceStream, CaptureError> {
        match self {
            Self::Frames(b) => b.open().map(SourceStream::Frames),
            #[cfg(feature = "opencv")]
            Self::Camera(b) => b.open().map(SourceStream::Camera),
        }
    }

    fn describe(&self) -> String {
        match self {
            Self::Frames(b) => b.describe(),
            #[cfg(feature = "opencv")]
            Self::Camera(b) => b.describe(),
        }
    }
}

impl FrameSource for SourceStream {
    fn grab(&mut self) -> Result<Frame, CaptureError> {
        match self {
            Self::Frames(s) => s.grab(),
            #[cfg(feature = "opencv")]
            Self::Camera(s) => s.grab(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn write_frame(dir: &Path, name: &str, value: u8) {
        RgbImage::from_pixel(4, 3, Rgb([value, 0, 0]))
            .save(dir.join(name))
            .expect("save");
    }

    #[test]
    fn sequence_replays_in_name_order_and_loops() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_frame(dir.path(), "b.png", 20);
        write_frame(dir.path(), "a.png", 10);
        std::fs::write(dir.path().join("notes.txt"), "x").expect("write");

        let mut mgr = CaptureManager::new(ImageSequenceBackend::new(dir.path()));
        let reds: Vec<u8> = (0..3)
            .map(|_| mgr.grab().expect("frame").image().get_pixel(0, 0).0[0])
            .collect();
        assert_eq!(reds, vec![10, 20, 10]);
        assert_eq!(mgr.open_count(), 1);
    }

    #[test]
    fn open_close_is_idempotent() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_frame(dir.path(), "0.png", 1);
        let mut mgr = CaptureManager::new(ImageSequenceBackend::new(dir.path()));

        assert!(mgr.ensure_open());
        assert!(mgr.ensure_open());
        assert_eq!(mgr.open_count(), 1);
        mgr.ensure_closed();
        mgr.ensure_closed();
        assert!(!mgr.is_open());
        assert!(mgr.ensure_open());
        assert_eq!(mgr.open_count(), 2);
    }

    #[test]
    fn missing_or_empty_directory_fails_to_open() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut empty = CaptureManager::new(ImageSequenceBackend::new(dir.path()));
        assert!(matches!(empty.probe(), Err(CaptureError::NoFrames(_))));
        assert!(!empty.ensure_open());
        assert!(empty.grab().is_none());

        let mut missing = CaptureManager::new(ImageSequenceBackend::new(dir.path().join("nope")));
        assert!(matches!(missing.probe(), Err(CaptureError::Io { .. })));
    }

    #[cfg(not(feature = "opencv"))]
    #[test]
    fn device_source_needs_opencv() {
        let err = SourceBackend::from_config(&SourceConfig::Device { index: 0 })
            .err()
            .expect("unsupported");
        assert!(err.to_string().contains("opencv"));
    }
}

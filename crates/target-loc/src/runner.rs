//! The fixed-rate detection loop.

use std::thread;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use crate::capture::{CaptureBackend, CaptureManager};
use crate::detector::{TargetDetector, TargetKind};
use crate::error::ConfigError;
use crate::mode::{DetectionMode, ModeReader};
use crate::pose::{PoseEstimator, TargetPose};
use crate::publish::Publisher;
use crate::viewer::FrameViewer;

/// Best-effort periodic scheduler.
#[derive(Debug)]
pub struct Rate {
    period: Duration,
    next: Instant,
}

impl Rate {
    /// Tick period for `hz`, or `None` when the rate cannot be scheduled.
    pub fn period_for(hz: f64) -> Option<Duration> {
        if !(hz.is_finite() && hz > 0.0) {
            return None;
        }
        let period = Duration::try_from_secs_f64(hz.recip()).ok()?;
        // The deadline may run up to two periods ahead of the clock.
        Instant::now().checked_add(period.checked_mul(2)?)?;
        Some(period)
    }

    pub fn new(hz: f64) -> Result<Self, ConfigError> {
        let invalid = || ConfigError::Invalid(format!("rate_hz {hz} has no usable tick period"));
        let period = Self::period_for(hz).ok_or_else(invalid)?;
        let next = Instant::now().checked_add(period).ok_or_else(invalid)?;
        Ok(Self { period, next })
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Sleep until the next deadline. After an overrun the schedule restarts
    /// from now instead of bursting to catch up.
    pub fn sleep(&mut self) {
        let now = Instant::now();
        if self.next > now {
            thread::sleep(self.next - now);
            self.next += self.period;
        } else {
            log::trace!("tick overran by {:?}", now - self.next);
            self.next = now + self.period;
        }
    }
}

/// What one tick did.
#[derive(Clone, Debug, PartialEq)]
pub struct TickReport {
    pub mode: DetectionMode,
    /// Published pose; `None` when idle or when no frame could be read.
    pub pose: Option<TargetPose>,
}

fn unix_stamp() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

pub struct DetectionLoop<B: CaptureBackend, P: Publisher> {
    mode: ModeReader,
    capture: CaptureManager<B>,
    circle: Box<dyn TargetDetector>,
    fiducial: Box<dyn TargetDetector>,
    estimator: PoseEstimator,
    publisher: P,
    viewer: Option<Box<dyn FrameViewer>>,
    last_mode: DetectionMode,
}

impl<B: CaptureBackend, P: Publisher> DetectionLoop<B, P> {
    pub fn new(
        mode: ModeReader,
        capture: CaptureManager<B>,
        circle: Box<dyn TargetDetector>,
        fiducial: Box<dyn TargetDetector>,
        estimator: PoseEstimator,
        publisher: P,
    ) -> Self {
        Self {
            mode,
            capture,
            circle,
            fiducial,
            estimator,
            publisher,
            viewer: None,
            last_mode: DetectionMode::None,
        }
    }

    pub fn with_viewer(mut self, viewer: Box<dyn FrameViewer>) -> Self {
        self.viewer = Some(viewer);
        self
    }

    pub fn publisher(&self) -> &P {
        &self.publisher
    }

    pub fn capture(&self) -> &CaptureManager<B> {
        &self.capture
    }

    /// Run one iteration for the currently commanded mode.
    #[cfg_attr(feature = "tracing", tracing::instrument(level = "debug", skip(self)))]
    pub fn tick(&mut self) -> TickReport {
        let mode = self.mode.current_mode();
        if mode != self.last_mode {
            log::info!("detection mode {} -> {}", self.last_mode, mode);
            self.last_mode = mode;
        }

        let pose = match mode {
            DetectionMode::None => {
                self.capture.ensure_closed();
                if let Some(viewer) = self.viewer.as_mut() {
                    viewer.close();
                }
                None
            }
            DetectionMode::Circle => self.locate(TargetKind::Circle),
            DetectionMode::Fiducial => self.locate(TargetKind::Fiducial),
        };

        if let Some(pose) = &pose {
            self.publisher.publish_pose(pose);
        }
        self.publisher.publish_mode(mode);
        TickReport { mode, pose }
    }

    fn locate(&mut self, kind: TargetKind) -> Option<TargetPose> {
        let mut frame = self.capture.grab()?;
        let detector = match kind {
            TargetKind::Circle => &mut self.circle,
            TargetKind::Fiducial => &mut self.fiducial,
        };
        let detection = detector.detect(&frame);
        let pose = self
            .estimator
            .estimate(kind, detection.as_ref(), unix_stamp());

        if let Some(viewer) = self.viewer.as_mut() {
            if let Some(det) = &detection {
                detector.annotate(&mut frame, det);
            }
            viewer.show(&frame);
        }
        Some(pose)
    }

    /// Tick at `rate` until `max_ticks` have run (forever when `None`).
    /// Returns the number of ticks.
    pub fn run(&mut self, rate: &mut Rate, max_ticks: Option<u64>) -> u64 {
        let mut ticks = 0u64;
        loop {
            self.tick();
            ticks += 1;
            if max_ticks.is_some_and(|max| ticks >= max) {
                return ticks;
            }
            rate.sleep();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_keeps_schedule_and_recovers_from_overrun() {
        let mut rate = Rate::new(200.0).expect("rate");
        assert_eq!(rate.period(), Duration::from_millis(5));

        let start = Instant::now();
        rate.sleep();
        rate.sleep();
        assert!(start.elapsed() >= Duration::from_millis(9));

        thread::sleep(Duration::from_millis(20));
        let before = Instant::now();
        rate.sleep();
        // Overrun: no sleep, next deadline is one period out.
        assert!(before.elapsed() < Duration::from_millis(5));
        assert!(rate.next > Instant::now());
    }

    #[test]
    fn unschedulable_rates_are_rejected() {
        for hz in [0.0, -30.0, f64::NAN, f64::INFINITY, 1e-300, f64::MIN_POSITIVE] {
            assert!(Rate::period_for(hz).is_none(), "{hz}");
            assert!(Rate::new(hz).is_err(), "{hz}");
        }
        assert_eq!(Rate::period_for(30.0), Some(Duration::from_secs_f64(1.0 / 30.0)));
    }
}

//! Outbound pose and mode-echo messages.

use std::io::Write;

use serde::Serialize;

use crate::{DetectionMode, TargetPose};

pub trait Publisher {
    fn publish_pose(&mut self, pose: &TargetPose);
    fn publish_mode(&mut self, mode: DetectionMode);
}

impl<P: Publisher + ?Sized> Publisher for &mut P {
    fn publish_pose(&mut self, pose: &TargetPose) {
        (**self).publish_pose(pose)
    }

    fn publish_mode(&mut self, mode: DetectionMode) {
        (**self).publish_mode(mode)
    }
}

#[derive(Serialize)]
#[serde(tag = "topic")]
enum Message<'a> {
    #[serde(rename = "target_pos")]
    Pose(&'a TargetPose),
    #[serde(rename = "detection_mode")]
    Mode { data: u8 },
}

/// Writes one JSON object per line and flushes after each message.
pub struct JsonLinesPublisher<W: Write> {
    out: W,
    failures: u64,
}

impl<W: Write> JsonLinesPublisher<W> {
    pub fn new(out: W) -> Self {
        Self { out, failures: 0 }
    }

    /// Number of messages that could not be written.
    pub fn failures(&self) -> u64 {
        self.failures
    }

    pub fn get_ref(&self) -> &W {
        &self.out
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn send(&mut self, msg: &Message<'_>) {
        let res = serde_json::to_writer(&mut self.out, msg)
            .map_err(std::io::Error::from)
            .and_then(|()| self.out.write_all(b"\n"))
            .and_then(|()| self.out.flush());
        if let Err(err) = res {
            if self.failures == 0 {
                log::warn!("publish failed: {err}");
            } else {
                log::debug!("publish failed: {err}");
            }
            self.failures += 1;
        }
    }
}

impl<W: Write> Publisher for JsonLinesPublisher<W> {
    fn publish_pose(&mut self, pose: &TargetPose) {
        self.send(&Message::Pose(pose));
    }

    fn publish_mode(&mut self, mode: DetectionMode) {
        self.send(&Message::Mode {
            data: mode.as_byte(),
        });
    }
}

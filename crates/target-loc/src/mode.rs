//! The commanded detection mode, shared between the command reader and the loop.

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

/// Command byte selecting the circle detector.
pub const CIRCLE_COMMAND: u8 = 10;
/// Command byte selecting the fiducial detector.
pub const FIDUCIAL_COMMAND: u8 = 6;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum DetectionMode {
    #[default]
    None = 0,
    Circle = 1,
    Fiducial = 2,
}

impl DetectionMode {
    /// Map an inbound command byte; anything unrecognized is `None`.
    pub fn from_command(command: u8) -> Self {
        match command {
            CIRCLE_COMMAND => DetectionMode::Circle,
            FIDUCIAL_COMMAND => DetectionMode::Fiducial,
            _ => DetectionMode::None,
        }
    }

    /// Value published on the mode echo channel.
    pub fn as_byte(self) -> u8 {
        self as u8
    }

    fn from_byte(b: u8) -> Self {
        match b {
            1 => DetectionMode::Circle,
            2 => DetectionMode::Fiducial,
            _ => DetectionMode::None,
        }
    }

    pub fn is_active(self) -> bool {
        self != DetectionMode::None
    }
}

impl fmt::Display for DetectionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DetectionMode::None => "none",
            DetectionMode::Circle => "circle",
            DetectionMode::Fiducial => "fiducial",
        })
    }
}

/// Constructor for the single writer / single reader pair.
pub struct ModeCell;

impl ModeCell {
    #[allow(clippy::new_ret_no_self)]
    pub fn new() -> (ModeSetter, ModeReader) {
        let cell = Arc::new(AtomicU8::new(DetectionMode::None.as_byte()));
        (ModeSetter { cell: cell.clone() }, ModeReader { cell })
    }
}

/// Write half, owned by whatever receives commands.
#[derive(Debug)]
pub struct ModeSetter {
    cell: Arc<AtomicU8>,
}

impl ModeSetter {
    /// Apply a command byte and return the resulting mode.
    pub fn set_mode(&self, command: u8) -> DetectionMode {
        let mode = DetectionMode::from_command(command);
        self.cell.store(mode.as_byte(), Ordering::Relaxed);
        mode
    }
}

/// Read half, owned by the detection loop.
#[derive(Debug)]
pub struct ModeReader {
    cell: Arc<AtomicU8>,
}

impl ModeReader {
    pub fn current_mode(&self) -> DetectionMode {
        DetectionMode::from_byte(self.cell.load(Ordering::Relaxed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_two_commands_select_a_detector() {
        for command in 0..=u8::MAX {
            let expected = match command {
                10 => DetectionMode::Circle,
                6 => DetectionMode::Fiducial,
                _ => DetectionMode::None,
            };
            assert_eq!(DetectionMode::from_command(command), expected, "{command}");
        }
    }

    #[test]
    fn reader_sees_last_write() {
        let (setter, reader) = ModeCell::new();
        assert_eq!(reader.current_mode(), DetectionMode::None);
        assert_eq!(setter.set_mode(10), DetectionMode::Circle);
        assert_eq!(setter.set_mode(10), DetectionMode::Circle);
        assert_eq!(reader.current_mode(), DetectionMode::Circle);
        setter.set_mode(6);
        assert_eq!(reader.current_mode(), DetectionMode::Fiducial);
        setter.set_mode(7);
        assert_eq!(reader.current_mode(), DetectionMode::None);
    }

    #[test]
    fn echo_bytes_are_stable() {
        assert_eq!(DetectionMode::None.as_byte(), 0);
        assert_eq!(DetectionMode::Circle.as_byte(), 1);
        assert_eq!(DetectionMode::Fiducial.as_byte(), 2);
        assert_eq!(DetectionMode::Fiducial.to_string(), "fiducial");
    }
}

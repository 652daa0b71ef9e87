//! Inbound mode commands, one decimal byte per line.

use std::io::BufRead;
use std::thread::{self, JoinHandle};

use crate::ModeSetter;

/// Parse one command line; blank lines are `None`.
pub fn parse_command(line: &str) -> Option<Result<u8, std::num::ParseIntError>> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(trimmed.parse::<u8>())
}

/// Apply every command read from `reader` until EOF.
pub fn read_commands<R: BufRead>(reader: R, setter: &ModeSetter) {
    for line in reader.lines() {
        let line = match line {
            Ok(line) => line,
            Err(err) => {
                log::warn!("command channel closed: {err}");
                break;
            }
        };
        match parse_command(&line) {
            Some(Ok(cmd)) => {
                let mode = setter.set_mode(cmd);
                log::debug!("command {cmd} -> {mode}");
            }
            Some(Err(err)) => log::warn!("ignoring command {:?}: {err}", line.trim()),
            None => {}
        }
    }
    log::debug!("command channel reached EOF");
}

/// Run [`read_commands`] on a named background thread.
pub fn spawn_command_reader<R>(reader: R, setter: ModeSetter) -> std::io::Result<JoinHandle<()>>
where
    R: BufRead + Send + 'static,
{
    thread::Builder::new()
        .name("mode-commands".to_string())
        .spawn(move || read_commands(reader, &setter))
}

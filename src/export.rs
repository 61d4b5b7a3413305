//! Keyframe metadata export.
//!
//! Events are written as a pretty-printed JSON array, one object per
//! keyframe:
//!
//! ```json
//! [
//!   { "time": 0.0, "frame": 0, "reason": "first frame" },
//!   { "time": 4.2, "frame": 126, "reason": "local maximum" }
//! ]
//! ```
//!
//! Debug runs add `magnitude`, `adjusted_threshold` and
//! `time_since_last_keyframe` to each object.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde_json::Value;

use crate::error::KeyframeError;
use crate::event::KeyframeEvent;

/// The events as a JSON array.
pub fn events_to_json(events: &[KeyframeEvent]) -> Value {
    Value::Array(events.iter().map(KeyframeEvent::to_json).collect())
}

/// Write the events as pretty JSON to `writer`.
///
/// # Errors
///
/// Returns [`KeyframeError::JsonError`] or [`KeyframeError::IoError`] if
/// writing fails.
pub fn write_events<W: Write>(mut writer: W, events: &[KeyframeEvent]) -> Result<(), KeyframeError> {
    serde_json::to_writer_pretty(&mut writer, &events_to_json(events))?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}

/// Write the events as pretty JSON to the file at `path`, replacing it.
///
/// # Errors
///
/// Returns [`KeyframeError::IoError`] if the file cannot be created.
pub fn write_metadata<P: AsRef<Path>>(path: P, events: &[KeyframeEvent]) -> Result<(), KeyframeError> {
    let path = path.as_ref();
    let file = File::create(path)?;
    write_events(BufWriter::new(file), events)?;
    log::info!("Wrote {} keyframes to {}", events.len(), path.display());
    Ok(())
}

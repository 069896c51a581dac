use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::Path;

use serde::Serialize;

use crate::model::Society;

/// Write an iterator of serializable items to a JSONL file (one JSON object per line).
fn write_jsonl<T: Serialize>(path: &Path, items: impl Iterator<Item = T>) -> io::Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    for item in items {
        serde_json::to_writer(&mut writer, &item)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()
}

/// Flush the society's class-engine state to the given output directory.
///
/// Creates the output directory if it does not exist. Writes 4 files:
/// - `class_state.json`: the loadable snapshot (classes, index, conflicts, intellectuals)
/// - `conflicts.jsonl`: one ClassConflict per line, resolved ones included
/// - `events.jsonl`: one Event per line
/// - `spread_events.jsonl`: the recent consciousness spread history
pub fn flush_to_jsonl(society: &Society, output_dir: &Path) -> io::Result<()> {
    fs::create_dir_all(output_dir)?;

    let mut writer = BufWriter::new(File::create(output_dir.join("class_state.json"))?);
    serde_json::to_writer_pretty(&mut writer, &society.snapshot())?;
    writer.flush()?;

    write_jsonl(
        &output_dir.join("conflicts.jsonl"),
        society.classes.conflicts().iter(),
    )?;
    write_jsonl(&output_dir.join("events.jsonl"), society.events.values())?;
    write_jsonl(
        &output_dir.join("spread_events.jsonl"),
        society.consciousness.spread_history(),
    )?;

    tracing::debug!(
        dir = %output_dir.display(),
        events = society.events.len(),
        "flushed class state"
    );
    Ok(())
}

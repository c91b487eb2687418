/// Daily log file output
///
/// One file per day named `universe-prep_YYYY-MM-DD.log`, appended to across
/// runs. Writes are no-ops until `init_file_logging` succeeds.
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

use chrono::Local;
use once_cell::sync::Lazy;
use parking_lot::Mutex;

static LOG_FILE: Lazy<Mutex<Option<BufWriter<File>>>> = Lazy::new(|| Mutex::new(None));

pub fn init_file_logging(dir: &Path) -> std::io::Result<()> {
    fs::create_dir_all(dir)?;
    let name = format!("universe-prep_{}.log", Local::now().format("%Y-%m-%d"));
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(dir.join(name))?;
    *LOG_FILE.lock() = Some(BufWriter::new(file));
    Ok(())
}

pub fn write_to_file(line: &str) {
    let mut guard = LOG_FILE.lock();
    if let Some(writer) = guard.as_mut() {
        // Losing a log line must never take the pipeline down
        let _ = writeln!(writer, "{}", line);
    }
}

pub fn flush_file_logging() {
    if let Some(writer) = LOG_FILE.lock().as_mut() {
        let _ = writer.flush();
    }
}

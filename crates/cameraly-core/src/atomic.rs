//! Atomic file replacement.
//!
//! Every write goes to a uniquely named temporary file in the destination's
//! directory. The temporary file is flushed to disk and renamed over the
//! destination only after the writer closure succeeds; on any failure it is
//! removed and the destination is left as it was. Concurrent writers never
//! share a temporary file.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Temporary sibling path for `target`.
pub fn temp_path_for(target: &Path) -> PathBuf {
    let name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "capture".to_string());
    let n = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);
    let temp_name = format!(".{name}.{}-{n}.tmp", std::process::id());
    match target.parent() {
        Some(parent) => parent.join(temp_name),
        None => PathBuf::from(temp_name),
    }
}

/// Replace `target` with whatever `write` puts into a fresh file.
pub fn write_atomic<F>(target: &Path, write: F) -> io::Result<()>
where
    F: FnOnce(&mut File) -> io::Result<()>,
{
    let temp = temp_path_for(target);

    let filled = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&temp)
        .and_then(|mut file| {
            write(&mut file)?;
            file.sync_all()
        });

    if let Err(e) = filled {
        discard(&temp);
        return Err(e);
    }

    if let Err(e) = fs::rename(&temp, target) {
        discard(&temp);
        return Err(e);
    }

    log::debug!("atomically replaced {}", target.display());
    Ok(())
}

/// Replace `target` with `bytes`.
pub fn write_bytes_atomic(target: &Path, bytes: &[u8]) -> io::Result<()> {
    write_atomic(target, |file| file.write_all(bytes))
}

fn discard(temp: &Path) {
    if let Err(e) = fs::remove_file(temp) {
        if e.kind() != io::ErrorKind::NotFound {
            log::warn!("could not remove temporary file {}: {e}", temp.display());
        }
    }
}

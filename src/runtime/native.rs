//! Unpacking of the platform-native libraries that pre-2.0 `gwt-dev`
//! releases ship in a separate `<platform>-libs` zip.

use super::repository::{discard_partial, partial_path};
use crate::error::{PipelineError, Result};
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::Path;
use tracing::{debug, info, warn};

/// Extract `archive` into `target_dir`, leaving files that already exist alone.
///
/// Returns the number of files written; a second call on the same directory
/// writes nothing.
pub fn unpack_native_payload(archive: &Path, target_dir: &Path) -> Result<usize> {
    let file = File::open(archive)?;
    let mut zip = zip::ZipArchive::new(file)
        .map_err(|e| PipelineError::resolution(archive.display().to_string(), e))?;

    let mut written = 0;
    for index in 0..zip.len() {
        let mut entry = zip
            .by_index(index)
            .map_err(|e| PipelineError::resolution(archive.display().to_string(), e))?;
        if entry.is_dir() {
            continue;
        }
        let Some(relative) = entry.enclosed_name() else {
            warn!(entry = %entry.name(), "Skipping archive entry with unsafe path");
            continue;
        };

        let dest = target_dir.join(relative);
        if dest.exists() {
            debug!(path = %dest.display(), "Native library already present");
            continue;
        }
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        let mode = entry.unix_mode();
        let partial = partial_path(&dest);
        if let Err(e) = extract_entry(&mut entry, mode, &partial, &dest) {
            discard_partial(&partial);
            return Err(e);
        }
        written += 1;
    }

    if written > 0 {
        info!(
            archive = %archive.display(),
            target = %target_dir.display(),
            files = written,
            "Unpacked native libraries"
        );
    }
    Ok(written)
}

/// Stage the entry next to `dest` and move it into place only once it read back intact.
fn extract_entry(entry: &mut impl Read, mode: Option<u32>, partial: &Path, dest: &Path) -> Result<()> {
    let mut out = File::create(partial)?;
    io::copy(entry, &mut out)?;
    out.sync_all()?;
    drop(out);

    #[cfg(unix)]
    if let Some(mode) = mode {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(partial, fs::Permissions::from_mode(mode))?;
    }
    #[cfg(not(unix))]
    let _ = mode;
    fs::rename(partial, dest)?;
    Ok(())
}

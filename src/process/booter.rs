//! Ways of handing a long classpath to the JVM without hitting the
//! operating system's command-line length limit.

use crate::classpath::Classpath;
use crate::error::{PipelineError, Result};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

const MANIFEST_LINE_LIMIT: usize = 72;

static SCRATCH_COUNTER: AtomicUsize = AtomicUsize::new(0);

/// A unique file name in `dir` for this process
pub(super) fn scratch_path(dir: &Path, prefix: &str, extension: &str) -> PathBuf {
    let n = SCRATCH_COUNTER.fetch_add(1, Ordering::Relaxed);
    dir.join(format!(
        "{}-{}-{}.{}",
        prefix,
        std::process::id(),
        n,
        extension
    ))
}

/// Write a JVM `@argfile` holding `-classpath <cp>`.
pub fn write_argfile(dir: &Path, classpath: &Classpath) -> Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let path = scratch_path(dir, "gwtpipe-classpath", "args");
    let content = format!("-classpath\n{}\n", quote_argfile(&classpath.join()));
    fs::write(&path, content)?;
    Ok(path)
}

/// Quote one argument for a JVM argfile, where backslash escapes inside quotes
pub(crate) fn quote_argfile(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for c in value.chars() {
        match c {
            '\\' => quoted.push_str("\\\\"),
            '"' => quoted.push_str("\\\""),
            _ => quoted.push(c),
        }
    }
    quoted.push('"');
    quoted
}

/// Write a jar containing only a manifest whose `Class-Path` lists every
/// classpath entry. Putting the jar alone on `-cp` exposes the full path.
pub fn write_manifest_jar(dir: &Path, classpath: &Classpath, main_class: &str) -> Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let path = scratch_path(dir, "gwtpipe-booter", "jar");
    let manifest = manifest(classpath, main_class);

    let mut jar = zip::ZipWriter::new(File::create(&path)?);
    jar.start_file("META-INF/MANIFEST.MF", zip::write::SimpleFileOptions::default())
        .map_err(|e| PipelineError::template(&path, e))?;
    jar.write_all(manifest.as_bytes())?;
    jar.finish().map_err(|e| PipelineError::template(&path, e))?;
    Ok(path)
}

pub(crate) fn manifest(classpath: &Classpath, main_class: &str) -> String {
    let class_path = classpath
        .iter()
        .map(file_url)
        .collect::<Vec<_>>()
        .join(" ");

    let mut out = String::new();
    for header in [
        "Manifest-Version: 1.0".to_string(),
        "Created-By: gwtpipe".to_string(),
        format!("Main-Class: {}", main_class),
        format!("Class-Path: {}", class_path),
    ] {
        wrap_header(&header, &mut out);
    }
    out.push_str("\r\n");
    out
}

/// Split a manifest header into lines of at most 72 bytes; continuation lines
/// begin with a single space.
fn wrap_header(header: &str, out: &mut String) {
    let mut rest = header;
    let mut limit = MANIFEST_LINE_LIMIT;
    loop {
        if rest.len() <= limit {
            out.push_str(rest);
            out.push_str("\r\n");
            return;
        }
        let mut cut = limit;
        while !rest.is_char_boundary(cut) {
            cut -= 1;
        }
        out.push_str(&rest[..cut]);
        out.push_str("\r\n ");
        rest = &rest[cut..];
        limit = MANIFEST_LINE_LIMIT - 1;
    }
}

/// `file:` URL for a classpath entry; directories end in `/` or the JVM
/// treats them as jars.
pub(crate) fn file_url(path: &Path) -> String {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    };
    let mut raw = absolute.to_string_lossy().replace('\\', "/");
    if !raw.starts_with('/') {
        raw.insert(0, '/');
    }
    if absolute.is_dir() && !raw.ends_with('/') {
        raw.push('/');
    }

    let mut url = String::from("file:");
    for byte in raw.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' | b'/' | b':' => {
                url.push(byte as char)
            }
            other => url.push_str(&format!("%{:02X}", other)),
        }
    }
    url
}

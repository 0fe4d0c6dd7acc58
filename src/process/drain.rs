use std::io::{BufRead, BufReader, Read};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy)]
pub(super) enum Stream {
    Stdout,
    Stderr,
}

/// Read `stream` line by line on its own thread until EOF, logging every
/// line and returning all of them.
pub(super) fn spawn<R>(stream: R, kind: Stream, tool: String) -> JoinHandle<Vec<String>>
where
    R: Read + Send + 'static,
{
    thread::spawn(move || {
        let mut reader = BufReader::new(stream);
        let mut lines = Vec::new();
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf) {
                Ok(0) => break,
                Ok(_) => {
                    let line = String::from_utf8_lossy(&buf)
                        .trim_end_matches(['\r', '\n'])
                        .to_string();
                    match kind {
                        Stream::Stdout => info!(target: "gwtpipe::tool", tool = %tool, "{}", line),
                        Stream::Stderr => warn!(target: "gwtpipe::tool", tool = %tool, "{}", line),
                    }
                    lines.push(line);
                }
                Err(e) => {
                    warn!(tool = %tool, error = %e, "Stopped reading child output");
                    break;
                }
            }
        }
        lines
    })
}

/// Collect a drain's lines; a panicked drain yields nothing.
pub(super) fn join(handle: Option<JoinHandle<Vec<String>>>) -> Vec<String> {
    match handle.map(JoinHandle::join) {
        Some(Ok(lines)) => lines,
        Some(Err(_)) => {
            warn!("Output drain thread panicked");
            Vec::new()
        }
        None => Vec::new(),
    }
}

/// Like [`join`], but gives up after `grace`. A descendant that inherited the
/// pipe can hold it open indefinitely; the abandoned thread ends when it closes.
pub(super) fn join_within(handle: Option<JoinHandle<Vec<String>>>, grace: Duration) -> Vec<String> {
    let Some(handle) = handle else {
        return Vec::new();
    };
    let deadline = Instant::now() + grace;
    while !handle.is_finished() {
        if Instant::now() >= deadline {
            warn!("Child output still open after kill, no longer reading it");
            return Vec::new();
        }
        thread::sleep(Duration::from_millis(20));
    }
    join(Some(handle))
}

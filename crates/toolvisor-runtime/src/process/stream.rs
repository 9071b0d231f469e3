//! Child stdio readers.
//!
//! Lines are read as bytes and decoded lossily so invalid UTF-8 never
//! terminates a reader task.

use std::sync::{Arc, Mutex, PoisonError};

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::task::JoinHandle;
use tracing::debug;

/// Maximum bytes of standard error retained per process (64 KiB).
pub const STDERR_TAIL_BYTES: usize = 64 * 1024;

/// Bounded buffer keeping the most recent standard-error output.
#[derive(Debug, Clone, Default)]
pub struct StderrTail {
    inner: Arc<Mutex<String>>,
}

impl StderrTail {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one line, discarding the oldest bytes beyond the limit.
    pub fn push_line(&self, line: &str) {
        let mut buf = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        buf.push_str(line);
        buf.push('\n');

        if buf.len() > STDERR_TAIL_BYTES {
            let mut cut = buf.len() - STDERR_TAIL_BYTES;
            while !buf.is_char_boundary(cut) {
                cut += 1;
            }
            buf.drain(..cut);
        }
    }

    /// Copy of the retained output.
    pub fn snapshot(&self) -> String {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

fn trim_newline(buf: &mut Vec<u8>) {
    if buf.last() == Some(&b'\n') {
        buf.pop();
        if buf.last() == Some(&b'\r') {
            buf.pop();
        }
    }
}

/// Spawn a task forwarding each line of `stream` to `on_line`.
pub fn spawn_line_reader<F>(
    stream: impl AsyncRead + Unpin + Send + 'static,
    server_id: String,
    stream_type: &'static str,
    mut on_line: F,
) -> JoinHandle<()>
where
    F: FnMut(&str) + Send + 'static,
{
    tokio::spawn(async move {
        let mut reader = BufReader::new(stream);
        let mut buf: Vec<u8> = Vec::with_capacity(1024);

        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) => break,
                Ok(_) => {
                    trim_newline(&mut buf);
                    let line = String::from_utf8_lossy(&buf);
                    debug!(server_id = %server_id, %stream_type, "{}", line);
                    on_line(&line);
                }
                Err(e) => {
                    debug!(server_id = %server_id, %stream_type, error = %e, "Stream reader exiting on read error");
                    break;
                }
            }
        }

        debug!(server_id = %server_id, %stream_type, "Stream reader task exiting");
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tail_keeps_most_recent_bytes() {
        let tail = StderrTail::new();
        let line = "x".repeat(1000);
        for _ in 0..100 {
            tail.push_line(&line);
        }
        tail.push_line("last line");

        let snapshot = tail.snapshot();
        assert!(snapshot.len() <= STDERR_TAIL_BYTES);
        assert!(snapshot.ends_with("last line\n"));
    }

    #[test]
    fn test_tail_cuts_on_char_boundary() {
        let tail = StderrTail::new();
        let line = "é".repeat(STDERR_TAIL_BYTES / 2);
        tail.push_line(&line);
        tail.push_line(&line);
        // Would panic on a non-boundary drain
        assert!(tail.snapshot().len() <= STDERR_TAIL_BYTES);
    }

    #[tokio::test]
    async fn test_reader_decodes_lossily() {
        let data: &[u8] = b"ok\n\xff\xfe bad\r\nend";
        let tail = StderrTail::new();
        let sink = tail.clone();
        spawn_line_reader(data, "test".to_string(), "stderr", move |l| sink.push_line(l))
            .await
            .unwrap();

        let lines: Vec<String> = tail.snapshot().lines().map(str::to_string).collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "ok");
        assert!(lines[1].ends_with(" bad"));
        assert_eq!(lines[2], "end");
    }
}

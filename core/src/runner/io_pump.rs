use std::sync::Arc;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::task::JoinHandle;

use crate::error::RunnerError;
use crate::util::RingBytes;

pub fn pump_stdout<R>(
    rd: R,
    ring: Arc<RingBytes>,
    passthrough: bool,
) -> JoinHandle<Result<u64, RunnerError>>
where
    R: tokio::io::AsyncRead + Unpin + Send + 'static,
{
    pump(rd, tokio::io::stdout(), ring, "stdout", passthrough)
}

pub fn pump_stderr<R>(
    rd: R,
    ring: Arc<RingBytes>,
    passthrough: bool,
) -> JoinHandle<Result<u64, RunnerError>>
where
    R: tokio::io::AsyncRead + Unpin + Send + 'static,
{
    pump(rd, tokio::io::stderr(), ring, "stderr", passthrough)
}

/// Drain `rd` until EOF into `ring`, optionally mirroring to `wr`.
///
/// Reading continues after the ring is full so the child never blocks on a
/// full pipe.
fn pump<R, W>(
    mut rd: R,
    mut wr: W,
    ring: Arc<RingBytes>,
    label: &'static str,
    passthrough: bool,
) -> JoinHandle<Result<u64, RunnerError>>
where
    R: tokio::io::AsyncRead + Unpin + Send + 'static,
    W: tokio::io::AsyncWrite + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut buf = vec![0u8; 16 * 1024];
        let mut total = 0u64;

        loop {
            let n = rd.read(&mut buf).await.map_err(|e| RunnerError::StreamIo {
                stream: label,
                source: e,
            })?;
            if n == 0 {
                break;
            }

            ring.push(&buf[..n]);
            total += n as u64;

            if passthrough {
                // A closed terminal must not stop the capture.
                if wr.write_all(&buf[..n]).await.is_err() {
                    tracing::debug!(stream = label, "passthrough writer closed");
                }
            }
        }

        if passthrough {
            let _ = wr.flush().await;
        }

        Ok(total)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn captures_until_eof() {
        let (mut wr, rd) = tokio::io::duplex(1024);
        let ring = RingBytes::new(1024);

        let task = pump_stdout(rd, ring.clone(), false);

        wr.write_all(b"hello\nworld").await.unwrap();
        drop(wr);

        let total = task.await.unwrap().unwrap();
        assert_eq!(total, 11);
        assert_eq!(ring.to_string_lossy(), "hello\nworld");
    }

    #[tokio::test]
    async fn keeps_reading_past_the_cap() {
        let (mut wr, rd) = tokio::io::duplex(64);
        let ring = RingBytes::new(8);

        let task = pump_stderr(rd, ring.clone(), false);

        let payload = vec![b'x'; 4096];
        wr.write_all(&payload).await.unwrap();
        wr.write_all(b"TAIL").await.unwrap();
        drop(wr);

        assert_eq!(task.await.unwrap().unwrap(), 4100);
        assert!(ring.is_truncated());
        assert!(ring.to_string_lossy().ends_with("TAIL"));
    }
}

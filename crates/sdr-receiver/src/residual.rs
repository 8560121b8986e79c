use std::time::Duration;

use tokio::sync::{Mutex, Notify};

/// Default capacity in whole payloads (frame-sized, 16,129 samples each).
pub const DEFAULT_BUF_PAYLOADS: usize = 512;

/// How long the consumer's bounded wait blocks before re-checking for
/// shutdown, absent a drain notification.
pub const CONSUMER_WAIT: Duration = Duration::from_millis(10);

struct Inner {
    buf: Vec<u8>,
    sent: usize,
    filled: usize,
}

/// Byte buffer sitting between the reassembler and the consumer work loop.
/// The reassembler appends a recovered frame's contiguous payload on every
/// drain; the consumer reads at its own cadence. Overruns drop the
/// newest payload rather than growing unbounded.
pub struct ResidualBuffer {
    inner: Mutex<Inner>,
    notify: Notify,
    capacity: usize,
}

impl ResidualBuffer {
    pub fn new(payload_size: usize, buf_payloads: usize) -> Self {
        let capacity = payload_size * buf_payloads;
        Self {
            inner: Mutex::new(Inner {
                buf: vec![0u8; capacity],
                sent: 0,
                filled: 0,
            }),
            notify: Notify::new(),
            capacity,
        }
    }

    /// Append a recovered frame's payload. Drops (with a warning) and
    /// returns `false` if it would overrun the buffer.
    pub async fn append(&self, payload: &[u8]) -> bool {
        let mut inner = self.inner.lock().await;
        if inner.filled - inner.sent + payload.len() > self.capacity {
            tracing::warn!(
                dropped_bytes = payload.len(),
                "residual buffer would overrun, dropping payload"
            );
            return false;
        }
        if inner.sent > 0 {
            inner.buf.copy_within(inner.sent..inner.filled, 0);
            inner.filled -= inner.sent;
            inner.sent = 0;
        }
        let start = inner.filled;
        inner.buf[start..start + payload.len()].copy_from_slice(payload);
        inner.filled += payload.len();
        drop(inner);
        self.notify.notify_waiters();
        true
    }

    /// Read up to `dst.len()` bytes, returning the number actually read.
    /// Waits up to [`CONSUMER_WAIT`] for new data if none is immediately
    /// available; returns 0 on timeout rather than blocking indefinitely,
    /// so a shutdown check can run at the call site.
    pub async fn read(&self, dst: &mut [u8]) -> usize {
        {
            let inner = self.inner.lock().await;
            if inner.filled > inner.sent {
                drop(inner);
                return self.read_available(dst).await;
            }
        }
        let _ = tokio::time::timeout(CONSUMER_WAIT, self.notify.notified()).await;
        self.read_available(dst).await
    }

    async fn read_available(&self, dst: &mut [u8]) -> usize {
        let mut inner = self.inner.lock().await;
        let available = inner.filled - inner.sent;
        let n = available.min(dst.len());
        if n == 0 {
            return 0;
        }
        let sent = inner.sent;
        dst[..n].copy_from_slice(&inner.buf[sent..sent + n]);
        inner.sent += n;
        if inner.sent == inner.filled {
            inner.sent = 0;
            inner.filled = 0;
        }
        n
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn append_then_read_round_trips() {
        let buf = ResidualBuffer::new(8, 4);
        assert!(buf.append(&[1, 2, 3, 4]).await);
        let mut dst = [0u8; 4];
        let n = buf.read(&mut dst).await;
        assert_eq!(n, 4);
        assert_eq!(dst, [1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn partial_reads_advance_sent_offset() {
        let buf = ResidualBuffer::new(8, 4);
        buf.append(&[1, 2, 3, 4, 5, 6]).await;
        let mut dst = [0u8; 2];
        assert_eq!(buf.read(&mut dst).await, 2);
        assert_eq!(dst, [1, 2]);
        assert_eq!(buf.read(&mut dst).await, 2);
        assert_eq!(dst, [3, 4]);
    }

    #[tokio::test]
    async fn overrun_drops_payload() {
        let buf = ResidualBuffer::new(4, 2); // capacity 8 bytes
        assert!(buf.append(&[0u8; 8]).await);
        assert!(!buf.append(&[0u8; 1]).await);
    }

    #[tokio::test]
    async fn read_times_out_with_no_data() {
        let buf = ResidualBuffer::new(8, 4);
        let mut dst = [0u8; 4];
        let n = buf.read(&mut dst).await;
        assert_eq!(n, 0);
    }
}

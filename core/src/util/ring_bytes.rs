use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

/// Bounded capture buffer that keeps the most recent `cap` bytes of a stream.
///
/// Bytes past the cap evict the oldest ones; the total seen is tracked so the
/// report can say how much was dropped.
pub struct RingBytes {
    inner: Mutex<Inner>,
    cap: usize,
}

struct Inner {
    buf: VecDeque<u8>,
    total: u64,
}

impl RingBytes {
    pub fn new(cap: usize) -> Arc<Self> {
        Arc::new(Self {
            inner: Mutex::new(Inner {
                buf: VecDeque::with_capacity(cap.min(64 * 1024)),
                total: 0,
            }),
            cap,
        })
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        match self.inner.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn push(&self, data: &[u8]) {
        let mut g = self.lock();
        g.total = g.total.saturating_add(data.len() as u64);
        if self.cap == 0 {
            return;
        }
        let data = if data.len() > self.cap {
            &data[data.len() - self.cap..]
        } else {
            data
        };
        let overflow = g.buf.len().saturating_add(data.len()).saturating_sub(self.cap);
        if overflow > 0 {
            g.buf.drain(..overflow);
        }
        g.buf.extend(data);
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let g = self.lock();
        let mut vec = Vec::with_capacity(g.buf.len());
        vec.extend(g.buf.iter().copied());
        vec
    }

    pub fn to_string_lossy(&self) -> String {
        String::from_utf8_lossy(&self.to_bytes()).into_owned()
    }

    pub fn total_bytes(&self) -> u64 {
        self.lock().total
    }

    pub fn is_truncated(&self) -> bool {
        let g = self.lock();
        g.total > g.buf.len() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_everything_under_cap() {
        let ring = RingBytes::new(16);
        ring.push(b"hello ");
        ring.push(b"world");
        assert_eq!(ring.to_string_lossy(), "hello world");
        assert!(!ring.is_truncated());
        assert_eq!(ring.total_bytes(), 11);
    }

    #[test]
    fn evicts_oldest_bytes_past_cap() {
        let ring = RingBytes::new(4);
        ring.push(b"abc");
        ring.push(b"def");
        assert_eq!(ring.to_bytes(), b"cdef");
        assert!(ring.is_truncated());
        assert_eq!(ring.total_bytes(), 6);
    }

    #[test]
    fn oversized_chunk_keeps_its_tail() {
        let ring = RingBytes::new(3);
        ring.push(b"0123456789");
        assert_eq!(ring.to_bytes(), b"789");
    }

    #[test]
    fn zero_cap_only_counts() {
        let ring = RingBytes::new(0);
        ring.push(b"dropped");
        assert!(ring.to_bytes().is_empty());
        assert!(ring.is_truncated());
    }
}

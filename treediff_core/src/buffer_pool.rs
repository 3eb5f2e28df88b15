use std::sync::{Arc, Mutex, PoisonError};
use treediff_common::{Result, TreeDiffError};

/// Pre-allocated pairs of equally sized read buffers shared between
/// concurrent content comparisons, so buffers are not reallocated per file.
///
/// `allocate` fails loudly when no pair is free; the caller must size the
/// pool to the maximum number of concurrent comparisons (the engine uses the
/// descriptor queue's comparison-level cap). Buffer contents are not cleared
/// between uses.
pub struct BufferPool {
    buf_size: usize,
    free: Mutex<Vec<BufferPair>>,
}

struct BufferPair {
    buf1: Vec<u8>,
    buf2: Vec<u8>,
}

impl BufferPool {
    pub fn new(buf_size: usize, count: usize) -> Arc<Self> {
        let free = (0..count)
            .map(|_| BufferPair {
                buf1: vec![0; buf_size],
                buf2: vec![0; buf_size],
            })
            .collect();
        Arc::new(Self {
            buf_size,
            free: Mutex::new(free),
        })
    }

    pub fn buf_size(&self) -> usize {
        self.buf_size
    }

    /// Takes a free buffer pair, which returns to the pool when the lease
    /// drops.
    pub fn allocate(self: &Arc<Self>) -> Result<BufferLease> {
        let mut free = self.free.lock().unwrap_or_else(PoisonError::into_inner);
        match free.pop() {
            Some(pair) => Ok(BufferLease {
                pair: Some(pair),
                pool: Arc::clone(self),
            }),
            None => Err(TreeDiffError::Pool(
                "buffer pool exhausted: more concurrent comparisons than buffer pairs".to_string(),
            )),
        }
    }

    fn release(&self, pair: BufferPair) {
        self.free
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(pair);
    }
}

/// Scoped lease of one buffer pair.
pub struct BufferLease {
    pair: Option<BufferPair>,
    pool: Arc<BufferPool>,
}

impl BufferLease {
    pub fn buffers(&mut self) -> (&mut [u8], &mut [u8]) {
        let pair = self.pair.as_mut().expect("buffer lease already released");
        (&mut pair.buf1, &mut pair.buf2)
    }
}

impl Drop for BufferLease {
    fn drop(&mut self) {
        if let Some(pair) = self.pair.take() {
            self.pool.release(pair);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocates_up_to_capacity_then_fails_loudly() {
        let pool = BufferPool::new(16, 2);
        let _a = pool.allocate().unwrap();
        let _b = pool.allocate().unwrap();
        assert!(matches!(pool.allocate(), Err(TreeDiffError::Pool(_))));
    }

    #[test]
    fn dropping_a_lease_frees_the_pair() {
        let pool = BufferPool::new(16, 1);
        let lease = pool.allocate().unwrap();
        assert!(pool.allocate().is_err());
        drop(lease);
        assert!(pool.allocate().is_ok());
    }

    #[test]
    fn buffers_have_the_configured_size() {
        let pool = BufferPool::new(64, 1);
        let mut lease = pool.allocate().unwrap();
        let (buf1, buf2) = lease.buffers();
        assert_eq!(buf1.len(), 64);
        assert_eq!(buf2.len(), 64);
    }

    #[test]
    fn contents_survive_between_leases() {
        // Comparators must not rely on zeroed memory.
        let pool = BufferPool::new(4, 1);
        {
            let mut lease = pool.allocate().unwrap();
            let (buf1, _) = lease.buffers();
            buf1.copy_from_slice(b"abcd");
        }
        let mut lease = pool.allocate().unwrap();
        let (buf1, _) = lease.buffers();
        assert_eq!(buf1, b"abcd");
    }
}

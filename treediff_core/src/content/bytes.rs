use super::{fill_chunk, ContentCompare};
use crate::buffer_pool::BufferPool;
use crate::fd_queue::FdQueue;
use std::path::Path;
use std::sync::Arc;
use treediff_common::Result;

/// Byte-exact streaming comparison: reads matched-size chunks from both
/// files into a pooled buffer pair until a mismatch or simultaneous EOF.
/// O(1) memory regardless of file size.
pub struct ByteContentCompare {
    fd_queue: Arc<FdQueue>,
    buffers: Arc<BufferPool>,
}

impl ByteContentCompare {
    pub fn new(fd_queue: Arc<FdQueue>, buffers: Arc<BufferPool>) -> Self {
        Self { fd_queue, buffers }
    }
}

impl ContentCompare for ByteContentCompare {
    fn same_content(&self, path1: &Path, path2: &Path) -> Result<bool> {
        let mut fds = self.fd_queue.open_pair(path1, path2)?;
        let mut lease = self.buffers.allocate()?;
        let (buf1, buf2) = lease.buffers();

        loop {
            let size1 = fill_chunk(&mut fds.first, buf1)?;
            let size2 = fill_chunk(&mut fds.second, buf2)?;
            if size1 != size2 {
                // Unequal read sizes mean unequal lengths; stop reading.
                return Ok(false);
            }
            if size1 == 0 {
                // Both files hit end of file together.
                return Ok(true);
            }
            if buf1[..size1] != buf2[..size2] {
                return Ok(false);
            }
        }
    }
}

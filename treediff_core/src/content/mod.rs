mod bytes;
mod lines;

pub use bytes::ByteContentCompare;
pub use lines::LineContentCompare;

use crate::buffer_pool::BufferPool;
use crate::fd_queue::FdQueue;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use std::sync::Arc;
use treediff_common::{CompareOptions, ContentStrategy, Result};

/// How many content comparisons may run at once. The descriptor queue is
/// sized at twice this (each comparison opens two files), which in turn
/// guarantees the buffer pool can never be over-allocated.
pub const MAX_CONCURRENT_FILE_COMPARE: usize = 8;

/// Chunk size for streaming comparison, independent of file size.
pub const DEFAULT_BUF_SIZE: usize = 100_000;

/// Pluggable strategy answering "do these two files hold the same content".
///
/// Implementations stream through shared resource pools and must release
/// descriptors and buffers on every exit path.
pub trait ContentCompare: Send + Sync {
    fn same_content(&self, path1: &Path, path2: &Path) -> Result<bool>;
}

/// Builds the comparator the options ask for, wired to the given pools.
pub fn build_strategy(
    options: &CompareOptions,
    fd_queue: Arc<FdQueue>,
    buffers: Arc<BufferPool>,
) -> Box<dyn ContentCompare> {
    match options.content_strategy {
        ContentStrategy::Bytes => Box::new(ByteContentCompare::new(fd_queue, buffers)),
        ContentStrategy::Lines => Box::new(LineContentCompare::new(
            fd_queue,
            buffers,
            options.ignore_line_ending,
            options.ignore_white_spaces,
        )),
    }
}

/// Reads until `buf` is full or end of file, tolerating short reads, and
/// returns the number of bytes read. Two equally sized files therefore
/// always yield matching chunk sizes.
pub(crate) fn fill_chunk(file: &mut File, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = file.read(&mut buf[filled..])?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn fill_chunk_stops_at_eof() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("f");
        let mut file = File::create(&path).unwrap();
        file.write_all(b"hello").unwrap();
        drop(file);

        let mut file = File::open(&path).unwrap();
        let mut buf = [0u8; 16];
        assert_eq!(fill_chunk(&mut file, &mut buf).unwrap(), 5);
        assert_eq!(&buf[..5], b"hello");
        assert_eq!(fill_chunk(&mut file, &mut buf).unwrap(), 0);
    }
}

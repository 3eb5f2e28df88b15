use super::{fill_chunk, ContentCompare};
use crate::buffer_pool::BufferPool;
use crate::fd_queue::FdQueue;
use std::path::Path;
use std::sync::Arc;
use treediff_common::Result;

/// Line-oriented comparison with optional tolerance for line endings and
/// surrounding whitespace.
///
/// Files are read in the same chunked fashion as the byte comparator; the
/// trailing partial line of each chunk carries over to the next so lines
/// split across chunk boundaries compare whole. A chunk alignment that
/// yields a different number of lines per side is an immediate mismatch.
pub struct LineContentCompare {
    fd_queue: Arc<FdQueue>,
    buffers: Arc<BufferPool>,
    ignore_line_ending: bool,
    ignore_white_spaces: bool,
}

impl LineContentCompare {
    pub fn new(
        fd_queue: Arc<FdQueue>,
        buffers: Arc<BufferPool>,
        ignore_line_ending: bool,
        ignore_white_spaces: bool,
    ) -> Self {
        Self {
            fd_queue,
            buffers,
            ignore_line_ending,
            ignore_white_spaces,
        }
    }

    fn lines_equal(&self, line1: &[u8], line2: &[u8]) -> bool {
        if !self.ignore_line_ending && !self.ignore_white_spaces {
            return line1 == line2;
        }

        let text1 = String::from_utf8_lossy(line1);
        let text2 = String::from_utf8_lossy(line2);
        let mut line1 = text1.as_ref();
        let mut line2 = text2.as_ref();
        if self.ignore_line_ending {
            line1 = line1.trim_end_matches('\r');
            line2 = line2.trim_end_matches('\r');
        }
        if self.ignore_white_spaces {
            line1 = line1.trim_matches(is_inline_whitespace);
            line2 = line2.trim_matches(is_inline_whitespace);
        }
        line1 == line2
    }
}

/// Unicode whitespace excluding the line terminators themselves.
fn is_inline_whitespace(c: char) -> bool {
    c.is_whitespace() && c != '\r' && c != '\n'
}

impl ContentCompare for LineContentCompare {
    fn same_content(&self, path1: &Path, path2: &Path) -> Result<bool> {
        let mut fds = self.fd_queue.open_pair(path1, path2)?;
        let mut lease = self.buffers.allocate()?;
        let (buf1, buf2) = lease.buffers();

        let mut carry1: Vec<u8> = Vec::new();
        let mut carry2: Vec<u8> = Vec::new();

        loop {
            let size1 = fill_chunk(&mut fds.first, buf1)?;
            let size2 = fill_chunk(&mut fds.second, buf2)?;
            if size1 == 0 && size2 == 0 {
                // Both sides ended; the carried final lines are now complete.
                return Ok(self.lines_equal(&carry1, &carry2));
            }

            carry1.extend_from_slice(&buf1[..size1]);
            carry2.extend_from_slice(&buf2[..size2]);

            let lines1: Vec<Vec<u8>> = carry1.split(|&b| b == b'\n').map(<[u8]>::to_vec).collect();
            let lines2: Vec<Vec<u8>> = carry2.split(|&b| b == b'\n').map(<[u8]>::to_vec).collect();
            if lines1.len() != lines2.len() {
                return Ok(false);
            }

            // Compare every completed line; the last one of each side may
            // still be partial and becomes the next carry.
            let completed = lines1.len() - 1;
            for (line1, line2) in lines1.iter().zip(&lines2).take(completed) {
                if !self.lines_equal(line1, line2) {
                    return Ok(false);
                }
            }

            carry1 = lines1.into_iter().next_back().unwrap_or_default();
            carry2 = lines2.into_iter().next_back().unwrap_or_default();
        }
    }
}

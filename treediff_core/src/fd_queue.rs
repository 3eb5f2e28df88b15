use std::fs::File;
use std::path::Path;
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use treediff_common::Result;

/// Caps the number of concurrently open file descriptors across all content
/// comparisons sharing this queue.
///
/// Requests past the cap wait in ticket (FIFO) order and are serviced as
/// descriptors are released. Both descriptors of one comparison are taken in
/// a single acquisition, so a waiting comparison never holds one slot while
/// blocking on the other.
pub struct FdQueue {
    max_open: usize,
    state: Mutex<QueueState>,
    freed: Condvar,
}

#[derive(Default)]
struct QueueState {
    active: usize,
    next_ticket: u64,
    now_serving: u64,
}

impl FdQueue {
    pub fn new(max_open: usize) -> Arc<Self> {
        assert!(max_open >= 2, "fd queue needs room for at least one pair");
        Arc::new(Self {
            max_open,
            state: Mutex::new(QueueState::default()),
            freed: Condvar::new(),
        })
    }

    pub fn max_open(&self) -> usize {
        self.max_open
    }

    /// How many two-descriptor comparisons the queue admits at once.
    pub fn comparison_slots(&self) -> usize {
        self.max_open / 2
    }

    /// Opens both files of one comparison. Blocks until two slots are free;
    /// the slots and descriptors are released when the returned pair drops.
    pub fn open_pair(self: &Arc<Self>, path1: &Path, path2: &Path) -> Result<FdPair> {
        self.acquire(2);
        let lease = SlotLease {
            queue: Arc::clone(self),
            slots: 2,
        };
        // Slots release through the lease if either open fails.
        let first = File::open(path1)?;
        let second = File::open(path2)?;
        Ok(FdPair {
            first,
            second,
            _lease: lease,
        })
    }

    fn acquire(&self, slots: usize) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let ticket = state.next_ticket;
        state.next_ticket += 1;
        while state.now_serving != ticket || state.active + slots > self.max_open {
            state = self
                .freed
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
        state.now_serving += 1;
        state.active += slots;
        self.freed.notify_all();
    }

    fn release(&self, slots: usize) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.active -= slots;
        self.freed.notify_all();
    }
}

struct SlotLease {
    queue: Arc<FdQueue>,
    slots: usize,
}

impl Drop for SlotLease {
    fn drop(&mut self) {
        self.queue.release(self.slots);
    }
}

/// The two open descriptors of one content comparison.
///
/// Field order matters: the files close before the lease gives the slots
/// back to the queue.
pub struct FdPair {
    pub first: File,
    pub second: File,
    _lease: SlotLease,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use tempfile::TempDir;

    #[test]
    fn open_pair_reads_both_files() {
        let temp = TempDir::new().unwrap();
        let p1 = temp.path().join("a");
        let p2 = temp.path().join("b");
        fs::write(&p1, b"left").unwrap();
        fs::write(&p2, b"right").unwrap();

        let queue = FdQueue::new(4);
        let mut pair = queue.open_pair(&p1, &p2).unwrap();

        use std::io::Read;
        let mut buf = String::new();
        pair.first.read_to_string(&mut buf).unwrap();
        assert_eq!(buf, "left");
        buf.clear();
        pair.second.read_to_string(&mut buf).unwrap();
        assert_eq!(buf, "right");
    }

    #[test]
    fn failed_open_releases_slots() {
        let temp = TempDir::new().unwrap();
        let good = temp.path().join("good");
        fs::write(&good, b"x").unwrap();
        let missing = temp.path().join("missing");

        let queue = FdQueue::new(2);
        assert!(queue.open_pair(&good, &missing).is_err());
        // Cap is one pair; this would deadlock if the failed open leaked slots.
        let _pair = queue.open_pair(&good, &good).unwrap();
    }

    #[test]
    fn concurrent_pairs_never_exceed_the_cap() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("file");
        fs::write(&path, b"x").unwrap();

        let queue = FdQueue::new(4);
        let open_now = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..16 {
            let queue = Arc::clone(&queue);
            let path = path.clone();
            let open_now = Arc::clone(&open_now);
            let peak = Arc::clone(&peak);
            handles.push(thread::spawn(move || {
                let pair = queue.open_pair(&path, &path).unwrap();
                let current = open_now.fetch_add(2, Ordering::SeqCst) + 2;
                peak.fetch_max(current, Ordering::SeqCst);
                thread::sleep(std::time::Duration::from_millis(5));
                open_now.fetch_sub(2, Ordering::SeqCst);
                drop(pair);
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        assert!(peak.load(Ordering::SeqCst) <= 4);
    }
}

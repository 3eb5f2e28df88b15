pub mod buffer_pool;
pub mod compare;
pub mod content;
pub mod entry;
pub mod fd_queue;
pub mod filter;
pub mod symlink;

pub use buffer_pool::{BufferLease, BufferPool};
pub use compare::CompareEngine;
pub use content::{ByteContentCompare, ContentCompare, LineContentCompare};
pub use entry::Entry;
pub use fd_queue::{FdPair, FdQueue};
pub use filter::EntryFilter;
pub use symlink::SymlinkCache;

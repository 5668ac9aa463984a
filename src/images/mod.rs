//! Images Module
//!
//! Coalescing image cache with FIFO eviction and a throttled preload queue.

mod entry;
mod fifo;
mod preload;
mod source;
mod store;

pub use entry::{ImageCacheEntry, ImageKey, ImageKind, SizeVariant};
pub use fifo::FifoTracker;
pub use preload::{PreloadConfig, PreloadQueue, PreloadStats};
pub use source::{HttpImageSource, ImageSource};
pub use store::{ImageCache, ImageCacheConfig, ImageCacheStats};

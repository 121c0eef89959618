//! # firstfit - A First-Fit Free-List Allocator
//!
//! This crate provides a **first-fit allocator** that manages a grow-only
//! memory region as a list of variable-size blocks, reusing released blocks
//! before it asks for more memory.
//!
//! ## Overview
//!
//! Every block, free or allocated, is kept in a single list ordered by
//! address:
//!
//! ```text
//!   Block List:
//!
//!   ┌──────────────────────────────────────────────────────────────────────┐
//!   │                           REGION                                     │
//!   │                                                                      │
//!   │   ┌──────┬──────┬──────────┬──────┬────────────┐                     │
//!   │   │ A1   │ free │   A2     │ free │    A3      │                     │
//!   │   └──────┴──────┴──────────┴──────┴────────────┘                     │
//!   │      ◄──►   ◄──►    ◄──►     ◄──►                 ▲                  │
//!   │       next / prev links in address order          │                  │
//!   │                                                 Break                │
//!   │                                              (grows only)            │
//!   └──────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! - **Allocate**: walk the list, take the first free block that fits and
//!   split off the surplus when it can hold a block of its own. If nothing
//!   fits, extend the region and append a block at the tail.
//! - **Release**: mark the block free, merge it with a free successor, then
//!   merge it into a free predecessor. Two free blocks are never adjacent.
//! - **Resize**: keep the block when it is big enough, grow over a free
//!   successor when that suffices, otherwise move and copy.
//!
//! ## Crate Structure
//!
//! ```text
//!   firstfit
//!   ├── align          - Alignment macro and helpers (align!, align_up)
//!   ├── block          - Block metadata table and list links
//!   ├── config         - HeapConfig (figment + validator)
//!   ├── error          - HeapError, RegionError, ConfigError
//!   ├── event          - Event sinks (tracing, JSON lines)
//!   ├── fragmentation  - Read-only free-space diagnostics
//!   ├── heap           - Heap: allocate / release / resize
//!   └── region         - The extension primitive (Vec or mmap backed)
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use firstfit::{ArenaRegion, Heap};
//!
//! let mut heap = Heap::new(ArenaRegion::new(1 << 20));
//!
//! let handle = heap.allocate(100).unwrap().unwrap();
//! heap.payload_mut(handle).unwrap()[..5].copy_from_slice(b"hello");
//!
//! let grown = heap.resize(handle, 400).unwrap().unwrap();
//! assert_eq!(&heap.payload(grown).unwrap()[..5], b"hello");
//!
//! heap.release(grown).unwrap();
//! println!("{}", heap.analyze());
//! ```
//!
//! ## Block Layout
//!
//! Block metadata lives in a side table rather than inside the region, and
//! handles are validated against it. The region still reserves a header's
//! worth of bytes in front of every payload:
//!
//! ```text
//!   Single Block:
//!   ┌───────────────────────┬────────────────────────────────┐
//!   │  Reserved Header      │         Payload                │
//!   │  ┌─────────────────┐  │                                │
//!   │  │ size: N         │  │  ┌──────────────────────────┐  │
//!   │  │ is_free         │  │  │                          │  │
//!   │  │ next / prev     │  │  │  N bytes usable (N % 8)  │  │
//!   │  └─────────────────┘  │  │                          │  │
//!   │      32 bytes         │  └──────────────────────────┘  │
//!   └───────────────────────┴────────────────────────────────┘
//!                           ▲
//!                           └── Handle offset
//! ```
//!
//! ## Limitations
//!
//! - **Single-threaded only**: every mutating call takes `&mut self`
//! - **Never shrinks**: the region is not returned, and resize never shrinks
//!   a block
//! - **No size classes**: one list, first fit

pub mod align;
mod block;
pub mod config;
pub mod error;
pub mod event;
pub mod fragmentation;
pub mod heap;
pub mod region;

pub use block::HEADER_SIZE;
pub use config::{Backend, HeapConfig};
pub use error::{ConfigError, HeapError, RegionError, UnknownBackend};
pub use event::{EventSink, HeapEvent, JsonLinesSink, Operation, TracingSink};
pub use fragmentation::FragmentationReport;
pub use heap::{BlockInfo, Handle, Heap, HeapStats};
#[cfg(unix)]
pub use region::MmapRegion;
pub use region::{ArenaRegion, Region};

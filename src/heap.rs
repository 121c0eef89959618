use std::fmt;

use tracing::{debug, trace, warn};
use validator::Validate;

use crate::{
  align::align_up,
  block::{Block, BlockId, BlockList, HEADER_SIZE},
  config::HeapConfig,
  error::{ConfigError, HeapError},
  event::{EventSink, HeapEvent, JsonLinesSink, Operation},
  region::Region,
};

/// Opaque reference to an allocation.
///
/// Carries the payload offset and the generation stamped on the block when it
/// was handed out, so a handle kept after its allocation was released is
/// rejected instead of aliasing whatever reuses the bytes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[must_use]
pub struct Handle {
  offset: usize,
  generation: u64,
}

impl Handle {
  /// Offset of the first payload byte within the region.
  pub fn offset(&self) -> usize {
    self.offset
  }

  pub fn generation(&self) -> u64 {
    self.generation
  }
}

impl fmt::Display for Handle {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    write!(f, "Handle(off={}, gen={})", self.offset, self.generation)
  }
}

/// A copy of one block's metadata, for inspection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockInfo {
  pub offset: usize,
  pub payload_offset: usize,
  pub size: usize,
  pub is_free: bool,
}

impl From<&Block> for BlockInfo {
  fn from(block: &Block) -> Self {
    Self {
      offset: block.offset,
      payload_offset: block.payload_offset(),
      size: block.size,
      is_free: block.is_free,
    }
  }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HeapStats {
  /// Bytes taken from the region so far.
  pub region_bytes: usize,
  pub block_count: usize,
  pub allocated_bytes: usize,
  pub free_bytes: usize,
}

/// First-fit allocator over a grow-only [`Region`].
///
/// Every block, free or allocated, sits in one address-ordered list. Requests
/// are served by the first free block large enough, splitting off the surplus
/// when it can hold a block of its own; releases merge with free neighbours
/// on both sides. The region is extended only when nothing fits.
pub struct Heap<R: Region> {
  region: R,
  blocks: BlockList,
  min_split_payload: usize,
  analyze_each_op: bool,
  next_generation: u64,
  sink: Option<Box<dyn EventSink>>,
}

impl<R: Region> Heap<R> {
  pub fn new(region: R) -> Self {
    Self {
      region,
      blocks: BlockList::new(),
      min_split_payload: HeapConfig::DEFAULT_MIN_SPLIT_PAYLOAD,
      analyze_each_op: false,
      next_generation: 1,
      sink: None,
    }
  }

  /// Applies the tuning knobs of `config` and opens its event log.
  ///
  /// The config is validated first, since its fields can be set directly.
  /// An event log that cannot be opened is reported and skipped.
  pub fn with_config(
    region: R,
    config: &HeapConfig,
  ) -> Result<Self, ConfigError> {
    config.validate()?;

    let mut heap = Self::new(region);
    heap.min_split_payload = config.min_split_payload;
    heap.analyze_each_op = config.analyze_each_op;

    if let Some(path) = &config.event_log {
      match JsonLinesSink::create(path) {
        Ok(sink) => heap.sink = Some(Box::new(sink)),
        Err(error) => warn!(%error, path = %path.display(), "cannot open event log"),
      }
    }

    Ok(heap)
  }

  /// Replaces the event sink.
  pub fn with_sink(
    mut self,
    sink: impl EventSink + 'static,
  ) -> Self {
    self.sink = Some(Box::new(sink));
    self
  }

  pub fn region(&self) -> &R {
    &self.region
  }

  pub(crate) fn block_list(&self) -> &BlockList {
    &self.blocks
  }

  /// Every block in address order.
  pub fn blocks(&self) -> impl Iterator<Item = BlockInfo> + '_ {
    self.blocks.iter().map(|(_, block)| BlockInfo::from(block))
  }

  pub fn stats(&self) -> HeapStats {
    self.blocks.iter().fold(
      HeapStats {
        region_bytes: self.region.brk(),
        block_count: self.blocks.len(),
        ..HeapStats::default()
      },
      |mut stats, (_, block)| {
        if block.is_free {
          stats.free_bytes += block.size;
        } else {
          stats.allocated_bytes += block.size;
        }
        stats
      },
    )
  }

  /// Allocates at least `size` bytes.
  ///
  /// Returns `Ok(None)` for a zero-sized request.
  pub fn allocate(
    &mut self,
    size: usize,
  ) -> Result<Option<Handle>, HeapError> {
    if size == 0 {
      return Ok(None);
    }

    let id = self.allocate_block(size)?;
    let handle = self.handle_of(id);

    self.after_op(HeapEvent {
      op: Operation::Alloc,
      size,
      offset: handle.offset,
      block_size: self.blocks[id].size,
    });

    Ok(Some(handle))
  }

  /// Returns an allocation to the heap. Releasing `None` does nothing.
  pub fn release(
    &mut self,
    handle: impl Into<Option<Handle>>,
  ) -> Result<(), HeapError> {
    let Some(handle) = handle.into() else {
      return Ok(());
    };

    let id = self.resolve(handle)?;
    let size = self.blocks[id].size;
    let merged = self.release_block(id);

    self.after_op(HeapEvent {
      op: Operation::Free,
      size,
      offset: handle.offset,
      block_size: self.blocks[merged].size,
    });

    Ok(())
  }

  /// Grows an allocation to hold at least `new_size` bytes.
  ///
  /// A `None` handle allocates and a zero `new_size` releases. Allocations
  /// never shrink. When the block has to move, the old contents are copied
  /// and the old block is released; if no memory can be found, the original
  /// allocation is left untouched.
  pub fn resize(
    &mut self,
    handle: impl Into<Option<Handle>>,
    new_size: usize,
  ) -> Result<Option<Handle>, HeapError> {
    let Some(handle) = handle.into() else {
      return self.allocate(new_size);
    };

    if new_size == 0 {
      self.release(handle)?;
      return Ok(None);
    }

    let id = self.resolve(handle)?;
    let old_size = self.blocks[id].size;

    let resized = if old_size >= new_size {
      trace!(offset = handle.offset, old_size, new_size, "resize fits in place");
      handle
    } else if self.absorb_free_next(id, new_size) {
      trace!(offset = handle.offset, old_size, size = self.blocks[id].size, "resize grew in place");
      handle
    } else {
      let new_id = self.allocate_block(new_size).inspect_err(|error| {
        warn!(%error, offset = handle.offset, new_size, "resize failed, allocation kept");
      })?;

      let from = self.blocks[id].payload_offset();
      let to = self.blocks[new_id].payload_offset();
      self
        .region
        .bytes_mut()
        .copy_within(from..from + old_size.min(new_size), to);
      self.release_block(id);

      debug!(from, to, old_size, new_size, "resize moved allocation");
      self.handle_of(new_id)
    };

    let block_size = self.blocks[self.resolve(resized)?].size;
    self.after_op(HeapEvent {
      op: Operation::Realloc,
      size: new_size,
      offset: resized.offset,
      block_size,
    });

    Ok(Some(resized))
  }

  /// The usable bytes of an allocation. May be longer than requested.
  pub fn payload(
    &self,
    handle: Handle,
  ) -> Result<&[u8], HeapError> {
    let block = &self.blocks[self.resolve(handle)?];
    let start = block.payload_offset();
    Ok(&self.region.bytes()[start..start + block.size])
  }

  pub fn payload_mut(
    &mut self,
    handle: Handle,
  ) -> Result<&mut [u8], HeapError> {
    let block = &self.blocks[self.resolve(handle)?];
    let (start, end) = (block.payload_offset(), block.end());
    Ok(&mut self.region.bytes_mut()[start..end])
  }

  /// Usable size of an allocation.
  pub fn usable_size(
    &self,
    handle: Handle,
  ) -> Result<usize, HeapError> {
    Ok(self.blocks[self.resolve(handle)?].size)
  }

  fn resolve(
    &self,
    handle: Handle,
  ) -> Result<BlockId, HeapError> {
    let Some(id) = self.blocks.lookup(handle.offset) else {
      warn!(offset = handle.offset, "rejected unknown handle");
      return Err(HeapError::InvalidHandle {
        offset: handle.offset,
      });
    };

    let block = &self.blocks[id];
    if block.is_free || block.generation != handle.generation {
      warn!(offset = handle.offset, "rejected stale handle");
      return Err(HeapError::StaleHandle {
        offset: handle.offset,
      });
    }

    Ok(id)
  }

  fn handle_of(
    &self,
    id: BlockId,
  ) -> Handle {
    let block = &self.blocks[id];
    Handle {
      offset: block.payload_offset(),
      generation: block.generation,
    }
  }

  fn find_first_fit(
    &self,
    size: usize,
  ) -> Option<BlockId> {
    self
      .blocks
      .iter()
      .find(|(_, block)| block.is_free && block.size >= size)
      .map(|(id, _)| id)
  }

  /// Picks or creates a block for `size` bytes and marks it allocated.
  fn allocate_block(
    &mut self,
    requested: usize,
  ) -> Result<BlockId, HeapError> {
    let size = align_up(requested)
      .filter(|size| size.checked_add(HEADER_SIZE).is_some())
      .ok_or(HeapError::TooLarge { requested })?;

    let id = match self.find_first_fit(size) {
      Some(id) => {
        self.split_surplus(id, size);
        id
      }
      None => self.extend(size)?,
    };

    let block = &mut self.blocks[id];
    block.is_free = false;
    block.generation = self.next_generation;
    self.next_generation += 1;

    Ok(id)
  }

  /// Carves the tail of a free block off as a new free block, if the
  /// surplus can hold a header plus the minimum payload.
  fn split_surplus(
    &mut self,
    id: BlockId,
    size: usize,
  ) {
    let surplus = self.blocks[id].size - size;
    if surplus < HEADER_SIZE + self.min_split_payload {
      return;
    }

    let carved = self.blocks.split(id, size);
    trace!(
      offset = self.blocks[id].offset,
      size,
      carved_size = self.blocks[carved].size,
      "split free block"
    );
  }

  /// Appends a block of `size` payload bytes at the end of the region.
  fn extend(
    &mut self,
    size: usize,
  ) -> Result<BlockId, HeapError> {
    let increment = size + HEADER_SIZE;

    let old_brk = self.region.extend(increment).inspect_err(|error| {
      warn!(%error, increment, "region extension failed");
    })?;

    debug!(old_brk, increment, "extended region");
    let id = self.blocks.push_back(Block::new(old_brk, size, true));

    if let Some(sink) = self.sink.as_mut() {
      sink.record(&HeapEvent {
        op: Operation::Extend,
        size: increment,
        offset: old_brk,
        block_size: size,
      });
    }

    Ok(id)
  }

  /// Marks a block free and merges it with free neighbours, next first.
  ///
  /// Returns the block that now holds the released bytes.
  fn release_block(
    &mut self,
    id: BlockId,
  ) -> BlockId {
    self.blocks[id].is_free = true;

    if let Some(next) = self.blocks[id].next {
      if self.blocks[next].is_free {
        self.blocks.absorb_next(id);
        trace!(offset = self.blocks[id].offset, size = self.blocks[id].size, "merged next");
      }
    }

    if let Some(prev) = self.blocks[id].prev {
      if self.blocks[prev].is_free {
        self.blocks.absorb_next(prev);
        trace!(offset = self.blocks[prev].offset, size = self.blocks[prev].size, "merged into previous");
        return prev;
      }
    }

    id
  }

  /// Grows `id` over its free successor when that yields `new_size` bytes.
  fn absorb_free_next(
    &mut self,
    id: BlockId,
    new_size: usize,
  ) -> bool {
    let block = &self.blocks[id];
    let Some(next) = block.next else {
      return false;
    };

    let neighbour = &self.blocks[next];
    if !neighbour.is_free || block.size + HEADER_SIZE + neighbour.size < new_size {
      return false;
    }

    self.blocks.absorb_next(id);
    true
  }

  fn after_op(
    &mut self,
    event: HeapEvent,
  ) {
    if let Some(sink) = self.sink.as_mut() {
      sink.record(&event);
    }

    if self.analyze_each_op {
      let report = self.analyze();
      debug!(%report, "after {:?}", event.op);
      if let Some(sink) = self.sink.as_mut() {
        sink.snapshot(&report);
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use std::{cell::RefCell, rc::Rc};

  use super::*;
  use crate::{fragmentation::FragmentationReport, region::ArenaRegion};

  fn heap() -> Heap<ArenaRegion> {
    Heap::new(ArenaRegion::new(1 << 16))
  }

  fn layout(heap: &Heap<ArenaRegion>) -> Vec<(usize, bool)> {
    heap.blocks().map(|block| (block.size, block.is_free)).collect()
  }

  #[derive(Clone, Default)]
  struct Recorder {
    events: Rc<RefCell<Vec<HeapEvent>>>,
    snapshots: Rc<RefCell<Vec<FragmentationReport>>>,
  }

  impl EventSink for Recorder {
    fn record(
      &mut self,
      event: &HeapEvent,
    ) {
      self.events.borrow_mut().push(event.clone());
    }

    fn snapshot(
      &mut self,
      report: &FragmentationReport,
    ) {
      self.snapshots.borrow_mut().push(*report);
    }
  }

  #[test]
  fn test_zero_size_is_null_handle() {
    let mut heap = heap();

    assert_eq!(heap.allocate(0).unwrap(), None);
    assert_eq!(heap.region().brk(), 0);
  }

  #[test]
  fn test_alloc_rounds_and_extends() {
    let mut heap = heap();

    let first = heap.allocate(13).unwrap().unwrap();
    let second = heap.allocate(8).unwrap().unwrap();

    assert_eq!(first.offset(), HEADER_SIZE);
    assert_eq!(second.offset(), HEADER_SIZE + 16 + HEADER_SIZE);
    assert_eq!(heap.region().brk(), 2 * HEADER_SIZE + 16 + 8);
    assert_eq!(layout(&heap), vec![(16, false), (8, false)]);
  }

  #[test]
  fn test_reuses_released_block() {
    let mut heap = heap();

    let first = heap.allocate(64).unwrap().unwrap();
    heap.release(first).unwrap();
    let again = heap.allocate(64).unwrap().unwrap();

    assert_eq!(again.offset(), first.offset());
    assert_ne!(again, first);
    assert_eq!(heap.stats().block_count, 1);
  }

  #[test]
  fn test_split_leaves_free_remainder() {
    let mut heap = heap();

    let a = heap.allocate(100).unwrap().unwrap();
    let _b = heap.allocate(200).unwrap().unwrap();
    heap.release(a).unwrap();
    let c = heap.allocate(50).unwrap().unwrap();

    assert_eq!(c.offset(), a.offset());
    assert_eq!(
      layout(&heap),
      vec![(56, false), (104 - 56 - HEADER_SIZE, true), (200, false)]
    );
  }

  #[test]
  fn test_small_surplus_is_not_split() {
    let mut heap = heap();

    let a = heap.allocate(64).unwrap().unwrap();
    let _b = heap.allocate(8).unwrap().unwrap();
    heap.release(a).unwrap();
    // 32 bytes of surplus cannot hold a header plus the minimum payload.
    let c = heap.allocate(32).unwrap().unwrap();

    assert_eq!(heap.usable_size(c).unwrap(), 64);
    assert_eq!(layout(&heap), vec![(64, false), (8, false)]);
  }

  #[test]
  fn test_configured_split_threshold() {
    let config = HeapConfig {
      min_split_payload: 64,
      ..HeapConfig::with_capacity(1 << 16)
    };
    let mut heap = Heap::with_config(ArenaRegion::new(1 << 16), &config).unwrap();

    let a = heap.allocate(128).unwrap().unwrap();
    let _b = heap.allocate(8).unwrap().unwrap();
    heap.release(a).unwrap();
    let _c = heap.allocate(40).unwrap().unwrap();

    assert_eq!(layout(&heap), vec![(128, false), (8, false)]);
  }

  #[test]
  fn test_unvalidated_split_threshold_rejected() {
    for min_split_payload in [0, 4, 12, 8192] {
      let config = HeapConfig {
        min_split_payload,
        ..HeapConfig::with_capacity(1 << 16)
      };

      let result = Heap::with_config(ArenaRegion::new(1 << 16), &config);

      assert!(
        matches!(result, Err(ConfigError::Validation(_))),
        "min_split_payload {min_split_payload}"
      );
    }
  }

  #[test]
  fn test_default_threshold_never_carves_empty_block() {
    let mut heap = Heap::with_config(ArenaRegion::new(1 << 16), &HeapConfig::with_capacity(1 << 16)).unwrap();

    let a = heap.allocate(64).unwrap().unwrap();
    let _b = heap.allocate(8).unwrap().unwrap();
    heap.release(a).unwrap();
    let _c = heap.allocate(32).unwrap().unwrap();

    assert_eq!(layout(&heap), vec![(64, false), (8, false)]);
  }

  #[test]
  fn test_release_merges_both_sides() {
    let mut heap = heap();

    let a = heap.allocate(8).unwrap().unwrap();
    let b = heap.allocate(16).unwrap().unwrap();
    let c = heap.allocate(24).unwrap().unwrap();
    let _d = heap.allocate(8).unwrap().unwrap();

    heap.release(a).unwrap();
    heap.release(c).unwrap();
    heap.release(b).unwrap();

    assert_eq!(
      layout(&heap),
      vec![(8 + 16 + 24 + 2 * HEADER_SIZE, true), (8, false)]
    );
  }

  #[test]
  fn test_release_null_is_noop() {
    let mut heap = heap();

    heap.release(None::<Handle>).unwrap();

    assert_eq!(heap.stats(), HeapStats::default());
  }

  #[test]
  fn test_double_release_is_rejected() {
    let mut heap = heap();

    let a = heap.allocate(8).unwrap().unwrap();
    let _b = heap.allocate(8).unwrap().unwrap();
    heap.release(a).unwrap();

    assert!(matches!(
      heap.release(a),
      Err(HeapError::StaleHandle { .. })
    ));
  }

  #[test]
  fn test_stale_handle_after_reuse() {
    let mut heap = heap();

    let a = heap.allocate(8).unwrap().unwrap();
    heap.release(a).unwrap();
    let b = heap.allocate(8).unwrap().unwrap();

    assert_eq!(a.offset(), b.offset());
    assert!(matches!(
      heap.payload(a),
      Err(HeapError::StaleHandle { .. })
    ));
    assert!(heap.payload(b).is_ok());
  }

  #[test]
  fn test_merged_away_handle_is_invalid() {
    let mut heap = heap();

    let a = heap.allocate(8).unwrap().unwrap();
    let b = heap.allocate(8).unwrap().unwrap();
    let _c = heap.allocate(8).unwrap().unwrap();
    heap.release(a).unwrap();
    heap.release(b).unwrap();

    assert!(matches!(
      heap.release(b),
      Err(HeapError::InvalidHandle { .. })
    ));
  }

  #[test]
  fn test_out_of_memory_leaves_heap_untouched() {
    let mut heap = Heap::new(ArenaRegion::new(128));

    let a = heap.allocate(64).unwrap().unwrap();
    let before = layout(&heap);

    assert!(matches!(
      heap.allocate(64),
      Err(HeapError::OutOfMemory(_))
    ));
    assert_eq!(layout(&heap), before);
    assert!(heap.payload(a).is_ok());
  }

  #[test]
  fn test_too_large_request() {
    let mut heap = heap();

    assert!(matches!(
      heap.allocate(usize::MAX),
      Err(HeapError::TooLarge { .. })
    ));
    assert!(matches!(
      heap.allocate(usize::MAX - HEADER_SIZE),
      Err(HeapError::TooLarge { .. })
    ));
  }

  #[test]
  fn test_resize_null_allocates() {
    let mut heap = heap();

    let handle = heap.resize(None::<Handle>, 40).unwrap().unwrap();

    assert_eq!(heap.usable_size(handle).unwrap(), 40);
  }

  #[test]
  fn test_resize_to_zero_releases() {
    let mut heap = heap();

    let a = heap.allocate(40).unwrap().unwrap();

    assert_eq!(heap.resize(a, 0).unwrap(), None);
    assert_eq!(layout(&heap), vec![(40, true)]);
  }

  #[test]
  fn test_resize_never_shrinks() {
    let mut heap = heap();

    let a = heap.allocate(256).unwrap().unwrap();
    let same = heap.resize(a, 16).unwrap().unwrap();

    assert_eq!(same, a);
    assert_eq!(layout(&heap), vec![(256, false)]);
  }

  #[test]
  fn test_resize_absorbs_free_next() {
    let mut heap = heap();

    let a = heap.allocate(16).unwrap().unwrap();
    let b = heap.allocate(64).unwrap().unwrap();
    let _c = heap.allocate(8).unwrap().unwrap();
    heap.release(b).unwrap();
    let brk = heap.region().brk();

    let grown = heap.resize(a, 100).unwrap().unwrap();

    assert_eq!(grown, a);
    assert_eq!(heap.region().brk(), brk);
    assert_eq!(layout(&heap), vec![(16 + HEADER_SIZE + 64, false), (8, false)]);
  }

  #[test]
  fn test_resize_moves_and_copies() {
    let mut heap = heap();

    let a = heap.allocate(16).unwrap().unwrap();
    let _b = heap.allocate(8).unwrap().unwrap();
    heap.payload_mut(a).unwrap().copy_from_slice(b"0123456789abcdef");

    let moved = heap.resize(a, 64).unwrap().unwrap();

    assert_ne!(moved.offset(), a.offset());
    assert_eq!(&heap.payload(moved).unwrap()[..16], b"0123456789abcdef");
    assert_eq!(layout(&heap), vec![(16, true), (8, false), (64, false)]);
  }

  #[test]
  fn test_resize_failure_keeps_original() {
    let mut heap = Heap::new(ArenaRegion::new(HEADER_SIZE + 16));

    let a = heap.allocate(16).unwrap().unwrap();
    heap.payload_mut(a).unwrap().fill(7);

    assert!(matches!(
      heap.resize(a, 32),
      Err(HeapError::OutOfMemory(_))
    ));
    assert_eq!(heap.payload(a).unwrap(), &[7; 16]);
  }

  #[test]
  fn test_events_reach_sink() {
    let recorder = Recorder::default();
    let mut heap = heap().with_sink(recorder.clone());

    let a = heap.allocate(10).unwrap().unwrap();
    heap.release(a).unwrap();

    let ops: Vec<Operation> = recorder.events.borrow().iter().map(|e| e.op).collect();
    assert_eq!(ops, vec![Operation::Extend, Operation::Alloc, Operation::Free]);
    assert!(recorder.snapshots.borrow().is_empty());
  }

  #[test]
  fn test_snapshots_after_each_op() {
    let recorder = Recorder::default();
    let config = HeapConfig {
      analyze_each_op: true,
      ..HeapConfig::with_capacity(1 << 16)
    };
    let mut heap = Heap::with_config(ArenaRegion::new(1 << 16), &config)
      .unwrap()
      .with_sink(recorder.clone());

    let a = heap.allocate(10).unwrap().unwrap();
    let _b = heap.allocate(10).unwrap().unwrap();
    heap.release(a).unwrap();

    let snapshots = recorder.snapshots.borrow();
    assert_eq!(snapshots.len(), 3);
    assert!(!snapshots[1].has_free_space());
    assert_eq!(snapshots[2].total_free, 16);
    assert_eq!(snapshots[2].index(), Some(0.0));
  }

  #[test]
  fn test_config_event_log_receives_json_lines() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("events.jsonl");
    let config = HeapConfig {
      event_log: Some(path.clone()),
      analyze_each_op: true,
      ..HeapConfig::with_capacity(1 << 16)
    };
    let mut heap = Heap::with_config(ArenaRegion::new(1 << 16), &config).unwrap();

    let a = heap.allocate(10).unwrap().unwrap();
    heap.release(a).unwrap();

    let lines: Vec<serde_json::Value> = std::fs::read_to_string(&path)
      .unwrap()
      .lines()
      .map(|line| serde_json::from_str(line).unwrap())
      .collect();
    let kinds: Vec<(&str, &str)> = lines
      .iter()
      .map(|line| (line["kind"].as_str().unwrap(), line["op"].as_str().unwrap_or("-")))
      .collect();

    assert_eq!(
      kinds,
      vec![
        ("event", "extend"),
        ("event", "alloc"),
        ("fragmentation", "-"),
        ("event", "free"),
        ("fragmentation", "-"),
      ]
    );
    assert_eq!(lines[1]["offset"], a.offset());
    assert_eq!(lines[4]["free_blocks"], 1);
  }

  #[test]
  fn test_unopenable_event_log_keeps_heap_working() {
    let dir = tempfile::tempdir().unwrap();
    let config = HeapConfig {
      event_log: Some(dir.path().join("missing").join("events.jsonl")),
      ..HeapConfig::with_capacity(1 << 16)
    };

    let mut heap = Heap::with_config(ArenaRegion::new(1 << 16), &config).unwrap();
    assert!(heap.sink.is_none());

    let a = heap.allocate(100).unwrap().unwrap();
    heap.payload_mut(a).unwrap().fill(0xAB);
    heap.release(a).unwrap();

    assert_eq!(heap.analyze().free_blocks, 1);
    assert!(!dir.path().join("missing").exists());
  }
}

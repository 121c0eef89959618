//! Block metadata and the address-ordered block list.
//!
//! Headers do not live inside the managed bytes. Each block's metadata sits
//! in a slot of [`BlockList`], and the list links are slot indices instead of
//! raw pointers. The region still reserves [`HEADER_SIZE`] bytes in front of
//! every payload, so the layout arithmetic matches an intrusive header:
//!
//! ```text
//!   offset          payload_offset                 end
//!     │                  │                          │
//!     ▼                  ▼                          ▼
//!     ┌──────────────────┬──────────────────────────┬──────────── ─ ─
//!     │  header (32 B)   │     size bytes usable    │ next block
//!     └──────────────────┴──────────────────────────┴──────────── ─ ─
//! ```

use std::collections::HashMap;
use std::ops::{Index, IndexMut};

/// Bytes reserved in front of every payload: size, state and two links,
/// one machine word each.
pub const HEADER_SIZE: usize = 32;

/// Index of a slot in the [`BlockList`] table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BlockId(usize);

impl BlockId {
  fn index(self) -> usize {
    self.0
  }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Block {
  /// Offset of the (reserved) header within the region.
  pub offset: usize,
  /// Usable payload bytes, header excluded.
  pub size: usize,
  pub is_free: bool,
  /// Stamp of the allocation currently occupying the block.
  pub generation: u64,
  pub next: Option<BlockId>,
  pub prev: Option<BlockId>,
}

impl Block {
  pub fn new(
    offset: usize,
    size: usize,
    is_free: bool,
  ) -> Self {
    Self {
      offset,
      size,
      is_free,
      generation: 0,
      next: None,
      prev: None,
    }
  }

  pub fn payload_offset(&self) -> usize {
    self.offset + HEADER_SIZE
  }

  /// First byte past the payload, which is where the next block starts.
  pub fn end(&self) -> usize {
    self.payload_offset() + self.size
  }
}

/// Doubly-linked list of every block in the region, ordered by offset.
///
/// Slots vacated by merges are recycled for later blocks. Payload offsets
/// are indexed so a caller's handle resolves without walking the list.
#[derive(Debug, Default)]
pub struct BlockList {
  slots: Vec<Option<Block>>,
  vacant: Vec<BlockId>,
  by_payload: HashMap<usize, BlockId>,
  head: Option<BlockId>,
  tail: Option<BlockId>,
  len: usize,
}

impl BlockList {
  pub fn new() -> Self {
    Self::default()
  }

  #[cfg(test)]
  pub fn head(&self) -> Option<BlockId> {
    self.head
  }

  #[cfg(test)]
  pub fn tail(&self) -> Option<BlockId> {
    self.tail
  }

  pub fn len(&self) -> usize {
    self.len
  }

  /// Finds the block whose payload starts at `payload_offset`.
  pub fn lookup(
    &self,
    payload_offset: usize,
  ) -> Option<BlockId> {
    self.by_payload.get(&payload_offset).copied()
  }

  /// Appends a block after the current tail.
  pub fn push_back(
    &mut self,
    mut block: Block,
  ) -> BlockId {
    block.prev = self.tail;
    block.next = None;

    let id = self.occupy(block);

    match self.tail {
      Some(tail) => self[tail].next = Some(id),
      None => self.head = Some(id),
    }
    self.tail = Some(id);

    id
  }

  /// Shrinks `id` to `size` payload bytes and links the remainder as a new
  /// free block right after it.
  ///
  /// The caller guarantees `self[id].size >= size + HEADER_SIZE`.
  pub fn split(
    &mut self,
    id: BlockId,
    size: usize,
  ) -> BlockId {
    let (offset, remainder, next) = {
      let block = &self[id];
      debug_assert!(block.size >= size + HEADER_SIZE);
      (
        block.payload_offset() + size,
        block.size - size - HEADER_SIZE,
        block.next,
      )
    };

    let mut carved = Block::new(offset, remainder, true);
    carved.prev = Some(id);
    carved.next = next;
    let carved_id = self.occupy(carved);

    match next {
      Some(next) => self[next].prev = Some(carved_id),
      None => self.tail = Some(carved_id),
    }

    let block = &mut self[id];
    block.size = size;
    block.next = Some(carved_id);

    carved_id
  }

  /// Merges the successor of `id` into `id`, header included.
  ///
  /// Returns the absorbed block's metadata, or `None` when `id` is the tail.
  pub fn absorb_next(
    &mut self,
    id: BlockId,
  ) -> Option<Block> {
    let next_id = self[id].next?;
    let absorbed = self.vacate(next_id);

    match absorbed.next {
      Some(after) => self[after].prev = Some(id),
      None => self.tail = Some(id),
    }

    let block = &mut self[id];
    block.size += HEADER_SIZE + absorbed.size;
    block.next = absorbed.next;

    Some(absorbed)
  }

  /// Walks the list from head to tail.
  pub fn iter(&self) -> Iter<'_> {
    Iter {
      list: self,
      cursor: self.head,
    }
  }

  fn occupy(
    &mut self,
    block: Block,
  ) -> BlockId {
    let payload = block.payload_offset();
    let id = match self.vacant.pop() {
      Some(id) => {
        self.slots[id.index()] = Some(block);
        id
      }
      None => {
        let id = BlockId(self.slots.len());
        self.slots.push(Some(block));
        id
      }
    };
    self.by_payload.insert(payload, id);
    self.len += 1;
    id
  }

  fn vacate(
    &mut self,
    id: BlockId,
  ) -> Block {
    let block = self.slots[id.index()]
      .take()
      .unwrap_or_else(|| panic!("block {id:?} is not live"));
    self.by_payload.remove(&block.payload_offset());
    self.vacant.push(id);
    self.len -= 1;
    block
  }
}

/// # Panics
///
/// Panics if `id` refers to a slot vacated by a merge.
impl Index<BlockId> for BlockList {
  type Output = Block;

  fn index(
    &self,
    id: BlockId,
  ) -> &Block {
    self.slots[id.index()]
      .as_ref()
      .unwrap_or_else(|| panic!("block {id:?} is not live"))
  }
}

impl IndexMut<BlockId> for BlockList {
  fn index_mut(
    &mut self,
    id: BlockId,
  ) -> &mut Block {
    self.slots[id.index()]
      .as_mut()
      .unwrap_or_else(|| panic!("block {id:?} is not live"))
  }
}

pub struct Iter<'a> {
  list: &'a BlockList,
  cursor: Option<BlockId>,
}

impl<'a> Iterator for Iter<'a> {
  type Item = (BlockId, &'a Block);

  fn next(&mut self) -> Option<Self::Item> {
    let id = self.cursor?;
    let list = self.list;
    let block = &list[id];
    self.cursor = block.next;
    Some((id, block))
  }
}

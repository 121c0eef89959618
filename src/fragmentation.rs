//! Read-only fragmentation diagnostics.

use std::fmt;

use serde::Serialize;

use crate::{block::BlockList, heap::Heap, region::Region};

/// Summary of the free space in a heap at one point in time.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct FragmentationReport {
  /// Sum of the payload sizes of all free blocks.
  pub total_free: usize,
  /// Payload size of the largest free block.
  pub largest_free: usize,
  /// Number of free blocks.
  pub free_blocks: usize,
}

impl FragmentationReport {
  /// Scans every block from head to tail.
  pub(crate) fn scan(blocks: &BlockList) -> Self {
    blocks
      .iter()
      .filter(|(_, block)| block.is_free)
      .fold(Self::default(), |report, (_, block)| Self {
        total_free: report.total_free + block.size,
        largest_free: report.largest_free.max(block.size),
        free_blocks: report.free_blocks + 1,
      })
  }

  pub fn has_free_space(&self) -> bool {
    self.total_free > 0
  }

  /// `(total_free - largest_free) / total_free`, in `[0, 1)`.
  ///
  /// Zero means all free space is a single run. `None` when nothing is free.
  pub fn index(&self) -> Option<f64> {
    if !self.has_free_space() {
      return None;
    }

    Some((self.total_free - self.largest_free) as f64 / self.total_free as f64)
  }
}

impl fmt::Display for FragmentationReport {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    match self.index() {
      None => write!(f, "no free blocks"),
      Some(index) => write!(
        f,
        "fragmentation {index:.4}: {} free bytes in {} blocks, largest {}",
        self.total_free, self.free_blocks, self.largest_free
      ),
    }
  }
}

impl<R: Region> Heap<R> {
  /// Reports how scattered the free space is. Never mutates the heap.
  pub fn analyze(&self) -> FragmentationReport {
    FragmentationReport::scan(self.block_list())
  }
}

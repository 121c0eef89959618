//! Optional observers of heap activity.
//!
//! Sinks are fire-and-forget: they cannot report failures back to the heap,
//! and a heap without a sink behaves exactly like one with a sink.

use std::{
  fs::{File, OpenOptions},
  io::{self, BufWriter, Write},
  path::Path,
};

use serde::Serialize;
use tracing::{info, warn};

use crate::fragmentation::FragmentationReport;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
  Alloc,
  Free,
  Realloc,
  Extend,
}

/// One mutating step of the heap.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HeapEvent {
  pub op: Operation,
  /// Bytes requested by the caller, or added to the region for `extend`.
  pub size: usize,
  /// Payload offset of the affected block, or the old break for `extend`.
  pub offset: usize,
  /// Payload size of the affected block after the operation.
  pub block_size: usize,
}

pub trait EventSink {
  fn record(
    &mut self,
    event: &HeapEvent,
  );

  fn snapshot(
    &mut self,
    _report: &FragmentationReport,
  ) {
  }
}

/// Forwards events to `tracing` at `info` level.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
  fn record(
    &mut self,
    event: &HeapEvent,
  ) {
    info!(
      op = ?event.op,
      size = event.size,
      offset = event.offset,
      block_size = event.block_size,
      "heap event"
    );
  }

  fn snapshot(
    &mut self,
    report: &FragmentationReport,
  ) {
    match report.index() {
      None => info!("no free blocks"),
      Some(index) => info!(
        index,
        total_free = report.total_free,
        largest_free = report.largest_free,
        free_blocks = report.free_blocks,
        "fragmentation"
      ),
    }
  }
}

#[derive(Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
enum Line<'a> {
  Event(&'a HeapEvent),
  Fragmentation {
    total_free: usize,
    largest_free: usize,
    free_blocks: usize,
    index: Option<f64>,
  },
}

/// Appends one JSON object per event or snapshot to a log file.
///
/// The first write failure is logged; later ones are dropped silently.
pub struct JsonLinesSink {
  writer: BufWriter<File>,
  failed: bool,
}

impl JsonLinesSink {
  pub fn create(path: &Path) -> io::Result<Self> {
    let file = OpenOptions::new().create(true).append(true).open(path)?;

    Ok(Self {
      writer: BufWriter::new(file),
      failed: false,
    })
  }

  fn write_line(
    &mut self,
    line: &Line<'_>,
  ) {
    if self.failed {
      return;
    }

    let result = serde_json::to_writer(&mut self.writer, line)
      .map_err(io::Error::from)
      .and_then(|()| self.writer.write_all(b"\n"))
      .and_then(|()| self.writer.flush());

    if let Err(error) = result {
      warn!(%error, "event log write failed, disabling event log");
      self.failed = true;
    }
  }
}

impl EventSink for JsonLinesSink {
  fn record(
    &mut self,
    event: &HeapEvent,
  ) {
    self.write_line(&Line::Event(event));
  }

  fn snapshot(
    &mut self,
    report: &FragmentationReport,
  ) {
    self.write_line(&Line::Fragmentation {
      total_free: report.total_free,
      largest_free: report.largest_free,
      free_blocks: report.free_blocks,
      index: report.index(),
    });
  }
}

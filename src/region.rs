//! The address-space-extension primitive.
//!
//! A [`Region`] is a run of bytes that only ever grows at its end, like the
//! program break moved by `sbrk(2)`. The heap asks for more bytes exactly when
//! no free block fits a request and never gives any back.

#[cfg(unix)]
use std::{io, ptr::NonNull, slice};

use crate::error::RegionError;

pub trait Region {
  /// Current end of the region: the number of bytes handed out so far.
  fn brk(&self) -> usize;

  /// Upper bound the break may reach.
  fn capacity(&self) -> usize;

  /// Moves the break forward by `increment` bytes and returns the previous
  /// break, which is where the new bytes start.
  fn extend(
    &mut self,
    increment: usize,
  ) -> Result<usize, RegionError>;

  /// The bytes below the break.
  fn bytes(&self) -> &[u8];

  fn bytes_mut(&mut self) -> &mut [u8];
}

fn exhausted(
  requested: usize,
  brk: usize,
  capacity: usize,
) -> RegionError {
  RegionError::Exhausted {
    requested,
    available: capacity - brk,
    capacity,
  }
}

/// A region backed by a `Vec<u8>` that refuses to grow past `capacity`.
#[derive(Debug)]
pub struct ArenaRegion {
  data: Vec<u8>,
  capacity: usize,
}

impl ArenaRegion {
  pub fn new(capacity: usize) -> Self {
    Self {
      data: Vec::new(),
      capacity,
    }
  }
}

impl Region for ArenaRegion {
  fn brk(&self) -> usize {
    self.data.len()
  }

  fn capacity(&self) -> usize {
    self.capacity
  }

  fn extend(
    &mut self,
    increment: usize,
  ) -> Result<usize, RegionError> {
    let old_brk = self.data.len();

    if increment > self.capacity - old_brk {
      return Err(exhausted(increment, old_brk, self.capacity));
    }

    self.data.resize(old_brk + increment, 0);

    Ok(old_brk)
  }

  fn bytes(&self) -> &[u8] {
    &self.data
  }

  fn bytes_mut(&mut self) -> &mut [u8] {
    &mut self.data
  }
}

/// A region carved out of one anonymous `mmap(2)` reservation.
///
/// The whole reservation is mapped up front; the kernel only commits pages
/// once they are touched, so moving the break is bookkeeping. The mapping is
/// released when the region is dropped.
#[cfg(unix)]
#[derive(Debug)]
pub struct MmapRegion {
  base: NonNull<u8>,
  capacity: usize,
  brk: usize,
}

#[cfg(unix)]
impl MmapRegion {
  pub fn reserve(capacity: usize) -> Result<Self, RegionError> {
    let address = unsafe {
      libc::mmap(
        std::ptr::null_mut(),
        capacity,
        libc::PROT_READ | libc::PROT_WRITE,
        libc::MAP_PRIVATE | libc::MAP_ANONYMOUS,
        -1,
        0,
      )
    };

    if address == libc::MAP_FAILED {
      return Err(RegionError::Map {
        size: capacity,
        source: io::Error::last_os_error(),
      });
    }

    let base = NonNull::new(address as *mut u8).ok_or_else(|| RegionError::Map {
      size: capacity,
      source: io::Error::other("mmap returned a null mapping"),
    })?;

    Ok(Self {
      base,
      capacity,
      brk: 0,
    })
  }

  /// Address of the first byte of the reservation.
  pub fn as_ptr(&self) -> *const u8 {
    self.base.as_ptr()
  }
}

#[cfg(unix)]
impl Region for MmapRegion {
  fn brk(&self) -> usize {
    self.brk
  }

  fn capacity(&self) -> usize {
    self.capacity
  }

  fn extend(
    &mut self,
    increment: usize,
  ) -> Result<usize, RegionError> {
    if increment > self.capacity - self.brk {
      return Err(exhausted(increment, self.brk, self.capacity));
    }

    let old_brk = self.brk;
    self.brk += increment;

    Ok(old_brk)
  }

  fn bytes(&self) -> &[u8] {
    unsafe { slice::from_raw_parts(self.base.as_ptr(), self.brk) }
  }

  fn bytes_mut(&mut self) -> &mut [u8] {
    unsafe { slice::from_raw_parts_mut(self.base.as_ptr(), self.brk) }
  }
}

#[cfg(unix)]
impl Drop for MmapRegion {
  fn drop(&mut self) {
    unsafe {
      libc::munmap(self.base.as_ptr() as *mut libc::c_void, self.capacity);
    }
  }
}

use std::{io::Read, path::PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use firstfit::{ArenaRegion, Backend, Handle, Heap, HeapConfig, Region, TracingSink};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
  name = "walkthrough",
  about = "Step through a first-fit heap: allocate, release, split, merge, grow"
)]
struct Cli {
  /// Optional YAML configuration file
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Override the configured backend (arena or mmap)
  #[arg(long)]
  backend: Option<Backend>,

  /// Wait for ENTER between steps
  #[arg(long)]
  step: bool,
}

/// Waits until the user presses ENTER.
/// Useful to inspect the process with `pmap` or `gdb` between steps.
fn block_until_enter_pressed(enabled: bool) {
  if enabled {
    println!("\n>>> Press ENTER to continue...");
    let _ = std::io::stdin().bytes().next();
  }
}

fn print_heap<R: Region>(
  label: &str,
  heap: &Heap<R>,
) {
  println!(
    "[{}] break = {} of {} bytes",
    label,
    heap.region().brk(),
    heap.region().capacity()
  );
  for block in heap.blocks() {
    println!(
      "    @{:>6}  {:>6} bytes  {}",
      block.payload_offset,
      block.size,
      if block.is_free { "free" } else { "used" }
    );
  }
  println!("    {}", heap.analyze());
}

fn print_alloc(
  label: &str,
  size: usize,
  handle: Handle,
) {
  println!("\n[{label}] Allocated {size} bytes at offset {}", handle.offset());
}

fn allocate<R: Region>(
  heap: &mut Heap<R>,
  size: usize,
) -> Result<Handle> {
  heap
    .allocate(size)?
    .with_context(|| format!("no handle returned for {size} bytes"))
}

/// Logs events through `tracing` unless the config asks for a JSON event log.
fn build<R: Region>(
  region: R,
  config: &HeapConfig,
) -> Result<Heap<R>> {
  let heap = Heap::with_config(region, config)?;
  Ok(match config.event_log {
    Some(_) => heap,
    None => heap.with_sink(TracingSink),
  })
}

fn run<R: Region>(
  mut heap: Heap<R>,
  step: bool,
) -> Result<()> {
  print_heap("start", &heap);
  block_until_enter_pressed(step);

  // 1) Two fresh blocks extend the region.
  let first = allocate(&mut heap, 100)?;
  print_alloc("1", 100, first);
  let second = allocate(&mut heap, 200)?;
  print_alloc("1", 200, second);
  heap.payload_mut(second)?[..4].copy_from_slice(&0xDEADBEEFu32.to_le_bytes());
  print_heap("1", &heap);
  block_until_enter_pressed(step);

  // 2) The released block is reused and split for a smaller request.
  heap.release(first)?;
  println!("\n[2] Released offset {}", first.offset());
  let third = allocate(&mut heap, 50)?;
  print_alloc("2", 50, third);
  println!(
    "[2] third == first? {}",
    if third.offset() == first.offset() {
      "Yes, it reused the released block"
    } else {
      "No, it allocated somewhere else"
    }
  );
  print_heap("2", &heap);
  block_until_enter_pressed(step);

  // 3) Growing past the block moves it and keeps the contents.
  let grown = heap
    .resize(second, 1024)?
    .context("resize to a non-zero size returned no handle")?;
  let word = u32::from_le_bytes(heap.payload(grown)?[..4].try_into()?);
  println!(
    "\n[3] Resized offset {} to 1024 bytes at offset {}, first word = 0x{word:X}",
    second.offset(),
    grown.offset()
  );
  print_heap("3", &heap);
  block_until_enter_pressed(step);

  // 4) Releasing everything merges the free space back into one run.
  heap.release(grown)?;
  heap.release(third)?;
  println!("\n[4] Released remaining allocations");
  print_heap("4", &heap);

  Ok(())
}

fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .init();

  let cli = Cli::parse();
  let mut config = HeapConfig::load(cli.config.as_deref())?;
  if let Some(backend) = cli.backend {
    config.backend = backend;
  }

  match config.backend {
    Backend::Arena => {
      run(build(ArenaRegion::new(config.capacity), &config)?, cli.step)
    }
    #[cfg(unix)]
    Backend::Mmap => {
      let region = firstfit::MmapRegion::reserve(config.capacity)?;
      run(build(region, &config)?, cli.step)
    }
    #[cfg(not(unix))]
    Backend::Mmap => anyhow::bail!("the mmap backend needs a unix target"),
  }
}

//! Available-memory probing for the merge ceiling.

use sysinfo::System;

const BYTES_PER_MB: u128 = 1024 * 1024;

/// Source of the currently available system memory.
pub trait MemorySource {
    fn available_bytes(&self) -> u64;
}

/// Reads live memory figures from the operating system.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemMemory;

impl MemorySource for SystemMemory {
    fn available_bytes(&self) -> u64 {
        let mut system = System::new();
        system.refresh_memory();
        system.available_memory()
    }
}

/// Reports a fixed amount of available memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedMemory(pub u64);

impl MemorySource for FixedMemory {
    fn available_bytes(&self) -> u64 {
        self.0
    }
}

/// Merge memory ceiling in MB: 75% of what `source` reports as available.
pub fn memory_ceiling_mb(source: &dyn MemorySource) -> u64 {
    let available = u128::from(source.available_bytes());
    // Fits: u64::MAX * 3 / 4 / 2^20 < u64::MAX.
    (available * 3 / 4 / BYTES_PER_MB) as u64
}

use serde::{Deserialize, Serialize};

use crate::error::FlagError;

/// Opaque handle to one pooled flag object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FlagHandle(pub u32);

/// Fixed set of pre-allocated flag objects. Only tracks free/in-use.
#[derive(Debug, Clone)]
pub struct FlagPool {
    in_use: Vec<bool>,
    /// Free handle indices, popped from the back.
    free: Vec<u32>,
}

impl FlagPool {
    /// Handles are `u32`; a larger request is clamped to `u32::MAX`.
    pub fn new(capacity: usize) -> Self {
        let capacity = u32::try_from(capacity).unwrap_or_else(|_| {
            tracing::warn!(requested = capacity, "Flag pool capacity clamped to u32::MAX");
            u32::MAX
        });
        Self {
            in_use: vec![false; capacity as usize],
            // Reversed so handles come out in ascending order.
            free: (0..capacity).rev().collect(),
        }
    }

    /// Hand out a free flag, or report exhaustion.
    pub fn acquire(&mut self) -> Result<FlagHandle, FlagError> {
        let Some(index) = self.free.pop() else {
            return Err(FlagError::CapacityExceeded {
                what: "flag pool",
                capacity: self.capacity(),
            });
        };
        self.in_use[index as usize] = true;
        Ok(FlagHandle(index))
    }

    /// Return a flag. Releasing a free or foreign handle is ignored.
    pub fn release(&mut self, handle: FlagHandle) {
        match self.in_use.get_mut(handle.0 as usize) {
            Some(slot) if *slot => {
                *slot = false;
                self.free.push(handle.0);
            },
            _ => tracing::debug!(handle = handle.0, "Ignored release of unowned flag handle"),
        }
    }

    pub fn is_acquired(&self, handle: FlagHandle) -> bool {
        self.in_use.get(handle.0 as usize).copied().unwrap_or(false)
    }

    pub fn capacity(&self) -> usize {
        self.in_use.len()
    }

    pub fn free(&self) -> usize {
        self.free.len()
    }

    pub fn acquired(&self) -> usize {
        self.capacity() - self.free()
    }
}

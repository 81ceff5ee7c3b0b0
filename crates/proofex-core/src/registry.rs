//! Opaque handle registry.
//!
//! Owns live instances and hands out [`Handle`]s for them. A handle is a slot
//! index paired with the slot's generation at allocation time; releasing a
//! slot bumps its generation, so a stale handle never resolves, even after the
//! slot has been reused.
//!
//! # Locking
//!
//! Two levels, never nested the other way round:
//!
//! - The slot table sits behind a `std::sync::Mutex`. It is held only for the
//!   duration of a table lookup or update and never across an `.await`.
//! - Each instance sits behind its own `tokio::sync::Mutex`. Callers lock it
//!   for the whole operation, so a second operation on the same handle queues
//!   behind the first. Operations on distinct handles never contend.
//!
//! Releasing removes the entry from the table immediately. An operation that
//! already resolved the handle finishes on its own reference; every later
//! resolution fails.

use std::{
    fmt,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use thiserror::Error;
use tracing::trace;

/// First generation of every slot. Raw handle 0 therefore never resolves.
const FIRST_GENERATION: u32 = 1;

/// Opaque generation-checked handle.
///
/// The default value has never been allocated and fails to resolve.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Handle(u64);

impl Handle {
    fn new(index: u32, generation: u32) -> Self {
        Self((u64::from(generation) << 32) | u64::from(index))
    }

    /// Rebuild a handle from its raw value.
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw value, suitable for crossing an API boundary.
    pub const fn into_raw(self) -> u64 {
        self.0
    }

    fn index(self) -> usize {
        (self.0 & u64::from(u32::MAX)) as usize
    }

    fn generation(self) -> u32 {
        (self.0 >> 32) as u32
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Registry errors.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum HandleError {
    /// Handle was never allocated, or has been released
    #[error("handle {0} does not resolve to a live instance")]
    InvalidHandle(u64),
}

struct Slot<T> {
    generation: u32,
    entry: Option<Arc<tokio::sync::Mutex<T>>>,
}

struct Slots<T> {
    slots: Vec<Slot<T>>,
    free: Vec<usize>,
    live: usize,
}

/// Registry of live instances addressed by [`Handle`].
pub struct HandleRegistry<T> {
    inner: Mutex<Slots<T>>,
}

impl<T> HandleRegistry<T> {
    /// Empty registry.
    pub fn new() -> Self {
        Self { inner: Mutex::new(Slots { slots: Vec::new(), free: Vec::new(), live: 0 }) }
    }

    // A panic while holding the table lock cannot leave a slot half-written:
    // every update is a single field assignment.
    fn table(&self) -> MutexGuard<'_, Slots<T>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Take ownership of `value` and return its handle.
    pub fn allocate(&self, value: T) -> Handle {
        let entry = Some(Arc::new(tokio::sync::Mutex::new(value)));
        let mut table = self.table();
        table.live += 1;

        let handle = if let Some(index) = table.free.pop() {
            let slot = &mut table.slots[index];
            slot.entry = entry;
            Handle::new(index as u32, slot.generation)
        } else {
            let index = table.slots.len();
            table.slots.push(Slot { generation: FIRST_GENERATION, entry });
            Handle::new(index as u32, FIRST_GENERATION)
        };

        trace!(%handle, "allocated");
        handle
    }

    /// Shared reference to the instance behind `handle`.
    ///
    /// # Errors
    ///
    /// `InvalidHandle` if the handle was never allocated or has been released.
    pub fn resolve(&self, handle: Handle) -> Result<Arc<tokio::sync::Mutex<T>>, HandleError> {
        self.table()
            .slots
            .get(handle.index())
            .filter(|slot| slot.generation == handle.generation())
            .and_then(|slot| slot.entry.clone())
            .ok_or(HandleError::InvalidHandle(handle.into_raw()))
    }

    /// Whether `handle` currently resolves.
    pub fn contains(&self, handle: Handle) -> bool {
        self.resolve(handle).is_ok()
    }

    /// Drop the registry's ownership of the instance behind `handle`.
    ///
    /// # Errors
    ///
    /// `InvalidHandle` if the handle does not resolve.
    pub fn release(&self, handle: Handle) -> Result<(), HandleError> {
        let mut table = self.table();
        let slot = table
            .slots
            .get_mut(handle.index())
            .filter(|slot| slot.generation == handle.generation() && slot.entry.is_some())
            .ok_or(HandleError::InvalidHandle(handle.into_raw()))?;

        slot.entry = None;
        // A slot whose generation would wrap is retired so no old handle can
        // resolve to it again.
        match slot.generation.checked_add(1) {
            Some(generation) => {
                slot.generation = generation;
                table.free.push(handle.index());
            },
            None => trace!(%handle, "slot retired"),
        }
        table.live -= 1;

        trace!(%handle, "released");
        Ok(())
    }

    /// Number of live instances.
    pub fn len(&self) -> usize {
        self.table().live
    }

    /// True if nothing is live.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Handles of all live instances, in slot order.
    pub fn handles(&self) -> Vec<Handle> {
        self.table()
            .slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.entry.is_some())
            .map(|(index, slot)| Handle::new(index as u32, slot.generation))
            .collect()
    }
}

impl<T> Default for HandleRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for HandleRegistry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandleRegistry").field("live", &self.len()).finish()
    }
}

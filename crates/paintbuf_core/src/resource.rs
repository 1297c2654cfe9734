//! Shared-resource arena backing finalizable records.
//!
//! Inline records are plain bytes, so payloads whose in-memory form owns
//! reference-counted resources park those resources here and embed the
//! returned [`ResourceSlot`] in their payload instead. The owning buffer
//! keeps track of which records attached slots and releases them exactly
//! once, in record address order, on `clear()` or drop.

use crate::error::{BufferError, BufferResult};
use crate::types::ResourceSlot;
use parking_lot::Mutex;
use std::any::Any;
use std::sync::Arc;

/// A reference-counted resource parked outside the byte stream.
pub type Resource = Arc<dyn Any + Send + Sync>;

/// Append-only arena of parked resources.
///
/// Slot release is idempotent: releasing a slot twice drops the resource
/// exactly once.
#[derive(Default)]
pub struct ResourceArena {
    slots: Mutex<Vec<Option<Resource>>>,
}

impl ResourceArena {
    /// Creates an empty arena.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parks `resource` and returns its slot.
    pub(crate) fn attach(&self, resource: Resource) -> ResourceSlot {
        let mut slots = self.slots.lock();
        let slot = ResourceSlot::new(slots.len() as u32);
        slots.push(Some(resource));
        slot
    }

    /// Returns a clone of the resource parked in `slot`.
    ///
    /// # Errors
    ///
    /// Returns [`BufferError::MissingResource`] if the slot was never
    /// attached or has already been released.
    pub fn get(&self, slot: ResourceSlot) -> BufferResult<Resource> {
        self.slots
            .lock()
            .get(slot.index())
            .and_then(Option::clone)
            .ok_or(BufferError::MissingResource { slot })
    }

    /// Drops the resource parked in `slot`, if still resident.
    ///
    /// Returns `true` if this call released the resource.
    pub(crate) fn release(&self, slot: ResourceSlot) -> bool {
        self.slots
            .lock()
            .get_mut(slot.index())
            .and_then(Option::take)
            .is_some()
    }

    /// Number of resources still resident.
    #[must_use]
    pub fn resident_count(&self) -> usize {
        self.slots.lock().iter().filter(|s| s.is_some()).count()
    }

    /// Drops all remaining resources and forgets all slots.
    pub(crate) fn reset(&self) {
        self.slots.lock().clear();
    }
}

impl std::fmt::Debug for ResourceArena {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceArena")
            .field("resident_count", &self.resident_count())
            .finish_non_exhaustive()
    }
}

/// Write-side arena view handed to [`crate::Item::write_payload`].
///
/// Records every slot the current record attaches, so the buffer can
/// register them for later finalization.
pub struct ResourceWriter<'a> {
    arena: &'a ResourceArena,
    attached: Vec<ResourceSlot>,
}

impl<'a> ResourceWriter<'a> {
    /// Creates a writer view over `arena`.
    #[must_use]
    pub fn new(arena: &'a ResourceArena) -> Self {
        Self {
            arena,
            attached: Vec::new(),
        }
    }

    /// Parks `resource` for the record being written and returns the slot to
    /// embed in its payload.
    pub fn attach<T: Any + Send + Sync>(&mut self, resource: Arc<T>) -> ResourceSlot {
        let slot = self.arena.attach(resource);
        self.attached.push(slot);
        slot
    }

    pub(crate) fn into_attached(self) -> Vec<ResourceSlot> {
        self.attached
    }
}

/// Read-side arena view handed to [`crate::Item::read_payload`].
pub struct ResourceReader<'a> {
    arena: &'a ResourceArena,
}

impl<'a> ResourceReader<'a> {
    /// Creates a reader view over `arena`.
    #[must_use]
    pub fn new(arena: &'a ResourceArena) -> Self {
        Self { arena }
    }

    /// Fetches the typed resource parked in `slot`.
    ///
    /// # Errors
    ///
    /// Returns [`BufferError::MissingResource`] for released slots and
    /// [`BufferError::ResourceTypeMismatch`] if the slot holds a different
    /// type (possible with a corrupt payload).
    pub fn get<T: Any + Send + Sync>(&self, slot: ResourceSlot) -> BufferResult<Arc<T>> {
        let resource = self.arena.get(slot)?;
        resource
            .downcast::<T>()
            .map_err(|_| BufferError::ResourceTypeMismatch { slot })
    }
}

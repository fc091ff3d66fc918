/// Objects that can be recycled by a [`Pool`].
pub trait Poolable: Default {
    /// Clears the object before it is handed out again.
    fn reset(&mut self);
}

/// Handle to an object obtained from a [`Pool`]. Stale after `release`.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct PoolHandle {
    index: usize,
    generation: u32,
}

#[derive(Debug)]
struct PoolSlot<T> {
    value: T,
    generation: u32,
    in_use: bool,
}

/// Arena with explicit `obtain` / `release`. Released objects are kept for reuse; handles carry
/// a generation so a released handle never reaches the recycled object.
#[derive(Debug)]
pub struct Pool<T: Poolable> {
    slots: Vec<PoolSlot<T>>,
    free: Vec<usize>,
}

impl<T: Poolable> Default for Pool<T> {
    fn default() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
        }
    }
}

impl<T: Poolable> Pool<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn obtain(&mut self) -> PoolHandle {
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index];
            slot.in_use = true;
            slot.value.reset();
            return PoolHandle {
                index,
                generation: slot.generation,
            };
        }

        self.slots.push(PoolSlot {
            value: T::default(),
            generation: 0,
            in_use: true,
        });
        PoolHandle {
            index: self.slots.len() - 1,
            generation: 0,
        }
    }

    /// Returns the object to the pool. Returns false for stale handles.
    pub fn release(&mut self, handle: PoolHandle) -> bool {
        let Some(slot) = self.live_slot_mut(handle) else {
            return false;
        };
        slot.in_use = false;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(handle.index);
        true
    }

    pub fn get(&self, handle: PoolHandle) -> Option<&T> {
        self.slots
            .get(handle.index)
            .filter(|slot| slot.in_use && slot.generation == handle.generation)
            .map(|slot| &slot.value)
    }

    pub fn get_mut(&mut self, handle: PoolHandle) -> Option<&mut T> {
        self.live_slot_mut(handle).map(|slot| &mut slot.value)
    }

    /// Objects currently handed out.
    pub fn in_use(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    /// Objects allocated so far, in use or free.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    fn live_slot_mut(&mut self, handle: PoolHandle) -> Option<&mut PoolSlot<T>> {
        self.slots
            .get_mut(handle.index)
            .filter(|slot| slot.in_use && slot.generation == handle.generation)
    }
}

/// Clip mask polygon for an object bound inside a clip region.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ClipMask {
    /// Slot of the clipping attachment.
    pub clip_slot: usize,
    /// World vertices of the clip polygon.
    pub polygon: Vec<f32>,
}

impl Poolable for ClipMask {
    fn reset(&mut self) {
        self.clip_slot = 0;
        self.polygon.clear();
    }
}

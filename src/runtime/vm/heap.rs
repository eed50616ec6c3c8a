use crate::error::LifecycleError;
use crate::guest::{ContextBuilder, GuestContext, GuestValue};

/// Handle to an object on the VM heap.
///
/// A reference stays valid until it is deleted or its VM is destroyed; a
/// slot that has been reused answers with a newer generation, so stale
/// references are detected instead of aliasing the new occupant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectRef {
    vm: u64,
    index: u32,
    generation: u32,
}

impl ObjectRef {
    pub fn vm_id(&self) -> u64 {
        self.vm
    }
}

#[derive(Debug)]
pub(crate) enum HeapObject {
    Double(f64),
    String(String),
    Array(Vec<ObjectRef>),
    ContextBuilder(ContextBuilder),
    Context(GuestContext),
    Value(GuestValue),
}

impl HeapObject {
    pub(crate) fn class_name(&self) -> &'static str {
        match self {
            HeapObject::Double(_) => "host/lang/Double",
            HeapObject::String(_) => "host/lang/String",
            HeapObject::Array(_) => "[Lhost/lang/Object;",
            HeapObject::ContextBuilder(_) => "polyglot/Context$Builder",
            HeapObject::Context(_) => "polyglot/Context",
            HeapObject::Value(_) => "polyglot/Value",
        }
    }
}

#[derive(Debug)]
struct Slot {
    generation: u32,
    object: Option<HeapObject>,
}

/// Slot storage for the objects handed out through the control interface.
///
/// Freed slots are reused through a free list before the storage grows.
#[derive(Debug)]
pub(crate) struct Heap {
    vm: u64,
    slots: Vec<Slot>,
    free_list: Vec<u32>,
    total_allocations: usize,
}

impl Heap {
    pub(crate) fn new(vm: u64) -> Self {
        Self {
            vm,
            slots: Vec::new(),
            free_list: Vec::new(),
            total_allocations: 0,
        }
    }

    pub(crate) fn alloc(&mut self, object: HeapObject) -> ObjectRef {
        self.total_allocations += 1;
        if let Some(index) = self.free_list.pop() {
            let slot = &mut self.slots[index as usize];
            slot.object = Some(object);
            ObjectRef {
                vm: self.vm,
                index,
                generation: slot.generation,
            }
        } else {
            let index = self.slots.len() as u32;
            self.slots.push(Slot {
                generation: 0,
                object: Some(object),
            });
            ObjectRef {
                vm: self.vm,
                index,
                generation: 0,
            }
        }
    }

    pub(crate) fn get(&self, object: ObjectRef) -> Result<&HeapObject, LifecycleError> {
        if object.vm != self.vm {
            return Err(LifecycleError::StaleObject);
        }
        self.slots
            .get(object.index as usize)
            .filter(|slot| slot.generation == object.generation)
            .and_then(|slot| slot.object.as_ref())
            .ok_or(LifecycleError::StaleObject)
    }

    pub(crate) fn get_mut(&mut self, object: ObjectRef) -> Result<&mut HeapObject, LifecycleError> {
        if object.vm != self.vm {
            return Err(LifecycleError::StaleObject);
        }
        self.slots
            .get_mut(object.index as usize)
            .filter(|slot| slot.generation == object.generation)
            .and_then(|slot| slot.object.as_mut())
            .ok_or(LifecycleError::StaleObject)
    }

    /// Frees the slot. Deleting a stale reference is an error.
    pub(crate) fn delete(&mut self, object: ObjectRef) -> Result<HeapObject, LifecycleError> {
        self.get(object)?;
        let slot = &mut self.slots[object.index as usize];
        let freed = slot.object.take().ok_or(LifecycleError::StaleObject)?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free_list.push(object.index);
        Ok(freed)
    }

    pub(crate) fn live_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.object.is_some()).count()
    }

    pub(crate) fn total_allocations(&self) -> usize {
        self.total_allocations
    }

    /// Drops every object; all outstanding references become stale.
    pub(crate) fn clear(&mut self) {
        for (index, slot) in self.slots.iter_mut().enumerate() {
            if slot.object.take().is_some() {
                slot.generation = slot.generation.wrapping_add(1);
                self.free_list.push(index as u32);
            }
        }
    }
}

#[cfg(test)]
#[path = "heap_test.rs"]
mod heap_test;

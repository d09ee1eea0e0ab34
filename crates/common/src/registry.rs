use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

/// Opaque, typed reference into a [`Registry`].
///
/// A handle is only meaningful for the registry that issued it. Handles carry
/// a generation so a handle to a removed entry never resolves to whatever
/// reuses its slot.
pub struct Handle<T> {
    index: u32,
    generation: u32,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Handle<T> {
    fn new(index: u32, generation: u32) -> Self {
        Self {
            index,
            generation,
            _marker: PhantomData,
        }
    }

    pub fn index(&self) -> u32 {
        self.index
    }
}

impl<T> Clone for Handle<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Handle<T> {}

impl<T> PartialEq for Handle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index && self.generation == other.generation
    }
}

impl<T> Eq for Handle<T> {}

impl<T> Hash for Handle<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.index.hash(state);
        self.generation.hash(state);
    }
}

impl<T> fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handle({}v{})", self.index, self.generation)
    }
}

/// Errors from resolving a handle.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("{kind} handle {index} is out of range")]
    OutOfRange { kind: &'static str, index: u32 },
    #[error("{kind} handle {index} refers to a removed entry")]
    Stale { kind: &'static str, index: u32 },
}

struct Slot<T> {
    generation: u32,
    value: Option<T>,
}

/// Arena owning every instance of one asset kind.
///
/// Values live in the registry until removed or until the registry drops;
/// everything else refers to them by [`Handle`].
pub struct Registry<T> {
    kind: &'static str,
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
    len: usize,
}

impl<T> Registry<T> {
    /// Create an empty registry. `kind` names the asset kind in errors.
    pub fn new(kind: &'static str) -> Self {
        Self {
            kind,
            slots: Vec::new(),
            free: Vec::new(),
            len: 0,
        }
    }

    pub fn kind(&self) -> &'static str {
        self.kind
    }

    /// Take ownership of `value` and return its handle.
    pub fn insert(&mut self, value: T) -> Handle<T> {
        self.len += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.value = Some(value);
            return Handle::new(index, slot.generation);
        }
        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            value: Some(value),
        });
        Handle::new(index, 0)
    }

    pub fn get(&self, handle: Handle<T>) -> Result<&T, RegistryError> {
        let slot = self.slot(handle)?;
        slot.value.as_ref().ok_or(RegistryError::Stale {
            kind: self.kind,
            index: handle.index,
        })
    }

    pub fn get_mut(&mut self, handle: Handle<T>) -> Result<&mut T, RegistryError> {
        let kind = self.kind;
        let slot = self
            .slots
            .get_mut(handle.index as usize)
            .ok_or(RegistryError::OutOfRange {
                kind,
                index: handle.index,
            })?;
        if slot.generation != handle.generation {
            return Err(RegistryError::Stale {
                kind,
                index: handle.index,
            });
        }
        slot.value.as_mut().ok_or(RegistryError::Stale {
            kind,
            index: handle.index,
        })
    }

    /// Remove and return the value. The handle (and copies of it) go stale.
    pub fn remove(&mut self, handle: Handle<T>) -> Result<T, RegistryError> {
        self.get(handle)?;
        let slot = &mut self.slots[handle.index as usize];
        let value = slot.value.take().ok_or(RegistryError::Stale {
            kind: self.kind,
            index: handle.index,
        })?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(handle.index);
        self.len -= 1;
        Ok(value)
    }

    pub fn contains(&self, handle: Handle<T>) -> bool {
        self.get(handle).is_ok()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Live entries in insertion-slot order.
    pub fn iter(&self) -> impl Iterator<Item = (Handle<T>, &T)> {
        self.slots.iter().enumerate().filter_map(|(i, slot)| {
            slot.value
                .as_ref()
                .map(|v| (Handle::new(i as u32, slot.generation), v))
        })
    }

    fn slot(&self, handle: Handle<T>) -> Result<&Slot<T>, RegistryError> {
        let slot = self
            .slots
            .get(handle.index as usize)
            .ok_or(RegistryError::OutOfRange {
                kind: self.kind,
                index: handle.index,
            })?;
        if slot.generation != handle.generation {
            return Err(RegistryError::Stale {
                kind: self.kind,
                index: handle.index,
            });
        }
        Ok(slot)
    }
}

impl<T: fmt::Debug> fmt::Debug for Registry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// Shared handle to a registered resource. Every holder sees the same instance.
pub type Handle<T> = Rc<RefCell<T>>;

/// A value a [`ResourceRegistry`] can hold.
pub trait Resource {
    /// Registry kind used in diagnostics and event sources.
    const KIND: &'static str;

    /// Immediately usable stand-in until the real data arrives.
    fn placeholder(name: &str) -> Self;

    /// Release whatever the value owns. Called once, when the last holder releases it.
    fn free(&mut self);
}

/// Outcome of [`ResourceRegistry::release`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Release {
    /// Still held; carries the remaining refcount.
    Retained(u32),
    /// Refcount reached zero; the handle was freed and the entry removed.
    Freed,
    /// The name was not registered.
    Missing,
}

#[derive(Debug)]
struct ResourceEntry<T> {
    handle: Handle<T>,
    refcount: u32,
}

/// Name-keyed, reference-counted resource table.
///
/// Entries are created in their placeholder state on first acquisition and
/// removed the moment their refcount drops to zero.
#[derive(Debug)]
pub struct ResourceRegistry<T: Resource> {
    entries: HashMap<String, ResourceEntry<T>>,
}

impl<T: Resource> Default for ResourceRegistry<T> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<T: Resource> ResourceRegistry<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire `name`, creating a placeholder on first use.
    pub fn acquire(&mut self, name: &str) -> Handle<T> {
        self.acquire_with_status(name).0
    }

    /// Like [`acquire`](Self::acquire), also reporting whether the entry was created.
    pub fn acquire_with_status(&mut self, name: &str) -> (Handle<T>, bool) {
        if let Some(entry) = self.entries.get_mut(name) {
            entry.refcount += 1;
            tracing::trace!(kind = T::KIND, name, refcount = entry.refcount, "acquire");
            return (Rc::clone(&entry.handle), false);
        }
        let handle = Rc::new(RefCell::new(T::placeholder(name)));
        self.entries.insert(
            name.to_string(),
            ResourceEntry {
                handle: Rc::clone(&handle),
                refcount: 1,
            },
        );
        tracing::debug!(kind = T::KIND, name, "registered placeholder");
        (handle, true)
    }

    /// Drop one reference to `name`, freeing it when none remain.
    pub fn release(&mut self, name: &str) -> Release {
        let Some(entry) = self.entries.get_mut(name) else {
            tracing::warn!(kind = T::KIND, name, "release of unregistered resource");
            return Release::Missing;
        };
        entry.refcount = entry.refcount.saturating_sub(1);
        if entry.refcount > 0 {
            return Release::Retained(entry.refcount);
        }
        if let Some(entry) = self.entries.remove(name) {
            entry.handle.borrow_mut().free();
        }
        tracing::debug!(kind = T::KIND, name, "freed");
        Release::Freed
    }

    pub fn get(&self, name: &str) -> Option<Handle<T>> {
        self.entries.get(name).map(|e| Rc::clone(&e.handle))
    }

    pub fn refcount(&self, name: &str) -> Option<u32> {
        self.entries.get(name).map(|e| e.refcount)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Free every entry regardless of refcount.
    pub fn clear(&mut self) {
        for (_, entry) in self.entries.drain() {
            entry.handle.borrow_mut().free();
        }
    }
}

//! Bounded registry of live socket handles
//!
//! Only sockets opened through `tcp-connect` are legal targets for status,
//! send, receive and close. The registry is a dense, ordered list: new
//! handles are appended at the tail and removal shifts trailing entries left.

use parking_lot::Mutex;
use std::fmt;

/// Handle of an open transport socket, as seen by scripts.
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct SocketHandle(i32);

impl SocketHandle {
    /// Wrap a raw handle value
    pub const fn from_raw(raw: i32) -> Self {
        SocketHandle(raw)
    }

    /// Raw handle value
    pub const fn as_raw(self) -> i32 {
        self.0
    }
}

impl fmt::Debug for SocketHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sock#{}", self.0)
    }
}

impl fmt::Display for SocketHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Fixed-capacity table of valid socket handles.
///
/// Thread-safe: the poller thread reads it while the scheduler mutates it.
pub struct SocketRegistry {
    handles: Mutex<Vec<SocketHandle>>,
    capacity: usize,
}

impl SocketRegistry {
    /// Create an empty registry holding at most `capacity` handles.
    pub fn new(capacity: usize) -> Self {
        Self {
            handles: Mutex::new(Vec::with_capacity(capacity)),
            capacity,
        }
    }

    /// Append a handle. Fails without mutating if full or already present.
    pub fn register(&self, handle: SocketHandle) -> bool {
        let mut handles = self.handles.lock();
        if handles.len() >= self.capacity || handles.contains(&handle) {
            return false;
        }
        handles.push(handle);
        true
    }

    /// Check whether a handle is currently registered.
    pub fn is_valid(&self, handle: SocketHandle) -> bool {
        handle.as_raw() >= 0 && self.handles.lock().contains(&handle)
    }

    /// Remove a handle, compacting the entries behind it.
    pub fn unregister(&self, handle: SocketHandle) -> bool {
        let mut handles = self.handles.lock();
        match handles.iter().position(|&h| h == handle) {
            Some(index) => {
                handles.remove(index);
                true
            }
            None => false,
        }
    }

    /// Check whether another handle can be registered.
    pub fn is_full(&self) -> bool {
        self.handles.lock().len() >= self.capacity
    }

    /// Number of registered handles
    pub fn len(&self) -> usize {
        self.handles.lock().len()
    }

    /// Check if no handles are registered
    pub fn is_empty(&self) -> bool {
        self.handles.lock().is_empty()
    }

    /// Maximum number of handles
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Snapshot of the registered handles, in registration order
    pub fn handles(&self) -> Vec<SocketHandle> {
        self.handles.lock().clone()
    }

    /// Remove and return every handle.
    pub fn drain(&self) -> Vec<SocketHandle> {
        std::mem::take(&mut *self.handles.lock())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn h(raw: i32) -> SocketHandle {
        SocketHandle::from_raw(raw)
    }

    #[test]
    fn test_register_then_unregister() {
        let registry = SocketRegistry::new(10);
        assert!(registry.register(h(54)));
        assert!(registry.is_valid(h(54)));
        assert_eq!(registry.len(), 1);

        assert!(registry.unregister(h(54)));
        assert!(!registry.is_valid(h(54)));
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn test_register_and_unregister_restores_size() {
        let registry = SocketRegistry::new(10);
        registry.register(h(1));
        registry.register(h(2));
        let before = registry.len();

        assert!(registry.register(h(3)));
        assert!(registry.unregister(h(3)));
        assert_eq!(registry.len(), before);
        assert!(!registry.is_valid(h(3)));
    }

    #[test]
    fn test_full_registry_rejects_without_mutation() {
        let registry = SocketRegistry::new(3);
        for raw in 0..3 {
            assert!(registry.register(h(raw)));
        }
        assert!(registry.is_full());

        assert!(!registry.register(h(99)));
        assert_eq!(registry.handles(), vec![h(0), h(1), h(2)]);
        assert!(!registry.is_valid(h(99)));
    }

    #[test]
    fn test_duplicates_rejected() {
        let registry = SocketRegistry::new(4);
        assert!(registry.register(h(5)));
        assert!(!registry.register(h(5)));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_unregister_compacts_in_order() {
        let registry = SocketRegistry::new(5);
        for raw in [10, 11, 12, 13] {
            registry.register(h(raw));
        }

        assert!(registry.unregister(h(11)));
        assert_eq!(registry.handles(), vec![h(10), h(12), h(13)]);

        // Freed slot is reusable at the tail
        assert!(registry.register(h(14)));
        assert_eq!(registry.handles(), vec![h(10), h(12), h(13), h(14)]);
    }

    #[test]
    fn test_unregister_absent_fails() {
        let registry = SocketRegistry::new(2);
        registry.register(h(1));
        assert!(!registry.unregister(h(2)));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_negative_handle_never_valid() {
        let registry = SocketRegistry::new(2);
        assert!(!registry.is_valid(h(-1)));
    }

    #[test]
    fn test_drain_empties() {
        let registry = SocketRegistry::new(2);
        registry.register(h(1));
        registry.register(h(2));
        assert_eq!(registry.drain(), vec![h(1), h(2)]);
        assert!(registry.is_empty());
    }
}

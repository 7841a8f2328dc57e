use std::{fmt, ops, thread::ThreadId};

/// Pins a value to the thread that created it.
///
/// OpenGL function pointers and object names are only meaningful on the thread where the context is
/// current. The guard records that thread and panics on any dereference from another one, which turns
/// a silent driver-level bug into an immediate failure.
#[derive(Clone, Copy)]
pub struct ThreadGuard<T> {
    value: T,
    thread_id: ThreadId,
}

// # Safety
// Every access to the inner value goes through `get` or `Deref`, both of which check the calling thread.
// The guard can therefore be moved or shared across threads while the value itself is only ever touched
// on its original thread.
unsafe impl<T> Send for ThreadGuard<T> {}
unsafe impl<T> Sync for ThreadGuard<T> {}

impl<T> fmt::Debug for ThreadGuard<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThreadGuard")
            .field("thread_id", &self.thread_id)
            .finish_non_exhaustive()
    }
}

impl<T> ThreadGuard<T> {
    pub fn new(value: T) -> Self {
        Self {
            value,
            thread_id: std::thread::current().id(),
        }
    }

    pub fn is_current_thread(&self) -> bool {
        self.thread_id == std::thread::current().id()
    }

    pub fn get(&self) -> Option<&T> {
        self.is_current_thread().then_some(&self.value)
    }

    #[inline(always)]
    fn assert_current_thread(&self) {
        if !self.is_current_thread() {
            panic!("OpenGL context accessed from a thread it is not current on");
        }
    }
}

impl<T> ops::Deref for ThreadGuard<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        self.assert_current_thread();
        &self.value
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[test]
    fn same_thread_access() {
        let guard = ThreadGuard::new(42);
        assert!(guard.is_current_thread());
        assert_eq!(*guard, 42);
        assert_eq!(guard.get(), Some(&42));
    }

    #[test]
    fn other_thread_access_is_refused() {
        let guard = Arc::new(ThreadGuard::new(42));
        let result = std::thread::spawn(move || {
            (guard.get().copied(), std::panic::catch_unwind(|| **guard).is_err())
        })
        .join()
        .unwrap();
        assert_eq!(result, (None, true));
    }
}

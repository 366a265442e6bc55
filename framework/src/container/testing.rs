//! Per-thread container overrides for tests

use super::{Container, TEST_CONTAINER};
use std::any::Any;
use std::sync::Arc;

/// Installs and edits the current thread's test container
pub struct TestContainer;

/// Removes the test container when dropped
pub struct TestContainerGuard {
    _private: (),
}

impl TestContainer {
    /// Install an empty test container for this thread
    pub fn fake() -> TestContainerGuard {
        TEST_CONTAINER.with(|c| *c.borrow_mut() = Some(Container::new()));
        TestContainerGuard { _private: () }
    }

    pub fn singleton<T: Any + Send + Sync + 'static>(instance: T) {
        Self::edit(|c| c.singleton(instance));
    }

    pub fn bind<T: ?Sized + Send + Sync + 'static>(instance: Arc<T>) {
        Self::edit(|c| c.bind(instance));
    }

    fn edit(f: impl FnOnce(&mut Container)) {
        TEST_CONTAINER.with(|c| {
            let mut slot = c.borrow_mut();
            f(slot.get_or_insert_with(Container::new));
        });
    }
}

impl Drop for TestContainerGuard {
    fn drop(&mut self) {
        TEST_CONTAINER.with(|c| *c.borrow_mut() = None);
    }
}

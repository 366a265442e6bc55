//! Service container
//!
//! Type-keyed singletons and trait bindings, resolved through the `App`
//! facade. Tests override bindings per thread with `TestContainer`.
//!
//! ```rust,ignore
//! use campus::{bind, App};
//! use campus::notification::{Mailer, LogMailer};
//!
//! bind!(dyn Mailer, LogMailer::default());
//! let mailer = App::resolve_make::<dyn Mailer>()?;
//! ```

pub mod testing;

use std::any::{Any, TypeId};
use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock, RwLock};

use crate::error::FrameworkError;

static APP_CONTAINER: OnceLock<RwLock<Container>> = OnceLock::new();

thread_local! {
    pub(crate) static TEST_CONTAINER: RefCell<Option<Container>> = const { RefCell::new(None) };
}

/// Shared instances keyed by `TypeId`
///
/// Concrete types live under `TypeId::of::<T>()`. Trait objects live under
/// `TypeId::of::<Arc<dyn Trait>>()` so they can be resolved with `make`.
#[derive(Default, Clone)]
pub struct Container {
    bindings: HashMap<TypeId, Arc<dyn Any + Send + Sync>>,
}

impl Container {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a shared instance of a concrete type
    pub fn singleton<T: Any + Send + Sync + 'static>(&mut self, instance: T) {
        self.bindings.insert(TypeId::of::<T>(), Arc::new(instance));
    }

    /// Bind a trait object (or any unsized type) to an implementation
    pub fn bind<T: ?Sized + Send + Sync + 'static>(&mut self, instance: Arc<T>) {
        self.bindings.insert(TypeId::of::<Arc<T>>(), Arc::new(instance));
    }

    /// Resolve a concrete type (cloned out of the container)
    pub fn get<T: Any + Send + Sync + Clone + 'static>(&self) -> Option<T> {
        self.bindings
            .get(&TypeId::of::<T>())?
            .downcast_ref::<T>()
            .cloned()
    }

    /// Resolve a trait binding
    pub fn make<T: ?Sized + Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        self.bindings
            .get(&TypeId::of::<Arc<T>>())?
            .downcast_ref::<Arc<T>>()
            .cloned()
    }

    pub fn has<T: Any + 'static>(&self) -> bool {
        self.bindings.contains_key(&TypeId::of::<T>())
    }

    pub fn has_binding<T: ?Sized + 'static>(&self) -> bool {
        self.bindings.contains_key(&TypeId::of::<Arc<T>>())
    }
}

/// Application container facade
///
/// Resolution checks the current thread's test container first, then the
/// global container.
pub struct App;

impl App {
    fn global() -> &'static RwLock<Container> {
        APP_CONTAINER.get_or_init(|| RwLock::new(Container::new()))
    }

    fn with_test<R>(f: impl FnOnce(&Container) -> Option<R>) -> Option<R> {
        TEST_CONTAINER.with(|c| c.borrow().as_ref().and_then(f))
    }

    pub fn init() {
        Self::global();
    }

    pub fn singleton<T: Any + Send + Sync + 'static>(instance: T) {
        if let Ok(mut c) = Self::global().write() {
            c.singleton(instance);
        }
    }

    pub fn bind<T: ?Sized + Send + Sync + 'static>(instance: Arc<T>) {
        if let Ok(mut c) = Self::global().write() {
            c.bind(instance);
        }
    }

    pub fn get<T: Any + Send + Sync + Clone + 'static>() -> Option<T> {
        if let Some(found) = Self::with_test(|c| c.get::<T>()) {
            return Some(found);
        }
        Self::global().read().ok()?.get::<T>()
    }

    pub fn make<T: ?Sized + Send + Sync + 'static>() -> Option<Arc<T>> {
        if let Some(found) = Self::with_test(|c| c.make::<T>()) {
            return Some(found);
        }
        Self::global().read().ok()?.make::<T>()
    }

    /// Resolve a concrete type or fail with `ServiceNotFound`
    pub fn resolve<T: Any + Send + Sync + Clone + 'static>() -> Result<T, FrameworkError> {
        Self::get::<T>().ok_or_else(FrameworkError::service_not_found::<T>)
    }

    /// Resolve a trait binding or fail with `ServiceNotFound`
    pub fn resolve_make<T: ?Sized + Send + Sync + 'static>() -> Result<Arc<T>, FrameworkError> {
        Self::make::<T>().ok_or_else(FrameworkError::service_not_found::<T>)
    }

    pub fn has<T: Any + 'static>() -> bool {
        Self::with_test(|c| c.has::<T>().then_some(())).is_some()
            || Self::global()
                .read()
                .map(|c| c.has::<T>())
                .unwrap_or(false)
    }

    pub fn has_binding<T: ?Sized + 'static>() -> bool {
        Self::with_test(|c| c.has_binding::<T>().then_some(())).is_some()
            || Self::global()
                .read()
                .map(|c| c.has_binding::<T>())
                .unwrap_or(false)
    }
}

/// Bind a trait to a shared implementation (wraps it in `Arc`)
///
/// ```rust,ignore
/// bind!(dyn Mailer, SmtpMailer::from_config(&config)?);
/// ```
#[macro_export]
macro_rules! bind {
    ($trait:ty, $instance:expr) => {
        $crate::App::bind::<$trait>(::std::sync::Arc::new($instance) as ::std::sync::Arc<$trait>)
    };
}

/// Register a shared instance of a concrete type
#[macro_export]
macro_rules! singleton {
    ($instance:expr) => {
        $crate::App::singleton($instance)
    };
}

#[cfg(test)]
mod tests {
    use super::testing::TestContainer;
    use super::*;

    trait Clock: Send + Sync {
        fn year(&self) -> i32;
    }

    struct FixedClock(i32);

    impl Clock for FixedClock {
        fn year(&self) -> i32 {
            self.0
        }
    }

    #[derive(Clone, Debug, PartialEq)]
    struct SchoolName(String);

    #[test]
    fn resolves_singletons_and_trait_bindings() {
        let mut container = Container::new();
        container.singleton(SchoolName("Hillside".to_string()));
        container.bind::<dyn Clock>(Arc::new(FixedClock(2024)));

        assert_eq!(
            container.get::<SchoolName>(),
            Some(SchoolName("Hillside".to_string()))
        );
        assert_eq!(container.make::<dyn Clock>().map(|c| c.year()), Some(2024));
        assert!(container.has_binding::<dyn Clock>());
        assert!(!container.has::<u64>());
    }

    #[test]
    fn test_container_overrides_global() {
        App::bind::<dyn Clock>(Arc::new(FixedClock(1999)));
        let _guard = TestContainer::fake();
        TestContainer::bind::<dyn Clock>(Arc::new(FixedClock(2030)));

        assert_eq!(App::resolve_make::<dyn Clock>().map(|c| c.year()).ok(), Some(2030));
        assert!(App::resolve::<SchoolName>().is_err());
    }
}

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{OnceLock, RwLock};

/// Global config repository, keyed by config type
static CONFIG_REPOSITORY: OnceLock<RwLock<ConfigRepository>> = OnceLock::new();

/// Typed configuration structs stored by `TypeId`
#[derive(Default)]
pub struct ConfigRepository {
    configs: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl ConfigRepository {
    pub fn register<T: Any + Send + Sync + 'static>(&mut self, config: T) {
        self.configs.insert(TypeId::of::<T>(), Box::new(config));
    }

    pub fn get<T: Any + Send + Sync + Clone + 'static>(&self) -> Option<T> {
        self.configs
            .get(&TypeId::of::<T>())
            .and_then(|boxed| boxed.downcast_ref::<T>())
            .cloned()
    }

    pub fn has<T: Any + 'static>(&self) -> bool {
        self.configs.contains_key(&TypeId::of::<T>())
    }
}

fn repository() -> &'static RwLock<ConfigRepository> {
    CONFIG_REPOSITORY.get_or_init(|| RwLock::new(ConfigRepository::default()))
}

/// Register a config in the global repository, replacing any previous value
pub fn register<T: Any + Send + Sync + 'static>(config: T) {
    if let Ok(mut repo) = repository().write() {
        repo.register(config);
    }
}

pub fn get<T: Any + Send + Sync + Clone + 'static>() -> Option<T> {
    repository().read().ok()?.get::<T>()
}

pub fn has<T: Any + 'static>() -> bool {
    repository()
        .read()
        .map(|repo| repo.has::<T>())
        .unwrap_or(false)
}

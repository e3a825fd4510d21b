//! Name-keyed factory for behavior types
//!
//! Externally compiled behavior libraries register their types here so the
//! runtime can construct them by name (add-behavior menus, deserialization)
//! without depending on them. Registering a name again with a *different*
//! concrete type replaces the factory, which is how hot-reloaded code takes
//! over from the previous build.
//!
//! The registry is a cheap, cloneable handle: every clone sees the same table,
//! so one registry can back an editor preview scene and the runtime scene at
//! the same time.

use std::any::TypeId;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use log::{info, trace};

use super::behavior::{canonical_type_name, Behavior};

type Factory = Rc<dyn Fn() -> Box<dyn Behavior>>;

struct RegisteredType {
    type_id: TypeId,
    rust_name: &'static str,
    factory: Factory,
}

/// Outcome of a registration call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    /// The name was not known before
    Added,
    /// The same concrete type was already registered under the name
    Unchanged,
    /// A different concrete type now backs the name
    Replaced,
}

/// Shared handle to the behavior type table
#[derive(Clone, Default)]
pub struct TypeRegistry {
    types: Rc<RefCell<HashMap<String, RegisteredType>>>,
}

impl TypeRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `T` under its canonical name
    pub fn register<T: Behavior + Default>(&self) -> Registration {
        self.register_as::<T>(canonical_type_name::<T>())
    }

    /// Register `T` under an explicit name
    pub fn register_as<T: Behavior + Default>(&self, name: &str) -> Registration {
        self.register_with(name, T::default)
    }

    /// Register a custom constructor for `T` under `name`
    pub fn register_with<T, F>(&self, name: &str, constructor: F) -> Registration
    where
        T: Behavior,
        F: Fn() -> T + 'static,
    {
        let type_id = TypeId::of::<T>();
        let mut types = self.types.borrow_mut();

        let outcome = match types.get(name) {
            Some(existing) if existing.type_id == type_id => {
                trace!("Behavior type '{}' already registered", name);
                return Registration::Unchanged;
            }
            Some(existing) => {
                info!(
                    "Updating behavior type '{}' ({} -> {})",
                    name,
                    existing.rust_name,
                    std::any::type_name::<T>()
                );
                Registration::Replaced
            }
            None => {
                info!("Registering new behavior type '{}'", name);
                Registration::Added
            }
        };

        types.insert(
            name.to_string(),
            RegisteredType {
                type_id,
                rust_name: std::any::type_name::<T>(),
                factory: Rc::new(move || Box::new(constructor()) as Box<dyn Behavior>),
            },
        );
        outcome
    }

    /// Remove a type, e.g. when its library is unloaded
    pub fn unregister(&self, name: &str) -> bool {
        let removed = self.types.borrow_mut().remove(name).is_some();
        if removed {
            info!("Unregistering behavior type '{}'", name);
        }
        removed
    }

    /// Construct a default instance, or `None` if the name is unknown
    pub fn create(&self, name: &str) -> Option<Box<dyn Behavior>> {
        // Release the borrow before running user code
        let factory = self.types.borrow().get(name).map(|t| Rc::clone(&t.factory))?;
        Some(factory())
    }

    /// Whether `name` resolves to a factory
    pub fn is_registered(&self, name: &str) -> bool {
        self.types.borrow().contains_key(name)
    }

    /// Every registered name, sorted
    pub fn all_registered_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.types.borrow().keys().cloned().collect();
        names.sort();
        names
    }

    /// Registered name backed by the given concrete type
    pub fn name_of(&self, type_id: TypeId) -> Option<String> {
        self.types
            .borrow()
            .iter()
            .filter(|(_, t)| t.type_id == type_id)
            .map(|(name, _)| name.clone())
            .min()
    }

    /// Concrete type currently registered under `name`
    pub fn type_id_of(&self, name: &str) -> Option<TypeId> {
        self.types.borrow().get(name).map(|t| t.type_id)
    }

    /// Number of registered names
    pub fn len(&self) -> usize {
        self.types.borrow().len()
    }

    /// Whether nothing is registered
    pub fn is_empty(&self) -> bool {
        self.types.borrow().is_empty()
    }

    /// Drop every registration
    pub fn clear(&self) {
        self.types.borrow_mut().clear();
    }
}

impl fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeRegistry")
            .field("types", &self.all_registered_names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::behavior::downcast_ref;

    #[derive(Default)]
    struct Mover {
        speed: f32,
    }
    impl Behavior for Mover {}

    mod reloaded {
        use crate::ecs::Behavior;

        pub struct Mover {
            pub speed: f32,
        }

        impl Default for Mover {
            fn default() -> Self {
                Self { speed: 42.0 }
            }
        }

        impl Behavior for Mover {}
    }

    #[test]
    fn test_register_and_create() {
        let registry = TypeRegistry::new();
        assert_eq!(registry.register::<Mover>(), Registration::Added);
        assert!(registry.is_registered("Mover"));

        let unit = registry.create("Mover").unwrap();
        assert_eq!(downcast_ref::<Mover>(unit.as_ref()).map(|m| m.speed), Some(0.0));
        assert!(registry.create("Nope").is_none());
    }

    #[test]
    fn test_identical_registration_is_noop() {
        let registry = TypeRegistry::new();
        registry.register::<Mover>();
        let names_before = registry.all_registered_names();

        assert_eq!(registry.register::<Mover>(), Registration::Unchanged);
        assert_eq!(registry.all_registered_names(), names_before);
        assert_eq!(registry.type_id_of("Mover"), Some(TypeId::of::<Mover>()));
    }

    #[test]
    fn test_different_type_replaces_factory() {
        let registry = TypeRegistry::new();
        registry.register::<Mover>();

        assert_eq!(registry.register::<reloaded::Mover>(), Registration::Replaced);
        assert_eq!(registry.len(), 1);

        let unit = registry.create("Mover").unwrap();
        assert!(downcast_ref::<Mover>(unit.as_ref()).is_none());
        assert_eq!(downcast_ref::<reloaded::Mover>(unit.as_ref()).map(|m| m.speed), Some(42.0));
    }

    #[test]
    fn test_clones_share_the_table() {
        let registry = TypeRegistry::new();
        let editor_view = registry.clone();
        registry.register_as::<Mover>("Scripts.Mover");

        assert!(editor_view.is_registered("Scripts.Mover"));
        assert_eq!(editor_view.name_of(TypeId::of::<Mover>()).as_deref(), Some("Scripts.Mover"));

        assert!(editor_view.unregister("Scripts.Mover"));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_custom_constructor() {
        let registry = TypeRegistry::new();
        registry.register_with("FastMover", || Mover { speed: 9.0 });
        let unit = registry.create("FastMover").unwrap();
        assert_eq!(downcast_ref::<Mover>(unit.as_ref()).map(|m| m.speed), Some(9.0));
    }
}

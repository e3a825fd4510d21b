//! Resource catalog
//!
//! String-keyed table of the resources persisted records may reference:
//! templates (held here so instantiation can find them by id) and opaque
//! asset ids owned by external loaders (meshes, materials, textures, audio).
//!
//! The catalog is a cloneable handle over shared state. Scenes resolve asset
//! references against it during deserialization; a reference to an id that is
//! not in the catalog resolves to `None` rather than failing the load.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::rc::Rc;

use log::{debug, info};

use crate::ecs::TypeRegistry;
use crate::scene::{SceneResult, Template};

/// Kind of a cataloged resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    /// Reusable entity template
    Template,
    /// Mesh data
    Mesh,
    /// Material
    Material,
    /// Texture
    Texture,
    /// Audio clip
    Audio,
    /// Script or behavior library
    Script,
    /// Anything else
    Other,
}

/// Resolved reference to a cataloged resource
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceHandle {
    /// Catalog id
    pub id: String,
    /// What the id refers to
    pub kind: ResourceKind,
}

#[derive(Default)]
struct CatalogState {
    assets: HashMap<String, ResourceKind>,
    templates: HashMap<String, Rc<Template>>,
}

/// Shared handle to the resource table
#[derive(Clone, Default)]
pub struct ResourceCatalog {
    state: Rc<RefCell<CatalogState>>,
}

impl ResourceCatalog {
    /// Create an empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an externally loaded asset id. Returns false if the id was
    /// already known (its kind is updated).
    pub fn register(&self, id: &str, kind: ResourceKind) -> bool {
        let fresh = self.state.borrow_mut().assets.insert(id.to_string(), kind).is_none();
        if fresh {
            debug!("Cataloged {:?} '{}'", kind, id);
        }
        fresh
    }

    /// Store a template under its resource id, replacing any previous one
    pub fn add_template(&self, template: Template) -> Rc<Template> {
        let template = Rc::new(template);
        let id = template.resource_id().to_string();
        let mut state = self.state.borrow_mut();
        state.assets.insert(id.clone(), ResourceKind::Template);
        state.templates.insert(id, Rc::clone(&template));
        template
    }

    /// Load a template file and catalog it
    pub fn load_template(&self, path: impl AsRef<Path>, registry: &TypeRegistry) -> SceneResult<Rc<Template>> {
        let template = Template::load_from_file(path, registry, self)?;
        info!("Cataloged template '{}'", template.resource_id());
        Ok(self.add_template(template))
    }

    /// Independent catalog with the same asset ids but no template objects.
    ///
    /// Template graphs resolve references against this so a catalog never
    /// ends up owning a graph that points back at it.
    pub fn detached_copy(&self) -> Self {
        let assets = self.state.borrow().assets.clone();
        Self {
            state: Rc::new(RefCell::new(CatalogState {
                assets,
                templates: HashMap::new(),
            })),
        }
    }

    /// Template by id
    pub fn template(&self, id: &str) -> Option<Rc<Template>> {
        self.state.borrow().templates.get(id).cloned()
    }

    /// Resolve an id to a handle
    pub fn get(&self, id: &str) -> Option<ResourceHandle> {
        self.state.borrow().assets.get(id).map(|kind| ResourceHandle {
            id: id.to_string(),
            kind: *kind,
        })
    }

    /// Whether the id is cataloged
    pub fn contains(&self, id: &str) -> bool {
        self.state.borrow().assets.contains_key(id)
    }

    /// Forget a resource
    pub fn remove(&self, id: &str) -> bool {
        let mut state = self.state.borrow_mut();
        state.templates.remove(id);
        state.assets.remove(id).is_some()
    }

    /// Every cataloged id, sorted
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.state.borrow().assets.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Number of cataloged ids
    pub fn len(&self) -> usize {
        self.state.borrow().assets.len()
    }

    /// Whether nothing is cataloged
    pub fn is_empty(&self) -> bool {
        self.state.borrow().assets.is_empty()
    }
}

impl fmt::Debug for ResourceCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceCatalog").field("ids", &self.ids()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_resolve() {
        let catalog = ResourceCatalog::new();
        assert!(catalog.register("meshes/crate.obj", ResourceKind::Mesh));
        assert!(!catalog.register("meshes/crate.obj", ResourceKind::Mesh));

        let handle = catalog.get("meshes/crate.obj").unwrap();
        assert_eq!(handle.kind, ResourceKind::Mesh);
        assert!(catalog.get("meshes/missing.obj").is_none());
    }

    #[test]
    fn test_clones_share_state() {
        let catalog = ResourceCatalog::new();
        let other = catalog.clone();
        other.register("sfx/boom.wav", ResourceKind::Audio);

        assert!(catalog.contains("sfx/boom.wav"));
        assert!(catalog.remove("sfx/boom.wav"));
        assert!(other.is_empty());
    }

    #[test]
    fn test_templates_are_cataloged() {
        let catalog = ResourceCatalog::new();
        let registry = TypeRegistry::new();
        catalog.add_template(Template::new("Crate", &registry, &catalog));

        assert!(catalog.template("Crate").is_some());
        assert_eq!(catalog.get("Crate").map(|h| h.kind), Some(ResourceKind::Template));
        assert_eq!(catalog.ids(), vec!["Crate".to_string()]);
    }

    #[test]
    fn test_detached_copy_keeps_ids_only() {
        let catalog = ResourceCatalog::new();
        let registry = TypeRegistry::new();
        catalog.register("textures/wood.png", ResourceKind::Texture);
        catalog.add_template(Template::new("Crate", &registry, &catalog));

        let copy = catalog.detached_copy();
        assert!(copy.contains("textures/wood.png"));
        assert_eq!(copy.get("Crate").map(|h| h.kind), Some(ResourceKind::Template));
        assert!(copy.template("Crate").is_none());

        copy.register("late.png", ResourceKind::Texture);
        assert!(!catalog.contains("late.png"));
    }
}

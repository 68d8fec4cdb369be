//! Preview surfaces as seen from the editor.
//!
//! The editor talks to each surface through [`PreviewChannel`], the message
//! set a rendering host answers. [`SharedPreview`] implements it over an
//! in-process [`LivePreview`].

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex, MutexGuard, RwLock};
use tracing::{debug, warn};
use trellis_code::WriteListener;
use trellis_livetree::{DomUpdate, LivePreview, PreviewEvent, Result};
use trellis_models::{
    ActionElement, ActionLocation, ActionTarget, ImageContent, LayerMap, StyleMap, TextDomElement,
};
use trellis_template_nodes::TemplateNodeMap;

#[async_trait]
pub trait PreviewChannel: Send + Sync {
    fn surface_id(&self) -> &str;

    async fn update_style(&self, address: &str, styles: &StyleMap) -> Result<()>;

    async fn insert_element(
        &self,
        element: &ActionElement,
        location: &ActionLocation,
    ) -> Result<DomUpdate>;

    /// Remove `element` from the parent named by `location`.
    async fn remove_element(
        &self,
        element: &ActionElement,
        location: &ActionLocation,
    ) -> Result<DomUpdate>;

    async fn move_element(&self, address: &str, index: usize) -> Result<DomUpdate>;

    async fn edit_text(&self, address: &str, content: &str) -> Result<TextDomElement>;

    async fn group_elements(
        &self,
        parent: &ActionTarget,
        container: &ActionElement,
        children: &[ActionTarget],
    ) -> Result<DomUpdate>;

    async fn ungroup_elements(
        &self,
        parent: &ActionTarget,
        container: &ActionElement,
    ) -> Result<DomUpdate>;

    async fn insert_image(&self, address: &str, image: &ImageContent) -> Result<()>;

    async fn remove_image(&self, address: &str) -> Result<()>;

    /// Full-depth snapshot of an element, for building remove actions.
    async fn snapshot(&self, address: &str) -> Result<ActionElement>;

    async fn layer_map(&self) -> Result<LayerMap>;

    /// Drop transient overrides; returns the fresh layer map.
    async fn clean_after_write(&self) -> Result<LayerMap>;
}

/// A [`LivePreview`] shared between the editor and whoever renders it.
pub struct SharedPreview {
    surface_id: String,
    preview: Mutex<LivePreview>,
}

impl SharedPreview {
    pub fn new(preview: LivePreview) -> Self {
        Self {
            surface_id: preview.surface_id().to_string(),
            preview: Mutex::new(preview),
        }
    }

    /// Direct access for inspection or for simulating host re-renders.
    pub async fn lock(&self) -> MutexGuard<'_, LivePreview> {
        self.preview.lock().await
    }

    pub async fn subscribe(&self) -> mpsc::UnboundedReceiver<PreviewEvent> {
        self.preview.lock().await.subscribe()
    }
}

#[async_trait]
impl PreviewChannel for SharedPreview {
    fn surface_id(&self) -> &str {
        &self.surface_id
    }

    async fn update_style(&self, address: &str, styles: &StyleMap) -> Result<()> {
        self.preview.lock().await.update_styles(address, styles)
    }

    async fn insert_element(
        &self,
        element: &ActionElement,
        location: &ActionLocation,
    ) -> Result<DomUpdate> {
        self.preview.lock().await.insert_element(element, location)
    }

    async fn remove_element(
        &self,
        element: &ActionElement,
        location: &ActionLocation,
    ) -> Result<DomUpdate> {
        self.preview
            .lock()
            .await
            .remove_element_by_id(&element.dom_id, location)
    }

    async fn move_element(&self, address: &str, index: usize) -> Result<DomUpdate> {
        self.preview.lock().await.move_element(address, index)
    }

    async fn edit_text(&self, address: &str, content: &str) -> Result<TextDomElement> {
        self.preview.lock().await.edit_text(address, content)
    }

    async fn group_elements(
        &self,
        parent: &ActionTarget,
        container: &ActionElement,
        children: &[ActionTarget],
    ) -> Result<DomUpdate> {
        self.preview
            .lock()
            .await
            .group_elements(parent, container, children)
    }

    async fn ungroup_elements(
        &self,
        parent: &ActionTarget,
        container: &ActionElement,
    ) -> Result<DomUpdate> {
        self.preview.lock().await.ungroup_elements(parent, container)
    }

    async fn insert_image(&self, address: &str, image: &ImageContent) -> Result<()> {
        self.preview.lock().await.insert_image(address, image)
    }

    async fn remove_image(&self, address: &str) -> Result<()> {
        self.preview.lock().await.remove_image(address)
    }

    async fn snapshot(&self, address: &str) -> Result<ActionElement> {
        self.preview.lock().await.snapshot(address)
    }

    async fn layer_map(&self) -> Result<LayerMap> {
        self.preview.lock().await.layer_map()
    }

    async fn clean_after_write(&self) -> Result<LayerMap> {
        self.preview.lock().await.clean_after_write()
    }
}

/// Registered surfaces plus the template node map kept in step with them.
pub struct SurfaceRegistry {
    surfaces: RwLock<HashMap<String, Arc<dyn PreviewChannel>>>,
    template_nodes: Arc<TemplateNodeMap>,
}

impl SurfaceRegistry {
    pub fn new(template_nodes: Arc<TemplateNodeMap>) -> Self {
        Self {
            surfaces: RwLock::new(HashMap::new()),
            template_nodes,
        }
    }

    pub fn template_nodes(&self) -> &Arc<TemplateNodeMap> {
        &self.template_nodes
    }

    /// Add a surface and map its current layer tree. Returns false if the
    /// id is taken. A surface whose layer tree cannot be read is not kept.
    pub async fn register(&self, channel: Arc<dyn PreviewChannel>) -> Result<bool> {
        let surface_id = channel.surface_id().to_string();
        {
            let mut surfaces = self.surfaces.write().await;
            if surfaces.contains_key(&surface_id) {
                return Ok(false);
            }
            surfaces.insert(surface_id.clone(), channel.clone());
        }

        let layers = match channel.layer_map().await {
            Ok(layers) => layers,
            Err(err) => {
                self.surfaces.write().await.remove(&surface_id);
                warn!(surface_id = %surface_id, error = %err, "surface registration failed");
                return Err(err);
            }
        };
        self.template_nodes.set_layer_map(&surface_id, layers).await;
        debug!(surface_id = %surface_id, "surface registered");
        Ok(true)
    }

    /// Remove a surface and everything mapped for it.
    pub async fn deregister(&self, surface_id: &str) -> bool {
        let removed = self.surfaces.write().await.remove(surface_id).is_some();
        self.template_nodes.remove_surface(surface_id).await;
        if removed {
            debug!(surface_id, "surface deregistered");
        }
        removed
    }

    pub async fn get(&self, surface_id: &str) -> Option<Arc<dyn PreviewChannel>> {
        self.surfaces.read().await.get(surface_id).cloned()
    }

    pub async fn surface_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.surfaces.read().await.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Remap a rebuilt subtree after a structural change.
    pub async fn resync(&self, surface_id: &str, update: DomUpdate) {
        self.template_nodes
            .update_layer_map(surface_id, &update.parent_id, update.layers)
            .await;
    }
}

#[async_trait]
impl WriteListener for SurfaceRegistry {
    async fn clean_after_write(&self) {
        let channels: Vec<Arc<dyn PreviewChannel>> =
            self.surfaces.read().await.values().cloned().collect();

        for channel in channels {
            let surface_id = channel.surface_id().to_string();
            match channel.clean_after_write().await {
                Ok(layers) => self.template_nodes.set_layer_map(&surface_id, layers).await,
                Err(err) => {
                    warn!(surface_id = %surface_id, error = %err, "resync after write failed")
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use trellis_livetree::LiveTreeError;
    use trellis_template_nodes::{InMemoryInstanceResolver, InMemoryTemplateSource};

    /// A host that fails every request until `healthy` is set.
    struct FlakyChannel {
        healthy: AtomicBool,
    }

    fn gone() -> LiveTreeError {
        LiveTreeError::UnknownAddress("gone".into())
    }

    #[async_trait]
    impl PreviewChannel for FlakyChannel {
        fn surface_id(&self) -> &str {
            "frame-1"
        }

        async fn update_style(&self, _: &str, _: &StyleMap) -> Result<()> {
            Err(gone())
        }

        async fn insert_element(&self, _: &ActionElement, _: &ActionLocation) -> Result<DomUpdate> {
            Err(gone())
        }

        async fn remove_element(&self, _: &ActionElement, _: &ActionLocation) -> Result<DomUpdate> {
            Err(gone())
        }

        async fn move_element(&self, _: &str, _: usize) -> Result<DomUpdate> {
            Err(gone())
        }

        async fn edit_text(&self, _: &str, _: &str) -> Result<TextDomElement> {
            Err(gone())
        }

        async fn group_elements(
            &self,
            _: &ActionTarget,
            _: &ActionElement,
            _: &[ActionTarget],
        ) -> Result<DomUpdate> {
            Err(gone())
        }

        async fn ungroup_elements(&self, _: &ActionTarget, _: &ActionElement) -> Result<DomUpdate> {
            Err(gone())
        }

        async fn insert_image(&self, _: &str, _: &ImageContent) -> Result<()> {
            Err(gone())
        }

        async fn remove_image(&self, _: &str) -> Result<()> {
            Err(gone())
        }

        async fn snapshot(&self, _: &str) -> Result<ActionElement> {
            Err(gone())
        }

        async fn layer_map(&self) -> Result<LayerMap> {
            if self.healthy.load(Ordering::SeqCst) {
                Ok(LayerMap::new())
            } else {
                Err(gone())
            }
        }

        async fn clean_after_write(&self) -> Result<LayerMap> {
            self.layer_map().await
        }
    }

    fn registry() -> SurfaceRegistry {
        SurfaceRegistry::new(Arc::new(TemplateNodeMap::new(
            Arc::new(InMemoryTemplateSource::new()),
            Arc::new(InMemoryInstanceResolver::new()),
        )))
    }

    #[tokio::test]
    async fn test_failed_registration_can_be_retried() {
        let registry = registry();
        let channel = Arc::new(FlakyChannel {
            healthy: AtomicBool::new(false),
        });

        assert_eq!(registry.register(channel.clone()).await, Err(gone()));
        assert!(registry.surface_ids().await.is_empty());
        assert!(registry.get("frame-1").await.is_none());

        channel.healthy.store(true, Ordering::SeqCst);
        assert_eq!(registry.register(channel.clone()).await, Ok(true));
        assert_eq!(registry.surface_ids().await, vec!["frame-1".to_string()]);
        assert_eq!(registry.register(channel).await, Ok(false));
    }
}

//! Wiring of the synchronization core.

use crate::actions::ActionManager;
use crate::config::EditorConfig;
use crate::errors::{EditorError, Result};
use crate::history::HistoryManager;
use crate::surface::{SharedPreview, SurfaceRegistry};
use std::sync::Arc;
use tracing::info;
use trellis_code::{CodeDiffService, CodeManager, WriteService};
use trellis_livetree::{LivePreview, LiveTree};
use trellis_models::{Action, ActionElement};
use trellis_template_nodes::{InstanceResolver, TemplateNodeMap, TemplateNodeSource};

/// External collaborators the engine needs.
#[derive(Clone)]
pub struct Collaborators {
    pub template_source: Arc<dyn TemplateNodeSource>,
    pub instance_resolver: Arc<dyn InstanceResolver>,
    pub diff_service: Arc<dyn CodeDiffService>,
    pub write_service: Arc<dyn WriteService>,
}

/// Dispatcher, history, write queue and template node map, wired together.
pub struct EditorEngine {
    config: EditorConfig,
    surfaces: Arc<SurfaceRegistry>,
    code: CodeManager,
    history: Arc<HistoryManager>,
    actions: ActionManager,
}

impl EditorEngine {
    pub async fn new(config: EditorConfig, collaborators: Collaborators) -> Self {
        let template_nodes = Arc::new(TemplateNodeMap::new(
            collaborators.template_source,
            collaborators.instance_resolver,
        ));
        let code = CodeManager::new(
            template_nodes.clone(),
            collaborators.diff_service,
            collaborators.write_service,
            config.code_manager_options(),
        );
        let surfaces = Arc::new(SurfaceRegistry::new(template_nodes));
        code.register_listener(surfaces.clone()).await;

        let history = Arc::new(HistoryManager::with_max_levels(
            Arc::new(code.clone()),
            config.max_undo_levels,
        ));
        let actions = ActionManager::new(history.clone(), surfaces.clone());

        Self {
            config,
            surfaces,
            code,
            history,
            actions,
        }
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn actions(&self) -> &ActionManager {
        &self.actions
    }

    pub fn history(&self) -> &Arc<HistoryManager> {
        &self.history
    }

    pub fn code(&self) -> &CodeManager {
        &self.code
    }

    pub fn template_nodes(&self) -> &Arc<TemplateNodeMap> {
        self.surfaces.template_nodes()
    }

    /// Build a preview surface from a snapshot and register it.
    pub async fn create_surface(
        &self,
        surface_id: &str,
        root: &ActionElement,
    ) -> Result<Arc<SharedPreview>> {
        let tree =
            LiveTree::new(surface_id).with_text_preview_length(self.config.text_preview_length);
        let mut preview = LivePreview::with_tree(tree);
        preview.load(root)?;

        let shared = Arc::new(SharedPreview::new(preview));
        if !self.surfaces.register(shared.clone()).await? {
            return Err(EditorError::SurfaceExists(surface_id.to_string()));
        }
        info!(surface_id, elements = root.subtree_len(), "surface created");
        Ok(shared)
    }

    pub async fn deregister_surface(&self, surface_id: &str) -> Result<()> {
        if self.surfaces.deregister(surface_id).await {
            Ok(())
        } else {
            Err(EditorError::UnknownSurface(surface_id.to_string()))
        }
    }

    pub async fn run(&self, action: Action) {
        self.actions.run(action).await
    }

    pub async fn undo(&self) -> Option<Action> {
        self.actions.undo().await
    }

    pub async fn redo(&self) -> Option<Action> {
        self.actions.redo().await
    }

    pub async fn start_transaction(&self) {
        self.history.start_transaction().await
    }

    pub async fn commit_transaction(&self) {
        self.history.commit_transaction().await
    }

    /// Wait until every queued write has been attempted.
    pub async fn wait_idle(&self) {
        self.code.wait_idle().await
    }
}

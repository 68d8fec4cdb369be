use crate::error::{CodeError, Result};
use crate::request::{to_code_element, RequestSet};
use crate::services::{CodeDiffService, WriteListener, WriteService};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, VecDeque};
use std::pin::pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, Notify, RwLock};
use tracing::{debug, error, info, warn};
use trellis_models::{
    Action, ActionLocation, ActionTarget, CodeDiff, CodeDiffRequest, CodeInsert, StructureChange,
};
use trellis_template_nodes::TemplateNodeMap;

pub const DEFAULT_SETTLE_INTERVAL: Duration = Duration::from_millis(300);

/// Which template node a target without a source id is written to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StyleMode {
    /// The call site when the element comes from a reused component,
    /// otherwise the declaration.
    #[default]
    Instance,
    /// Always the declaration.
    Root,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodeManagerOptions {
    pub settle_interval: Duration,
    pub style_mode: StyleMode,
}

impl Default for CodeManagerOptions {
    fn default() -> Self {
        Self {
            settle_interval: DEFAULT_SETTLE_INTERVAL,
            style_mode: StyleMode::default(),
        }
    }
}

#[derive(Debug, Default)]
struct QueueState {
    pending: VecDeque<Action>,
    executing: bool,
}

struct Inner {
    template_nodes: Arc<TemplateNodeMap>,
    diff_service: Arc<dyn CodeDiffService>,
    write_service: Arc<dyn WriteService>,
    listeners: RwLock<Vec<Arc<dyn WriteListener>>>,
    queue: Mutex<QueueState>,
    idle: Notify,
    options: CodeManagerOptions,
}

/// Serializes committed actions into source writes.
///
/// Actions are written strictly in the order they were queued, one at a
/// time. After each one the drain waits `settle_interval` before taking the
/// next, so a burst of edits produces at most one write per window. A failed
/// write is logged and not retried.
#[derive(Clone)]
pub struct CodeManager {
    inner: Arc<Inner>,
}

impl CodeManager {
    pub fn new(
        template_nodes: Arc<TemplateNodeMap>,
        diff_service: Arc<dyn CodeDiffService>,
        write_service: Arc<dyn WriteService>,
        options: CodeManagerOptions,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                template_nodes,
                diff_service,
                write_service,
                listeners: RwLock::new(Vec::new()),
                queue: Mutex::new(QueueState::default()),
                idle: Notify::new(),
                options,
            }),
        }
    }

    pub fn options(&self) -> CodeManagerOptions {
        self.inner.options
    }

    pub fn template_nodes(&self) -> &Arc<TemplateNodeMap> {
        &self.inner.template_nodes
    }

    pub async fn register_listener(&self, listener: Arc<dyn WriteListener>) {
        self.inner.listeners.write().await.push(listener);
    }

    /// Queue `action` and start draining if nothing is running.
    pub async fn write(&self, action: Action) {
        let start = {
            let mut queue = self.inner.queue.lock().await;
            queue.pending.push_back(action);
            if queue.executing {
                false
            } else {
                queue.executing = true;
                true
            }
        };

        if start {
            let manager = self.clone();
            tokio::spawn(async move { manager.drain().await });
        }
    }

    pub async fn pending_len(&self) -> usize {
        self.inner.queue.lock().await.pending.len()
    }

    pub async fn is_idle(&self) -> bool {
        let queue = self.inner.queue.lock().await;
        !queue.executing && queue.pending.is_empty()
    }

    /// Resolves once the queue is empty and no write is running.
    pub async fn wait_idle(&self) {
        loop {
            let mut notified = pin!(self.inner.idle.notified());
            notified.as_mut().enable();
            if self.is_idle().await {
                return;
            }
            notified.await;
        }
    }

    async fn drain(self) {
        loop {
            let next = {
                let mut queue = self.inner.queue.lock().await;
                let next = queue.pending.pop_front();
                if next.is_none() {
                    queue.executing = false;
                }
                next
            };

            let Some(action) = next else {
                self.inner.idle.notify_waiters();
                debug!("write queue drained");
                return;
            };

            self.execute(action).await;
            tokio::time::sleep(self.inner.options.settle_interval).await;
        }
    }

    async fn execute(&self, action: Action) {
        let kind = action.kind();
        if let Action::WriteCode(write) = action {
            self.write_code_diffs(write.diffs).await;
            return;
        }

        let requests = self.build_requests(&action).await;
        if requests.is_empty() {
            warn!(kind = %kind, "nothing to write for action");
            return;
        }
        debug!(kind = %kind, requests = requests.len(), "writing action");
        self.get_and_write_code_diff(requests).await;
    }

    /// Resolve every element an action touches and merge its edits into
    /// one request per source id. Elements that cannot be resolved are
    /// logged and left out.
    pub async fn build_requests(&self, action: &Action) -> Vec<CodeDiffRequest> {
        let mut set = RequestSet::new();

        match action {
            Action::UpdateStyle(update) => {
                for style in &update.targets {
                    if let Some(oid) = self.resolve_logged(&style.target).await {
                        set.add_styles(&oid, &style.change.updated);
                    }
                }
            }
            Action::InsertElement(insert) => {
                let mut seen = BTreeSet::new();
                for target in &insert.targets {
                    let Some(parent) = self.resolve_location(target, &insert.location).await else {
                        continue;
                    };
                    if !seen.insert(parent.clone()) {
                        continue;
                    }
                    let change = StructureChange::Insert(CodeInsert {
                        position: insert.location.position,
                        element: to_code_element(&insert.element),
                        code_block: insert.code_block.clone(),
                        paste_params: insert.paste_params.clone(),
                    });
                    set.add_structure_change(&parent, change);
                }
            }
            Action::RemoveElement(remove) => {
                let mut seen = BTreeSet::new();
                for target in &remove.targets {
                    let Some(parent) = self.resolve_location(target, &remove.location).await else {
                        continue;
                    };
                    if !seen.insert(parent.clone()) {
                        continue;
                    }
                    let change = StructureChange::Remove {
                        source_id: remove.element.oid.clone(),
                        position: remove.location.position,
                    };
                    set.add_structure_change(&parent, change);
                }
            }
            Action::MoveElement(mv) => {
                let location = &mv.location;
                let mut seen = BTreeSet::new();
                for target in &mv.targets {
                    let Some(child) = self.resolve_logged(target).await else {
                        continue;
                    };
                    let parent_target = ActionTarget {
                        surface_id: target.surface_id.clone(),
                        address: location.target_address.clone(),
                        source_id: location.target_source_id.clone(),
                    };
                    let Some(parent) = self.resolve_logged(&parent_target).await else {
                        continue;
                    };
                    if !seen.insert((parent.clone(), child.clone())) {
                        continue;
                    }
                    let change = StructureChange::Move {
                        source_id: child,
                        index: location.index,
                        original_index: location.original_index,
                    };
                    set.add_structure_change(&parent, change);
                }
            }
            Action::EditText(edit) => {
                for target in &edit.targets {
                    if let Some(oid) = self.resolve_logged(target).await {
                        set.set_text(&oid, &edit.new_content);
                    }
                }
            }
            Action::GroupElements(group) => {
                if let Some((parent, children)) =
                    self.resolve_family(&group.parent, &group.children).await
                {
                    let change = StructureChange::Group {
                        container: to_code_element(&group.container.shell()),
                        children,
                    };
                    set.add_structure_change(&parent, change);
                }
            }
            Action::UngroupElements(ungroup) => {
                if let Some((parent, children)) =
                    self.resolve_family(&ungroup.parent, &ungroup.children).await
                {
                    let change = StructureChange::Ungroup {
                        container: to_code_element(&ungroup.container.shell()),
                        children,
                    };
                    set.add_structure_change(&parent, change);
                }
            }
            Action::InsertImage(image) => {
                for target in &image.targets {
                    if let Some(oid) = self.resolve_logged(target).await {
                        let change = StructureChange::InsertImage {
                            image: image.image.clone(),
                        };
                        set.add_structure_change(&oid, change);
                    }
                }
            }
            Action::RemoveImage(image) => {
                for target in &image.targets {
                    if let Some(oid) = self.resolve_logged(target).await {
                        let change = StructureChange::RemoveImage {
                            image: image.image.clone(),
                        };
                        set.add_structure_change(&oid, change);
                    }
                }
            }
            Action::WriteCode(_) => {}
        }

        set.into_requests()
    }

    /// Source id for one target: the id it carries, otherwise the template
    /// node mapped to its address.
    pub async fn resolve(&self, target: &ActionTarget) -> Result<String> {
        if let Some(source_id) = &target.source_id {
            return Ok(source_id.clone());
        }

        let nodes = &self.inner.template_nodes;
        let node = match self.inner.options.style_mode {
            StyleMode::Instance => nodes.get_any(&target.surface_id, &target.address).await,
            StyleMode::Root => nodes.get_root(&target.surface_id, &target.address).await,
        };
        node.map(|node| node.oid).ok_or_else(|| CodeError::Unresolved {
            surface_id: target.surface_id.clone(),
            address: target.address.clone(),
        })
    }

    async fn resolve_logged(&self, target: &ActionTarget) -> Option<String> {
        match self.resolve(target).await {
            Ok(oid) => Some(oid),
            Err(err) => {
                warn!(
                    surface_id = %target.surface_id,
                    address = %target.address,
                    error = %err,
                    "dropping edit from code write"
                );
                None
            }
        }
    }

    async fn resolve_location(
        &self,
        target: &ActionTarget,
        location: &ActionLocation,
    ) -> Option<String> {
        let parent = ActionTarget {
            surface_id: target.surface_id.clone(),
            address: location.target_address.clone(),
            source_id: location.target_source_id.clone(),
        };
        self.resolve_logged(&parent).await
    }

    /// Parent plus every child; all must resolve.
    async fn resolve_family(
        &self,
        parent: &ActionTarget,
        children: &[ActionTarget],
    ) -> Option<(String, Vec<String>)> {
        let parent = self.resolve_logged(parent).await?;
        let mut resolved = Vec::with_capacity(children.len());
        for child in children {
            resolved.push(self.resolve_logged(child).await?);
        }
        Some((parent, resolved))
    }

    /// Ask the diff service for diffs and write them. Returns whether the
    /// write happened.
    pub async fn get_and_write_code_diff(&self, requests: Vec<CodeDiffRequest>) -> bool {
        let count = requests.len();
        let diffs = match self.inner.diff_service.compute_diffs(&requests).await {
            Ok(diffs) if diffs.is_empty() => {
                warn!(error = %CodeError::NoDiffs(count), "write skipped");
                return false;
            }
            Ok(diffs) => diffs,
            Err(err) => {
                error!(error = %err, requests = count, "write skipped");
                return false;
            }
        };
        self.write_code_diffs(diffs).await
    }

    /// Hand diffs straight to the write service.
    pub async fn write_code_diffs(&self, diffs: Vec<CodeDiff>) -> bool {
        if diffs.is_empty() {
            warn!(error = %CodeError::NoDiffs(0), "write skipped");
            return false;
        }

        let count = diffs.len();
        if !self.inner.write_service.write_files(&diffs).await {
            error!(error = %CodeError::WriteRejected(count), "write failed");
            return false;
        }
        info!(files = count, "code written");

        let listeners = self.inner.listeners.read().await.clone();
        for listener in listeners {
            listener.clean_after_write().await;
        }
        true
    }
}

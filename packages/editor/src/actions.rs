//! # Action Dispatch
//!
//! `run` records an action in history and then applies it to every preview
//! surface it targets. `undo`/`redo` apply whatever history hands back.
//! History is what forwards actions to the write queue.
//!
//! A preview failure (unknown address, element gone) is logged and skipped;
//! it never stops the remaining targets or the write.

use crate::history::HistoryManager;
use crate::surface::{PreviewChannel, SurfaceRegistry};
use std::sync::Arc;
use tracing::{debug, warn};
use trellis_livetree::{DomUpdate, Result as PreviewResult};
use trellis_models::{Action, ActionElement, ActionTarget};

pub struct ActionManager {
    history: Arc<HistoryManager>,
    surfaces: Arc<SurfaceRegistry>,
}

impl ActionManager {
    pub fn new(history: Arc<HistoryManager>, surfaces: Arc<SurfaceRegistry>) -> Self {
        Self { history, surfaces }
    }

    pub fn history(&self) -> &Arc<HistoryManager> {
        &self.history
    }

    pub fn surfaces(&self) -> &Arc<SurfaceRegistry> {
        &self.surfaces
    }

    pub async fn run(&self, action: Action) {
        self.history.push(action.clone()).await;
        self.dispatch(&action).await;
    }

    /// Returns the reversed action that was applied, if there was one.
    pub async fn undo(&self) -> Option<Action> {
        let action = self.history.undo().await?;
        self.dispatch(&action).await;
        Some(action)
    }

    pub async fn redo(&self) -> Option<Action> {
        let action = self.history.redo().await?;
        self.dispatch(&action).await;
        Some(action)
    }

    /// Full snapshot of an element, as a remove action needs it.
    pub async fn snapshot(&self, target: &ActionTarget) -> Option<ActionElement> {
        let channel = self.channel(&target.surface_id).await?;
        match channel.snapshot(&target.address).await {
            Ok(element) => Some(element),
            Err(err) => {
                warn!(
                    surface_id = %target.surface_id,
                    address = %target.address,
                    error = %err,
                    "snapshot failed"
                );
                None
            }
        }
    }

    /// Apply `action` to the preview surfaces only.
    pub async fn dispatch(&self, action: &Action) {
        debug!(kind = %action.kind(), "dispatch");
        match action {
            Action::UpdateStyle(update) => {
                for style in &update.targets {
                    let target = &style.target;
                    if let Some(channel) = self.channel(&target.surface_id).await {
                        let result = channel
                            .update_style(&target.address, &style.change.updated)
                            .await;
                        report(target, result);
                    }
                }
            }
            Action::InsertElement(insert) => {
                for target in &insert.targets {
                    if let Some(channel) = self.channel(&target.surface_id).await {
                        let result = channel
                            .insert_element(&insert.element, &insert.location)
                            .await;
                        self.resync(target, result).await;
                    }
                }
            }
            Action::RemoveElement(remove) => {
                for target in &remove.targets {
                    if let Some(channel) = self.channel(&target.surface_id).await {
                        let result = channel
                            .remove_element(&remove.element, &remove.location)
                            .await;
                        self.resync(target, result).await;
                    }
                }
            }
            Action::MoveElement(mv) => {
                for target in &mv.targets {
                    if let Some(channel) = self.channel(&target.surface_id).await {
                        let result = channel.move_element(&target.address, mv.location.index).await;
                        self.resync(target, result).await;
                    }
                }
            }
            Action::EditText(edit) => {
                for target in &edit.targets {
                    if let Some(channel) = self.channel(&target.surface_id).await {
                        let result = channel.edit_text(&target.address, &edit.new_content).await;
                        report(target, result);
                    }
                }
            }
            Action::GroupElements(group) => {
                if let Some(channel) = self.channel(&group.parent.surface_id).await {
                    let result = channel
                        .group_elements(&group.parent, &group.container, &group.children)
                        .await;
                    self.resync(&group.parent, result).await;
                }
            }
            Action::UngroupElements(ungroup) => {
                if let Some(channel) = self.channel(&ungroup.parent.surface_id).await {
                    let result = channel
                        .ungroup_elements(&ungroup.parent, &ungroup.container)
                        .await;
                    self.resync(&ungroup.parent, result).await;
                }
            }
            Action::InsertImage(image) => {
                for target in &image.targets {
                    if let Some(channel) = self.channel(&target.surface_id).await {
                        let result = channel.insert_image(&target.address, &image.image).await;
                        report(target, result);
                    }
                }
            }
            Action::RemoveImage(image) => {
                for target in &image.targets {
                    if let Some(channel) = self.channel(&target.surface_id).await {
                        let result = channel.remove_image(&target.address).await;
                        report(target, result);
                    }
                }
            }
            // Source-only; the preview picks it up from the write.
            Action::WriteCode(_) => {}
        }
    }

    async fn channel(&self, surface_id: &str) -> Option<Arc<dyn PreviewChannel>> {
        let channel = self.surfaces.get(surface_id).await;
        if channel.is_none() {
            warn!(surface_id, "action targets an unregistered surface");
        }
        channel
    }

    async fn resync(&self, target: &ActionTarget, result: PreviewResult<DomUpdate>) {
        if let Some(update) = report(target, result) {
            self.surfaces.resync(&target.surface_id, update).await;
        }
    }
}

fn report<T>(target: &ActionTarget, result: PreviewResult<T>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(err) => {
            warn!(
                surface_id = %target.surface_id,
                address = %target.address,
                error = %err,
                "preview update failed"
            );
            None
        }
    }
}

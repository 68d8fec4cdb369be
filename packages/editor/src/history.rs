//! # Undo/Redo History
//!
//! Tracks committed actions and hands every committed, undone or redone
//! action to the write queue.
//!
//! ## Design
//!
//! - Undo pops an action, moves it to the redo stack and returns its reverse
//! - Redo moves it back and returns it as-is
//! - Any new push clears the redo stack
//! - Inside a transaction pushes are merged by kind (one action per kind),
//!   so a drag or a live text edit becomes a single undo step
//! - Style originals are remembered per element from the first push after
//!   the last commit, so a coalesced step undoes to the pre-gesture value
//!
//! Undo and redo commit an open transaction first.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, trace};
use trellis_code::CodeManager;
use trellis_models::{
    merge_transaction_actions, reverse_action, Action, StyleActionTarget, StyleMap,
};

/// Where committed actions go to be written to source.
#[async_trait]
pub trait WriteSink: Send + Sync {
    async fn write(&self, action: Action);
}

#[async_trait]
impl WriteSink for CodeManager {
    async fn write(&self, action: Action) {
        CodeManager::write(self, action).await
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TransactionState {
    #[default]
    NotInTransaction,
    InTransaction { actions: Vec<Action> },
}

#[derive(Debug, Default)]
struct HistoryState {
    /// Most recent last
    undo_stack: Vec<Action>,
    /// Most recent last
    redo_stack: Vec<Action>,
    transaction: TransactionState,
    /// First style original seen per element since the last commit.
    baseline: HashMap<String, StyleMap>,
    /// 0 = unlimited
    max_levels: usize,
}

impl HistoryState {
    fn record_baseline(&mut self, action: &Action) {
        let Action::UpdateStyle(update) = action else {
            return;
        };
        for target in &update.targets {
            let originals = self.baseline.entry(baseline_key(target)).or_default();
            for (property, value) in &target.change.original {
                originals
                    .entry(property.clone())
                    .or_insert_with(|| value.clone());
            }
        }
    }

    fn apply_baseline(&self, action: &mut Action) {
        let Action::UpdateStyle(update) = action else {
            return;
        };
        for target in &mut update.targets {
            let Some(originals) = self.baseline.get(&baseline_key(target)) else {
                continue;
            };
            for (property, value) in originals {
                if target.change.updated.contains_key(property) {
                    target
                        .change
                        .original
                        .insert(property.clone(), value.clone());
                }
            }
        }
    }

    /// Put `action` on the undo stack; returns what must be written.
    fn commit_entry(&mut self, mut action: Action) -> Action {
        self.redo_stack.clear();
        self.apply_baseline(&mut action);
        self.baseline.clear();

        self.undo_stack.push(action.clone());
        if self.max_levels > 0 && self.undo_stack.len() > self.max_levels {
            self.undo_stack.remove(0);
        }
        action
    }
}

fn baseline_key(target: &StyleActionTarget) -> String {
    match &target.target.source_id {
        Some(source_id) => source_id.clone(),
        None => format!("{}/{}", target.target.surface_id, target.target.address),
    }
}

pub struct HistoryManager {
    state: Mutex<HistoryState>,
    sink: Arc<dyn WriteSink>,
}

impl HistoryManager {
    pub fn new(sink: Arc<dyn WriteSink>) -> Self {
        Self::with_max_levels(sink, 0)
    }

    pub fn with_max_levels(sink: Arc<dyn WriteSink>, max_levels: usize) -> Self {
        Self {
            state: Mutex::new(HistoryState {
                max_levels,
                ..HistoryState::default()
            }),
            sink,
        }
    }

    /// Record an action. Inside a transaction it is merged into the buffer;
    /// otherwise it goes on the undo stack and to the write queue.
    pub async fn push(&self, action: Action) {
        let committed = {
            let mut state = self.state.lock().await;
            state.record_baseline(&action);
            if let TransactionState::InTransaction { actions } = &mut state.transaction {
                trace!(kind = %action.kind(), buffered = actions.len(), "merged into transaction");
                merge_transaction_actions(actions, action);
                None
            } else {
                Some(state.commit_entry(action))
            }
        };

        if let Some(action) = committed {
            debug!(kind = %action.kind(), "history push");
            self.sink.write(action).await;
        }
    }

    /// Open a transaction. Starting one while another is open keeps the
    /// existing buffer.
    pub async fn start_transaction(&self) {
        let mut state = self.state.lock().await;
        if state.transaction == TransactionState::NotInTransaction {
            state.transaction = TransactionState::InTransaction { actions: Vec::new() };
        }
    }

    /// Close the transaction and push each buffered action in the order it
    /// was first seen. An empty buffer commits nothing.
    pub async fn commit_transaction(&self) {
        let buffered = {
            let mut state = self.state.lock().await;
            match std::mem::take(&mut state.transaction) {
                TransactionState::InTransaction { actions } => actions,
                TransactionState::NotInTransaction => return,
            }
        };

        debug!(actions = buffered.len(), "commit transaction");
        for action in buffered {
            self.push(action).await;
        }
    }

    /// Reverse of the most recent action, already sent to the write queue.
    /// The caller applies it to the preview.
    pub async fn undo(&self) -> Option<Action> {
        self.commit_transaction().await;

        let reversed = {
            let mut state = self.state.lock().await;
            let action = state.undo_stack.pop()?;
            state.redo_stack.push(action.clone());
            reverse_action(action)
        };

        debug!(kind = %reversed.kind(), "undo");
        self.sink.write(reversed.clone()).await;
        Some(reversed)
    }

    /// The most recently undone action, already sent to the write queue.
    pub async fn redo(&self) -> Option<Action> {
        self.commit_transaction().await;

        let action = {
            let mut state = self.state.lock().await;
            let action = state.redo_stack.pop()?;
            state.undo_stack.push(action.clone());
            action
        };

        debug!(kind = %action.kind(), "redo");
        self.sink.write(action.clone()).await;
        Some(action)
    }

    pub async fn can_undo(&self) -> bool {
        !self.state.lock().await.undo_stack.is_empty()
    }

    pub async fn can_redo(&self) -> bool {
        !self.state.lock().await.redo_stack.is_empty()
    }

    pub async fn undo_len(&self) -> usize {
        self.state.lock().await.undo_stack.len()
    }

    pub async fn redo_len(&self) -> usize {
        self.state.lock().await.redo_stack.len()
    }

    pub async fn is_in_transaction(&self) -> bool {
        matches!(
            self.state.lock().await.transaction,
            TransactionState::InTransaction { .. }
        )
    }

    /// Most recent undo entry.
    pub async fn peek_undo(&self) -> Option<Action> {
        self.state.lock().await.undo_stack.last().cloned()
    }

    /// Drop all history, including an open transaction.
    pub async fn clear(&self) {
        let mut state = self.state.lock().await;
        state.undo_stack.clear();
        state.redo_stack.clear();
        state.transaction = TransactionState::NotInTransaction;
        state.baseline.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trellis_models::{ActionTarget, Change, EditTextAction, UpdateStyleAction};

    #[derive(Default)]
    struct RecordingSink(Mutex<Vec<Action>>);

    #[async_trait]
    impl WriteSink for RecordingSink {
        async fn write(&self, action: Action) {
            self.0.lock().await.push(action);
        }
    }

    impl RecordingSink {
        async fn written(&self) -> Vec<Action> {
            self.0.lock().await.clone()
        }
    }

    fn styles(pairs: &[(&str, &str)]) -> StyleMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn width(from: &str, to: &str) -> Action {
        Action::UpdateStyle(UpdateStyleAction {
            targets: vec![StyleActionTarget {
                target: ActionTarget::new("frame", "box").with_source_id("box-oid"),
                change: Change::new(styles(&[("width", from)]), styles(&[("width", to)])),
            }],
        })
    }

    fn text(from: &str, to: &str) -> Action {
        Action::EditText(EditTextAction {
            targets: vec![ActionTarget::new("frame", "title")],
            original_content: from.into(),
            new_content: to.into(),
        })
    }

    fn setup() -> (Arc<RecordingSink>, HistoryManager) {
        let sink = Arc::new(RecordingSink::default());
        let history = HistoryManager::new(sink.clone());
        (sink, history)
    }

    #[tokio::test]
    async fn test_push_undo_redo() {
        let (sink, history) = setup();
        history.push(width("10px", "20px")).await;
        assert_eq!(history.undo_len().await, 1);
        assert!(!history.can_redo().await);

        let undone = history.undo().await.unwrap();
        assert_eq!(undone, width("20px", "10px"));
        assert_eq!(history.undo_len().await, 0);
        assert_eq!(history.redo_len().await, 1);

        let redone = history.redo().await.unwrap();
        assert_eq!(redone, width("10px", "20px"));
        assert_eq!(history.undo_len().await, 1);
        assert_eq!(history.redo_len().await, 0);

        assert_eq!(
            sink.written().await,
            vec![width("10px", "20px"), width("20px", "10px"), width("10px", "20px")]
        );
    }

    #[tokio::test]
    async fn test_empty_undo_and_redo() {
        let (sink, history) = setup();
        assert_eq!(history.undo().await, None);
        assert_eq!(history.redo().await, None);
        assert!(sink.written().await.is_empty());
    }

    #[tokio::test]
    async fn test_new_push_clears_redo() {
        let (_, history) = setup();
        history.push(text("a", "b")).await;
        history.undo().await;
        assert!(history.can_redo().await);

        history.push(text("a", "c")).await;
        assert!(!history.can_redo().await);
        assert_eq!(history.redo().await, None);
    }

    #[tokio::test]
    async fn test_transaction_coalesces_to_first_original() {
        let (sink, history) = setup();
        history.start_transaction().await;
        for (from, to) in [("10px", "11px"), ("11px", "12px"), ("12px", "13px")] {
            history.push(width(from, to)).await;
        }
        assert!(history.is_in_transaction().await);
        assert!(sink.written().await.is_empty());

        history.commit_transaction().await;
        assert!(!history.is_in_transaction().await);
        assert_eq!(history.undo_len().await, 1);
        assert_eq!(history.peek_undo().await, Some(width("10px", "13px")));
        assert_eq!(sink.written().await, vec![width("10px", "13px")]);
    }

    #[tokio::test]
    async fn test_transaction_keeps_one_action_per_kind_in_order() {
        let (sink, history) = setup();
        history.start_transaction().await;
        history.push(text("a", "ab")).await;
        history.push(width("1px", "2px")).await;
        history.push(text("ab", "abc")).await;
        history.commit_transaction().await;

        assert_eq!(
            sink.written().await,
            vec![text("ab", "abc"), width("1px", "2px")]
        );
        assert_eq!(history.undo_len().await, 2);
    }

    #[tokio::test]
    async fn test_undo_commits_open_transaction() {
        let (_, history) = setup();
        history.start_transaction().await;
        history.push(width("1px", "5px")).await;

        let undone = history.undo().await.unwrap();
        assert_eq!(undone, width("5px", "1px"));
        assert!(!history.is_in_transaction().await);
        assert_eq!(history.redo_len().await, 1);
    }

    #[tokio::test]
    async fn test_empty_commit_is_noop() {
        let (sink, history) = setup();
        history.start_transaction().await;
        history.commit_transaction().await;
        history.commit_transaction().await;
        assert_eq!(history.undo_len().await, 0);
        assert!(sink.written().await.is_empty());
    }

    #[tokio::test]
    async fn test_max_levels_drops_oldest() {
        let sink = Arc::new(RecordingSink::default());
        let history = HistoryManager::with_max_levels(sink, 2);
        for i in 0..3 {
            history.push(text(&i.to_string(), &(i + 1).to_string())).await;
        }
        assert_eq!(history.undo_len().await, 2);
        assert_eq!(history.undo().await, Some(text("3", "2")));
        assert_eq!(history.undo().await, Some(text("2", "1")));
        assert_eq!(history.undo().await, None);
    }

    #[tokio::test]
    async fn test_clear() {
        let (_, history) = setup();
        history.push(text("a", "b")).await;
        history.push(text("b", "c")).await;
        history.undo().await;
        history.start_transaction().await;
        history.clear().await;

        assert!(!history.can_undo().await);
        assert!(!history.can_redo().await);
        assert!(!history.is_in_transaction().await);
    }
}

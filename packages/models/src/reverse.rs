//! Pure helpers used by history: reversing an action and folding actions
//! buffered inside a transaction.

use crate::actions::{
    Action, GroupElementsAction, InsertElementAction, MoveLocation, RemoveElementAction,
    StyleActionTarget, UngroupElementsAction, UpdateStyleAction, WriteCodeAction,
};

/// Structural inverse of `action`.
///
/// Applying `reverse_action(a)` after `a` restores the state before `a`.
/// Insert/remove snapshots are full-depth, so reversing twice yields an
/// action equal to the input.
pub fn reverse_action(action: Action) -> Action {
    match action {
        Action::UpdateStyle(UpdateStyleAction { targets }) => {
            Action::UpdateStyle(UpdateStyleAction {
                targets: targets
                    .into_iter()
                    .map(|target| StyleActionTarget {
                        target: target.target,
                        change: target.change.reverse(),
                    })
                    .collect(),
            })
        }
        Action::InsertElement(insert) => Action::RemoveElement(RemoveElementAction {
            targets: insert.targets,
            location: insert.location,
            element: insert.element,
            code_block: insert.code_block,
            paste_params: insert.paste_params,
        }),
        Action::RemoveElement(remove) => Action::InsertElement(InsertElementAction {
            targets: remove.targets,
            location: remove.location,
            element: remove.element,
            code_block: remove.code_block,
            paste_params: remove.paste_params,
        }),
        Action::MoveElement(mut action) => {
            action.location = MoveLocation {
                index: action.location.original_index,
                original_index: action.location.index,
                ..action.location
            };
            Action::MoveElement(action)
        }
        Action::EditText(mut action) => {
            std::mem::swap(&mut action.original_content, &mut action.new_content);
            Action::EditText(action)
        }
        Action::GroupElements(group) => Action::UngroupElements(UngroupElementsAction {
            parent: group.parent,
            container: group.container,
            children: group.children,
        }),
        Action::UngroupElements(ungroup) => Action::GroupElements(GroupElementsAction {
            parent: ungroup.parent,
            container: ungroup.container,
            children: ungroup.children,
        }),
        Action::InsertImage(action) => Action::RemoveImage(action),
        Action::RemoveImage(action) => Action::InsertImage(action),
        Action::WriteCode(WriteCodeAction { diffs }) => Action::WriteCode(WriteCodeAction {
            diffs: diffs.into_iter().map(|diff| diff.reverse()).collect(),
        }),
    }
}

/// Fold `incoming` into a transaction buffer.
///
/// At most one action per kind survives. A later action of the same kind
/// replaces the earlier one, except style updates, which merge per target
/// address and per property: the first `original` seen for a property is
/// kept and `updated` takes the latest value.
pub fn merge_transaction_actions(buffer: &mut Vec<Action>, incoming: Action) {
    let kind = incoming.kind();
    let Some(index) = buffer.iter().position(|action| action.kind() == kind) else {
        buffer.push(incoming);
        return;
    };

    match (&mut buffer[index], incoming) {
        (Action::UpdateStyle(existing), Action::UpdateStyle(incoming)) => {
            merge_style_targets(&mut existing.targets, incoming.targets);
        }
        (existing, incoming) => *existing = incoming,
    }
}

fn merge_style_targets(merged: &mut Vec<StyleActionTarget>, incoming: Vec<StyleActionTarget>) {
    for target in incoming {
        let found = merged.iter_mut().find(|t| {
            t.target.surface_id == target.target.surface_id
                && t.target.address == target.target.address
        });

        let Some(existing) = found else {
            merged.push(target);
            continue;
        };

        for (property, original) in target.change.original {
            existing.change.original.entry(property).or_insert(original);
        }
        for (property, updated) in target.change.updated {
            existing.change.updated.insert(property, updated);
        }
        if existing.target.source_id.is_none() {
            existing.target.source_id = target.target.source_id;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::{
        ActionLocation, ActionTarget, Change, EditTextAction, InsertPosition, MoveElementAction,
    };
    use crate::element::ActionElement;
    use crate::style::StyleMap;

    fn style(target: &str, original: &str, updated: &str) -> Action {
        let mut before = StyleMap::new();
        before.insert("width".into(), original.into());
        let mut after = StyleMap::new();
        after.insert("width".into(), updated.into());
        Action::UpdateStyle(UpdateStyleAction {
            targets: vec![StyleActionTarget {
                target: ActionTarget::new("frame", target),
                change: Change::new(before, after),
            }],
        })
    }

    fn insert() -> Action {
        let element = ActionElement::new("div", "new-1")
            .with_style("width", "100px")
            .with_child(ActionElement::new("span", "new-2").with_text("hello"));
        Action::InsertElement(InsertElementAction {
            targets: vec![ActionTarget::new("frame", "root-dom")],
            location: ActionLocation {
                target_address: "root-dom".into(),
                target_source_id: Some("root".into()),
                position: InsertPosition::Index { index: 0 },
            },
            element,
            code_block: None,
            paste_params: None,
        })
    }

    #[test]
    fn test_reverse_twice_is_identity() {
        let actions = vec![
            style("d1", "10px", "20px"),
            insert(),
            reverse_action(insert()),
            Action::MoveElement(MoveElementAction {
                targets: vec![ActionTarget::new("frame", "d2")],
                location: MoveLocation {
                    target_address: "p".into(),
                    target_source_id: None,
                    index: 3,
                    original_index: 1,
                },
            }),
            Action::EditText(EditTextAction {
                targets: vec![ActionTarget::new("frame", "d3")],
                original_content: "a".into(),
                new_content: "b".into(),
            }),
        ];

        for action in actions {
            assert_eq!(reverse_action(reverse_action(action.clone())), action);
        }
    }

    #[test]
    fn test_reverse_insert_keeps_full_snapshot() {
        let Action::RemoveElement(remove) = reverse_action(insert()) else {
            panic!("expected remove");
        };
        assert_eq!(remove.element.subtree_len(), 2);
        assert_eq!(remove.element.children[0].dom_id, "new-2");
        assert_eq!(remove.location.target_source_id.as_deref(), Some("root"));
    }

    #[test]
    fn test_reverse_move_swaps_indices() {
        let action = Action::MoveElement(MoveElementAction {
            targets: vec![],
            location: MoveLocation {
                target_address: "p".into(),
                target_source_id: None,
                index: 4,
                original_index: 2,
            },
        });
        let Action::MoveElement(reversed) = reverse_action(action) else {
            panic!("expected move");
        };
        assert_eq!(reversed.location.index, 2);
        assert_eq!(reversed.location.original_index, 4);
    }

    #[test]
    fn test_merge_keeps_first_original() {
        let mut buffer = Vec::new();
        merge_transaction_actions(&mut buffer, style("d1", "10px", "11px"));
        merge_transaction_actions(&mut buffer, style("d1", "11px", "12px"));
        merge_transaction_actions(&mut buffer, style("d1", "12px", "13px"));

        assert_eq!(buffer.len(), 1);
        let Action::UpdateStyle(merged) = &buffer[0] else {
            panic!("expected style");
        };
        assert_eq!(merged.targets.len(), 1);
        assert_eq!(merged.targets[0].change.original["width"], "10px");
        assert_eq!(merged.targets[0].change.updated["width"], "13px");
    }

    #[test]
    fn test_merge_one_action_per_kind() {
        let mut buffer = Vec::new();
        merge_transaction_actions(&mut buffer, style("d1", "1", "2"));
        merge_transaction_actions(&mut buffer, style("d2", "5", "6"));
        merge_transaction_actions(&mut buffer, insert());
        merge_transaction_actions(&mut buffer, insert());

        assert_eq!(buffer.len(), 2);
        assert_eq!(buffer[0].targets().len(), 2);
    }
}

//! # Item Reconciliation
//!
//! Decisions for creating and editing items in both tables, and for carrying a
//! usual item edit over to its shopping list counterpart.
//!
//! ## Usual Item Edit Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  create_or_update(existing usual item, new fields)                      │
//! │       │                                                                 │
//! │       ├── label changed AND new label taken? ──► Rejected               │
//! │       │                                                                 │
//! │       ├── item currently on the shopping list? ──► NeedsPropagation     │
//! │       │        │                                                        │
//! │       │        ▼  (user answers yes / no)                               │
//! │       │   update_item(old, new, propagate = Some(bool))                 │
//! │       │                                                                 │
//! │       └── otherwise ──► update_item(old, new, propagate = None)         │
//! │                                                                         │
//! │  plan_usual_update(kind, propagate, new label on shopping list?)        │
//! │                                                                         │
//! │   kind          propagate    on list   plan                             │
//! │   ────────────  ───────────  ────────  ───────────────────────────────  │
//! │   Unchanged     any          any       Skip                             │
//! │   any           None         any       UsualOnly(Recompute)             │
//! │   QuantityOnly  Some(true)   any       Linked                           │
//! │   QuantityOnly  Some(false)  any       UsualOnly(KeepLinked)            │
//! │   Relabel       Some(true)   no        Linked                           │
//! │   Relabel       Some(true)   yes       CannotPropagate                  │
//! │   Relabel       Some(false)  any       UsualOnly(Recompute)             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! `CannotPropagate` updates the usual item alone and leaves the old shopping
//! item where it was, so the two drift apart. Callers surface that to the user.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::validation::ItemInput;

// =============================================================================
// Edit Classification
// =============================================================================

/// What an edit changes on an existing item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditKind {
    /// All three fields identical.
    Unchanged,
    /// Same (name, category), different quantity.
    QuantityOnly,
    /// Name and/or category changed.
    Relabel,
}

impl EditKind {
    pub fn classify(name: &str, category: &str, quantity: &str, new: &ItemInput) -> Self {
        if name != new.name || category != new.category {
            EditKind::Relabel
        } else if quantity != new.quantity {
            EditKind::QuantityOnly
        } else {
            EditKind::Unchanged
        }
    }

    pub fn changes_label(&self) -> bool {
        matches!(self, EditKind::Relabel)
    }
}

// =============================================================================
// Outcomes
// =============================================================================

/// Result of a create-or-update request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum EditOutcome {
    /// Written (or nothing needed writing).
    Updated,
    /// The target (name, category) already exists; nothing written.
    Rejected,
    /// The usual item is on the shopping list; ask whether to carry the edit
    /// over, then call back with the answer.
    NeedsPropagationChoice,
}

impl EditOutcome {
    /// Collapses to the boolean the shopping list and category forms expect.
    pub fn succeeded(&self) -> bool {
        !matches!(self, EditOutcome::Rejected)
    }
}

/// What a create-or-update request should do, before any write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateDecision {
    Insert,
    Update,
    Reject,
    AskPropagation,
}

/// Decides a create-or-update request.
///
/// * `existing` - `(name, category)` of the edited item, `None` when creating
/// * `target_taken` - the new `(name, category)` exists in the same table
/// * `linked` - the edited item is a usual item currently on the shopping list
pub fn decide_create_or_update(
    existing: Option<(&str, &str)>,
    new: &ItemInput,
    target_taken: bool,
    linked: bool,
) -> CreateDecision {
    match existing {
        None if target_taken => CreateDecision::Reject,
        None => CreateDecision::Insert,
        Some((name, category)) => {
            let relabel = name != new.name || category != new.category;
            if relabel && target_taken {
                CreateDecision::Reject
            } else if linked {
                CreateDecision::AskPropagation
            } else {
                CreateDecision::Update
            }
        }
    }
}

// =============================================================================
// Usual Item Update Plan
// =============================================================================

/// How the usual item's `in_shopping_list` flag is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlagRule {
    /// Keep it set: the linked shopping item still exists under the same label.
    KeepLinked,
    /// Recompute from the shopping list after the update.
    Recompute,
}

/// Writes needed to apply a usual item edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UsualUpdatePlan {
    /// Nothing changed.
    Skip,
    /// Update the usual item only.
    UsualOnly(FlagRule),
    /// Update the usual item and the shopping item with its old label,
    /// in one transaction.
    Linked,
    /// Propagation was requested but the new label is already on the shopping
    /// list. Update the usual item only, flag recomputed, and report it.
    CannotPropagate,
}

impl UsualUpdatePlan {
    pub fn cannot_propagate(&self) -> bool {
        matches!(self, UsualUpdatePlan::CannotPropagate)
    }
}

/// Whether [`plan_usual_update`] needs to know if the new label is already on
/// the shopping list. Saves a lookup for every other combination.
pub fn needs_collision_check(kind: EditKind, propagate: Option<bool>) -> bool {
    kind == EditKind::Relabel && propagate == Some(true)
}

/// Plans a usual item edit. See the module table.
pub fn plan_usual_update(
    kind: EditKind,
    propagate: Option<bool>,
    new_label_on_list: bool,
) -> UsualUpdatePlan {
    match (kind, propagate) {
        (EditKind::Unchanged, _) => UsualUpdatePlan::Skip,
        (_, None) => UsualUpdatePlan::UsualOnly(FlagRule::Recompute),
        (EditKind::QuantityOnly, Some(true)) => UsualUpdatePlan::Linked,
        (EditKind::QuantityOnly, Some(false)) => UsualUpdatePlan::UsualOnly(FlagRule::KeepLinked),
        (EditKind::Relabel, Some(true)) if new_label_on_list => UsualUpdatePlan::CannotPropagate,
        (EditKind::Relabel, Some(true)) => UsualUpdatePlan::Linked,
        (EditKind::Relabel, Some(false)) => UsualUpdatePlan::UsualOnly(FlagRule::Recompute),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn input(name: &str, category: &str, quantity: &str) -> ItemInput {
        ItemInput {
            name: name.to_string(),
            category: category.to_string(),
            quantity: quantity.to_string(),
        }
    }

    #[test]
    fn test_classify() {
        assert_eq!(
            EditKind::classify("Milk", "Dairy", "1", &input("Milk", "Dairy", "1")),
            EditKind::Unchanged
        );
        assert_eq!(
            EditKind::classify("Milk", "Dairy", "1", &input("Milk", "Dairy", "2")),
            EditKind::QuantityOnly
        );
        assert_eq!(
            EditKind::classify("Milk", "Dairy", "1", &input("Milk", "Drinks", "1")),
            EditKind::Relabel
        );
    }

    #[test]
    fn test_create_decisions() {
        let milk = input("Milk", "Dairy", "2");

        assert_eq!(decide_create_or_update(None, &milk, false, false), CreateDecision::Insert);
        assert_eq!(decide_create_or_update(None, &milk, true, false), CreateDecision::Reject);

        // editing quantity of the same label never collides with itself
        assert_eq!(
            decide_create_or_update(Some(("Milk", "Dairy")), &milk, true, false),
            CreateDecision::Update
        );
        assert_eq!(
            decide_create_or_update(Some(("Cream", "Dairy")), &milk, true, true),
            CreateDecision::Reject
        );
        assert_eq!(
            decide_create_or_update(Some(("Milk", "Dairy")), &milk, true, true),
            CreateDecision::AskPropagation
        );
    }

    #[test]
    fn test_usual_update_plans() {
        use EditKind::*;

        assert_eq!(plan_usual_update(Unchanged, Some(true), false), UsualUpdatePlan::Skip);
        assert_eq!(
            plan_usual_update(QuantityOnly, None, false),
            UsualUpdatePlan::UsualOnly(FlagRule::Recompute)
        );
        assert_eq!(plan_usual_update(QuantityOnly, Some(true), false), UsualUpdatePlan::Linked);
        assert_eq!(
            plan_usual_update(QuantityOnly, Some(false), false),
            UsualUpdatePlan::UsualOnly(FlagRule::KeepLinked)
        );
        assert_eq!(plan_usual_update(Relabel, Some(true), false), UsualUpdatePlan::Linked);
        assert!(plan_usual_update(Relabel, Some(true), true).cannot_propagate());
        assert_eq!(
            plan_usual_update(Relabel, Some(false), true),
            UsualUpdatePlan::UsualOnly(FlagRule::Recompute)
        );
    }

    #[test]
    fn test_collision_check_only_for_propagated_relabel() {
        assert!(needs_collision_check(EditKind::Relabel, Some(true)));
        assert!(!needs_collision_check(EditKind::Relabel, Some(false)));
        assert!(!needs_collision_check(EditKind::QuantityOnly, Some(true)));
    }

    #[test]
    fn test_outcome_collapses_to_bool() {
        assert!(EditOutcome::Updated.succeeded());
        assert!(!EditOutcome::Rejected.succeeded());
    }
}

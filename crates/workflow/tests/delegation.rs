mod common;

use assert_matches::assert_matches;
use common::{date, harness};
use surat_core::disposition::{HistoryAction, NO_DEADLINE};
use surat_core::error::CoreError;
use surat_core::notifications::NotificationKind;
use surat_core::roles::{Actor, Role};
use surat_workflow::lifecycle::Delegation;
use uuid::Uuid;

fn delegation(to: Uuid, text: &str) -> Delegation {
    Delegation {
        new_assignee: to,
        instruction_text: text.to_string(),
        deadline: None,
        notes: None,
    }
}

#[tokio::test]
async fn delegation_reassigns_in_place_and_records_cause_before_effect() {
    let h = harness();
    let d = h.seed("Old instruction").await;
    let u2 = d.assigned_to;
    let u3 = h.backend.add_user();
    let rows_before = h.backend.state().dispositions.len();

    let updated = h
        .manager
        .delegate(
            d.id,
            delegation(u3, "New instruction"),
            &Actor::new(u2, Role::Staff),
        )
        .await
        .unwrap();

    assert_eq!(updated.id, d.id);
    assert_eq!(updated.assigned_to, u3);
    assert_eq!(updated.instruction_text, "New instruction");
    assert_eq!(updated.parent_disposition_id, None);
    assert_eq!(h.backend.state().dispositions.len(), rows_before);

    let history = h.backend.history_of(d.id);
    assert_eq!(history.len(), 3);
    assert_eq!(history[1].action, HistoryAction::Reassigned);
    assert_eq!(history[1].old_value, Some(u2.to_string()));
    assert_eq!(history[1].new_value, Some(u3.to_string()));
    assert_eq!(history[2].action, HistoryAction::TextUpdated);
    assert_eq!(history[2].old_value.as_deref(), Some("Old instruction"));
    assert_eq!(history[2].new_value.as_deref(), Some("New instruction"));
}

#[tokio::test]
async fn delegation_writes_all_three_entries_in_order() {
    let h = harness();
    let d = h.seed("Old instruction").await;
    let u3 = h.backend.add_user();
    let mut request = delegation(u3, "New instruction");
    request.deadline = Some(date(2026, 12, 1));

    h.manager.delegate(d.id, request, &h.supervisor()).await.unwrap();

    assert_eq!(
        h.backend.actions_of(d.id),
        vec![
            HistoryAction::Created,
            HistoryAction::Reassigned,
            HistoryAction::TextUpdated,
            HistoryAction::DeadlineChanged,
        ]
    );
    let deadline = h.backend.history_of(d.id).pop().unwrap();
    assert_eq!(deadline.old_value.as_deref(), Some(NO_DEADLINE));
    assert_eq!(deadline.new_value.as_deref(), Some("2026-12-01"));
}

#[tokio::test]
async fn delegation_with_same_text_and_deadline_writes_only_reassignment() {
    let h = harness();
    let d = h.seed("Same instruction").await;
    let u3 = h.backend.add_user();

    h.manager
        .delegate(d.id, delegation(u3, "Same instruction"), &h.supervisor())
        .await
        .unwrap();

    assert_eq!(
        h.backend.actions_of(d.id),
        vec![HistoryAction::Created, HistoryAction::Reassigned]
    );
}

#[tokio::test]
async fn delegation_notifies_the_new_assignee() {
    let h = harness();
    let d = h.seed("Old instruction").await;
    let u3 = h.backend.add_user();

    h.manager
        .delegate(d.id, delegation(u3, "New instruction"), &h.supervisor())
        .await
        .unwrap();

    let last = h.backend.notifications().pop().unwrap();
    assert_eq!(last.kind, NotificationKind::DispositionDelegated);
    assert_eq!(last.user_id, u3);
    assert_eq!(last.context.disposition_id, d.id);
}

#[tokio::test]
async fn delegation_replaces_notes_only_when_given() {
    let h = harness();
    let d = h.seed("Old instruction").await;
    let actor = h.supervisor();
    h.manager
        .update_notes(d.id, Some("keep me".into()), &actor)
        .await
        .unwrap();

    let u3 = h.backend.add_user();
    let updated = h
        .manager
        .delegate(d.id, delegation(u3, "Old instruction"), &actor)
        .await
        .unwrap();
    assert_eq!(updated.notes.as_deref(), Some("keep me"));

    let u4 = h.backend.add_user();
    let mut request = delegation(u4, "Old instruction");
    request.notes = Some("handed over".into());
    let updated = h.manager.delegate(d.id, request, &actor).await.unwrap();
    assert_eq!(updated.notes.as_deref(), Some("handed over"));
}

#[tokio::test]
async fn delegation_to_missing_user_is_a_reference_error() {
    let h = harness();
    let d = h.seed("Old instruction").await;
    let missing = Uuid::new_v4();

    let err = h
        .manager
        .delegate(d.id, delegation(missing, "New"), &h.supervisor())
        .await
        .unwrap_err();

    assert_matches!(err, CoreError::Reference { entity: "User", .. });
    assert_eq!(h.backend.disposition(d.id).unwrap().assigned_to, d.assigned_to);
    assert_eq!(h.backend.actions_of(d.id), vec![HistoryAction::Created]);
}

#[tokio::test]
async fn delegation_to_current_assignee_is_rejected() {
    let h = harness();
    let d = h.seed("Old instruction").await;

    let err = h
        .manager
        .delegate(d.id, delegation(d.assigned_to, "New"), &h.supervisor())
        .await
        .unwrap_err();

    assert_matches!(err, CoreError::Validation(_));
}

#[tokio::test]
async fn delegation_requires_instruction_text() {
    let h = harness();
    let d = h.seed("Old instruction").await;
    let u3 = h.backend.add_user();

    let err = h
        .manager
        .delegate(d.id, delegation(u3, "  "), &h.supervisor())
        .await
        .unwrap_err();

    assert_matches!(err, CoreError::Validation(_));
}

#[tokio::test]
async fn creator_without_assignment_cannot_delegate() {
    let h = harness();
    let d = h.seed("Old instruction").await;
    let u3 = h.backend.add_user();

    let err = h
        .manager
        .delegate(d.id, delegation(u3, "New"), &h.creator_actor())
        .await
        .unwrap_err();

    assert_matches!(err, CoreError::Forbidden(_));
    assert_eq!(h.backend.disposition(d.id).unwrap(), d);
}

//! Authorization guard for disposition mutations.
//!
//! Every predicate is pure over `(actor, disposition fields)`. The `require_*`
//! variants turn a `false` into [`CoreError::Forbidden`] carrying the reason.

use crate::error::CoreError;
use crate::roles::{Actor, Role};
use crate::types::DbId;

/// Any authenticated actor may create a disposition.
pub fn can_create(_actor: &Actor) -> bool {
    true
}

/// Elevated roles, the creator, or the current assignee.
pub fn can_update(actor: &Actor, assigned_to: DbId, created_by: DbId) -> bool {
    actor.role.is_elevated() || actor.user_id == created_by || actor.user_id == assigned_to
}

/// `SuperAdmin` or the creator. Holding the assignment is not enough.
pub fn can_delete(actor: &Actor, created_by: DbId) -> bool {
    actor.role == Role::SuperAdmin || actor.user_id == created_by
}

/// The current assignee, a `Supervisor`, or a `SuperAdmin`.
pub fn can_delegate(actor: &Actor, assigned_to: DbId) -> bool {
    actor.role.is_elevated() || actor.user_id == assigned_to
}

/// Linking a letter to an activity (and unlinking it) fans out work to
/// several users at once, so it needs an elevated role.
pub fn can_link(actor: &Actor) -> bool {
    actor.role.is_elevated()
}

pub fn require_create(actor: &Actor) -> Result<(), CoreError> {
    if can_create(actor) {
        Ok(())
    } else {
        Err(CoreError::Forbidden(
            "You are not allowed to create dispositions".into(),
        ))
    }
}

pub fn require_update(actor: &Actor, assigned_to: DbId, created_by: DbId) -> Result<(), CoreError> {
    if can_update(actor, assigned_to, created_by) {
        Ok(())
    } else {
        Err(CoreError::Forbidden(
            "Only the assignee, the creator, a Supervisor or a Super Admin can update this disposition"
                .into(),
        ))
    }
}

pub fn require_delete(actor: &Actor, created_by: DbId) -> Result<(), CoreError> {
    if can_delete(actor, created_by) {
        Ok(())
    } else {
        Err(CoreError::Forbidden(
            "Only the creator or a Super Admin can delete this disposition".into(),
        ))
    }
}

pub fn require_delegate(actor: &Actor, assigned_to: DbId) -> Result<(), CoreError> {
    if can_delegate(actor, assigned_to) {
        Ok(())
    } else {
        Err(CoreError::Forbidden(
            "Only the current assignee, a Supervisor or a Super Admin can delegate this disposition"
                .into(),
        ))
    }
}

pub fn require_link(actor: &Actor) -> Result<(), CoreError> {
    if can_link(actor) {
        Ok(())
    } else {
        Err(CoreError::Forbidden(
            "Supervisor or Super Admin role required to link letters to activities".into(),
        ))
    }
}

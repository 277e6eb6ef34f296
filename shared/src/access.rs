//! Edit/view access rule for fields and their irrigation logs
//!
//! A field is reachable by its owner and by the supervisor named in the
//! owner's profile. Everyone else must not learn the field exists.

use uuid::Uuid;

/// Who may act on a field: its owner and the owner's current supervisor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldAccess {
    pub owner_id: Uuid,
    pub supervisor_id: Option<Uuid>,
}

impl FieldAccess {
    pub fn new(owner_id: Uuid, supervisor_id: Option<Uuid>) -> Self {
        Self {
            owner_id,
            supervisor_id,
        }
    }

    pub fn permits(&self, requester_id: Uuid) -> bool {
        requester_id == self.owner_id || self.supervisor_id == Some(requester_id)
    }
}

use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::error::LendingError;
use super::models::{Member, MemberId};

/// Owns every member record.
#[derive(Debug, Default)]
pub struct MembershipRegistry {
    members: RwLock<BTreeMap<MemberId, Member>>,
}

impl MembershipRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, member: Member) -> Result<(), LendingError> {
        let mut members = self.write();
        let member_id = member.id();
        if members.contains_key(&member_id) {
            return Err(LendingError::DuplicateMember { member_id });
        }

        tracing::debug!(member_id, name = member.name(), "member registered");
        members.insert(member_id, member);
        Ok(())
    }

    pub fn find(&self, member_id: MemberId) -> Option<Member> {
        self.read().get(&member_id).cloned()
    }

    pub fn list(&self) -> Vec<Member> {
        self.read().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    pub(crate) fn read(&self) -> RwLockReadGuard<'_, BTreeMap<MemberId, Member>> {
        self.members.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn write(&self) -> RwLockWriteGuard<'_, BTreeMap<MemberId, Member>> {
        self.members.write().unwrap_or_else(PoisonError::into_inner)
    }
}

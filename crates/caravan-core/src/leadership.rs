use std::collections::BTreeSet;

use crate::error::CaravanError;
use crate::platform::MemberId;

/// Members allowed to mutate a caravan, on top of channel administrators.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LeadershipRegistry {
    leaders: BTreeSet<MemberId>,
}

impl LeadershipRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` if the member was already a leader.
    pub fn grant(&mut self, member: MemberId) -> bool {
        self.leaders.insert(member)
    }

    /// Returns `false` if the member was not a leader.
    pub fn revoke(&mut self, member: MemberId) -> bool {
        self.leaders.remove(&member)
    }

    pub fn is_leader(&self, member: MemberId) -> bool {
        self.leaders.contains(&member)
    }

    pub fn authorize(
        &self,
        member: MemberId,
        is_admin: bool,
        action: &'static str,
    ) -> Result<(), CaravanError> {
        if is_admin || self.is_leader(member) {
            Ok(())
        } else {
            Err(CaravanError::PermissionDenied {
                required: "caravan leaders",
                action,
            })
        }
    }

    /// Administrator-only check for managing the leader set itself.
    pub fn authorize_admin(is_admin: bool, action: &'static str) -> Result<(), CaravanError> {
        if is_admin {
            Ok(())
        } else {
            Err(CaravanError::PermissionDenied {
                required: "channel administrators",
                action,
            })
        }
    }

    /// Leaders in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = MemberId> + '_ {
        self.leaders.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.leaders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.leaders.is_empty()
    }
}

impl FromIterator<MemberId> for LeadershipRegistry {
    fn from_iter<I: IntoIterator<Item = MemberId>>(iter: I) -> Self {
        Self {
            leaders: iter.into_iter().collect(),
        }
    }
}

use std::collections::BTreeMap;

use crate::error::CaravanError;
use crate::platform::MemberId;

/// Outcome of a successful join.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinReceipt {
    pub member: MemberId,
    pub guests: u32,
    /// Guest count before this join, `None` for a new member.
    pub previous: Option<u32>,
    pub headcount: usize,
    /// Set when this join moved the headcount up across the warning threshold.
    pub advisory: bool,
}

impl JoinReceipt {
    pub fn changed(&self) -> bool {
        self.previous != Some(self.guests)
    }
}

/// Who is coming along, and how many guests each member brings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttendanceRoster {
    entries: BTreeMap<MemberId, u32>,
}

impl AttendanceRoster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or update a member. Never blocked by the headcount threshold.
    pub fn join(
        &mut self,
        member: MemberId,
        guests: u32,
        max_guests: u32,
        headcount_warning: usize,
    ) -> Result<JoinReceipt, CaravanError> {
        if guests > max_guests {
            return Err(CaravanError::TooManyGuests {
                guests,
                max: max_guests,
            });
        }

        let before = self.headcount();
        let previous = self.entries.insert(member, guests);
        let headcount = self.headcount();

        Ok(JoinReceipt {
            member,
            guests,
            previous,
            headcount,
            advisory: before < headcount_warning && headcount >= headcount_warning,
        })
    }

    /// Returns the guest count the member had, or `None` if absent.
    pub fn leave(&mut self, member: MemberId) -> Option<u32> {
        self.entries.remove(&member)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn guests(&self, member: MemberId) -> Option<u32> {
        self.entries.get(&member).copied()
    }

    /// Members plus all their guests.
    pub fn headcount(&self) -> usize {
        self.entries.len() + self.entries.values().map(|&g| g as usize).sum::<usize>()
    }

    /// Entries in ascending member id order.
    pub fn iter(&self) -> impl Iterator<Item = (MemberId, u32)> + '_ {
        self.entries.iter().map(|(&m, &g)| (m, g))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(MemberId, u32)> for AttendanceRoster {
    fn from_iter<I: IntoIterator<Item = (MemberId, u32)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAX: u32 = 10;
    const WARN: usize = 20;

    #[test]
    fn test_join_and_update() {
        let mut roster = AttendanceRoster::new();
        let receipt = roster.join(MemberId(1), 2, MAX, WARN).unwrap();
        assert_eq!(receipt.previous, None);
        assert_eq!(receipt.headcount, 3);
        assert!(receipt.changed());

        let receipt = roster.join(MemberId(1), 0, MAX, WARN).unwrap();
        assert_eq!(receipt.previous, Some(2));
        assert_eq!(receipt.headcount, 1);

        let receipt = roster.join(MemberId(1), 0, MAX, WARN).unwrap();
        assert!(!receipt.changed());
    }

    #[test]
    fn test_too_many_guests_leaves_roster_untouched() {
        let mut roster = AttendanceRoster::new();
        roster.join(MemberId(1), 1, MAX, WARN).unwrap();
        assert_eq!(
            roster.join(MemberId(1), 11, MAX, WARN),
            Err(CaravanError::TooManyGuests { guests: 11, max: 10 })
        );
        assert_eq!(roster.guests(MemberId(1)), Some(1));
    }

    #[test]
    fn test_leave_absent_member_is_noop() {
        let mut roster = AttendanceRoster::new();
        assert_eq!(roster.leave(MemberId(5)), None);
        roster.join(MemberId(5), 3, MAX, WARN).unwrap();
        assert_eq!(roster.leave(MemberId(5)), Some(3));
        assert!(roster.is_empty());
    }

    #[test]
    fn test_advisory_fires_once_per_crossing() {
        let mut roster = AttendanceRoster::new();
        // 19 people: one member with 9 guests, one with 8.
        assert!(!roster.join(MemberId(1), 9, MAX, WARN).unwrap().advisory);
        assert!(!roster.join(MemberId(2), 8, MAX, WARN).unwrap().advisory);
        assert_eq!(roster.headcount(), 19);

        // Exactly 20.
        let receipt = roster.join(MemberId(3), 0, MAX, WARN).unwrap();
        assert_eq!(receipt.headcount, 20);
        assert!(receipt.advisory);

        // Staying at or above the threshold does not re-fire.
        assert!(!roster.join(MemberId(4), 2, MAX, WARN).unwrap().advisory);
        assert!(!roster.join(MemberId(4), 1, MAX, WARN).unwrap().advisory);

        // Dropping below and coming back is a new crossing.
        roster.leave(MemberId(4));
        roster.leave(MemberId(3));
        assert_eq!(roster.headcount(), 19);
        assert!(roster.join(MemberId(5), 0, MAX, WARN).unwrap().advisory);
    }

    #[test]
    fn test_clear() {
        let mut roster: AttendanceRoster = [(MemberId(1), 1), (MemberId(2), 0)].into_iter().collect();
        assert_eq!(roster.headcount(), 3);
        roster.clear();
        assert_eq!(roster.headcount(), 0);
    }
}

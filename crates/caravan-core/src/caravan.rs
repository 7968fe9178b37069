use crate::leadership::LeadershipRegistry;
use crate::platform::DisplayedMessage;
use crate::roster::AttendanceRoster;
use crate::route::Route;

/// Everything one channel knows about its caravan.
///
/// Owned by exactly one channel actor. `displayed` mirrors the view messages
/// last known to be shown in the channel, in display order.
#[derive(Debug, Clone, Default)]
pub struct Caravan {
    pub route: Route,
    pub roster: AttendanceRoster,
    pub leaders: LeadershipRegistry,
    pub(crate) displayed: Vec<DisplayedMessage>,
}

impl Caravan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn displayed(&self) -> &[DisplayedMessage] {
        &self.displayed
    }

    /// Whether the route, roster and leaders match, ignoring view state.
    pub fn same_state(&self, other: &Caravan) -> bool {
        self.route == other.route && self.roster == other.roster && self.leaders == other.leaders
    }

    /// Back to an empty Forming route with nobody attending. Leaders stay.
    pub fn reset(&mut self) {
        self.route.reset();
        self.roster.clear();
    }
}

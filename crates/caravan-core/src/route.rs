//! Route itinerary and its Forming → Active → Completed state machine.
//!
//! The route holds resolved waypoints only; name resolution and
//! authorization happen in the controller. Stops before `position` have been
//! passed (visited, or skipped when they carry a skip reason). The stop at
//! `position` is the one the caravan is heading to.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use crate::catalog::Waypoint;
use crate::error::CaravanError;

/// Longest skip reason kept on a stop.
/// Bounds the size of a single rendered route line.
pub const MAX_SKIP_REASON_LENGTH: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    Forming,
    Active,
    Completed,
}

impl Mode {
    /// Capitalized name used in the rendered view.
    pub fn label(&self) -> &'static str {
        match self {
            Mode::Forming => "Forming",
            Mode::Active => "Active",
            Mode::Completed => "Completed",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "forming" => Some(Mode::Forming),
            "active" => Some(Mode::Active),
            "completed" => Some(Mode::Completed),
            _ => None,
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label().to_ascii_lowercase())
    }
}

/// Route-mutating operations, used as the key of [`OPERATION_TABLE`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    SetRoute,
    Start,
    Stop,
    Next,
    Prev,
    Skip,
    Remove,
    Append,
    Reset,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verb = match self {
            Operation::SetRoute => "set the route",
            Operation::Start => "start",
            Operation::Stop => "stop",
            Operation::Next => "advance",
            Operation::Prev => "go back",
            Operation::Skip => "skip a stop",
            Operation::Remove => "remove a stop",
            Operation::Append => "append a stop",
            Operation::Reset => "reset",
        };
        write!(f, "{}", verb)
    }
}

/// Which modes each operation is legal in, with the wording used when it
/// is not.
pub const OPERATION_TABLE: [(Operation, &[Mode], &str); 9] = [
    (Operation::SetRoute, &[Mode::Forming], "forming"),
    (Operation::Start, &[Mode::Forming], "forming"),
    (Operation::Stop, &[Mode::Active], "active"),
    (Operation::Next, &[Mode::Active], "active"),
    (Operation::Prev, &[Mode::Active], "active"),
    (Operation::Skip, &[Mode::Active], "active"),
    (Operation::Remove, &[Mode::Forming, Mode::Active], "forming or active"),
    (Operation::Append, &[Mode::Active], "active"),
    (
        Operation::Reset,
        &[Mode::Forming, Mode::Active, Mode::Completed],
        "any mode",
    ),
];

impl Operation {
    pub fn allowed_in(self, mode: Mode) -> bool {
        OPERATION_TABLE
            .iter()
            .any(|(op, modes, _)| *op == self && modes.contains(&mode))
    }

    fn required(self) -> &'static str {
        OPERATION_TABLE
            .iter()
            .find(|(op, _, _)| *op == self)
            .map(|(_, _, required)| *required)
            .unwrap_or("any mode")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Stop {
    pub waypoint: Arc<Waypoint>,
    /// Set when the stop was skipped rather than visited. May be empty.
    pub skip_reason: Option<String>,
}

impl Stop {
    pub fn new(waypoint: Arc<Waypoint>) -> Self {
        Self {
            waypoint,
            skip_reason: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.waypoint.name
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RouteStatistics {
    pub visited: usize,
    pub skipped: usize,
    pub remaining: usize,
}

/// Result of moving the caravan forward.
#[derive(Debug, Clone, PartialEq)]
pub enum Advance {
    Moved { next: Arc<Waypoint> },
    Completed(RouteStatistics),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    stops: Vec<Stop>,
    position: usize,
    mode: Mode,
}

impl Default for Route {
    fn default() -> Self {
        Self::new()
    }
}

impl Route {
    pub fn new() -> Self {
        Self {
            stops: Vec::new(),
            position: 0,
            mode: Mode::Forming,
        }
    }

    /// Rebuild a route from parsed parts, clamping anything out of range.
    pub(crate) fn from_parts(stops: Vec<Stop>, position: usize, mode: Mode) -> Self {
        let mut route = Self {
            position: position.min(stops.len()),
            stops,
            mode,
        };
        match route.mode {
            Mode::Forming => {
                route.position = 0;
                for stop in &mut route.stops {
                    stop.skip_reason = None;
                }
            }
            Mode::Active if route.position == route.stops.len() => {
                route.mode = Mode::Completed;
            }
            Mode::Completed => route.position = route.stops.len(),
            Mode::Active => {}
        }
        route
    }

    pub fn stops(&self) -> &[Stop] {
        &self.stops
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn len(&self) -> usize {
        self.stops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stops.is_empty()
    }

    /// The stop the caravan is heading to, if it is underway.
    pub fn current(&self) -> Option<&Stop> {
        match self.mode {
            Mode::Active => self.stops.get(self.position),
            _ => None,
        }
    }

    /// Stops not yet passed, in order.
    pub fn remaining(&self) -> &[Stop] {
        match self.mode {
            Mode::Forming => &self.stops,
            Mode::Active => &self.stops[self.position..],
            Mode::Completed => &[],
        }
    }

    /// Whether the stop at `index` has been passed.
    pub fn is_passed(&self, index: usize) -> bool {
        self.mode != Mode::Forming && index < self.position
    }

    pub fn statistics(&self) -> RouteStatistics {
        let mut stats = RouteStatistics::default();
        for (index, stop) in self.stops.iter().enumerate() {
            if !self.is_passed(index) {
                stats.remaining += 1;
            } else if stop.skip_reason.is_some() {
                stats.skipped += 1;
            } else {
                stats.visited += 1;
            }
        }
        stats
    }

    pub fn contains(&self, waypoint: &Waypoint) -> bool {
        self.stops.iter().any(|s| s.waypoint.name == waypoint.name)
    }

    pub fn check(&self, operation: Operation) -> Result<(), CaravanError> {
        if operation.allowed_in(self.mode) {
            Ok(())
        } else {
            Err(CaravanError::InvalidTransition {
                operation,
                mode: self.mode,
                required: operation.required(),
            })
        }
    }

    /// Replace the itinerary. Either every waypoint is accepted or the route
    /// is left untouched.
    pub fn set_stops(&mut self, waypoints: Vec<Arc<Waypoint>>) -> Result<(), CaravanError> {
        self.check(Operation::SetRoute)?;
        if waypoints.is_empty() {
            return Err(CaravanError::EmptyRoute);
        }
        ensure_unique(waypoints.iter().map(|w| w.name.as_str()))?;

        self.stops = waypoints.into_iter().map(Stop::new).collect();
        self.position = 0;
        Ok(())
    }

    pub fn start(&mut self) -> Result<Arc<Waypoint>, CaravanError> {
        self.check(Operation::Start)?;
        let first = self.stops.first().ok_or(CaravanError::EmptyRoute)?;
        let first = Arc::clone(&first.waypoint);
        self.mode = Mode::Active;
        self.position = 0;
        Ok(first)
    }

    /// Return to Forming so the itinerary can be edited again.
    pub fn stop(&mut self) -> Result<(), CaravanError> {
        self.check(Operation::Stop)?;
        self.mode = Mode::Forming;
        self.position = 0;
        for stop in &mut self.stops {
            stop.skip_reason = None;
        }
        Ok(())
    }

    pub fn next(&mut self) -> Result<Advance, CaravanError> {
        self.check(Operation::Next)?;
        if self.position >= self.stops.len() {
            return Err(CaravanError::AtEnd);
        }
        self.position += 1;
        Ok(self.settle())
    }

    pub fn skip(&mut self, reason: &str) -> Result<Advance, CaravanError> {
        self.check(Operation::Skip)?;
        let reason = clean_skip_reason(reason);
        let stop = self
            .stops
            .get_mut(self.position)
            .ok_or(CaravanError::AtEnd)?;
        stop.skip_reason = Some(reason);
        self.position += 1;
        Ok(self.settle())
    }

    pub fn prev(&mut self) -> Result<Arc<Waypoint>, CaravanError> {
        self.check(Operation::Prev)?;
        if self.position == 0 {
            return Err(CaravanError::AtStart);
        }
        self.position -= 1;
        let stop = &mut self.stops[self.position];
        stop.skip_reason = None;
        Ok(Arc::clone(&stop.waypoint))
    }

    /// Remove the stop at `index`, keeping `position` on the same logical
    /// next stop. Returns the removed stop and, if removing it finished an
    /// active caravan, the final statistics.
    pub fn remove(
        &mut self,
        index: usize,
    ) -> Result<(Stop, Option<RouteStatistics>), CaravanError> {
        self.check(Operation::Remove)?;
        if index >= self.stops.len() {
            return Err(CaravanError::NoSuchStop(index.to_string()));
        }

        let removed = self.stops.remove(index);
        if index < self.position {
            self.position -= 1;
        }

        let completed = match self.settle() {
            Advance::Completed(stats) if self.mode == Mode::Completed => Some(stats),
            _ => None,
        };
        Ok((removed, completed))
    }

    pub fn append(&mut self, waypoint: Arc<Waypoint>) -> Result<(), CaravanError> {
        self.check(Operation::Append)?;
        if self.contains(&waypoint) {
            return Err(CaravanError::DuplicateStop {
                names: vec![waypoint.name.clone()],
            });
        }
        self.stops.push(Stop::new(waypoint));
        Ok(())
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Complete an active route once every stop has been passed.
    fn settle(&mut self) -> Advance {
        if self.mode == Mode::Active {
            if let Some(next) = self.stops.get(self.position) {
                return Advance::Moved {
                    next: Arc::clone(&next.waypoint),
                };
            }
            self.mode = Mode::Completed;
            self.position = self.stops.len();
        }
        Advance::Completed(self.statistics())
    }
}

pub(crate) fn ensure_unique<'a>(names: impl Iterator<Item = &'a str>) -> Result<(), CaravanError> {
    let mut seen = BTreeSet::new();
    let mut duplicates = BTreeSet::new();
    for name in names {
        if !seen.insert(name) {
            duplicates.insert(name.to_string());
        }
    }
    if duplicates.is_empty() {
        Ok(())
    } else {
        Err(CaravanError::DuplicateStop {
            names: duplicates.into_iter().collect(),
        })
    }
}

fn clean_skip_reason(reason: &str) -> String {
    let single_line = reason.split_whitespace().collect::<Vec<_>>().join(" ");
    single_line.chars().take(MAX_SKIP_REASON_LENGTH).collect()
}

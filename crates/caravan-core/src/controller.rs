//! Applies parsed commands to a caravan.
//!
//! Every mutating command is authorized before anything else is looked at,
//! and every rejection leaves the caravan exactly as it was.

use std::sync::Arc;

use tracing::info;

use crate::caravan::Caravan;
use crate::catalog::{Resolution, Waypoint, WaypointCatalog};
use crate::command::{help_text, Command, Role};
use crate::error::CaravanError;
use crate::leadership::LeadershipRegistry;
use crate::platform::MemberId;
use crate::roster::JoinReceipt;
use crate::route::{ensure_unique, Advance, Operation, RouteStatistics};
use crate::settings::CaravanSettings;

/// Who issued a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub member: MemberId,
    /// Granted by the platform, independent of the leader set.
    pub is_admin: bool,
}

impl Actor {
    pub fn member(member: MemberId) -> Self {
        Self {
            member,
            is_admin: false,
        }
    }

    pub fn admin(member: MemberId) -> Self {
        Self {
            member,
            is_admin: true,
        }
    }
}

/// What a successful command did.
#[derive(Debug, Clone, PartialEq)]
pub enum CaravanEvent {
    Help(String),
    Version,
    RouteSet { stops: Vec<Arc<Waypoint>> },
    Started { first: Arc<Waypoint> },
    Stopped,
    Advanced(Advance),
    Skipped { name: String, advance: Advance },
    MovedBack { to: Arc<Waypoint> },
    Removed {
        name: String,
        next: Option<Arc<Waypoint>>,
        completed: Option<RouteStatistics>,
    },
    Appended { stops: Vec<Arc<Waypoint>> },
    Reset,
    LeadersGranted { added: Vec<MemberId>, leaders: Vec<MemberId> },
    LeadersRevoked { removed: Vec<MemberId>, leaders: Vec<MemberId> },
    Joined(JoinReceipt),
    Left { member: MemberId, guests: Option<u32> },
    Notified { message: String, recipients: Vec<MemberId> },
}

impl CaravanEvent {
    /// Whether the route, roster or leader set changed.
    pub fn changes_state(&self) -> bool {
        match self {
            CaravanEvent::Help(_) | CaravanEvent::Version | CaravanEvent::Notified { .. } => false,
            CaravanEvent::LeadersGranted { added, .. } => !added.is_empty(),
            CaravanEvent::LeadersRevoked { removed, .. } => !removed.is_empty(),
            CaravanEvent::Joined(receipt) => receipt.changed(),
            CaravanEvent::Left { guests, .. } => guests.is_some(),
            _ => true,
        }
    }
}

pub struct CaravanController {
    catalog: Arc<WaypointCatalog>,
    settings: CaravanSettings,
}

impl CaravanController {
    pub fn new(catalog: Arc<WaypointCatalog>, settings: CaravanSettings) -> Self {
        Self { catalog, settings }
    }

    pub fn catalog(&self) -> &Arc<WaypointCatalog> {
        &self.catalog
    }

    pub fn settings(&self) -> &CaravanSettings {
        &self.settings
    }

    /// Roles `actor` holds in `caravan`, lowest first.
    pub fn roles(caravan: &Caravan, actor: Actor) -> Vec<Role> {
        let mut roles = vec![Role::Anyone];
        if caravan.roster.guests(actor.member).is_some() {
            roles.push(Role::Member);
        }
        if caravan.leaders.is_leader(actor.member) {
            roles.push(Role::Leader);
        }
        if actor.is_admin {
            roles.push(Role::Admin);
        }
        roles
    }

    pub fn apply(
        &self,
        caravan: &mut Caravan,
        actor: Actor,
        command: Command,
    ) -> Result<CaravanEvent, CaravanError> {
        let event = match command {
            Command::Help(topic) => {
                let roles = Self::roles(caravan, actor);
                CaravanEvent::Help(help_text(&roles, topic.as_deref()))
            }
            Command::Version => CaravanEvent::Version,
            Command::SetRoute(names) => {
                self.authorize(caravan, actor, "set the route")?;
                caravan.route.check(Operation::SetRoute)?;
                let stops = self.resolve_all(&names)?;
                caravan.route.set_stops(stops.clone())?;
                CaravanEvent::RouteSet { stops }
            }
            Command::Start => {
                self.authorize(caravan, actor, "start the caravan")?;
                let first = caravan.route.start()?;
                CaravanEvent::Started { first }
            }
            Command::Stop => {
                self.authorize(caravan, actor, "stop the caravan")?;
                caravan.route.stop()?;
                CaravanEvent::Stopped
            }
            Command::Next => {
                self.authorize(caravan, actor, "advance the caravan")?;
                CaravanEvent::Advanced(caravan.route.next()?)
            }
            Command::Prev => {
                self.authorize(caravan, actor, "back the caravan up")?;
                let to = caravan.route.prev()?;
                CaravanEvent::MovedBack { to }
            }
            Command::Skip(reason) => {
                self.authorize(caravan, actor, "skip a stop")?;
                let name = caravan
                    .route
                    .current()
                    .map(|stop| stop.name().to_string())
                    .unwrap_or_default();
                let advance = caravan.route.skip(&reason)?;
                CaravanEvent::Skipped { name, advance }
            }
            Command::Remove(name) => {
                self.authorize(caravan, actor, "remove stops")?;
                caravan.route.check(Operation::Remove)?;
                let index = self.find_stop(caravan, &name)?;
                let (removed, completed) = caravan.route.remove(index)?;
                CaravanEvent::Removed {
                    name: removed.name().to_string(),
                    next: caravan.route.current().map(|s| Arc::clone(&s.waypoint)),
                    completed,
                }
            }
            Command::Append(names) => {
                self.authorize(caravan, actor, "append stops")?;
                caravan.route.check(Operation::Append)?;
                if names.is_empty() {
                    return Err(CaravanError::EmptyRoute);
                }
                let stops = self.resolve_all(&names)?;
                ensure_unique(
                    caravan
                        .route
                        .stops()
                        .iter()
                        .map(|s| s.name())
                        .chain(stops.iter().map(|w| w.name.as_str())),
                )?;
                for stop in &stops {
                    caravan.route.append(Arc::clone(stop))?;
                }
                CaravanEvent::Appended { stops }
            }
            Command::Reset => {
                self.authorize(caravan, actor, "reset the caravan")?;
                caravan.reset();
                CaravanEvent::Reset
            }
            Command::Grant(members) => {
                LeadershipRegistry::authorize_admin(actor.is_admin, "appoint caravan leaders")?;
                let added = members
                    .into_iter()
                    .filter(|&m| caravan.leaders.grant(m))
                    .collect();
                CaravanEvent::LeadersGranted {
                    added,
                    leaders: caravan.leaders.iter().collect(),
                }
            }
            Command::Revoke(members) => {
                LeadershipRegistry::authorize_admin(actor.is_admin, "remove caravan leaders")?;
                let removed = members
                    .into_iter()
                    .filter(|&m| caravan.leaders.revoke(m))
                    .collect();
                CaravanEvent::LeadersRevoked {
                    removed,
                    leaders: caravan.leaders.iter().collect(),
                }
            }
            Command::Join(guests) => CaravanEvent::Joined(caravan.roster.join(
                actor.member,
                guests,
                self.settings.max_guests,
                self.settings.headcount_warning,
            )?),
            Command::Leave => CaravanEvent::Left {
                member: actor.member,
                guests: caravan.roster.leave(actor.member),
            },
            Command::Notify(message) => CaravanEvent::Notified {
                message,
                recipients: caravan
                    .roster
                    .iter()
                    .map(|(member, _)| member)
                    .filter(|&member| member != actor.member)
                    .collect(),
            },
        };

        if event.changes_state() {
            info!(
                member = %actor.member,
                mode = %caravan.route.mode(),
                position = caravan.route.position(),
                stops = caravan.route.len(),
                headcount = caravan.roster.headcount(),
                "Caravan updated"
            );
        }
        Ok(event)
    }

    fn authorize(
        &self,
        caravan: &Caravan,
        actor: Actor,
        action: &'static str,
    ) -> Result<(), CaravanError> {
        caravan.leaders.authorize(actor.member, actor.is_admin, action)
    }

    /// Resolve every name, reporting all failures together.
    fn resolve_all(&self, names: &[String]) -> Result<Vec<Arc<Waypoint>>, CaravanError> {
        let mut resolved = Vec::with_capacity(names.len());
        let mut unresolved = Vec::new();
        let mut suggestions: Vec<String> = Vec::new();
        let mut ambiguous = None;

        for name in names {
            match self.catalog.resolve(name) {
                Resolution::Matched(waypoint) => resolved.push(waypoint),
                Resolution::Ambiguous(candidates) => {
                    ambiguous.get_or_insert_with(|| CaravanError::Ambiguous {
                        query: name.clone(),
                        candidates: candidates.iter().map(|w| w.name.clone()).collect(),
                    });
                }
                Resolution::Unresolved {
                    suggestions: candidates,
                } => {
                    unresolved.push(name.clone());
                    for candidate in candidates {
                        if !suggestions.contains(&candidate.name) {
                            suggestions.push(candidate.name.clone());
                        }
                    }
                }
            }
        }

        if !unresolved.is_empty() {
            return Err(CaravanError::Unresolved {
                names: unresolved,
                suggestions,
            });
        }
        if let Some(error) = ambiguous {
            return Err(error);
        }
        Ok(resolved)
    }

    /// Index of the route stop `name` refers to, matched only against the
    /// current stops.
    fn find_stop(&self, caravan: &Caravan, name: &str) -> Result<usize, CaravanError> {
        let route = &caravan.route;
        let waypoint = match self.catalog.resolve_within(name, |w| route.contains(w)) {
            Resolution::Matched(waypoint) => waypoint,
            Resolution::Ambiguous(candidates) => {
                return Err(CaravanError::Ambiguous {
                    query: name.to_string(),
                    candidates: candidates.iter().map(|w| w.name.clone()).collect(),
                })
            }
            Resolution::Unresolved { .. } => return Err(CaravanError::NoSuchStop(name.to_string())),
        };
        route
            .stops()
            .iter()
            .position(|s| s.waypoint.name == waypoint.name)
            .ok_or_else(|| CaravanError::NoSuchStop(name.to_string()))
    }
}

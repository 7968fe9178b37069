//! Caravan Core - coordination engine for chat-driven caravans.
//!
//! A caravan is a route of named waypoints walked in order by a group of
//! members under a set of leaders. Its only durable home is a pinned view
//! rendered into the chat channel itself, so this crate provides:
//!
//! - `catalog`: the fixed set of waypoints and fuzzy name resolution
//! - `route`, `roster`, `leadership`: the caravan's state and its rules
//! - `command` and `controller`: parsing chat commands and applying them
//! - `view`: rendering, reconciling and re-reading the pinned view
//! - `channel`: one serialized actor per channel

pub mod caravan;
pub mod catalog;
pub mod channel;
pub mod command;
pub mod controller;
pub mod error;
pub mod leadership;
pub mod notify;
pub mod platform;
pub mod retry;
pub mod roster;
pub mod route;
pub mod settings;
pub mod similarity;
pub mod view;

pub use caravan::Caravan;
pub use catalog::{Coordinate, Resolution, Waypoint, WaypointCatalog};
pub use channel::{CaravanHub, Handled, InboundMessage};
pub use command::Command;
pub use controller::{Actor, CaravanController, CaravanEvent};
pub use error::{CaravanError, CatalogError, HubError, PlatformError};
pub use platform::{ChannelId, DisplayedMessage, MemberId, MemoryPlatform, MessageId, ViewPlatform};
pub use route::{Mode, Route};
pub use settings::{CaravanSettings, RetryPolicy};
pub use view::{ReconcileReport, RehydrationWarning, ViewSynchronizer};

//! Keeps a channel's pinned view messages in step with its caravan.
//!
//! The view is the only durable record of a caravan. [`ViewSynchronizer`]
//! renders state into blocks, edits the displayed messages to match, and at
//! startup reads state back out of whatever is displayed.

pub mod grammar;

use std::fmt;
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::caravan::Caravan;
use crate::catalog::WaypointCatalog;
use crate::error::PlatformError;
use crate::platform::{ChannelId, DisplayedMessage, ViewPlatform};
use crate::retry::with_retry;
use crate::settings::CaravanSettings;

pub use grammar::{ParsedView, GRAMMAR_VERSION};

/// Something in a displayed view that could not be recovered. Never fatal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RehydrationWarning {
    MissingFooter { block: usize },
    UnsupportedVersion { block: usize, version: String },
    UnparseableLine { block: usize, line: String },
    MissingStatus,
    UnknownWaypoint { name: String },
    DuplicateStop { name: String },
    OutOfOrderVisit { name: String },
    NothingRecovered { blocks: usize },
    PlatformUnavailable(PlatformError),
}

impl fmt::Display for RehydrationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RehydrationWarning::MissingFooter { block } => {
                write!(f, "view message {} has no version footer", block)
            }
            RehydrationWarning::UnsupportedVersion { block, version } => {
                write!(f, "view message {} uses unsupported format {}", block, version)
            }
            RehydrationWarning::UnparseableLine { block, line } => {
                write!(f, "could not read line {:?} in view message {}", line, block)
            }
            RehydrationWarning::MissingStatus => write!(f, "view has no status line"),
            RehydrationWarning::UnknownWaypoint { name } => {
                write!(f, "route stop {:?} is not in the catalog", name)
            }
            RehydrationWarning::DuplicateStop { name } => {
                write!(f, "route stop {:?} appears more than once", name)
            }
            RehydrationWarning::OutOfOrderVisit { name } => {
                write!(f, "route stop {:?} is marked visited after an unvisited stop", name)
            }
            RehydrationWarning::NothingRecovered { blocks } => {
                write!(f, "none of the {} view messages could be read", blocks)
            }
            RehydrationWarning::PlatformUnavailable(err) => {
                write!(f, "could not fetch view messages: {}", err)
            }
        }
    }
}

/// What one reconcile pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub edited: usize,
    pub created: usize,
    pub retired: usize,
    /// Steps that failed after retries. The next pass tries them again.
    pub failures: Vec<PlatformError>,
}

impl ReconcileReport {
    pub fn is_noop(&self) -> bool {
        self.edited + self.created + self.retired == 0 && self.failures.is_empty()
    }
}

pub struct ViewSynchronizer {
    platform: Arc<dyn ViewPlatform>,
    catalog: Arc<WaypointCatalog>,
    settings: CaravanSettings,
}

impl ViewSynchronizer {
    pub fn new(
        platform: Arc<dyn ViewPlatform>,
        catalog: Arc<WaypointCatalog>,
        settings: CaravanSettings,
    ) -> Self {
        Self {
            platform,
            catalog,
            settings,
        }
    }

    pub fn platform(&self) -> &Arc<dyn ViewPlatform> {
        &self.platform
    }

    pub fn render(&self, caravan: &Caravan) -> Vec<String> {
        grammar::render(caravan, &self.settings)
    }

    /// Bring the displayed messages in line with the caravan's rendering.
    ///
    /// Block `i` is edited in place when it differs, extra blocks are posted
    /// after the last displayed one, and surplus trailing messages retired.
    /// Makes no platform calls when nothing changed. A step that still fails
    /// after retries is reported and leaves `caravan.displayed` describing
    /// what is really shown, so the next pass repeats it.
    pub async fn reconcile(&self, channel: ChannelId, caravan: &mut Caravan) -> ReconcileReport {
        let desired = self.render(caravan);
        let policy = self.settings.retry;
        let mut report = ReconcileReport::default();

        for (index, content) in desired.iter().enumerate() {
            if let Some(shown) = caravan.displayed.get(index) {
                if shown.content == *content {
                    continue;
                }
                let id = shown.id;
                let result = with_retry(&policy, channel, "edit view", || {
                    self.platform.edit_view(channel, id, content)
                })
                .await;
                match result {
                    Ok(()) => {
                        caravan.displayed[index].content = content.clone();
                        report.edited += 1;
                    }
                    Err(err) => report.failures.push(err),
                }
            } else {
                let result = with_retry(&policy, channel, "post view", || {
                    self.platform.post_view(channel, content)
                })
                .await;
                match result {
                    Ok(id) => {
                        caravan.displayed.push(DisplayedMessage {
                            id,
                            content: content.clone(),
                        });
                        report.created += 1;
                    }
                    Err(err) => {
                        // Later blocks must come after this one.
                        report.failures.push(err);
                        break;
                    }
                }
            }
        }

        while caravan.displayed.len() > desired.len() {
            let Some(surplus) = caravan.displayed.last() else {
                break;
            };
            let id = surplus.id;
            let result = with_retry(&policy, channel, "retire view", || {
                self.platform.retire_view(channel, id)
            })
            .await;
            match result {
                Ok(()) => {
                    caravan.displayed.pop();
                    report.retired += 1;
                }
                Err(err) => {
                    report.failures.push(err);
                    break;
                }
            }
        }

        for failure in &report.failures {
            error!(channel = %channel, error = %failure, "View update failed");
        }
        if !report.is_noop() {
            debug!(
                channel = %channel,
                edited = report.edited,
                created = report.created,
                retired = report.retired,
                "Reconciled view"
            );
        }
        report
    }

    /// Rebuild a channel's caravan from its displayed view.
    ///
    /// Every displayed message is kept in `displayed`, readable or not, so
    /// the next reconcile overwrites or retires it.
    pub async fn rehydrate(&self, channel: ChannelId) -> (Caravan, Vec<RehydrationWarning>) {
        let messages = match with_retry(&self.settings.retry, channel, "fetch view", || {
            self.platform.view_messages(channel)
        })
        .await
        {
            Ok(messages) => messages,
            Err(err) => {
                let warning = RehydrationWarning::PlatformUnavailable(err);
                warn!(channel = %channel, warning = %warning, "Starting from an empty caravan");
                return (Caravan::new(), vec![warning]);
            }
        };

        let contents: Vec<&str> = messages.iter().map(|m| m.content.as_str()).collect();
        let ParsedView {
            mut caravan,
            warnings,
        } = grammar::parse(&contents, &self.catalog);
        caravan.displayed = messages;

        for warning in &warnings {
            warn!(channel = %channel, warning = %warning, "Partial view rehydration");
        }
        info!(
            channel = %channel,
            blocks = caravan.displayed.len(),
            mode = %caravan.route.mode(),
            stops = caravan.route.len(),
            members = caravan.roster.len(),
            leaders = caravan.leaders.len(),
            "Rehydrated caravan"
        );
        (caravan, warnings)
    }
}

//! One serialized actor per channel.
//!
//! [`CaravanHub`] routes inbound messages by channel to a Tokio task that
//! exclusively owns that channel's [`Caravan`]. Messages for one channel are
//! handled strictly in arrival order, each one's render and reconcile
//! finishing before the next is read. Queues are unbounded, so handing a
//! message to a busy channel never holds up delivery to another.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::future::join_all;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::caravan::Caravan;
use crate::command;
use crate::controller::{Actor, CaravanController, CaravanEvent};
use crate::error::{CaravanError, HubError};
use crate::notify;
use crate::platform::ChannelId;
use crate::retry::with_retry;
use crate::view::{RehydrationWarning, ViewSynchronizer};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub channel: ChannelId,
    pub actor: Actor,
    pub content: String,
}

/// How a channel actor dealt with one message.
#[derive(Debug, Clone, PartialEq)]
pub enum Handled {
    /// Not a command for this bot.
    Ignored,
    Applied(CaravanEvent),
    Rejected(CaravanError),
}

enum Envelope {
    Message {
        message: InboundMessage,
        reply: Option<oneshot::Sender<Handled>>,
    },
    Snapshot(oneshot::Sender<Caravan>),
    Warnings(oneshot::Sender<Vec<RehydrationWarning>>),
}

struct ChannelActor {
    channel: ChannelId,
    caravan: Caravan,
    controller: Arc<CaravanController>,
    sync: Arc<ViewSynchronizer>,
    inbox: mpsc::UnboundedReceiver<Envelope>,
    /// What could not be read back from the view at startup.
    warnings: Vec<RehydrationWarning>,
    /// A view update failed and has not been repeated successfully yet.
    stale: bool,
}

impl ChannelActor {
    async fn run(mut self) {
        // Nothing is read from the queue until the view has been parsed.
        let (caravan, warnings) = self.sync.rehydrate(self.channel).await;
        self.caravan = caravan;
        if !warnings.is_empty() {
            self.send_notice(&notify::rehydration_notice(&warnings)).await;
        }
        self.warnings = warnings;

        while let Some(envelope) = self.inbox.recv().await {
            match envelope {
                Envelope::Message { message, reply } => {
                    let handled = self.handle(message).await;
                    if let Some(reply) = reply {
                        let _ = reply.send(handled);
                    }
                }
                Envelope::Snapshot(reply) => {
                    let _ = reply.send(self.caravan.clone());
                }
                Envelope::Warnings(reply) => {
                    let _ = reply.send(self.warnings.clone());
                }
            }
        }

        debug!(channel = %self.channel, "Channel actor stopped");
    }

    async fn handle(&mut self, message: InboundMessage) -> Handled {
        let actor = message.actor;
        let parsed = match command::parse(&message.content) {
            Some(parsed) => parsed,
            None => return Handled::Ignored,
        };
        let result =
            parsed.and_then(|command| self.controller.apply(&mut self.caravan, actor, command));

        let changed = matches!(&result, Ok(event) if event.changes_state());
        if changed || self.stale {
            let report = self.sync.reconcile(self.channel, &mut self.caravan).await;
            self.stale = !report.failures.is_empty();
        }

        let notice = match &result {
            Ok(event) => notify::event_notice(event, actor),
            Err(err) => {
                debug!(
                    channel = %self.channel,
                    member = %actor.member,
                    error = %err,
                    "Command rejected"
                );
                notify::error_notice(err, actor)
            }
        };
        self.send_notice(&notice).await;

        match result {
            Ok(event) => Handled::Applied(event),
            Err(err) => Handled::Rejected(err),
        }
    }

    async fn send_notice(&self, notice: &str) {
        let platform = self.sync.platform();
        let policy = self.controller.settings().retry;
        let result = with_retry(&policy, self.channel, "send notice", || {
            platform.send_notice(self.channel, notice)
        })
        .await;
        if let Err(err) = result {
            error!(channel = %self.channel, error = %err, "Failed to send notice");
        }
    }
}

struct ChannelHandle {
    sender: mpsc::UnboundedSender<Envelope>,
    task: JoinHandle<()>,
}

#[derive(Default)]
struct HubState {
    channels: HashMap<ChannelId, ChannelHandle>,
    closed: bool,
}

/// Routes messages to per-channel actors, starting each actor on first use.
pub struct CaravanHub {
    controller: Arc<CaravanController>,
    sync: Arc<ViewSynchronizer>,
    state: Mutex<HubState>,
}

impl CaravanHub {
    pub fn new(controller: Arc<CaravanController>, sync: Arc<ViewSynchronizer>) -> Self {
        Self {
            controller,
            sync,
            state: Mutex::new(HubState::default()),
        }
    }

    fn state(&self) -> MutexGuard<'_, HubState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn sender(&self, channel: ChannelId) -> Result<mpsc::UnboundedSender<Envelope>, HubError> {
        let mut state = self.state();
        if state.closed {
            return Err(HubError::ChannelClosed(channel));
        }
        let handle = state.channels.entry(channel).or_insert_with(|| {
            let (sender, inbox) = mpsc::unbounded_channel();
            let actor = ChannelActor {
                channel,
                caravan: Caravan::new(),
                controller: Arc::clone(&self.controller),
                sync: Arc::clone(&self.sync),
                inbox,
                warnings: Vec::new(),
                stale: false,
            };
            info!(channel = %channel, "Starting channel actor");
            ChannelHandle {
                sender,
                task: tokio::spawn(actor.run()),
            }
        });
        Ok(handle.sender.clone())
    }

    fn send(&self, channel: ChannelId, envelope: Envelope) -> Result<(), HubError> {
        self.sender(channel)?
            .send(envelope)
            .map_err(|_| HubError::ChannelClosed(channel))
    }

    /// Queue a message without waiting for it to be handled. Never waits on
    /// the channel itself, however far behind it is.
    pub fn dispatch(&self, message: InboundMessage) -> Result<(), HubError> {
        let channel = message.channel;
        self.send(channel, Envelope::Message { message, reply: None })
    }

    /// Queue a message and wait for its outcome.
    pub async fn request(&self, message: InboundMessage) -> Result<Handled, HubError> {
        let channel = message.channel;
        let (reply, outcome) = oneshot::channel();
        self.send(
            channel,
            Envelope::Message {
                message,
                reply: Some(reply),
            },
        )?;
        outcome.await.map_err(|_| HubError::NoReply(channel))
    }

    /// A copy of the channel's caravan once every earlier message is handled.
    pub async fn snapshot(&self, channel: ChannelId) -> Result<Caravan, HubError> {
        let (reply, caravan) = oneshot::channel();
        self.send(channel, Envelope::Snapshot(reply))?;
        caravan.await.map_err(|_| HubError::NoReply(channel))
    }

    /// Problems found while rebuilding the channel's caravan from its view.
    pub async fn rehydration_warnings(
        &self,
        channel: ChannelId,
    ) -> Result<Vec<RehydrationWarning>, HubError> {
        let (reply, warnings) = oneshot::channel();
        self.send(channel, Envelope::Warnings(reply))?;
        warnings.await.map_err(|_| HubError::NoReply(channel))
    }

    pub fn channel_count(&self) -> usize {
        self.state().channels.len()
    }

    /// Stop accepting messages, let every actor drain its queue, and wait
    /// for all of them to finish.
    pub async fn shutdown(&self) {
        let handles: Vec<ChannelHandle> = {
            let mut state = self.state();
            state.closed = true;
            state.channels.drain().map(|(_, handle)| handle).collect()
        };
        info!(channels = handles.len(), "Shutting down channel actors");

        let tasks = handles.into_iter().map(|handle| {
            drop(handle.sender);
            handle.task
        });
        for result in join_all(tasks).await {
            if let Err(err) = result {
                error!(error = %err, "Channel actor panicked");
            }
        }
    }
}

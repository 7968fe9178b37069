//! The seam between the coordination engine and a chat platform.
//!
//! [`ViewPlatform`] is the only way the core talks to the outside world. The
//! real platform session layer implements it elsewhere; [`MemoryPlatform`]
//! keeps everything in memory and records each call.

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::error::PlatformError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChannelId(pub u64);

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MessageId(pub u64);

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A chat member. Displays as a platform mention, `<@id>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MemberId(pub u64);

impl MemberId {
    /// Parse a `<@id>` or `<@!id>` mention, or a bare id.
    pub fn parse_mention(text: &str) -> Option<Self> {
        let text = text.trim();
        let inner = match text.strip_prefix("<@").and_then(|t| t.strip_suffix('>')) {
            Some(inner) => inner.strip_prefix('!').unwrap_or(inner),
            None => text,
        };
        inner.parse().ok().map(MemberId)
    }
}

impl fmt::Display for MemberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<@{}>", self.0)
    }
}

/// A view message as currently shown in a channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayedMessage {
    pub id: MessageId,
    pub content: String,
}

#[async_trait]
pub trait ViewPlatform: Send + Sync {
    /// View messages the bot currently shows in `channel`, in display order.
    async fn view_messages(&self, channel: ChannelId)
        -> Result<Vec<DisplayedMessage>, PlatformError>;

    /// Create and pin a new view message after the existing ones.
    async fn post_view(&self, channel: ChannelId, content: &str)
        -> Result<MessageId, PlatformError>;

    async fn edit_view(
        &self,
        channel: ChannelId,
        message: MessageId,
        content: &str,
    ) -> Result<(), PlatformError>;

    /// Unpin and delete a view message.
    async fn retire_view(&self, channel: ChannelId, message: MessageId)
        -> Result<(), PlatformError>;

    /// Send an ordinary (unpinned) message to the channel.
    async fn send_notice(&self, channel: ChannelId, content: &str) -> Result<(), PlatformError>;
}

/// One recorded outbound call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlatformCall {
    Fetch(ChannelId),
    Post { channel: ChannelId, content: String },
    Edit { channel: ChannelId, message: MessageId, content: String },
    Retire { channel: ChannelId, message: MessageId },
    Notice { channel: ChannelId, content: String },
}

impl PlatformCall {
    /// Whether the call changes the pinned view.
    pub fn is_view_change(&self) -> bool {
        matches!(
            self,
            PlatformCall::Post { .. } | PlatformCall::Edit { .. } | PlatformCall::Retire { .. }
        )
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    views: HashMap<ChannelId, Vec<DisplayedMessage>>,
    notices: HashMap<ChannelId, Vec<String>>,
    calls: Vec<PlatformCall>,
    failures: VecDeque<PlatformError>,
    next_id: u64,
}

impl MemoryState {
    fn allocate_id(&mut self) -> MessageId {
        self.next_id += 1;
        MessageId(self.next_id)
    }
}

/// In-memory platform. Every call is recorded; queued failures are returned
/// by the next calls in order, before the call takes effect.
#[derive(Debug, Default)]
pub struct MemoryPlatform {
    state: Mutex<MemoryState>,
}

impl MemoryPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Pretend `contents` were already pinned in `channel`, e.g. from a
    /// previous run.
    pub fn seed(&self, channel: ChannelId, contents: &[&str]) {
        let mut state = self.state();
        let messages: Vec<DisplayedMessage> = contents
            .iter()
            .map(|content| DisplayedMessage {
                id: state.allocate_id(),
                content: content.to_string(),
            })
            .collect();
        state.views.insert(channel, messages);
    }

    /// Queue a failure for the next call.
    pub fn fail_next(&self, error: PlatformError) {
        self.state().failures.push_back(error);
    }

    pub fn displayed(&self, channel: ChannelId) -> Vec<DisplayedMessage> {
        self.state().views.get(&channel).cloned().unwrap_or_default()
    }

    pub fn notices(&self, channel: ChannelId) -> Vec<String> {
        self.state().notices.get(&channel).cloned().unwrap_or_default()
    }

    pub fn calls(&self) -> Vec<PlatformCall> {
        self.state().calls.clone()
    }

    /// Number of calls that changed a pinned view.
    pub fn view_change_count(&self) -> usize {
        self.state().calls.iter().filter(|c| c.is_view_change()).count()
    }

    fn record(&self, call: PlatformCall) -> Result<MutexGuard<'_, MemoryState>, PlatformError> {
        let mut state = self.state();
        state.calls.push(call);
        match state.failures.pop_front() {
            Some(error) => Err(error),
            None => Ok(state),
        }
    }
}

#[async_trait]
impl ViewPlatform for MemoryPlatform {
    async fn view_messages(
        &self,
        channel: ChannelId,
    ) -> Result<Vec<DisplayedMessage>, PlatformError> {
        let state = self.record(PlatformCall::Fetch(channel))?;
        Ok(state.views.get(&channel).cloned().unwrap_or_default())
    }

    async fn post_view(&self, channel: ChannelId, content: &str) -> Result<MessageId, PlatformError> {
        let mut state = self.record(PlatformCall::Post {
            channel,
            content: content.to_string(),
        })?;
        let id = state.allocate_id();
        state.views.entry(channel).or_default().push(DisplayedMessage {
            id,
            content: content.to_string(),
        });
        Ok(id)
    }

    async fn edit_view(
        &self,
        channel: ChannelId,
        message: MessageId,
        content: &str,
    ) -> Result<(), PlatformError> {
        let mut state = self.record(PlatformCall::Edit {
            channel,
            message,
            content: content.to_string(),
        })?;
        let displayed = state
            .views
            .get_mut(&channel)
            .and_then(|messages| messages.iter_mut().find(|m| m.id == message))
            .ok_or_else(|| PlatformError::Permanent(format!("unknown message {}", message)))?;
        displayed.content = content.to_string();
        Ok(())
    }

    async fn retire_view(&self, channel: ChannelId, message: MessageId) -> Result<(), PlatformError> {
        let mut state = self.record(PlatformCall::Retire { channel, message })?;
        if let Some(messages) = state.views.get_mut(&channel) {
            messages.retain(|m| m.id != message);
        }
        Ok(())
    }

    async fn send_notice(&self, channel: ChannelId, content: &str) -> Result<(), PlatformError> {
        let mut state = self.record(PlatformCall::Notice {
            channel,
            content: content.to_string(),
        })?;
        state
            .notices
            .entry(channel)
            .or_default()
            .push(content.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_member_mention_round_trip() {
        assert_eq!(MemberId(42).to_string(), "<@42>");
        assert_eq!(MemberId::parse_mention("<@42>"), Some(MemberId(42)));
        assert_eq!(MemberId::parse_mention("<@!42>"), Some(MemberId(42)));
        assert_eq!(MemberId::parse_mention(" 42 "), Some(MemberId(42)));
        assert_eq!(MemberId::parse_mention("<@abc>"), None);
        assert_eq!(MemberId::parse_mention("@someone"), None);
    }

    #[tokio::test]
    async fn test_memory_platform_post_edit_retire() {
        let platform = MemoryPlatform::new();
        let channel = ChannelId(1);

        let first = platform.post_view(channel, "one").await.unwrap();
        let second = platform.post_view(channel, "two").await.unwrap();
        platform.edit_view(channel, first, "uno").await.unwrap();
        platform.retire_view(channel, second).await.unwrap();

        let displayed = platform.displayed(channel);
        assert_eq!(displayed.len(), 1);
        assert_eq!(displayed[0].content, "uno");
        assert_eq!(platform.view_change_count(), 4);
    }

    #[tokio::test]
    async fn test_memory_platform_injected_failure() {
        let platform = MemoryPlatform::new();
        let channel = ChannelId(1);
        platform.fail_next(PlatformError::RateLimited { retry_after: None });

        assert!(platform.post_view(channel, "one").await.is_err());
        assert!(platform.displayed(channel).is_empty());
        assert!(platform.post_view(channel, "one").await.is_ok());
        assert_eq!(platform.displayed(channel).len(), 1);
        assert_eq!(platform.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_memory_platform_seed() {
        let platform = MemoryPlatform::new();
        platform.seed(ChannelId(3), &["a", "b"]);
        let messages = platform.view_messages(ChannelId(3)).await.unwrap();
        let contents: Vec<&str> = messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["a", "b"]);
        assert!(platform.view_messages(ChannelId(4)).await.unwrap().is_empty());
    }
}

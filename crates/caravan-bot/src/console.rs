//! Console transport.
//!
//! Reads chat traffic from a line stream, one message per line:
//!
//! ```text
//! [<group>/]<channel> <member-id>[!] <message>
//! ```
//!
//! A `!` after the member id marks a channel administrator. Blank lines and
//! lines starting with `#` are skipped. View changes and notices are printed
//! to stdout by [`ConsolePlatform`].

use std::collections::HashMap;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use caravan_core::{
    Actor, CaravanHub, ChannelId, DisplayedMessage, InboundMessage, MemberId, MemoryPlatform,
    MessageId, PlatformError, ViewPlatform,
};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{debug, warn};

use crate::config::ChannelFilter;

/// Group assumed for lines that name only a channel.
const DEFAULT_GROUP: &str = "console";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsoleLine {
    pub group: String,
    pub channel: String,
    pub actor: Actor,
    pub content: String,
}

pub fn parse_line(line: &str) -> Result<Option<ConsoleLine>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    let mut parts = line.splitn(3, char::is_whitespace);
    let target = parts.next().unwrap_or_default();
    let Some(author) = parts.next() else {
        bail!("Expected `<channel> <member-id>[!] <message>`");
    };
    let content = parts.next().unwrap_or_default().trim().to_string();

    let (group, channel) = match target.split_once('/') {
        Some((group, channel)) => (group, channel),
        None => (DEFAULT_GROUP, target),
    };
    if group.is_empty() || channel.is_empty() {
        bail!("Channel \"{}\" is missing a name", target);
    }

    let (id, is_admin) = match author.strip_suffix('!') {
        Some(id) => (id, true),
        None => (author, false),
    };
    let member: u64 = id
        .parse()
        .with_context(|| format!("Member id \"{}\" is not a number", id))?;

    Ok(Some(ConsoleLine {
        group: group.to_string(),
        channel: channel.to_string(),
        actor: Actor {
            member: MemberId(member),
            is_admin,
        },
        content,
    }))
}

/// Stable ids for channel names, assigned in order of first appearance.
#[derive(Debug, Default)]
pub struct ChannelDirectory {
    ids: HashMap<(String, String), ChannelId>,
}

impl ChannelDirectory {
    pub fn id(&mut self, group: &str, channel: &str) -> ChannelId {
        let next = ChannelId(self.ids.len() as u64 + 1);
        *self
            .ids
            .entry((group.to_string(), channel.to_string()))
            .or_insert(next)
    }
}

/// Feed every line of `input` to the hub. Returns the number of messages
/// dispatched; malformed lines are logged and skipped.
pub async fn run<R>(input: R, hub: &CaravanHub, filter: &ChannelFilter) -> Result<usize>
where
    R: AsyncBufRead + Unpin,
{
    let mut directory = ChannelDirectory::default();
    let mut lines = input.lines();
    let mut dispatched = 0;

    while let Some(line) = lines.next_line().await.context("Failed to read input")? {
        let parsed = match parse_line(&line) {
            Ok(Some(parsed)) => parsed,
            Ok(None) => continue,
            Err(e) => {
                warn!(error = %e, line = %line, "Skipping malformed line");
                continue;
            }
        };
        if !filter.matches(&parsed.group, &parsed.channel) {
            debug!(group = %parsed.group, channel = %parsed.channel, "Channel filtered out");
            continue;
        }

        let channel = directory.id(&parsed.group, &parsed.channel);
        hub.dispatch(InboundMessage {
            channel,
            actor: parsed.actor,
            content: parsed.content,
        })?;
        dispatched += 1;
    }

    Ok(dispatched)
}

/// In-memory platform that echoes every change to stdout.
#[derive(Debug, Default)]
pub struct ConsolePlatform {
    inner: MemoryPlatform,
}

impl ConsolePlatform {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ViewPlatform for ConsolePlatform {
    async fn view_messages(
        &self,
        channel: ChannelId,
    ) -> Result<Vec<DisplayedMessage>, PlatformError> {
        self.inner.view_messages(channel).await
    }

    async fn post_view(&self, channel: ChannelId, content: &str) -> Result<MessageId, PlatformError> {
        let id = self.inner.post_view(channel, content).await?;
        println!("[{}] pinned view {}:\n{}\n", channel, id, content);
        Ok(id)
    }

    async fn edit_view(
        &self,
        channel: ChannelId,
        message: MessageId,
        content: &str,
    ) -> Result<(), PlatformError> {
        self.inner.edit_view(channel, message, content).await?;
        println!("[{}] edited view {}:\n{}\n", channel, message, content);
        Ok(())
    }

    async fn retire_view(&self, channel: ChannelId, message: MessageId) -> Result<(), PlatformError> {
        self.inner.retire_view(channel, message).await?;
        println!("[{}] retired view {}\n", channel, message);
        Ok(())
    }

    async fn send_notice(&self, channel: ChannelId, content: &str) -> Result<(), PlatformError> {
        self.inner.send_notice(channel, content).await?;
        println!("[{}] {}\n", channel, content);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use caravan_core::{CaravanController, CaravanSettings, Mode, ViewSynchronizer, WaypointCatalog};

    use super::*;
    use crate::config::BotConfig;

    const CATALOG: &str = r#"{
        "Town Hall": {"location": "40.7128,-74.0060", "aliases": ["City Hall"]},
        "Library": {"location": "40.7532,-73.9822"}
    }"#;

    #[test]
    fn test_parse_line() {
        let line = parse_line("downtown/caravan 42! !route town hall, library")
            .unwrap()
            .unwrap();
        assert_eq!(line.group, "downtown");
        assert_eq!(line.channel, "caravan");
        assert_eq!(line.actor, Actor::admin(MemberId(42)));
        assert_eq!(line.content, "!route town hall, library");

        let line = parse_line("caravan 7 !join +2").unwrap().unwrap();
        assert_eq!(line.group, "console");
        assert_eq!(line.actor, Actor::member(MemberId(7)));
    }

    #[test]
    fn test_parse_line_skips_blank_and_comments() {
        assert_eq!(parse_line("   ").unwrap(), None);
        assert_eq!(parse_line("# setup").unwrap(), None);
    }

    #[test]
    fn test_parse_line_rejects_bad_author() {
        assert!(parse_line("caravan").is_err());
        assert!(parse_line("caravan alice !join").is_err());
        assert!(parse_line("/caravan 1 !join").is_err());
    }

    #[test]
    fn test_directory_assigns_stable_ids() {
        let mut directory = ChannelDirectory::default();
        let first = directory.id("console", "caravan");
        let second = directory.id("downtown", "caravan");
        assert_ne!(first, second);
        assert_eq!(directory.id("console", "caravan"), first);
    }

    #[tokio::test]
    async fn test_run_dispatches_matching_channels() {
        let platform = Arc::new(MemoryPlatform::new());
        let catalog = Arc::new(WaypointCatalog::from_json(CATALOG).unwrap());
        let settings = CaravanSettings::default();
        let controller = Arc::new(CaravanController::new(Arc::clone(&catalog), settings.clone()));
        let sync = Arc::new(ViewSynchronizer::new(platform.clone(), catalog, settings));
        let hub = CaravanHub::new(controller, sync);
        let filter = ChannelFilter::from_config(&BotConfig::default()).unwrap();

        let input = "\
            # a morning walk\n\
            caravan 1! !route city hall, library\n\
            caravan 1! !start\n\
            general 1! !route library\n\
            caravan 2 !join\n\
            caravan nobody !join\n";
        let dispatched = run(input.as_bytes(), &hub, &filter).await.unwrap();
        assert_eq!(dispatched, 3);

        let caravan = hub.snapshot(ChannelId(1)).await.unwrap();
        assert_eq!(caravan.route.mode(), Mode::Active);
        assert_eq!(caravan.roster.headcount(), 1);
        hub.shutdown().await;

        assert_eq!(platform.notices(ChannelId(1)).len(), 3);
        assert!(platform.notices(ChannelId(2)).is_empty());
    }
}

//! The view grammar: how a caravan is written into pinned messages, and how
//! it is read back out of them.
//!
//! Render and parse live side by side and share every literal, so a change
//! to one shows up in the round-trip tests for the other. Each block ends
//! with a footer naming the grammar version; parsing dispatches on it.
//!
//! A rendered view looks like:
//!
//! ```text
//! **Status:** Active
//! **Directions:** https://www.google.com/maps/dir/40.7532,-73.9822/40.7794,-73.9632
//!
//! **Leaders** (1)
//! - <@1>
//!
//! **Members** (3 people)
//! - <@1>
//! - <@2> +1
//!
//! **Route** (3 stops)
//! 1. ~~Town Hall~~ _(skipped: "closed")_
//! 2. **Library** _(next up)_
//! 3. Museum of Art
//!
//! _caravan view v1_
//! ```

use std::collections::HashSet;

use crate::caravan::Caravan;
use crate::catalog::WaypointCatalog;
use crate::leadership::LeadershipRegistry;
use crate::platform::MemberId;
use crate::roster::AttendanceRoster;
use crate::route::{Mode, Route, Stop};
use crate::settings::CaravanSettings;

use super::RehydrationWarning;

// ============================================================================
// Constants
// ============================================================================

pub const GRAMMAR_VERSION: &str = "v1";

const FOOTER_PREFIX: &str = "_caravan view ";
const FOOTER_SUFFIX: &str = "_";

const STATUS_PREFIX: &str = "**Status:** ";
const DIRECTIONS_PREFIX: &str = "**Directions:** ";
const LEADERS_HEADER: &str = "**Leaders**";
const MEMBERS_HEADER: &str = "**Members**";
const ROUTE_HEADER: &str = "**Route**";
const CONTINUED: &str = "(continued)";

const ITEM_PREFIX: &str = "- ";
const STRIKE: &str = "~~";
const BOLD: &str = "**";
const NEXT_UP: &str = " _(next up)_";
const SKIPPED: &str = "_(skipped)_";
const SKIPPED_REASON_PREFIX: &str = "_(skipped: \"";
const SKIPPED_REASON_SUFFIX: &str = "\")_";

const DIRECTIONS_URL: &str = "https://www.google.com/maps/dir/";

/// Upper bound on stops in the directions link.
/// Map services cap the number of waypoints in one directions URL.
const MAX_DIRECTIONS_STOPS: usize = 10;

/// Smallest block size honoured, whatever the configured limit.
/// Large enough for any single line plus a header and the footer.
pub const MIN_MESSAGE_LIMIT: usize = 500;

fn footer() -> String {
    format!("{}{}{}", FOOTER_PREFIX, GRAMMAR_VERSION, FOOTER_SUFFIX)
}

// ============================================================================
// Render
// ============================================================================

/// A titled list of atomic lines. Blocks are only ever split between items.
struct Section {
    header: Option<String>,
    continued: Option<String>,
    items: Vec<String>,
}

/// Render a caravan into view blocks. A caravan with nothing in it renders to
/// no blocks at all.
pub fn render(caravan: &Caravan, settings: &CaravanSettings) -> Vec<String> {
    let pristine = caravan.route.is_empty()
        && caravan.route.mode() == Mode::Forming
        && caravan.roster.is_empty()
        && caravan.leaders.is_empty();
    if pristine {
        return Vec::new();
    }

    let limit = settings.message_limit.max(MIN_MESSAGE_LIMIT);
    let sections = [
        status_section(caravan, settings, line_budget(limit)),
        leaders_section(&caravan.leaders),
        members_section(&caravan.roster),
        route_section(&caravan.route),
    ];
    pack(&sections, limit)
}

/// Longest line that fits in a block of `limit` characters beside the footer.
fn line_budget(limit: usize) -> usize {
    limit.saturating_sub(footer().chars().count() + 2)
}

fn status_section(caravan: &Caravan, settings: &CaravanSettings, budget: usize) -> Section {
    let route = &caravan.route;
    let mut items = vec![format!("{}{}", STATUS_PREFIX, route.mode().label())];

    let mut directions = format!("{}{}", DIRECTIONS_PREFIX, DIRECTIONS_URL);
    let mut length = directions.chars().count();
    let mut included = 0;
    for stop in route.remaining().iter().take(MAX_DIRECTIONS_STOPS) {
        let location = stop.waypoint.location.to_string();
        let separator = usize::from(included > 0);
        // Later stops are dropped rather than overflowing the block.
        if length + separator + location.chars().count() > budget {
            break;
        }
        if included > 0 {
            directions.push('/');
        }
        directions.push_str(&location);
        length += separator + location.chars().count();
        included += 1;
    }
    if included > 0 {
        items.push(directions);
    }

    let headcount = caravan.roster.headcount();
    if headcount >= settings.headcount_warning {
        items.push(format!(
            "_:warning: {} people are coming along. Consider splitting into smaller groups._",
            headcount
        ));
    }

    Section {
        header: None,
        continued: None,
        items,
    }
}

fn leaders_section(leaders: &LeadershipRegistry) -> Section {
    let mut items: Vec<String> = leaders
        .iter()
        .map(|leader| format!("{}{}", ITEM_PREFIX, leader))
        .collect();
    if items.is_empty() {
        items.push("_none yet_".to_string());
    }
    titled(LEADERS_HEADER, format!("({})", leaders.len()), items)
}

fn members_section(roster: &AttendanceRoster) -> Section {
    let mut items: Vec<String> = roster
        .iter()
        .map(|(member, guests)| match guests {
            0 => format!("{}{}", ITEM_PREFIX, member),
            n => format!("{}{} +{}", ITEM_PREFIX, member, n),
        })
        .collect();
    if items.is_empty() {
        items.push("_nobody yet_".to_string());
    }
    let headcount = roster.headcount();
    let people = if headcount == 1 { "person" } else { "people" };
    titled(MEMBERS_HEADER, format!("({} {})", headcount, people), items)
}

fn route_section(route: &Route) -> Section {
    let mut items: Vec<String> = route
        .stops()
        .iter()
        .enumerate()
        .map(|(index, stop)| {
            let number = index + 1;
            if route.is_passed(index) {
                format!("{}. {}{}", number, strike(stop.name()), skip_suffix(stop))
            } else if index == route.position() && route.mode() == Mode::Active {
                format!("{}. {}{}{}{}", number, BOLD, stop.name(), BOLD, NEXT_UP)
            } else {
                format!("{}. {}", number, stop.name())
            }
        })
        .collect();
    if items.is_empty() {
        items.push("_no stops yet_".to_string());
    }
    let count = route.len();
    let stops = if count == 1 { "stop" } else { "stops" };
    titled(ROUTE_HEADER, format!("({} {})", count, stops), items)
}

fn titled(header: &str, detail: String, items: Vec<String>) -> Section {
    Section {
        header: Some(format!("{} {}", header, detail)),
        continued: Some(format!("{} {}", header, CONTINUED)),
        items,
    }
}

fn strike(name: &str) -> String {
    format!("{}{}{}", STRIKE, name, STRIKE)
}

fn skip_suffix(stop: &Stop) -> String {
    match stop.skip_reason.as_deref() {
        None => String::new(),
        Some("") => format!(" {}", SKIPPED),
        Some(reason) => format!(" {}{}{}", SKIPPED_REASON_PREFIX, reason, SKIPPED_REASON_SUFFIX),
    }
}

/// Fills blocks line by line, starting a new block whenever the next item
/// (plus its header, if it opens a section) would push the current one past
/// `limit` characters.
struct Packer {
    limit: usize,
    footer: String,
    blocks: Vec<String>,
    lines: Vec<String>,
}

impl Packer {
    fn new(limit: usize) -> Self {
        Self {
            limit,
            footer: footer(),
            blocks: Vec::new(),
            lines: Vec::new(),
        }
    }

    /// Characters in the current block if `extra` were appended.
    fn size_with(&self, extra: &[String]) -> usize {
        let lines = self.lines.iter().chain(extra);
        let count = self.lines.len() + extra.len();
        let text: usize = lines.map(|l| l.chars().count()).sum();
        // Newlines between lines, a blank line, then the footer.
        text + count.saturating_sub(1) + 2 + self.footer.chars().count()
    }

    fn push(&mut self, group: Vec<String>, fresh: impl FnOnce() -> Vec<String>) {
        if !self.lines.is_empty() && self.size_with(&group) > self.limit {
            self.flush();
            self.lines.extend(fresh());
        } else {
            self.lines.extend(group);
        }
        self.fit();
    }

    /// An item too long for even an empty block is cut short with an
    /// ellipsis, so no block ever exceeds `limit`.
    fn fit(&mut self) {
        let size = self.size_with(&[]);
        if size <= self.limit {
            return;
        }
        let excess = size - self.limit;
        if let Some(last) = self.lines.last_mut() {
            let keep = last.chars().count().saturating_sub(excess + 1);
            *last = last.chars().take(keep).chain(['…']).collect();
        }
    }

    fn flush(&mut self) {
        if self.lines.is_empty() {
            return;
        }
        let body = std::mem::take(&mut self.lines).join("\n");
        self.blocks.push(format!("{}\n\n{}", body, self.footer));
    }

    fn finish(mut self) -> Vec<String> {
        self.flush();
        self.blocks
    }
}

fn pack(sections: &[Section], limit: usize) -> Vec<String> {
    let mut packer = Packer::new(limit);

    for section in sections {
        for (index, item) in section.items.iter().enumerate() {
            let opening = index == 0;
            let mut group = Vec::new();
            if opening && !packer.lines.is_empty() {
                group.push(String::new());
            }
            if opening {
                group.extend(section.header.clone());
            }
            group.push(item.clone());

            let header = if opening {
                section.header.clone()
            } else {
                section.continued.clone()
            };
            packer.push(group, || header.into_iter().chain([item.clone()]).collect());
        }
    }

    packer.finish()
}

// ============================================================================
// Parse
// ============================================================================

/// State recovered from a view, plus anything that could not be read.
#[derive(Debug, Clone, Default)]
pub struct ParsedView {
    pub caravan: Caravan,
    pub warnings: Vec<RehydrationWarning>,
}

/// Parse view blocks (in display order) back into a caravan.
///
/// Never fails: unreadable pieces are skipped and reported as warnings.
pub fn parse(blocks: &[&str], catalog: &WaypointCatalog) -> ParsedView {
    let mut parsed = ParsedView::default();
    if blocks.is_empty() {
        return parsed;
    }

    let mut lines = Vec::new();
    let mut readable = 0;
    for (index, block) in blocks.iter().enumerate() {
        let mut body: Vec<&str> = block.lines().map(str::trim).collect();
        while body.last().is_some_and(|line| line.is_empty()) {
            body.pop();
        }
        let version = body
            .last()
            .and_then(|line| line.strip_prefix(FOOTER_PREFIX))
            .and_then(|rest| rest.strip_suffix(FOOTER_SUFFIX));

        match version {
            Some(GRAMMAR_VERSION) => {
                body.pop();
                lines.extend(body.into_iter().map(|line| (index, line)));
                readable += 1;
            }
            Some(other) => parsed.warnings.push(RehydrationWarning::UnsupportedVersion {
                block: index,
                version: other.to_string(),
            }),
            None => parsed
                .warnings
                .push(RehydrationWarning::MissingFooter { block: index }),
        }
    }

    if readable == 0 {
        parsed.warnings.push(RehydrationWarning::NothingRecovered {
            blocks: blocks.len(),
        });
        return parsed;
    }

    parse_v1(&lines, catalog, &mut parsed);
    parsed
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Part {
    Status,
    Leaders,
    Members,
    Route,
}

fn parse_v1(lines: &[(usize, &str)], catalog: &WaypointCatalog, parsed: &mut ParsedView) {
    let mut part = Part::Status;
    let mut mode = None;
    let mut leaders = LeadershipRegistry::new();
    let mut roster = AttendanceRoster::new();
    let mut stops: Vec<Stop> = Vec::new();
    let mut seen = HashSet::new();
    let mut position = 0;
    let mut in_passed_prefix = true;

    for &(block, line) in lines {
        if line.is_empty() {
            continue;
        }
        let unreadable = || RehydrationWarning::UnparseableLine {
            block,
            line: line.to_string(),
        };

        if let Some(label) = line.strip_prefix(STATUS_PREFIX) {
            match Mode::from_label(label) {
                Some(parsed_mode) => mode = Some(parsed_mode),
                None => parsed.warnings.push(unreadable()),
            }
            continue;
        }
        if line.starts_with(DIRECTIONS_PREFIX) {
            continue;
        }
        if line.starts_with(LEADERS_HEADER) {
            part = Part::Leaders;
            continue;
        }
        if line.starts_with(MEMBERS_HEADER) {
            part = Part::Members;
            continue;
        }
        if line.starts_with(ROUTE_HEADER) {
            part = Part::Route;
            continue;
        }
        // Placeholders and advisories carry no state.
        if line.len() > 1 && line.starts_with('_') && line.ends_with('_') {
            continue;
        }

        match part {
            Part::Status => parsed.warnings.push(unreadable()),
            Part::Leaders => match parse_leader(line) {
                Some(member) => {
                    leaders.grant(member);
                }
                None => parsed.warnings.push(unreadable()),
            },
            Part::Members => match parse_member(line) {
                Some((member, guests)) => {
                    roster.join(member, guests, u32::MAX, usize::MAX).ok();
                }
                None => parsed.warnings.push(unreadable()),
            },
            Part::Route => {
                let Some((name, passed, skip_reason)) = parse_stop(line) else {
                    parsed.warnings.push(unreadable());
                    continue;
                };
                let Some(waypoint) = catalog.get(name) else {
                    parsed.warnings.push(RehydrationWarning::UnknownWaypoint {
                        name: name.to_string(),
                    });
                    continue;
                };
                if !seen.insert(waypoint.name.clone()) {
                    parsed.warnings.push(RehydrationWarning::DuplicateStop {
                        name: waypoint.name.clone(),
                    });
                    continue;
                }

                let mut stop = Stop::new(waypoint);
                if passed && in_passed_prefix {
                    stop.skip_reason = skip_reason;
                    position += 1;
                } else {
                    if passed {
                        parsed.warnings.push(RehydrationWarning::OutOfOrderVisit {
                            name: stop.name().to_string(),
                        });
                    }
                    in_passed_prefix = false;
                }
                stops.push(stop);
            }
        }
    }

    let mode = mode.unwrap_or_else(|| {
        parsed.warnings.push(RehydrationWarning::MissingStatus);
        if position > 0 {
            Mode::Active
        } else {
            Mode::Forming
        }
    });

    parsed.caravan.route = Route::from_parts(stops, position, mode);
    parsed.caravan.roster = roster;
    parsed.caravan.leaders = leaders;
}

fn parse_leader(line: &str) -> Option<MemberId> {
    let mention = line.strip_prefix(ITEM_PREFIX)?;
    mention.starts_with("<@").then_some(())?;
    MemberId::parse_mention(mention)
}

fn parse_member(line: &str) -> Option<(MemberId, u32)> {
    let item = line.strip_prefix(ITEM_PREFIX)?;
    let (mention, guests) = match item.split_once(' ') {
        Some((mention, guests)) => (mention, guests.trim().strip_prefix('+')?.parse().ok()?),
        None => (item, 0),
    };
    mention.starts_with("<@").then_some(())?;
    Some((MemberId::parse_mention(mention)?, guests))
}

/// Returns the stop name, whether it was passed, and its skip reason.
fn parse_stop(line: &str) -> Option<(&str, bool, Option<String>)> {
    let (number, rest) = line.split_once(". ")?;
    number.parse::<usize>().ok()?;

    if let Some(struck) = rest.strip_prefix(STRIKE) {
        let end = struck.find(STRIKE)?;
        let name = &struck[..end];
        let suffix = struck[end + STRIKE.len()..].trim();
        let reason = if suffix.is_empty() {
            None
        } else if suffix == SKIPPED {
            Some(String::new())
        } else {
            let reason = suffix
                .strip_prefix(SKIPPED_REASON_PREFIX)?
                .strip_suffix(SKIPPED_REASON_SUFFIX)?;
            Some(reason.to_string())
        };
        return Some((name, true, reason));
    }

    if let Some(current) = rest.strip_suffix(NEXT_UP) {
        let name = current.strip_prefix(BOLD)?.strip_suffix(BOLD)?;
        return Some((name, false, None));
    }

    Some((rest, false, None))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::tests::sample_catalog;
    use crate::catalog::{Coordinate, Waypoint};

    fn settings_with_limit(message_limit: usize) -> CaravanSettings {
        CaravanSettings {
            message_limit,
            ..CaravanSettings::default()
        }
    }

    fn active_caravan(catalog: &WaypointCatalog) -> Caravan {
        let mut caravan = Caravan::new();
        let stops = ["Town Hall", "Library", "Museum of Art"]
            .iter()
            .filter_map(|name| catalog.get(name))
            .collect();
        caravan.route.set_stops(stops).unwrap();
        caravan.route.start().unwrap();
        caravan.route.skip("closed").unwrap();
        caravan.leaders.grant(MemberId(1));
        caravan.roster.join(MemberId(1), 0, 10, 20).unwrap();
        caravan.roster.join(MemberId(2), 1, 10, 20).unwrap();
        caravan
    }

    fn blocks(rendered: &[String]) -> Vec<&str> {
        rendered.iter().map(String::as_str).collect()
    }

    #[test]
    fn test_render_layout() {
        let catalog = sample_catalog();
        let rendered = render(&active_caravan(&catalog), &CaravanSettings::default());
        assert_eq!(rendered.len(), 1);
        assert_eq!(
            rendered[0],
            "**Status:** Active\n\
             **Directions:** https://www.google.com/maps/dir/40.7532,-73.9822/40.7794,-73.9632\n\
             \n\
             **Leaders** (1)\n\
             - <@1>\n\
             \n\
             **Members** (3 people)\n\
             - <@1>\n\
             - <@2> +1\n\
             \n\
             **Route** (3 stops)\n\
             1. ~~Town Hall~~ _(skipped: \"closed\")_\n\
             2. **Library** _(next up)_\n\
             3. Museum of Art\n\
             \n\
             _caravan view v1_"
        );
    }

    #[test]
    fn test_render_empty_caravan_is_empty() {
        assert!(render(&Caravan::new(), &CaravanSettings::default()).is_empty());
    }

    #[test]
    fn test_render_is_deterministic() {
        let catalog = sample_catalog();
        let caravan = active_caravan(&catalog);
        let settings = CaravanSettings::default();
        assert_eq!(render(&caravan, &settings), render(&caravan.clone(), &settings));
    }

    #[test]
    fn test_round_trip_each_mode() {
        let catalog = sample_catalog();
        let settings = CaravanSettings::default();

        let mut caravan = active_caravan(&catalog);
        for _ in 0..3 {
            let rendered = render(&caravan, &settings);
            let parsed = parse(&blocks(&rendered), &catalog);
            assert!(parsed.warnings.is_empty(), "{:?}", parsed.warnings);
            assert!(parsed.caravan.same_state(&caravan));
            // Fails once the route is completed.
            let _ = caravan.route.skip("");
        }
        assert_eq!(caravan.route.mode(), Mode::Completed);

        caravan.route.reset();
        let stops = ["Library", "Central Park Fountain"]
            .iter()
            .filter_map(|n| catalog.get(n))
            .collect();
        caravan.route.set_stops(stops).unwrap();
        let parsed = parse(&blocks(&render(&caravan, &settings)), &catalog);
        assert!(parsed.caravan.same_state(&caravan));
        assert_eq!(parsed.caravan.route.mode(), Mode::Forming);
    }

    #[test]
    fn test_split_only_at_item_boundaries() {
        let catalog = sample_catalog();
        let mut caravan = active_caravan(&catalog);
        for id in 10..80 {
            caravan.roster.join(MemberId(id), (id % 3) as u32, 10, 1000).unwrap();
        }
        let settings = settings_with_limit(MIN_MESSAGE_LIMIT);
        let rendered = render(&caravan, &settings);

        assert!(rendered.len() > 1);
        for block in &rendered {
            assert!(block.chars().count() <= MIN_MESSAGE_LIMIT, "{}", block);
            assert!(block.ends_with("_caravan view v1_"));
        }
        assert!(rendered[1].starts_with("**Members** (continued)\n- <@"));

        let parsed = parse(&blocks(&rendered), &catalog);
        assert!(parsed.warnings.is_empty(), "{:?}", parsed.warnings);
        assert!(parsed.caravan.same_state(&caravan));
    }

    #[test]
    fn test_advisory_line_at_threshold() {
        let catalog = sample_catalog();
        let mut caravan = active_caravan(&catalog);
        caravan.roster.join(MemberId(3), 10, 10, 20).unwrap();
        caravan.roster.join(MemberId(4), 5, 10, 20).unwrap();
        assert_eq!(caravan.roster.headcount(), 20);

        let rendered = render(&caravan, &CaravanSettings::default());
        assert!(rendered[0].contains("_:warning: 20 people are coming along."));
        let parsed = parse(&blocks(&rendered), &catalog);
        assert!(parsed.warnings.is_empty());
    }

    fn waypoints_at(count: usize, location: Coordinate) -> WaypointCatalog {
        WaypointCatalog::from_waypoints(
            (0..count)
                .map(|i| Waypoint {
                    name: format!("Stop {}", i),
                    location,
                    aliases: Vec::new(),
                })
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_long_coordinates_never_overflow_a_block() {
        let catalog = waypoints_at(7, Coordinate { lat: 1e-300, lon: 0.0 });
        let mut caravan = Caravan::new();
        caravan
            .route
            .set_stops(catalog.waypoints().cloned().collect())
            .unwrap();

        let settings = CaravanSettings::default();
        let rendered = render(&caravan, &settings);
        for block in &rendered {
            assert!(block.chars().count() <= settings.message_limit, "{}", block.chars().count());
        }
        let directions = rendered[0]
            .lines()
            .find(|line| line.starts_with(DIRECTIONS_PREFIX))
            .unwrap();
        let included = directions.matches(",0").count();
        assert!(included > 0 && included < 7, "{} stops in directions", included);

        let parsed = parse(&blocks(&rendered), &catalog);
        assert!(parsed.caravan.same_state(&caravan));
    }

    #[test]
    fn test_oversized_item_is_shortened() {
        let mut packer = Packer::new(MIN_MESSAGE_LIMIT);
        packer.push(vec!["x".repeat(2 * MIN_MESSAGE_LIMIT)], Vec::new);
        let rendered = packer.finish();
        assert_eq!(rendered.len(), 1);
        assert_eq!(rendered[0].chars().count(), MIN_MESSAGE_LIMIT);
        assert!(rendered[0].contains("x…\n\n_caravan view v1_"));
    }

    #[test]
    fn test_directions_capped() {
        let catalog = WaypointCatalog::from_waypoints(
            (0..15)
                .map(|i| crate::catalog::Waypoint {
                    name: format!("Stop {}", i),
                    location: crate::catalog::Coordinate {
                        lat: i as f64,
                        lon: 0.0,
                    },
                    aliases: Vec::new(),
                })
                .collect(),
        )
        .unwrap();
        let mut caravan = Caravan::new();
        caravan
            .route
            .set_stops(catalog.waypoints().cloned().collect())
            .unwrap();
        let rendered = render(&caravan, &CaravanSettings::default());
        let directions = rendered[0]
            .lines()
            .find(|line| line.starts_with(DIRECTIONS_PREFIX))
            .unwrap();
        assert_eq!(directions.matches(",0").count(), MAX_DIRECTIONS_STOPS);
    }

    #[test]
    fn test_parse_garbage_is_empty_with_warning() {
        let catalog = sample_catalog();
        let parsed = parse(&["lunch at noon?", ""], &catalog);
        assert!(parsed.caravan.same_state(&Caravan::new()));
        assert_eq!(
            parsed.warnings.last(),
            Some(&RehydrationWarning::NothingRecovered { blocks: 2 })
        );
    }

    #[test]
    fn test_parse_unsupported_version() {
        let catalog = sample_catalog();
        let parsed = parse(&["**Status:** Active\n\n_caravan view v9_"], &catalog);
        assert_eq!(
            parsed.warnings[0],
            RehydrationWarning::UnsupportedVersion {
                block: 0,
                version: "v9".to_string()
            }
        );
    }

    #[test]
    fn test_parse_partial_view() {
        let catalog = sample_catalog();
        let view = "**Status:** Active\n\
                    **Route** (4 stops)\n\
                    1. ~~Town Hall~~\n\
                    2. ~~Atlantis~~\n\
                    3. **Library** _(next up)_\n\
                    4. ~~Museum of Art~~\n\
                    ???\n\
                    \n\
                    _caravan view v1_";
        let parsed = parse(&[view], &catalog);
        let route = &parsed.caravan.route;
        let names: Vec<&str> = route.stops().iter().map(Stop::name).collect();
        assert_eq!(names, vec!["Town Hall", "Library", "Museum of Art"]);
        assert_eq!(route.position(), 1);
        assert_eq!(route.mode(), Mode::Active);
        assert_eq!(
            parsed.warnings,
            vec![
                RehydrationWarning::UnknownWaypoint {
                    name: "Atlantis".to_string()
                },
                RehydrationWarning::OutOfOrderVisit {
                    name: "Museum of Art".to_string()
                },
                RehydrationWarning::UnparseableLine {
                    block: 0,
                    line: "???".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_parse_missing_status_infers_mode() {
        let catalog = sample_catalog();
        let view = "**Route** (2 stops)\n1. ~~Library~~\n2. Town Hall\n\n_caravan view v1_";
        let parsed = parse(&[view], &catalog);
        assert_eq!(parsed.caravan.route.mode(), Mode::Active);
        assert_eq!(parsed.warnings, vec![RehydrationWarning::MissingStatus]);
    }
}

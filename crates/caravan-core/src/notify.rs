//! Channel notices for caravan events and rejected commands.

use rand::seq::SliceRandom;

use crate::controller::{Actor, CaravanEvent};
use crate::error::CaravanError;
use crate::platform::MemberId;
use crate::route::{Advance, RouteStatistics};
use crate::view::grammar::GRAMMAR_VERSION;
use crate::view::RehydrationWarning;

/// Flavor text for members leaving the caravan.
pub const WAYS_TO_DIE: &[&str] = &[
    "a broken arm",
    "a broken leg",
    "a fever",
    "a snakebite",
    "cholera",
    "drowning",
    "dysentery",
    "exhaustion",
    "measles",
    "typhoid",
];

/// "a", "a and b", "a, b, and c".
pub fn join_list(items: &[String], conjunction: &str) -> String {
    match items {
        [] => String::new(),
        [only] => only.clone(),
        [first, second] => format!("{} {} {}", first, conjunction, second),
        [rest @ .., last] => format!("{}, {} {}", rest.join(", "), conjunction, last),
    }
}

pub fn pluralize(word: &str, count: usize) -> String {
    if count == 1 {
        word.to_string()
    } else {
        format!("{}s", word)
    }
}

fn mentions(members: &[MemberId]) -> String {
    let mentions: Vec<String> = members.iter().map(MemberId::to_string).collect();
    join_list(&mentions, "and")
}

/// Reply to a rejected command, addressed to whoever sent it.
pub fn error_notice(error: &CaravanError, actor: Actor) -> String {
    format!("{} {}", actor.member, error)
}

/// Channel notice for a successful command.
pub fn event_notice(event: &CaravanEvent, actor: Actor) -> String {
    match event {
        CaravanEvent::Help(text) => format!("{}, {}", actor.member, text),
        CaravanEvent::Version => format!(
            "caravan-bot {} (view format {})",
            env!("CARGO_PKG_VERSION"),
            GRAMMAR_VERSION
        ),
        CaravanEvent::RouteSet { stops } => format!(
            "Route set with **{}** {}. :map:\n_Start the caravan with `!start` when everyone is ready._",
            stops.len(),
            pluralize("stop", stops.len())
        ),
        CaravanEvent::Started { first } => format!(
            "Caravan **active**! :race_car:\n_Advance with `!next` or `!skip [reason]`, and `!stop` to edit the route again._\nFirst up: **{}**\n:map: {}",
            first.name,
            first.maps_link()
        ),
        CaravanEvent::Stopped => {
            "Caravan stopped and back to **forming**. :map:\n_All stops are unvisited again. Start again with `!start`._".to_string()
        }
        CaravanEvent::Advanced(advance) => advance_notice(advance),
        CaravanEvent::Skipped { name, advance } => {
            format!("Skipped **{}**.\n{}", name, advance_notice(advance))
        }
        CaravanEvent::MovedBack { to } => format!(
            "**Whoops!** _Backing the caravan up one stop._\nNext up: **{}**\n:map: {}",
            to.name,
            to.maps_link()
        ),
        CaravanEvent::Removed {
            name,
            next,
            completed,
        } => {
            let mut text = format!("Removed **{}** from the route.", name);
            if let Some(stats) = completed {
                text.push('\n');
                text.push_str(&completed_notice(stats));
            } else if let Some(next) = next {
                text.push_str(&format!("\nNext up: **{}**\n:map: {}", next.name, next.maps_link()));
            }
            text
        }
        CaravanEvent::Appended { stops } => {
            let names: Vec<String> = stops.iter().map(|w| format!("**{}**", w.name)).collect();
            format!("Appended {} to the route. :map:", join_list(&names, "and"))
        }
        CaravanEvent::Reset => {
            "Caravan reset. The route and member list are empty. :map:".to_string()
        }
        CaravanEvent::LeadersGranted { added, leaders } => {
            if added.is_empty() {
                format!("No change in caravan leadership. Current leaders: {}. :crown:", mentions(leaders))
            } else {
                format!("Added caravan {} {}. :crown:", pluralize("leader", added.len()), mentions(added))
            }
        }
        CaravanEvent::LeadersRevoked { removed, leaders } => {
            if removed.is_empty() {
                let current = if leaders.is_empty() {
                    "none".to_string()
                } else {
                    mentions(leaders)
                };
                format!("No change in caravan leadership. Current leaders: {}.", current)
            } else {
                format!("Removed caravan {} {}.", pluralize("leader", removed.len()), mentions(removed))
            }
        }
        CaravanEvent::Joined(receipt) => {
            let mut text = match receipt.previous {
                Some(previous) if previous == receipt.guests => format!(
                    "You're already in the caravan with **{}** {}, {}.",
                    receipt.guests,
                    pluralize("guest", receipt.guests as usize),
                    receipt.member
                ),
                Some(previous) => format!(
                    "You've adjusted your guest count from **{}** to **{}**, {}.",
                    previous, receipt.guests, receipt.member
                ),
                None if receipt.guests > 0 => format!(
                    "Welcome to the caravan, {}! You've joined with **{}** {}.",
                    receipt.member,
                    receipt.guests,
                    pluralize("guest", receipt.guests as usize)
                ),
                None => format!("Welcome to the caravan, {}!", receipt.member),
            };
            if receipt.advisory {
                text.push_str(&format!(
                    "\n:warning: _The caravan is now **{}** people strong. Leaders may want to split into smaller groups._",
                    receipt.headcount
                ));
            }
            text
        }
        CaravanEvent::Left { member, guests } => match guests {
            None => format!("You're already _not_ a member of this caravan, {}!", member),
            Some(guests) => {
                let cause = WAYS_TO_DIE
                    .choose(&mut rand::thread_rng())
                    .copied()
                    .unwrap_or("dysentery");
                match guests {
                    0 => format!("{} has died of {}. :skull_crossbones:\n_They have left the caravan._", member, cause),
                    1 => format!("{} and their guest have both died of {}. :skull_crossbones:\n_They have left the caravan._", member, cause),
                    n => format!("{} and their {} guests have all died of {}. :skull_crossbones:\n_They have left the caravan._", member, n, cause),
                }
            }
        },
        CaravanEvent::Notified {
            message,
            recipients,
        } => {
            if recipients.is_empty() {
                "No other caravan members to notify!".to_string()
            } else {
                format!("**{}** :loudspeaker:\n{}\n{}", actor.member, message, mentions(recipients))
            }
        }
    }
}

/// Posted once when a channel's view could only be partly read back.
pub fn rehydration_notice(warnings: &[RehydrationWarning]) -> String {
    let details: Vec<String> = warnings.iter().map(|w| format!("- {}", w)).collect();
    format!(
        ":warning: _Parts of the pinned caravan view could not be restored. Leaders may want to check the route and member list._\n{}",
        details.join("\n")
    )
}

fn advance_notice(advance: &Advance) -> String {
    match advance {
        Advance::Moved { next } => format!("Next up: **{}**\n:map: {}", next.name, next.maps_link()),
        Advance::Completed(stats) => completed_notice(stats),
    }
}

fn completed_notice(stats: &RouteStatistics) -> String {
    let mut clauses = vec![format!(
        "visited **{}** {}",
        stats.visited,
        pluralize("stop", stats.visited)
    )];
    if stats.skipped > 0 {
        clauses.push(format!("skipped **{}**", stats.skipped));
    }
    if stats.remaining > 0 {
        clauses.push(format!("left **{}** unvisited", stats.remaining));
    }
    let summary = join_list(&clauses, "and");
    format!("Caravan **complete**! :checkered_flag:\n_You {}._", summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roster::JoinReceipt;
    use crate::route::tests::waypoint;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_join_list() {
        assert_eq!(join_list(&[], "and"), "");
        assert_eq!(join_list(&strings(&["a"]), "and"), "a");
        assert_eq!(join_list(&strings(&["a", "b"]), "or"), "a or b");
        assert_eq!(join_list(&strings(&["a", "b", "c"]), "and"), "a, b, and c");
    }

    #[test]
    fn test_next_up_notice_has_maps_link() {
        let event = CaravanEvent::Advanced(Advance::Moved {
            next: waypoint("Library"),
        });
        assert_eq!(
            event_notice(&event, Actor::member(MemberId(1))),
            "Next up: **Library**\n:map: https://maps.google.com/?q=1,2"
        );
    }

    #[test]
    fn test_completed_notice_statistics() {
        let event = CaravanEvent::Advanced(Advance::Completed(RouteStatistics {
            visited: 3,
            skipped: 1,
            remaining: 0,
        }));
        assert_eq!(
            event_notice(&event, Actor::member(MemberId(1))),
            "Caravan **complete**! :checkered_flag:\n_You visited **3** stops and skipped **1**._"
        );
    }

    #[test]
    fn test_join_notice_with_advisory() {
        let event = CaravanEvent::Joined(JoinReceipt {
            member: MemberId(4),
            guests: 2,
            previous: None,
            headcount: 21,
            advisory: true,
        });
        let text = event_notice(&event, Actor::member(MemberId(4)));
        assert!(text.starts_with("Welcome to the caravan, <@4>! You've joined with **2** guests."));
        assert!(text.contains("**21** people strong"));
    }

    #[test]
    fn test_leave_notice_flavor() {
        let event = CaravanEvent::Left {
            member: MemberId(4),
            guests: Some(0),
        };
        let text = event_notice(&event, Actor::member(MemberId(4)));
        assert!(text.starts_with("<@4> has died of "));
        assert!(WAYS_TO_DIE.iter().any(|cause| text.contains(cause)));
    }

    #[test]
    fn test_rehydration_notice_lists_warnings() {
        let text = rehydration_notice(&[
            RehydrationWarning::MissingStatus,
            RehydrationWarning::UnknownWaypoint {
                name: "Old Mill".to_string(),
            },
        ]);
        assert!(text.starts_with(":warning:"));
        assert!(text.ends_with(
            "\n- view has no status line\n- route stop \"Old Mill\" is not in the catalog"
        ));
    }

    #[test]
    fn test_error_notice_mentions_sender() {
        let text = error_notice(&CaravanError::AtStart, Actor::member(MemberId(9)));
        assert_eq!(text, "<@9> The caravan is already at its first stop.");
    }
}

//! Chat command surface: `!`-prefixed commands, their aliases and help.

use std::fmt;

use crate::error::CaravanError;
use crate::platform::MemberId;
use crate::similarity::ratio;

/// Command prefix.
pub const PREFIX: char = '!';

/// An unknown command at least this close to a real one gets a suggestion.
/// Lower scores are most likely meant for another bot.
const SUGGEST_SCORE: u8 = 75;

/// Quote characters stripped from around place names.
const QUOTES: &[char] = &['"', '\'', '“', '”', '‘', '’', '`'];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Role {
    Anyone,
    Member,
    Leader,
    Admin,
}

impl Role {
    /// Whether a caller holding `roles` may use a command requiring `self`.
    pub fn permits(self, roles: &[Role]) -> bool {
        match self {
            Role::Anyone => true,
            // Admins may always act as leaders.
            Role::Leader => roles.contains(&Role::Leader) || roles.contains(&Role::Admin),
            other => roles.contains(&other),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::Anyone => "anyone",
            Role::Member => "member",
            Role::Leader => "leader",
            Role::Admin => "admin",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug)]
pub struct CommandSpec {
    pub name: &'static str,
    pub aliases: &'static [&'static str],
    pub usage: &'static str,
    pub description: &'static str,
    pub role: Role,
}

impl CommandSpec {
    fn answers_to(&self, name: &str) -> bool {
        self.name == name || self.aliases.contains(&name)
    }
}

pub const COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        name: "help",
        aliases: &[],
        usage: "!help [command]",
        description: "Show the commands you may use, or how to use one.",
        role: Role::Anyone,
    },
    CommandSpec {
        name: "version",
        aliases: &[],
        usage: "!version",
        description: "Show the bot and view format versions.",
        role: Role::Anyone,
    },
    CommandSpec {
        name: "route",
        aliases: &[],
        usage: "!route\n- <place>\n- <place>\n- ...",
        description: "Set the caravan route while it is forming.",
        role: Role::Leader,
    },
    CommandSpec {
        name: "start",
        aliases: &["resume"],
        usage: "!start",
        description: "Start the caravan.",
        role: Role::Leader,
    },
    CommandSpec {
        name: "stop",
        aliases: &["done"],
        usage: "!stop",
        description: "Stop the caravan so the route can be edited again.",
        role: Role::Leader,
    },
    CommandSpec {
        name: "next",
        aliases: &[],
        usage: "!next",
        description: "Advance the caravan to the next stop.",
        role: Role::Leader,
    },
    CommandSpec {
        name: "prev",
        aliases: &["back"],
        usage: "!prev",
        description: "Back the caravan up to the previous stop.",
        role: Role::Leader,
    },
    CommandSpec {
        name: "skip",
        aliases: &[],
        usage: "!skip [reason]",
        description: "Skip the current stop.",
        role: Role::Leader,
    },
    CommandSpec {
        name: "remove",
        aliases: &["delete"],
        usage: "!remove <place>",
        description: "Remove a stop from the route.",
        role: Role::Leader,
    },
    CommandSpec {
        name: "append",
        aliases: &["add"],
        usage: "!append <place>[, <place>...]",
        description: "Add stops to the end of an active route.",
        role: Role::Leader,
    },
    CommandSpec {
        name: "reset",
        aliases: &[],
        usage: "!reset",
        description: "Clear the route and the member list.",
        role: Role::Leader,
    },
    CommandSpec {
        name: "grant",
        aliases: &["leader", "leaders"],
        usage: "!grant @member [@member]...",
        description: "Make members caravan leaders.",
        role: Role::Admin,
    },
    CommandSpec {
        name: "revoke",
        aliases: &["unleader"],
        usage: "!revoke @member [@member]...",
        description: "Remove members from the caravan leaders.",
        role: Role::Admin,
    },
    CommandSpec {
        name: "join",
        aliases: &[],
        usage: "!join [+guests]",
        description: "Join the caravan, optionally with guests.",
        role: Role::Anyone,
    },
    CommandSpec {
        name: "leave",
        aliases: &["unjoin"],
        usage: "!leave",
        description: "Leave the caravan along with your guests.",
        role: Role::Member,
    },
    CommandSpec {
        name: "notify",
        aliases: &[],
        usage: "!notify <message>",
        description: "Mention every caravan member with a message.",
        role: Role::Anyone,
    },
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help(Option<String>),
    Version,
    SetRoute(Vec<String>),
    Start,
    Stop,
    Next,
    Prev,
    Skip(String),
    Remove(String),
    Append(Vec<String>),
    Reset,
    Grant(Vec<MemberId>),
    Revoke(Vec<MemberId>),
    Join(u32),
    Leave,
    Notify(String),
}

impl Command {
    pub fn spec(&self) -> &'static CommandSpec {
        let name = match self {
            Command::Help(_) => "help",
            Command::Version => "version",
            Command::SetRoute(_) => "route",
            Command::Start => "start",
            Command::Stop => "stop",
            Command::Next => "next",
            Command::Prev => "prev",
            Command::Skip(_) => "skip",
            Command::Remove(_) => "remove",
            Command::Append(_) => "append",
            Command::Reset => "reset",
            Command::Grant(_) => "grant",
            Command::Revoke(_) => "revoke",
            Command::Join(_) => "join",
            Command::Leave => "leave",
            Command::Notify(_) => "notify",
        };
        // Every variant is listed in COMMANDS; the first entry is a fallback.
        find(name).unwrap_or(&COMMANDS[0])
    }
}

/// Look a command up by name or alias.
pub fn find(name: &str) -> Option<&'static CommandSpec> {
    let name = name.trim_start_matches(PREFIX).to_lowercase();
    COMMANDS.iter().find(|spec| spec.answers_to(&name))
}

/// Closest command name to an unknown one, if it is close enough.
pub fn suggest(name: &str) -> Option<&'static str> {
    let name = name.trim_start_matches(PREFIX).to_lowercase();
    COMMANDS
        .iter()
        .flat_map(|spec| std::iter::once(&spec.name).chain(spec.aliases.iter()))
        .map(|candidate| (ratio(&name, candidate), *candidate))
        .filter(|(score, _)| *score >= SUGGEST_SCORE)
        .max_by(|(a, a_name), (b, b_name)| a.cmp(b).then_with(|| b_name.cmp(a_name)))
        .map(|(_, candidate)| candidate)
}

/// Parse one chat message.
///
/// Returns `None` for anything that is not addressed to this bot: plain chat
/// and unknown commands with no close match.
pub fn parse(message: &str) -> Option<Result<Command, CaravanError>> {
    let body = message.trim_start().strip_prefix(PREFIX)?;
    let (name, args) = match body.find(char::is_whitespace) {
        Some(split) => (&body[..split], body[split..].trim()),
        None => (body, ""),
    };
    if name.is_empty() {
        return None;
    }

    let spec = match find(name) {
        Some(spec) => spec,
        None => {
            let suggestion = suggest(name)?;
            return Some(Err(CaravanError::UnknownCommand {
                command: name.to_lowercase(),
                suggestion,
            }));
        }
    };

    Some(parse_args(spec, args))
}

fn parse_args(spec: &'static CommandSpec, args: &str) -> Result<Command, CaravanError> {
    let invalid = |message: &str| CaravanError::InvalidArguments {
        message: message.to_string(),
        usage: spec.usage,
    };

    let command = match spec.name {
        "help" => Command::Help((!args.is_empty()).then(|| args.to_string())),
        "version" => Command::Version,
        "route" => Command::SetRoute(parse_place_list(args)),
        "start" => Command::Start,
        "stop" => Command::Stop,
        "next" => Command::Next,
        "prev" => Command::Prev,
        "skip" => Command::Skip(args.to_string()),
        "remove" => {
            let place = clean_place(args);
            if place.is_empty() {
                return Err(invalid("Name the stop to remove."));
            }
            Command::Remove(place)
        }
        "append" => Command::Append(parse_place_list(args)),
        "reset" => Command::Reset,
        "grant" | "revoke" => {
            let members = parse_mentions(args)
                .ok_or_else(|| invalid("Mention the members by @name."))?;
            if members.is_empty() {
                return Err(invalid("Mention at least one member."));
            }
            if spec.name == "grant" {
                Command::Grant(members)
            } else {
                Command::Revoke(members)
            }
        }
        "join" => Command::Join(parse_guests(args).ok_or_else(|| {
            invalid("The guest count must be a whole number, like `!join +2`.")
        })?),
        "leave" => Command::Leave,
        "notify" => {
            if args.is_empty() {
                return Err(invalid("You must write a message."));
            }
            Command::Notify(args.to_string())
        }
        _ => return Err(invalid("Unsupported command.")),
    };
    Ok(command)
}

/// Split route arguments into place names.
///
/// Multi-line input is one place per line (bullets and numbering allowed);
/// single-line input may separate places with `,` or `;`.
pub fn parse_place_list(args: &str) -> Vec<String> {
    let pieces: Vec<&str> = if args.contains('\n') {
        args.lines().collect()
    } else {
        args.split([',', ';']).collect()
    };
    pieces
        .into_iter()
        .map(clean_place)
        .filter(|p| !p.is_empty())
        .collect()
}

/// Strip list markers, strike-through, a trailing parenthetical and quotes.
pub fn clean_place(line: &str) -> String {
    let mut text = strip_list_marker(line.trim());

    if let Some(rest) = text.strip_prefix("~~") {
        if let Some(end) = rest.find("~~") {
            text = &rest[..end];
        }
    }

    let trimmed = text.trim_end();
    if trimmed.ends_with(')') {
        if let Some(open) = trimmed.rfind('(') {
            if open > 0 {
                text = &trimmed[..open];
            }
        }
    }

    text.trim().trim_matches(QUOTES).trim().to_string()
}

fn strip_list_marker(line: &str) -> &str {
    if let Some(rest) = line.strip_prefix(['-', '*', '•']) {
        return rest.trim_start();
    }
    let digits = line.chars().take_while(char::is_ascii_digit).count();
    if digits > 0 {
        if let Some(rest) = line[digits..].strip_prefix(['.', ')']) {
            return rest.trim_start();
        }
    }
    line
}

fn parse_mentions(args: &str) -> Option<Vec<MemberId>> {
    args.split(|c: char| c.is_whitespace() || c == ',')
        .filter(|token| !token.is_empty())
        .map(MemberId::parse_mention)
        .collect()
}

fn parse_guests(args: &str) -> Option<u32> {
    if args.is_empty() {
        return Some(0);
    }
    args.strip_prefix('+').unwrap_or(args).trim().parse().ok()
}

/// Help reply for a caller holding `roles`: every command they may use, or
/// the usage of a single `topic`.
pub fn help_text(roles: &[Role], topic: Option<&str>) -> String {
    if let Some(topic) = topic {
        return match find(topic) {
            Some(spec) => format!(
                "`!{}`: {} _({})_\n```\n{}\n```",
                spec.name, spec.description, spec.role, spec.usage
            ),
            None => match suggest(topic) {
                Some(suggestion) => format!("_Did you mean `!help {}`?_", suggestion),
                None => format!("There is no `!{}` command.", topic.trim_start_matches(PREFIX)),
            },
        };
    }

    let held: Vec<String> = roles
        .iter()
        .filter(|role| **role != Role::Anyone)
        .map(|role| format!("**{}**", role))
        .collect();
    let mut text = if held.is_empty() {
        "You are not part of this caravan yet.".to_string()
    } else {
        format!(
            "Your caravan {} {}.",
            if held.len() == 1 { "role is" } else { "roles are" },
            crate::notify::join_list(&held, "and")
        )
    };
    text.push_str(" You may use the following commands:");
    for spec in COMMANDS.iter().filter(|spec| spec.role.permits(roles)) {
        text.push_str(&format!("\n`!{}`: {}", spec.name, spec.description));
    }
    text
}

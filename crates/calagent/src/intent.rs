//! Action detection and completion verification.
//!
//! The user's message is classified once per request by an ordered list of
//! keyword rules. After the model finishes a turn, the tools it actually
//! called are checked against what that classification requires.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;

use crate::tools::catalog::{
    ADD_ATTENDEE, CREATE_EVENT, DELETE_EVENT, LIST_EVENTS, REMOVE_ATTENDEE, UPDATE_EVENT,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    Create,
    Update,
    Delete,
    Attendees,
    Read,
    None,
}

impl ActionKind {
    pub fn is_mutating(self) -> bool {
        matches!(
            self,
            ActionKind::Create | ActionKind::Update | ActionKind::Delete | ActionKind::Attendees
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ActionKind::Create => "create",
            ActionKind::Update => "update",
            ActionKind::Delete => "delete",
            ActionKind::Attendees => "attendees",
            ActionKind::Read => "read",
            ActionKind::None => "none",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

struct Rule {
    kind: ActionKind,
    pattern: &'static str,
    /// Extra condition on the lowercased message.
    guard: Option<fn(&str) -> bool>,
}

/// Precedence is list order. Delete comes first but yields to an explicit
/// attendee relation ("remove Sara from the meeting"); attendee verbs need a
/// "to/from" clause so "remove the dentist appointment" stays a delete.
const RULES: &[Rule] = &[
    Rule {
        kind: ActionKind::Delete,
        pattern: r"\b(delete|cancel|remove|clear)\b",
        guard: Some(not_attendee_change),
    },
    Rule {
        kind: ActionKind::Update,
        pattern: r"\b(move|reschedule|change|update|rename|push|shift|postpone|edit)\b",
        guard: None,
    },
    Rule {
        kind: ActionKind::Attendees,
        pattern: ATTENDEE_PATTERN,
        guard: Some(not_calendar_target),
    },
    Rule {
        kind: ActionKind::Create,
        pattern: r"\b(schedule|create|add|book|set up|make|plan|put)\b",
        guard: None,
    },
    Rule {
        kind: ActionKind::Read,
        pattern: r"\b(what|when|show|list|free|busy|available|availability|check|how many|how much|stats|statistics)\b|\?",
        guard: None,
    },
];

const ATTENDEE_PATTERN: &str =
    r"\b(add|invite|include|remove|uninvite|drop)\b.*\b(to|from)\b";

fn compiled_rules() -> &'static [(ActionKind, Regex, Option<fn(&str) -> bool>)] {
    static COMPILED: OnceLock<Vec<(ActionKind, Regex, Option<fn(&str) -> bool>)>> =
        OnceLock::new();
    COMPILED.get_or_init(|| {
        RULES
            .iter()
            .map(|rule| {
                let regex = Regex::new(rule.pattern).expect("intent pattern should compile");
                (rule.kind, regex, rule.guard)
            })
            .collect()
    })
}

fn attendee_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(ATTENDEE_PATTERN).expect("attendee pattern should compile"))
}

fn calendar_target_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\b(to|from|on)\s+(my|the|our)\s+(calendar|schedule|agenda)\b")
            .expect("calendar target pattern should compile")
    })
}

fn removal_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\b(remove|uninvite|drop)\b").expect("removal pattern should compile")
    })
}

fn calendar_keyword_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"\b(calendar|schedule|scheduled|event|events|meeting|meetings|appointment|appointments|agenda|busy|free|available|availability|today|tomorrow|tonight|yesterday|week|weekend|monday|tuesday|wednesday|thursday|friday|saturday|sunday|stats|invite|attendee|attendees)\b",
        )
        .expect("calendar keyword pattern should compile")
    })
}

fn event_id_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"ID:\s*([A-Za-z0-9_\-@.]+)").expect("event id pattern should compile")
    })
}

fn is_attendee_change(message: &str) -> bool {
    attendee_regex().is_match(message) && not_calendar_target(message)
}

fn not_attendee_change(message: &str) -> bool {
    !is_attendee_change(message)
}

fn not_calendar_target(message: &str) -> bool {
    !calendar_target_regex().is_match(message)
}

pub fn detect_action(user_message: &str) -> ActionKind {
    let message = user_message.to_lowercase();
    compiled_rules()
        .iter()
        .find(|(_, regex, guard)| {
            regex.is_match(&message) && guard.map_or(true, |guard| guard(&message))
        })
        .map(|(kind, _, _)| *kind)
        .unwrap_or(ActionKind::None)
}

/// Whether the first model turn should be forced to call a tool.
pub fn requires_tool_call(user_message: &str) -> bool {
    calendar_keyword_regex().is_match(&user_message.to_lowercase())
        || detect_action(user_message).is_mutating()
}

/// Event IDs quoted in a tool result, in order of appearance.
pub fn extract_event_ids(text: &str) -> Vec<String> {
    let mut ids: Vec<String> = Vec::new();
    for capture in event_id_regex().captures_iter(text) {
        let id = capture[1].trim_end_matches('.').to_string();
        if !id.is_empty() && !ids.contains(&id) {
            ids.push(id);
        }
    }
    ids
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    Satisfied,
    /// The corrective instruction to show the model on retry.
    Missing { instruction: String },
}

fn called(tools_called: &[String], name: &str) -> bool {
    tools_called.iter().any(|tool| tool == name)
}

pub fn validate_action_completed(
    action: ActionKind,
    tools_called: &[String],
    user_message: &str,
    last_tool_result: Option<&str>,
) -> Completion {
    match action {
        ActionKind::Read | ActionKind::None => Completion::Satisfied,
        ActionKind::Create => require(tools_called, &[CREATE_EVENT], "create the event"),
        ActionKind::Delete => require(tools_called, &[DELETE_EVENT], "delete the event"),
        ActionKind::Update => {
            if called(tools_called, LIST_EVENTS) && called(tools_called, UPDATE_EVENT) {
                return Completion::Satisfied;
            }
            if !called(tools_called, UPDATE_EVENT) {
                return Completion::Missing {
                    instruction: update_instruction(last_tool_result),
                };
            }
            require(tools_called, &[LIST_EVENTS, UPDATE_EVENT], "update the event")
        }
        ActionKind::Attendees => {
            let change = if removal_regex().is_match(&user_message.to_lowercase()) {
                REMOVE_ATTENDEE
            } else {
                ADD_ATTENDEE
            };
            require(tools_called, &[LIST_EVENTS, change], "change the attendees")
        }
    }
}

fn require(tools_called: &[String], required: &[&str], goal: &str) -> Completion {
    let missing: Vec<&str> = required
        .iter()
        .copied()
        .filter(|name| !called(tools_called, name))
        .collect();
    if missing.is_empty() {
        return Completion::Satisfied;
    }
    Completion::Missing {
        instruction: format!(
            "You described a calendar change but did not call {}. To {goal} you must call {} now. \
             Do not claim the change happened until the tool result confirms it.",
            missing.join(" or "),
            required.join(" and then "),
        ),
    }
}

fn update_instruction(last_tool_result: Option<&str>) -> String {
    let ids = last_tool_result.map(extract_event_ids).unwrap_or_default();
    if ids.is_empty() {
        return format!(
            "You did not call {UPDATE_EVENT}. First call {LIST_EVENTS} for the relevant dates to find \
             the event's real ID, then call {UPDATE_EVENT} with that ID. Never guess an event ID."
        );
    }
    let quoted: Vec<String> = ids.iter().map(|id| format!("\"{id}\"")).collect();
    format!(
        "You did not call {UPDATE_EVENT}. The events you found have these IDs: {}. \
         Call {UPDATE_EVENT} now using one of these exact IDs, for example: \
         {UPDATE_EVENT}({{\"event_id\": \"{}\", \"start_time\": \"YYYY-MM-DDTHH:MM:SS\", \"end_time\": \"YYYY-MM-DDTHH:MM:SS\"}}). \
         Do not invent any other ID.",
        quoted.join(", "),
        ids[0],
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tools(names: &[&str]) -> Vec<String> {
        names.iter().map(|name| name.to_string()).collect()
    }

    #[test]
    fn classifies_by_rule_precedence() {
        let cases = [
            ("Schedule coffee with Mike next Monday at 3pm", ActionKind::Create),
            ("Add a dentist appointment on Friday", ActionKind::Create),
            ("Move my standup to 10am", ActionKind::Update),
            ("Rename the sync to Planning", ActionKind::Update),
            ("Cancel my meeting tomorrow", ActionKind::Delete),
            ("Remove the dentist appointment", ActionKind::Delete),
            ("Remove Sara from the planning meeting", ActionKind::Attendees),
            ("Invite mike@example.com to the offsite", ActionKind::Attendees),
            ("Add lunch to my calendar on Friday", ActionKind::Create),
            ("Remove lunch from my calendar", ActionKind::Delete),
            ("What do I have on Tuesday?", ActionKind::Read),
            ("Am I free at 3?", ActionKind::Read),
            ("hello there", ActionKind::None),
        ];
        for (message, expected) in cases {
            assert_eq!(detect_action(message), expected, "{message}");
        }
    }

    #[test]
    fn update_needs_lookup_and_update() {
        let message = "Move my standup to 10am";
        assert_ne!(
            validate_action_completed(
                ActionKind::Update,
                &tools(&[LIST_EVENTS]),
                message,
                None
            ),
            Completion::Satisfied
        );
        assert_eq!(
            validate_action_completed(
                ActionKind::Update,
                &tools(&[LIST_EVENTS, UPDATE_EVENT]),
                message,
                None
            ),
            Completion::Satisfied
        );
        assert_ne!(
            validate_action_completed(
                ActionKind::Update,
                &tools(&[UPDATE_EVENT]),
                message,
                None
            ),
            Completion::Satisfied
        );
    }

    #[test]
    fn update_retry_quotes_real_ids() {
        let listing = "Found 2 event(s):\n- Standup: Monday 2026-01-12, 09:00 to 09:15 (ID: abc123)\n- Sync: Monday 2026-01-12, 11:00 to 11:30 (ID: def_456)\n- again (ID: abc123)";
        let completion = validate_action_completed(
            ActionKind::Update,
            &tools(&[LIST_EVENTS]),
            "move standup",
            Some(listing),
        );
        let Completion::Missing { instruction } = completion else {
            panic!("expected missing update");
        };
        assert!(instruction.contains("\"abc123\", \"def_456\""));
        assert!(instruction.contains("\"event_id\": \"abc123\""));
    }

    #[test]
    fn update_retry_without_ids_mandates_lookup() {
        let Completion::Missing { instruction } =
            validate_action_completed(ActionKind::Update, &[], "move standup", Some("No events found."))
        else {
            panic!("expected missing update");
        };
        assert!(instruction.contains("First call list_events"));
    }

    #[test]
    fn attendee_removal_requires_remove_tool() {
        let message = "Remove Sara from the planning meeting";
        assert_ne!(
            validate_action_completed(
                ActionKind::Attendees,
                &tools(&[LIST_EVENTS, ADD_ATTENDEE]),
                message,
                None
            ),
            Completion::Satisfied
        );
        assert_eq!(
            validate_action_completed(
                ActionKind::Attendees,
                &tools(&[LIST_EVENTS, REMOVE_ATTENDEE]),
                message,
                None
            ),
            Completion::Satisfied
        );
    }

    #[test]
    fn reads_and_chat_always_pass() {
        assert_eq!(
            validate_action_completed(ActionKind::Read, &[], "what's on today", None),
            Completion::Satisfied
        );
        assert_eq!(
            validate_action_completed(ActionKind::None, &[], "thanks", None),
            Completion::Satisfied
        );
    }

    #[test]
    fn create_and_delete_need_their_tool() {
        assert_ne!(
            validate_action_completed(ActionKind::Create, &[], "book lunch", None),
            Completion::Satisfied
        );
        assert_eq!(
            validate_action_completed(ActionKind::Create, &tools(&[CREATE_EVENT]), "book lunch", None),
            Completion::Satisfied
        );
        assert_eq!(
            validate_action_completed(
                ActionKind::Delete,
                &tools(&[LIST_EVENTS, DELETE_EVENT]),
                "cancel lunch",
                None
            ),
            Completion::Satisfied
        );
    }

    #[test]
    fn calendar_talk_forces_tools() {
        assert!(requires_tool_call("What's on my calendar tomorrow?"));
        assert!(requires_tool_call("Book lunch with Sara"));
        assert!(!requires_tool_call("Tell me a joke"));
    }

    #[test]
    fn ids_are_deduplicated_in_order() {
        assert_eq!(
            extract_event_ids("(ID: b) (ID: a) ID: b"),
            vec!["b".to_string(), "a".to_string()]
        );
    }
}

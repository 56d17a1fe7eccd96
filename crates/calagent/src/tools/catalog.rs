use calagent_llm::ToolDefinition;
use serde_json::{json, Value};

pub const RESOLVE_DATE: &str = "resolve_date";
pub const LIST_EVENTS: &str = "list_events";
pub const CHECK_AVAILABILITY: &str = "check_availability";
pub const GET_STATS: &str = "get_stats";
pub const CREATE_EVENT: &str = "create_event";
pub const UPDATE_EVENT: &str = "update_event";
pub const DELETE_EVENT: &str = "delete_event";
pub const ADD_ATTENDEE: &str = "add_attendee";
pub const REMOVE_ATTENDEE: &str = "remove_attendee";
pub const DRAFT_EMAIL: &str = "draft_email";

/// Tools whose success changes calendar state.
pub const MUTATING_TOOLS: [&str; 5] = [
    CREATE_EVENT,
    UPDATE_EVENT,
    DELETE_EVENT,
    ADD_ATTENDEE,
    REMOVE_ATTENDEE,
];

const TIME_FORMAT_HINT: &str =
    "Exact local time in the format YYYY-MM-DDTHH:MM:SS with no timezone suffix (e.g. 2026-01-12T15:00:00).";

fn string_property(description: &str) -> Value {
    json!({ "type": "string", "description": description })
}

fn object_schema(properties: Value, required: &[&str]) -> Value {
    json!({
        "type": "object",
        "properties": properties,
        "required": required,
        "additionalProperties": false,
    })
}

fn definition(name: &str, description: &str, input_schema: Value) -> ToolDefinition {
    ToolDefinition {
        name: name.to_string(),
        description: description.to_string(),
        input_schema,
    }
}

pub fn tool_definitions() -> Vec<ToolDefinition> {
    vec![
        definition(
            RESOLVE_DATE,
            "Convert a natural-language date such as 'next Monday', 'this week' or 'tomorrow at 3pm' into exact ISO dates and weekday names. Call this before using any date the user did not give as YYYY-MM-DD.",
            object_schema(
                json!({ "query": string_property("The user's date phrase, verbatim (e.g. 'next Monday at 3pm').") }),
                &["query"],
            ),
        ),
        definition(
            LIST_EVENTS,
            "List calendar events between two dates (inclusive). Each event line ends with its ID, which update, delete and attendee tools require. Defaults to the next seven days.",
            object_schema(
                json!({
                    "start_date": string_property("First day, YYYY-MM-DD. Resolve relative phrases with resolve_date first."),
                    "end_date": string_property("Last day, YYYY-MM-DD, on or after start_date."),
                }),
                &[],
            ),
        ),
        definition(
            CHECK_AVAILABILITY,
            "Check whether a time slot is free. Reports overlapping events and the earliest conflict-free start on the same day.",
            object_schema(
                json!({
                    "start_time": string_property(TIME_FORMAT_HINT),
                    "end_time": string_property(TIME_FORMAT_HINT),
                }),
                &["start_time", "end_time"],
            ),
        ),
        definition(
            GET_STATS,
            "Summarise recent meeting load: total meeting time, time per weekday and the most frequent attendees.",
            object_schema(json!({}), &[]),
        ),
        definition(
            CREATE_EVENT,
            "Create a calendar event. The event is only created when this tool is called; never tell the user an event exists otherwise.",
            object_schema(
                json!({
                    "title": string_property("Event title."),
                    "start_time": string_property(TIME_FORMAT_HINT),
                    "end_time": string_property(TIME_FORMAT_HINT),
                    "description": string_property("Optional notes."),
                    "location": string_property("Optional location."),
                    "attendees": {
                        "type": "array",
                        "items": { "type": "string" },
                        "description": "Optional attendee email addresses.",
                    },
                }),
                &["title", "start_time", "end_time"],
            ),
        ),
        definition(
            UPDATE_EVENT,
            "Change an existing event. Only the supplied fields change. The event_id must come from a list_events result.",
            object_schema(
                json!({
                    "event_id": string_property("ID from list_events."),
                    "title": string_property("New title."),
                    "start_time": string_property(TIME_FORMAT_HINT),
                    "end_time": string_property(TIME_FORMAT_HINT),
                    "description": string_property("New notes."),
                    "location": string_property("New location."),
                }),
                &["event_id"],
            ),
        ),
        definition(
            DELETE_EVENT,
            "Delete an event by ID. The event_id must come from a list_events result.",
            object_schema(
                json!({ "event_id": string_property("ID from list_events.") }),
                &["event_id"],
            ),
        ),
        definition(
            ADD_ATTENDEE,
            "Invite someone to an existing event.",
            object_schema(
                json!({
                    "event_id": string_property("ID from list_events."),
                    "email": string_property("Attendee email address."),
                }),
                &["event_id", "email"],
            ),
        ),
        definition(
            REMOVE_ATTENDEE,
            "Remove an attendee from an existing event.",
            object_schema(
                json!({
                    "event_id": string_property("ID from list_events."),
                    "email": string_property("Attendee email address."),
                }),
                &["event_id", "email"],
            ),
        ),
        definition(
            DRAFT_EMAIL,
            "Prepare an email draft. Returns a compose directive; write the email body yourself in the next reply.",
            object_schema(
                json!({
                    "to": {
                        "type": "array",
                        "items": { "type": "string" },
                        "description": "Recipient email addresses.",
                    },
                    "subject": string_property("Subject line."),
                    "context": string_property("What the email should say or accomplish."),
                    "tone": string_property("Optional tone, e.g. 'friendly' or 'formal'."),
                }),
                &["to", "subject", "context"],
            ),
        ),
    ]
}

/// Progress line shown to the user before a tool runs.
pub fn status_message(tool_name: &str) -> String {
    let message = match tool_name {
        RESOLVE_DATE => "Working out the date...",
        LIST_EVENTS => "Checking your calendar...",
        CHECK_AVAILABILITY => "Checking availability...",
        GET_STATS => "Crunching your calendar stats...",
        CREATE_EVENT => "Creating the event...",
        UPDATE_EVENT => "Updating the event...",
        DELETE_EVENT => "Deleting the event...",
        ADD_ATTENDEE => "Adding the attendee...",
        REMOVE_ATTENDEE => "Removing the attendee...",
        DRAFT_EMAIL => "Drafting the email...",
        other => return format!("Running {other}..."),
    };
    message.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_has_ten_uniquely_named_tools() {
        let definitions = tool_definitions();
        let mut names: Vec<&str> = definitions.iter().map(|tool| tool.name.as_str()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), 10);
    }

    #[test]
    fn create_event_requires_title_and_times() {
        let definitions = tool_definitions();
        let create = definitions
            .iter()
            .find(|tool| tool.name == CREATE_EVENT)
            .expect("create_event");
        assert_eq!(create.input_schema["type"], "object");
        assert_eq!(
            create.input_schema["required"],
            json!(["title", "start_time", "end_time"])
        );
    }

    #[test]
    fn unknown_tools_get_a_generic_status() {
        assert_eq!(status_message("launch_rocket"), "Running launch_rocket...");
        assert_eq!(status_message(LIST_EVENTS), "Checking your calendar...");
    }
}

use crate::models::Priority;
use chrono::NaiveDate;
use regex::{Captures, Regex};
use std::sync::OnceLock;

#[derive(Debug, PartialEq)]
pub struct ParsedTask {
    pub title: String,
    pub priority: Option<Priority>,
    pub due_date: Option<NaiveDate>,
}

// Tokens only count at the start of the title or after whitespace, so text
// like "Yahoo!News" is left alone.
fn priority_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(^|\s)!(\w+)").expect("valid priority pattern"))
}

fn due_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(^|\s)@(\d{4}-\d{2}-\d{2})\b").expect("valid due date pattern"))
}

fn whitespace_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("valid whitespace pattern"))
}

fn priority_token(token: &str) -> Option<Priority> {
    match token.to_lowercase().as_str() {
        "h" | "high" => Some(Priority::High),
        "m" | "med" | "medium" => Some(Priority::Medium),
        "l" | "low" => Some(Priority::Low),
        _ => None,
    }
}

fn due_token(token: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(token, "%Y-%m-%d").ok()
}

/// Pulls `!priority` and `@YYYY-MM-DD` tokens out of a quick-add title.
///
/// Only recognised tokens are removed; anything else stays in the title.
pub fn parse_task_input(input: &str) -> ParsedTask {
    let mut priority = None;
    let mut due_date = None;

    // Priority
    let title = priority_re().replace_all(input, |caps: &Captures| {
        match priority_token(&caps[2]) {
            Some(p) => {
                priority.get_or_insert(p);
                caps[1].to_string()
            }
            None => caps[0].to_string(),
        }
    });

    // Due date
    let title = due_re().replace_all(&title, |caps: &Captures| match due_token(&caps[2]) {
        Some(date) => {
            due_date.get_or_insert(date);
            caps[1].to_string()
        }
        None => caps[0].to_string(),
    });

    let title = whitespace_re().replace_all(&title, " ").trim().to_string();

    ParsedTask {
        title,
        priority,
        due_date,
    }
}

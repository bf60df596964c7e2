use regex::{Captures, Regex};
use std::sync::LazyLock;

static TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\$(STRIKES|SUBREDDIT|NAME|REASON|TYPE)").expect("token pattern is valid")
});

/// The fixed notification messages sent to users.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageTemplate {
    FirstStrike,
    SecondStrike,
    NthStrike,
    StrikeRemoved,
    StrikesReset,
    RemovalReverted,
}

impl MessageTemplate {
    pub fn body(&self) -> &'static str {
        let raw = match self {
            MessageTemplate::FirstStrike => include_str!("../../templates/first_strike.txt"),
            MessageTemplate::SecondStrike => include_str!("../../templates/second_strike.txt"),
            MessageTemplate::NthStrike => include_str!("../../templates/nth_strike.txt"),
            MessageTemplate::StrikeRemoved => include_str!("../../templates/strike_removed.txt"),
            MessageTemplate::StrikesReset => include_str!("../../templates/strikes_reset.txt"),
            MessageTemplate::RemovalReverted => {
                include_str!("../../templates/removal_reverted.txt")
            }
        };
        raw.trim_end()
    }

    pub fn render(&self, vars: &TemplateVars<'_>) -> String {
        render(self.body(), vars)
    }
}

/// Values substituted into a template. Absent values render as empty
/// strings, except `strikes` which renders as `0`.
#[derive(Debug, Clone, Default)]
pub struct TemplateVars<'a> {
    pub name: &'a str,
    pub subreddit: &'a str,
    pub reason: Option<&'a str>,
    pub strikes: Option<u32>,
    pub content_type: Option<&'a str>,
}

/// Replaces `$NAME`, `$SUBREDDIT`, `$REASON`, `$STRIKES` and `$TYPE`
/// (any case) in a single pass. Substituted text is never rescanned.
pub fn render(template: &str, vars: &TemplateVars<'_>) -> String {
    TOKEN_RE
        .replace_all(template, |caps: &Captures<'_>| {
            match caps[1].to_ascii_uppercase().as_str() {
                "STRIKES" => vars.strikes.unwrap_or(0).to_string(),
                "SUBREDDIT" => vars.subreddit.to_string(),
                "NAME" => vars.name.to_string(),
                "REASON" => vars.reason.unwrap_or_default().to_string(),
                "TYPE" => vars.content_type.unwrap_or_default().to_string(),
                _ => caps[0].to_string(),
            }
        })
        .into_owned()
}

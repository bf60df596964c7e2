/// Result of a moderator action, shown to the moderator who ran it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionOutcome {
    pub success: bool,
    pub message: String,
}

impl ActionOutcome {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

/// `"strike"` for exactly one, `"strikes"` otherwise.
pub fn strikes_noun(count: u32) -> &'static str {
    if count == 1 { "strike" } else { "strikes" }
}

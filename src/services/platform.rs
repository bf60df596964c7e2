use crate::Error;
use crate::services::context::TargetContent;
use async_trait::async_trait;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subreddit {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformUser {
    pub username: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BannedUser {
    pub username: String,
    pub note: Option<String>,
    pub days_left: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BanRequest {
    pub subreddit: String,
    pub username: String,
    pub duration_days: u32,
    /// Fullname of the content that led to the ban.
    pub context: Option<String>,
    pub reason: String,
    pub note: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrivateMessage {
    pub from_subreddit: String,
    pub to: String,
    pub subject: String,
    pub text: String,
}

/// Moderation capabilities of the content platform.
///
/// Every call is a single network round trip; nothing here retries.
#[async_trait]
pub trait ModerationPlatform: Send + Sync {
    async fn remove_content(&self, id: &str) -> Result<(), Error>;

    async fn approve_content(&self, id: &str) -> Result<(), Error>;

    async fn ban_user(&self, ban: &BanRequest) -> Result<(), Error>;

    async fn unban_user(&self, subreddit: &str, username: &str) -> Result<(), Error>;

    /// Banned users of `subreddit` matching `username`. The platform filter
    /// is a prefix search, so callers must still compare names exactly.
    async fn list_banned_users(
        &self,
        subreddit: &str,
        username: &str,
    ) -> Result<Vec<BannedUser>, Error>;

    async fn send_private_message(&self, message: &PrivateMessage) -> Result<(), Error>;

    async fn current_subreddit(&self) -> Result<Subreddit, Error>;

    async fn current_user(&self) -> Result<PlatformUser, Error>;

    async fn is_moderator(&self, subreddit: &str, username: &str) -> Result<bool, Error>;

    /// Looks up a post or comment by fullname.
    async fn fetch_content(&self, fullname: &str) -> Result<Option<TargetContent>, Error>;
}

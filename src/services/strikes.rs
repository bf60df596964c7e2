use crate::Error;
use crate::services::context::ModerationContext;
use crate::services::kv::KeyValueStore;
use crate::services::outcome::{ActionOutcome, strikes_noun};
use crate::services::platform::{BanRequest, ModerationPlatform, PrivateMessage};
use crate::services::templates::{MessageTemplate, TemplateVars};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Ban length used from the third strike on. The platform has no
/// permanent-ban duration we rely on, so a year stands in for it.
pub const YEAR_BAN_DAYS: u32 = 365;

const NO_REASON: &str = "N/A";

/// Punishment implied by a strike count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PunishmentTier {
    Warning,
    Ban { days: u32 },
}

impl PunishmentTier {
    pub fn for_strikes(strikes: u32) -> Self {
        match strikes {
            0 | 1 => PunishmentTier::Warning,
            2 => PunishmentTier::Ban { days: 1 },
            _ => PunishmentTier::Ban {
                days: YEAR_BAN_DAYS,
            },
        }
    }

    pub fn ban_days(&self) -> Option<u32> {
        match self {
            PunishmentTier::Warning => None,
            PunishmentTier::Ban { days } => Some(*days),
        }
    }

    pub fn describe(&self) -> String {
        match self {
            PunishmentTier::Warning => "sent a warning".to_string(),
            PunishmentTier::Ban { days: 1 } => "banned for 1 day".to_string(),
            PunishmentTier::Ban {
                days: YEAR_BAN_DAYS,
            } => "banned for 1 year".to_string(),
            PunishmentTier::Ban { days } => format!("banned for {days} days"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrikeActionKind {
    Add,
    Remove,
    Clear,
}

/// One change to a user's strikes, used to build the notification.
#[derive(Debug, Clone)]
pub struct StrikeAction<'a> {
    pub kind: StrikeActionKind,
    pub subreddit: &'a str,
    pub target_name: &'a str,
    pub reason: Option<&'a str>,
    pub resulting_strikes: u32,
}

impl StrikeAction<'_> {
    pub fn template(&self) -> MessageTemplate {
        match self.kind {
            StrikeActionKind::Add => match self.resulting_strikes {
                1 => MessageTemplate::FirstStrike,
                2 => MessageTemplate::SecondStrike,
                _ => MessageTemplate::NthStrike,
            },
            StrikeActionKind::Remove => MessageTemplate::StrikeRemoved,
            StrikeActionKind::Clear => MessageTemplate::StrikesReset,
        }
    }

    pub fn subject(&self) -> String {
        match self.kind {
            StrikeActionKind::Add => format!("Received a strike on {}", self.subreddit),
            StrikeActionKind::Remove => format!("Strike removed from u/{}!", self.target_name),
            StrikeActionKind::Clear => format!("Strike reset from u/{}!", self.target_name),
        }
    }

    pub fn render(&self) -> String {
        self.template().render(&TemplateVars {
            name: self.target_name,
            subreddit: self.subreddit,
            reason: self.reason,
            strikes: Some(self.resulting_strikes),
            content_type: None,
        })
    }

    pub fn message(&self) -> PrivateMessage {
        PrivateMessage {
            from_subreddit: self.subreddit.to_string(),
            to: self.target_name.to_string(),
            subject: self.subject(),
            text: self.render(),
        }
    }
}

pub fn strikes_key(author: &str) -> String {
    format!("u_{author}_strikes")
}

/// Per-user strike counts and the punishments they carry.
pub struct StrikeLedger {
    platform: Arc<dyn ModerationPlatform>,
    store: Arc<dyn KeyValueStore>,
}

impl StrikeLedger {
    pub fn new(platform: Arc<dyn ModerationPlatform>, store: Arc<dyn KeyValueStore>) -> Self {
        Self { platform, store }
    }

    pub async fn author_strikes(&self, author: &str) -> Result<u32, Error> {
        let value = self
            .store
            .get_or(&strikes_key(author), serde_json::json!(0))
            .await?;

        value
            .as_u64()
            .and_then(|n| u32::try_from(n).ok())
            .ok_or_else(|| anyhow::anyhow!("Stored strike count for u/{author} is invalid: {value}"))
    }

    async fn set_author_strikes(&self, author: &str, strikes: u32) -> Result<(), Error> {
        self.store
            .put(&strikes_key(author), serde_json::json!(strikes))
            .await
    }

    /// Removes the content, adds a strike to its author and applies the
    /// punishment for the new count.
    pub async fn strike(
        &self,
        ctx: &ModerationContext,
        reason: Option<&str>,
    ) -> Result<ActionOutcome, Error> {
        let (Some(id), Some(author), Some(_)) = (
            ctx.content_id.as_deref(),
            ctx.author.as_deref(),
            ctx.permalink.as_deref(),
        ) else {
            return Ok(ActionOutcome::fail(format!(
                "Metadata is missing for {}!",
                ctx.kind
            )));
        };

        if let Err(e) = self.platform.remove_content(id).await {
            warn!("Failed to remove {} before striking u/{}: {:?}", id, author, e);
        }

        let strikes = self.author_strikes(author).await? + 1;
        self.set_author_strikes(author, strikes).await?;

        let subreddit = self.platform.current_subreddit().await?;
        let tier = PunishmentTier::for_strikes(strikes);

        let action = StrikeAction {
            kind: StrikeActionKind::Add,
            subreddit: &subreddit.name,
            target_name: author,
            reason: Some(reason.unwrap_or_default()),
            resulting_strikes: strikes,
        };
        self.platform.send_private_message(&action.message()).await?;

        if let Some(days) = tier.ban_days() {
            let moderator = self.platform.current_user().await?;
            self.platform
                .ban_user(&BanRequest {
                    subreddit: subreddit.name.clone(),
                    username: author.to_string(),
                    duration_days: days,
                    context: Some(id.to_string()),
                    reason: format!(
                        "Received {} {} for breaking subreddit rules",
                        strikes,
                        strikes_noun(strikes)
                    ),
                    note: format!("Strike added by {}", moderator.username),
                })
                .await?;
        }

        info!(
            "Strike {} recorded for u/{} in r/{} ({:?})",
            strikes, author, subreddit.name, tier
        );

        Ok(ActionOutcome::ok(format!(
            "u/{} has {} {} and has been {}.",
            author,
            strikes,
            strikes_noun(strikes),
            tier.describe()
        )))
    }

    pub async fn remove_strike(&self, ctx: &ModerationContext) -> Result<ActionOutcome, Error> {
        let Some(author) = ctx.author.as_deref() else {
            return Ok(ActionOutcome::fail(
                "Could not get author of the comment or post",
            ));
        };

        let subreddit = self.platform.current_subreddit().await?;
        let strikes = self.author_strikes(author).await?;

        if strikes == 0 {
            return Ok(ActionOutcome::fail(format!(
                "u/{author} does not have any strikes!"
            )));
        }

        if strikes >= 2 {
            self.unban_if_banned(&subreddit.name, author).await?;
        }

        let remaining = strikes - 1;
        self.set_author_strikes(author, remaining).await?;

        let action = StrikeAction {
            kind: StrikeActionKind::Remove,
            subreddit: &subreddit.name,
            target_name: author,
            reason: Some(NO_REASON),
            resulting_strikes: remaining,
        };
        self.platform.send_private_message(&action.message()).await?;

        info!(
            "Removed a strike from u/{} in r/{}, {} left",
            author, subreddit.name, remaining
        );

        Ok(ActionOutcome::ok(format!(
            "Removed a strike from u/{author}. Remaining strikes: {remaining}."
        )))
    }

    pub async fn clear_strikes(&self, ctx: &ModerationContext) -> Result<ActionOutcome, Error> {
        let Some(author) = ctx.author.as_deref() else {
            return Ok(ActionOutcome::fail(
                "Could not get author of post or comment.",
            ));
        };

        let subreddit = self.platform.current_subreddit().await?;
        let had_strikes = self.author_strikes(author).await?;

        if had_strikes == 0 {
            return Ok(ActionOutcome::fail(format!(
                "u/{author} does not have any strikes!"
            )));
        }

        if had_strikes >= 2 {
            self.unban_if_banned(&subreddit.name, author).await?;
        }

        self.set_author_strikes(author, 0).await?;

        let action = StrikeAction {
            kind: StrikeActionKind::Clear,
            subreddit: &subreddit.name,
            target_name: author,
            reason: Some(NO_REASON),
            resulting_strikes: 0,
        };
        self.platform.send_private_message(&action.message()).await?;

        info!(
            "Cleared {} strikes from u/{} in r/{}",
            had_strikes, author, subreddit.name
        );

        Ok(ActionOutcome::ok(format!(
            "Cleared {} {} from u/{}!",
            had_strikes,
            strikes_noun(had_strikes),
            author
        )))
    }

    pub async fn check_strikes(&self, ctx: &ModerationContext) -> Result<ActionOutcome, Error> {
        let Some(author) = ctx.author.as_deref() else {
            return Ok(ActionOutcome::fail(
                "Could not get author of the comment or post",
            ));
        };

        let strikes = self.author_strikes(author).await?;

        Ok(ActionOutcome::ok(format!(
            "Author u/{} has {} {}.",
            author,
            strikes,
            strikes_noun(strikes)
        )))
    }

    /// Lifts an existing ban. Not being banned is not an error.
    async fn unban_if_banned(&self, subreddit: &str, author: &str) -> Result<(), Error> {
        let banned = self.platform.list_banned_users(subreddit, author).await?;

        for user in banned.iter().filter(|user| user.username == author) {
            self.platform.unban_user(subreddit, &user.username).await?;
            info!(
                "Unbanned u/{} from r/{} (days left: {:?}, note: {:?})",
                user.username, subreddit, user.days_left, user.note
            );
        }

        if !banned.iter().any(|user| user.username == author) {
            debug!("u/{} is not banned from r/{}, nothing to lift", author, subreddit);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::context::{ContentKind, ModerationContext};
    use crate::services::kv::MemoryKeyValueStore;
    use crate::services::test_utils::{MockPlatform, PlatformCall, comment, post};
    use serde_json::json;

    struct Harness {
        platform: Arc<MockPlatform>,
        store: Arc<MemoryKeyValueStore>,
        ledger: StrikeLedger,
    }

    fn harness_with(platform: MockPlatform) -> Harness {
        let platform = Arc::new(platform);
        let store = Arc::new(MemoryKeyValueStore::new());
        let ledger = StrikeLedger::new(platform.clone(), store.clone());
        Harness {
            platform,
            store,
            ledger,
        }
    }

    fn harness() -> Harness {
        harness_with(MockPlatform::new())
    }

    fn alice_post() -> ModerationContext {
        ModerationContext::from(post("abc", "alice"))
    }

    async fn seed(h: &Harness, author: &str, strikes: u32) {
        h.store
            .put(&strikes_key(author), json!(strikes))
            .await
            .unwrap();
    }

    #[test]
    fn test_tier_mapping() {
        assert_eq!(PunishmentTier::for_strikes(1), PunishmentTier::Warning);
        assert_eq!(PunishmentTier::for_strikes(2).ban_days(), Some(1));
        assert_eq!(PunishmentTier::for_strikes(3).ban_days(), Some(365));
        assert_eq!(PunishmentTier::for_strikes(10).ban_days(), Some(365));
        assert_eq!(PunishmentTier::for_strikes(1).ban_days(), None);
    }

    #[test]
    fn test_strike_action_picks_template() {
        let mut action = StrikeAction {
            kind: StrikeActionKind::Add,
            subreddit: "test",
            target_name: "alice",
            reason: None,
            resulting_strikes: 1,
        };
        assert_eq!(action.template(), MessageTemplate::FirstStrike);
        action.resulting_strikes = 2;
        assert_eq!(action.template(), MessageTemplate::SecondStrike);
        action.resulting_strikes = 7;
        assert_eq!(action.template(), MessageTemplate::NthStrike);
        action.kind = StrikeActionKind::Remove;
        assert_eq!(action.template(), MessageTemplate::StrikeRemoved);
        action.kind = StrikeActionKind::Clear;
        assert_eq!(action.template(), MessageTemplate::StrikesReset);
    }

    #[tokio::test]
    async fn test_unknown_author_has_no_strikes() {
        let h = harness();
        let outcome = h.ledger.check_strikes(&alice_post()).await.unwrap();
        assert_eq!(outcome, ActionOutcome::ok("Author u/alice has 0 strikes."));
        assert!(h.platform.calls().is_empty());
    }

    #[tokio::test]
    async fn test_first_strike_warns_without_ban() {
        let h = harness();
        let outcome = h
            .ledger
            .strike(&alice_post(), Some("spam"))
            .await
            .unwrap();

        assert_eq!(
            outcome,
            ActionOutcome::ok("u/alice has 1 strike and has been sent a warning.")
        );
        assert_eq!(h.ledger.author_strikes("alice").await.unwrap(), 1);
        assert_eq!(
            h.platform.calls()[0],
            PlatformCall::RemoveContent("t3_abc".to_string())
        );
        assert!(h.platform.bans().is_empty());

        let messages = h.platform.messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].to, "alice");
        assert_eq!(messages[0].from_subreddit, "test");
        assert_eq!(messages[0].subject, "Received a strike on test");
        assert!(messages[0].text.contains("spam"));
        assert!(messages[0].text.contains("This is your first strike"));
    }

    #[tokio::test]
    async fn test_second_strike_bans_for_one_day() {
        let h = harness();
        seed(&h, "alice", 1).await;

        let outcome = h.ledger.strike(&alice_post(), Some("spam")).await.unwrap();
        assert_eq!(
            outcome.message,
            "u/alice has 2 strikes and has been banned for 1 day."
        );

        let bans = h.platform.bans();
        assert_eq!(bans.len(), 1);
        assert_eq!(
            bans[0],
            BanRequest {
                subreddit: "test".to_string(),
                username: "alice".to_string(),
                duration_days: 1,
                context: Some("t3_abc".to_string()),
                reason: "Received 2 strikes for breaking subreddit rules".to_string(),
                note: "Strike added by mod_jane".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_later_strikes_ban_for_a_year() {
        let h = harness();
        seed(&h, "alice", 9).await;

        let outcome = h.ledger.strike(&alice_post(), None).await.unwrap();
        assert_eq!(
            outcome.message,
            "u/alice has 10 strikes and has been banned for 1 year."
        );
        assert_eq!(h.platform.bans()[0].duration_days, 365);
        assert!(h.platform.messages()[0].text.contains("This is your 10 strike"));
    }

    #[tokio::test]
    async fn test_strike_is_monotonic() {
        let h = harness();
        for n in 1..=4 {
            h.ledger.strike(&alice_post(), None).await.unwrap();
            assert_eq!(h.ledger.author_strikes("alice").await.unwrap(), n);
        }
    }

    #[tokio::test]
    async fn test_strike_notifies_before_banning() {
        let h = harness();
        seed(&h, "alice", 2).await;
        h.ledger.strike(&alice_post(), None).await.unwrap();

        let calls = h.platform.calls();
        let message_at = calls
            .iter()
            .position(|c| matches!(c, PlatformCall::SendPrivateMessage(_)))
            .unwrap();
        let ban_at = calls
            .iter()
            .position(|c| matches!(c, PlatformCall::BanUser(_)))
            .unwrap();
        assert!(message_at < ban_at);
    }

    #[tokio::test]
    async fn test_strike_survives_failed_removal() {
        let h = harness_with(MockPlatform::new().failing_content_calls());
        let outcome = h.ledger.strike(&alice_post(), None).await.unwrap();
        assert!(outcome.success);
        assert_eq!(h.ledger.author_strikes("alice").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_strike_missing_metadata_has_no_side_effects() {
        let h = harness();
        let ctx = ModerationContext {
            kind: ContentKind::Comment,
            content_id: Some("t1_xyz".to_string()),
            author: Some("alice".to_string()),
            permalink: None,
        };

        let outcome = h.ledger.strike(&ctx, Some("spam")).await.unwrap();
        assert_eq!(outcome, ActionOutcome::fail("Metadata is missing for comment!"));
        assert!(h.platform.calls().is_empty());
        assert_eq!(h.store.get(&strikes_key("alice")).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_remove_strike_without_strikes_fails() {
        let h = harness();
        let outcome = h.ledger.remove_strike(&alice_post()).await.unwrap();
        assert_eq!(
            outcome,
            ActionOutcome::fail("u/alice does not have any strikes!")
        );
        assert!(h.platform.calls().is_empty());
        assert_eq!(h.store.get(&strikes_key("alice")).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_remove_strike_from_two_unbans() {
        let h = harness_with(MockPlatform::new().with_banned("alice"));
        seed(&h, "alice", 2).await;

        let outcome = h.ledger.remove_strike(&alice_post()).await.unwrap();
        assert_eq!(
            outcome,
            ActionOutcome::ok("Removed a strike from u/alice. Remaining strikes: 1.")
        );
        assert_eq!(h.platform.unbans(), vec!["alice".to_string()]);
        assert!(!h.platform.is_banned("alice"));
        assert_eq!(h.ledger.author_strikes("alice").await.unwrap(), 1);

        let messages = h.platform.messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].subject, "Strike removed from u/alice!");
        assert!(messages[0].text.contains("You are now at 1 strike(s)."));
    }

    #[tokio::test]
    async fn test_remove_strike_from_one_skips_unban() {
        let h = harness();
        seed(&h, "alice", 1).await;

        h.ledger.remove_strike(&alice_post()).await.unwrap();
        assert!(
            !h.platform
                .calls()
                .iter()
                .any(|c| matches!(c, PlatformCall::ListBannedUsers(_) | PlatformCall::UnbanUser(_)))
        );
        assert_eq!(h.ledger.author_strikes("alice").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_unban_only_matches_exact_username() {
        let h = harness_with(MockPlatform::new().with_banned("alice_2"));
        seed(&h, "alice", 3).await;

        h.ledger.remove_strike(&alice_post()).await.unwrap();
        assert!(h.platform.unbans().is_empty());
        assert!(h.platform.is_banned("alice_2"));
        assert_eq!(h.ledger.author_strikes("alice").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_clear_strikes_resets_count() {
        let h = harness_with(MockPlatform::new().with_banned("alice"));
        seed(&h, "alice", 5).await;

        let outcome = h
            .ledger
            .clear_strikes(&ModerationContext::from(comment("xyz", "alice")))
            .await
            .unwrap();
        assert_eq!(outcome, ActionOutcome::ok("Cleared 5 strikes from u/alice!"));
        assert_eq!(h.ledger.author_strikes("alice").await.unwrap(), 0);
        assert!(!h.platform.is_banned("alice"));

        let messages = h.platform.messages();
        assert_eq!(messages[0].subject, "Strike reset from u/alice!");
        assert!(messages[0].text.contains("free to post in r/test"));
    }

    #[tokio::test]
    async fn test_clear_single_strike_uses_singular() {
        let h = harness();
        seed(&h, "alice", 1).await;
        let outcome = h.ledger.clear_strikes(&alice_post()).await.unwrap();
        assert_eq!(outcome.message, "Cleared 1 strike from u/alice!");
        assert!(h.platform.unbans().is_empty());
    }

    #[tokio::test]
    async fn test_clear_strikes_without_strikes_fails() {
        let h = harness();
        let outcome = h.ledger.clear_strikes(&alice_post()).await.unwrap();
        assert!(!outcome.success);
        assert!(h.platform.messages().is_empty());
    }

    #[tokio::test]
    async fn test_missing_author_fails() {
        let h = harness();
        let ctx = ModerationContext {
            kind: ContentKind::Post,
            content_id: Some("t3_abc".to_string()),
            author: None,
            permalink: Some("/r/test/abc".to_string()),
        };
        assert!(!h.ledger.remove_strike(&ctx).await.unwrap().success);
        assert!(!h.ledger.clear_strikes(&ctx).await.unwrap().success);
        assert!(!h.ledger.check_strikes(&ctx).await.unwrap().success);
        assert!(h.platform.calls().is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_count_is_an_error() {
        let h = harness();
        h.store
            .put(&strikes_key("alice"), json!("lots"))
            .await
            .unwrap();
        assert!(h.ledger.check_strikes(&alice_post()).await.is_err());
    }
}

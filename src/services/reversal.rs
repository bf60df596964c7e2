use crate::Error;
use crate::services::context::ModerationContext;
use crate::services::outcome::ActionOutcome;
use crate::services::platform::{ModerationPlatform, PrivateMessage};
use crate::services::templates::{MessageTemplate, TemplateVars};
use std::sync::Arc;
use tracing::{info, warn};

/// Undoes removals made by mistake.
pub struct ModerationReversal {
    platform: Arc<dyn ModerationPlatform>,
}

impl ModerationReversal {
    pub fn new(platform: Arc<dyn ModerationPlatform>) -> Self {
        Self { platform }
    }

    /// Re-approves the content and sends its author an apology that
    /// includes the moderator's note.
    pub async fn undo_removal(
        &self,
        ctx: &ModerationContext,
        reason: Option<&str>,
    ) -> Result<ActionOutcome, Error> {
        let subreddit = self.platform.current_subreddit().await?;

        let (Some(id), Some(author)) = (ctx.content_id.as_deref(), ctx.author.as_deref()) else {
            return Ok(ActionOutcome::fail("Metadata is missing!"));
        };
        if subreddit.name.trim().is_empty() {
            return Ok(ActionOutcome::fail("Metadata is missing!"));
        }

        if let Err(e) = self.platform.approve_content(id).await {
            warn!("Failed to approve {} for u/{}: {:?}", id, author, e);
        }

        let text = MessageTemplate::RemovalReverted.render(&TemplateVars {
            name: author,
            subreddit: &subreddit.name,
            reason,
            strikes: None,
            content_type: Some(ctx.kind.label()),
        });

        self.platform
            .send_private_message(&PrivateMessage {
                from_subreddit: subreddit.name.clone(),
                to: author.to_string(),
                subject: format!("Your post/comment was approved on {}", subreddit.name),
                text,
            })
            .await?;

        info!("Reverted removal of {} by u/{} in r/{}", id, author, subreddit.name);

        Ok(ActionOutcome::ok(format!(
            "Approved {} by u/{}!",
            ctx.kind, author
        )))
    }
}

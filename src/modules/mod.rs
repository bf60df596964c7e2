pub mod mod_actions;
pub mod strikes;

use crate::services::context::{ContentKind, ModerationContext, TargetContent};
use crate::services::outcome::ActionOutcome;
use crate::{Data, Error};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    RemoveAndStrike,
    CheckStrikes,
    RemoveStrike,
    ClearStrikes,
    UndoRemoval,
}

/// A moderator action as offered on one kind of content.
#[derive(Debug, Clone)]
pub struct ActionDefinition {
    pub kind: ActionKind,
    pub name: &'static str,
    pub description: &'static str,
    pub context: ContentKind,
    pub moderator_only: bool,
    /// Label of the free-text reason field, if the action asks for one.
    pub reason_prompt: Option<&'static str>,
}

impl ActionDefinition {
    /// The same moderator-only action registered for posts and comments.
    pub fn on_posts_and_comments(
        kind: ActionKind,
        name: &'static str,
        description: &'static str,
        reason_prompt: Option<&'static str>,
    ) -> Vec<Self> {
        [ContentKind::Post, ContentKind::Comment]
            .into_iter()
            .map(|context| ActionDefinition {
                kind,
                name,
                description,
                context,
                moderator_only: true,
                reason_prompt,
            })
            .collect()
    }
}

pub struct Module {
    pub id: &'static str,
    pub actions: Vec<ActionDefinition>,
}

pub fn get_modules() -> Vec<Module> {
    vec![strikes::module(), mod_actions::module()]
}

pub fn definitions() -> Vec<ActionDefinition> {
    get_modules()
        .into_iter()
        .flat_map(|module| module.actions)
        .collect()
}

/// Runs `kind` against `target` on behalf of the authenticated account.
pub async fn dispatch(
    data: &Data,
    kind: ActionKind,
    target: &TargetContent,
    reason: Option<&str>,
) -> Result<ActionOutcome, Error> {
    let context = target.kind();
    let Some(definition) = data
        .action_definitions
        .iter()
        .find(|d| d.kind == kind && d.context == context)
    else {
        return Ok(ActionOutcome::fail(format!(
            "{kind:?} is not available on a {context}"
        )));
    };

    if definition.moderator_only {
        let subreddit = data.platform.current_subreddit().await?;
        let invoker = data.platform.current_user().await?;
        if !data
            .platform
            .is_moderator(&subreddit.name, &invoker.username)
            .await?
        {
            warn!(
                "u/{} tried to run '{}' without moderating r/{}",
                invoker.username, definition.name, subreddit.name
            );
            return Ok(ActionOutcome::fail(format!(
                "u/{} is not a moderator of r/{}",
                invoker.username, subreddit.name
            )));
        }
    }

    let reason = definition.reason_prompt.and(reason);
    let ctx = ModerationContext::from(target);

    info!(
        "Running '{}' on {} {}",
        definition.name,
        context,
        ctx.content_id.as_deref().unwrap_or("<unknown>")
    );

    match kind {
        ActionKind::RemoveAndStrike
        | ActionKind::CheckStrikes
        | ActionKind::RemoveStrike
        | ActionKind::ClearStrikes => strikes::handle(data, kind, &ctx, reason).await,
        ActionKind::UndoRemoval => mod_actions::handle(data, kind, &ctx, reason).await,
    }
}

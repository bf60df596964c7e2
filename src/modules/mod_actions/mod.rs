use crate::modules::{ActionDefinition, ActionKind, Module};
use crate::services::context::ModerationContext;
use crate::services::outcome::ActionOutcome;
use crate::{Data, Error};

pub fn module() -> Module {
    Module {
        id: "mod_actions",
        actions: ActionDefinition::on_posts_and_comments(
            ActionKind::UndoRemoval,
            "Undo Removal",
            "Undo the removal of this post/comment",
            Some("Reason for undoing removal"),
        ),
    }
}

pub async fn handle(
    data: &Data,
    kind: ActionKind,
    ctx: &ModerationContext,
    reason: Option<&str>,
) -> Result<ActionOutcome, Error> {
    match kind {
        ActionKind::UndoRemoval => data.reversal.undo_removal(ctx, reason).await,
        other => anyhow::bail!("{other:?} is not a moderator action"),
    }
}

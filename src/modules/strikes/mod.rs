use crate::modules::{ActionDefinition, ActionKind, Module};
use crate::services::context::ModerationContext;
use crate::services::outcome::ActionOutcome;
use crate::{Data, Error};

pub fn module() -> Module {
    let mut actions = ActionDefinition::on_posts_and_comments(
        ActionKind::RemoveAndStrike,
        "Remove and Strike",
        "Remove this and add a strike to the author",
        Some("Reason for strike"),
    );
    actions.extend(ActionDefinition::on_posts_and_comments(
        ActionKind::CheckStrikes,
        "Check User's Strikes",
        "Tells you how many strikes the author has",
        None,
    ));
    actions.extend(ActionDefinition::on_posts_and_comments(
        ActionKind::RemoveStrike,
        "Remove Strike from Author",
        "Remove a strike from the author of this content",
        None,
    ));
    actions.extend(ActionDefinition::on_posts_and_comments(
        ActionKind::ClearStrikes,
        "Remove All Strikes from Author",
        "Reset the author's strike count to zero",
        None,
    ));

    Module {
        id: "strikes",
        actions,
    }
}

pub async fn handle(
    data: &Data,
    kind: ActionKind,
    ctx: &ModerationContext,
    reason: Option<&str>,
) -> Result<ActionOutcome, Error> {
    match kind {
        ActionKind::RemoveAndStrike => data.strikes.strike(ctx, reason).await,
        ActionKind::CheckStrikes => data.strikes.check_strikes(ctx).await,
        ActionKind::RemoveStrike => data.strikes.remove_strike(ctx).await,
        ActionKind::ClearStrikes => data.strikes.clear_strikes(ctx).await,
        other => anyhow::bail!("{other:?} is not a strikes action"),
    }
}

use crate::cli::actions::{Action, server};
use anyhow::Result;

/// Map each `Action` variant to the module that carries it out.
///
/// # Errors
///
/// Propagates whatever the selected action returns.
pub async fn execute(action: Action) -> Result<()> {
    match action {
        Action::Server(args) => server::execute(args).await,
    }
}

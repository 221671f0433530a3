pub mod server;

mod run;

/// A fully resolved unit of work selected on the command line.
#[derive(Debug)]
pub enum Action {
    Server(server::Args),
}

impl Action {
    /// Run the action to completion.
    ///
    /// # Errors
    ///
    /// Propagates whatever the underlying action returns.
    pub async fn execute(self) -> anyhow::Result<()> {
        run::execute(self).await
    }
}

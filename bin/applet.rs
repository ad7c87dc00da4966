use anyhow::Error as Anyhow;
use clap::Subcommand;
use derive_more::From;

mod host;

#[derive(Debug, From, Subcommand)]
pub enum Applet {
    Host(host::Host),
}

impl Default for Applet {
    fn default() -> Self {
        host::Host::default().into()
    }
}

impl Applet {
    pub async fn execute(self) -> Result<(), Anyhow> {
        match self {
            Applet::Host(a) => Ok(a.execute().await?),
        }
    }
}

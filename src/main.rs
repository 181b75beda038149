mod action;
mod app;
mod cli;
mod components;
mod config;
mod dav;
mod entry;
mod errors;
mod logging;
mod store;
mod terminal;

use clap::Parser;
use color_eyre::Result;

use crate::{app::App, cli::Cli};

#[tokio::main]
async fn main() -> Result<()> {
    crate::errors::init()?;
    crate::logging::init()?;

    let cli = Cli::parse();
    let config = crate::config::Config::new()?;
    let mut app = App::new(cli, config)?;
    app.run().await
}

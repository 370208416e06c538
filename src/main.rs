use anyhow::Context;
use clap::Parser;
use dotenv::dotenv;
use tracing::info;
use crate::config::Config;

pub mod config;
pub mod controller;
pub mod helpers;
pub mod models;
pub mod repositories;

#[cfg(test)]
mod test_support;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt::init();

    let config = Config::try_parse().context("Invalid configuration")?;
    info!("Starting booking edge in {} environment", config.environment);
    config.warn_missing_secrets();

    controller::serve(config).await
}

use std::path::PathBuf;

use autoshort_api::{client::quote::InstrumentClass, types::InstrumentCode};
use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Optional path to credentials JSON file, fields it lacks are read from the environment
    #[arg(short, long, value_name = "FILE", global = true)]
    pub credentials: Option<PathBuf>,

    /// Session cache file (defaults to `sessions.json` in the platform data directory)
    #[arg(long, value_name = "FILE", global = true)]
    pub sessions: Option<PathBuf>,

    /// Neither reuse nor record sessions
    #[arg(long, global = true, conflicts_with = "sessions")]
    pub no_session_cache: bool,

    /// Log login and request progress
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Get the quote and order book of an instrument
    Quote(QuoteArgs),

    /// Log the messages of the market data websocket
    Listen(ListenArgs),
}

#[derive(Args)]
pub struct QuoteArgs {
    /// Instrument code (e.g: "YPFD")
    #[arg(value_name = "CODE")]
    pub code: InstrumentCode,

    /// Instrument class, which decides the lookup path
    #[arg(long, value_enum, default_value = "default")]
    pub class: InstrumentClass,

    /// Seconds to wait for the login before giving up
    #[arg(long, value_name = "SECS", default_value_t = 30, value_parser = clap::value_parser!(u64).range(1..))]
    pub login_timeout: u64,

    /// Print the whole quote as JSON instead of the order book
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct ListenArgs {
    /// Websocket endpoint, overrides the `WEBSOCKET` setting
    #[arg(long, value_name = "URL")]
    pub endpoint: Option<String>,
}

//! CLI argument definitions

use clap::Parser;
use std::net::IpAddr;
use std::path::PathBuf;

#[derive(Parser, Debug, Default)]
#[command(name = "relayd")]
#[command(about = "Relay prompts and chat turns to a generative text provider")]
#[command(version)]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Address to bind
    #[arg(long)]
    pub host: Option<IpAddr>,

    /// Port to listen on
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Provider model identifier
    #[arg(short, long)]
    pub model: Option<String>,

    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

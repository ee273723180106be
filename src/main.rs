mod app;
mod renderer;

use anyhow::Result;
use app::App;
use clap::Parser;
use doggo_experiment::GameConfig;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "doggo-nogo")]
#[command(about = "Doggo/Nogo reaction-time game", long_about = None)]
struct Cli {
    /// Game configuration JSON (defaults apply when omitted)
    config: Option<PathBuf>,

    /// Where the level results are written
    #[arg(long, default_value = "doggo_results.json")]
    results: PathBuf,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => GameConfig::load(path)?,
        None => GameConfig::default(),
    };

    App::new(config, cli.results).run()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_is_positional_and_results_has_a_default() {
        let cli = Cli::try_parse_from(["doggo-nogo", "level.json"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("level.json")));
        assert_eq!(cli.results, PathBuf::from("doggo_results.json"));

        let cli = Cli::try_parse_from(["doggo-nogo", "--results", "out.json"]).unwrap();
        assert!(cli.config.is_none());
        assert_eq!(cli.results, PathBuf::from("out.json"));
    }
}

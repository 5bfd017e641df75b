mod cli;
mod config_file;

use env_logger::Env;

fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let default_level = match cli::verbosity_level(&args) {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(Env::default().default_filter_or(default_level)).init();
    cli::run()
}

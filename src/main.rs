use clap::Parser as _;
use inels_tools::commands;
use tracing_subscriber::{layer::SubscriberExt as _, util::SubscriberInitExt as _};

#[derive(clap::Parser)]
#[clap(version, about, author)]
enum Commands {
    Decode(commands::decode::Args),
    Faults(commands::faults::Args),
    Entities(commands::entities::Args),
    Command(commands::command::Args),
}

fn end<E: std::error::Error>(r: Result<(), E>) {
    std::process::exit(match r {
        Ok(_) => 0,
        Err(e) => {
            eprintln!("error: {e}");
            let mut cause = e.source();
            while let Some(e) = cause {
                eprintln!("  because: {e}");
                cause = e.source();
            }
            1
        }
    });
}

fn main() {
    use tracing_subscriber::filter::{LevelFilter, Targets};
    let filter = std::env::var("INELS_TOOLS_LOG")
        .ok()
        .and_then(|description| description.parse::<Targets>().ok())
        .unwrap_or_else(|| Targets::new().with_default(LevelFilter::WARN));
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
    match Commands::parse() {
        Commands::Decode(args) => end(commands::decode::run(args)),
        Commands::Faults(args) => end(commands::faults::run(args)),
        Commands::Entities(args) => end(commands::entities::run(args)),
        Commands::Command(args) => end(commands::command::run(args)),
    }
}

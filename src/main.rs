mod cli;
mod config;
mod ensure;
mod error;
mod logging;
mod owner;
mod runner;
mod spec;

fn main() -> anyhow::Result<()> {
    let app = cli::parse();
    logging::init(app.verbose);
    runner::run(app)
}

use clap::Parser;
use env_logger::Env;
use log::{error, info, LevelFilter};

mod args;
mod dashboard;

fn main() {
    let args = args::Args::parse();

    let mut builder = env_logger::Builder::from_env(Env::default().default_filter_or("info"));
    if args.verbose {
        builder.filter_level(LevelFilter::Debug);
    }
    builder.init();

    info!("electotrends {}", env!("CARGO_PKG_VERSION"));

    if let Err(e) = dashboard::run(&args) {
        error!("{:?}", e);
        eprintln!("An error occured: {}", e);
        std::process::exit(1);
    }
}

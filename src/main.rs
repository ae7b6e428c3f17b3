use log::{error, Level, LevelFilter};
use playlist_scrape::{Config, Error};
use std::io::Write;
use std::{env, process};

fn init_logger(verbose: bool) {
    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    env_logger::Builder::new()
        .target(env_logger::Target::Stdout)
        .filter_level(LevelFilter::Info)
        .filter_module("playlist_scrape", level)
        .parse_default_env()
        .format(|buf, record| match record.level() {
            Level::Info => writeln!(buf, "{}", record.args()),
            level => writeln!(buf, "[{}] {}", level, record.args()),
        })
        .init();
}

fn main() {
    let config = Config::build(env::args()).unwrap_or_else(|e| match e {
        Error::Cli(e) => e.exit(), // prints help/version or usage
        e => {
            eprintln!("Problem parsing arguments: {}", e);
            process::exit(1);
        }
    });

    init_logger(config.verbose);

    if let Err(e) = playlist_scrape::run(config) {
        error!("{}", e);
        process::exit(1);
    }
}

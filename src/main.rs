mod geodesy;
mod map;
mod poller;
mod telemetry;
mod transport;
mod web;

use clap::{Parser, Subcommand};
use std::process::ExitCode;
use std::time::Instant;

use crate::map::{MapRenderer, ReqwestMapService, StaticMapBuilder};
use crate::poller::{spawn as spawn_poller, CsvFrameLog, Poller, PollerCommand};
use crate::telemetry::{parse_beacon_response, parse_station_response, BeaconResponse};
use crate::transport::{Session, TcpChannel};
use crate::web::Config;

#[derive(Parser)]
#[command(name = "beacon-base")]
#[command(about = "Satellite beacon base station: telemetry polling and map tracking")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Poll the base and serve telemetry over HTTP
    Run {
        #[arg(short, long)]
        config: String,
    },
    /// Validate a configuration file
    Validate { config: String },
    /// Decode one base response, e.g. "20180115120000,51.5,-0.1,10,0,0,1.0,7\r\n"
    Decode {
        /// Treat the response as a station fix instead of beacon data
        #[arg(long)]
        station: bool,
        response: String,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run { config } => run(&config),
        Commands::Validate { config } => validate(&config),
        Commands::Decode { station, response } => decode(&response, station),
    }
}

fn load_config(path: &str) -> Option<Config> {
    let config = match Config::from_file(path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error reading config: {}", e);
            return None;
        }
    };
    if let Err(e) = config.validate() {
        eprintln!("{}", e);
        return None;
    }
    Some(config)
}

fn validate(path: &str) -> ExitCode {
    let Some(config) = load_config(path) else {
        return ExitCode::FAILURE;
    };

    println!("Config is valid");
    println!("  base:     {}", config.base.address);
    println!(
        "  poll:     every {}, gnss timeout {}, beacon timeout {}",
        humantime::format_duration(config.poll.interval),
        humantime::format_duration(config.poll.gnss_timeout),
        humantime::format_duration(config.poll.beacon_timeout)
    );
    println!(
        "  map:      {}x{} {} ({} px radius)",
        config.map.width, config.map.height, config.map.maptype, config.map.pixel_radius
    );
    println!("  log dir:  {}", config.frame_log.folder.display());
    println!("  web:      {} ({} API keys)", config.web.bind, config.api_keys.len());
    ExitCode::SUCCESS
}

fn init_logging(level: &str) {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn run(path: &str) -> ExitCode {
    let Some(config) = load_config(path) else {
        return ExitCode::FAILURE;
    };
    init_logging(&config.logging.level);

    let params = match config.static_map_params() {
        Ok(p) => p,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let channel = match TcpChannel::connect(&config.base.address, config.base.read_timeout) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Cannot reach base at {}: {}", config.base.address, e);
            return ExitCode::FAILURE;
        }
    };

    let renderer = match ReqwestMapService::with_timeout(config.map.fetch_timeout).and_then(
        |service| MapRenderer::with_placeholder_file(service, config.map.placeholder.as_deref()),
    ) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Map setup failed: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let poller = Poller::new(
        Session::new(channel),
        CsvFrameLog::new(config.frame_log.folder.clone()),
        config.poll_settings(),
        StaticMapBuilder::new(params),
        Instant::now(),
    );
    let (handle, worker) = match spawn_poller(poller, renderer, config.poll.tick) {
        Ok(spawned) => spawned,
        Err(e) => {
            eprintln!("Failed to start poller: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to start runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let result = runtime.block_on(web::run_server(config, handle.clone()));

    let _ = handle.send(PollerCommand::Stop);
    let _ = worker.join();

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Server error: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Turns a shell-escaped `\r\n` into the real terminator and adds one if missing.
fn unescape_response(response: &str) -> String {
    let mut raw = response.replace("\\r", "\r").replace("\\n", "\n");
    if !raw.ends_with("\r\n") {
        raw = raw.trim_end_matches(['\r', '\n']).to_string();
        raw.push_str("\r\n");
    }
    raw
}

fn decode(response: &str, station: bool) -> ExitCode {
    let raw = unescape_response(response);

    let decoded = if station {
        parse_station_response(&raw).map(|fix| serde_json::to_string_pretty(&fix))
    } else {
        parse_beacon_response(&raw).map(|response| match response {
            BeaconResponse::Frame(frame) => serde_json::to_string_pretty(&frame),
            BeaconResponse::QueueDepth(depth) => {
                serde_json::to_string_pretty(&serde_json::json!({ "queue_depth": depth }))
            }
        })
    };

    match decoded {
        Ok(Ok(json)) => {
            println!("{}", json);
            ExitCode::SUCCESS
        }
        Ok(Err(e)) => {
            eprintln!("Failed to format result: {}", e);
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("Rejected: {}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unescape_response() {
        assert_eq!(unescape_response("12\\r\\n"), "12\r\n");
        assert_eq!(unescape_response("12"), "12\r\n");
        assert_eq!(unescape_response("12\n"), "12\r\n");
        assert_eq!(unescape_response("12\r\n"), "12\r\n");
    }

    #[test]
    fn test_cli_parses_subcommands() {
        let cli = Cli::try_parse_from(["beacon-base", "run", "--config", "base.yaml"]).unwrap();
        assert!(matches!(cli.command, Commands::Run { ref config } if config == "base.yaml"));

        let cli = Cli::try_parse_from(["beacon-base", "decode", "--station", "x"]).unwrap();
        assert!(matches!(cli.command, Commands::Decode { station: true, .. }));
    }
}

//! Drive a matrix amp from the command line.
//!
//! ```text
//! cargo run --example control -- 192.168.1.50 on 1 3
//! cargo run --example control -- 192.168.1.50 volume 1 0.4
//! cargo run --example control -- config.json off 1
//! ```

use c4_matrix_amp::{AmpConfig, MatrixAmp};
use tracing_subscriber::EnvFilter;

fn usage() -> ! {
    eprintln!("usage: control <host|config.json> <on ZONE INPUT | off ZONE | volume ZONE LEVEL | all-off>");
    std::process::exit(2);
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("c4_matrix_amp=debug")),
        )
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.len() < 2 {
        usage();
    }

    let config = if args[0].ends_with(".json") {
        AmpConfig::load(&args[0])?
    } else {
        AmpConfig::new(args[0].clone())
    };
    let amp = MatrixAmp::connect(config).await?;

    let state = match (args[1].as_str(), &args[2..]) {
        ("on", [zone, input]) => amp.turn_on(zone.parse()?, input.parse()?).await?,
        ("off", [zone]) => amp.turn_off(zone.parse()?).await?,
        ("volume", [zone, level]) => amp.set_volume(zone.parse()?, level.parse()?).await?,
        ("all-off", []) => {
            for (zone, err) in amp.turn_off_all().await {
                eprintln!("zone {}: {}", zone, err);
            }
            for state in amp.states() {
                println!("{}", serde_json::to_string(&state)?);
            }
            return Ok(());
        }
        _ => usage(),
    };

    println!("{}", serde_json::to_string_pretty(&state)?);
    Ok(())
}

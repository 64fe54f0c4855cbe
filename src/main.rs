use convcap::config;
use convcap::conversation::Conversation;
use convcap::export;
use convcap::structs::SimulationParams;
mod cmd;

use std::fs;
use std::path::Path;

use clap::Parser;
use rand_core::SeedableRng;
use rand_pcg::Pcg32;

/// The entry point of the application.
///
/// Load the conversation description, simulate every message and write the capture.
fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = cmd::Args::parse();

    let params = match &args.profile {
        Some(profile) => config::import_params(&fs::read_to_string(profile)?)?,
        None => SimulationParams::default(),
    };
    let description = config::import_conversation(
        &fs::read_to_string(&args.description)?,
        params.default_window,
    )?;

    let seed = match args.seed {
        Some(s) => {
            log::info!("Generating with seed {s}");
            s
        }
        None => config::now_ms(),
    };
    let mut conversation = Conversation::new(
        description.entities,
        description.start_ms,
        &params,
        Pcg32::seed_from_u64(seed),
    );
    conversation.simulate_all(&description.messages)?;

    let mut capture = conversation.into_capture();
    capture.link_type = args.link_type.value();
    let size = export::write_capture(&capture, Path::new(&args.outfile))?;
    log::info!(
        "{} frames ({size} bytes) written to {}",
        capture.records.len(),
        args.outfile
    );
    Ok(())
}

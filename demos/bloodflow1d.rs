//! Pulsatile flow through a straight artery segment driven by a measured inlet flow rate.
//!
//! Usage: `cargo run --release --example bloodflow1d [WAVEFORM_CSV] [OUTPUT_DIR]`
//!
//! Writes one VTK file per time step together with a ParaView collection, and the flow rate at
//! the sample positions over time as JSON.
use bloodflow::io::trajectory::VtkTrajectoryWriter;
use bloodflow::simulation::{Simulation, SimulationSettings};
use bloodflow::vessel::VesselParameters;
use bloodflow::waveform::InletWaveform;
use eyre::WrapErr;
use log::info;
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;

fn main() -> eyre::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut args = std::env::args().skip(1);
    let waveform_path = args
        .next()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("demos/data/example_inlet.csv"));
    let output_dir = args
        .next()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("data/bloodflow1d"));

    let waveform = InletWaveform::from_csv_path(&waveform_path)?;
    info!(
        "Loaded {} inlet samples from {} covering [{}, {}]",
        waveform.len(),
        waveform_path.display(),
        waveform.start_time(),
        waveform.end_time()
    );

    let parameters = VesselParameters::default();
    let settings = SimulationSettings::default();
    let mut simulation = Simulation::<f64>::new(&parameters, settings, &waveform)?;

    let mut writer = VtkTrajectoryWriter::new(&output_dir, "bloodflow", simulation.mesh().clone())?;
    simulation.run(&mut writer)?;

    let history_path = output_dir.join("flow_history.json");
    let file = File::create(&history_path)
        .wrap_err_with(|| format!("failed to create {}", history_path.display()))?;
    serde_json::to_writer_pretty(BufWriter::new(file), simulation.flow_history())
        .wrap_err("failed to write flow history")?;
    info!("Wrote flow history to {}", history_path.display());

    Ok(())
}

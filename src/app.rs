//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments
//! - runs the dispersion pipeline
//! - prints reports/plots
//! - writes exports and alert figures

use std::fs;
use std::path::PathBuf;

use clap::Parser;
use log::warn;

use crate::cli::{
    Cli, Command, CurvesArgs, DeconvolveArgs, DownsampleArgs, PazArgs, PlotArgs, SampleArgs,
    StationsArgs,
};
use crate::domain::{PolesZeros, RunConfig};
use crate::error::{AppError, EMPTY, INPUT};

pub mod pipeline;

/// Entry point for the `disp` binary.
pub fn run() -> Result<(), AppError> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match cli.command {
        Command::Curves(args) => handle_curves(args),
        Command::Paz(args) => handle_paz(args),
        Command::Downsample(args) => handle_downsample(args),
        Command::Deconvolve(args) => handle_deconvolve(args),
        Command::Stations(args) => handle_stations(args),
        Command::Sample(args) => handle_sample(args),
        Command::Plot(args) => handle_plot(args),
    }
}

fn handle_curves(args: CurvesArgs) -> Result<(), AppError> {
    let config = run_config_from_args(&args);
    let run = pipeline::run_curves(&config)?;

    println!(
        "{}",
        crate::report::format_run_summary(&config, &run.qc, &run.grid, &run.table)
    );

    // Side-channel alert figures for curves with frequency decreases.
    if let Some(dir) = &config.alerts_dir {
        if !run.grid.alerts.is_empty() {
            fs::create_dir_all(dir).map_err(|e| AppError::io("create directory", dir, e))?;
            for alert in &run.grid.alerts {
                let path = dir.join(format!("{}.txt", alert.name));
                let plot = crate::plot::render_alert_plot(alert, 100, 25);
                fs::write(&path, plot).map_err(|e| AppError::io("write alert figure", &path, e))?;
            }
            println!("{}", crate::report::format_alert_notice(run.grid.alerts.len(), dir));
        }
    }

    let output_periods = config
        .output_periods
        .clone()
        .unwrap_or_else(|| run.periods.clone());

    if let Some(outdir) = &config.raytomo_out {
        let files = crate::curves::render_raytomo(&run.table, &run.pairs, &output_periods)?;
        crate::curves::write_rendered(outdir, &files)?;
        println!("Wrote straight-ray deck to {}", outdir.display());
    }
    if let Some(outdir) = &config.matrix_out {
        let files = crate::curves::render_matrix(&run.grid.curves, &run.pairs, &output_periods)?;
        crate::curves::write_rendered(outdir, &files)?;
        println!("Wrote MCMC deck to {}", outdir.display());
    }
    if let Some(path) = &config.export_curves {
        crate::io::curveset::write_curveset_json(path, &run.grid.curves, &run.periods)?;
        println!("Wrote curve set to {}", path.display());
    }

    Ok(())
}

fn handle_paz(args: PazArgs) -> Result<(), AppError> {
    let (label, paz) = load_paz_from_args(
        args.file.as_deref(),
        args.stationxml.as_deref(),
        &args.network,
        &args.station,
        args.location.as_deref(),
        &args.channel,
    )?;
    println!("{}", crate::report::format_paz_summary(&label, &paz));
    Ok(())
}

fn handle_downsample(args: DownsampleArgs) -> Result<(), AppError> {
    let mut traces = crate::io::mseed::read_mseed_file(&args.input)?;
    if traces.is_empty() {
        return Err(AppError::new(EMPTY, "Input file contains no traces."));
    }
    for tr in &mut traces {
        crate::dsp::downsample(tr, args.rate)?;
    }
    crate::io::mseed::write_mseed_file(&args.output, &traces)?;
    println!(
        "Downsampled {} trace(s) to {} Hz -> {}",
        traces.len(),
        args.rate,
        args.output.display()
    );
    Ok(())
}

fn handle_deconvolve(args: DeconvolveArgs) -> Result<(), AppError> {
    let mut traces = crate::io::mseed::read_mseed_file(&args.input)?;
    if traces.is_empty() {
        return Err(AppError::new(EMPTY, "Input file contains no traces."));
    }

    let shared_paz = match &args.paz {
        Some(path) => Some(crate::io::sacpz::read_sacpz_file(path)?),
        None => None,
    };
    if shared_paz.is_none() && args.stationxml.is_none() {
        return Err(AppError::new(
            INPUT,
            "Provide --paz or --stationxml for the response to remove.",
        ));
    }

    for tr in &mut traces {
        let paz = match &shared_paz {
            Some(p) => p.clone(),
            None => {
                let xml = args
                    .stationxml
                    .as_ref()
                    .expect("checked above: one of --paz/--stationxml is present");
                crate::io::stationxml::read_stationxml_paz(
                    xml,
                    &tr.network,
                    &tr.station,
                    Some(&tr.location),
                    &tr.channel,
                )?
            }
        };
        crate::dsp::remove_response(tr, &paz, args.water_level, args.taper)?;
    }

    crate::io::mseed::write_mseed_file(&args.output, &traces)?;
    println!(
        "Deconvolved {} trace(s) -> {}",
        traces.len(),
        args.output.display()
    );
    Ok(())
}

fn handle_stations(args: StationsArgs) -> Result<(), AppError> {
    let client = crate::data::FdsnClient::from_env()?;
    let stations = client.fetch_stations(&args.network, &args.station, &args.channel)?;
    if stations.len() < 2 {
        return Err(AppError::new(
            EMPTY,
            format!("Only {} station(s) matched; need at least 2 for pairs.", stations.len()),
        ));
    }
    let pairs = crate::data::pairs_from_stations(&stations, &args.channel);
    crate::io::pairs::write_pair_table_csv(&args.out, &pairs)?;
    println!(
        "Fetched {} stations, wrote {} pairs to {}",
        stations.len(),
        pairs.len(),
        args.out.display()
    );
    Ok(())
}

fn handle_sample(args: SampleArgs) -> Result<(), AppError> {
    let config = crate::data::SynthConfig {
        n_stations: args.stations,
        seed: args.seed,
        ..crate::data::SynthConfig::default()
    };
    let dataset = crate::data::generate_dataset(&config)?;
    crate::data::write_dataset(&dataset, &args.out)?;
    println!(
        "Wrote {} pairs and {} pick files under {}",
        dataset.pairs.len(),
        dataset.curves.len(),
        args.out.display()
    );
    Ok(())
}

fn handle_plot(args: PlotArgs) -> Result<(), AppError> {
    let set = crate::io::curveset::read_curveset_json(&args.curves)?;
    if set.curves.is_empty() {
        return Err(AppError::new(EMPTY, "Curve set contains no curves."));
    }
    let curve = match &args.name {
        Some(name) => set
            .curves
            .iter()
            .find(|c| &c.name == name)
            .ok_or_else(|| AppError::new(INPUT, format!("No curve named '{name}' in the set.")))?,
        None => &set.curves[0],
    };
    println!("{}", crate::plot::render_curve_plot(curve, args.width, args.height));
    Ok(())
}

fn load_paz_from_args(
    file: Option<&std::path::Path>,
    stationxml: Option<&std::path::Path>,
    network: &str,
    station: &str,
    location: Option<&str>,
    channel: &str,
) -> Result<(String, PolesZeros), AppError> {
    if let Some(path) = file {
        let paz = crate::io::sacpz::read_sacpz_file(path)?;
        return Ok((path.display().to_string(), paz));
    }
    if let Some(path) = stationxml {
        if network.is_empty() || station.is_empty() || channel.is_empty() {
            return Err(AppError::new(
                INPUT,
                "--stationxml requires --network, --station and --channel.",
            ));
        }
        let paz = crate::io::stationxml::read_stationxml_paz(path, network, station, location, channel)?;
        let label = format!("{network}.{station}.{channel} ({})", path.display());
        return Ok((label, paz));
    }
    Err(AppError::new(INPUT, "Provide --file or --stationxml."))
}

pub fn run_config_from_args(args: &CurvesArgs) -> RunConfig {
    if args.min_freq_table.is_none() && args.min_freq_default <= 0.0 {
        warn!("no minimum-frequency table or default set; the sensor mask is inactive");
    }
    RunConfig {
        picks_dir: args.picks.clone(),
        format: args.format,
        period_select: args.period_select,
        pairs_path: args.pairs.clone(),
        min_freq_path: args.min_freq_table.clone(),
        min_freq_default: args.min_freq_default,
        qc: crate::domain::QcConfig {
            no_lambda: args.no_lambda,
            min_travel_time: args.min_travel_time,
        },
        alerts_dir: (!args.no_alerts).then(|| PathBuf::from(&args.alerts_dir)),
        raytomo_out: args.raytomo_out.clone(),
        matrix_out: args.matrix_out.clone(),
        export_curves: args.export_curves.clone(),
        output_periods: args.output_periods.clone(),
    }
}

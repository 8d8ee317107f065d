//! Command-line parsing for the dispersion toolbox.
//!
//! The goal of this module is to keep **argument parsing** and **command
//! dispatch** separate from the processing/math code.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::domain::{PickFormat, PeriodSelect};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "disp", version, about = "Ambient-noise dispersion curve toolbox")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the pick-to-export pipeline: parse, QC, grid, export.
    Curves(CurvesArgs),
    /// Inspect an instrument response (SAC pole-zero file or StationXML).
    Paz(PazArgs),
    /// Anti-alias filter and downsample miniSEED waveforms.
    Downsample(DownsampleArgs),
    /// Deconvolve the instrument response from miniSEED waveforms.
    Deconvolve(DeconvolveArgs),
    /// Fetch station coordinates from an FDSN service and write a pair table.
    Stations(StationsArgs),
    /// Generate a synthetic demo dataset (pair table + pick files).
    Sample(SampleArgs),
    /// Render a curve from an exported curve-set JSON in the terminal.
    Plot(PlotArgs),
}

/// Options for the dispersion pipeline.
#[derive(Debug, Parser, Clone)]
pub struct CurvesArgs {
    /// Directory of pick files (one file per pair, named by pair).
    #[arg(long)]
    pub picks: PathBuf,

    /// Pick-file format.
    #[arg(long, value_enum, default_value_t = PickFormat::Xdc)]
    pub format: PickFormat,

    /// Which aFTAN period column to use (ignored for xdc).
    #[arg(long, value_enum, default_value_t = PeriodSelect::Centre)]
    pub period_select: PeriodSelect,

    /// Pair metadata CSV.
    #[arg(long)]
    pub pairs: PathBuf,

    /// Per-station minimum-frequency CSV (network,station,min_freq).
    #[arg(long)]
    pub min_freq_table: Option<PathBuf>,

    /// Minimum frequency (Hz) for stations absent from the table.
    #[arg(long, default_value_t = 0.0)]
    pub min_freq_default: f64,

    /// Number of wavelengths for the longest-period limit.
    #[arg(long, default_value_t = 2.0)]
    pub no_lambda: f64,

    /// Minimum pick travel time (s).
    #[arg(long, default_value_t = 0.0)]
    pub min_travel_time: f64,

    /// Directory for non-monotonic-frequency alert figures.
    #[arg(long, default_value = "ALERT_FIGS")]
    pub alerts_dir: PathBuf,

    /// Disable alert figures.
    #[arg(long)]
    pub no_alerts: bool,

    /// Write the straight-ray inversion deck to this directory.
    #[arg(long)]
    pub raytomo_out: Option<PathBuf>,

    /// Write the MCMC inversion deck to this directory.
    #[arg(long)]
    pub matrix_out: Option<PathBuf>,

    /// Export the processed curve set to JSON.
    #[arg(long)]
    pub export_curves: Option<PathBuf>,

    /// Output periods for the exporters (default: full target grid).
    #[arg(long, value_delimiter = ',')]
    pub output_periods: Option<Vec<f64>>,
}

/// Options for inspecting a response.
#[derive(Debug, Parser)]
pub struct PazArgs {
    /// SAC pole-zero file.
    #[arg(long, conflicts_with = "stationxml")]
    pub file: Option<PathBuf>,

    /// StationXML catalog (requires --network/--station/--channel).
    #[arg(long)]
    pub stationxml: Option<PathBuf>,

    #[arg(long, default_value = "")]
    pub network: String,

    #[arg(long, default_value = "")]
    pub station: String,

    #[arg(long)]
    pub location: Option<String>,

    #[arg(long, default_value = "")]
    pub channel: String,
}

/// Options for downsampling waveforms.
#[derive(Debug, Parser)]
pub struct DownsampleArgs {
    /// Input miniSEED file.
    #[arg(long)]
    pub input: PathBuf,

    /// Output miniSEED file (parent directories are created).
    #[arg(long)]
    pub output: PathBuf,

    /// Goal sampling rate (Hz).
    #[arg(long)]
    pub rate: f64,
}

/// Options for response deconvolution.
#[derive(Debug, Parser)]
pub struct DeconvolveArgs {
    /// Input miniSEED file.
    #[arg(long)]
    pub input: PathBuf,

    /// Output miniSEED file (parent directories are created).
    #[arg(long)]
    pub output: PathBuf,

    /// SAC pole-zero file with the response to remove.
    #[arg(long, conflicts_with = "stationxml")]
    pub paz: Option<PathBuf>,

    /// StationXML catalog; the response is looked up per trace.
    #[arg(long)]
    pub stationxml: Option<PathBuf>,

    /// Water level (dB below the response maximum).
    #[arg(long, default_value_t = crate::dsp::DEFAULT_WATER_LEVEL_DB)]
    pub water_level: f64,

    /// Taper fraction applied to each end before the FFT.
    #[arg(long, default_value_t = crate::dsp::DEFAULT_TAPER)]
    pub taper: f64,
}

/// Options for fetching station metadata.
#[derive(Debug, Parser)]
pub struct StationsArgs {
    /// Network code(s), FDSN wildcards allowed.
    #[arg(long)]
    pub network: String,

    /// Station code(s), FDSN wildcards allowed.
    #[arg(long, default_value = "*")]
    pub station: String,

    /// Channel code used in the generated pair names.
    #[arg(long, default_value = "HHZ")]
    pub channel: String,

    /// Output pair-table CSV.
    #[arg(long)]
    pub out: PathBuf,
}

/// Options for synthetic dataset generation.
#[derive(Debug, Parser)]
pub struct SampleArgs {
    /// Output directory (pairs.csv + picks/).
    #[arg(long)]
    pub out: PathBuf,

    /// Number of stations to lay out.
    #[arg(short = 'n', long, default_value_t = 6)]
    pub stations: usize,

    /// Random seed.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,
}

/// Options for plotting a saved curve set.
#[derive(Debug, Parser)]
pub struct PlotArgs {
    /// Curve-set JSON produced by `disp curves --export-curves`.
    #[arg(long, value_name = "JSON")]
    pub curves: PathBuf,

    /// Pair name to plot (default: first curve in the set).
    #[arg(long)]
    pub name: Option<String>,

    /// Plot width (columns).
    #[arg(long, default_value_t = 100)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 25)]
    pub height: usize,
}

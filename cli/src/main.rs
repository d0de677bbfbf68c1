//! Command line front end for the microslice slicer.
//!
//! Takes an STL file and writes a `.gcode` file next to it unless an
//! output path is given. All printer, print and filament settings are
//! exposed as flags; a JSON configuration file can provide the base
//! values, with flags overriding it.

use clap::Parser;
use microslice::config::{FanSpeedOptions, Options};
use microslice::print::Pipeline;
use microslice::{scale, Result};
use std::path::PathBuf;
use std::process::ExitCode;

/// Slice STL models into G-code.
#[derive(Parser)]
#[command(name = "microslice")]
#[command(version, about, long_about = None)]
struct Cli {
    /// STL file to slice.
    input: PathBuf,

    /// Output path; defaults to the input path with `.gcode` appended.
    #[arg(long)]
    output: Option<PathBuf>,

    /// JSON configuration file providing base settings.
    #[arg(long)]
    config: Option<PathBuf>,

    // ---- printer ----
    /// Width of one extruded line in mm.
    #[arg(long)]
    extrusion_width: Option<f64>,

    /// Nozzle bore diameter in mm.
    #[arg(long)]
    nozzle_diameter: Option<f64>,

    // ---- print ----
    /// Layer thickness in mm.
    #[arg(long)]
    layer_thickness: Option<f64>,

    /// First layer thickness in mm.
    #[arg(long)]
    initial_layer_thickness: Option<f64>,

    /// Number of perimeter walls.
    #[arg(long)]
    inset_count: Option<usize>,

    /// Internal infill density in percent.
    #[arg(long)]
    infill_percent: Option<i64>,

    /// Rotation of the infill pattern in degrees.
    #[arg(long)]
    infill_rotation_degree: Option<f64>,

    /// Connect internal infill lines into a zigzag.
    #[arg(long)]
    infill_zigzag: Option<bool>,

    /// Number of solid top layers.
    #[arg(long)]
    top_layers: Option<usize>,

    /// Number of solid bottom layers.
    #[arg(long)]
    bottom_layers: Option<usize>,

    /// Print speed in mm/s.
    #[arg(long)]
    layer_speed: Option<f64>,

    /// First layer print speed in mm/s.
    #[arg(long)]
    initial_layer_speed: Option<f64>,

    /// Travel speed in mm/s.
    #[arg(long)]
    move_speed: Option<f64>,

    /// Number of skirt lines.
    #[arg(long)]
    skirt_count: Option<usize>,

    /// Number of brim lines.
    #[arg(long)]
    brim_count: Option<usize>,

    // ---- support ----
    /// Generate support structures.
    #[arg(long)]
    support: bool,

    /// Overhang angle from the vertical above which support is added.
    #[arg(long)]
    support_threshold_angle: Option<f64>,

    /// Empty layers between support top and model.
    #[arg(long)]
    support_top_gap_layers: Option<usize>,

    /// Dense interface layers on top of each support column.
    #[arg(long)]
    support_interface_layers: Option<usize>,

    /// Spacing of the support pattern in mm.
    #[arg(long)]
    support_pattern_spacing: Option<f64>,

    /// Horizontal clearance between support and model in mm.
    #[arg(long)]
    support_gap: Option<f64>,

    // ---- filament ----
    /// Retraction speed in mm/s.
    #[arg(long)]
    retraction_speed: Option<f64>,

    /// Retraction length in mm.
    #[arg(long)]
    retraction_length: Option<f64>,

    /// Hot end temperature for the first layers.
    #[arg(long)]
    initial_hot_end_temperature: Option<u32>,

    /// Hot end temperature after the first layers.
    #[arg(long)]
    hot_end_temperature: Option<u32>,

    /// Bed temperature for the first layers.
    #[arg(long)]
    initial_bed_temperature: Option<u32>,

    /// Bed temperature after the first layers.
    #[arg(long)]
    bed_temperature: Option<u32>,

    /// Number of layers printed at the initial temperatures.
    #[arg(long)]
    initial_temperature_layer_count: Option<usize>,

    /// Fan speed table, e.g. `0=0,3=255` (layer=PWM).
    #[arg(long)]
    fan_speed: Option<String>,
}

impl Cli {
    /// Merge the configuration file and the flag overrides into options.
    fn to_options(&self) -> Result<Options> {
        let mut options = match &self.config {
            Some(path) => Options::from_file(path)?,
            None => Options::default(),
        };

        let mm = |v: f64| scale(v);

        if let Some(v) = self.extrusion_width {
            options.printer.extrusion_width = mm(v);
        }
        if let Some(v) = self.nozzle_diameter {
            options.printer.nozzle_diameter = mm(v);
        }
        if let Some(v) = self.layer_thickness {
            options.print.layer_thickness = mm(v);
        }
        if let Some(v) = self.initial_layer_thickness {
            options.print.initial_layer_thickness = mm(v);
        }
        if let Some(v) = self.inset_count {
            options.print.inset_count = v;
        }
        if let Some(v) = self.infill_percent {
            options.print.infill_percent = v;
        }
        if let Some(v) = self.infill_rotation_degree {
            options.print.infill_rotation_degree = v;
        }
        if let Some(v) = self.infill_zigzag {
            options.print.infill_zigzag = v;
        }
        if let Some(v) = self.top_layers {
            options.print.top_layers = v;
        }
        if let Some(v) = self.bottom_layers {
            options.print.bottom_layers = v;
        }
        if let Some(v) = self.layer_speed {
            options.print.layer_speed = v;
        }
        if let Some(v) = self.initial_layer_speed {
            options.print.initial_layer_speed = v;
        }
        if let Some(v) = self.move_speed {
            options.print.move_speed = v;
        }
        if let Some(v) = self.skirt_count {
            options.print.skirt_count = v;
        }
        if let Some(v) = self.brim_count {
            options.print.brim_count = v;
        }

        if self.support {
            options.print.support.enabled = true;
        }
        if let Some(v) = self.support_threshold_angle {
            options.print.support.threshold_angle = v;
        }
        if let Some(v) = self.support_top_gap_layers {
            options.print.support.top_gap_layers = v;
        }
        if let Some(v) = self.support_interface_layers {
            options.print.support.interface_layers = v;
        }
        if let Some(v) = self.support_pattern_spacing {
            options.print.support.pattern_spacing = mm(v);
        }
        if let Some(v) = self.support_gap {
            options.print.support.gap = mm(v);
        }

        if let Some(v) = self.retraction_speed {
            options.filament.retraction_speed = v;
        }
        if let Some(v) = self.retraction_length {
            options.filament.retraction_length = mm(v);
        }
        if let Some(v) = self.initial_hot_end_temperature {
            options.filament.initial_hot_end_temperature = v;
        }
        if let Some(v) = self.hot_end_temperature {
            options.filament.hot_end_temperature = v;
        }
        if let Some(v) = self.initial_bed_temperature {
            options.filament.initial_bed_temperature = v;
        }
        if let Some(v) = self.bed_temperature {
            options.filament.bed_temperature = v;
        }
        if let Some(v) = self.initial_temperature_layer_count {
            options.filament.initial_temperature_layer_count = v;
        }
        if let Some(v) = &self.fan_speed {
            options.filament.fan_speed = FanSpeedOptions::parse(v)?;
        }

        Ok(options)
    }

    /// Output path: explicit flag or the input with `.gcode` appended.
    fn output_path(&self) -> PathBuf {
        self.output.clone().unwrap_or_else(|| {
            let mut path = self.input.clone().into_os_string();
            path.push(".gcode");
            PathBuf::from(path)
        })
    }
}

fn run(cli: &Cli) -> Result<()> {
    let options = cli.to_options()?;
    Pipeline::new(options).process(&cli.input, cli.output_path())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

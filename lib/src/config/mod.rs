//! Configuration for the slicing process.
//!
//! Options are grouped by what they describe: the printer, the print job
//! and the filament. All groups serialize to JSON so a complete
//! configuration can be stored in a file and merged with command line
//! flags.
//!
//! Lengths are micrometers, speeds are millimeters per second and
//! temperatures are degrees Celsius.

use crate::{Coord, CoordF, Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Complete slicer configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    pub printer: PrinterOptions,
    pub print: PrintOptions,
    pub filament: FilamentOptions,
}

impl Options {
    /// Load options from a JSON file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let options: Options = serde_json::from_str(&content)
            .map_err(|e| Error::Config(format!("invalid config file: {e}")))?;
        Ok(options)
    }

    /// Validate option combinations.
    ///
    /// Invalid values surface as configuration errors before any slicing
    /// work starts.
    pub fn validate(&self) -> Result<()> {
        if self.print.layer_thickness <= 0 {
            return Err(Error::Config("layer thickness must be positive".into()));
        }
        if self.print.initial_layer_thickness <= 0 {
            return Err(Error::Config(
                "initial layer thickness must be positive".into(),
            ));
        }
        if self.printer.extrusion_width <= 0 {
            return Err(Error::Config("extrusion width must be positive".into()));
        }
        if !(0..=100).contains(&self.print.infill_percent) {
            return Err(Error::Config(
                "infill percent must be between 0 and 100".into(),
            ));
        }
        if self.print.layer_speed <= 0.0
            || self.print.initial_layer_speed <= 0.0
            || self.print.move_speed <= 0.0
        {
            return Err(Error::Config("speeds must be positive".into()));
        }
        if self.filament.filament_diameter <= 0 {
            return Err(Error::Config("filament diameter must be positive".into()));
        }
        if self.print.support.enabled {
            let support = &self.print.support;
            if !(0.0..90.0).contains(&support.threshold_angle) {
                return Err(Error::Config(
                    "support threshold angle must be in [0, 90) degrees".into(),
                ));
            }
            if support.pattern_spacing <= 0 {
                return Err(Error::Config(
                    "support pattern spacing must be positive".into(),
                ));
            }
            if support.interface_layers == 0 {
                return Err(Error::Config(
                    "support needs at least one interface layer".into(),
                ));
            }
        }
        Ok(())
    }
}

/// Properties of the machine itself.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct PrinterOptions {
    /// Width of one extruded line in micrometers.
    pub extrusion_width: Coord,
    /// Nozzle bore diameter in micrometers.
    pub nozzle_diameter: Coord,
}

impl Default for PrinterOptions {
    fn default() -> Self {
        Self {
            extrusion_width: 400,
            nozzle_diameter: 400,
        }
    }
}

/// Properties of the print job.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct PrintOptions {
    /// Thickness of each layer in micrometers.
    pub layer_thickness: Coord,
    /// Thickness of the first layer in micrometers.
    pub initial_layer_thickness: Coord,
    /// Number of perimeter walls.
    pub inset_count: usize,
    /// Internal infill density in percent.
    pub infill_percent: i64,
    /// Rotation of the infill pattern in degrees.
    pub infill_rotation_degree: CoordF,
    /// Connect internal infill lines into a zigzag.
    pub infill_zigzag: bool,
    /// Fill overlap with the perimeter in percent.
    pub infill_overlap_percent: i64,
    /// Number of solid layers at the top of the model.
    pub top_layers: usize,
    /// Number of solid layers at the bottom of the model.
    pub bottom_layers: usize,
    /// Print speed in mm/s.
    pub layer_speed: CoordF,
    /// Print speed for the first layer in mm/s.
    pub initial_layer_speed: CoordF,
    /// Travel speed in mm/s.
    pub move_speed: CoordF,
    /// Number of skirt lines around the print.
    pub skirt_count: usize,
    /// Clearance between the model footprint and the skirt in micrometers.
    pub skirt_distance: Coord,
    /// Number of brim lines attached to the model.
    pub brim_count: usize,
    /// Print perimeters from the outermost wall inwards.
    pub outer_perimeter_first: bool,
    /// Support generation settings.
    pub support: SupportOptions,
    /// Points closer than this to their predecessor are filtered before
    /// partitioning (micrometers).
    pub point_filter_distance: Coord,
    /// Segment endpoints within this distance stitch together
    /// (micrometers).
    pub segment_snap_distance: Coord,
    /// Polygons shorter than this are discarded (micrometers).
    pub min_polygon_length: Coord,
}

impl Default for PrintOptions {
    fn default() -> Self {
        Self {
            layer_thickness: 200,
            initial_layer_thickness: 200,
            inset_count: 2,
            infill_percent: 20,
            infill_rotation_degree: 45.0,
            infill_zigzag: false,
            infill_overlap_percent: 0,
            top_layers: 4,
            bottom_layers: 4,
            layer_speed: 30.0,
            initial_layer_speed: 20.0,
            move_speed: 150.0,
            skirt_count: 1,
            skirt_distance: 5_000,
            brim_count: 0,
            outer_perimeter_first: true,
            support: SupportOptions::default(),
            point_filter_distance: 100,
            segment_snap_distance: 30,
            min_polygon_length: 1000,
        }
    }
}

/// Support structure settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SupportOptions {
    /// Generate support structures.
    pub enabled: bool,
    /// Overhang angle from the vertical above which faces need support,
    /// in degrees.
    pub threshold_angle: CoordF,
    /// Number of empty layers between the support top and the model.
    pub top_gap_layers: usize,
    /// Number of dense interface layers at the top of a support column.
    pub interface_layers: usize,
    /// Spacing of the support fill lines in micrometers.
    pub pattern_spacing: Coord,
    /// Horizontal clearance between support and model in micrometers.
    pub gap: Coord,
}

impl Default for SupportOptions {
    fn default() -> Self {
        Self {
            enabled: false,
            threshold_angle: 60.0,
            top_gap_layers: 3,
            interface_layers: 2,
            pattern_spacing: 2_500,
            gap: 800,
        }
    }
}

/// Properties of the loaded filament.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct FilamentOptions {
    /// Filament diameter in micrometers.
    pub filament_diameter: Coord,
    /// Retraction speed in mm/s.
    pub retraction_speed: CoordF,
    /// Retraction length in micrometers.
    pub retraction_length: Coord,
    /// Hot end temperature for the first layers.
    pub initial_hot_end_temperature: u32,
    /// Hot end temperature after the initial layers.
    pub hot_end_temperature: u32,
    /// Bed temperature for the first layers.
    pub initial_bed_temperature: u32,
    /// Bed temperature after the initial layers.
    pub bed_temperature: u32,
    /// Number of layers printed with the initial temperatures.
    pub initial_temperature_layer_count: usize,
    /// Fan speed per layer: at each listed layer the fan switches to the
    /// given PWM value (0-255).
    pub fan_speed: FanSpeedOptions,
}

impl Default for FilamentOptions {
    fn default() -> Self {
        Self {
            filament_diameter: 1_750,
            retraction_speed: 30.0,
            retraction_length: 2_000,
            initial_hot_end_temperature: 205,
            hot_end_temperature: 200,
            initial_bed_temperature: 60,
            bed_temperature: 55,
            initial_temperature_layer_count: 3,
            fan_speed: FanSpeedOptions::default(),
        }
    }
}

/// Layer-indexed fan speed table.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct FanSpeedOptions {
    /// Maps a layer number to the fan PWM value set at that layer.
    pub layer_to_speed: BTreeMap<usize, u8>,
}

impl Default for FanSpeedOptions {
    fn default() -> Self {
        let mut layer_to_speed = BTreeMap::new();
        layer_to_speed.insert(2, 255);
        Self { layer_to_speed }
    }
}

impl FanSpeedOptions {
    /// Parse a command line fan table of the form `layer=speed,layer=speed`.
    pub fn parse(value: &str) -> Result<Self> {
        let mut layer_to_speed = BTreeMap::new();
        for entry in value.split(',').filter(|e| !e.is_empty()) {
            let (layer, speed) = entry.split_once('=').ok_or_else(|| {
                Error::Config(format!("invalid fan speed entry '{entry}', expected layer=speed"))
            })?;
            let layer: usize = layer
                .trim()
                .parse()
                .map_err(|_| Error::Config(format!("invalid fan speed layer '{layer}'")))?;
            let speed: u8 = speed
                .trim()
                .parse()
                .map_err(|_| Error::Config(format!("invalid fan speed value '{speed}'")))?;
            layer_to_speed.insert(layer, speed);
        }
        Ok(Self { layer_to_speed })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options_validate() {
        assert!(Options::default().validate().is_ok());
    }

    #[test]
    fn test_negative_layer_thickness_rejected() {
        let mut options = Options::default();
        options.print.layer_thickness = -200;
        assert!(matches!(options.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_support_angle_range() {
        let mut options = Options::default();
        options.print.support.enabled = true;
        options.print.support.threshold_angle = 90.0;
        assert!(options.validate().is_err());

        options.print.support.threshold_angle = 45.0;
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_fan_speed_parse() {
        let fan = FanSpeedOptions::parse("0=0,3=255").unwrap();
        assert_eq!(fan.layer_to_speed.get(&0), Some(&0));
        assert_eq!(fan.layer_to_speed.get(&3), Some(&255));

        assert!(FanSpeedOptions::parse("nonsense").is_err());
        assert!(FanSpeedOptions::parse("1=999").is_err());
    }

    #[test]
    fn test_json_round_trip() {
        let options = Options::default();
        let json = serde_json::to_string_pretty(&options).unwrap();
        let parsed: Options = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.print.layer_thickness, options.print.layer_thickness);
        assert_eq!(
            parsed.filament.fan_speed.layer_to_speed,
            options.filament.fan_speed.layer_to_speed
        );
    }

    #[test]
    fn test_partial_config_file() {
        use std::io::Write;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let mut file = std::fs::File::create(&path).unwrap();
        write!(file, r#"{{"print": {{"inset_count": 3}}}}"#).unwrap();

        let options = Options::from_file(&path).unwrap();
        assert_eq!(options.print.inset_count, 3);
        // Unspecified fields keep their defaults
        assert_eq!(options.print.layer_thickness, 200);
    }
}

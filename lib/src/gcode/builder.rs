//! Stateful G-code builder.
//!
//! The builder accumulates the output text and tracks the machine state:
//! current position, extrusion length, speeds and retraction. Movement
//! lines carry only the fields that changed since the previous line, so
//! identical pipelines produce byte-identical files.

use crate::geometry::Point;
use crate::{unscale, Coord, CoordF};
use std::fmt::Write;

/// Travel distance above which the filament is retracted (micrometers).
const MIN_TRAVEL_FOR_RETRACTION: Coord = 1_500;

/// Builds the textual G-code stream.
#[derive(Debug)]
pub struct Builder {
    buf: String,

    position: Point,
    z: Coord,
    /// Z value already written out, to emit Z only on change.
    written_z: Option<Coord>,
    /// Feed rate already written out (mm/min).
    written_feed: Option<i64>,

    /// Total extruded filament length in millimeters.
    extrusion_amount: CoordF,
    /// Filament millimeters per millimeter of travel.
    extrusion_per_mm: CoordF,

    move_speed: CoordF,
    extrude_speed: CoordF,
    extrude_speed_override: Option<CoordF>,

    retraction_speed: CoordF,
    retraction_amount: Coord,
    retracted: bool,
}

impl Builder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self {
            buf: String::new(),
            position: Point::zero(),
            z: 0,
            written_z: None,
            written_feed: None,
            extrusion_amount: 0.0,
            extrusion_per_mm: 0.0,
            move_speed: 0.0,
            extrude_speed: 0.0,
            extrude_speed_override: None,
            retraction_speed: 0.0,
            retraction_amount: 0,
            retracted: false,
        }
    }

    /// Finish building and return the G-code text.
    pub fn finish(self) -> String {
        self.buf
    }

    /// Current XY position.
    #[inline]
    pub fn position(&self) -> Point {
        self.position
    }

    /// Append a comment line.
    pub fn add_comment(&mut self, comment: &str) {
        self.buf.push(';');
        self.buf.push_str(comment);
        self.buf.push('\n');
    }

    /// Append a raw command line.
    pub fn add_command(&mut self, command: &str) {
        self.buf.push_str(command);
        self.buf.push('\n');
        // Raw commands may change the feed rate behind our back.
        if command.contains('F') {
            self.written_feed = None;
        }
    }

    /// Set the extrusion geometry used to compute E distances.
    pub fn set_extrusion(
        &mut self,
        layer_thickness: Coord,
        line_width: Coord,
        filament_diameter: Coord,
    ) {
        let radius_mm = unscale(filament_diameter) / 2.0;
        let filament_area = std::f64::consts::PI * radius_mm * radius_mm;
        self.extrusion_per_mm = unscale(layer_thickness) * unscale(line_width) / filament_area;
    }

    /// Set the travel speed in mm/s.
    pub fn set_move_speed(&mut self, speed: CoordF) {
        self.move_speed = speed;
    }

    /// Set the extrusion speed in mm/s.
    pub fn set_extrude_speed(&mut self, speed: CoordF) {
        self.extrude_speed = speed;
    }

    /// Force a specific extrusion speed until the override is disabled.
    pub fn set_extrude_speed_override(&mut self, speed: CoordF) {
        self.extrude_speed_override = Some(speed);
    }

    /// Remove the extrusion speed override.
    pub fn disable_extrude_speed_override(&mut self) {
        self.extrude_speed_override = None;
    }

    /// Set the retraction speed in mm/s.
    pub fn set_retraction_speed(&mut self, speed: CoordF) {
        self.retraction_speed = speed;
    }

    /// Set the retraction length in micrometers.
    pub fn set_retraction_amount(&mut self, amount: Coord) {
        self.retraction_amount = amount;
    }

    /// Set the Z height for subsequent moves; emitted with the next
    /// movement line.
    pub fn set_z(&mut self, z: Coord) {
        self.z = z;
    }

    /// Travel to a point without extruding.
    ///
    /// Long travels retract the filament first and prime it again on the
    /// next extrusion move.
    pub fn add_travel(&mut self, to: Point) {
        if to == self.position && self.written_z == Some(self.z) {
            return;
        }

        if self.retraction_amount > 0
            && !self.retracted
            && self.extrusion_amount > 0.0
            && !(to - self.position).shorter_than(MIN_TRAVEL_FOR_RETRACTION)
        {
            self.retract();
        }

        let feed = (self.move_speed * 60.0).round() as i64;
        self.write_move("G0", to, None, feed);
    }

    /// Extrude a line to the given point.
    pub fn add_extrusion_move(&mut self, to: Point) {
        if self.retracted {
            self.prime();
        }

        let distance_mm = (to - self.position).length() / crate::SCALING_FACTOR;
        self.extrusion_amount += distance_mm * self.extrusion_per_mm;

        let speed = self.extrude_speed_override.unwrap_or(self.extrude_speed);
        let feed = (speed * 60.0).round() as i64;
        self.write_move("G1", to, Some(self.extrusion_amount), feed);
    }

    /// Extrude along all points of a path from the current position.
    pub fn add_extrusion_path(&mut self, points: &[Point]) {
        for &p in points {
            self.add_extrusion_move(p);
        }
    }

    /// Reset the logical extrusion length to zero (G92 E0).
    pub fn reset_extrusion(&mut self) {
        self.extrusion_amount = 0.0;
        self.add_command("G92 E0 ; reset extrusion distance");
    }

    fn retract(&mut self) {
        let length = unscale(self.retraction_amount);
        let feed = (self.retraction_speed * 60.0).round() as i64;
        let _ = writeln!(
            self.buf,
            "G1 E{:.5} F{}",
            self.extrusion_amount - length,
            feed
        );
        self.written_feed = Some(feed);
        self.retracted = true;
    }

    fn prime(&mut self) {
        let feed = (self.retraction_speed * 60.0).round() as i64;
        let _ = writeln!(self.buf, "G1 E{:.5} F{}", self.extrusion_amount, feed);
        self.written_feed = Some(feed);
        self.retracted = false;
    }

    /// Write a movement line with only the changed fields.
    fn write_move(&mut self, command: &str, to: Point, e: Option<CoordF>, feed: i64) {
        self.buf.push_str(command);

        if to.x != self.position.x || to.y != self.position.y || self.written_z.is_none() {
            let _ = write!(self.buf, " X{:.3} Y{:.3}", unscale(to.x), unscale(to.y));
        }
        if self.written_z != Some(self.z) {
            let _ = write!(self.buf, " Z{:.3}", unscale(self.z));
            self.written_z = Some(self.z);
        }
        if let Some(e) = e {
            let _ = write!(self.buf, " E{:.5}", e);
        }
        if self.written_feed != Some(feed) && feed > 0 {
            let _ = write!(self.buf, " F{}", feed);
            self.written_feed = Some(feed);
        }

        self.buf.push('\n');
        self.position = to;
    }
}

impl Default for Builder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_builder() -> Builder {
        let mut b = Builder::new();
        b.set_extrusion(200, 400, 1_750);
        b.set_move_speed(150.0);
        b.set_extrude_speed(30.0);
        b.set_retraction_speed(30.0);
        b.set_retraction_amount(2_000);
        b.set_z(200);
        b
    }

    #[test]
    fn test_travel_line_format() {
        let mut b = test_builder();
        b.add_travel(Point::new(10_000, 5_000));
        let out = b.finish();
        assert_eq!(out, "G0 X10.000 Y5.000 Z0.200 F9000\n");
    }

    #[test]
    fn test_extrusion_accumulates() {
        let mut b = test_builder();
        b.add_travel(Point::new(0, 0));
        b.add_extrusion_move(Point::new(10_000, 0));
        b.add_extrusion_move(Point::new(10_000, 10_000));
        let out = b.finish();

        // Two extrusion lines with increasing E values
        let e_lines: Vec<&str> = out.lines().filter(|l| l.contains('E')).collect();
        assert_eq!(e_lines.len(), 2);
        assert!(e_lines[0].starts_with("G1 X10.000 Y0.000 E"));

        // 10mm at 0.2 x 0.4mm with 1.75mm filament:
        // e per mm = 0.08 / 2.405 ≈ 0.03326
        let e: f64 = e_lines[0]
            .split(' ')
            .find(|f| f.starts_with('E'))
            .unwrap()[1..]
            .parse()
            .unwrap();
        assert!((e - 0.33263).abs() < 0.001);
    }

    #[test]
    fn test_feed_only_when_changed() {
        let mut b = test_builder();
        b.add_extrusion_move(Point::new(1_000, 0));
        b.add_extrusion_move(Point::new(2_000, 0));
        let out = b.finish();

        let lines: Vec<&str> = out.lines().collect();
        assert!(lines[0].contains("F1800"));
        assert!(!lines[1].contains('F'));
    }

    #[test]
    fn test_retraction_around_long_travel() {
        let mut b = test_builder();
        b.add_extrusion_move(Point::new(1_000, 0));
        b.add_travel(Point::new(50_000, 0)); // long travel: retract
        b.add_extrusion_move(Point::new(51_000, 0)); // prime again
        let out = b.finish();

        let lines: Vec<&str> = out.lines().collect();
        // retraction pulls E back below the extruded amount
        assert!(lines[1].starts_with("G1 E-1.9"), "line was {}", lines[1]);
        assert!(lines[2].starts_with("G0"));
        // prime returns exactly to the pre-retraction E value
        assert!(lines[3].starts_with("G1 E0.03"), "line was {}", lines[3]);
    }

    #[test]
    fn test_short_travel_keeps_pressure() {
        let mut b = test_builder();
        b.add_extrusion_move(Point::new(1_000, 0));
        b.add_travel(Point::new(2_000, 0)); // 1mm, below the threshold
        let out = b.finish();
        assert!(!out.contains("E-"));
    }

    #[test]
    fn test_speed_override() {
        let mut b = test_builder();
        b.set_extrude_speed_override(20.0);
        b.add_extrusion_move(Point::new(1_000, 0));
        b.disable_extrude_speed_override();
        b.add_extrusion_move(Point::new(2_000, 0));
        let out = b.finish();

        let lines: Vec<&str> = out.lines().collect();
        assert!(lines[0].contains("F1200"));
        assert!(lines[1].contains("F1800"));
    }
}

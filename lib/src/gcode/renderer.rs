//! Layer renderers.
//!
//! The generator calls a fixed sequence of renderers for every layer; each
//! one turns a slice of the layer's annotations into builder calls. State
//! never crosses layers except through the builder itself.

use super::Builder;
use crate::clipper::{self, LinearPattern};
use crate::config::Options;
use crate::geometry::{Paths, Point, Polygon};
use crate::mesh::OptimizedModel;
use crate::slice::PartitionedLayer;
use crate::{Coord, Result};

/// Renders one aspect of a layer into G-code.
pub trait Renderer {
    /// Called once with the optimized model before rendering starts.
    fn init(&mut self, _model: &OptimizedModel) {}

    /// Render this aspect of `layer` into the builder.
    fn render(
        &self,
        b: &mut Builder,
        layer_nr: usize,
        max_layer: usize,
        layer: &PartitionedLayer,
        z: Coord,
        options: &Options,
    ) -> Result<()>;
}

/// Factory producing the fill pattern for a part's bounding box.
pub type PatternFactory = Box<dyn Fn(Point, Point) -> Option<LinearPattern>>;

/// Extrude a set of closed rings, greedily picking the next ring and start
/// vertex nearest to the current position.
fn render_rings(b: &mut Builder, mut rings: Vec<Polygon>) {
    while !rings.is_empty() {
        let from = b.position();

        let mut best_ring = 0;
        let mut best_vertex = 0;
        let mut best_dist = i128::MAX;
        for (ring_idx, ring) in rings.iter().enumerate() {
            for (vertex_idx, p) in ring.points().iter().enumerate() {
                let d = from.distance_squared(p);
                if d < best_dist {
                    best_dist = d;
                    best_ring = ring_idx;
                    best_vertex = vertex_idx;
                }
            }
        }

        let ring = rings.swap_remove(best_ring);
        let points = ring.points();
        if points.len() < 3 {
            continue;
        }

        let start = points[best_vertex];
        b.add_travel(start);
        for i in 1..=points.len() {
            b.add_extrusion_move(points[(best_vertex + i) % points.len()]);
        }
    }
}

/// Extrude open paths, greedily picking the nearest endpoint and reversing
/// paths entered from their far end.
fn render_paths(b: &mut Builder, mut paths: Paths) {
    while !paths.is_empty() {
        let from = b.position();

        let mut best_path = 0;
        let mut best_reversed = false;
        let mut best_dist = i128::MAX;
        for (idx, path) in paths.iter().enumerate() {
            let (Some(head), Some(tail)) = (path.first_point(), path.last_point()) else {
                continue;
            };
            let d_head = from.distance_squared(&head);
            if d_head < best_dist {
                best_dist = d_head;
                best_path = idx;
                best_reversed = false;
            }
            let d_tail = from.distance_squared(&tail);
            if d_tail < best_dist {
                best_dist = d_tail;
                best_path = idx;
                best_reversed = true;
            }
        }

        let mut path = paths.swap_remove(best_path);
        if best_reversed {
            path.reverse();
        }
        if path.len() < 2 {
            continue;
        }

        b.add_travel(path.points()[0]);
        b.add_extrusion_path(&path.points()[1..]);
    }
}

/// Emits per-layer bookkeeping: the layer comment, the start sequence,
/// speed setup, fan control and the temperature switch.
pub struct PreLayer;

impl Renderer for PreLayer {
    fn render(
        &self,
        b: &mut Builder,
        layer_nr: usize,
        _max_layer: usize,
        _layer: &PartitionedLayer,
        z: Coord,
        options: &Options,
    ) -> Result<()> {
        b.add_comment(&format!("LAYER:{layer_nr}"));

        if layer_nr == 0 {
            b.add_comment("generated by microslice");

            b.add_command("M107 ; disable fan");

            // set and wait for the initial temperatures
            b.add_comment("SET_INITIAL_TEMP");
            b.add_command(&format!(
                "M104 S{} ; start heating hot end",
                options.filament.initial_hot_end_temperature
            ));
            b.add_command(&format!(
                "M190 S{} ; heat and wait for bed",
                options.filament.initial_bed_temperature
            ));
            b.add_command(&format!(
                "M109 S{} ; wait for hot end temperature",
                options.filament.initial_hot_end_temperature
            ));

            b.add_comment("START_GCODE");
            b.add_command("G28 ; home all axes");
            b.add_command("G1 Z5 F5000 ; lift nozzle");
            b.reset_extrusion();

            b.set_extrusion(
                options.print.initial_layer_thickness,
                options.printer.extrusion_width,
                options.filament.filament_diameter,
            );

            b.set_extrude_speed(options.print.layer_speed);
            b.set_move_speed(options.print.move_speed);

            b.set_retraction_speed(options.filament.retraction_speed);
            b.set_retraction_amount(options.filament.retraction_length);

            // the first layer prints slower to bond to the bed
            b.set_extrude_speed_override(options.print.initial_layer_speed);
        } else if layer_nr == 1 {
            b.set_extrusion(
                options.print.layer_thickness,
                options.printer.extrusion_width,
                options.filament.filament_diameter,
            );
        }

        if layer_nr > 0 {
            b.disable_extrude_speed_override();
            b.set_extrude_speed(options.print.layer_speed);
        }

        if let Some(&fan_speed) = options.filament.fan_speed.layer_to_speed.get(&layer_nr) {
            if fan_speed == 0 {
                b.add_command("M107 ; disable fan");
            } else {
                b.add_command(&format!("M106 S{fan_speed} ; change fan speed"));
            }
        }

        if layer_nr == options.filament.initial_temperature_layer_count {
            // switch to the steady temperatures without waiting
            b.add_comment("SET_TEMP");
            b.add_command(&format!("M140 S{}", options.filament.bed_temperature));
            b.add_command(&format!("M104 S{}", options.filament.hot_end_temperature));
        }

        b.set_z(z);
        Ok(())
    }
}

/// Emits the end sequence after the last layer.
pub struct PostLayer;

impl Renderer for PostLayer {
    fn render(
        &self,
        b: &mut Builder,
        layer_nr: usize,
        max_layer: usize,
        _layer: &PartitionedLayer,
        _z: Coord,
        _options: &Options,
    ) -> Result<()> {
        if layer_nr == max_layer {
            b.add_comment("END_GCODE");
            b.add_command("M107 ; disable fan");

            // disable heaters
            b.add_command("M104 S0 ; set hot end to 0C (off)");
            b.add_command("M140 S0 ; set bed to 0C (off)");

            b.add_command("G28 X0 ; home X axis to get the head out of the way");
            b.add_command("M84 ; steppers off");
        }
        Ok(())
    }
}

/// Draws the skirt rings around the first layer's footprint.
pub struct Skirt;

impl Renderer for Skirt {
    fn render(
        &self,
        b: &mut Builder,
        layer_nr: usize,
        _max_layer: usize,
        layer: &PartitionedLayer,
        _z: Coord,
        options: &Options,
    ) -> Result<()> {
        if layer_nr != 0 || options.print.skirt_count == 0 {
            return Ok(());
        }

        // The skirt surrounds everything on the first layer: the model,
        // its brim and any support.
        let mut base = layer.parts().to_vec();
        for attr in ["brimOuterDimension", "support", "supportInterface"] {
            if let Some(parts) = layer.parts_attribute(attr)? {
                base.extend(parts.iter().cloned());
            }
        }
        if base.is_empty() {
            return Ok(());
        }

        let width = options.printer.extrusion_width;
        b.add_comment("TYPE:SKIRT");

        for ring_nr in 0..options.print.skirt_count {
            let delta = options.print.skirt_distance + width / 2 + width * ring_nr as Coord;
            let rings: Vec<Polygon> = clipper::offset_parts(&base, delta)
                .into_iter()
                .map(|part| part.outline)
                .collect();
            render_rings(b, rings);
        }

        Ok(())
    }
}

/// Draws the brim rings stored by the brim modifier.
pub struct Brim;

impl Renderer for Brim {
    fn render(
        &self,
        b: &mut Builder,
        _layer_nr: usize,
        _max_layer: usize,
        layer: &PartitionedLayer,
        _z: Coord,
        _options: &Options,
    ) -> Result<()> {
        let Some(brim) = layer.insets_attribute("brim")? else {
            return Ok(());
        };

        b.add_comment("TYPE:SKIRT");

        let ring_count = brim.iter().map(|per_part| per_part.len()).max().unwrap_or(0);
        // Outermost ring first so the line touching the model prints last.
        for ring_nr in (0..ring_count).rev() {
            let mut rings: Vec<Polygon> = Vec::new();
            for per_part in brim {
                if let Some(subparts) = per_part.get(ring_nr) {
                    rings.extend(subparts.iter().map(|p| p.outline.clone()));
                }
            }
            render_rings(b, rings);
        }

        Ok(())
    }
}

/// Draws the perimeter walls stored by the perimeter modifier.
pub struct Perimeter;

impl Renderer for Perimeter {
    fn render(
        &self,
        b: &mut Builder,
        _layer_nr: usize,
        _max_layer: usize,
        layer: &PartitionedLayer,
        _z: Coord,
        options: &Options,
    ) -> Result<()> {
        let Some(perimeters) = layer.insets_attribute("perimeters")? else {
            return Ok(());
        };

        for part_walls in perimeters {
            let wall_count = part_walls.len();
            let order: Vec<usize> = if options.print.outer_perimeter_first {
                (0..wall_count).collect()
            } else {
                (0..wall_count).rev().collect()
            };

            for wall_nr in order {
                if part_walls[wall_nr].is_empty() {
                    continue;
                }
                if wall_nr == 0 {
                    b.add_comment("TYPE:WALL-OUTER");
                } else {
                    b.add_comment("TYPE:WALL-INNER");
                }

                let mut rings: Vec<Polygon> = Vec::new();
                for subpart in &part_walls[wall_nr] {
                    rings.push(subpart.outline.clone());
                    rings.extend(subpart.holes.iter().cloned());
                }
                render_rings(b, rings);
            }
        }

        Ok(())
    }
}

/// Fills the parts stored under one attribute with a line pattern.
pub struct Infill {
    /// Attribute holding the regions to fill.
    pub attr_name: &'static str,
    /// Type comments emitted before the first fill line of a layer.
    pub comments: &'static [&'static str],
    /// Pattern factory, called with each part's bounding box corners.
    pub pattern_setup: PatternFactory,
    /// Overlap of the fill lines with the surrounding walls in percent.
    pub overlap_percent: i64,
}

impl Renderer for Infill {
    fn render(
        &self,
        b: &mut Builder,
        _layer_nr: usize,
        _max_layer: usize,
        layer: &PartitionedLayer,
        _z: Coord,
        _options: &Options,
    ) -> Result<()> {
        let Some(parts) = layer.parts_attribute(self.attr_name)? else {
            return Ok(());
        };
        if parts.is_empty() {
            return Ok(());
        }

        let mut commented = false;
        for part in parts {
            let bb = part.bounding_box();
            let Some(pattern) = (self.pattern_setup)(bb.min, bb.max) else {
                continue;
            };

            let paths = pattern.fill_with_overlap(part, self.overlap_percent);
            if paths.is_empty() {
                continue;
            }

            if !commented {
                for comment in self.comments {
                    b.add_comment(comment);
                }
                commented = true;
            }
            render_paths(b, paths);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Polyline;

    #[test]
    fn test_render_rings_greedy_order() {
        let mut b = Builder::new();
        b.set_move_speed(150.0);
        b.set_extrude_speed(30.0);
        b.set_extrusion(200, 400, 1_750);
        b.set_z(200);

        // Two squares; the nearer one (at the origin) must print first.
        let far = Polygon::rectangle(Point::new(50_000, 0), Point::new(60_000, 10_000));
        let near = Polygon::rectangle(Point::new(0, 0), Point::new(10_000, 10_000));
        render_rings(&mut b, vec![far, near]);

        let out = b.finish();
        let first_travel = out.lines().next().unwrap();
        assert!(first_travel.starts_with("G0 X0.000 Y0.000"), "{first_travel}");
    }

    #[test]
    fn test_render_rings_closes_loop() {
        let mut b = Builder::new();
        b.set_move_speed(150.0);
        b.set_extrude_speed(30.0);
        b.set_extrusion(200, 400, 1_750);
        b.set_z(200);

        render_rings(
            &mut b,
            vec![Polygon::rectangle(Point::zero(), Point::new(10_000, 10_000))],
        );

        let out = b.finish();
        // 1 travel + 4 extrusion moves back to the start corner
        assert_eq!(out.lines().count(), 5);
        let last = out.lines().last().unwrap();
        assert!(last.contains("X0.000 Y0.000"), "{last}");
    }

    #[test]
    fn test_render_paths_reverses_for_nearest_end() {
        let mut b = Builder::new();
        b.set_move_speed(150.0);
        b.set_extrude_speed(30.0);
        b.set_extrusion(200, 400, 1_750);
        b.set_z(200);

        // The path's far end is its head; entering from the tail is closer.
        let path = Polyline::from_points(vec![Point::new(20_000, 0), Point::new(1_000, 0)]);
        render_paths(&mut b, vec![path]);

        let out = b.finish();
        let first = out.lines().next().unwrap();
        assert!(first.starts_with("G0 X1.000 Y0.000"), "{first}");
    }
}

//! End-to-end pipeline scenarios.

use microslice::config::Options;
use microslice::gcode::Generator;
use microslice::mesh::{optimize, TriangleMesh};
use microslice::modifier::{default_modifiers, run_modifiers};
use microslice::print::Pipeline;
use microslice::slice::{PartitionedLayer, Slicer};
use std::sync::atomic::AtomicBool;

/// Slice and annotate a mesh with the full modifier chain.
fn annotated_layers(mesh: &TriangleMesh, options: &Options) -> Vec<PartitionedLayer> {
    let model = optimize(mesh).unwrap();
    let cancel = AtomicBool::new(false);
    let mut layers = Slicer::new(options).slice(&model, &cancel).unwrap();
    let mut chain = default_modifiers(options);
    run_modifiers(&mut chain, &model, &mut layers, &cancel).unwrap();
    layers
}

fn attr_area(layer: &PartitionedLayer, name: &str) -> f64 {
    layer
        .parts_attribute(name)
        .unwrap()
        .map(|parts| parts.iter().map(|p| p.area()).sum())
        .unwrap_or(0.0)
}

#[test]
fn cube_layers_and_perimeters() {
    let mut options = Options::default();
    options.print.inset_count = 1;
    options.print.infill_percent = 0;

    let layers = annotated_layers(&TriangleMesh::cube(10.0), &options);

    // 10mm at 0.2mm layers: 50 layers, each one 10x10mm part.
    assert_eq!(layers.len(), 50);
    for (nr, layer) in layers.iter().enumerate() {
        assert_eq!(layer.parts().len(), 1, "layer {nr}");
        let bb = layer.parts()[0].bounding_box();
        assert!((bb.width() - 10_000).abs() <= 10, "layer {nr}");
        assert!((bb.height() - 10_000).abs() <= 10, "layer {nr}");

        // Single perimeter: a 9.6mm square centerline at 400µm width.
        let insets = layer.insets_attribute("perimeters").unwrap().unwrap();
        assert_eq!(insets[0].len(), 1);
        let wall = &insets[0][0][0];
        let wall_bb = wall.bounding_box();
        assert!((wall_bb.width() - 9_600).abs() <= 10, "layer {nr}");
        assert!((wall_bb.height() - 9_600).abs() <= 10, "layer {nr}");
    }
}

#[test]
fn cube_with_hole_keeps_disc_clear() {
    let options = Options::default();
    let layers = annotated_layers(&TriangleMesh::cube_with_hole(10.0, 2.0, 16), &options);

    let mid = &layers[25];
    assert_eq!(mid.parts().len(), 1);
    assert_eq!(mid.parts()[0].holes.len(), 1);

    // The internal infill region carries the hole, so generated fill
    // lines cannot enter the disc.
    let infill = mid.parts_attribute("infill").unwrap().unwrap();
    assert!(!infill.is_empty());
    for part in infill {
        assert!(part.has_holes());
        for hole in &part.holes {
            // Hole sits centered, roughly at the 2mm radius plus walls.
            let bb = hole.bounding_box();
            assert!(bb.min.x < 0 && bb.max.x > 0);
            assert!(bb.width() > 3_000);
        }
    }
}

#[test]
fn pyramid_needs_no_support_at_threshold() {
    let mut options = Options::default();
    options.print.support.enabled = true;
    options.print.support.threshold_angle = 45.0;
    options.print.support.top_gap_layers = 0;

    let layers = annotated_layers(&TriangleMesh::pyramid(10.0, 10.0), &options);
    for (nr, layer) in layers.iter().enumerate() {
        assert_eq!(attr_area(layer, "support"), 0.0, "layer {nr}");
        assert_eq!(attr_area(layer, "supportInterface"), 0.0, "layer {nr}");
    }
}

#[test]
fn overhang_cap_gets_support_column() {
    let mut options = Options::default();
    options.print.support.enabled = true;
    options.print.support.threshold_angle = 45.0;
    options.print.support.top_gap_layers = 0;

    // 10mm stem carrying a 20mm cap: the cap overhangs on all sides.
    let mut mesh = TriangleMesh::cuboid(
        microslice::geometry::Point3F::new(-5.0, -5.0, 0.0),
        microslice::geometry::Point3F::new(5.0, 5.0, 5.1),
    );
    let cap = TriangleMesh::cuboid(
        microslice::geometry::Point3F::new(-10.0, -10.0, 5.1),
        microslice::geometry::Point3F::new(10.0, 10.0, 7.1),
    );
    for face in cap.faces() {
        mesh.push_face(face[0], face[1], face[2]);
    }

    let layers = annotated_layers(&mesh, &options);

    // Support exists somewhere below the cap (z < 5.1mm, layers 0..24)...
    let below: f64 = layers[..25]
        .iter()
        .map(|l| attr_area(l, "support") + attr_area(l, "supportInterface"))
        .sum();
    assert!(below > 0.0);

    // ...and never inside or above it.
    for (nr, layer) in layers.iter().enumerate().skip(25) {
        assert_eq!(
            attr_area(layer, "support") + attr_area(layer, "supportInterface"),
            0.0,
            "layer {nr}"
        );
    }
}

#[test]
fn brim_produces_three_spaced_rings() {
    let mut options = Options::default();
    options.print.brim_count = 3;

    let layers = annotated_layers(&TriangleMesh::cube(10.0), &options);
    let rings = layers[0].insets_attribute("brim").unwrap().unwrap();

    assert_eq!(rings[0].len(), 3);
    // First ring half a width outside the contour, then one extrusion
    // width from ring to ring.
    for (ring_nr, subparts) in rings[0].iter().enumerate() {
        let bb = subparts[0].bounding_box();
        let expected = 10_400 + 800 * ring_nr as i64;
        assert!(
            (bb.width() - expected).abs() <= 10,
            "ring {ring_nr}: width {}",
            bb.width()
        );
    }
}

#[test]
fn gcode_output_is_deterministic() {
    let mut options = Options::default();
    options.print.brim_count = 2;
    options.print.support.enabled = true;

    let mesh = TriangleMesh::cube_with_hole(10.0, 2.0, 16);

    let run = |options: &Options| -> String {
        let model = optimize(&mesh).unwrap();
        let cancel = AtomicBool::new(false);
        let mut layers = Slicer::new(options).slice(&model, &cancel).unwrap();
        let mut chain = default_modifiers(options);
        run_modifiers(&mut chain, &model, &mut layers, &cancel).unwrap();
        Generator::new(options)
            .generate(&model, &layers, &cancel)
            .unwrap()
    };

    assert_eq!(run(&options), run(&options));
}

#[test]
fn pipeline_writes_required_command_set() {
    let gcode = Pipeline::new(Options::default())
        .slice_mesh(&TriangleMesh::cube(10.0))
        .unwrap();

    for required in [
        "G0 ", "G1 ", "G28", "G92 E0", "M104", "M109", "M140", "M190", "M106", "M107", "M84",
    ] {
        assert!(gcode.contains(required), "missing {required}");
    }

    // Layer comments count matches the layer count.
    assert_eq!(gcode.matches(";LAYER:").count(), 50);
}

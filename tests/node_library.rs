// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Fabgraph Contributors

//! Library nodes, script nodes and engine configuration

use approx::assert_relative_eq;
use fabgraph::graph::{NodeKind, OUTPUTS_DATUM, SCRIPT_DATUM, SHAPE_DATUM};
use fabgraph::{Bounds, EngineConfig, EvalErrorKind, Graph, NodeId, Value};
use std::collections::HashMap;

fn set(g: &mut Graph, node: NodeId, datum: &str, formula: &str) {
    let id = g.get_datum(node, datum).unwrap();
    g.set_formula(id, formula).unwrap();
}

fn shape_bounds(g: &mut Graph, node: NodeId) -> Bounds {
    let shape = g.get_datum(node, SHAPE_DATUM).unwrap();
    *g.value(shape).unwrap().as_expression().unwrap().bounds()
}

#[test]
fn test_move_and_extrude_chain() {
    let mut g = Graph::new();
    let c = g.create(NodeKind::Circle, "").unwrap();
    let m = g.create(NodeKind::Move, "").unwrap();
    let e = g.create(NodeKind::ExtrudeZ, "").unwrap();

    let c_shape = g.get_datum(c, SHAPE_DATUM).unwrap();
    let m_input = g.get_datum(m, "input").unwrap();
    let m_shape = g.get_datum(m, SHAPE_DATUM).unwrap();
    let e_input = g.get_datum(e, "input").unwrap();
    g.connect(c_shape, m_input).unwrap();
    g.connect(m_shape, e_input).unwrap();

    set(&mut g, m, "dx", "3");
    set(&mut g, e, "zmax", "2.5");
    let [x0, y0, z0, x1, y1, z1] = shape_bounds(&mut g, e).to_array();
    assert_relative_eq!(x0, 2.0);
    assert_relative_eq!(x1, 4.0);
    assert_relative_eq!(y0, -1.0);
    assert_relative_eq!(y1, 1.0);
    assert_relative_eq!(z0, 0.0);
    assert_relative_eq!(z1, 2.5);

    // Editing the source recomputes through the chain
    set(&mut g, c, "r", "2");
    let b = shape_bounds(&mut g, e);
    assert_relative_eq!(b.min.x, 1.0);
    assert_relative_eq!(b.max.x, 5.0);
}

#[test]
fn test_difference_node() {
    let mut g = Graph::new();
    let d = g.create(NodeKind::Difference, "").unwrap();
    set(&mut g, d, "a", "rectangle(0, 10, 0, 10)");
    set(&mut g, d, "b", "circle(5, 5, 2)");

    let shape = g.get_datum(d, SHAPE_DATUM).unwrap();
    let value = g.value(shape).unwrap();
    let e = value.as_expression().unwrap();
    assert!(e.bounds().approx_eq(&Bounds::flat(0.0, 0.0, 10.0, 10.0), 1e-9));
    assert!(e.eval(5.0, 5.0, 0.0) > 0.0);
    assert!(e.eval(1.0, 1.0, 0.0) < 0.0);
}

#[test]
fn test_shape_parameter_rejects_numbers() {
    let mut g = Graph::new();
    let m = g.create(NodeKind::Move, "").unwrap();
    set(&mut g, m, "input", "3");

    let shape = g.get_datum(m, SHAPE_DATUM).unwrap();
    assert_eq!(g.value(shape).unwrap_err().kind(), EvalErrorKind::TypeMismatch);

    set(&mut g, m, "input", "sphere(0, 0, 0, 1)");
    assert!(g.is_valid(shape));
}

#[test]
fn test_script_node_outputs_feed_other_nodes() {
    let mut g = Graph::new();
    let base = g.create(NodeKind::Circle, "base").unwrap();
    set(&mut g, base, "r", "1.5");

    let s = g.create(NodeKind::Script, "").unwrap();
    set(
        &mut g,
        s,
        SCRIPT_DATUM,
        "# ring around base\nouter = base0.r * 2\nring = circle(0, 0, outer) - base0.shape",
    );

    let outputs = g.get_datum(s, OUTPUTS_DATUM).unwrap();
    let Value::Outputs(map) = g.value(outputs).unwrap() else {
        panic!("expected outputs");
    };
    assert_eq!(map.keys().collect::<Vec<_>>(), ["outer", "ring"]);
    assert_eq!(map["outer"], Value::Float(3.0));

    let m = g.create(NodeKind::Move, "").unwrap();
    set(&mut g, m, "input", "script0.outputs.ring");
    set(&mut g, m, "dy", "1");
    let b = shape_bounds(&mut g, m);
    assert_relative_eq!(b.min.y, -2.0);
    assert_relative_eq!(b.max.y, 4.0);

    // Upstream edits flow through the script
    set(&mut g, base, "r", "2");
    let b = shape_bounds(&mut g, m);
    assert_relative_eq!(b.max.x, 4.0);
}

#[test]
fn test_script_errors_report_line() {
    let mut g = Graph::new();
    let s = g.create(NodeKind::Script, "").unwrap();
    set(&mut g, s, SCRIPT_DATUM, "a = 1\nb = a +\nc = 2");

    let outputs = g.get_datum(s, OUTPUTS_DATUM).unwrap();
    let err = g.value(outputs).unwrap_err();
    assert_eq!(err.kind(), EvalErrorKind::ParseOrName);
    assert!(err.to_string().contains("line 2"), "{err}");

    set(&mut g, s, SCRIPT_DATUM, "a = 1\nb = a + 1");
    let Value::Outputs(map) = g.value(outputs).unwrap() else {
        panic!("expected outputs");
    };
    assert_eq!(map["b"], Value::Integer(2));
}

#[test]
fn test_text_node_alignment() {
    let mut g = Graph::new();
    let t = g.create(NodeKind::Text, "").unwrap();
    set(&mut g, t, "text", "HI");
    set(&mut g, t, "x", "10");
    set(&mut g, t, "align", "CC");

    let b = shape_bounds(&mut g, t);
    assert!(b.min.x < 10.0 && b.max.x > 10.0);
    assert!(b.min.y < 0.0 && b.max.y > 0.0);

    set(&mut g, t, "align", "XY");
    let shape = g.get_datum(t, SHAPE_DATUM).unwrap();
    assert!(!g.is_valid(shape));
}

#[test]
fn test_text_line_spacing_from_config() {
    let tight = EngineConfig { text_line_spacing: 1.0, ..EngineConfig::default() };
    let loose = EngineConfig { text_line_spacing: 2.0, ..EngineConfig::default() };

    let height = |config: EngineConfig| {
        let mut g = Graph::with_config(config);
        let t = g.create(NodeKind::Text, "").unwrap();
        set(&mut g, t, "text", "A\nB");
        let b = shape_bounds(&mut g, t);
        b.max.y - b.min.y
    };
    assert!(height(loose) > height(tight) + 0.5);
}

#[test]
fn test_every_kind_parses_from_label() {
    for kind in NodeKind::ALL {
        assert_eq!(kind.label().parse::<NodeKind>(), Ok(kind));
        assert_eq!(kind.label().to_lowercase().parse::<NodeKind>(), Ok(kind));
    }
    assert!("Hexagon".parse::<NodeKind>().is_err());
}

#[test]
fn test_every_kind_instantiates() {
    let mut g = Graph::new();
    for kind in NodeKind::ALL {
        let node = g.create(kind, "").unwrap();
        match kind {
            NodeKind::Point3d => assert!(g.get_datum(node, SHAPE_DATUM).is_none()),
            NodeKind::Script => {
                let outputs = g.get_datum(node, OUTPUTS_DATUM).unwrap();
                assert_eq!(g.value(outputs), Ok(Value::Outputs(Default::default())));
            }
            _ => {
                let shape = g.get_datum(node, SHAPE_DATUM).unwrap();
                assert!(g.is_valid(shape), "{kind}");
            }
        }
    }
    assert_eq!(g.node_count(), NodeKind::ALL.len());
}

#[test]
fn test_config_file_and_overrides() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("engine.toml");
    std::fs::write(&path, "scale = 40.0\ntext_line_spacing = 1.5\n").unwrap();

    let mut config = EngineConfig::from_file(&path).unwrap();
    assert_eq!(config.scale, 40.0);
    assert_eq!(config.text_line_spacing, 1.5);
    assert_eq!(config.max_voxels, EngineConfig::default().max_voxels);

    let env: HashMap<&str, &str> = [("FABGRAPH_SCALE", "12.5"), ("FABGRAPH_LOG", "fabgraph=trace")]
        .into_iter()
        .collect();
    config
        .apply_overrides(|key| env.get(key).map(|v| v.to_string()))
        .unwrap();
    assert_eq!(config.scale, 12.5);
    assert_eq!(config.log_filter, "fabgraph=trace");

    let bad: HashMap<&str, &str> = [("FABGRAPH_MAX_VOXELS", "lots")].into_iter().collect();
    assert!(config
        .apply_overrides(|key| bad.get(key).map(|v| v.to_string()))
        .is_err());

    std::fs::write(&path, "scale = \"fast\"\n").unwrap();
    assert!(EngineConfig::from_file(&path).is_err());
}

//! Integration tests for the compiled graph runtime.
//!
//! These tests verify:
//!   1. Full pipeline: JSON document → compile → analyze → prune → batch
//!   2. Pruned-map evaluation matches default-map evaluation inside the
//!      analyzed box
//!   3. Range analysis soundness on composite graphs
//!   4. Columnar (skip_xz) evaluation parity with point evaluation
//!   5. Constant folding observable through the public surface
//!   6. Determinism: independent runtimes and states agree bit-for-bit
//!   7. Block evaluation equals brute-force point evaluation
//!   8. Program cache reuse across identical documents

use voxelgraph::{
    generate_block, GraphRuntime, Interval, OpKind, ProgramCache, ProgramGraph, State,
};

// ── Helpers ────────────────────────────────────────────────────────

/// A terrain-shaped document exercising bindings, params, noise, SDF
/// and blending: select between a noisy sphere and a flat plane.
fn terrain_document() -> &'static str {
    r#"{
        "nodes": [
            {"id": 1, "kind": "InputX"},
            {"id": 2, "kind": "InputY"},
            {"id": 3, "kind": "InputZ"},
            {"id": 4, "kind": "SdfSphere", "params": {"Radius": 10.0}},
            {"id": 5, "kind": "Noise2D", "params": {"Seed": 1234, "Frequency": 0.08, "Octaves": 3}},
            {"id": 6, "kind": "Constant", "params": {"Value": 2.5}},
            {"id": 7, "kind": "Multiply"},
            {"id": 8, "kind": "Add"},
            {"id": 9, "kind": "SdfPlane", "params": {"Height": 4.0}},
            {"id": 10, "kind": "Select", "params": {"Threshold": 0.0}},
            {"id": 11, "kind": "OutputSdf"}
        ],
        "edges": [
            {"source": 1, "target": 4, "target_port": "X"},
            {"source": 2, "target": 4, "target_port": "Y"},
            {"source": 3, "target": 4, "target_port": "Z"},
            {"source": 1, "target": 5, "target_port": "X"},
            {"source": 3, "target": 5, "target_port": "Z"},
            {"source": 5, "target": 7, "target_port": "A"},
            {"source": 6, "target": 7, "target_port": "B"},
            {"source": 4, "target": 8, "target_port": "A"},
            {"source": 7, "target": 8, "target_port": "B"},
            {"source": 2, "target": 9, "target_port": "Y"},
            {"source": 8, "target": 10, "target_port": "A"},
            {"source": 9, "target": 10, "target_port": "B"},
            {"source": 1, "target": 10, "target_port": "Selector"},
            {"source": 10, "target": 11, "target_port": "Input"}
        ]
    }"#
}

fn compile_terrain() -> GraphRuntime {
    let graph = ProgramGraph::from_json(terrain_document()).expect("valid document");
    let mut runtime = GraphRuntime::new();
    let result = runtime.compile(&graph, false);
    assert!(result.success, "compile failed: {}", result.message);
    runtime
}

/// Deterministic pseudo-random points inside a box.
fn sample_points(min: [i32; 3], max: [i32; 3], count: usize) -> Vec<[f32; 3]> {
    let mut seed = 0x2545f491u32;
    let mut next = move || {
        seed ^= seed << 13;
        seed ^= seed >> 17;
        seed ^= seed << 5;
        (seed >> 8) as f32 / (1u32 << 24) as f32
    };
    (0..count)
        .map(|_| {
            [
                min[0] as f32 + next() * (max[0] - min[0]) as f32,
                min[1] as f32 + next() * (max[1] - min[1]) as f32,
                min[2] as f32 + next() * (max[2] - min[2]) as f32,
            ]
        })
        .collect()
}

// ── 1. Full pipeline ───────────────────────────────────────────────

#[test]
fn full_pipeline_from_json() {
    let runtime = compile_terrain();
    let mut state = State::new();
    runtime.prepare_state(&mut state, 64);

    let (min_pos, max_pos) = ([-8, -8, -8], [8, 8, 8]);
    let range = runtime.analyze_range(&mut state, min_pos, max_pos);
    assert!(range.lo < range.hi, "terrain varies over the box: {range:?}");
    runtime.generate_execution_map(&mut state, false);

    let xs: Vec<f32> = (0..16).map(|i| i as f32 - 8.0).collect();
    let ys = vec![0.0f32; 16];
    let zs = vec![0.0f32; 16];
    let mut out = vec![0.0f32; 16];
    runtime.generate_set(&mut state, &xs, &ys, &zs, &mut out, false, true);

    for &v in &out {
        assert!(v.is_finite());
        assert!(range.contains(v), "batched value {v} outside {range:?}");
    }
}

// ── 2. Map correctness ─────────────────────────────────────────────

#[test]
fn pruned_map_matches_default_inside_the_box() {
    let runtime = compile_terrain();
    let mut state = State::new();
    runtime.prepare_state(&mut state, 1);

    // A box on the positive-X side so the select is pinned to its plane
    // branch and the sphere/noise chain is pruned.
    let (min_pos, max_pos) = ([1, -8, -8], [12, 8, 8]);
    runtime.analyze_range(&mut state, min_pos, max_pos);
    runtime.generate_execution_map(&mut state, false);

    for p in sample_points(min_pos, max_pos, 200) {
        let pruned = runtime.generate_single(&mut state, p, true);
        let full = runtime.generate_single(&mut state, p, false);
        assert!(
            (pruned - full).abs() < 1e-5,
            "pruned {pruned} vs full {full} at {p:?}"
        );
    }
}

// ── 3. Soundness ───────────────────────────────────────────────────

#[test]
fn analyze_range_is_sound_over_many_boxes() {
    let runtime = compile_terrain();
    let mut state = State::new();
    runtime.prepare_state(&mut state, 1);

    let boxes = [
        ([-16, -16, -16], [16, 16, 16]),
        ([0, 0, 0], [4, 4, 4]),
        ([-3, 5, -11], [2, 9, -6]),
        ([7, 7, 7], [7, 7, 7]),
    ];
    for (min_pos, max_pos) in boxes {
        let range = runtime.analyze_range(&mut state, min_pos, max_pos);
        for p in sample_points(min_pos, max_pos, 100) {
            let v = runtime.generate_single(&mut state, p, false);
            assert!(
                range.contains(v),
                "value {v} at {p:?} escapes {range:?} for box {min_pos:?}..{max_pos:?}"
            );
        }
    }
}

// ── 4. Columnar parity ─────────────────────────────────────────────

#[test]
fn columnar_batches_match_per_point_evaluation() {
    let runtime = compile_terrain();
    let mut state = State::new();
    let n = 32;
    runtime.prepare_state(&mut state, n);

    for (wx, wz) in [(-5.0f32, 3.0f32), (0.0, 0.0), (7.5, -7.5)] {
        let xs = vec![wx; n];
        let zs = vec![wz; n];
        let ys: Vec<f32> = (0..n).map(|i| i as f32 - 16.0).collect();
        let mut out = vec![0.0f32; n];
        runtime.generate_set(&mut state, &xs, &ys, &zs, &mut out, true, false);

        for i in 0..n {
            let single = runtime.generate_single(&mut state, [wx, ys[i], wz], false);
            assert!(
                (out[i] - single).abs() < 1e-6,
                "column ({wx},{wz}) y={} mismatch: {} vs {}",
                ys[i],
                out[i],
                single
            );
        }
    }
}

// ── 5. Constant folding ────────────────────────────────────────────

#[test]
fn constant_subgraph_folds_to_a_constant_buffer() {
    // sqrt(16) * 2 - entirely constant - feeding a Select's threshold
    // side; the folded value must match the unfolded arithmetic.
    let mut g = ProgramGraph::new();
    let c = g.create_node(OpKind::Constant, &[("Value", 16.0)]);
    let root = g.create_node(OpKind::Sqrt, &[]);
    let two = g.create_node(OpKind::Constant, &[("Value", 2.0)]);
    let scaled = g.create_node(OpKind::Multiply, &[]);
    let x = g.create_node(OpKind::InputX, &[]);
    let sum = g.create_node(OpKind::Add, &[]);
    let out = g.create_node(OpKind::OutputSdf, &[]);
    g.connect(c, 0, root, 0).unwrap();
    g.connect(root, 0, scaled, 0).unwrap();
    g.connect(two, 0, scaled, 1).unwrap();
    g.connect(scaled, 0, sum, 0).unwrap();
    g.connect(x, 0, sum, 1).unwrap();
    g.connect(sum, 0, out, 0).unwrap();

    let mut runtime = GraphRuntime::new();
    assert!(runtime.compile(&g, true).success);

    let mut state = State::new();
    runtime.prepare_state(&mut state, 1);
    // sqrt(16) * 2 = 8, plus x.
    assert_eq!(runtime.generate_single(&mut state, [1.0, 0.0, 0.0], false), 9.0);

    // The folded node's buffer is a constant — visible via debug lookup.
    let addr = runtime
        .try_get_output_port_address(voxelgraph::PortLocation {
            node_id: scaled,
            port_index: 0,
        })
        .expect("debug compile records addresses");
    let buffer = state.get_buffer(addr);
    assert!(buffer.is_constant);
    assert_eq!(buffer.constant_value, 8.0);
}

// ── 6. Determinism ─────────────────────────────────────────────────

#[test]
fn independent_compilations_agree_bitwise() {
    let a = compile_terrain();
    let b = compile_terrain();
    let mut sa = State::new();
    let mut sb = State::new();
    a.prepare_state(&mut sa, 8);
    b.prepare_state(&mut sb, 8);

    a.analyze_range(&mut sa, [-8, -8, -8], [8, 8, 8]);
    b.analyze_range(&mut sb, [-8, -8, -8], [8, 8, 8]);
    a.generate_execution_map(&mut sa, false);
    b.generate_execution_map(&mut sb, false);

    for p in sample_points([-8, -8, -8], [8, 8, 8], 100) {
        let va = a.generate_single(&mut sa, p, true);
        let vb = b.generate_single(&mut sb, p, true);
        assert_eq!(va.to_bits(), vb.to_bits());
    }
}

// ── 7. Block evaluation ────────────────────────────────────────────

#[test]
fn block_equals_brute_force() {
    let runtime = compile_terrain();
    let n = 8;
    let origin = [-4, -4, -4];
    let block = generate_block(&runtime, origin, n);

    let mut state = State::new();
    runtime.prepare_state(&mut state, 1);
    for yi in 0..n {
        for zi in 0..n {
            for xi in 0..n {
                let p = [
                    (origin[0] + xi as i32) as f32,
                    (origin[1] + yi as i32) as f32,
                    (origin[2] + zi as i32) as f32,
                ];
                let expected = runtime.generate_single(&mut state, p, false);
                let got = block.densities[yi * n * n + zi * n + xi];
                assert!(
                    (got - expected).abs() < 1e-5,
                    "block {got} vs point {expected} at {p:?}"
                );
            }
        }
    }
}

#[test]
fn block_runs_are_deterministic() {
    let runtime = compile_terrain();
    let a = generate_block(&runtime, [0, 0, 0], 8);
    let b = generate_block(&runtime, [0, 0, 0], 8);
    for (x, y) in a.densities.iter().zip(&b.densities) {
        assert_eq!(x.to_bits(), y.to_bits());
    }
}

// ── 8. Program cache ───────────────────────────────────────────────

#[test]
fn cache_shares_compiled_programs_across_documents() {
    let cache = ProgramCache::new(8);
    let g1 = ProgramGraph::from_json(terrain_document()).unwrap();
    let g2 = ProgramGraph::from_json(terrain_document()).unwrap();

    let r1 = cache.get_or_compile(&g1, false).unwrap();
    let r2 = cache.get_or_compile(&g2, false).unwrap();
    assert!(std::sync::Arc::ptr_eq(&r1, &r2));

    // Shared runtime, independent states.
    let mut s1 = State::new();
    let mut s2 = State::new();
    r1.prepare_state(&mut s1, 4);
    r2.prepare_state(&mut s2, 4);
    let p = [1.0, 2.0, 3.0];
    assert_eq!(
        r1.generate_single(&mut s1, p, false),
        r2.generate_single(&mut s2, p, false)
    );
}

// ── Example scenario from the docs ─────────────────────────────────

#[test]
fn x_plus_five_reference_behavior() {
    let mut g = ProgramGraph::new();
    let x = g.create_node(OpKind::InputX, &[]);
    let c = g.create_node(OpKind::Constant, &[("Value", 5.0)]);
    let add = g.create_node(OpKind::Add, &[]);
    let out = g.create_node(OpKind::OutputSdf, &[]);
    g.connect(x, 0, add, 0).unwrap();
    g.connect(c, 0, add, 1).unwrap();
    g.connect(add, 0, out, 0).unwrap();

    let mut runtime = GraphRuntime::new();
    assert!(runtime.compile(&g, false).success);

    let mut state = State::new();
    runtime.prepare_state(&mut state, 8);

    let range = runtime.analyze_range(&mut state, [0, 0, 0], [10, 10, 10]);
    assert_eq!(range, Interval::new(5.0, 15.0));
    assert_eq!(runtime.generate_single(&mut state, [3.0, 0.0, 0.0], false), 8.0);
}

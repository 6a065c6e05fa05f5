// block.rs — Dense voxel block evaluation
//
// Drives the full pipeline over one cubic block of voxels: per (X, Z)
// column, bound the column's box with `analyze_range`, prune with
// `generate_execution_map`, then evaluate the whole Y column in one
// columnar `generate_set` call.
//
// Columns are distributed over rayon worker threads; the runtime itself
// stays synchronous and every thread evaluates through its own `State`.

use crate::runtime::{GraphRuntime, State};
use rayon::prelude::*;
use serde::Serialize;

/// Result of evaluating a graph over a dense block.
#[derive(Debug, Clone, Serialize)]
pub struct BlockResult {
    /// Y-major layout: `densities[y * n * n + z * n + x]`.
    pub densities: Vec<f32>,
    /// Block edge length in voxels.
    pub size: u32,
    /// Minimum value in the result.
    pub min_value: f32,
    /// Maximum value in the result.
    pub max_value: f32,
}

/// Evaluate `runtime` over the `size³` block anchored at `origin`
/// (voxel coordinates, one sample per voxel).
///
/// The runtime must hold a successfully compiled program.
pub fn generate_block(runtime: &GraphRuntime, origin: [i32; 3], size: usize) -> BlockResult {
    assert!(size >= 1, "block size must be at least one voxel");
    assert!(
        runtime.compilation_result().success,
        "evaluating a program that failed to compile"
    );

    let n = size;
    let y_min = origin[1];
    let y_max = origin[1] + n as i32 - 1;

    // One entry per (x, z) column, evaluated in parallel. Each worker
    // thread reuses one state across all the columns it picks up.
    let columns: Vec<(usize, Vec<f32>)> = (0..n * n)
        .into_par_iter()
        .map_init(
            || (State::new(), vec![0.0f32; n]),
            |(state, column), index| {
                let xi = index % n;
                let zi = index / n;
                let wx = origin[0] + xi as i32;
                let wz = origin[2] + zi as i32;

                runtime.prepare_state(state, n);
                runtime.analyze_range(state, [wx, y_min, wz], [wx, y_max, wz]);
                runtime.generate_execution_map(state, false);

                let xs = vec![wx as f32; n];
                let zs = vec![wz as f32; n];
                let ys: Vec<f32> = (0..n).map(|i| (y_min + i as i32) as f32).collect();
                runtime.generate_set(state, &xs, &ys, &zs, column, true, true);

                (index, column.clone())
            },
        )
        .collect();

    // Scatter columns into the Y-major layout and track min/max.
    let mut densities = vec![0.0f32; n * n * n];
    let mut min_value = f32::MAX;
    let mut max_value = f32::MIN;
    for (index, column) in columns {
        let xi = index % n;
        let zi = index / n;
        for (yi, &v) in column.iter().enumerate() {
            densities[yi * n * n + zi * n + xi] = v;
            min_value = min_value.min(v);
            max_value = max_value.max(v);
        }
    }

    BlockResult {
        densities,
        size: n as u32,
        min_value,
        max_value,
    }
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::ProgramGraph;
    use crate::nodes::OpKind;

    fn terrain_graph() -> ProgramGraph {
        // plane(y at height 8) + noise2d(x, z) * 3
        let mut g = ProgramGraph::new();
        let x = g.create_node(OpKind::InputX, &[]);
        let y = g.create_node(OpKind::InputY, &[]);
        let z = g.create_node(OpKind::InputZ, &[]);
        let plane = g.create_node(OpKind::SdfPlane, &[("Height", 8.0)]);
        let noise = g.create_node(OpKind::Noise2D, &[("Seed", 77.0), ("Frequency", 0.15)]);
        let amp = g.create_node(OpKind::Constant, &[("Value", 3.0)]);
        let scaled = g.create_node(OpKind::Multiply, &[]);
        let sum = g.create_node(OpKind::Add, &[]);
        let out = g.create_node(OpKind::OutputSdf, &[]);
        g.connect(y, 0, plane, 0).unwrap();
        g.connect(x, 0, noise, 0).unwrap();
        g.connect(z, 0, noise, 1).unwrap();
        g.connect(noise, 0, scaled, 0).unwrap();
        g.connect(amp, 0, scaled, 1).unwrap();
        g.connect(plane, 0, sum, 0).unwrap();
        g.connect(scaled, 0, sum, 1).unwrap();
        g.connect(sum, 0, out, 0).unwrap();
        g
    }

    #[test]
    fn block_matches_point_evaluation() {
        let mut runtime = GraphRuntime::new();
        assert!(runtime.compile(&terrain_graph(), false).success);

        let origin = [-4, 0, -4];
        let n = 8;
        let block = generate_block(&runtime, origin, n);
        assert_eq!(block.densities.len(), n * n * n);

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
    fn block_min_max_bracket_all_values() {
        let mut runtime = GraphRuntime::new();
        runtime.compile(&terrain_graph(), false);
        let block = generate_block(&runtime, [0, 0, 0], 4);
        for &v in &block.densities {
            assert!(v >= block.min_value && v <= block.max_value);
        }
    }

    #[test]
    fn constant_graph_fills_uniformly() {
        let mut g = ProgramGraph::new();
        let c = g.create_node(OpKind::Constant, &[("Value", 7.0)]);
        let out = g.create_node(OpKind::OutputSdf, &[]);
        g.connect(c, 0, out, 0).unwrap();

        let mut runtime = GraphRuntime::new();
        assert!(runtime.compile(&g, false).success);
        let block = generate_block(&runtime, [0, 0, 0], 4);
        assert!(block.densities.iter().all(|&v| v == 7.0));
        assert_eq!(block.min_value, 7.0);
        assert_eq!(block.max_value, 7.0);
    }

    #[test]
    fn single_voxel_block() {
        let mut runtime = GraphRuntime::new();
        runtime.compile(&terrain_graph(), false);
        let block = generate_block(&runtime, [3, 5, 7], 1);
        assert_eq!(block.densities.len(), 1);

        let mut state = State::new();
        runtime.prepare_state(&mut state, 1);
        let expected = runtime.generate_single(&mut state, [3.0, 5.0, 7.0], false);
        assert!((block.densities[0] - expected).abs() < 1e-5);
    }
}

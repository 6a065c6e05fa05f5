// runtime/range.rs — Interval analysis and execution-map building
//
// `analyze_range` interprets the default execution order with every
// buffer replaced by its interval over a spatial box. The resulting
// bounds drive `generate_execution_map`, which walks operations in
// reverse and drops the ones that cannot matter inside that box:
// either nothing still consumes their result, or the result interval
// collapsed to a single value (which is then frozen into the buffer so
// surviving consumers read it).
//
// A pruned map is only valid for queries inside the analyzed box.

use crate::interval::Interval;
use crate::nodes;
use crate::runtime::bytecode::{self, RangeAnalysisContext};
use crate::runtime::program::Program;
use crate::runtime::state::State;
use tracing::{debug, trace};

/// Bound every buffer over the box `[min_pos, max_pos]` (inclusive, per
/// axis) and return the SDF output's bounds.
pub(crate) fn analyze_range(
    program: &Program,
    state: &mut State,
    min_pos: [i32; 3],
    max_pos: [i32; 3],
) -> Interval {
    assert!(
        program.compilation_result.success,
        "analyzing a program that failed to compile"
    );
    assert_eq!(
        state.buffers.len(),
        program.buffer_count as usize,
        "state was prepared for a different program"
    );
    assert!(
        (0..3).all(|i| min_pos[i] <= max_pos[i]),
        "inverted analysis box"
    );

    // Fresh consumer counts: `ignore_input` calls and a previous map
    // build may have decremented them.
    for spec in &program.buffer_specs {
        let buffer = &mut state.buffers[spec.address as usize];
        buffer.local_users_count = spec.users_count;
        if spec.is_constant {
            state.ranges[spec.address as usize] = Interval::point(spec.constant_value);
        }
    }

    let axes = [
        (program.x_input_address, min_pos[0], max_pos[0]),
        (program.y_input_address, min_pos[1], max_pos[1]),
        (program.z_input_address, min_pos[2], max_pos[2]),
    ];
    for (address, lo, hi) in axes {
        if let Some(address) = address {
            state.ranges[address as usize] = Interval::new(lo as f32, hi as f32);
        }
    }

    for &op_address in &program.default_execution_map {
        let op = bytecode::decode_op(&program.operations, op_address as usize);
        let params = &program.operations[op.params.clone()];
        let State {
            ranges, buffers, ..
        } = state;
        let mut ctx = RangeAnalysisContext::new(
            &op.inputs,
            &op.outputs,
            params,
            ranges,
            buffers,
            &program.heap_resources,
        );
        (nodes::info(op.kind).range_fn)(&mut ctx);
    }

    let output = program
        .sdf_output_address
        .expect("successful programs always have an output") as usize;
    let result = state.ranges[output];
    trace!(lo = result.lo as f64, hi = result.hi as f64, "analyzed range");
    result
}

/// Build a pruned execution map from the bounds of the last
/// `analyze_range`. With `debug`, also record the authored node id of
/// every surviving operation.
pub(crate) fn generate_execution_map(program: &Program, state: &mut State, debug: bool) {
    assert!(
        program.compilation_result.success,
        "mapping a program that failed to compile"
    );
    assert_eq!(
        state.buffers.len(),
        program.buffer_count as usize,
        "state was prepared for a different program"
    );

    let graph = &program.dependency_graph;
    let mut skipped = vec![false; graph.nodes.len()];

    // Reverse walk: consumers are visited before their producers, so a
    // pruned consumer releases its claims early enough to cascade.
    for index in (0..graph.nodes.len()).rev() {
        let node = graph.nodes[index];
        if node.is_output {
            continue;
        }
        let address = node.output_address as usize;

        let prune = if state.buffers[address].local_users_count == 0 {
            // Nothing that still runs reads this buffer.
            true
        } else if state.ranges[address].is_single_value() {
            // Constant over the whole box: freeze the value so surviving
            // consumers read it without the operation running.
            let value = state.ranges[address].lo;
            let size = state.buffer_size;
            state.buffers[address].data[..size].fill(value);
            true
        } else {
            false
        };

        if prune {
            skipped[index] = true;
            for d in node.first_dependency..node.end_dependency {
                let producer = graph.nodes[graph.dependencies[d as usize] as usize];
                let buffer = &mut state.buffers[producer.output_address as usize];
                buffer.local_users_count = buffer.local_users_count.saturating_sub(1);
            }
        }
    }

    state.execution_map.clear();
    state.debug_execution_map.clear();
    let mut xzy_start = 0u32;
    for (index, node) in graph.nodes.iter().enumerate() {
        if skipped[index] {
            continue;
        }
        if (node.op_address as u32) < program.xzy_start_op_address {
            xzy_start += 1;
        }
        state.execution_map.push(node.op_address);
        if debug {
            state.debug_execution_map.push(node.node_id);
        }
    }
    state.execution_map_xzy_start_index = xzy_start;

    debug!(
        surviving = state.execution_map.len(),
        total = graph.nodes.len(),
        "built execution map"
    );
}

// ── Tests ───────────────────────────────────────────────────────────

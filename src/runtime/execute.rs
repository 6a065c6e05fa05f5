// runtime/execute.rs — The bytecode interpreters
//
// A flat decode-and-dispatch loop over the operation stream. No
// recursion, no allocation beyond what an operation's own callback
// performs: output storage is moved out of the state for the duration
// of a callback and moved back afterwards.
//
// Caller arrays (the X/Y/Z inputs and the SDF output) are mapped into
// the binding addresses for the duration of one call; the runtime never
// owns them.

use crate::nodes;
use crate::runtime::bytecode::{self, ProcessBufferContext};
use crate::runtime::program::Program;
use crate::runtime::state::State;
use smallvec::SmallVec;

/// The caller-owned arrays one call maps into the binding addresses.
pub(crate) struct Bindings<'a> {
    pub x: &'a [f32],
    pub y: &'a [f32],
    pub z: &'a [f32],
    pub out: &'a mut [f32],
}

/// Interpret the active execution map over `len` samples.
///
/// With `skip_xz`, operations in the Y-independent prefix run on the
/// first sample only and the scalar result is broadcast across their
/// output buffer — valid exactly when the caller holds X and Z fixed
/// over the whole batch (one voxel column).
pub(crate) fn run_program(
    program: &Program,
    state: &mut State,
    bindings: &mut Bindings<'_>,
    len: usize,
    skip_xz: bool,
    use_execution_map: bool,
) {
    assert!(
        program.compilation_result.success,
        "evaluating a program that failed to compile"
    );
    assert_eq!(
        state.buffers.len(),
        program.buffer_count as usize,
        "state was prepared for a different program"
    );
    assert!(len >= 1 && len <= state.buffer_size, "batch exceeds the prepared buffer size");

    let use_map = use_execution_map && !state.execution_map.is_empty();
    let map_len = if use_map {
        state.execution_map.len()
    } else {
        program.default_execution_map.len()
    };
    let xzy_start = if use_map {
        state.execution_map_xzy_start_index as usize
    } else {
        program.xzy_start_execution_map_index as usize
    };

    for map_index in 0..map_len {
        let op_address = if use_map {
            state.execution_map[map_index]
        } else {
            program.default_execution_map[map_index]
        } as usize;

        let op = bytecode::decode_op(&program.operations, op_address);
        let params = &program.operations[op.params.clone()];

        // Y-independent prefix ops see one sample under skip_xz.
        let op_len = if skip_xz && map_index < xzy_start { 1 } else { len };

        let output_address = op.outputs[0];
        debug_assert!(
            !op.inputs.contains(&output_address),
            "an operation never reads its own output"
        );

        if Some(output_address) == program.sdf_output_address {
            // The output binding: write straight into the caller's array.
            let inputs = gather_inputs(
                program, state, bindings.x, bindings.y, bindings.z, &op.inputs, op_len,
            );
            let mut ctx = ProcessBufferContext::new(
                inputs,
                &mut bindings.out[..op_len],
                params,
                &program.heap_resources,
            );
            (nodes::info(op.kind).process_fn)(&mut ctx);
            drop(ctx);
            if op_len < len {
                let v = bindings.out[0];
                bindings.out[1..len].fill(v);
            }
        } else {
            // Owned output: move the storage out, run, move it back.
            let mut out_data = std::mem::take(&mut state.buffers[output_address as usize].data);
            {
                let inputs = gather_inputs(
                    program, state, bindings.x, bindings.y, bindings.z, &op.inputs, op_len,
                );
                let mut ctx = ProcessBufferContext::new(
                    inputs,
                    &mut out_data[..op_len],
                    params,
                    &program.heap_resources,
                );
                (nodes::info(op.kind).process_fn)(&mut ctx);
            }
            if op_len < len {
                let v = out_data[0];
                out_data[1..len].fill(v);
            }
            state.buffers[output_address as usize].data = out_data;
        }
    }
}

/// Resolve input addresses to value slices: binding addresses map to the
/// caller's arrays, everything else to the state's owned storage.
fn gather_inputs<'t>(
    program: &Program,
    state: &'t State,
    x: &'t [f32],
    y: &'t [f32],
    z: &'t [f32],
    inputs: &[u16],
    len: usize,
) -> SmallVec<[&'t [f32]; 4]> {
    inputs
        .iter()
        .map(|&addr| {
            if Some(addr) == program.x_input_address {
                &x[..len]
            } else if Some(addr) == program.y_input_address {
                &y[..len]
            } else if Some(addr) == program.z_input_address {
                &z[..len]
            } else {
                &state.buffers[addr as usize].data[..len]
            }
        })
        .collect()
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::ProgramGraph;
    use crate::nodes::OpKind;
    use crate::runtime::compiler::compile_graph;
    use crate::runtime::program::CompilationResult;
    use crate::runtime::prepare_state;

    fn compiled(graph: &ProgramGraph) -> Program {
        let mut p = compile_graph(graph, false).unwrap();
        p.compilation_result = CompilationResult::ok();
        p
    }

    fn x_plus_y_graph() -> ProgramGraph {
        let mut g = ProgramGraph::new();
        let x = g.create_node(OpKind::InputX, &[]);
        let y = g.create_node(OpKind::InputY, &[]);
        let add = g.create_node(OpKind::Add, &[]);
        let out = g.create_node(OpKind::OutputSdf, &[]);
        g.connect(x, 0, add, 0).unwrap();
        g.connect(y, 0, add, 1).unwrap();
        g.connect(add, 0, out, 0).unwrap();
        g
    }

    #[test]
    fn batched_run_writes_the_output_binding() {
        let program = compiled(&x_plus_y_graph());
        let mut state = State::new();
        prepare_state(&program, &mut state, 4);

        let x = [1.0, 2.0, 3.0, 4.0];
        let y = [10.0, 20.0, 30.0, 40.0];
        let z = [0.0; 4];
        let mut out = [0.0; 4];
        let mut bindings = Bindings {
            x: &x,
            y: &y,
            z: &z,
            out: &mut out,
        };
        run_program(&program, &mut state, &mut bindings, 4, false, false);
        assert_eq!(out, [11.0, 22.0, 33.0, 44.0]);
    }

    #[test]
    fn skip_xz_broadcasts_the_y_independent_prefix() {
        // out = noise2d(x, z) + y over a fixed (x, z) column.
        let mut g = ProgramGraph::new();
        let x = g.create_node(OpKind::InputX, &[]);
        let z = g.create_node(OpKind::InputZ, &[]);
        let y = g.create_node(OpKind::InputY, &[]);
        let noise = g.create_node(OpKind::Noise2D, &[("Seed", 5.0), ("Frequency", 0.2)]);
        let add = g.create_node(OpKind::Add, &[]);
        let out = g.create_node(OpKind::OutputSdf, &[]);
        g.connect(x, 0, noise, 0).unwrap();
        g.connect(z, 0, noise, 1).unwrap();
        g.connect(noise, 0, add, 0).unwrap();
        g.connect(y, 0, add, 1).unwrap();
        g.connect(add, 0, out, 0).unwrap();

        let program = compiled(&g);
        let mut state = State::new();
        prepare_state(&program, &mut state, 8);

        let xs = [3.0; 8];
        let zs = [7.0; 8];
        let ys: Vec<f32> = (0..8).map(|i| i as f32).collect();

        let mut fast = [0.0; 8];
        let mut bindings = Bindings {
            x: &xs,
            y: &ys,
            z: &zs,
            out: &mut fast,
        };
        run_program(&program, &mut state, &mut bindings, 8, true, false);

        let mut slow = [0.0; 8];
        let mut bindings = Bindings {
            x: &xs,
            y: &ys,
            z: &zs,
            out: &mut slow,
        };
        run_program(&program, &mut state, &mut bindings, 8, false, false);

        assert_eq!(fast, slow);
    }

    #[test]
    #[should_panic(expected = "prepared for a different program")]
    fn unprepared_state_panics() {
        let program = compiled(&x_plus_y_graph());
        let mut state = State::new();
        let x = [0.0];
        let y = [0.0];
        let z = [0.0];
        let mut out = [0.0];
        let mut bindings = Bindings {
            x: &x,
            y: &y,
            z: &z,
            out: &mut out,
        };
        run_program(&program, &mut state, &mut bindings, 1, false, false);
    }

    #[test]
    #[should_panic(expected = "batch exceeds")]
    fn oversized_batch_panics() {
        let program = compiled(&x_plus_y_graph());
        let mut state = State::new();
        prepare_state(&program, &mut state, 2);
        let x = [0.0; 4];
        let y = [0.0; 4];
        let z = [0.0; 4];
        let mut out = [0.0; 4];
        let mut bindings = Bindings {
            x: &x,
            y: &y,
            z: &z,
            out: &mut out,
        };
        run_program(&program, &mut state, &mut bindings, 4, false, false);
    }
}

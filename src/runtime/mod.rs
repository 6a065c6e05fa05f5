// runtime/mod.rs — The compiled graph runtime
//
// `GraphRuntime` owns one compiled `Program` and exposes the whole
// evaluation surface: compile, state preparation, point and batched
// evaluation, range analysis and execution-map building.
//
// A runtime is immutable between compilations and may be shared across
// threads; every thread evaluates through its own `State`.

pub mod bytecode;
pub mod compiler;
pub mod execute;
pub mod program;
pub mod range;
pub mod state;

use crate::graph::{PortLocation, ProgramGraph};
use crate::interval::Interval;
use execute::Bindings;
use program::Program;
use tracing::{debug, warn};

pub use program::{BufferSpec, CompilationResult, DependencyGraph, HeapResource};
pub use state::{Buffer, State};

/// Compiles density graphs and executes the result.
#[derive(Default)]
pub struct GraphRuntime {
    program: Program,
}

impl GraphRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile `graph`, replacing any previous program (and releasing its
    /// heap resources). Check `success` on the result before evaluating.
    ///
    /// With `debug`, the program keeps a port → buffer address table for
    /// inspecting intermediate values.
    pub fn compile(&mut self, graph: &ProgramGraph, debug: bool) -> CompilationResult {
        self.program.clear();
        match compiler::compile_graph(graph, debug) {
            Ok(mut program) => {
                program.compilation_result = CompilationResult::ok();
                debug!(
                    operations = program.default_execution_map.len(),
                    buffers = program.buffer_count as usize,
                    xzy_split = program.xzy_start_execution_map_index,
                    "graph compiled"
                );
                self.program = program;
            }
            Err(failure) => {
                warn!(
                    node_id = ?failure.node_id,
                    message = %failure.message,
                    "graph compilation failed"
                );
                self.program.compilation_result =
                    CompilationResult::error(failure.node_id, failure.message);
            }
        }
        self.program.compilation_result.clone()
    }

    /// Drop the compiled program and its heap resources.
    pub fn clear(&mut self) {
        self.program.clear();
    }

    pub fn compilation_result(&self) -> &CompilationResult {
        &self.program.compilation_result
    }

    pub fn has_output(&self) -> bool {
        self.program.sdf_output_address.is_some()
    }

    /// Number of buffers a prepared state will hold.
    pub fn buffer_count(&self) -> u16 {
        self.program.buffer_count
    }

    /// Buffer address a node's output port compiled to. Only available
    /// after a debug compile.
    pub fn try_get_output_port_address(&self, port: PortLocation) -> Option<u16> {
        self.program.output_port_addresses.get(&port).copied()
    }

    /// Size `state` for this program. Call once after compiling or when
    /// the batch size grows; with unchanged inputs it only refreshes
    /// bookkeeping and keeps every allocation.
    pub fn prepare_state(&self, state: &mut State, buffer_size: usize) {
        prepare_state(&self.program, state, buffer_size)
    }

    /// Evaluate one position.
    pub fn generate_single(
        &self,
        state: &mut State,
        position: [f32; 3],
        use_execution_map: bool,
    ) -> f32 {
        let x = [position[0]];
        let y = [position[1]];
        let z = [position[2]];
        let mut out = [0.0f32];
        let mut bindings = Bindings {
            x: &x,
            y: &y,
            z: &z,
            out: &mut out,
        };
        execute::run_program(&self.program, state, &mut bindings, 1, false, use_execution_map);
        out[0]
    }

    /// Evaluate a batch of positions given as parallel arrays, writing
    /// the SDF into `out_sdf`. Set `skip_xz` when X and Z are constant
    /// over the whole batch (one voxel column) to run Y-independent
    /// operations once instead of per sample.
    #[allow(clippy::too_many_arguments)]
    pub fn generate_set(
        &self,
        state: &mut State,
        x: &[f32],
        y: &[f32],
        z: &[f32],
        out_sdf: &mut [f32],
        skip_xz: bool,
        use_execution_map: bool,
    ) {
        let len = x.len();
        assert!(
            y.len() == len && z.len() == len && out_sdf.len() == len,
            "coordinate and output arrays must have equal lengths"
        );
        let mut bindings = Bindings {
            x,
            y,
            z,
            out: out_sdf,
        };
        execute::run_program(&self.program, state, &mut bindings, len, skip_xz, use_execution_map);
    }

    /// Bound the SDF output over the inclusive box `[min_pos, max_pos]`
    /// and leave per-buffer bounds in the state for map building.
    pub fn analyze_range(
        &self,
        state: &mut State,
        min_pos: [i32; 3],
        max_pos: [i32; 3],
    ) -> Interval {
        range::analyze_range(&self.program, state, min_pos, max_pos)
    }

    /// Prune operations proven constant over the last analyzed box. Until
    /// the next analysis, evaluations passing `use_execution_map` must
    /// stay inside that box.
    pub fn generate_execution_map(&self, state: &mut State, debug: bool) {
        range::generate_execution_map(&self.program, state, debug)
    }
}

/// See [`GraphRuntime::prepare_state`].
pub(crate) fn prepare_state(program: &Program, state: &mut State, buffer_size: usize) {
    assert!(
        program.compilation_result.success,
        "cannot prepare a state for a failed program"
    );
    assert!(buffer_size >= 1, "buffer size must be at least one sample");

    let count = program.buffer_count as usize;
    if state.buffers.len() != count {
        state.buffers.clear();
        state.buffers.resize_with(count, Buffer::default);
    }
    if state.ranges.len() != count {
        state.ranges.clear();
        state.ranges.resize(count, Interval::ZERO);
    }
    state.buffer_size = buffer_size;

    for spec in &program.buffer_specs {
        let buffer = &mut state.buffers[spec.address as usize];
        buffer.is_constant = spec.is_constant;
        buffer.is_binding = spec.is_binding;
        buffer.constant_value = spec.constant_value;
        buffer.local_users_count = spec.users_count;
        if spec.is_binding {
            // Binding storage is the caller's, mapped in per call.
            continue;
        }
        if buffer.data.len() < buffer_size {
            buffer.data.resize(buffer_size, 0.0);
        }
        if spec.is_constant {
            buffer.data[..buffer_size].fill(spec.constant_value);
            state.ranges[spec.address as usize] = Interval::point(spec.constant_value);
        }
    }

    // Any previously built map referred to a different preparation.
    state.execution_map.clear();
    state.debug_execution_map.clear();
    state.execution_map_xzy_start_index = program.xzy_start_execution_map_index;
}

// ── Tests ───────────────────────────────────────────────────────────

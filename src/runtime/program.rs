// runtime/program.rs — Compiled program data
//
// Everything `compile` produces. A `Program` is read-only after a
// successful compilation; every mutation path goes through `clear`,
// which also releases compile-time heap resources exactly once.

use crate::graph::PortLocation;
use rustc_hash::FxHashMap;
use std::any::Any;

/// Outcome of the last compilation attempt. Evaluation entry points must
/// not be used unless `success` is true.
#[derive(Debug, Clone, Default)]
pub struct CompilationResult {
    pub success: bool,
    /// The authored node the failure originated from, when node-local.
    pub node_id: Option<u32>,
    pub message: String,
}

impl CompilationResult {
    pub fn ok() -> Self {
        Self {
            success: true,
            node_id: None,
            message: String::new(),
        }
    }

    pub fn error(node_id: Option<u32>, message: impl Into<String>) -> Self {
        Self {
            success: false,
            node_id,
            message: message.into(),
        }
    }
}

/// An owned value a compile callback parked on the program, fetched back
/// by address at run time (e.g. a noise permutation table). Dropped when
/// the program is cleared or recompiled.
pub type HeapResource = Box<dyn Any + Send + Sync>;

/// Compile-time description of one buffer address.
#[derive(Debug, Clone, Copy)]
pub struct BufferSpec {
    pub address: u16,
    /// How many operations read this buffer. Seeds the live-consumer
    /// counter used by execution-map pruning.
    pub users_count: u16,
    pub constant_value: f32,
    pub is_constant: bool,
    /// Caller-bound storage (coordinate inputs, SDF output).
    pub is_binding: bool,
}

/// Per-operation dependency record, in default execution order.
#[derive(Debug, Clone, Copy)]
pub struct DependencyNode {
    /// Range into `DependencyGraph::dependencies`.
    pub first_dependency: u16,
    pub end_dependency: u16,
    /// Byte offset of the operation in `Program::operations`.
    pub op_address: u16,
    /// The buffer this operation writes.
    pub output_address: u16,
    /// Operations feeding a final output are never pruned.
    pub is_output: bool,
    /// Authored node id, for debug traces.
    pub node_id: u32,
}

/// Which operations produce the inputs of which other operations.
/// Drives the dynamic execution-map optimization.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    /// Flattened per-node lists of indices into `nodes`.
    pub dependencies: Vec<u16>,
    /// One entry per emitted operation, in default execution order.
    pub nodes: Vec<DependencyNode>,
}

impl DependencyGraph {
    pub fn clear(&mut self) {
        self.dependencies.clear();
        self.nodes.clear();
    }
}

/// Precalculated program data. Constant and read-only after compilation.
#[derive(Default)]
pub struct Program {
    /// Serialized operations: a run of
    /// `<op_kind><input_addrs><output_addrs><param_len><params>` records,
    /// laid out in execution order for predictable memory access.
    pub operations: Vec<u8>,

    pub dependency_graph: DependencyGraph,

    /// Operation byte-addresses in default run order. Evaluation follows
    /// this unless a pruned execution map overrides it.
    pub default_execution_map: Vec<u16>,

    /// Owned compile-time resources, released on `clear`.
    pub heap_resources: Vec<HeapResource>,

    /// One spec per buffer address; sizes every prepared state.
    pub buffer_specs: Vec<BufferSpec>,

    /// Byte address of the first operation that (transitively) depends on
    /// the Y coordinate. Everything before it is constant along a column.
    pub xzy_start_op_address: u32,
    /// Same split as an index into `default_execution_map`.
    pub xzy_start_execution_map_index: u32,

    pub x_input_address: Option<u16>,
    pub y_input_address: Option<u16>,
    pub z_input_address: Option<u16>,
    pub sdf_output_address: Option<u16>,
    pub sdf_output_node_id: Option<u32>,

    /// Total distinct buffer addresses a state must provide.
    pub buffer_count: u16,

    /// High-level output port → compiled buffer address, for reading
    /// intermediate values in debug tooling.
    pub output_port_addresses: FxHashMap<PortLocation, u16>,

    pub compilation_result: CompilationResult,
}

impl std::fmt::Debug for Program {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Program")
            .field("operations", &self.operations)
            .field("dependency_graph", &self.dependency_graph)
            .field("default_execution_map", &self.default_execution_map)
            .field("heap_resources", &format_args!("[{} resources]", self.heap_resources.len()))
            .field("buffer_specs", &self.buffer_specs)
            .field("xzy_start_op_address", &self.xzy_start_op_address)
            .field("xzy_start_execution_map_index", &self.xzy_start_execution_map_index)
            .field("x_input_address", &self.x_input_address)
            .field("y_input_address", &self.y_input_address)
            .field("z_input_address", &self.z_input_address)
            .field("sdf_output_address", &self.sdf_output_address)
            .field("sdf_output_node_id", &self.sdf_output_node_id)
            .field("buffer_count", &self.buffer_count)
            .field("output_port_addresses", &self.output_port_addresses)
            .field("compilation_result", &self.compilation_result)
            .finish()
    }
}

impl Program {
    /// Reset to the uncompiled state, dropping heap resources exactly once.
    pub fn clear(&mut self) {
        self.operations.clear();
        self.dependency_graph.clear();
        self.default_execution_map.clear();
        self.heap_resources.clear();
        self.buffer_specs.clear();
        self.xzy_start_op_address = 0;
        self.xzy_start_execution_map_index = 0;
        self.x_input_address = None;
        self.y_input_address = None;
        self.z_input_address = None;
        self.sdf_output_address = None;
        self.sdf_output_node_id = None;
        self.buffer_count = 0;
        self.output_port_addresses.clear();
        self.compilation_result = CompilationResult::default();
    }
}

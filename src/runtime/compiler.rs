// runtime/compiler.rs — Graph → bytecode compilation
//
// Turns the authored DAG into a `Program`: a topologically ordered run
// of serialized operations plus the buffer layout and dependency data
// every later stage works from.
//
// Ordering is deterministic: Kahn's algorithm with ready nodes taken in
// insertion order, then partitioned so every operation independent of
// the Y coordinate precedes every operation that (transitively) reads
// it. That partition is what makes the columnar skip-xz optimization a
// simple prefix rule at run time.

use crate::graph::{GraphNode, PortLocation, ProgramGraph};
use crate::nodes::{self, OpKind};
use crate::runtime::bytecode::{self, CompileContext, ProcessBufferContext};
use crate::runtime::program::{BufferSpec, DependencyNode, Program};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use std::collections::BTreeSet;

#[derive(Debug)]
pub(crate) struct CompileFailure {
    pub node_id: Option<u32>,
    pub message: String,
}

impl CompileFailure {
    fn new(node_id: Option<u32>, message: impl Into<String>) -> Self {
        Self {
            node_id,
            message: message.into(),
        }
    }
}

/// Compile the graph. On success the returned program carries everything
/// but its `compilation_result`, which the caller stamps.
pub(crate) fn compile_graph(
    graph: &ProgramGraph,
    debug: bool,
) -> Result<Program, CompileFailure> {
    let order = ordered_nodes(graph)?;

    let mut program = Program::default();
    let mut specs: Vec<BufferSpec> = Vec::new();

    // Coordinate bindings always occupy the first three addresses.
    let x_addr = alloc_buffer(&mut specs, 0.0, false, true)?;
    let y_addr = alloc_buffer(&mut specs, 0.0, false, true)?;
    let z_addr = alloc_buffer(&mut specs, 0.0, false, true)?;
    program.x_input_address = Some(x_addr);
    program.y_input_address = Some(y_addr);
    program.z_input_address = Some(z_addr);

    // Shared constant buffers backing unconnected default-valued ports.
    let mut default_constants: FxHashMap<u32, u16> = FxHashMap::default();
    // Authored node id → the address its (single) output landed at.
    let mut node_outputs: FxHashMap<u32, u16> = FxHashMap::default();
    // Output address → index of the producing entry in the dependency graph.
    let mut producers: FxHashMap<u16, u16> = FxHashMap::default();

    let mut seen_y_dependent = false;

    for item in &order {
        let node = &graph.nodes()[item.index];
        let info = nodes::info(node.kind);

        match node.kind {
            OpKind::Constant => {
                let value = node
                    .params
                    .get("Value")
                    .and_then(|v| v.as_f64())
                    .unwrap_or(0.0) as f32;
                let addr = alloc_buffer(&mut specs, value, true, false)?;
                node_outputs.insert(node.id, addr);
                continue;
            }
            OpKind::InputX => {
                node_outputs.insert(node.id, x_addr);
                continue;
            }
            OpKind::InputY => {
                node_outputs.insert(node.id, y_addr);
                continue;
            }
            OpKind::InputZ => {
                node_outputs.insert(node.id, z_addr);
                continue;
            }
            _ => {}
        }

        // Resolve input addresses: connected ports read their producer's
        // buffer, open ports read a shared constant holding the default.
        let mut inputs: SmallVec<[u16; 4]> = SmallVec::new();
        for (i, slot) in node.inputs.iter().enumerate() {
            let addr = match slot {
                Some(port_ref) => *node_outputs
                    .get(&port_ref.node)
                    .expect("topological order left an input unresolved"),
                None => {
                    let default = info.inputs[i].default;
                    match default_constants.get(&default.to_bits()) {
                        Some(&addr) => addr,
                        None => {
                            let addr = alloc_buffer(&mut specs, default, true, false)?;
                            default_constants.insert(default.to_bits(), addr);
                            addr
                        }
                    }
                }
            };
            inputs.push(addr);
        }

        // Fold a pure node whose inputs are all compile-time constants.
        if info.foldable
            && !inputs.is_empty()
            && inputs.iter().all(|&a| specs[a as usize].is_constant)
        {
            let value = fold_constant(node, &inputs, &specs, &mut program)?;
            let addr = alloc_buffer(&mut specs, value, true, false)?;
            node_outputs.insert(node.id, addr);
            continue;
        }

        // Allocate the output buffer. The SDF output writes a caller
        // binding instead of owned storage.
        let output_addr = if node.kind == OpKind::OutputSdf {
            if program.sdf_output_address.is_some() {
                return Err(CompileFailure::new(
                    Some(node.id),
                    "graph has more than one SDF output node",
                ));
            }
            let addr = alloc_buffer(&mut specs, 0.0, false, true)?;
            program.sdf_output_address = Some(addr);
            program.sdf_output_node_id = Some(node.id);
            addr
        } else {
            let addr = alloc_buffer(&mut specs, 0.0, false, false)?;
            node_outputs.insert(node.id, addr);
            addr
        };

        // Emit the record.
        let op_address = program.operations.len();
        if op_address > u16::MAX as usize {
            return Err(CompileFailure::new(
                Some(node.id),
                "compiled program exceeds the addressable operation space",
            ));
        }
        let param_len_pos =
            bytecode::encode_header(&mut program.operations, node.kind, &inputs, &[output_addr]);
        let mut ctx = CompileContext::new(
            node.id,
            &node.params,
            &mut program.operations,
            &mut program.heap_resources,
        );
        (info.compile_fn)(&mut ctx);
        if ctx.has_error() {
            let message = ctx.take_error().unwrap_or_default();
            return Err(CompileFailure::new(Some(node.id), message));
        }
        bytecode::patch_param_len(&mut program.operations, param_len_pos);

        if item.y_dependent && !seen_y_dependent {
            seen_y_dependent = true;
            program.xzy_start_op_address = op_address as u32;
            program.xzy_start_execution_map_index = program.default_execution_map.len() as u32;
        }
        program.default_execution_map.push(op_address as u16);

        // Dependency bookkeeping: consumer counts per buffer, and which
        // emitted operation produced each of this one's inputs.
        for &addr in &inputs {
            specs[addr as usize].users_count += 1;
        }
        let first_dependency = program.dependency_graph.dependencies.len() as u16;
        for &addr in &inputs {
            if let Some(&producer) = producers.get(&addr) {
                program.dependency_graph.dependencies.push(producer);
            }
        }
        let dep_index = program.dependency_graph.nodes.len() as u16;
        program.dependency_graph.nodes.push(DependencyNode {
            first_dependency,
            end_dependency: program.dependency_graph.dependencies.len() as u16,
            op_address: op_address as u16,
            output_address: output_addr,
            is_output: node.kind == OpKind::OutputSdf,
            node_id: node.id,
        });
        producers.insert(output_addr, dep_index);
    }

    if program.sdf_output_address.is_none() {
        return Err(CompileFailure::new(None, "graph has no SDF output node"));
    }

    if !seen_y_dependent {
        program.xzy_start_op_address = program.operations.len() as u32;
        program.xzy_start_execution_map_index = program.default_execution_map.len() as u32;
    }

    if debug {
        for (&node_id, &addr) in &node_outputs {
            program.output_port_addresses.insert(
                PortLocation {
                    node_id,
                    port_index: 0,
                },
                addr,
            );
        }
    }

    program.buffer_specs = specs;
    program.buffer_count = program.buffer_specs.len() as u16;
    Ok(program)
}

fn alloc_buffer(
    specs: &mut Vec<BufferSpec>,
    constant_value: f32,
    is_constant: bool,
    is_binding: bool,
) -> Result<u16, CompileFailure> {
    if specs.len() >= u16::MAX as usize {
        return Err(CompileFailure::new(
            None,
            "compiled program exceeds the addressable buffer space",
        ));
    }
    let address = specs.len() as u16;
    specs.push(BufferSpec {
        address,
        users_count: 0,
        constant_value,
        is_constant,
        is_binding,
    });
    Ok(address)
}

struct OrderedNode {
    index: usize,
    y_dependent: bool,
}

/// Deterministic execution order: topological, insertion-order tie-break,
/// Y-independent nodes first.
fn ordered_nodes(graph: &ProgramGraph) -> Result<Vec<OrderedNode>, CompileFailure> {
    let nodes = graph.nodes();
    let n = nodes.len();

    let mut indegree = vec![0usize; n];
    let mut successors: Vec<SmallVec<[usize; 4]>> = vec![SmallVec::new(); n];
    for (i, node) in nodes.iter().enumerate() {
        for slot in node.inputs.iter().flatten() {
            let src = graph
                .node_index(slot.node)
                .expect("edges only reference existing nodes");
            successors[src].push(i);
            indegree[i] += 1;
        }
    }

    // Kahn's algorithm over an ordered ready set, so nodes that become
    // runnable together come out in insertion order.
    let mut ready: BTreeSet<usize> = (0..n).filter(|&i| indegree[i] == 0).collect();
    let mut topo = Vec::with_capacity(n);
    while let Some(&i) = ready.iter().next() {
        ready.remove(&i);
        topo.push(i);
        for &succ in &successors[i] {
            indegree[succ] -= 1;
            if indegree[succ] == 0 {
                ready.insert(succ);
            }
        }
    }
    if topo.len() != n {
        let culprit = (0..n).find(|&i| indegree[i] > 0);
        return Err(CompileFailure::new(
            culprit.map(|i| nodes[i].id),
            "graph contains a cycle",
        ));
    }

    // Transitive Y-dependence, propagated in topological order.
    let mut y_dependent = vec![false; n];
    for &i in &topo {
        y_dependent[i] = nodes[i].kind == OpKind::InputY
            || nodes[i]
                .inputs
                .iter()
                .flatten()
                .any(|slot| y_dependent[graph.node_index(slot.node).expect("checked above")]);
    }

    // Stable partition: the Y-independent prefix, then everything else.
    // A Y-dependent node can never feed a Y-independent one, so the
    // partition preserves topological validity.
    let mut order: Vec<OrderedNode> = topo
        .iter()
        .filter(|&&i| !y_dependent[i])
        .map(|&i| OrderedNode {
            index: i,
            y_dependent: false,
        })
        .collect();
    order.extend(
        topo.iter()
            .filter(|&&i| y_dependent[i])
            .map(|&i| OrderedNode {
                index: i,
                y_dependent: true,
            }),
    );
    Ok(order)
}

/// Evaluate a foldable node over its constant inputs by running its own
/// compile and process callbacks against single-element buffers.
fn fold_constant(
    node: &GraphNode,
    inputs: &[u16],
    specs: &[BufferSpec],
    program: &mut Program,
) -> Result<f32, CompileFailure> {
    let info = nodes::info(node.kind);

    let mut scratch = Vec::new();
    let mut ctx = CompileContext::new(
        node.id,
        &node.params,
        &mut scratch,
        &mut program.heap_resources,
    );
    (info.compile_fn)(&mut ctx);
    if ctx.has_error() {
        let message = ctx.take_error().unwrap_or_default();
        return Err(CompileFailure::new(Some(node.id), message));
    }

    let values: SmallVec<[[f32; 1]; 4]> = inputs
        .iter()
        .map(|&a| [specs[a as usize].constant_value])
        .collect();
    let input_slices: SmallVec<[&[f32]; 4]> = values.iter().map(|v| v.as_slice()).collect();
    let mut out = [0.0f32];
    let mut pctx = ProcessBufferContext::new(
        input_slices,
        &mut out,
        &scratch,
        &program.heap_resources,
    );
    (info.process_fn)(&mut pctx);
    drop(pctx);
    Ok(out[0])
}

// ── Tests ───────────────────────────────────────────────────────────

// graph.rs — Authored density graph
//
// The user-facing DAG the compiler consumes: nodes carry an operation
// kind and named parameter fields, edges wire one node's output port to
// another node's named input port. Graphs are built programmatically or
// parsed from the editor's flat `{ nodes, edges }` JSON document.
//
// The graph itself stays dumb: kind semantics live in the operation
// registry, validation beyond wiring (cycles, missing output) happens at
// compile time.

use crate::nodes::{self, OpKind};
use rustc_hash::FxHashMap;
use serde::Deserialize;
use serde_json::Value;
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use thiserror::Error;

/// A node's output port, identified for debug introspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PortLocation {
    pub node_id: u32,
    pub port_index: u32,
}

/// Where an input port gets its value from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortRef {
    pub node: u32,
    pub port: u32,
}

#[derive(Debug, Error)]
pub enum GraphError {
    #[error("unknown node kind `{0}`")]
    UnknownKind(String),
    #[error("node {0} does not exist")]
    UnknownNode(u32),
    #[error("duplicate node id {0}")]
    DuplicateNodeId(u32),
    #[error("kind `{kind}` has no input port named `{port}`")]
    UnknownPort { kind: &'static str, port: String },
    #[error("port index {port} out of range for kind `{kind}`")]
    PortOutOfRange { kind: &'static str, port: u32 },
    #[error("input port {port} of node {node} is already connected")]
    InputAlreadyConnected { node: u32, port: u32 },
    #[error("invalid graph document: {0}")]
    Parse(#[from] serde_json::Error),
}

/// One authored node: a kind plus its named parameter fields.
#[derive(Debug, Clone)]
pub struct GraphNode {
    pub id: u32,
    pub kind: OpKind,
    pub params: HashMap<String, Value>,
    /// One slot per declared input port; `None` means unconnected
    /// (the port's default value applies at compile time).
    pub inputs: Vec<Option<PortRef>>,
}

/// The authored DAG. Node insertion order is preserved and used as the
/// deterministic tie-break for code generation.
#[derive(Debug, Default, Clone)]
pub struct ProgramGraph {
    nodes: Vec<GraphNode>,
    id_to_index: FxHashMap<u32, usize>,
    next_id: u32,
}

// ── JSON document shape ─────────────────────────────────────────────

#[derive(Deserialize)]
struct RawGraph {
    nodes: Vec<RawNode>,
    #[serde(default)]
    edges: Vec<RawEdge>,
}

#[derive(Deserialize)]
struct RawNode {
    id: u32,
    kind: String,
    #[serde(default)]
    params: HashMap<String, Value>,
}

#[derive(Deserialize)]
struct RawEdge {
    source: u32,
    #[serde(default)]
    source_port: u32,
    target: u32,
    /// Destination port name; defaults to the kind's first input port.
    #[serde(default)]
    target_port: Option<String>,
}

impl ProgramGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node, returning its id. Parameter fields are given as
    /// `(name, value)` pairs.
    pub fn create_node(&mut self, kind: OpKind, params: &[(&str, f64)]) -> u32 {
        let id = self.next_id;
        self.insert_node(id, kind, params.iter().map(|&(k, v)| (k.to_string(), Value::from(v))).collect())
            .expect("fresh ids never collide");
        id
    }

    fn insert_node(
        &mut self,
        id: u32,
        kind: OpKind,
        params: HashMap<String, Value>,
    ) -> Result<(), GraphError> {
        if self.id_to_index.contains_key(&id) {
            return Err(GraphError::DuplicateNodeId(id));
        }
        let input_count = nodes::info(kind).inputs.len();
        self.id_to_index.insert(id, self.nodes.len());
        self.nodes.push(GraphNode {
            id,
            kind,
            params,
            inputs: vec![None; input_count],
        });
        self.next_id = self.next_id.max(id + 1);
        Ok(())
    }

    /// Wire `src`'s output port into `dst`'s input port (by index).
    pub fn connect(
        &mut self,
        src: u32,
        src_port: u32,
        dst: u32,
        dst_port: u32,
    ) -> Result<(), GraphError> {
        let src_idx = self.index_of(src)?;
        let src_kind = self.nodes[src_idx].kind;
        // The SDF output writes a caller binding; nothing can read it.
        let available = if src_kind == OpKind::OutputSdf {
            0
        } else {
            nodes::info(src_kind).outputs as u32
        };
        if src_port >= available {
            return Err(GraphError::PortOutOfRange {
                kind: nodes::info(src_kind).name,
                port: src_port,
            });
        }
        let dst_idx = self.index_of(dst)?;
        let dst_node = &mut self.nodes[dst_idx];
        let dst_info = nodes::info(dst_node.kind);
        let slot = dst_node
            .inputs
            .get_mut(dst_port as usize)
            .ok_or(GraphError::PortOutOfRange {
                kind: dst_info.name,
                port: dst_port,
            })?;
        if slot.is_some() {
            return Err(GraphError::InputAlreadyConnected {
                node: dst,
                port: dst_port,
            });
        }
        *slot = Some(PortRef {
            node: src,
            port: src_port,
        });
        Ok(())
    }

    /// Wire by destination port name, the way the editor document does.
    pub fn connect_named(&mut self, src: u32, dst: u32, dst_port: &str) -> Result<(), GraphError> {
        let dst_idx = self.index_of(dst)?;
        let kind = self.nodes[dst_idx].kind;
        let info = nodes::info(kind);
        let port = info
            .inputs
            .iter()
            .position(|p| p.name == dst_port)
            .ok_or_else(|| GraphError::UnknownPort {
                kind: info.name,
                port: dst_port.to_string(),
            })?;
        self.connect(src, 0, dst, port as u32)
    }

    /// Parse the editor's `{ nodes: [...], edges: [...] }` document.
    pub fn from_json(text: &str) -> Result<Self, GraphError> {
        let raw: RawGraph = serde_json::from_str(text)?;
        let mut graph = Self::new();
        for n in raw.nodes {
            let kind =
                OpKind::from_name(&n.kind).ok_or_else(|| GraphError::UnknownKind(n.kind.clone()))?;
            graph.insert_node(n.id, kind, n.params)?;
        }
        for e in raw.edges {
            match &e.target_port {
                Some(name) => graph.connect_named(e.source, e.target, name)?,
                // No port name: wire into the first declared input port.
                None => graph.connect(e.source, e.source_port, e.target, 0)?,
            }
        }
        Ok(graph)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Nodes in insertion order.
    pub fn nodes(&self) -> &[GraphNode] {
        &self.nodes
    }

    pub fn node(&self, id: u32) -> Option<&GraphNode> {
        self.id_to_index.get(&id).map(|&i| &self.nodes[i])
    }

    /// Dense index of a node in insertion order.
    pub fn node_index(&self, id: u32) -> Option<usize> {
        self.id_to_index.get(&id).copied()
    }

    fn index_of(&self, id: u32) -> Result<usize, GraphError> {
        self.id_to_index
            .get(&id)
            .copied()
            .ok_or(GraphError::UnknownNode(id))
    }

    /// Deterministic structural hash: kinds, parameter fields (in sorted
    /// key order) and wiring, independent of map iteration order. Used as
    /// the compiled-program cache key.
    pub fn structural_hash(&self) -> u64 {
        let mut h = DefaultHasher::new();
        self.nodes.len().hash(&mut h);
        for node in &self.nodes {
            node.id.hash(&mut h);
            nodes::info(node.kind).name.hash(&mut h);
            let mut keys: Vec<&String> = node.params.keys().collect();
            keys.sort();
            for key in keys {
                key.hash(&mut h);
                match &node.params[key] {
                    Value::Number(n) => n.as_f64().unwrap_or(0.0).to_bits().hash(&mut h),
                    other => other.to_string().hash(&mut h),
                }
            }
            for input in &node.inputs {
                match input {
                    Some(r) => {
                        1u8.hash(&mut h);
                        r.node.hash(&mut h);
                        r.port.hash(&mut h);
                    }
                    None => 0u8.hash(&mut h),
                }
            }
        }
        h.finish()
    }
}

// ── Tests ───────────────────────────────────────────────────────────

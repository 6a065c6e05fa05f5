// runtime/bytecode.rs — Operation records and dispatch contexts
//
// Operations are serialized as tagged records in one append-only byte
// buffer:
//
//   <op_kind: u8> <input_addrs: u16 × n> <output_addrs: u16 × m>
//   <param_len: u16> <param bytes>
//
// all little-endian, with n and m fixed per kind. Records are decoded
// with explicit offset arithmetic behind the accessors below; nothing
// ever reinterprets the byte buffer in place.
//
// The three context types are the only surface an operation kind sees:
// `CompileContext` while emitting its record, `ProcessBufferContext`
// while computing values, `RangeAnalysisContext` while propagating
// interval bounds.

use crate::interval::Interval;
use crate::nodes::{self, OpKind};
use crate::runtime::program::HeapResource;
use crate::runtime::state::Buffer;
use serde_json::Value;
use smallvec::SmallVec;
use std::collections::HashMap;
use std::ops::Range;

// ── Raw readers ─────────────────────────────────────────────────────

#[inline(always)]
pub fn read_u16(bytes: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([bytes[offset], bytes[offset + 1]])
}

#[inline(always)]
pub fn read_u32(bytes: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        bytes[offset],
        bytes[offset + 1],
        bytes[offset + 2],
        bytes[offset + 3],
    ])
}

#[inline(always)]
pub fn read_f32(bytes: &[u8], offset: usize) -> f32 {
    f32::from_bits(read_u32(bytes, offset))
}

// ── Record encoding ─────────────────────────────────────────────────

/// Append a record header. Returns the byte position of the `param_len`
/// field, to be patched once the compile callback has written its block.
pub fn encode_header(ops: &mut Vec<u8>, kind: OpKind, inputs: &[u16], outputs: &[u16]) -> usize {
    let info = nodes::info(kind);
    debug_assert_eq!(inputs.len(), info.inputs.len());
    debug_assert_eq!(outputs.len(), info.outputs as usize);

    ops.push(kind as u8);
    for &addr in inputs {
        ops.extend_from_slice(&addr.to_le_bytes());
    }
    for &addr in outputs {
        ops.extend_from_slice(&addr.to_le_bytes());
    }
    let param_len_pos = ops.len();
    ops.extend_from_slice(&0u16.to_le_bytes());
    param_len_pos
}

/// Backpatch the `param_len` field after the param block was appended.
pub fn patch_param_len(ops: &mut Vec<u8>, param_len_pos: usize) {
    let len = ops.len() - (param_len_pos + 2);
    assert!(len <= u16::MAX as usize, "operation param block too large");
    ops[param_len_pos..param_len_pos + 2].copy_from_slice(&(len as u16).to_le_bytes());
}

/// One decoded record. Addresses are copied out; `params` indexes back
/// into the operations buffer.
#[derive(Debug, Clone)]
pub struct DecodedOp {
    pub kind: OpKind,
    pub inputs: SmallVec<[u16; 4]>,
    pub outputs: SmallVec<[u16; 2]>,
    pub params: Range<usize>,
    /// Byte address of the next record.
    pub next_address: usize,
}

/// Decode the record starting at `address`.
pub fn decode_op(ops: &[u8], address: usize) -> DecodedOp {
    let kind = OpKind::from_opcode(ops[address]).expect("corrupt operation stream");
    let info = nodes::info(kind);

    let mut cursor = address + 1;
    let mut inputs = SmallVec::new();
    for _ in 0..info.inputs.len() {
        inputs.push(read_u16(ops, cursor));
        cursor += 2;
    }
    let mut outputs = SmallVec::new();
    for _ in 0..info.outputs {
        outputs.push(read_u16(ops, cursor));
        cursor += 2;
    }
    let param_len = read_u16(ops, cursor) as usize;
    cursor += 2;

    DecodedOp {
        kind,
        inputs,
        outputs,
        params: cursor..cursor + param_len,
        next_address: cursor + param_len,
    }
}

// ── Param block builder ─────────────────────────────────────────────

/// Little-endian param block writer for compile callbacks.
#[derive(Default)]
pub struct ParamPack {
    bytes: SmallVec<[u8; 32]>,
}

impl ParamPack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_f32(&mut self, v: f32) -> &mut Self {
        self.bytes.extend_from_slice(&v.to_bits().to_le_bytes());
        self
    }

    pub fn push_u32(&mut self, v: u32) -> &mut Self {
        self.bytes.extend_from_slice(&v.to_le_bytes());
        self
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

// ── Compile context ─────────────────────────────────────────────────

/// Passed to a kind's compile callback while its record is being
/// emitted. Reads authored parameter fields, writes the param block
/// (at most once), registers heap resources, reports fatal errors.
pub struct CompileContext<'a> {
    node_id: u32,
    node_params: &'a HashMap<String, Value>,
    program: &'a mut Vec<u8>,
    params_offset: usize,
    heap_resources: &'a mut Vec<HeapResource>,
    error: Option<String>,
}

impl<'a> CompileContext<'a> {
    pub fn new(
        node_id: u32,
        node_params: &'a HashMap<String, Value>,
        program: &'a mut Vec<u8>,
        heap_resources: &'a mut Vec<HeapResource>,
    ) -> Self {
        let params_offset = program.len();
        Self {
            node_id,
            node_params,
            program,
            params_offset,
            heap_resources,
            error: None,
        }
    }

    pub fn node_id(&self) -> u32 {
        self.node_id
    }

    /// Read an authored parameter field as f32.
    pub fn param_f32(&self, name: &str, default: f32) -> f32 {
        self.node_params
            .get(name)
            .and_then(|v| v.as_f64())
            .map(|v| v as f32)
            .unwrap_or(default)
    }

    /// Read an authored parameter field as i64. Editor documents store
    /// every number as a float, so whole-valued floats are accepted.
    pub fn param_i64(&self, name: &str, default: i64) -> i64 {
        self.node_params
            .get(name)
            .and_then(|v| v.as_i64().or_else(|| v.as_f64().map(|f| f as i64)))
            .unwrap_or(default)
    }

    /// Append the operation's param block. Callable at most once.
    pub fn set_params(&mut self, pack: &ParamPack) {
        assert_eq!(
            self.params_offset,
            self.program.len(),
            "set_params must be called at most once per node"
        );
        self.program.extend_from_slice(pack.bytes());
    }

    /// Hand an owned resource to the program; returns the index the
    /// param block should carry so run-time callbacks can fetch it.
    pub fn add_heap_resource(&mut self, resource: HeapResource) -> u32 {
        self.heap_resources.push(resource);
        (self.heap_resources.len() - 1) as u32
    }

    /// Abort compilation with a node-local message.
    pub fn make_error(&mut self, message: impl Into<String>) {
        self.error = Some(message.into());
    }

    pub fn has_error(&self) -> bool {
        self.error.is_some()
    }

    pub fn take_error(self) -> Option<String> {
        self.error
    }
}

// ── Process context ─────────────────────────────────────────────────

/// Passed to a kind's buffer callback: read-only input views, one
/// mutable output view, the decoded param block, and the program's heap
/// resources. All views share the same logical length.
pub struct ProcessBufferContext<'a> {
    inputs: SmallVec<[&'a [f32]; 4]>,
    pub output: &'a mut [f32],
    params: &'a [u8],
    heap: &'a [HeapResource],
}

impl<'a> ProcessBufferContext<'a> {
    pub fn new(
        inputs: SmallVec<[&'a [f32]; 4]>,
        output: &'a mut [f32],
        params: &'a [u8],
        heap: &'a [HeapResource],
    ) -> Self {
        Self {
            inputs,
            output,
            params,
            heap,
        }
    }

    /// Input buffer view. The returned slice does not borrow the context,
    /// so it can be held across writes to `output`.
    #[inline(always)]
    pub fn input(&self, i: usize) -> &'a [f32] {
        self.inputs[i]
    }

    #[inline(always)]
    pub fn param_f32(&self, offset: usize) -> f32 {
        read_f32(self.params, offset)
    }

    #[inline(always)]
    pub fn param_u32(&self, offset: usize) -> u32 {
        read_u32(self.params, offset)
    }

    /// Fetch a heap resource registered at compile time. Type mismatch is
    /// a compiler bug, not a data error.
    #[inline]
    pub fn heap_resource<T: 'static>(&self, index: u32) -> &'a T {
        self.heap[index as usize]
            .downcast_ref::<T>()
            .expect("heap resource type mismatch")
    }
}

// ── Range analysis context ──────────────────────────────────────────

/// Passed to a kind's range callback: input intervals in, one output
/// interval out. `ignore_input` releases a consumer claim on an input
/// buffer when analysis proves the input does not contribute, which
/// lets the execution-map builder prune the producing operation.
pub struct RangeAnalysisContext<'a> {
    inputs: &'a [u16],
    outputs: &'a [u16],
    params: &'a [u8],
    ranges: &'a mut [Interval],
    buffers: &'a mut [Buffer],
    heap: &'a [HeapResource],
}

impl<'a> RangeAnalysisContext<'a> {
    pub fn new(
        inputs: &'a [u16],
        outputs: &'a [u16],
        params: &'a [u8],
        ranges: &'a mut [Interval],
        buffers: &'a mut [Buffer],
        heap: &'a [HeapResource],
    ) -> Self {
        Self {
            inputs,
            outputs,
            params,
            ranges,
            buffers,
            heap,
        }
    }

    #[inline(always)]
    pub fn input(&self, i: usize) -> Interval {
        self.ranges[self.inputs[i] as usize]
    }

    #[inline(always)]
    pub fn set_output(&mut self, i: usize, range: Interval) {
        self.ranges[self.outputs[i] as usize] = range;
    }

    /// Drop one consumer claim on input `i`'s buffer.
    #[inline]
    pub fn ignore_input(&mut self, i: usize) {
        let buffer = &mut self.buffers[self.inputs[i] as usize];
        buffer.local_users_count = buffer.local_users_count.saturating_sub(1);
    }

    #[inline(always)]
    pub fn param_f32(&self, offset: usize) -> f32 {
        read_f32(self.params, offset)
    }

    #[inline(always)]
    pub fn param_u32(&self, offset: usize) -> u32 {
        read_u32(self.params, offset)
    }

    #[inline]
    pub fn heap_resource<T: 'static>(&self, index: u32) -> &'a T {
        self.heap[index as usize]
            .downcast_ref::<T>()
            .expect("heap resource type mismatch")
    }
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_round_trip() {
        let mut ops = Vec::new();
        let len_pos = encode_header(&mut ops, OpKind::Add, &[3, 7], &[9]);
        patch_param_len(&mut ops, len_pos);

        let decoded = decode_op(&ops, 0);
        assert_eq!(decoded.kind, OpKind::Add);
        assert_eq!(decoded.inputs.as_slice(), &[3, 7]);
        assert_eq!(decoded.outputs.as_slice(), &[9]);
        assert!(decoded.params.is_empty());
        assert_eq!(decoded.next_address, ops.len());
    }

    #[test]
    fn param_block_round_trip() {
        let mut ops = Vec::new();
        let len_pos = encode_header(&mut ops, OpKind::Clamp, &[2], &[4]);
        let mut pack = ParamPack::new();
        pack.push_f32(-1.5).push_f32(2.5);
        ops.extend_from_slice(pack.bytes());
        patch_param_len(&mut ops, len_pos);

        let decoded = decode_op(&ops, 0);
        let params = &ops[decoded.params.clone()];
        assert_eq!(read_f32(params, 0), -1.5);
        assert_eq!(read_f32(params, 4), 2.5);
    }

    #[test]
    fn consecutive_records_chain() {
        let mut ops = Vec::new();
        let p0 = encode_header(&mut ops, OpKind::Negate, &[0], &[1]);
        patch_param_len(&mut ops, p0);
        let second = ops.len();
        let p1 = encode_header(&mut ops, OpKind::Add, &[1, 2], &[3]);
        patch_param_len(&mut ops, p1);

        let first = decode_op(&ops, 0);
        assert_eq!(first.next_address, second);
        let next = decode_op(&ops, first.next_address);
        assert_eq!(next.kind, OpKind::Add);
    }
}

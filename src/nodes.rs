// nodes.rs — The operation catalogue
//
// Every node kind the compiler understands, as a closed registry built
// once at startup. Each kind contributes three callbacks:
//
//   compile — reads authored parameter fields, serializes a fixed-size
//             param block into the operation stream, optionally parks a
//             heap resource on the program
//   process — computes the output buffer from input buffer views,
//             vectorized over the batch length
//   range   — propagates sound interval bounds, optionally releasing
//             consumer claims on inputs analysis proved irrelevant
//
// Constant, the coordinate inputs and the SDF output are special-cased
// by the compiler (constants fold, coordinates and the output bind to
// caller arrays); their entries exist so the registry covers the whole
// opcode space.

use crate::interval::Interval;
use crate::noise;
use crate::runtime::bytecode::{
    CompileContext, ParamPack, ProcessBufferContext, RangeAnalysisContext,
};

/// Operation kinds, in opcode order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum OpKind {
    Constant = 0,
    InputX,
    InputY,
    InputZ,
    OutputSdf,
    Negate,
    Abs,
    Sqrt,
    Floor,
    Square,
    Add,
    Subtract,
    Multiply,
    Divide,
    Min,
    Max,
    Clamp,
    Mix,
    Remap,
    Select,
    SdfPlane,
    SdfSphere,
    SdfBox,
    Noise2D,
    Noise3D,
}

const OP_COUNT: usize = 25;

const ALL_KINDS: [OpKind; OP_COUNT] = [
    OpKind::Constant,
    OpKind::InputX,
    OpKind::InputY,
    OpKind::InputZ,
    OpKind::OutputSdf,
    OpKind::Negate,
    OpKind::Abs,
    OpKind::Sqrt,
    OpKind::Floor,
    OpKind::Square,
    OpKind::Add,
    OpKind::Subtract,
    OpKind::Multiply,
    OpKind::Divide,
    OpKind::Min,
    OpKind::Max,
    OpKind::Clamp,
    OpKind::Mix,
    OpKind::Remap,
    OpKind::Select,
    OpKind::SdfPlane,
    OpKind::SdfSphere,
    OpKind::SdfBox,
    OpKind::Noise2D,
    OpKind::Noise3D,
];

impl OpKind {
    pub fn from_opcode(opcode: u8) -> Option<Self> {
        ALL_KINDS.get(opcode as usize).copied()
    }

    pub fn from_name(name: &str) -> Option<Self> {
        ALL_KINDS.iter().copied().find(|&k| info(k).name == name)
    }

    pub fn name(self) -> &'static str {
        info(self).name
    }
}

pub type CompileFn = fn(&mut CompileContext);
pub type ProcessFn = fn(&mut ProcessBufferContext);
pub type RangeFn = fn(&mut RangeAnalysisContext);

/// One declared input port: name plus the constant applied when the
/// port is left unconnected.
#[derive(Debug, Clone, Copy)]
pub struct PortInfo {
    pub name: &'static str,
    pub default: f32,
}

const fn port(name: &'static str, default: f32) -> PortInfo {
    PortInfo { name, default }
}

/// Registry entry for one operation kind.
pub struct OperationInfo {
    pub name: &'static str,
    pub inputs: &'static [PortInfo],
    pub outputs: u8,
    /// Whether an all-constant-input node may be evaluated at compile
    /// time instead of being emitted.
    pub foldable: bool,
    pub compile_fn: CompileFn,
    pub process_fn: ProcessFn,
    pub range_fn: RangeFn,
}

/// Look up a kind's registry entry.
#[inline]
pub fn info(kind: OpKind) -> &'static OperationInfo {
    &REGISTRY[kind as u8 as usize]
}

/// A seeded noise permutation table parked on the program as a heap
/// resource by the noise compile callbacks.
pub struct PermTable(pub [u8; 512]);

// ── Shared callback helpers ─────────────────────────────────────────

fn compile_none(_ctx: &mut CompileContext) {}

// Constant and the coordinate inputs never become runtime operations;
// the compiler folds or binds them instead.
fn process_never_emitted(_ctx: &mut ProcessBufferContext) {
    unreachable!("constant/binding nodes are never emitted as operations");
}

fn range_never_emitted(_ctx: &mut RangeAnalysisContext) {
    unreachable!("constant/binding nodes are never emitted as operations");
}

#[inline]
fn map_unary(ctx: &mut ProcessBufferContext, f: impl Fn(f32) -> f32) {
    let a = ctx.input(0);
    for (out, &v) in ctx.output.iter_mut().zip(a) {
        *out = f(v);
    }
}

#[inline]
fn map_binary(ctx: &mut ProcessBufferContext, f: impl Fn(f32, f32) -> f32) {
    let a = ctx.input(0);
    let b = ctx.input(1);
    for (i, out) in ctx.output.iter_mut().enumerate() {
        *out = f(a[i], b[i]);
    }
}

// ── Copy (SDF output) ───────────────────────────────────────────────

fn process_copy(ctx: &mut ProcessBufferContext) {
    let src = ctx.input(0);
    let n = ctx.output.len();
    ctx.output.copy_from_slice(&src[..n]);
}

fn range_copy(ctx: &mut RangeAnalysisContext) {
    let r = ctx.input(0);
    ctx.set_output(0, r);
}

// ── Unary math ──────────────────────────────────────────────────────

fn process_negate(ctx: &mut ProcessBufferContext) {
    map_unary(ctx, |v| -v);
}

fn range_negate(ctx: &mut RangeAnalysisContext) {
    let r = -ctx.input(0);
    ctx.set_output(0, r);
}

fn process_abs(ctx: &mut ProcessBufferContext) {
    map_unary(ctx, f32::abs);
}

fn range_abs(ctx: &mut RangeAnalysisContext) {
    let r = ctx.input(0).abs();
    ctx.set_output(0, r);
}

fn process_sqrt(ctx: &mut ProcessBufferContext) {
    // Negative inputs clamp to zero rather than poisoning the buffer
    // with NaNs, mirroring the interval transfer function.
    map_unary(ctx, |v| v.max(0.0).sqrt());
}

fn range_sqrt(ctx: &mut RangeAnalysisContext) {
    let r = ctx.input(0).sqrt();
    ctx.set_output(0, r);
}

fn process_floor(ctx: &mut ProcessBufferContext) {
    map_unary(ctx, f32::floor);
}

fn range_floor(ctx: &mut RangeAnalysisContext) {
    let r = ctx.input(0).floor();
    ctx.set_output(0, r);
}

fn process_square(ctx: &mut ProcessBufferContext) {
    map_unary(ctx, |v| v * v);
}

fn range_square(ctx: &mut RangeAnalysisContext) {
    let r = ctx.input(0).squared();
    ctx.set_output(0, r);
}

// ── Binary math ─────────────────────────────────────────────────────

fn process_add(ctx: &mut ProcessBufferContext) {
    map_binary(ctx, |a, b| a + b);
}

fn range_add(ctx: &mut RangeAnalysisContext) {
    let r = ctx.input(0) + ctx.input(1);
    ctx.set_output(0, r);
}

fn process_subtract(ctx: &mut ProcessBufferContext) {
    map_binary(ctx, |a, b| a - b);
}

fn range_subtract(ctx: &mut RangeAnalysisContext) {
    let r = ctx.input(0) - ctx.input(1);
    ctx.set_output(0, r);
}

fn process_multiply(ctx: &mut ProcessBufferContext) {
    map_binary(ctx, |a, b| a * b);
}

fn range_multiply(ctx: &mut RangeAnalysisContext) {
    let r = ctx.input(0) * ctx.input(1);
    ctx.set_output(0, r);
}

fn process_divide(ctx: &mut ProcessBufferContext) {
    // Division by zero yields zero so a stray zero divisor produces flat
    // terrain instead of NaN holes.
    map_binary(ctx, |a, b| if b == 0.0 { 0.0 } else { a / b });
}

fn range_divide(ctx: &mut RangeAnalysisContext) {
    let r = ctx.input(0).div(ctx.input(1));
    ctx.set_output(0, r);
}

fn process_min(ctx: &mut ProcessBufferContext) {
    map_binary(ctx, f32::min);
}

fn range_min(ctx: &mut RangeAnalysisContext) {
    let r = ctx.input(0).min(ctx.input(1));
    ctx.set_output(0, r);
}

fn process_max(ctx: &mut ProcessBufferContext) {
    map_binary(ctx, f32::max);
}

fn range_max(ctx: &mut RangeAnalysisContext) {
    let r = ctx.input(0).max(ctx.input(1));
    ctx.set_output(0, r);
}

// ── Clamp ───────────────────────────────────────────────────────────

// params: [0] min f32, [4] max f32

fn compile_clamp(ctx: &mut CompileContext) {
    let min = ctx.param_f32("Min", 0.0);
    let max = ctx.param_f32("Max", 1.0);
    if min > max {
        ctx.make_error(format!("clamp range is inverted ({min} > {max})"));
        return;
    }
    let mut pack = ParamPack::new();
    pack.push_f32(min).push_f32(max);
    ctx.set_params(&pack);
}

fn process_clamp(ctx: &mut ProcessBufferContext) {
    let min = ctx.param_f32(0);
    let max = ctx.param_f32(4);
    map_unary(ctx, |v| v.clamp(min, max));
}

fn range_clamp(ctx: &mut RangeAnalysisContext) {
    let min = ctx.param_f32(0);
    let max = ctx.param_f32(4);
    let r = ctx.input(0).clamp(min, max);
    ctx.set_output(0, r);
}

// ── Mix ─────────────────────────────────────────────────────────────

fn process_mix(ctx: &mut ProcessBufferContext) {
    let a = ctx.input(0);
    let b = ctx.input(1);
    let ratio = ctx.input(2);
    for (i, out) in ctx.output.iter_mut().enumerate() {
        *out = a[i] + (b[i] - a[i]) * ratio[i];
    }
}

fn range_mix(ctx: &mut RangeAnalysisContext) {
    let a = ctx.input(0);
    let b = ctx.input(1);
    let ratio = ctx.input(2);
    // A pinned ratio collapses the blend to one side; the other side's
    // contribution is multiplied by exactly zero, so its producer can be
    // dropped from the execution map.
    let r = if ratio.is_single_value() && ratio.lo == 0.0 {
        ctx.ignore_input(1);
        a
    } else if ratio.is_single_value() && ratio.lo == 1.0 {
        ctx.ignore_input(0);
        b
    } else {
        a + (b - a) * ratio
    };
    ctx.set_output(0, r);
}

// ── Remap ───────────────────────────────────────────────────────────

// params: [0] scale f32, [4] offset f32 (precomputed from the authored
// input/output ranges)

fn compile_remap(ctx: &mut CompileContext) {
    let in_min = ctx.param_f32("InMin", -1.0);
    let in_max = ctx.param_f32("InMax", 1.0);
    let out_min = ctx.param_f32("OutMin", 0.0);
    let out_max = ctx.param_f32("OutMax", 1.0);
    if in_min == in_max {
        ctx.make_error(format!("remap input range is empty (InMin == InMax == {in_min})"));
        return;
    }
    let scale = (out_max - out_min) / (in_max - in_min);
    let offset = out_min - in_min * scale;
    let mut pack = ParamPack::new();
    pack.push_f32(scale).push_f32(offset);
    ctx.set_params(&pack);
}

fn process_remap(ctx: &mut ProcessBufferContext) {
    let scale = ctx.param_f32(0);
    let offset = ctx.param_f32(4);
    map_unary(ctx, |v| v * scale + offset);
}

fn range_remap(ctx: &mut RangeAnalysisContext) {
    let scale = ctx.param_f32(0);
    let offset = ctx.param_f32(4);
    let r = ctx.input(0) * Interval::point(scale) + Interval::point(offset);
    ctx.set_output(0, r);
}

// ── Select ──────────────────────────────────────────────────────────

// params: [0] threshold f32

fn compile_select(ctx: &mut CompileContext) {
    let threshold = ctx.param_f32("Threshold", 0.0);
    let mut pack = ParamPack::new();
    pack.push_f32(threshold);
    ctx.set_params(&pack);
}

fn process_select(ctx: &mut ProcessBufferContext) {
    let threshold = ctx.param_f32(0);
    let a = ctx.input(0);
    let b = ctx.input(1);
    let selector = ctx.input(2);
    for (i, out) in ctx.output.iter_mut().enumerate() {
        *out = if selector[i] < threshold { a[i] } else { b[i] };
    }
}

fn range_select(ctx: &mut RangeAnalysisContext) {
    let threshold = ctx.param_f32(0);
    let a = ctx.input(0);
    let b = ctx.input(1);
    let selector = ctx.input(2);
    // When the selector cannot cross the threshold anywhere in the box,
    // only one branch is ever taken there.
    let r = if selector.hi < threshold {
        ctx.ignore_input(1);
        a
    } else if selector.lo >= threshold {
        ctx.ignore_input(0);
        b
    } else {
        a.union(b)
    };
    ctx.set_output(0, r);
}

// ── SDF primitives ──────────────────────────────────────────────────

// SdfPlane params: [0] height f32

fn compile_sdf_plane(ctx: &mut CompileContext) {
    let height = ctx.param_f32("Height", 0.0);
    let mut pack = ParamPack::new();
    pack.push_f32(height);
    ctx.set_params(&pack);
}

fn process_sdf_plane(ctx: &mut ProcessBufferContext) {
    let height = ctx.param_f32(0);
    map_unary(ctx, |y| y - height);
}

fn range_sdf_plane(ctx: &mut RangeAnalysisContext) {
    let height = ctx.param_f32(0);
    let r = ctx.input(0) - Interval::point(height);
    ctx.set_output(0, r);
}

// SdfSphere params: [0] radius f32

fn compile_sdf_sphere(ctx: &mut CompileContext) {
    let radius = ctx.param_f32("Radius", 1.0);
    if radius < 0.0 {
        ctx.make_error(format!("sphere radius must be non-negative, got {radius}"));
        return;
    }
    let mut pack = ParamPack::new();
    pack.push_f32(radius);
    ctx.set_params(&pack);
}

fn process_sdf_sphere(ctx: &mut ProcessBufferContext) {
    let radius = ctx.param_f32(0);
    let x = ctx.input(0);
    let y = ctx.input(1);
    let z = ctx.input(2);
    for (i, out) in ctx.output.iter_mut().enumerate() {
        *out = (x[i] * x[i] + y[i] * y[i] + z[i] * z[i]).sqrt() - radius;
    }
}

fn range_sdf_sphere(ctx: &mut RangeAnalysisContext) {
    let radius = ctx.param_f32(0);
    let (x, y, z) = (ctx.input(0), ctx.input(1), ctx.input(2));
    let length = (x.squared() + y.squared() + z.squared()).sqrt();
    ctx.set_output(0, length - Interval::point(radius));
}

// SdfBox params: [0] half x, [4] half y, [8] half z

fn compile_sdf_box(ctx: &mut CompileContext) {
    let hx = ctx.param_f32("SizeX", 1.0);
    let hy = ctx.param_f32("SizeY", 1.0);
    let hz = ctx.param_f32("SizeZ", 1.0);
    if hx < 0.0 || hy < 0.0 || hz < 0.0 {
        ctx.make_error("box half-extents must be non-negative");
        return;
    }
    let mut pack = ParamPack::new();
    pack.push_f32(hx).push_f32(hy).push_f32(hz);
    ctx.set_params(&pack);
}

fn process_sdf_box(ctx: &mut ProcessBufferContext) {
    let hx = ctx.param_f32(0);
    let hy = ctx.param_f32(4);
    let hz = ctx.param_f32(8);
    let x = ctx.input(0);
    let y = ctx.input(1);
    let z = ctx.input(2);
    for (i, out) in ctx.output.iter_mut().enumerate() {
        let qx = x[i].abs() - hx;
        let qy = y[i].abs() - hy;
        let qz = z[i].abs() - hz;
        let outer = (qx.max(0.0).powi(2) + qy.max(0.0).powi(2) + qz.max(0.0).powi(2)).sqrt();
        let inner = qx.max(qy).max(qz).min(0.0);
        *out = outer + inner;
    }
}

fn range_sdf_box(ctx: &mut RangeAnalysisContext) {
    let h = [ctx.param_f32(0), ctx.param_f32(4), ctx.param_f32(8)];
    let q = [
        ctx.input(0).abs() - Interval::point(h[0]),
        ctx.input(1).abs() - Interval::point(h[1]),
        ctx.input(2).abs() - Interval::point(h[2]),
    ];
    let outer = (q[0].max(Interval::ZERO).squared()
        + q[1].max(Interval::ZERO).squared()
        + q[2].max(Interval::ZERO).squared())
    .sqrt();
    let inner = q[0].max(q[1]).max(q[2]).min(Interval::ZERO);
    ctx.set_output(0, outer + inner);
}

// ── Fractal noise ───────────────────────────────────────────────────

// params: [0] perm table resource index u32, [4] frequency f32,
// [8] octaves u32, [12] persistence f32, [16] lacunarity f32

fn compile_noise(ctx: &mut CompileContext) {
    let seed = ctx.param_i64("Seed", 0) as i32;
    let frequency = ctx.param_f32("Frequency", 0.01);
    let octaves = ctx.param_i64("Octaves", 4);
    let persistence = ctx.param_f32("Persistence", 0.5);
    let lacunarity = ctx.param_f32("Lacunarity", 2.0);

    if !(1..=32).contains(&octaves) {
        ctx.make_error(format!("noise octaves must be in [1, 32], got {octaves}"));
        return;
    }
    if frequency <= 0.0 {
        ctx.make_error(format!("noise frequency must be positive, got {frequency}"));
        return;
    }

    let table = ctx.add_heap_resource(Box::new(PermTable(noise::build_perm_table(seed))));
    let mut pack = ParamPack::new();
    pack.push_u32(table)
        .push_f32(frequency)
        .push_u32(octaves as u32)
        .push_f32(persistence)
        .push_f32(lacunarity);
    ctx.set_params(&pack);
}

struct NoiseParams {
    frequency: f64,
    octaves: u32,
    persistence: f64,
    lacunarity: f64,
}

fn noise_params(param_f32: impl Fn(usize) -> f32, param_u32: impl Fn(usize) -> u32) -> NoiseParams {
    NoiseParams {
        frequency: param_f32(4) as f64,
        octaves: param_u32(8),
        persistence: param_f32(12) as f64,
        lacunarity: param_f32(16) as f64,
    }
}

fn process_noise_2d(ctx: &mut ProcessBufferContext) {
    let perm = ctx.heap_resource::<PermTable>(ctx.param_u32(0));
    let p = noise_params(|o| ctx.param_f32(o), |o| ctx.param_u32(o));
    let x = ctx.input(0);
    let z = ctx.input(1);
    for (i, out) in ctx.output.iter_mut().enumerate() {
        *out = noise::fbm_2d(
            &perm.0,
            x[i] as f64,
            z[i] as f64,
            p.frequency,
            p.octaves,
            p.persistence,
            p.lacunarity,
        ) as f32;
    }
}

fn range_noise_2d(ctx: &mut RangeAnalysisContext) {
    let p = noise_params(|o| ctx.param_f32(o), |o| ctx.param_u32(o));
    let x = ctx.input(0);
    let z = ctx.input(1);
    let r = if x.is_single_value() && z.is_single_value() {
        // The whole box maps to a single noise sample.
        let perm = ctx.heap_resource::<PermTable>(ctx.param_u32(0));
        Interval::point(noise::fbm_2d(
            &perm.0,
            x.lo as f64,
            z.lo as f64,
            p.frequency,
            p.octaves,
            p.persistence,
            p.lacunarity,
        ) as f32)
    } else {
        let amp = noise::fbm_amplitude(p.octaves, p.persistence);
        Interval::new(-amp, amp)
    };
    ctx.set_output(0, r);
}

fn process_noise_3d(ctx: &mut ProcessBufferContext) {
    let perm = ctx.heap_resource::<PermTable>(ctx.param_u32(0));
    let p = noise_params(|o| ctx.param_f32(o), |o| ctx.param_u32(o));
    let x = ctx.input(0);
    let y = ctx.input(1);
    let z = ctx.input(2);
    for (i, out) in ctx.output.iter_mut().enumerate() {
        *out = noise::fbm_3d(
            &perm.0,
            x[i] as f64,
            y[i] as f64,
            z[i] as f64,
            p.frequency,
            p.octaves,
            p.persistence,
            p.lacunarity,
        ) as f32;
    }
}

fn range_noise_3d(ctx: &mut RangeAnalysisContext) {
    let p = noise_params(|o| ctx.param_f32(o), |o| ctx.param_u32(o));
    let (x, y, z) = (ctx.input(0), ctx.input(1), ctx.input(2));
    let r = if x.is_single_value() && y.is_single_value() && z.is_single_value() {
        let perm = ctx.heap_resource::<PermTable>(ctx.param_u32(0));
        Interval::point(noise::fbm_3d(
            &perm.0,
            x.lo as f64,
            y.lo as f64,
            z.lo as f64,
            p.frequency,
            p.octaves,
            p.persistence,
            p.lacunarity,
        ) as f32)
    } else {
        let amp = noise::fbm_amplitude(p.octaves, p.persistence);
        Interval::new(-amp, amp)
    };
    ctx.set_output(0, r);
}

// ── Registry ────────────────────────────────────────────────────────

static REGISTRY: [OperationInfo; OP_COUNT] = [
    OperationInfo {
        name: "Constant",
        inputs: &[],
        outputs: 1,
        foldable: false,
        compile_fn: compile_none,
        process_fn: process_never_emitted,
        range_fn: range_never_emitted,
    },
    OperationInfo {
        name: "InputX",
        inputs: &[],
        outputs: 1,
        foldable: false,
        compile_fn: compile_none,
        process_fn: process_never_emitted,
        range_fn: range_never_emitted,
    },
    OperationInfo {
        name: "InputY",
        inputs: &[],
        outputs: 1,
        foldable: false,
        compile_fn: compile_none,
        process_fn: process_never_emitted,
        range_fn: range_never_emitted,
    },
    OperationInfo {
        name: "InputZ",
        inputs: &[],
        outputs: 1,
        foldable: false,
        compile_fn: compile_none,
        process_fn: process_never_emitted,
        range_fn: range_never_emitted,
    },
    OperationInfo {
        name: "OutputSdf",
        inputs: &[port("Input", 0.0)],
        // The record's output is the caller-bound SDF buffer. The graph
        // layer refuses edges leaving this node.
        outputs: 1,
        foldable: false,
        compile_fn: compile_none,
        process_fn: process_copy,
        range_fn: range_copy,
    },
    OperationInfo {
        name: "Negate",
        inputs: &[port("Input", 0.0)],
        outputs: 1,
        foldable: true,
        compile_fn: compile_none,
        process_fn: process_negate,
        range_fn: range_negate,
    },
    OperationInfo {
        name: "Abs",
        inputs: &[port("Input", 0.0)],
        outputs: 1,
        foldable: true,
        compile_fn: compile_none,
        process_fn: process_abs,
        range_fn: range_abs,
    },
    OperationInfo {
        name: "Sqrt",
        inputs: &[port("Input", 0.0)],
        outputs: 1,
        foldable: true,
        compile_fn: compile_none,
        process_fn: process_sqrt,
        range_fn: range_sqrt,
    },
    OperationInfo {
        name: "Floor",
        inputs: &[port("Input", 0.0)],
        outputs: 1,
        foldable: true,
        compile_fn: compile_none,
        process_fn: process_floor,
        range_fn: range_floor,
    },
    OperationInfo {
        name: "Square",
        inputs: &[port("Input", 0.0)],
        outputs: 1,
        foldable: true,
        compile_fn: compile_none,
        process_fn: process_square,
        range_fn: range_square,
    },
    OperationInfo {
        name: "Add",
        inputs: &[port("A", 0.0), port("B", 0.0)],
        outputs: 1,
        foldable: true,
        compile_fn: compile_none,
        process_fn: process_add,
        range_fn: range_add,
    },
    OperationInfo {
        name: "Subtract",
        inputs: &[port("A", 0.0), port("B", 0.0)],
        outputs: 1,
        foldable: true,
        compile_fn: compile_none,
        process_fn: process_subtract,
        range_fn: range_subtract,
    },
    OperationInfo {
        name: "Multiply",
        inputs: &[port("A", 0.0), port("B", 0.0)],
        outputs: 1,
        foldable: true,
        compile_fn: compile_none,
        process_fn: process_multiply,
        range_fn: range_multiply,
    },
    OperationInfo {
        name: "Divide",
        inputs: &[port("A", 0.0), port("B", 1.0)],
        outputs: 1,
        foldable: true,
        compile_fn: compile_none,
        process_fn: process_divide,
        range_fn: range_divide,
    },
    OperationInfo {
        name: "Min",
        inputs: &[port("A", 0.0), port("B", 0.0)],
        outputs: 1,
        foldable: true,
        compile_fn: compile_none,
        process_fn: process_min,
        range_fn: range_min,
    },
    OperationInfo {
        name: "Max",
        inputs: &[port("A", 0.0), port("B", 0.0)],
        outputs: 1,
        foldable: true,
        compile_fn: compile_none,
        process_fn: process_max,
        range_fn: range_max,
    },
    OperationInfo {
        name: "Clamp",
        inputs: &[port("Input", 0.0)],
        outputs: 1,
        foldable: true,
        compile_fn: compile_clamp,
        process_fn: process_clamp,
        range_fn: range_clamp,
    },
    OperationInfo {
        name: "Mix",
        inputs: &[port("A", 0.0), port("B", 1.0), port("Ratio", 0.5)],
        outputs: 1,
        foldable: true,
        compile_fn: compile_none,
        process_fn: process_mix,
        range_fn: range_mix,
    },
    OperationInfo {
        name: "Remap",
        inputs: &[port("Input", 0.0)],
        outputs: 1,
        foldable: true,
        compile_fn: compile_remap,
        process_fn: process_remap,
        range_fn: range_remap,
    },
    OperationInfo {
        name: "Select",
        inputs: &[port("A", 0.0), port("B", 1.0), port("Selector", 0.0)],
        outputs: 1,
        foldable: true,
        compile_fn: compile_select,
        process_fn: process_select,
        range_fn: range_select,
    },
    OperationInfo {
        name: "SdfPlane",
        inputs: &[port("Y", 0.0)],
        outputs: 1,
        foldable: true,
        compile_fn: compile_sdf_plane,
        process_fn: process_sdf_plane,
        range_fn: range_sdf_plane,
    },
    OperationInfo {
        name: "SdfSphere",
        inputs: &[port("X", 0.0), port("Y", 0.0), port("Z", 0.0)],
        outputs: 1,
        foldable: true,
        compile_fn: compile_sdf_sphere,
        process_fn: process_sdf_sphere,
        range_fn: range_sdf_sphere,
    },
    OperationInfo {
        name: "SdfBox",
        inputs: &[port("X", 0.0), port("Y", 0.0), port("Z", 0.0)],
        outputs: 1,
        foldable: true,
        compile_fn: compile_sdf_box,
        process_fn: process_sdf_box,
        range_fn: range_sdf_box,
    },
    OperationInfo {
        name: "Noise2D",
        inputs: &[port("X", 0.0), port("Z", 0.0)],
        outputs: 1,
        foldable: true,
        compile_fn: compile_noise,
        process_fn: process_noise_2d,
        range_fn: range_noise_2d,
    },
    OperationInfo {
        name: "Noise3D",
        inputs: &[port("X", 0.0), port("Y", 0.0), port("Z", 0.0)],
        outputs: 1,
        foldable: true,
        compile_fn: compile_noise,
        process_fn: process_noise_3d,
        range_fn: range_noise_3d,
    },
];

// ── Tests ───────────────────────────────────────────────────────────

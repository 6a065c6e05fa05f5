// voxelgraph — a compiled runtime for procedural density graphs.
//
// A user-authored DAG of math/noise/SDF nodes is compiled once into a
// compact linear bytecode `Program`, then executed millions of times over
// 3D coordinates. Callers hold a mutable `State` (the buffer pool the
// program writes into) and pick one of two evaluation paths:
//
//   * `generate_single` — one position, one value
//   * `generate_set`    — batched parallel arrays, one callback per op
//
// Between batches, `analyze_range` runs the same bytecode in interval
// arithmetic over a spatial box, and `generate_execution_map` prunes
// operations proven constant over that box so later batches skip them.

pub mod block;
pub mod cache;
pub mod graph;
pub mod interval;
pub mod nodes;
pub mod noise;
pub mod runtime;

pub use block::{generate_block, BlockResult};
pub use cache::ProgramCache;
pub use graph::{GraphError, PortLocation, ProgramGraph};
pub use interval::Interval;
pub use nodes::OpKind;
pub use runtime::{Buffer, CompilationResult, GraphRuntime, State};

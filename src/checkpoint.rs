//! Binary checkpoint codec (spec §4.7).
//!
//! spec.md's narrative first describes a recursive post-order walk per node
//! kind, then clarifies that description doesn't hold once subexpressions
//! are shared: the codec instead walks the DAG's unique nodes — deduplicated
//! by `op_id` — and writes each exactly once, in ascending `op_id` order,
//! preceded by its id. That clarification is what this module implements.
//!
//! No `serde`/`byteorder`: every field here is a fixed-width `u32`/`u64`/`f64`,
//! so std's `to_le_bytes`/`from_le_bytes` is enough, and pulling in a
//! serialization framework for a handful of primitive fields would be
//! needless.

use crate::node::OpNode;
use crate::CheckpointError;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

const MAGIC: u32 = 0x4654_4348; // b"FTCH" read little-endian
const VERSION: u32 = 1;

/// Depth-first walk from `roots`, returning every distinct node reachable
/// (by `op_id`) in ascending `op_id` order. A combined node's delegate is
/// reached as one of its children, so its state is collected the same way as
/// any other node's.
fn collect_unique_nodes(roots: &[Rc<dyn OpNode>]) -> Vec<Rc<dyn OpNode>> {
    let mut seen = HashSet::new();
    let mut nodes = Vec::new();
    let mut stack: Vec<Rc<dyn OpNode>> = roots.to_vec();
    while let Some(node) = stack.pop() {
        if !seen.insert(node.op_id()) {
            continue;
        }
        stack.extend(node.children());
        nodes.push(node);
    }
    nodes.sort_by_key(|n| n.op_id());
    nodes
}

fn read_u32(bytes: &[u8], cursor: &mut usize) -> Result<u32, CheckpointError> {
    let slice = bytes
        .get(*cursor..*cursor + 4)
        .ok_or(CheckpointError::Truncated)?;
    *cursor += 4;
    Ok(u32::from_le_bytes(slice.try_into().expect("4 bytes")))
}

fn read_u64(bytes: &[u8], cursor: &mut usize) -> Result<u64, CheckpointError> {
    let slice = bytes
        .get(*cursor..*cursor + 8)
        .ok_or(CheckpointError::Truncated)?;
    *cursor += 8;
    Ok(u64::from_le_bytes(slice.try_into().expect("8 bytes")))
}

/// Serialize every node reachable from `roots` plus the current tick index.
pub fn save(roots: &[Rc<dyn OpNode>], request_idx: u64) -> Vec<u8> {
    let nodes = collect_unique_nodes(roots);
    let mut out = Vec::new();
    out.extend_from_slice(&MAGIC.to_le_bytes());
    out.extend_from_slice(&VERSION.to_le_bytes());
    out.extend_from_slice(&request_idx.to_le_bytes());
    out.extend_from_slice(&(nodes.len() as u32).to_le_bytes());
    for node in &nodes {
        out.extend_from_slice(&(node.op_id() as u64).to_le_bytes());
        let mut state = Vec::new();
        if node.has_state() {
            node.save_state(&mut state);
        }
        out.extend_from_slice(&(state.len() as u32).to_le_bytes());
        out.extend_from_slice(&state);
    }
    out
}

/// Restore every node reachable from `roots` from a buffer produced by
/// [`save`], returning the tick index evaluation should resume from.
///
/// `roots` must be the root nodes of a tree compiled from the same
/// expression the checkpoint was taken from: the node count and the set of
/// `op_id`s must match exactly, or [`CheckpointError::Mismatch`] is raised.
pub fn load(roots: &[Rc<dyn OpNode>], bytes: &[u8]) -> Result<u64, CheckpointError> {
    let mut cursor = 0usize;
    let magic = read_u32(bytes, &mut cursor)?;
    if magic != MAGIC {
        return Err(CheckpointError::Mismatch);
    }
    let version = read_u32(bytes, &mut cursor)?;
    if version != VERSION {
        return Err(CheckpointError::VersionSkew {
            expected: VERSION,
            found: version,
        });
    }
    let request_idx = read_u64(bytes, &mut cursor)?;
    let node_count = read_u32(bytes, &mut cursor)? as usize;

    let nodes = collect_unique_nodes(roots);
    if nodes.len() != node_count {
        return Err(CheckpointError::Mismatch);
    }
    let by_id: HashMap<u64, &Rc<dyn OpNode>> =
        nodes.iter().map(|n| (n.op_id() as u64, n)).collect();

    for _ in 0..node_count {
        let op_id = read_u64(bytes, &mut cursor)?;
        let state_len = read_u32(bytes, &mut cursor)? as usize;
        let state = bytes
            .get(cursor..cursor + state_len)
            .ok_or(CheckpointError::Truncated)?;
        cursor += state_len;
        let node = by_id.get(&op_id).ok_or(CheckpointError::Mismatch)?;
        if !state.is_empty() {
            let consumed = node.load_state(state)?;
            if consumed != state_len {
                return Err(CheckpointError::Mismatch);
            }
        }
    }
    Ok(request_idx)
}

#[cfg(test)]
mod __tests__ {
    use super::*;
    use crate::builder::BuildCtx;
    use crate::parsing::parse_expr;
    use crate::InitArgs;

    #[test]
    fn resumed_tree_reports_the_saved_request_idx() {
        let ctx = BuildCtx::new(InitArgs::new(2));
        let root = ctx.build(&parse_expr("ts_mean(@x, 3)").unwrap()).unwrap();
        let bytes = save(&[root.clone()], 7);

        let ctx2 = BuildCtx::new(InitArgs::new(2));
        let root2 = ctx2.build(&parse_expr("ts_mean(@x, 3)").unwrap()).unwrap();
        assert_eq!(load(&[root2], &bytes).unwrap(), 7);
    }

    #[test]
    fn mismatched_node_count_is_rejected() {
        let ctx = BuildCtx::new(InitArgs::new(1));
        let root = ctx.build(&parse_expr("ts_mean(@x, 2)").unwrap()).unwrap();
        let bytes = save(&[root.clone()], 0);

        let ctx2 = BuildCtx::new(InitArgs::new(1));
        let root2 = ctx2.build(&parse_expr("add(@x, @y)").unwrap()).unwrap();
        assert_eq!(load(&[root2], &bytes).unwrap_err(), CheckpointError::Mismatch);
    }

    #[test]
    fn bad_magic_is_rejected() {
        let ctx = BuildCtx::new(InitArgs::new(1));
        let root = ctx.build(&parse_expr("@x").unwrap()).unwrap();
        assert_eq!(
            load(&[root], b"not a checkpoint").unwrap_err(),
            CheckpointError::Mismatch
        );
    }
}

//! Consistent hashing ring mapping paths to workers.
//!
//! Each physical worker occupies a configurable number of virtual positions
//! on a circular 64-bit keyspace. A path key is hashed onto the ring and
//! walked clockwise until enough distinct workers are collected. The ring is
//! rebuilt wholesale on every membership refresh, so lookups always observe
//! either the old or the fully-new ring.

use crate::types::WorkerNode;
use std::collections::BTreeMap;
use std::hash::Hasher;
use twox_hash::XxHash64;

/// A consistent hash ring over the current worker membership.
#[derive(Debug, Clone, Default)]
pub struct HashRing {
    /// Virtual positions mapped to their owning physical workers.
    /// BTreeMap keys are strictly increasing ring positions.
    vnodes: BTreeMap<u64, WorkerNode>,

    /// Physical workers in the ring, in insertion order.
    workers: Vec<WorkerNode>,
}

impl HashRing {
    /// Build a ring from a worker list, placing `vnodes_per_worker` virtual
    /// positions per distinct worker. Duplicate workers are ignored.
    pub fn build(workers: &[WorkerNode], vnodes_per_worker: usize) -> Self {
        let mut ring = HashRing::default();
        for worker in workers {
            if ring.workers.contains(worker) {
                continue;
            }
            for i in 0..vnodes_per_worker {
                let vnode_key = format!("{worker}:{i}");
                let hash = hash_key(vnode_key.as_bytes());
                ring.vnodes.insert(hash, worker.clone());
            }
            ring.workers.push(worker.clone());
        }
        ring
    }

    /// Number of physical workers in the ring.
    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Whether the ring has no workers.
    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }

    /// All physical workers in the ring.
    pub fn workers(&self) -> &[WorkerNode] {
        &self.workers
    }

    /// Get the ordered candidate workers for a path key.
    ///
    /// Hashes the key onto the ring and walks clockwise, collecting up to
    /// `count` distinct physical workers. The walk wraps to the minimum ring
    /// position when it runs off the end. Returns fewer than `count` workers
    /// only when the ring holds fewer distinct workers.
    pub fn resolve(&self, key: &str, count: usize) -> Vec<WorkerNode> {
        if self.vnodes.is_empty() || count == 0 {
            return Vec::new();
        }

        let hash = hash_key(key.as_bytes());
        let limit = count.min(self.workers.len());
        let mut owners: Vec<WorkerNode> = Vec::with_capacity(limit);

        let iter = self.vnodes.range(hash..).chain(self.vnodes.iter());
        for (_, worker) in iter {
            if !owners.contains(worker) {
                owners.push(worker.clone());
                if owners.len() >= limit {
                    break;
                }
            }
        }

        owners
    }
}

/// Ring position for a key, using XxHash64 with a fixed seed so routing is
/// stable across processes.
fn hash_key(key: &[u8]) -> u64 {
    let mut hasher = XxHash64::with_seed(0);
    hasher.write(key);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn workers(n: usize) -> Vec<WorkerNode> {
        (0..n)
            .map(|i| WorkerNode::new(format!("worker-{i}"), 28080))
            .collect()
    }

    #[test]
    fn test_empty_ring() {
        let ring = HashRing::build(&[], 16);
        assert!(ring.is_empty());
        assert!(ring.resolve("s3://bucket/key", 1).is_empty());
    }

    #[test]
    fn test_single_worker() {
        let nodes = workers(1);
        let ring = HashRing::build(&nodes, 16);
        assert_eq!(ring.worker_count(), 1);
        assert_eq!(ring.resolve("s3://bucket/key", 1), vec![nodes[0].clone()]);
        // Asking for more than exists caps at the distinct worker count.
        assert_eq!(ring.resolve("s3://bucket/key", 3).len(), 1);
    }

    #[test]
    fn test_resolve_is_deterministic() {
        let ring = HashRing::build(&workers(5), 32);
        let first = ring.resolve("s3://bucket/some/path", 1);
        for _ in 0..100 {
            assert_eq!(ring.resolve("s3://bucket/some/path", 1), first);
        }
    }

    #[test]
    fn test_resolve_distinct_workers() {
        let ring = HashRing::build(&workers(5), 32);
        let owners = ring.resolve("s3://bucket/key", 3);
        assert_eq!(owners.len(), 3);
        for (i, a) in owners.iter().enumerate() {
            for b in &owners[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn test_duplicate_workers_ignored() {
        let mut nodes = workers(2);
        nodes.push(nodes[0].clone());
        let ring = HashRing::build(&nodes, 16);
        assert_eq!(ring.worker_count(), 2);
    }

    #[test]
    fn test_rebuild_identical_membership_routes_identically() {
        // Routing must survive process restarts with unchanged membership.
        let a = HashRing::build(&workers(4), 16);
        let b = HashRing::build(&workers(4), 16);
        for i in 0..200 {
            let key = format!("s3://bucket/file-{i}");
            assert_eq!(a.resolve(&key, 1), b.resolve(&key, 1));
        }
    }

    #[test]
    fn test_distribution_is_roughly_even() {
        let nodes = workers(4);
        let ring = HashRing::build(&nodes, 64);
        let mut counts: HashMap<WorkerNode, usize> = HashMap::new();
        let sample = 10_000;
        for i in 0..sample {
            let key = format!("s3://bucket/file-{i}");
            let owner = ring.resolve(&key, 1).pop().unwrap();
            *counts.entry(owner).or_insert(0) += 1;
        }
        for node in &nodes {
            let count = counts.get(node).copied().unwrap_or(0);
            // Expect ~2500 per worker; allow generous variance.
            assert!(
                count > 1200 && count < 4200,
                "worker {node} got {count} of {sample} keys"
            );
        }
    }

    #[test]
    fn test_single_membership_change_moves_bounded_fraction() {
        // Removing one of five workers should remap roughly 1/5 of keys;
        // keys not owned by the removed worker must keep their owner.
        let before_nodes = workers(5);
        let after_nodes = before_nodes[..4].to_vec();
        let removed = before_nodes[4].clone();
        let before = HashRing::build(&before_nodes, 64);
        let after = HashRing::build(&after_nodes, 64);

        let sample = 10_000;
        let mut moved = 0;
        for i in 0..sample {
            let key = format!("s3://bucket/file-{i}");
            let old = before.resolve(&key, 1).pop().unwrap();
            let new = after.resolve(&key, 1).pop().unwrap();
            if old != new {
                assert_eq!(old, removed, "key {key} moved away from a live worker");
                moved += 1;
            }
        }
        let fraction = moved as f64 / sample as f64;
        assert!(
            fraction < 0.35,
            "expected ~1/5 of keys to move, got {fraction}"
        );
    }
}

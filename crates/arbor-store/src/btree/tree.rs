use super::iter::Range;
use super::node::{Node, NodeId};
use crate::events::{NullObserver, Side, TreeEvent, TreeObserver};
use tracing::trace;

/// An in-memory B+ tree: an ordered key -> value map with logarithmic point
/// operations and a linked leaf chain for range scans.
///
/// Nodes live in an arena and address each other by [`NodeId`], so every
/// structural step fetches a node by id, mutates it, and moves on. Freed
/// nodes go on a free list and are reused by later splits.
///
/// The tree itself permits duplicate keys (a duplicate lands after its
/// equals, and `search` returns the first match in scan order); the table
/// layer above guarantees duplicates never actually occur.
#[derive(Debug, Clone)]
pub struct BPlusTree<K, V> {
    order: usize,
    nodes: Vec<Node<K, V>>,
    free_list: Vec<NodeId>,
    root: NodeId,
    len: usize,
}

impl<K: Ord + Clone, V> BPlusTree<K, V> {
    /// Creates an empty tree of branching order `order` (>= 3). Every node
    /// holds at most `order - 1` keys.
    pub fn new(order: usize) -> Self {
        assert!(order >= 3, "B+ tree order must be at least 3");
        Self {
            order,
            nodes: vec![Node::new_leaf()],
            free_list: Vec::new(),
            root: NodeId(0),
            len: 0,
        }
    }

    pub fn order(&self) -> usize {
        self.order
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Read access to a node, for scans and visualisers.
    pub fn node(&self, id: NodeId) -> &Node<K, V> {
        &self.nodes[id.index()]
    }

    /// Number of levels, counting the root and the leaf level.
    pub fn depth(&self) -> usize {
        let mut depth = 1;
        let mut id = self.root;
        while !self.node(id).leaf {
            id = self.node(id).children[0];
            depth += 1;
        }
        depth
    }

    fn max_keys(&self) -> usize {
        self.order - 1
    }

    fn min_keys(&self) -> usize {
        (self.order - 1) / 2
    }

    fn node_mut(&mut self, id: NodeId) -> &mut Node<K, V> {
        &mut self.nodes[id.index()]
    }

    fn alloc(&mut self, node: Node<K, V>) -> NodeId {
        match self.free_list.pop() {
            Some(id) => {
                self.nodes[id.index()] = node;
                id
            }
            None => {
                let id = NodeId(self.nodes.len() as u32);
                self.nodes.push(node);
                id
            }
        }
    }

    fn release(&mut self, id: NodeId) {
        self.nodes[id.index()] = Node::new_leaf();
        self.free_list.push(id);
    }

    /// Descends to the leaf that holds (or would hold) `key`.
    fn find_leaf(&self, key: &K) -> NodeId {
        let mut id = self.root;
        while !self.node(id).leaf {
            let node = self.node(id);
            id = node.children[node.upper_bound(key)];
        }
        id
    }

    /// Smallest key stored under the subtree rooted at `id`.
    fn subtree_min(&self, id: NodeId) -> K {
        let mut id = id;
        while !self.node(id).leaf {
            id = self.node(id).children[0];
        }
        self.node(id).keys[0].clone()
    }

    // ===== POINT LOOKUPS =====

    /// Returns the value stored for `key`, if any.
    pub fn search(&self, key: &K) -> Option<&V> {
        let node = self.node(self.find_leaf(key));
        let pos = node.lower_bound(key);
        if pos < node.keys.len() && node.keys[pos] == *key {
            Some(&node.values[pos])
        } else {
            None
        }
    }

    /// Overwrites the value for `key` in place. No structural change.
    /// Returns `false` when the key is absent.
    pub fn update(&mut self, key: &K, value: V) -> bool {
        let leaf = self.find_leaf(key);
        let node = self.node_mut(leaf);
        let pos = node.lower_bound(key);
        if pos < node.keys.len() && node.keys[pos] == *key {
            node.values[pos] = value;
            true
        } else {
            false
        }
    }

    // ===== INSERT =====

    pub fn insert(&mut self, key: K, value: V) {
        self.insert_observed(key, value, &mut NullObserver);
    }

    /// Inserts `key -> value`, reporting structural events to `observer`.
    ///
    /// The entry goes into its leaf in sorted position; a node that
    /// overflows past `order - 1` keys is split on the way back up, and the
    /// separator propagates to the parent. If the root splits, a new root is
    /// grown above both halves.
    pub fn insert_observed(&mut self, key: K, value: V, observer: &mut dyn TreeObserver<K>) {
        if let Some((sep, right)) = self.insert_rec(self.root, key, value, observer) {
            let left = self.root;
            let mut root = Node::new_internal();
            root.keys.push(sep);
            root.children.push(left);
            root.children.push(right);
            self.root = self.alloc(root);
        }
        self.len += 1;
    }

    /// Recursive insert; returns the promoted separator and new right
    /// sibling when the node at `id` split.
    fn insert_rec(
        &mut self,
        id: NodeId,
        key: K,
        value: V,
        observer: &mut dyn TreeObserver<K>,
    ) -> Option<(K, NodeId)> {
        let max = self.max_keys();

        if self.node(id).leaf {
            observer.notify(TreeEvent::Insert {
                node: id,
                key: key.clone(),
            });
            let node = self.node_mut(id);
            let pos = node.upper_bound(&key);
            node.keys.insert(pos, key);
            node.values.insert(pos, value);
            if self.node(id).keys.len() > max {
                return Some(self.split_leaf(id, observer));
            }
            return None;
        }

        let idx = self.node(id).upper_bound(&key);
        let child = self.node(id).children[idx];
        let (sep, right) = self.insert_rec(child, key, value, observer)?;

        let node = self.node_mut(id);
        node.keys.insert(idx, sep);
        node.children.insert(idx + 1, right);
        if self.node(id).keys.len() > max {
            return Some(self.split_internal(id, observer));
        }
        None
    }

    /// Splits an overflowing leaf. The right half `[mid..]` moves to a new
    /// leaf, the chain is re-threaded, and the separator is a *copy* of the
    /// right leaf's first key (the entry itself stays in the leaf).
    fn split_leaf(&mut self, id: NodeId, observer: &mut dyn TreeObserver<K>) -> (K, NodeId) {
        let mid = self.order / 2;
        let node = self.node_mut(id);
        let keys = node.keys.split_off(mid);
        let values = node.values.split_off(mid);
        let next = node.next;
        let sep = keys[0].clone();

        let mut right = Node::new_leaf();
        right.keys = keys;
        right.values = values;
        right.next = next;
        let right_id = self.alloc(right);
        self.node_mut(id).next = Some(right_id);

        trace!(left = %id, right = %right_id, "leaf split");
        observer.notify(TreeEvent::Split {
            node: id,
            key: sep.clone(),
        });
        (sep, right_id)
    }

    /// Splits an overflowing internal node. `keys[mid]` is *promoted*, so it
    /// leaves the node entirely, and `[mid+1..]` moves right.
    fn split_internal(&mut self, id: NodeId, observer: &mut dyn TreeObserver<K>) -> (K, NodeId) {
        let mid = self.order / 2;
        let node = self.node_mut(id);
        let mut keys = node.keys.split_off(mid);
        let sep = keys.remove(0);
        let children = node.children.split_off(mid + 1);

        let mut right = Node::new_internal();
        right.keys = keys;
        right.children = children;
        let right_id = self.alloc(right);

        trace!(left = %id, right = %right_id, "internal split");
        observer.notify(TreeEvent::Split {
            node: id,
            key: sep.clone(),
        });
        (sep, right_id)
    }

    // ===== DELETE =====

    pub fn remove(&mut self, key: &K) -> Option<V> {
        self.remove_observed(key, &mut NullObserver)
    }

    /// Removes `key` and returns its value, reporting structural events to
    /// `observer`. Absent keys cause no structural change.
    ///
    /// Underflowing children are repaired on the way back up: borrow from
    /// the left sibling, else from the right, else merge (rightward by
    /// default, leftward for the rightmost child). If the root ends up an
    /// internal node with no keys, its sole child becomes the new root.
    pub fn remove_observed(&mut self, key: &K, observer: &mut dyn TreeObserver<K>) -> Option<V> {
        let value = self.remove_rec(self.root, key, observer)?;

        let root = self.root;
        if !self.node(root).leaf && self.node(root).keys.is_empty() {
            let child = self.node(root).children[0];
            self.release(root);
            self.root = child;
        }
        self.len -= 1;
        Some(value)
    }

    fn remove_rec(
        &mut self,
        id: NodeId,
        key: &K,
        observer: &mut dyn TreeObserver<K>,
    ) -> Option<V> {
        if self.node(id).leaf {
            let node = self.node_mut(id);
            let pos = node.lower_bound(key);
            if pos >= node.keys.len() || node.keys[pos] != *key {
                return None;
            }
            node.keys.remove(pos);
            let value = node.values.remove(pos);
            observer.notify(TreeEvent::Delete {
                node: id,
                key: key.clone(),
            });
            return Some(value);
        }

        let idx = self.node(id).upper_bound(key);
        let child = self.node(id).children[idx];
        let value = self.remove_rec(child, key, observer)?;

        if self.node(child).keys.len() < self.min_keys() {
            self.fill_child(id, idx, observer);
        }

        // A separator equal to the removed key now names a key that is
        // gone; repoint it at the right subtree's new minimum. The slot is
        // recomputed on the mutated node, since a merge may have shifted
        // everything since the descent.
        let sep = self.node(id).upper_bound(key);
        if sep > 0 && self.node(id).keys[sep - 1] == *key {
            let succ = self.subtree_min(self.node(id).children[sep]);
            self.node_mut(id).keys[sep - 1] = succ;
        }

        Some(value)
    }

    /// Brings the child at `idx` back to minimum occupancy.
    fn fill_child(&mut self, parent: NodeId, idx: usize, observer: &mut dyn TreeObserver<K>) {
        let min = self.min_keys();
        let child_count = self.node(parent).children.len();

        let left_spare = idx > 0 && {
            let left = self.node(parent).children[idx - 1];
            self.node(left).keys.len() > min
        };
        if left_spare {
            self.borrow_from_prev(parent, idx, observer);
            return;
        }

        let right_spare = idx + 1 < child_count && {
            let right = self.node(parent).children[idx + 1];
            self.node(right).keys.len() > min
        };
        if right_spare {
            self.borrow_from_next(parent, idx, observer);
        } else if idx + 1 < child_count {
            self.merge_children(parent, idx, observer);
        } else {
            self.merge_children(parent, idx - 1, observer);
        }
    }

    fn borrow_from_prev(&mut self, parent: NodeId, idx: usize, observer: &mut dyn TreeObserver<K>) {
        let (child_id, donor_id) = {
            let p = self.node(parent);
            (p.children[idx], p.children[idx - 1])
        };

        if self.node(child_id).leaf {
            // The donor's last entry moves over; the separator between the
            // two leaves becomes the right leaf's new first key.
            let donor = self.node_mut(donor_id);
            let key = donor.keys.pop().expect("donor leaf has spare entries");
            let value = donor.values.pop().expect("donor leaf has spare entries");
            let sep = key.clone();
            let child = self.node_mut(child_id);
            child.keys.insert(0, key);
            child.values.insert(0, value);
            self.node_mut(parent).keys[idx - 1] = sep;
        } else {
            // Rotate through the parent: separator comes down, the donor's
            // last key goes up, the donor's last child moves across.
            let sep = self.node(parent).keys[idx - 1].clone();
            let donor = self.node_mut(donor_id);
            let up = donor.keys.pop().expect("donor node has spare keys");
            let moved = donor.children.pop().expect("donor node has spare children");
            let child = self.node_mut(child_id);
            child.keys.insert(0, sep);
            child.children.insert(0, moved);
            self.node_mut(parent).keys[idx - 1] = up;
        }

        observer.notify(TreeEvent::Borrow {
            node: child_id,
            side: Side::Left,
        });
    }

    fn borrow_from_next(&mut self, parent: NodeId, idx: usize, observer: &mut dyn TreeObserver<K>) {
        let (child_id, donor_id) = {
            let p = self.node(parent);
            (p.children[idx], p.children[idx + 1])
        };

        if self.node(child_id).leaf {
            let donor = self.node_mut(donor_id);
            let key = donor.keys.remove(0);
            let value = donor.values.remove(0);
            let sep = donor.keys[0].clone();
            let child = self.node_mut(child_id);
            child.keys.push(key);
            child.values.push(value);
            self.node_mut(parent).keys[idx] = sep;
        } else {
            let sep = self.node(parent).keys[idx].clone();
            let donor = self.node_mut(donor_id);
            let up = donor.keys.remove(0);
            let moved = donor.children.remove(0);
            let child = self.node_mut(child_id);
            child.keys.push(sep);
            child.children.push(moved);
            self.node_mut(parent).keys[idx] = up;
        }

        observer.notify(TreeEvent::Borrow {
            node: child_id,
            side: Side::Right,
        });
    }

    /// Merges `children[idx]` and `children[idx + 1]` into the left node and
    /// drops the separator between them. For leaves the separator simply
    /// disappears and the chain is re-threaded; for internal nodes it comes
    /// down between the two halves.
    fn merge_children(&mut self, parent: NodeId, idx: usize, observer: &mut dyn TreeObserver<K>) {
        let (left_id, right_id) = {
            let p = self.node(parent);
            (p.children[idx], p.children[idx + 1])
        };
        let sep = {
            let p = self.node_mut(parent);
            p.children.remove(idx + 1);
            p.keys.remove(idx)
        };

        let right = self.node_mut(right_id);
        let mut keys = std::mem::take(&mut right.keys);
        let mut values = std::mem::take(&mut right.values);
        let mut children = std::mem::take(&mut right.children);
        let next = right.next;

        let left = self.node_mut(left_id);
        if left.leaf {
            left.keys.append(&mut keys);
            left.values.append(&mut values);
            left.next = next;
        } else {
            left.keys.push(sep);
            left.keys.append(&mut keys);
            left.children.append(&mut children);
        }
        self.release(right_id);

        trace!(left = %left_id, right = %right_id, "merged siblings");
        observer.notify(TreeEvent::Merge { node: left_id });
    }

    // ===== SCANS =====

    /// Lazy scan of all entries with `lo <= key <= hi`, in key order.
    pub fn range(&self, lo: &K, hi: &K) -> Range<'_, K, V> {
        let leaf = self.find_leaf(lo);
        let pos = self.node(leaf).lower_bound(lo);
        Range::new(self, leaf, pos, Some(hi.clone()))
    }

    /// Lazy scan of every entry in key order, walking the leaf chain.
    pub fn iter(&self) -> Range<'_, K, V> {
        let mut id = self.root;
        while !self.node(id).leaf {
            id = self.node(id).children[0];
        }
        Range::new(self, id, 0, None)
    }
}

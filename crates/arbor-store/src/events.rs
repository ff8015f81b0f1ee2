use crate::btree::NodeId;

/// Which sibling donated during a rebalance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

/// Structural notifications emitted while the tree mutates.
///
/// Events carry node ids and keys, never formatted text; visualisers decide
/// how to present them. `Split` carries the separator that went up, `Insert`
/// and `Delete` the key and the leaf it landed in or left.
#[derive(Debug, Clone, PartialEq)]
pub enum TreeEvent<K> {
    Insert { node: NodeId, key: K },
    Delete { node: NodeId, key: K },
    Split { node: NodeId, key: K },
    Merge { node: NodeId },
    Borrow { node: NodeId, side: Side },
}

/// Sink for [`TreeEvent`]s.
pub trait TreeObserver<K> {
    fn notify(&mut self, event: TreeEvent<K>);
}

/// Observer that drops every event. Used by the plain mutation methods and
/// by benchmark runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullObserver;

impl<K> TreeObserver<K> for NullObserver {
    fn notify(&mut self, _event: TreeEvent<K>) {}
}

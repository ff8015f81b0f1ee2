use super::node::NodeId;
use super::tree::BPlusTree;

/// Lazy in-order scan over the leaf chain, optionally bounded above
/// (inclusive). Produced by [`BPlusTree::range`] and [`BPlusTree::iter`].
pub struct Range<'a, K, V> {
    tree: &'a BPlusTree<K, V>,
    node: Option<NodeId>,
    pos: usize,
    hi: Option<K>,
}

impl<'a, K, V> Range<'a, K, V> {
    pub(crate) fn new(tree: &'a BPlusTree<K, V>, node: NodeId, pos: usize, hi: Option<K>) -> Self {
        Self {
            tree,
            node: Some(node),
            pos,
            hi,
        }
    }
}

impl<'a, K: Ord + Clone, V> Iterator for Range<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let tree = self.tree;
        loop {
            let id = self.node?;
            let node = tree.node(id);
            if self.pos < node.keys().len() {
                let key = &node.keys()[self.pos];
                if let Some(hi) = &self.hi {
                    if key > hi {
                        // Past the window; the scan is over for good.
                        self.node = None;
                        return None;
                    }
                }
                let value = &node.values()[self.pos];
                self.pos += 1;
                return Some((key, value));
            }
            self.node = node.next();
            self.pos = 0;
        }
    }
}

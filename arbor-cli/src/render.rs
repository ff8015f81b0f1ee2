use arbor_store::BPlusTree;
use std::fmt::Display;

/// Level-order ASCII sketch of a tree: one line per level, `[k ...]` per
/// node, leaves on the last line in chain order.
pub fn render<K: Ord + Clone + Display, V>(tree: &BPlusTree<K, V>) -> String {
    if tree.is_empty() {
        return "(empty index)".to_string();
    }

    let mut out = String::new();
    let mut level = vec![tree.root()];
    while !level.is_empty() {
        let mut next = Vec::new();
        let mut line = String::new();
        for id in level {
            let node = tree.node(id);
            let keys: Vec<String> = node.keys().iter().map(|k| k.to_string()).collect();
            line.push_str(&format!("[{}] ", keys.join(" ")));
            next.extend_from_slice(node.children());
        }
        out.push_str(line.trim_end());
        out.push('\n');
        level = next;
    }
    out
}

//! Dump and integrity checks for troubleshooting.

use std::fmt::{self, Write as _};

use super::Node;

impl fmt::Display for Node {
    /// Indented dump, one node per line:
    ///
    /// ```text
    /// "test"
    ///   [i] "ng" (1)
    ///   [s] "" (1)
    /// ```
    ///
    /// Terminal nodes carry their count in parentheses.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_node(f)
    }
}

impl Node {
    fn write_node(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut stack: Vec<(&Node, Option<u8>, usize)> = vec![(self, None, 0)];
        while let Some((node, idx, depth)) = stack.pop() {
            for _ in 0..depth {
                f.write_str("  ")?;
            }
            if let Some(idx) = idx {
                write!(f, "[{}] ", std::ascii::escape_default(idx))?;
            }
            write!(f, "{:?}", String::from_utf8_lossy(&node.segment))?;
            if node.terminal {
                write!(f, " ({})", node.count)?;
            }
            f.write_char('\n')?;
            for (&child_idx, child) in node.children.iter().rev() {
                stack.push((child, Some(child_idx), depth + 1));
            }
        }
        Ok(())
    }

    /// Verify the structural rules of the subtree rooted here (treated as
    /// the trie root). Returns a list of violations, empty when healthy.
    #[cfg(test)]
    pub(crate) fn check_invariants(&self) -> Vec<String> {
        let mut issues = Vec::new();
        if !self.terminal && self.children.is_empty() && !self.segment.is_empty() {
            issues.push(format!(
                "empty root keeps a dangling segment {:?}",
                String::from_utf8_lossy(&self.segment)
            ));
        }
        self.check_node(&mut issues, &mut Vec::new(), true);
        issues
    }

    #[cfg(test)]
    fn check_node(&self, issues: &mut Vec<String>, path: &mut Vec<u8>, is_root: bool) {
        let mark = path.len();
        path.extend_from_slice(&self.segment);

        if self.terminal && self.count == 0 {
            issues.push(format!("terminal node at {path:?} has count 0"));
        }
        if !self.terminal && self.count != 0 {
            issues.push(format!(
                "non-terminal node at {path:?} has count {}",
                self.count
            ));
        }
        if !is_root && self.is_vacant() {
            issues.push(format!("vacant node at {path:?} was not removed"));
        }
        if !self.terminal && self.children.len() == 1 {
            issues.push(format!("branch point at {path:?} has a single child"));
        }

        for (&idx, child) in &self.children {
            path.push(idx);
            child.check_node(issues, path, false);
            path.pop();
        }
        path.truncate(mark);
    }
}

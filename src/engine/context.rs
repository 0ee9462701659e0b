use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::api::types::BlockType;
use crate::engine::tree::BlockTree;

/// Snapshot of one block selected into the assistant's working set. Holds
/// copies, not references: later edits to the live tree do not reach it.
/// `parent_uuid` records which selection pulled this entry in, so removal
/// can cascade inside the context without consulting the live tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextEntry {
    pub uuid: String,
    pub content: String,
    pub block_type: BlockType,
    pub created_at: DateTime<Utc>,
    pub parent_uuid: Option<String>,
}

/// The working set of block snapshots handed to the assistant as chat
/// context. Independent of the live tree once captured.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChatContext {
    entries: Vec<ContextEntry>,
}

impl ChatContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot a block and all its descendants. Each descendant records its
    /// selecting ancestor as `parent_uuid`; blocks already present are not
    /// duplicated, but their subtrees are still walked.
    pub fn add_block(&mut self, tree: &BlockTree, uuid: &str) {
        self.add_with_parent(tree, uuid, None);
    }

    pub fn add_with_parent(&mut self, tree: &BlockTree, uuid: &str, parent_uuid: Option<&str>) {
        let mut stack: Vec<(String, Option<String>)> =
            vec![(uuid.to_string(), parent_uuid.map(str::to_string))];
        while let Some((current, parent)) = stack.pop() {
            let Some(node) = tree.get(&current) else {
                continue;
            };
            if !self.contains(&current) {
                self.entries.push(ContextEntry {
                    uuid: node.uuid.clone(),
                    content: node.content.clone(),
                    block_type: node.block_type,
                    created_at: Utc::now(),
                    parent_uuid: parent,
                });
            }
            for child in node.children.iter().rev() {
                stack.push((child.clone(), Some(current.clone())));
            }
        }
    }

    /// Remove an entry and everything it pulled in, resolved over the
    /// context's own `parent_uuid` chains, never the live tree, whose shape
    /// may have changed since capture.
    pub fn remove(&mut self, uuid: &str) {
        let mut doomed: HashSet<String> = HashSet::new();
        doomed.insert(uuid.to_string());
        loop {
            let before = doomed.len();
            for entry in &self.entries {
                if let Some(parent) = &entry.parent_uuid {
                    if doomed.contains(parent) {
                        doomed.insert(entry.uuid.clone());
                    }
                }
            }
            if doomed.len() == before {
                break;
            }
        }
        self.entries.retain(|e| !doomed.contains(&e.uuid));
    }

    pub fn contains(&self, uuid: &str) -> bool {
        self.entries.iter().any(|e| e.uuid == uuid)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn entries(&self) -> &[ContextEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

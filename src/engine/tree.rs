use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::api::types::{BlockType, ContentType, RawBlock};

/// One block in the arena. Parent and children are uuid links into the
/// owning [`BlockTree`], never owning references, so the whole structure
/// stays serializable and traversals never recurse through object graphs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockNode {
    pub uuid: String,
    pub content: String,
    pub block_type: BlockType,
    pub content_type: ContentType,
    pub order: i64,
    pub parent: Option<String>,
    pub children: Vec<String>,
    #[serde(skip)]
    pub is_editing: bool,
    #[serde(default)]
    pub properties: HashMap<String, serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_url: Option<String>,
}

/// Flat arena of a page's blocks, keyed by uuid. `roots` holds the
/// page-level sibling set. Every sibling list (roots included) is kept
/// sorted ascending by `order`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BlockTree {
    nodes: HashMap<String, BlockNode>,
    roots: Vec<String>,
}

impl BlockTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Normalize wire blocks into the arena. Accepts flat input (every block
    /// top-level with `parent_uuid` set) or pre-nested input (roots with
    /// `children` populated), or any mix. Replaces prior contents, so a
    /// reload is idempotent. Blocks arriving without an `order` are slotted
    /// after their siblings via the max+1 rule.
    pub fn load(&mut self, raw_blocks: Vec<RawBlock>) {
        self.nodes.clear();
        self.roots.clear();

        // Pass 1: flatten the input with an explicit stack, remembering the
        // enclosing block for nested children. An explicit parent_uuid wins
        // over the inherited one.
        let mut flat: Vec<(RawBlock, Option<String>)> = Vec::new();
        let mut stack: Vec<(RawBlock, Option<String>)> = raw_blocks
            .into_iter()
            .rev()
            .map(|raw| (raw, None))
            .collect();
        while let Some((mut raw, inherited)) = stack.pop() {
            let children = std::mem::take(&mut raw.children);
            let uuid = raw.uuid.clone();
            let parent = raw.parent_uuid.clone().or(inherited);
            for child in children.into_iter().rev() {
                stack.push((child, Some(uuid.clone())));
            }
            flat.push((raw, parent));
        }

        // Pass 2: create every node so parent links can resolve regardless
        // of input order.
        for (raw, parent) in &flat {
            self.nodes.insert(
                raw.uuid.clone(),
                BlockNode {
                    uuid: raw.uuid.clone(),
                    content: raw.content.clone(),
                    block_type: raw.block_type,
                    content_type: raw.content_type,
                    order: 0,
                    parent: parent.clone(),
                    children: Vec::new(),
                    is_editing: false,
                    properties: raw.properties.clone(),
                    media_url: raw.media_url.clone(),
                },
            );
        }

        // Pass 3: link sibling lists in input order, defaulting missing
        // orders as the lists grow.
        for (raw, parent) in &flat {
            // A parent_uuid pointing at nothing we know demotes the block to
            // the root set rather than dropping it.
            let parent = parent
                .as_deref()
                .filter(|p| self.nodes.contains_key(*p))
                .map(str::to_string);
            let order = raw
                .order
                .unwrap_or_else(|| self.next_order(parent.as_deref()));
            if let Some(node) = self.nodes.get_mut(&raw.uuid) {
                node.order = order;
                node.parent = parent.clone();
            }
            match parent {
                Some(p) => {
                    if let Some(parent_node) = self.nodes.get_mut(&p) {
                        parent_node.children.push(raw.uuid.clone());
                    }
                }
                None => self.roots.push(raw.uuid.clone()),
            }
        }

        // Pass 4: every sibling set sorted ascending by order.
        let uuids: Vec<String> = self.nodes.keys().cloned().collect();
        for uuid in uuids {
            self.sort_children(Some(uuid.as_str()));
        }
        self.sort_children(None);
    }

    pub fn get(&self, uuid: &str) -> Option<&BlockNode> {
        self.nodes.get(uuid)
    }

    pub fn get_mut(&mut self, uuid: &str) -> Option<&mut BlockNode> {
        self.nodes.get_mut(uuid)
    }

    pub fn contains(&self, uuid: &str) -> bool {
        self.nodes.contains_key(uuid)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn roots(&self) -> &[String] {
        &self.roots
    }

    pub fn siblings_of(&self, parent: Option<&str>) -> &[String] {
        match parent {
            Some(p) => self
                .nodes
                .get(p)
                .map(|n| n.children.as_slice())
                .unwrap_or(&[]),
            None => &self.roots,
        }
    }

    /// max(sibling orders) + 1, or 0 for an empty sibling set.
    pub fn next_order(&self, parent: Option<&str>) -> i64 {
        self.siblings_of(parent)
            .iter()
            .filter_map(|uuid| self.nodes.get(uuid))
            .map(|n| n.order)
            .max()
            .map(|o| o + 1)
            .unwrap_or(0)
    }

    pub fn previous_sibling(&self, uuid: &str) -> Option<&BlockNode> {
        let node = self.nodes.get(uuid)?;
        let siblings = self.siblings_of(node.parent.as_deref());
        let pos = siblings.iter().position(|s| s == uuid)?;
        if pos == 0 {
            return None;
        }
        self.nodes.get(&siblings[pos - 1])
    }

    /// Depth-first, sibling-order traversal: the canonical document order.
    /// Lazy and restartable; call again for a fresh pass.
    pub fn flatten(&self) -> DocumentOrder<'_> {
        let stack: Vec<&str> = self.roots.iter().rev().map(String::as_str).collect();
        DocumentOrder { tree: self, stack }
    }

    pub fn previous_in_document_order(&self, uuid: &str) -> Option<&BlockNode> {
        let mut prev: Option<&BlockNode> = None;
        for node in self.flatten() {
            if node.uuid == uuid {
                return prev;
            }
            prev = Some(node);
        }
        None
    }

    pub fn next_in_document_order(&self, uuid: &str) -> Option<&BlockNode> {
        let mut take_next = false;
        for node in self.flatten() {
            if take_next {
                return Some(node);
            }
            if node.uuid == uuid {
                take_next = true;
            }
        }
        None
    }

    /// Unlink a block from its parent's children (or the root set). The node
    /// and its subtree stay in the arena; pair with [`attach`] to move it.
    ///
    /// [`attach`]: BlockTree::attach
    pub fn detach(&mut self, uuid: &str) {
        let Some(parent) = self.nodes.get(uuid).map(|n| n.parent.clone()) else {
            return;
        };
        match parent {
            Some(p) => {
                if let Some(parent_node) = self.nodes.get_mut(&p) {
                    parent_node.children.retain(|c| c != uuid);
                }
            }
            None => self.roots.retain(|c| c != uuid),
        }
    }

    /// Link a block under a new parent at the given order, keeping the
    /// sibling list sorted. Call [`detach`] first when moving.
    ///
    /// [`detach`]: BlockTree::detach
    pub fn attach(&mut self, uuid: &str, parent: Option<String>, order: i64) {
        if !self.nodes.contains_key(uuid) {
            return;
        }
        if let Some(p) = parent.as_deref() {
            if !self.nodes.contains_key(p) {
                return;
            }
        }
        let pos = self
            .siblings_of(parent.as_deref())
            .iter()
            .position(|s| {
                self.nodes
                    .get(s)
                    .map(|n| n.order >= order)
                    .unwrap_or(false)
            });
        if let Some(node) = self.nodes.get_mut(uuid) {
            node.parent = parent.clone();
            node.order = order;
        }
        let siblings = match parent {
            Some(p) => match self.nodes.get_mut(&p) {
                Some(parent_node) => &mut parent_node.children,
                None => return,
            },
            None => &mut self.roots,
        };
        match pos {
            Some(i) => siblings.insert(i, uuid.to_string()),
            None => siblings.push(uuid.to_string()),
        }
    }

    /// Add a freshly created block (usually the server's create response) to
    /// the arena and slot it into its sibling list.
    pub fn insert_node(&mut self, node: BlockNode) {
        let uuid = node.uuid.clone();
        let parent = node.parent.clone();
        let order = node.order;
        self.nodes.insert(uuid.clone(), node);
        self.attach(&uuid, parent, order);
    }

    /// Drop a block and its whole subtree from the arena (mirror of the
    /// server-side delete cascade).
    pub fn remove_subtree(&mut self, uuid: &str) {
        self.detach(uuid);
        let mut stack = vec![uuid.to_string()];
        while let Some(current) = stack.pop() {
            if let Some(node) = self.nodes.remove(&current) {
                stack.extend(node.children);
            }
        }
    }

    /// Which block is in edit mode, if any. The editing coordinator keeps
    /// this to at most one per page.
    pub fn editing_uuid(&self) -> Option<String> {
        self.nodes
            .values()
            .find(|n| n.is_editing)
            .map(|n| n.uuid.clone())
    }

    /// Flat export in document order, parent links explicit. `load` of the
    /// result reproduces the tree shape.
    pub fn to_raw(&self) -> Vec<RawBlock> {
        self.flatten()
            .map(|node| RawBlock {
                uuid: node.uuid.clone(),
                content: node.content.clone(),
                block_type: node.block_type,
                content_type: node.content_type,
                order: Some(node.order),
                parent_uuid: node.parent.clone(),
                children: Vec::new(),
                properties: node.properties.clone(),
                media_url: node.media_url.clone(),
            })
            .collect()
    }

    fn sort_children(&mut self, parent: Option<&str>) {
        let mut list = match parent {
            Some(p) => match self.nodes.get(p) {
                Some(n) => n.children.clone(),
                None => return,
            },
            None => self.roots.clone(),
        };
        list.sort_by_key(|uuid| self.nodes.get(uuid).map(|n| n.order).unwrap_or(0));
        match parent {
            Some(p) => {
                if let Some(n) = self.nodes.get_mut(p) {
                    n.children = list;
                }
            }
            None => self.roots = list,
        }
    }
}

/// Lazy depth-first iterator over the tree, driven by an explicit stack.
pub struct DocumentOrder<'a> {
    tree: &'a BlockTree,
    stack: Vec<&'a str>,
}

impl<'a> Iterator for DocumentOrder<'a> {
    type Item = &'a BlockNode;

    fn next(&mut self) -> Option<Self::Item> {
        let uuid = self.stack.pop()?;
        let node = self.tree.nodes.get(uuid)?;
        for child in node.children.iter().rev() {
            self.stack.push(child);
        }
        Some(node)
    }
}

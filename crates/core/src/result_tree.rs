// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Hierarchical component results.
//!
//! Nodes live in an arena indexed by path. Children are stored as index
//! lists so parent and child never hold references to each other.
//! Path insertion order is preserved and is observable in serialization.

use crate::result::UpdateResult;
use crate::state::UpdateState;
use indexmap::IndexMap;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use thiserror::Error;

/// Path of the tree root.
pub const ROOT_PATH: &str = "root";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreeError {
    #[error("invalid component path: {0}")]
    InvalidPath(String),
    #[error("component already linked: {0}")]
    AlreadyLinked(String),
}

/// One component's recorded outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultNode {
    path: String,
    last_reported_state: UpdateState,
    current_state: UpdateState,
    result: UpdateResult,
    children: Vec<usize>,
    linked: bool,
    /// Zero until the node's result is first written.
    stamp: u64,
}

impl ResultNode {
    fn new(path: String) -> Self {
        Self {
            path,
            last_reported_state: UpdateState::Idle,
            current_state: UpdateState::Idle,
            result: UpdateResult::default(),
            children: Vec::new(),
            linked: false,
            stamp: 0,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn last_reported_state(&self) -> UpdateState {
        self.last_reported_state
    }

    pub fn current_state(&self) -> UpdateState {
        self.current_state
    }

    pub fn result(&self) -> &UpdateResult {
        &self.result
    }

    fn is_updated(&self) -> bool {
        self.stamp > 0
    }
}

/// Arena of [`ResultNode`]s keyed by component path.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "IndexMap<String, NodeRecord>")]
pub struct ResultTree {
    nodes: Vec<ResultNode>,
    index: IndexMap<String, usize>,
    clock: u64,
}

impl Default for ResultTree {
    fn default() -> Self {
        Self::new()
    }
}

impl ResultTree {
    pub fn new() -> Self {
        let mut index = IndexMap::new();
        index.insert(ROOT_PATH.to_string(), 0);
        Self {
            nodes: vec![ResultNode::new(ROOT_PATH.to_string())],
            index,
            clock: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.index.contains_key(path)
    }

    pub fn get(&self, path: &str) -> Option<&ResultNode> {
        self.index.get(path).map(|&i| &self.nodes[i])
    }

    pub fn root(&self) -> &ResultNode {
        &self.nodes[0]
    }

    /// Child paths of `path`, in link order.
    pub fn children(&self, path: &str) -> Vec<&str> {
        self.get(path)
            .map(|n| {
                n.children
                    .iter()
                    .map(|&c| self.nodes[c].path.as_str())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn is_linked(&self, path: &str) -> bool {
        self.get(path).is_some_and(|n| n.linked)
    }

    /// Write a node's result and current state, creating the node if its
    /// parent exists. Never touches the children list.
    pub fn upsert(
        &mut self,
        path: &str,
        result: UpdateResult,
        current_state: UpdateState,
    ) -> Result<(), TreeError> {
        let idx = self.ensure_node(path)?;
        self.clock += 1;
        let node = &mut self.nodes[idx];
        node.result = result;
        node.current_state = current_state;
        node.stamp = self.clock;
        Ok(())
    }

    /// Change a node's current state without touching its result.
    pub fn set_state(&mut self, path: &str, current_state: UpdateState) -> Result<(), TreeError> {
        let idx = self.lookup(path)?;
        self.nodes[idx].current_state = current_state;
        Ok(())
    }

    /// Link `child` under `parent`, creating the child if needed.
    ///
    /// `child` must be exactly one path segment below `parent`.
    pub fn add_child(&mut self, parent: &str, child: &str) -> Result<(), TreeError> {
        let parent_idx = self.lookup(parent)?;
        match parent_of(child) {
            Some(p) if p == parent => {}
            _ => return Err(TreeError::InvalidPath(child.to_string())),
        }
        let child_idx = self.ensure_node(child)?;
        if self.nodes[child_idx].linked {
            return Err(TreeError::AlreadyLinked(child.to_string()));
        }
        self.nodes[child_idx].linked = true;
        self.nodes[parent_idx].children.push(child_idx);
        Ok(())
    }

    /// Effective reported result of a node.
    ///
    /// A failed descendant (first in depth-first child order) wins. Otherwise
    /// the most recently updated child subtree decides, falling back to the
    /// node's own result.
    pub fn aggregate(&self, path: &str) -> Result<UpdateResult, TreeError> {
        let idx = self.lookup(path)?;
        Ok(self.aggregate_at(idx).clone())
    }

    /// Record that a report carrying `state` was acknowledged.
    ///
    /// The root always takes the acked state, even if the workflow has moved
    /// on since the report was sent. Components take it only while they are
    /// still in that state.
    pub fn record_reported(&mut self, state: UpdateState) {
        for (i, node) in self.nodes.iter_mut().enumerate() {
            if i == 0 || node.current_state == state {
                node.last_reported_state = state;
            }
        }
    }

    fn aggregate_at(&self, idx: usize) -> &UpdateResult {
        let node = &self.nodes[idx];
        if node.children.is_empty() {
            return &node.result;
        }
        if let Some(failed) = self.first_failed_below(idx) {
            return &self.nodes[failed].result;
        }
        let latest = node
            .children
            .iter()
            .map(|&c| (self.latest_stamp(c), c))
            .filter(|(stamp, _)| *stamp > 0)
            .max_by_key(|(stamp, _)| *stamp);
        match latest {
            Some((_, child)) => self.aggregate_at(child),
            None => &node.result,
        }
    }

    fn first_failed_below(&self, idx: usize) -> Option<usize> {
        for &child in &self.nodes[idx].children {
            let node = &self.nodes[child];
            if node.is_updated() && node.result.is_failure() {
                return Some(child);
            }
            if let Some(found) = self.first_failed_below(child) {
                return Some(found);
            }
        }
        None
    }

    fn latest_stamp(&self, idx: usize) -> u64 {
        let node = &self.nodes[idx];
        node.children
            .iter()
            .map(|&c| self.latest_stamp(c))
            .fold(node.stamp, u64::max)
    }

    fn lookup(&self, path: &str) -> Result<usize, TreeError> {
        self.index
            .get(path)
            .copied()
            .ok_or_else(|| TreeError::InvalidPath(path.to_string()))
    }

    fn ensure_node(&mut self, path: &str) -> Result<usize, TreeError> {
        if let Some(&idx) = self.index.get(path) {
            return Ok(idx);
        }
        let parent = parent_of(path).ok_or_else(|| TreeError::InvalidPath(path.to_string()))?;
        if !self.index.contains_key(parent) {
            return Err(TreeError::InvalidPath(path.to_string()));
        }
        let idx = self.nodes.len();
        self.nodes.push(ResultNode::new(path.to_string()));
        self.index.insert(path.to_string(), idx);
        Ok(idx)
    }
}

/// Parent prefix of a non-root path with a non-empty last segment.
fn parent_of(path: &str) -> Option<&str> {
    let (parent, segment) = path.rsplit_once('/')?;
    if segment.is_empty() || parent.is_empty() {
        return None;
    }
    Some(parent)
}

/// Serialized shape of one node.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeRecord {
    pub last_reported_state: UpdateState,
    pub current_state: UpdateState,
    pub result_code: i32,
    pub extended_result_code: i32,
    #[serde(default)]
    pub result_details: String,
    #[serde(default)]
    pub child_ids: Vec<String>,
    /// Write order of the node's result; zero if never written.
    #[serde(default, skip_serializing_if = "is_zero")]
    pub stamp: u64,
}

fn is_zero(n: &u64) -> bool {
    *n == 0
}

impl Serialize for ResultTree {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.nodes.len()))?;
        for (path, &idx) in &self.index {
            let node = &self.nodes[idx];
            let record = NodeRecord {
                last_reported_state: node.last_reported_state,
                current_state: node.current_state,
                result_code: node.result.result_code,
                extended_result_code: node.result.extended_result_code,
                result_details: node.result.result_details.clone(),
                child_ids: node
                    .children
                    .iter()
                    .map(|&c| self.nodes[c].path.clone())
                    .collect(),
                stamp: node.stamp,
            };
            map.serialize_entry(path, &record)?;
        }
        map.end()
    }
}

impl TryFrom<IndexMap<String, NodeRecord>> for ResultTree {
    type Error = TreeError;

    fn try_from(records: IndexMap<String, NodeRecord>) -> Result<Self, Self::Error> {
        if !records.contains_key(ROOT_PATH) {
            return Err(TreeError::InvalidPath(ROOT_PATH.to_string()));
        }
        let mut tree = ResultTree::new();
        // Files without stamps fall back to recorded order as write order.
        let stamped = records.values().any(|r| r.stamp > 0);
        for (path, record) in &records {
            let result = UpdateResult {
                result_code: record.result_code,
                extended_result_code: record.extended_result_code,
                result_details: record.result_details.clone(),
            };
            let written =
                record.current_state != UpdateState::Idle || result != UpdateResult::default();
            if path != ROOT_PATH && !tree.contains(path) {
                // Parents may appear after children in a hand-edited file.
                let mut missing = Vec::new();
                let mut cursor = parent_of(path);
                while let Some(p) = cursor {
                    if tree.contains(p) {
                        break;
                    }
                    missing.push(p);
                    cursor = parent_of(p);
                }
                for p in missing.into_iter().rev() {
                    tree.ensure_node(p)?;
                }
            }
            let idx = tree.ensure_node(path)?;
            let stamp = if stamped {
                tree.clock = tree.clock.max(record.stamp);
                record.stamp
            } else if written {
                tree.clock += 1;
                tree.clock
            } else {
                0
            };
            let node = &mut tree.nodes[idx];
            node.result = result;
            node.current_state = record.current_state;
            node.last_reported_state = record.last_reported_state;
            node.stamp = stamp;
        }
        for (path, record) in &records {
            for child in &record.child_ids {
                tree.add_child(path, child)?;
            }
        }
        Ok(tree)
    }
}

#[cfg(test)]
#[path = "result_tree_tests.rs"]
mod tests;

//! Project hierarchy traversal: ancestors, descendants, subtrees
//!
//! The hierarchy lives on the server and can change (or contain bad parent
//! links) between fetches, so every walk guards against cycles. Node identity
//! is the project id, never object identity. Trees are built per call and not
//! cached.

use serde::Deserialize;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use crate::error::{Result, TeamCityError};
use crate::invoker::Invoker;
use crate::paging::parse_collection;
use crate::transport::Transport;

/// TeamCity's root project id; ancestor walks stop here.
pub const ROOT_PROJECT_ID: &str = "_Root";

/// A project as returned by the single-entity endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct ProjectRef {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "parentProjectId")]
    pub parent_project_id: Option<String>,
}

/// A node of a materialized subtree. `path` runs from the traversal root to
/// this node, so `path.len() == level + 1` and no id repeats within it.
#[derive(Debug, Clone)]
pub struct HierarchyNode {
    pub id: String,
    pub level: usize,
    pub path: Vec<String>,
    pub children: Vec<HierarchyNode>,
}

/// A project found during a descendant expansion, with its depth relative to
/// the starting node.
#[derive(Debug, Clone)]
pub struct Descendant {
    pub id: String,
    pub name: Option<String>,
    pub level: usize,
}

/// Walks parent/child links through the resilient invoker.
pub struct HierarchyWalker {
    transport: Arc<dyn Transport>,
    invoker: Arc<Invoker>,
    root_id: String,
}

impl HierarchyWalker {
    pub fn new(transport: Arc<dyn Transport>, invoker: Arc<Invoker>) -> Self {
        Self {
            transport,
            invoker,
            root_id: ROOT_PROJECT_ID.to_string(),
        }
    }

    /// Override the root sentinel (e.g. to treat a sub-hierarchy as the top).
    pub fn with_root(mut self, root_id: impl Into<String>) -> Self {
        self.root_id = root_id.into();
        self
    }

    async fn fetch_project(&self, id: &str) -> Result<Value> {
        let path = format!("projects/id:{id}");
        self.invoker.invoke(|| self.transport.get(&path, &[])).await
    }

    async fn fetch_entity(&self, id: &str) -> Result<ProjectRef> {
        let value = self.fetch_project(id).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Direct children of a project, read from the entity's nested
    /// `projects.project` collection. Missing collection means no children.
    async fn fetch_children(&self, id: &str) -> Result<Vec<ProjectRef>> {
        let value = self.fetch_project(id).await?;
        match value.get("projects") {
            Some(nested) => Ok(parse_collection::<ProjectRef>(nested, "project")?.items),
            None => Ok(Vec::new()),
        }
    }

    /// The chain from the hierarchy root down to `id`, inclusive. A parent
    /// lookup that fails with not-found truncates the chain rather than
    /// erroring, so a dangling parent link still yields the part that exists.
    pub async fn ancestors(&self, id: &str) -> Result<Vec<ProjectRef>> {
        let mut chain: Vec<ProjectRef> = Vec::new();
        let mut next = Some(id.to_string());

        while let Some(current) = next.take() {
            let entity = match self.fetch_entity(&current).await {
                Ok(entity) => entity,
                Err(err) if err.is_not_found() && !chain.is_empty() => break,
                Err(err) => return Err(err),
            };

            if chain.iter().any(|p| p.id == entity.id) {
                return Err(TeamCityError::Cycle { id: entity.id });
            }

            next = match &entity.parent_project_id {
                Some(parent) if parent != &self.root_id => Some(parent.clone()),
                _ => None,
            };
            chain.push(entity);
        }

        chain.reverse();
        Ok(chain)
    }

    /// Breadth-first expansion of children down to `max_depth`, returning the
    /// set of reachable projects with their levels. Re-entrant graphs are
    /// tolerated: an id already seen at a shallower or equal level is
    /// recorded once and never re-expanded, which bounds the walk on cycles.
    pub async fn descendants(&self, id: &str, max_depth: usize) -> Result<Vec<Descendant>> {
        let start = self.fetch_entity(id).await?;

        let mut visited: HashMap<String, usize> = HashMap::new();
        let mut result: Vec<Descendant> = Vec::new();
        let mut queue: VecDeque<(ProjectRef, usize)> = VecDeque::new();

        visited.insert(start.id.clone(), 0);
        queue.push_back((start, 0));

        while let Some((project, level)) = queue.pop_front() {
            result.push(Descendant {
                id: project.id.clone(),
                name: project.name.clone(),
                level,
            });

            if level >= max_depth {
                continue;
            }

            for child in self.fetch_children(&project.id).await? {
                match visited.get(&child.id) {
                    Some(&seen) if seen <= level + 1 => continue,
                    _ => {}
                }
                visited.insert(child.id.clone(), level + 1);
                queue.push_back((child, level + 1));
            }
        }

        Ok(result)
    }

    /// Materialize the subtree rooted at `id`, breadth-first, down to
    /// `max_depth`. A node reachable by two different paths appears under
    /// both parents; a node whose id already appears on its own root-to-node
    /// path is a true ancestor cycle and raises [`TeamCityError::Cycle`].
    pub async fn subtree(&self, id: &str, max_depth: usize) -> Result<HierarchyNode> {
        let start = self.fetch_entity(id).await?;

        // Arena-indexed BFS; child indices are always greater than their
        // parent's, which the assembly pass below relies on.
        let mut nodes: Vec<HierarchyNode> = vec![HierarchyNode {
            id: start.id.clone(),
            level: 0,
            path: vec![start.id],
            children: Vec::new(),
        }];
        let mut child_indices: Vec<Vec<usize>> = vec![Vec::new()];
        let mut queue: VecDeque<usize> = VecDeque::from([0]);

        while let Some(index) = queue.pop_front() {
            let (id, level, path) = {
                let node = &nodes[index];
                (node.id.clone(), node.level, node.path.clone())
            };

            if level >= max_depth {
                continue;
            }

            for child in self.fetch_children(&id).await? {
                if path.contains(&child.id) {
                    return Err(TeamCityError::Cycle { id: child.id });
                }

                let mut child_path = path.clone();
                child_path.push(child.id.clone());
                nodes.push(HierarchyNode {
                    id: child.id,
                    level: level + 1,
                    path: child_path,
                    children: Vec::new(),
                });
                child_indices.push(Vec::new());

                let child_index = nodes.len() - 1;
                child_indices[index].push(child_index);
                queue.push_back(child_index);
            }
        }

        Ok(Self::assemble(nodes, child_indices))
    }

    // Attach children bottom-up. Walking indices in reverse guarantees a
    // node's children are complete before the node itself is attached.
    fn assemble(nodes: Vec<HierarchyNode>, child_indices: Vec<Vec<usize>>) -> HierarchyNode {
        let mut slots: Vec<Option<HierarchyNode>> = nodes.into_iter().map(Some).collect();

        for index in (0..slots.len()).rev() {
            let mut children = Vec::new();
            for &child_index in &child_indices[index] {
                if let Some(child) = slots[child_index].take() {
                    children.push(child);
                }
            }
            if let Some(node) = slots[index].as_mut() {
                node.children = children;
            }
        }

        slots[0].take().unwrap_or(HierarchyNode {
            id: String::new(),
            level: 0,
            path: Vec::new(),
            children: Vec::new(),
        })
    }
}

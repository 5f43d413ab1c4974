//! In-Memory Node Store
//!
//! A complete [`NodeStore`] over a process-local map. Serves as the test
//! backend and as a reference for what a SQL-backed implementation must do:
//! instead of translating filter arms to text operators, it evaluates the
//! same abstract predicate against each record directly.
//!
//! Primary keys are assigned on create: a monotonically increasing sequence
//! for integer-keyed tables, UUID v4 for string-keyed tables.

use crate::db::error::DatabaseError;
use crate::db::node_store::NodeStore;
use crate::db::predicate::NodeFilter;
use crate::models::{Node, NodeId, PrimaryKeyType};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, Ordering};
use tokio::sync::RwLock;
use uuid::Uuid;

/// Process-local record store
pub struct MemoryStore {
    nodes: RwLock<BTreeMap<NodeId, Node>>,
    next_id: AtomicI64,
    key_type: PrimaryKeyType,
    default_scope: Option<NodeFilter>,
}

impl MemoryStore {
    pub fn new(key_type: PrimaryKeyType) -> Self {
        Self {
            nodes: RwLock::new(BTreeMap::new()),
            next_id: AtomicI64::new(1),
            key_type,
            default_scope: None,
        }
    }

    /// Apply a default scope to `query_nodes`.
    ///
    /// Mirrors stores that filter queries by default (soft deletes, tenancy);
    /// `query_nodes_unscoped` ignores it.
    pub fn with_default_scope(mut self, scope: NodeFilter) -> Self {
        self.default_scope = Some(scope);
        self
    }

    /// Number of stored records
    pub async fn len(&self) -> usize {
        self.nodes.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.nodes.read().await.is_empty()
    }

    fn assign_id(&self) -> NodeId {
        match self.key_type {
            PrimaryKeyType::Integer => NodeId::Int(self.next_id.fetch_add(1, Ordering::SeqCst)),
            PrimaryKeyType::String => NodeId::Str(Uuid::new_v4().to_string()),
        }
    }
}

#[async_trait]
impl NodeStore for MemoryStore {
    async fn create_node(&self, mut node: Node) -> Result<Node, DatabaseError> {
        let mut nodes = self.nodes.write().await;
        let id = match node.id.clone() {
            Some(id) => {
                if nodes.contains_key(&id) {
                    return Err(DatabaseError::constraint_violation(format!(
                        "duplicate primary key: {id}"
                    )));
                }
                id
            }
            None => self.assign_id(),
        };
        node.id = Some(id.clone());
        node.mark_persisted();
        nodes.insert(id, node.clone());
        Ok(node)
    }

    async fn get_node(&self, id: &NodeId) -> Result<Option<Node>, DatabaseError> {
        Ok(self.nodes.read().await.get(id).cloned())
    }

    async fn update_node(&self, node: &mut Node) -> Result<(), DatabaseError> {
        let id = node.id.clone().ok_or(DatabaseError::UnassignedId)?;
        let mut nodes = self.nodes.write().await;
        if !nodes.contains_key(&id) {
            return Err(DatabaseError::not_found(&id));
        }
        node.mark_persisted();
        nodes.insert(id, node.clone());
        Ok(())
    }

    async fn delete_node(&self, id: &NodeId) -> Result<(), DatabaseError> {
        self.nodes.write().await.remove(id);
        Ok(())
    }

    async fn query_nodes(&self, filter: &NodeFilter) -> Result<Vec<Node>, DatabaseError> {
        Ok(self
            .nodes
            .read()
            .await
            .values()
            .filter(|node| {
                self.default_scope
                    .as_ref()
                    .map_or(true, |scope| scope.matches(node))
                    && filter.matches(node)
            })
            .cloned()
            .collect())
    }

    async fn query_nodes_unscoped(
        &self,
        filter: &NodeFilter,
    ) -> Result<Vec<Node>, DatabaseError> {
        Ok(self
            .nodes
            .read()
            .await
            .values()
            .filter(|node| filter.matches(node))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::predicate::TextMatch;

    fn node_with_ancestry(ancestry: Option<&str>) -> Node {
        let mut node = Node::new();
        node.set_text_attribute("ancestry", ancestry.map(str::to_string));
        node
    }

    #[tokio::test]
    async fn create_assigns_sequential_integer_ids() {
        let store = MemoryStore::new(PrimaryKeyType::Integer);
        let a = store.create_node(Node::new()).await.unwrap();
        let b = store.create_node(Node::new()).await.unwrap();
        assert_eq!(a.id, Some(NodeId::Int(1)));
        assert_eq!(b.id, Some(NodeId::Int(2)));
        assert!(!a.is_new());
    }

    #[tokio::test]
    async fn create_assigns_uuid_string_ids() {
        let store = MemoryStore::new(PrimaryKeyType::String);
        let node = store.create_node(Node::new()).await.unwrap();
        match node.id {
            Some(NodeId::Str(s)) => assert_eq!(s.len(), 36),
            other => panic!("expected string id, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn duplicate_key_is_a_constraint_violation() {
        let store = MemoryStore::new(PrimaryKeyType::Integer);
        let mut node = Node::new();
        node.id = Some(NodeId::Int(7));
        store.create_node(node.clone()).await.unwrap();
        let result = store.create_node(node).await;
        assert!(matches!(
            result,
            Err(DatabaseError::ConstraintViolation { .. })
        ));
    }

    #[tokio::test]
    async fn update_requires_an_existing_record() {
        let store = MemoryStore::new(PrimaryKeyType::Integer);

        let mut unassigned = Node::new();
        assert!(matches!(
            store.update_node(&mut unassigned).await,
            Err(DatabaseError::UnassignedId)
        ));

        let mut ghost = Node::new();
        ghost.id = Some(NodeId::Int(404));
        assert!(matches!(
            store.update_node(&mut ghost).await,
            Err(DatabaseError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn update_resets_change_tracking() {
        let store = MemoryStore::new(PrimaryKeyType::Integer);
        let mut node = store
            .create_node(node_with_ancestry(Some("1")))
            .await
            .unwrap();
        node.set_text_attribute("ancestry", Some("2".to_string()));
        assert!(node.is_changed("ancestry"));
        store.update_node(&mut node).await.unwrap();
        assert!(!node.is_changed("ancestry"));
        assert_eq!(node.text_attribute_was("ancestry"), Some("2"));
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let store = MemoryStore::new(PrimaryKeyType::Integer);
        let node = store.create_node(Node::new()).await.unwrap();
        let id = node.id.unwrap();
        store.delete_node(&id).await.unwrap();
        store.delete_node(&id).await.unwrap();
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn find_node_fails_with_not_found() {
        let store = MemoryStore::new(PrimaryKeyType::Integer);
        let result = store.find_node(&NodeId::Int(404)).await;
        assert!(matches!(result, Err(DatabaseError::NotFound { .. })));
    }

    #[tokio::test]
    async fn default_scope_applies_to_scoped_queries_only() {
        // Default scope hides everything below node 1
        let store = MemoryStore::new(PrimaryKeyType::Integer)
            .with_default_scope(NodeFilter::roots("ancestry"));
        store.create_node(node_with_ancestry(None)).await.unwrap();
        store
            .create_node(node_with_ancestry(Some("1")))
            .await
            .unwrap();

        let all = NodeFilter {
            column: "ancestry".to_string(),
            any_of: vec![TextMatch::Blank, TextMatch::Contains(String::new())],
            ids: Vec::new(),
            depth: Vec::new(),
        };
        assert_eq!(store.query_nodes(&all).await.unwrap().len(), 1);
        assert_eq!(store.query_nodes_unscoped(&all).await.unwrap().len(), 2);
    }
}

//! Tree Service
//!
//! Orchestrates all tree mutations and reads over the record store: keeping
//! every descendant's ancestry consistent when a node is reparented, and
//! deciding the fate of a deleted node's subtree.
//!
//! # Control flow
//!
//! - `save` validates the ancestry attribute, persists the record, and — when
//!   the ancestry changed on an existing record and the new value is sane —
//!   rewrites the stored ancestry of every current descendant in one pass
//! - `destroy` applies the configured orphan strategy before deleting the
//!   record
//! - read operations (`ancestors`, `descendants`, `subtree`, ...) derive id
//!   sets from the ancestry string and hand abstract predicates to the store
//!
//! Descendant sets are always buffered before any rewrite: the matching
//! predicate is evaluated against ancestry strings the same operation is
//! about to change, so mutating while iterating a live query would be
//! unsafe.
//!
//! # Callback suppression
//!
//! Every descendant touched during propagation or orphan handling is written
//! under a scoped [`SuppressionGuard`]: while a node id is suppressed,
//! `save` and `destroy` skip validation, propagation, and orphan handling
//! for that node. The guard removes its ids on drop, also on the error path,
//! so suppression never leaks across unrelated operations.

use crate::db::predicate::{DepthBound, DepthOp, NodeFilter};
use crate::db::NodeStore;
use crate::models::{
    ancestry, lineage, Ancestry, ColumnAccessor, Node, NodeId, OrphanStrategy, TreeConfig,
    ValidationReport,
};
use crate::services::error::TreeError;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

/// Depth-bounding options: `(option key, offset relative to the node's own
/// depth)` pairs, e.g. `("before_depth", 0)` for strict ancestors of the
/// node's level.
pub type DepthOptions<'a> = &'a [(&'a str, i64)];

/// Tree operations over one tree-enabled table.
///
/// Holds the store behind an `Arc` and the per-table [`TreeConfig`], with
/// the configured column names resolved once into typed accessors.
///
/// # Examples
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use treeline_core::db::MemoryStore;
/// use treeline_core::models::{Node, TreeConfig};
/// use treeline_core::services::TreeService;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = TreeConfig::default();
///     let store = Arc::new(MemoryStore::new(config.primary_key_type));
///     let service = TreeService::new(store, config);
///
///     let root = service.create(Node::new()).await?;
///     let mut child = Node::new();
///     service.set_parent(&mut child, Some(&root))?;
///     let child = service.create(child).await?;
///
///     assert_eq!(service.depth(&child)?, 1);
///     Ok(())
/// }
/// ```
pub struct TreeService {
    store: Arc<dyn NodeStore>,
    config: TreeConfig,
    ancestry_column: ColumnAccessor<String>,
    depth_column: ColumnAccessor<i64>,
    suppressed: Mutex<HashSet<NodeId>>,
}

impl TreeService {
    pub fn new(store: Arc<dyn NodeStore>, config: TreeConfig) -> Self {
        let ancestry_column = ColumnAccessor::text(&config.ancestry_column);
        let depth_column = ColumnAccessor::numeric(&config.depth_cache_column);
        Self {
            store,
            config,
            ancestry_column,
            depth_column,
            suppressed: Mutex::new(HashSet::new()),
        }
    }

    /// The underlying record store
    pub fn store(&self) -> &Arc<dyn NodeStore> {
        &self.store
    }

    pub fn config(&self) -> &TreeConfig {
        &self.config
    }

    //
    // VALIDATION
    //

    /// Structural validation of the ancestry attribute.
    ///
    /// Registers every violation in the returned report instead of raising;
    /// `save` refuses to persist a record with a non-empty report.
    pub fn validate(&self, node: &Node) -> ValidationReport {
        let mut report = ValidationReport::new();
        let value = self.ancestry_column.get(node);
        match Ancestry::parse(value.as_deref(), self.config.primary_key_type) {
            Err(error) => report.add(error),
            Ok(parsed) => {
                if let Some(id) = &node.id {
                    if let Err(error) = parsed.assert_excludes(id) {
                        report.add(error);
                    }
                }
            }
        }
        report
    }

    //
    // DERIVATIONS (no store access)
    //

    /// Whether the node has no lineage
    pub fn is_root(&self, node: &Node) -> bool {
        matches!(self.ancestry_column.get(node).as_deref(), None | Some(""))
    }

    pub fn has_parent(&self, node: &Node) -> bool {
        !self.is_root(node)
    }

    /// All ids above the node, de-duplicated across branches
    pub fn ancestor_ids(&self, node: &Node) -> Result<Vec<NodeId>, TreeError> {
        Ok(lineage::ancestor_ids(&self.parse_current(node)?))
    }

    /// The immediate parent along each branch; empty for a root
    pub fn parent_ids(&self, node: &Node) -> Result<Vec<NodeId>, TreeError> {
        Ok(lineage::parent_ids(&self.parse_current(node)?))
    }

    /// The topmost singular node of this node's tree
    pub fn root_id(&self, node: &Node) -> Result<NodeId, TreeError> {
        let parsed = self.parse_current(node)?;
        if parsed.is_root() {
            self.assigned_id(node)
        } else {
            Ok(lineage::root_id(&parsed, &self.assigned_id(node)?))
        }
    }

    /// Count of distinct ancestor ids.
    ///
    /// Naive on purpose: branch topology is ignored, so a node with branches
    /// of different lengths has an ambiguous true depth.
    pub fn depth(&self, node: &Node) -> Result<usize, TreeError> {
        Ok(lineage::depth(&self.parse_current(node)?))
    }

    /// Ancestor ids plus the node's own id, root-first
    pub fn path_ids(&self, node: &Node) -> Result<Vec<NodeId>, TreeError> {
        let parsed = self.parse_current(node)?;
        Ok(lineage::path_ids(&parsed, &self.assigned_id(node)?))
    }

    /// The ancestry value this node's children carry.
    ///
    /// Derived from the *stored* (pre-mutation) value, which is what
    /// existing descendants actually reference.
    ///
    /// # Errors
    ///
    /// `NewRecord` when the node was never persisted.
    pub fn child_ancestry(&self, node: &Node) -> Result<String, TreeError> {
        let id = self.assigned_id(node)?;
        Ok(lineage::child_ancestry(
            node.text_attribute_was(self.ancestry_column.column()),
            &id,
        ))
    }

    /// Recompute the depth cache attribute from the live ancestry.
    ///
    /// Only writes the attribute; persisting it is the caller's save. The
    /// cache is not auto-maintained on every write, so its consistency is
    /// the caller's responsibility.
    pub fn cache_depth(&self, node: &mut Node) -> Result<(), TreeError> {
        let depth = self.depth(node)? as i64;
        self.depth_column.set(node, Some(depth));
        Ok(())
    }

    //
    // PARENT ASSIGNMENT
    //

    /// Point the node's ancestry at a new parent (`None` makes it a root).
    ///
    /// The write only touches the in-memory record; `save` persists it and
    /// moves the node's subtree along.
    pub fn set_parent(&self, node: &mut Node, parent: Option<&Node>) -> Result<(), TreeError> {
        let value = match parent {
            None => None,
            Some(parent) => Some(self.child_ancestry(parent)?),
        };
        self.ancestry_column.set(node, value);
        Ok(())
    }

    /// Resolve a parent id through the store and assign it
    pub async fn set_parent_id(
        &self,
        node: &mut Node,
        parent_id: Option<&NodeId>,
    ) -> Result<(), TreeError> {
        match parent_id {
            None => self.set_parent(node, None),
            Some(parent_id) => {
                let parent = self.store.find_node(parent_id).await?;
                self.set_parent(node, Some(&parent))
            }
        }
    }

    //
    // LOADS
    //

    /// The parent along the primary (first) branch; `None` for a root
    pub async fn parent(&self, node: &Node) -> Result<Option<Node>, TreeError> {
        match self.parent_ids(node)?.first() {
            None => Ok(None),
            Some(parent_id) => Ok(Some(self.store.find_node(parent_id).await?)),
        }
    }

    /// Every immediate parent, one per branch
    pub async fn parents(&self, node: &Node) -> Result<Vec<Node>, TreeError> {
        let mut parents = Vec::new();
        for parent_id in self.parent_ids(node)? {
            parents.push(self.store.find_node(&parent_id).await?);
        }
        Ok(parents)
    }

    /// The root of this node's tree (the node itself when it has no lineage)
    pub async fn root(&self, node: &Node) -> Result<Node, TreeError> {
        let root_id = self.root_id(node)?;
        if Some(&root_id) == node.id.as_ref() {
            Ok(node.clone())
        } else {
            Ok(self.store.find_node(&root_id).await?)
        }
    }

    /// All nodes above this one
    pub async fn ancestors(
        &self,
        node: &Node,
        depth_options: DepthOptions<'_>,
    ) -> Result<Vec<Node>, TreeError> {
        let filter = NodeFilter::among_ids(self.ancestry_column.column(), self.ancestor_ids(node)?);
        self.query_scoped(node, filter, depth_options).await
    }

    /// All nodes above this one, including it
    pub async fn path(
        &self,
        node: &Node,
        depth_options: DepthOptions<'_>,
    ) -> Result<Vec<Node>, TreeError> {
        let filter = NodeFilter::among_ids(self.ancestry_column.column(), self.path_ids(node)?);
        self.query_scoped(node, filter, depth_options).await
    }

    /// All nodes below this one
    pub async fn descendants(
        &self,
        node: &Node,
        depth_options: DepthOptions<'_>,
    ) -> Result<Vec<Node>, TreeError> {
        let filter =
            NodeFilter::descendants_of(self.ancestry_column.column(), &self.assigned_id(node)?);
        self.query_scoped(node, filter, depth_options).await
    }

    pub async fn descendant_ids(
        &self,
        node: &Node,
        depth_options: DepthOptions<'_>,
    ) -> Result<Vec<NodeId>, TreeError> {
        Ok(ids_of(self.descendants(node, depth_options).await?))
    }

    /// This node and everything below it
    pub async fn subtree(
        &self,
        node: &Node,
        depth_options: DepthOptions<'_>,
    ) -> Result<Vec<Node>, TreeError> {
        let filter =
            NodeFilter::subtree_of(self.ancestry_column.column(), &self.assigned_id(node)?);
        self.query_scoped(node, filter, depth_options).await
    }

    pub async fn subtree_ids(
        &self,
        node: &Node,
        depth_options: DepthOptions<'_>,
    ) -> Result<Vec<NodeId>, TreeError> {
        Ok(ids_of(self.subtree(node, depth_options).await?))
    }

    /// Ancestors plus subtree: every node this one is wired to, above and
    /// below
    pub async fn lineage_ids(&self, node: &Node) -> Result<Vec<NodeId>, TreeError> {
        let mut ids = self.ancestor_ids(node)?;
        ids.extend(self.subtree_ids(node, &[]).await?);
        Ok(ids)
    }

    pub async fn lineage(
        &self,
        node: &Node,
        depth_options: DepthOptions<'_>,
    ) -> Result<Vec<Node>, TreeError> {
        let filter =
            NodeFilter::among_ids(self.ancestry_column.column(), self.lineage_ids(node).await?);
        self.query_scoped(node, filter, depth_options).await
    }

    /// Direct children: records whose ancestry equals this node's child
    /// ancestry
    pub async fn children(&self, node: &Node) -> Result<Vec<Node>, TreeError> {
        let filter =
            NodeFilter::children_with(self.ancestry_column.column(), &self.child_ancestry(node)?);
        Ok(self.store.query_nodes(&filter).await?)
    }

    pub async fn child_ids(&self, node: &Node) -> Result<Vec<NodeId>, TreeError> {
        Ok(ids_of(self.children(node).await?))
    }

    pub async fn has_children(&self, node: &Node) -> Result<bool, TreeError> {
        Ok(!self.children(node).await?.is_empty())
    }

    pub async fn is_childless(&self, node: &Node) -> Result<bool, TreeError> {
        Ok(self.children(node).await?.is_empty())
    }

    /// The sibling group: records sharing this node's ancestry value,
    /// including the node itself
    pub async fn siblings(&self, node: &Node) -> Result<Vec<Node>, TreeError> {
        let value = self.ancestry_column.get(node);
        let filter = NodeFilter::siblings_with(self.ancestry_column.column(), value.as_deref());
        Ok(self.store.query_nodes(&filter).await?)
    }

    pub async fn sibling_ids(&self, node: &Node) -> Result<Vec<NodeId>, TreeError> {
        Ok(ids_of(self.siblings(node).await?))
    }

    /// All records with no lineage
    pub async fn roots(&self) -> Result<Vec<Node>, TreeError> {
        let filter = NodeFilter::roots(self.ancestry_column.column());
        Ok(self.store.query_nodes(&filter).await?)
    }

    //
    // WRITE FLOWS
    //

    /// Validate and persist a new record.
    ///
    /// # Errors
    ///
    /// `ValidationFailed` when the ancestry attribute is malformed; store
    /// errors propagate unchanged.
    pub async fn create(&self, node: Node) -> Result<Node, TreeError> {
        let report = self.validate(&node);
        if !report.is_ok() {
            return Err(TreeError::ValidationFailed(report));
        }
        let created = self.store.create_node(node).await?;
        tracing::debug!(id = %display_id(&created), "created node");
        Ok(created)
    }

    /// Validate and persist a record, moving its subtree when the ancestry
    /// attribute changed.
    ///
    /// For an existing record whose ancestry changed, the stored ancestry of
    /// every current descendant is rewritten in one pass: the leading old
    /// child-ancestry prefix is replaced by the new one. Descendants are
    /// enumerated against the unscoped record set, so records the store's
    /// default scope hides still move with their parent.
    ///
    /// Propagation is skipped entirely when the node is suppressed (it is
    /// being rewritten as part of an enclosing subtree operation) or when
    /// the new value is not sane — a malformed prefix must not be pushed
    /// into descendants.
    ///
    /// There is no multi-record atomicity here: a store failure mid-pass
    /// leaves the subtree partially rewritten, and the caller's transaction
    /// boundary is what makes the whole move atomic.
    pub async fn save(&self, node: &mut Node) -> Result<(), TreeError> {
        if node.is_new() {
            let created = self.create(node.clone()).await?;
            *node = created;
            return Ok(());
        }

        let id = self.assigned_id(node)?;
        if self.is_suppressed(&id) {
            self.store.update_node(node).await?;
            return Ok(());
        }

        let report = self.validate(node);
        if !report.is_ok() {
            return Err(TreeError::ValidationFailed(report));
        }

        // Plan the rewrite before persisting: the old prefix comes from the
        // pre-mutation stored value, which update_node resets.
        let new_value = self.ancestry_column.get(node);
        let plan = if node.is_changed(self.ancestry_column.column())
            && ancestry::is_sane(new_value.as_deref(), Some(&id), self.config.primary_key_type)
        {
            let old_prefix = self.child_ancestry(node)?;
            let new_prefix = match new_value.as_deref() {
                None | Some("") => id.to_string(),
                Some(value) => format!("{}/{}", value, id),
            };
            Some((old_prefix, new_prefix))
        } else {
            None
        };

        self.store.update_node(node).await?;

        if let Some((old_prefix, new_prefix)) = plan {
            self.propagate_prefix(&id, &old_prefix, &new_prefix).await?;
        }
        Ok(())
    }

    /// Delete a record, resolving its descendants first.
    ///
    /// The configured [`OrphanStrategy`] decides what happens to the
    /// subtree; under `Restrict` the delete is refused outright and nothing
    /// is touched.
    pub async fn destroy(&self, node: &Node) -> Result<(), TreeError> {
        let id = self.assigned_id(node)?;
        if !self.is_suppressed(&id) {
            self.apply_orphan_strategy(node, &id).await?;
        }
        self.store.delete_node(&id).await?;
        tracing::debug!(id = %id, "deleted node");
        Ok(())
    }

    //
    // INTERNALS
    //

    async fn apply_orphan_strategy(&self, node: &Node, id: &NodeId) -> Result<(), TreeError> {
        let strategy = self.config.orphan_strategy;
        let descendants = self.unscoped_descendants(id).await?;
        if descendants.is_empty() {
            return Ok(());
        }
        tracing::info!(
            id = %id,
            strategy = ?strategy,
            descendants = descendants.len(),
            "resolving orphans"
        );

        match strategy {
            OrphanStrategy::Restrict => {
                return Err(TreeError::has_descendants(id.clone()));
            }
            OrphanStrategy::Destroy => {
                for descendant in descendants {
                    let Some(descendant_id) = descendant.id.clone() else {
                        continue;
                    };
                    let _guard = self.suppress(vec![descendant_id]);
                    Box::pin(self.destroy(&descendant)).await?;
                }
            }
            OrphanStrategy::Rootify => {
                let child_ancestry = self.child_ancestry(node)?;
                let stripped_prefix = format!("{}/", child_ancestry);
                for mut descendant in descendants {
                    let Some(descendant_id) = descendant.id.clone() else {
                        continue;
                    };
                    let new_value = match self.ancestry_column.get(&descendant) {
                        None => None,
                        Some(value) if value == child_ancestry => None,
                        Some(value) => match value.strip_prefix(&stripped_prefix) {
                            Some(rest) => Some(rest.to_string()),
                            None => Some(value),
                        },
                    };
                    self.ancestry_column.set(&mut descendant, new_value);
                    let _guard = self.suppress(vec![descendant_id]);
                    Box::pin(self.save(&mut descendant)).await?;
                }
            }
            OrphanStrategy::Adopt => {
                for mut descendant in descendants {
                    let Some(descendant_id) = descendant.id.clone() else {
                        continue;
                    };
                    let parsed = self.parse_current(&descendant)?;
                    let branches: Vec<Vec<NodeId>> = parsed
                        .branches()
                        .iter()
                        .map(|chain| chain.iter().filter(|nid| *nid != id).cloned().collect())
                        .filter(|chain: &Vec<NodeId>| !chain.is_empty())
                        .collect();
                    let new_value = Ancestry::from_branches(branches).serialize();
                    self.ancestry_column.set(&mut descendant, new_value);
                    let _guard = self.suppress(vec![descendant_id]);
                    Box::pin(self.save(&mut descendant)).await?;
                }
            }
        }
        Ok(())
    }

    /// One-pass descendant rewrite after a reparent.
    ///
    /// Each descendant is visited exactly once; the textual prefix
    /// replacement captures the whole remaining chain, so no recursion is
    /// needed.
    async fn propagate_prefix(
        &self,
        id: &NodeId,
        old_prefix: &str,
        new_prefix: &str,
    ) -> Result<(), TreeError> {
        let descendants = self.unscoped_descendants(id).await?;
        if descendants.is_empty() {
            return Ok(());
        }
        tracing::debug!(
            id = %id,
            old_prefix,
            new_prefix,
            descendants = descendants.len(),
            "rewriting descendant ancestry"
        );

        for mut descendant in descendants {
            let Some(descendant_id) = descendant.id.clone() else {
                continue;
            };
            let Some(value) = self.ancestry_column.get(&descendant) else {
                continue;
            };
            // Anchored at the start: only the leading occurrence moves.
            let Some(rest) = value.strip_prefix(old_prefix) else {
                continue;
            };
            self.ancestry_column
                .set(&mut descendant, Some(format!("{}{}", new_prefix, rest)));
            let _guard = self.suppress(vec![descendant_id]);
            Box::pin(self.save(&mut descendant)).await?;
        }
        Ok(())
    }

    /// Buffered descendant snapshot, bypassing the store's default scope
    async fn unscoped_descendants(&self, id: &NodeId) -> Result<Vec<Node>, TreeError> {
        let filter = NodeFilter::descendants_of(self.ancestry_column.column(), id);
        Ok(self.store.query_nodes_unscoped(&filter).await?)
    }

    async fn query_scoped(
        &self,
        node: &Node,
        filter: NodeFilter,
        depth_options: DepthOptions<'_>,
    ) -> Result<Vec<Node>, TreeError> {
        let filter = filter.with_depth(self.depth_bounds(node, depth_options)?);
        Ok(self.store.query_nodes(&filter).await?)
    }

    /// Translate relative depth options into absolute bounds on the cached
    /// depth column.
    ///
    /// # Errors
    ///
    /// `UnknownDepthOption` for an unrecognized key; `MissingDepthColumn`
    /// when bounding is requested while depth caching is off.
    fn depth_bounds(
        &self,
        node: &Node,
        depth_options: DepthOptions<'_>,
    ) -> Result<Vec<DepthBound>, TreeError> {
        if depth_options.is_empty() {
            return Ok(Vec::new());
        }
        let own_depth = self.depth(node)? as i64;
        let mut bounds = Vec::new();
        for (key, relative) in depth_options.iter().copied() {
            let op = DepthOp::from_key(key).ok_or_else(|| TreeError::unknown_depth_option(key))?;
            if !self.config.cache_depth {
                return Err(TreeError::MissingDepthColumn);
            }
            bounds.push(DepthBound::new(
                self.depth_column.column(),
                op,
                own_depth + relative,
            ));
        }
        Ok(bounds)
    }

    fn parse_current(&self, node: &Node) -> Result<Ancestry, TreeError> {
        let value = self.ancestry_column.get(node);
        Ok(Ancestry::parse(
            value.as_deref(),
            self.config.primary_key_type,
        )?)
    }

    fn assigned_id(&self, node: &Node) -> Result<NodeId, TreeError> {
        if node.is_new() {
            return Err(TreeError::NewRecord);
        }
        node.id.clone().ok_or(TreeError::NewRecord)
    }

    fn is_suppressed(&self, id: &NodeId) -> bool {
        self.suppressed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(id)
    }

    /// Suppress tree callbacks for the given ids until the guard drops
    fn suppress(&self, ids: Vec<NodeId>) -> SuppressionGuard<'_> {
        let mut set = self
            .suppressed
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let added = ids.into_iter().filter(|id| set.insert(id.clone())).collect();
        SuppressionGuard {
            set: &self.suppressed,
            added,
        }
    }
}

/// Scoped callback suppression.
///
/// Restores the prior suppression state on drop, including when the
/// enclosing operation bails out early with an error.
struct SuppressionGuard<'a> {
    set: &'a Mutex<HashSet<NodeId>>,
    added: Vec<NodeId>,
}

impl Drop for SuppressionGuard<'_> {
    fn drop(&mut self) {
        let mut set = self.set.lock().unwrap_or_else(PoisonError::into_inner);
        for id in &self.added {
            set.remove(id);
        }
    }
}

fn ids_of(nodes: Vec<Node>) -> Vec<NodeId> {
    nodes.into_iter().filter_map(|node| node.id).collect()
}

fn display_id(node: &Node) -> String {
    node.id
        .as_ref()
        .map(ToString::to_string)
        .unwrap_or_else(|| "?".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use crate::models::PrimaryKeyType;

    fn service() -> TreeService {
        let config = TreeConfig::default();
        let store = Arc::new(MemoryStore::new(PrimaryKeyType::Integer));
        TreeService::new(store, config)
    }

    #[test]
    fn suppression_guard_restores_state_on_drop() {
        let service = service();
        let id = NodeId::Int(1);
        assert!(!service.is_suppressed(&id));
        {
            let _guard = service.suppress(vec![id.clone()]);
            assert!(service.is_suppressed(&id));
        }
        assert!(!service.is_suppressed(&id));
    }

    #[test]
    fn nested_guards_do_not_unsuppress_early() {
        let service = service();
        let id = NodeId::Int(1);
        let _outer = service.suppress(vec![id.clone()]);
        {
            // The inner guard added nothing, so dropping it changes nothing
            let _inner = service.suppress(vec![id.clone()]);
        }
        assert!(service.is_suppressed(&id));
    }

    #[test]
    fn guard_only_removes_its_own_ids() {
        let service = service();
        let one = NodeId::Int(1);
        let two = NodeId::Int(2);
        let _outer = service.suppress(vec![one.clone()]);
        {
            let _inner = service.suppress(vec![one.clone(), two.clone()]);
            assert!(service.is_suppressed(&two));
        }
        assert!(service.is_suppressed(&one));
        assert!(!service.is_suppressed(&two));
    }
}

#[cfg(test)]
#[path = "tree_service_test.rs"]
mod tree_service_test;

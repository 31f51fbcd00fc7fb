//! SurrealStore - GraphStore Implementation for SurrealDB
//!
//! This module implements the `GraphStore` trait on top of an embedded
//! SurrealDB instance.
//!
//! # Design Principles
//!
//! 1. **Embedded engines**: `kv-surrealkv` for on-disk persistence, `kv-mem`
//!    for tests and ephemeral runs
//! 2. **SCHEMALESS tables**: `nodes`, `horizons` and `entities` hold plain
//!    documents; the `data` payload of a node is stored as-is
//! 3. **Record IDs**: `table:uuid` where the uuid is the caller-visible id, also
//!    kept in a `uuid` field so query results map back without parsing things
//! 4. **Transactions**: batch writes run inside `BEGIN/COMMIT TRANSACTION`
//!
//! # Examples
//!
//! ```rust,no_run
//! use horizon_core::db::{GraphStore, SurrealStore};
//! use std::path::PathBuf;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let store = SurrealStore::new(PathBuf::from("./data/horizon.db")).await?;
//!     let node = store.get_node("550e8400-e29b-41d4-a716-446655440000").await?;
//!     Ok(())
//! }
//! ```

use crate::db::error::DatabaseError;
use crate::db::graph_store::GraphStore;
use crate::models::{Entity, EntityKind, Node, NodeType, Position, Workspace};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use surrealdb::engine::local::{Db, Mem, SurrealKv};
use surrealdb::Surreal;

const NAMESPACE: &str = "horizon";
const DATABASE: &str = "graph";

/// Fixed-width RFC 3339 so that string order matches time order
fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .with_context(|| format!("Invalid stored timestamp: {}", raw))
}

/// Stored shape of a node document
#[derive(Debug, Clone, Serialize, Deserialize)]
struct NodeRecord {
    uuid: String,
    workspace_id: String,
    owner_id: String,
    node_type: NodeType,
    #[serde(default)]
    parent_id: Option<String>,
    #[serde(default)]
    children: Vec<String>,
    #[serde(default)]
    input_node_ids: Vec<String>,
    #[serde(default)]
    child_node_ids: Vec<String>,
    #[serde(default)]
    position: Position,
    #[serde(default)]
    data: Value,
    #[serde(default)]
    selected: bool,
    is_active: bool,
    #[serde(default)]
    execution_order: Option<i64>,
    created_at: String,
    updated_at: String,
}

impl From<Node> for NodeRecord {
    fn from(node: Node) -> Self {
        Self {
            uuid: node.id,
            workspace_id: node.workspace_id,
            owner_id: node.owner_id,
            node_type: node.node_type,
            parent_id: node.parent_id,
            children: node.children,
            input_node_ids: node.input_node_ids,
            child_node_ids: node.child_node_ids,
            position: node.position,
            data: node.data,
            selected: node.selected,
            is_active: node.is_active,
            execution_order: node.execution_order,
            created_at: format_timestamp(&node.created_at),
            updated_at: format_timestamp(&node.updated_at),
        }
    }
}

impl TryFrom<NodeRecord> for Node {
    type Error = anyhow::Error;

    fn try_from(record: NodeRecord) -> Result<Self> {
        Ok(Node {
            created_at: parse_timestamp(&record.created_at)?,
            updated_at: parse_timestamp(&record.updated_at)?,
            id: record.uuid,
            workspace_id: record.workspace_id,
            owner_id: record.owner_id,
            node_type: record.node_type,
            parent_id: record.parent_id,
            children: record.children,
            input_node_ids: record.input_node_ids,
            child_node_ids: record.child_node_ids,
            position: record.position,
            data: record.data,
            selected: record.selected,
            is_active: record.is_active,
            execution_order: record.execution_order,
        })
    }
}

/// Stored shape of a workspace document
#[derive(Debug, Clone, Serialize, Deserialize)]
struct WorkspaceRecord {
    uuid: String,
    owner_id: String,
    name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    editors: Vec<String>,
    is_active: bool,
    #[serde(default)]
    node_count: i64,
    #[serde(default)]
    edge_count: i64,
    created_at: String,
    updated_at: String,
}

impl From<Workspace> for WorkspaceRecord {
    fn from(ws: Workspace) -> Self {
        Self {
            uuid: ws.id,
            owner_id: ws.owner_id,
            name: ws.name,
            description: ws.description,
            editors: ws.editors,
            is_active: ws.is_active,
            node_count: ws.node_count as i64,
            edge_count: ws.edge_count as i64,
            created_at: format_timestamp(&ws.created_at),
            updated_at: format_timestamp(&ws.updated_at),
        }
    }
}

impl TryFrom<WorkspaceRecord> for Workspace {
    type Error = anyhow::Error;

    fn try_from(record: WorkspaceRecord) -> Result<Self> {
        Ok(Workspace {
            created_at: parse_timestamp(&record.created_at)?,
            updated_at: parse_timestamp(&record.updated_at)?,
            id: record.uuid,
            owner_id: record.owner_id,
            name: record.name,
            description: record.description,
            editors: record.editors,
            is_active: record.is_active,
            node_count: record.node_count.max(0) as u64,
            edge_count: record.edge_count.max(0) as u64,
        })
    }
}

/// Stored shape of a related entity document
#[derive(Debug, Clone, Serialize, Deserialize)]
struct EntityRecord {
    uuid: String,
    kind: EntityKind,
    #[serde(default)]
    workspace_id: Option<String>,
    #[serde(default)]
    is_system: bool,
    name: String,
    #[serde(default)]
    data: Value,
    is_active: bool,
    created_at: String,
}

impl From<Entity> for EntityRecord {
    fn from(entity: Entity) -> Self {
        Self {
            uuid: entity.id,
            kind: entity.kind,
            workspace_id: entity.workspace_id,
            is_system: entity.is_system,
            name: entity.name,
            data: entity.data,
            is_active: entity.is_active,
            created_at: format_timestamp(&entity.created_at),
        }
    }
}

impl TryFrom<EntityRecord> for Entity {
    type Error = anyhow::Error;

    fn try_from(record: EntityRecord) -> Result<Self> {
        Ok(Entity {
            created_at: parse_timestamp(&record.created_at)?,
            id: record.uuid,
            kind: record.kind,
            workspace_id: record.workspace_id,
            is_system: record.is_system,
            name: record.name,
            data: record.data,
            is_active: record.is_active,
        })
    }
}

fn into_models<R, M>(records: Vec<R>) -> Result<Vec<M>>
where
    M: TryFrom<R, Error = anyhow::Error>,
{
    records.into_iter().map(M::try_from).collect()
}

/// SurrealDB-backed [`GraphStore`]
#[derive(Clone)]
pub struct SurrealStore {
    db: Arc<Surreal<Db>>,
}

impl SurrealStore {
    /// Open (or create) an on-disk store at `db_path`
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - The parent directory cannot be created
    /// - The SurrealKV engine fails to open the path
    /// - Schema initialization fails
    pub async fn new(db_path: PathBuf) -> Result<Self, DatabaseError> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let target = db_path.display().to_string();
        let db = Surreal::new::<SurrealKv>(db_path)
            .await
            .map_err(|e| DatabaseError::connection_failed(target, e))?;

        Self::initialize(db).await
    }

    /// Create a store on the in-memory engine; nothing survives the process
    pub async fn new_in_memory() -> Result<Self, DatabaseError> {
        let db = Surreal::new::<Mem>(())
            .await
            .map_err(|e| DatabaseError::connection_failed("memory", e))?;

        Self::initialize(db).await
    }

    async fn initialize(db: Surreal<Db>) -> Result<Self, DatabaseError> {
        db.use_ns(NAMESPACE)
            .use_db(DATABASE)
            .await
            .map_err(|e| DatabaseError::initialization_failed(e.to_string()))?;

        Self::initialize_schema(&db).await?;

        Ok(Self { db: Arc::new(db) })
    }

    /// Define tables and the indexes backing descendant lookup and output history
    async fn initialize_schema(db: &Surreal<Db>) -> Result<(), DatabaseError> {
        db.query(
            "
            DEFINE TABLE IF NOT EXISTS nodes SCHEMALESS;
            DEFINE TABLE IF NOT EXISTS horizons SCHEMALESS;
            DEFINE TABLE IF NOT EXISTS entities SCHEMALESS;

            DEFINE INDEX IF NOT EXISTS idx_nodes_workspace_parent
                ON TABLE nodes FIELDS workspace_id, parent_id;
            DEFINE INDEX IF NOT EXISTS idx_nodes_workspace_type_created
                ON TABLE nodes FIELDS workspace_id, node_type, created_at;
            DEFINE INDEX IF NOT EXISTS idx_entities_workspace
                ON TABLE entities FIELDS workspace_id;
            ",
        )
        .await
        .and_then(|response| response.check())
        .map_err(|e| DatabaseError::initialization_failed(e.to_string()))?;

        Ok(())
    }
}

#[async_trait]
impl GraphStore for SurrealStore {
    async fn create_workspace(&self, workspace: Workspace) -> Result<Workspace> {
        self.db
            .query("CREATE type::thing('horizons', $id) CONTENT $doc;")
            .bind(("id", workspace.id.clone()))
            .bind(("doc", WorkspaceRecord::from(workspace.clone())))
            .await
            .context("Failed to create workspace")?
            .check()
            .context("Failed to create workspace")?;

        Ok(workspace)
    }

    async fn get_workspace(&self, id: &str) -> Result<Option<Workspace>> {
        let mut response = self
            .db
            .query("SELECT * FROM type::thing('horizons', $id);")
            .bind(("id", id.to_string()))
            .await
            .context("Failed to query workspace")?;

        let records: Vec<WorkspaceRecord> = response
            .take(0)
            .context("Failed to extract workspace")?;

        records.into_iter().next().map(Workspace::try_from).transpose()
    }

    async fn update_workspace(&self, workspace: Workspace) -> Result<Workspace> {
        self.db
            .query("UPDATE type::thing('horizons', $id) CONTENT $doc;")
            .bind(("id", workspace.id.clone()))
            .bind(("doc", WorkspaceRecord::from(workspace.clone())))
            .await
            .context("Failed to update workspace")?
            .check()
            .context("Failed to update workspace")?;

        Ok(workspace)
    }

    async fn deactivate_workspace(&self, id: &str) -> Result<usize> {
        let active = self.list_nodes(id, false).await?.len();

        self.db
            .query(
                "
                BEGIN TRANSACTION;
                UPDATE nodes SET is_active = false, updated_at = $now
                    WHERE workspace_id = $id AND is_active = true;
                UPDATE type::thing('horizons', $id)
                    SET is_active = false, node_count = 0, edge_count = 0, updated_at = $now;
                COMMIT TRANSACTION;
                ",
            )
            .bind(("id", id.to_string()))
            .bind(("now", format_timestamp(&Utc::now())))
            .await
            .context("Failed to deactivate workspace")?
            .check()
            .context("Failed to deactivate workspace")?;

        Ok(active)
    }

    async fn create_node(&self, node: Node) -> Result<Node> {
        self.db
            .query("CREATE type::thing('nodes', $id) CONTENT $doc;")
            .bind(("id", node.id.clone()))
            .bind(("doc", NodeRecord::from(node.clone())))
            .await
            .context("Failed to create node")?
            .check()
            .with_context(|| format!("Failed to create node {}", node.id))?;

        Ok(node)
    }

    async fn get_node(&self, id: &str) -> Result<Option<Node>> {
        let mut response = self
            .db
            .query("SELECT * FROM type::thing('nodes', $id);")
            .bind(("id", id.to_string()))
            .await
            .context("Failed to query node")?;

        let records: Vec<NodeRecord> = response.take(0).context("Failed to extract node")?;

        records.into_iter().next().map(Node::try_from).transpose()
    }

    async fn list_nodes(&self, workspace_id: &str, include_inactive: bool) -> Result<Vec<Node>> {
        let sql = if include_inactive {
            "SELECT * FROM nodes WHERE workspace_id = $workspace_id
                ORDER BY created_at ASC, uuid ASC;"
        } else {
            "SELECT * FROM nodes WHERE workspace_id = $workspace_id AND is_active = true
                ORDER BY created_at ASC, uuid ASC;"
        };

        let mut response = self
            .db
            .query(sql)
            .bind(("workspace_id", workspace_id.to_string()))
            .await
            .context("Failed to list workspace nodes")?;

        let records: Vec<NodeRecord> = response
            .take(0)
            .context("Failed to extract workspace nodes")?;

        into_models(records)
    }

    async fn find_children(&self, workspace_id: &str, parent_ids: &[String]) -> Result<Vec<Node>> {
        if parent_ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut response = self
            .db
            .query(
                "SELECT * FROM nodes
                    WHERE workspace_id = $workspace_id
                        AND is_active = true
                        AND parent_id IN $parent_ids
                    ORDER BY created_at ASC, uuid ASC;",
            )
            .bind(("workspace_id", workspace_id.to_string()))
            .bind(("parent_ids", parent_ids.to_vec()))
            .await
            .context("Failed to query children")?;

        let records: Vec<NodeRecord> = response.take(0).context("Failed to extract children")?;

        into_models(records)
    }

    async fn save_nodes(&self, nodes: Vec<Node>) -> Result<()> {
        if nodes.is_empty() {
            return Ok(());
        }

        let mut sql = String::from("BEGIN TRANSACTION;\n");
        for i in 0..nodes.len() {
            sql.push_str(&format!(
                "UPDATE type::thing('nodes', $id_{i}) CONTENT $doc_{i};\n"
            ));
        }
        sql.push_str("COMMIT TRANSACTION;");

        let count = nodes.len();
        let mut query = self.db.query(sql);
        for (i, node) in nodes.into_iter().enumerate() {
            query = query
                .bind((format!("id_{i}"), node.id.clone()))
                .bind((format!("doc_{i}"), NodeRecord::from(node)));
        }

        query
            .await
            .context("Failed to save nodes")?
            .check()
            .with_context(|| format!("Failed to save batch of {} nodes", count))?;

        Ok(())
    }

    async fn deactivate_nodes(&self, ids: &[String]) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }

        let mut sql = String::from("BEGIN TRANSACTION;\n");
        for i in 0..ids.len() {
            sql.push_str(&format!(
                "UPDATE type::thing('nodes', $id_{i}) SET is_active = false, updated_at = $now;\n"
            ));
        }
        sql.push_str("COMMIT TRANSACTION;");

        let mut query = self
            .db
            .query(sql)
            .bind(("now", format_timestamp(&Utc::now())));
        for (i, id) in ids.iter().enumerate() {
            query = query.bind((format!("id_{i}"), id.clone()));
        }

        query
            .await
            .context("Failed to deactivate nodes")?
            .check()
            .with_context(|| format!("Failed to deactivate batch of {} nodes", ids.len()))?;

        Ok(())
    }

    async fn create_entity(&self, entity: Entity) -> Result<Entity> {
        self.db
            .query("CREATE type::thing('entities', $id) CONTENT $doc;")
            .bind(("id", entity.id.clone()))
            .bind(("doc", EntityRecord::from(entity.clone())))
            .await
            .context("Failed to create entity")?
            .check()
            .context("Failed to create entity")?;

        Ok(entity)
    }

    async fn list_entities(&self, workspace_id: &str) -> Result<Vec<Entity>> {
        let mut response = self
            .db
            .query(
                "SELECT * FROM entities
                    WHERE is_active = true
                        AND (is_system = true OR workspace_id = $workspace_id)
                    ORDER BY created_at ASC, uuid ASC;",
            )
            .bind(("workspace_id", workspace_id.to_string()))
            .await
            .context("Failed to list entities")?;

        let records: Vec<EntityRecord> = response.take(0).context("Failed to extract entities")?;

        into_models(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use serde_json::json;
    use tempfile::TempDir;

    async fn create_test_store() -> Result<SurrealStore> {
        Ok(SurrealStore::new_in_memory().await?)
    }

    fn node(workspace_id: &str, id: &str, parent: Option<&str>) -> Node {
        Node::new_with_id(
            id.to_string(),
            workspace_id.to_string(),
            "owner".to_string(),
            NodeType::Custom,
            parent.map(str::to_string),
            Position::new(1.5, -2.0),
            json!({ "label": id }),
        )
    }

    #[tokio::test]
    async fn test_create_and_get_node() -> Result<()> {
        let store = create_test_store().await?;

        let mut created = node("ws", "a", None);
        created.input_node_ids = vec!["x".to_string()];
        created.execution_order = Some(3);
        store.create_node(created.clone()).await?;

        let fetched = store.get_node("a").await?.expect("node should exist");
        assert_eq!(fetched, created);

        assert!(store.get_node("missing").await?.is_none());

        Ok(())
    }

    #[tokio::test]
    async fn test_duplicate_node_id_is_rejected() -> Result<()> {
        let store = create_test_store().await?;

        store.create_node(node("ws", "a", None)).await?;
        let result = store.create_node(node("other-ws", "a", None)).await;
        assert!(result.is_err());

        Ok(())
    }

    #[tokio::test]
    async fn test_list_nodes_in_creation_order() -> Result<()> {
        let store = create_test_store().await?;
        let now = Utc::now();

        for (id, offset) in [("late", 5), ("early", 1), ("middle", 3)] {
            let mut n = node("ws", id, None);
            n.created_at = now + Duration::seconds(offset);
            store.create_node(n).await?;
        }
        let mut inactive = node("ws", "gone", None);
        inactive.is_active = false;
        store.create_node(inactive).await?;
        store.create_node(node("elsewhere", "foreign", None)).await?;

        let ids: Vec<String> = store
            .list_nodes("ws", false)
            .await?
            .into_iter()
            .map(|n| n.id)
            .collect();
        assert_eq!(ids, vec!["early", "middle", "late"]);

        assert_eq!(store.list_nodes("ws", true).await?.len(), 4);

        Ok(())
    }

    #[tokio::test]
    async fn test_find_children_of_several_parents() -> Result<()> {
        let store = create_test_store().await?;

        store.create_node(node("ws", "a", None)).await?;
        store.create_node(node("ws", "b", Some("a"))).await?;
        store.create_node(node("ws", "c", Some("a"))).await?;
        store.create_node(node("ws", "d", Some("b"))).await?;
        let mut inactive = node("ws", "e", Some("a"));
        inactive.is_active = false;
        store.create_node(inactive).await?;

        let children = store.find_children("ws", &["a".to_string()]).await?;
        assert_eq!(children.len(), 2);

        let children = store
            .find_children("ws", &["b".to_string(), "c".to_string()])
            .await?;
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].id, "d");

        assert!(store.find_children("ws", &[]).await?.is_empty());

        Ok(())
    }

    #[tokio::test]
    async fn test_save_and_deactivate_batches() -> Result<()> {
        let store = create_test_store().await?;

        store.create_node(node("ws", "a", None)).await?;
        store.create_node(node("ws", "b", Some("a"))).await?;

        let mut a = store.get_node("a").await?.expect("a");
        a.children = vec!["b".to_string()];
        let mut b = store.get_node("b").await?.expect("b");
        b.position = Position::new(10.0, 20.0);
        store.save_nodes(vec![a, b]).await?;

        assert_eq!(store.get_node("a").await?.expect("a").children, vec!["b"]);
        assert_eq!(
            store.get_node("b").await?.expect("b").position,
            Position::new(10.0, 20.0)
        );

        store
            .deactivate_nodes(&["b".to_string(), "a".to_string()])
            .await?;
        assert!(store.list_nodes("ws", false).await?.is_empty());
        assert!(!store.get_node("a").await?.expect("a").is_active);

        Ok(())
    }

    #[tokio::test]
    async fn test_workspace_lifecycle() -> Result<()> {
        let store = create_test_store().await?;

        let ws = store
            .create_workspace(Workspace::new("owner".to_string(), "Canvas".to_string()))
            .await?;
        store.create_node(node(&ws.id, "a", None)).await?;
        store.create_node(node(&ws.id, "b", Some("a"))).await?;

        let mut fetched = store.get_workspace(&ws.id).await?.expect("workspace");
        assert_eq!(fetched.name, "Canvas");
        fetched.node_count = 2;
        fetched.edge_count = 1;
        store.update_workspace(fetched).await?;
        assert_eq!(
            store.get_workspace(&ws.id).await?.expect("workspace").node_count,
            2
        );

        assert_eq!(store.deactivate_workspace(&ws.id).await?, 2);
        let deleted = store.get_workspace(&ws.id).await?.expect("workspace");
        assert!(!deleted.is_active);
        assert!(store.list_nodes(&ws.id, false).await?.is_empty());

        Ok(())
    }

    #[tokio::test]
    async fn test_entities_include_system_records() -> Result<()> {
        let store = create_test_store().await?;

        store
            .create_entity(Entity::new(
                EntityKind::Agent,
                Some("ws".to_string()),
                "Analyst".to_string(),
                json!({}),
            ))
            .await?;
        store
            .create_entity(Entity::new(
                EntityKind::Team,
                None,
                "Default Team".to_string(),
                json!({}),
            ))
            .await?;
        store
            .create_entity(Entity::new(
                EntityKind::Portfolio,
                Some("other".to_string()),
                "Hidden".to_string(),
                json!({}),
            ))
            .await?;

        let names: Vec<String> = store
            .list_entities("ws")
            .await?
            .into_iter()
            .map(|e| e.name)
            .collect();
        assert_eq!(names.len(), 2);
        assert!(names.contains(&"Analyst".to_string()));
        assert!(names.contains(&"Default Team".to_string()));

        Ok(())
    }

    #[tokio::test]
    async fn test_on_disk_store() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let store = SurrealStore::new(temp_dir.path().join("nested").join("horizon.db")).await?;

        store.create_node(node("ws", "a", None)).await?;
        assert!(store.get_node("a").await?.is_some());

        Ok(())
    }
}

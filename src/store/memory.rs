//! In-memory row store. Backs tests and local development; mirrors the
//! PostgreSQL store's semantics (generated defaults, constraint rejections,
//! zero-row updates reported as `None`).

use super::{ListParams, RowStore};
use crate::error::StoreError;
use crate::schema::{ColumnDef, RelationKind, ResourcePayload, TableName, PK_COLUMN};
use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

const DEFAULT_LIMIT: usize = 100;
const MAX_LIMIT: usize = 1000;

type Tables = HashMap<TableName, BTreeMap<String, ResourcePayload>>;

#[derive(Default)]
pub struct MemoryRowStore {
    tables: RwLock<Tables>,
}

impl MemoryRowStore {
    pub fn new() -> Self {
        MemoryRowStore::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Tables> {
        self.tables.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Tables> {
        self.tables.write().unwrap_or_else(PoisonError::into_inner)
    }
}

fn default_value(col: &ColumnDef) -> Option<Value> {
    match col.default_sql {
        None => None,
        Some("gen_random_uuid()") => Some(Value::String(uuid::Uuid::new_v4().to_string())),
        Some("NOW()") => Some(Value::String(Utc::now().to_rfc3339())),
        Some("false") => Some(Value::Bool(false)),
        Some("true") => Some(Value::Bool(true)),
        Some(lit) if lit.starts_with('\'') => Some(Value::String(lit.trim_matches('\'').to_string())),
        Some(_) => None,
    }
}

fn not_null_violation(table: &str, column: &str) -> StoreError {
    StoreError::Constraint(format!(
        "null value in column \"{}\" of relation \"{}\"",
        column, table
    ))
}

/// Ordering over JSON scalars, nulls first; mirrors how the SQL store sorts.
fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Null, _) => Ordering::Less,
        (_, Value::Null) => Ordering::Greater,
        (Value::Number(x), Value::Number(y)) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        _ => Ordering::Equal,
    }
}

fn resolve_includes(
    tables: &Tables,
    row: &mut Map<String, Value>,
    includes: &[&'static crate::schema::RelationDef],
) {
    for inc in includes {
        let our_val = row.get(inc.our_key).cloned().unwrap_or(Value::Null);
        let related = tables.get(&inc.target);
        let resolved = match inc.kind {
            RelationKind::ToOne => {
                if our_val.is_null() {
                    Value::Null
                } else {
                    related
                        .and_then(|rows| {
                            rows.values()
                                .find(|r| r.get(inc.their_key) == Some(&our_val))
                        })
                        .map(|r| Value::Object(r.clone()))
                        .unwrap_or(Value::Null)
                }
            }
            RelationKind::ToMany => Value::Array(
                related
                    .map(|rows| {
                        rows.values()
                            .filter(|r| r.get(inc.their_key) == Some(&our_val))
                            .map(|r| Value::Object(r.clone()))
                            .collect()
                    })
                    .unwrap_or_default(),
            ),
        };
        row.insert(inc.name.to_string(), resolved);
    }
}

#[async_trait]
impl RowStore for MemoryRowStore {
    async fn insert(&self, table: TableName, row: &ResourcePayload) -> Result<Value, StoreError> {
        let schema = table.schema();
        let mut stored = Map::new();
        for c in schema.columns {
            let provided = row.get(c.name).filter(|v| !v.is_null()).cloned();
            let value = match provided.or_else(|| default_value(c)) {
                Some(v) => v,
                None if c.nullable => Value::Null,
                None => return Err(not_null_violation(schema.name, c.name)),
            };
            stored.insert(c.name.to_string(), value);
        }
        let id = match stored.get(PK_COLUMN) {
            Some(Value::String(s)) => s.clone(),
            _ => return Err(not_null_violation(schema.name, PK_COLUMN)),
        };
        let mut tables = self.write();
        let rows = tables.entry(table).or_default();
        if rows.contains_key(&id) {
            return Err(StoreError::Constraint(format!(
                "duplicate key value violates unique constraint \"{}_pkey\"",
                schema.name
            )));
        }
        rows.insert(id, stored.clone());
        Ok(Value::Object(stored))
    }

    async fn update(
        &self,
        table: TableName,
        id: &str,
        changes: &ResourcePayload,
    ) -> Result<Option<Value>, StoreError> {
        let schema = table.schema();
        let mut tables = self.write();
        let Some(row) = tables.get_mut(&table).and_then(|rows| rows.get_mut(id)) else {
            return Ok(None);
        };
        for (k, v) in changes {
            if k == PK_COLUMN || k == "created_at" || k == "updated_at" {
                continue;
            }
            let Some(c) = schema.column(k) else { continue };
            if v.is_null() && !c.nullable {
                return Err(not_null_violation(schema.name, c.name));
            }
            row.insert(k.clone(), v.clone());
        }
        row.insert(
            "updated_at".to_string(),
            Value::String(Utc::now().to_rfc3339()),
        );
        Ok(Some(Value::Object(row.clone())))
    }

    async fn delete(&self, table: TableName, id: &str) -> Result<Option<Value>, StoreError> {
        let mut tables = self.write();
        Ok(tables
            .get_mut(&table)
            .and_then(|rows| rows.remove(id))
            .map(Value::Object))
    }

    async fn fetch(&self, table: TableName, id: &str) -> Result<Option<Value>, StoreError> {
        let tables = self.read();
        Ok(tables
            .get(&table)
            .and_then(|rows| rows.get(id))
            .map(|r| Value::Object(r.clone())))
    }

    async fn list(&self, table: TableName, params: &ListParams) -> Result<Vec<Value>, StoreError> {
        let schema = table.schema();
        let tables = self.read();
        let mut rows: Vec<Map<String, Value>> = tables
            .get(&table)
            .map(|rows| {
                rows.values()
                    .filter(|r| {
                        params
                            .filters
                            .iter()
                            .filter(|(col, _)| schema.has_column(col))
                            .all(|(col, val)| r.get(col) == Some(val))
                    })
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        if let Some(order) = params.order.as_ref().filter(|o| schema.has_column(&o.column)) {
            rows.sort_by(|a, b| {
                let ord = compare_values(
                    a.get(&order.column).unwrap_or(&Value::Null),
                    b.get(&order.column).unwrap_or(&Value::Null),
                );
                if order.descending {
                    ord.reverse()
                } else {
                    ord
                }
            });
        }

        let offset = params.offset.unwrap_or(0) as usize;
        let limit = (params.limit.map(|n| n as usize).unwrap_or(DEFAULT_LIMIT)).min(MAX_LIMIT);
        let mut out = Vec::new();
        for mut row in rows.into_iter().skip(offset).take(limit) {
            resolve_includes(&tables, &mut row, &params.includes);
            out.push(Value::Object(row));
        }
        Ok(out)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::OrderBy;
    use serde_json::json;

    fn payload(v: Value) -> ResourcePayload {
        match v {
            Value::Object(m) => m,
            _ => panic!("expected object"),
        }
    }

    #[tokio::test]
    async fn insert_fills_defaults() {
        let store = MemoryRowStore::new();
        let row = store
            .insert(TableName::Members, &payload(json!({"email": "a@b.co"})))
            .await
            .unwrap();
        assert_eq!(row["email"], json!("a@b.co"));
        assert_eq!(row["status"], json!("pending"));
        assert_eq!(row["name"], Value::Null);
        assert!(uuid::Uuid::parse_str(row["id"].as_str().unwrap()).is_ok());
        assert!(row["created_at"].as_str().is_some());
    }

    #[tokio::test]
    async fn insert_missing_required_column_is_a_constraint_violation() {
        let store = MemoryRowStore::new();
        let err = store
            .insert(TableName::Organizations, &payload(json!({})))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "constraint");
    }

    #[tokio::test]
    async fn insert_duplicate_id_is_rejected() {
        let store = MemoryRowStore::new();
        let body = payload(json!({"id": "org-1", "name": "Acme"}));
        store.insert(TableName::Organizations, &body).await.unwrap();
        let err = store.insert(TableName::Organizations, &body).await.unwrap_err();
        assert_eq!(err.kind(), "constraint");
    }

    #[tokio::test]
    async fn update_merges_and_reports_missing_rows() {
        let store = MemoryRowStore::new();
        store
            .insert(
                TableName::Organizations,
                &payload(json!({"id": "org-1", "name": "Acme"})),
            )
            .await
            .unwrap();

        let updated = store
            .update(
                TableName::Organizations,
                "org-1",
                &payload(json!({"name": "Acme Corp"})),
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated["name"], json!("Acme Corp"));

        let missing = store
            .update(TableName::Organizations, "org-2", &payload(json!({"name": "X"})))
            .await
            .unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn update_rejects_null_for_required_column() {
        let store = MemoryRowStore::new();
        store
            .insert(
                TableName::Organizations,
                &payload(json!({"id": "org-1", "name": "Acme"})),
            )
            .await
            .unwrap();
        let err = store
            .update(TableName::Organizations, "org-1", &payload(json!({"name": null})))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "constraint");
    }

    #[tokio::test]
    async fn delete_returns_removed_row() {
        let store = MemoryRowStore::new();
        store
            .insert(
                TableName::Organizations,
                &payload(json!({"id": "org-1", "name": "Acme"})),
            )
            .await
            .unwrap();
        let removed = store.delete(TableName::Organizations, "org-1").await.unwrap();
        assert_eq!(removed.unwrap()["name"], json!("Acme"));
        assert!(store.fetch(TableName::Organizations, "org-1").await.unwrap().is_none());
        assert!(store.delete(TableName::Organizations, "org-1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn list_filters_orders_and_windows() {
        let store = MemoryRowStore::new();
        for (id, email, status) in [
            ("m-1", "carol@example.com", "active"),
            ("m-2", "alice@example.com", "active"),
            ("m-3", "bob@example.com", "inactive"),
        ] {
            store
                .insert(
                    TableName::Members,
                    &payload(json!({"id": id, "email": email, "status": status})),
                )
                .await
                .unwrap();
        }

        let params = ListParams {
            filters: vec![("status".into(), json!("active"))],
            order: Some(OrderBy {
                column: "email".into(),
                descending: false,
            }),
            ..ListParams::default()
        };
        let rows = store.list(TableName::Members, &params).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["email"], json!("alice@example.com"));
        assert_eq!(rows[1]["email"], json!("carol@example.com"));

        let windowed = ListParams {
            limit: Some(1),
            offset: Some(1),
            ..ListParams::default()
        };
        let rows = store.list(TableName::Members, &windowed).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["id"], json!("m-2"));
    }

    #[tokio::test]
    async fn list_resolves_includes() {
        let store = MemoryRowStore::new();
        store
            .insert(
                TableName::Organizations,
                &payload(json!({"id": "org-1", "name": "Acme"})),
            )
            .await
            .unwrap();
        store
            .insert(
                TableName::Members,
                &payload(json!({"id": "m-1", "email": "a@b.co", "organization_id": "org-1"})),
            )
            .await
            .unwrap();
        store
            .insert(TableName::Members, &payload(json!({"id": "m-2", "email": "c@d.co"})))
            .await
            .unwrap();

        let schema = TableName::Members.schema();
        let params = ListParams {
            includes: vec![schema.relation("organization").unwrap()],
            ..ListParams::default()
        };
        let rows = store.list(TableName::Members, &params).await.unwrap();
        assert_eq!(rows[0]["organization"]["name"], json!("Acme"));
        assert_eq!(rows[1]["organization"], Value::Null);

        let org_schema = TableName::Organizations.schema();
        let params = ListParams {
            includes: vec![org_schema.relation("members").unwrap()],
            ..ListParams::default()
        };
        let orgs = store.list(TableName::Organizations, &params).await.unwrap();
        assert_eq!(orgs[0]["members"].as_array().unwrap().len(), 1);
    }
}

//! Builds parameterized INSERT, SELECT, UPDATE, DELETE from the schema registry.

use crate::schema::{ColumnKind, RelationDef, RelationKind, ResourcePayload, TableSchema, PK_COLUMN};
use serde_json::Value;

/// Quote identifier for PostgreSQL (safe: only from the registry).
fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<Value>,
}

impl QueryBuf {
    fn new() -> Self {
        QueryBuf {
            sql: String::new(),
            params: Vec::new(),
        }
    }

    fn push_param(&mut self, v: Value) -> usize {
        self.params.push(v);
        self.params.len()
    }
}

/// `$n::<type>` so text-encoded values bind against typed columns.
fn placeholder(n: usize, kind: ColumnKind) -> String {
    format!("${}::{}", n, kind.sql_type())
}

/// SELECT list: each column as-is, except numeric as ::text so sqlx decoding
/// does not need a decimal type.
fn select_column_list(schema: &TableSchema) -> String {
    schema
        .columns
        .iter()
        .map(|c| {
            let q = quoted(c.name);
            if c.kind == ColumnKind::Numeric {
                format!("{}::text", q)
            } else {
                q
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// INSERT one row. Columns with a default are omitted when the body does not
/// provide a value (so the database fills them in); unknown body keys are
/// ignored (the request boundary has already rejected them).
pub fn insert(schema: &TableSchema, body: &ResourcePayload) -> QueryBuf {
    let mut q = QueryBuf::new();
    let mut cols = Vec::new();
    let mut placeholders = Vec::new();
    for c in schema.columns {
        let val = body.get(c.name).cloned();
        if val.is_none() && c.has_default() {
            continue;
        }
        let n = q.push_param(val.unwrap_or(Value::Null));
        cols.push(quoted(c.name));
        placeholders.push(placeholder(n, c.kind));
    }
    q.sql = format!(
        "INSERT INTO {} ({}) VALUES ({}) RETURNING {}",
        quoted(schema.name),
        cols.join(", "),
        placeholders.join(", "),
        select_column_list(schema)
    );
    q
}

/// UPDATE by id: SET only columns present in body. The primary key and the
/// timestamp columns are never taken from the body; `updated_at` is always
/// advanced to NOW().
pub fn update(schema: &TableSchema, id: &Value, body: &ResourcePayload) -> QueryBuf {
    let mut q = QueryBuf::new();
    let mut sets = Vec::new();
    for (k, v) in body {
        if k == PK_COLUMN || k == "created_at" || k == "updated_at" {
            continue;
        }
        let Some(c) = schema.column(k) else { continue };
        let n = q.push_param(v.clone());
        sets.push(format!("{} = {}", quoted(k), placeholder(n, c.kind)));
    }
    sets.push(format!("{} = NOW()", quoted("updated_at")));
    let id_param = q.push_param(id.clone());
    q.sql = format!(
        "UPDATE {} SET {} WHERE {} = ${}::uuid RETURNING {}",
        quoted(schema.name),
        sets.join(", "),
        quoted(PK_COLUMN),
        id_param,
        select_column_list(schema)
    );
    q
}

/// DELETE by id.
pub fn delete(schema: &TableSchema, id: &Value) -> QueryBuf {
    let mut q = QueryBuf::new();
    let n = q.push_param(id.clone());
    q.sql = format!(
        "DELETE FROM {} WHERE {} = ${}::uuid RETURNING {}",
        quoted(schema.name),
        quoted(PK_COLUMN),
        n,
        select_column_list(schema)
    );
    q
}

/// SELECT by primary key.
pub fn select_by_id(schema: &TableSchema, id: &Value) -> QueryBuf {
    let mut q = QueryBuf::new();
    let n = q.push_param(id.clone());
    q.sql = format!(
        "SELECT {} FROM {} WHERE {} = ${}::uuid",
        select_column_list(schema),
        quoted(schema.name),
        quoted(PK_COLUMN),
        n
    );
    q
}

/// SELECT list with optional exact-match filters, order, limit/offset, and
/// embedded relations. Relations become scalar subqueries (`row_to_json` for
/// to-one, `json_agg` for to-many) so one round trip returns everything.
/// Filters and order columns not present in the schema are skipped.
pub fn select_list(
    schema: &TableSchema,
    filters: &[(String, Value)],
    order: Option<(&str, bool)>,
    limit: Option<u32>,
    offset: Option<u32>,
    includes: &[&'static RelationDef],
) -> QueryBuf {
    let mut q = QueryBuf::new();
    const MAIN_ALIAS: &str = "main";
    let aliased = !includes.is_empty();
    let prefix = if aliased {
        format!("{}.", MAIN_ALIAS)
    } else {
        String::new()
    };

    let mut select_parts: Vec<String> = schema
        .columns
        .iter()
        .map(|c| {
            let col = quoted(c.name);
            if c.kind == ColumnKind::Numeric {
                format!("{}{}::text", prefix, col)
            } else {
                format!("{}{}", prefix, col)
            }
        })
        .collect();

    for inc in includes {
        let related = inc.target.schema();
        let sub_from = format!(
            "{} WHERE {} = {}.{}",
            quoted(related.name),
            quoted(inc.their_key),
            MAIN_ALIAS,
            quoted(inc.our_key)
        );
        let subquery = match inc.kind {
            RelationKind::ToOne => format!(
                "(SELECT row_to_json(sub) FROM (SELECT {} FROM {}) sub)",
                select_column_list(related),
                sub_from
            ),
            RelationKind::ToMany => format!(
                "(SELECT COALESCE(json_agg(row_to_json(sub)), '[]'::json) FROM (SELECT {} FROM {}) sub)",
                select_column_list(related),
                sub_from
            ),
        };
        select_parts.push(format!("{} AS {}", subquery, quoted(inc.name)));
    }

    let mut where_parts = Vec::new();
    for (col, val) in filters {
        let Some(c) = schema.column(col) else { continue };
        let n = q.push_param(val.clone());
        where_parts.push(format!("{}{} = {}", prefix, quoted(col), placeholder(n, c.kind)));
    }
    let where_clause = if where_parts.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", where_parts.join(" AND "))
    };

    let (order_col, descending) = match order {
        Some((col, desc)) if schema.has_column(col) => (col, desc),
        _ => (PK_COLUMN, false),
    };
    let order_clause = format!(
        " ORDER BY {}{}{}",
        prefix,
        quoted(order_col),
        if descending { " DESC" } else { "" }
    );

    let limit_clause = limit.map(|n| format!(" LIMIT {}", n)).unwrap_or_default();
    let offset_clause = offset.map(|n| format!(" OFFSET {}", n)).unwrap_or_default();

    let from_clause = if aliased {
        format!("{} {}", quoted(schema.name), MAIN_ALIAS)
    } else {
        quoted(schema.name)
    };
    q.sql = format!(
        "SELECT {} FROM {}{}{}{}{}",
        select_parts.join(", "),
        from_clause,
        where_clause,
        order_clause,
        limit_clause,
        offset_clause
    );
    q
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::TableName;
    use serde_json::json;

    fn payload(v: Value) -> ResourcePayload {
        match v {
            Value::Object(m) => m,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn insert_skips_defaulted_columns() {
        let q = insert(TableName::Organizations.schema(), &payload(json!({"name": "Acme"})));
        assert_eq!(
            q.sql,
            "INSERT INTO \"organizations\" (\"name\") VALUES ($1::text) \
             RETURNING \"id\", \"name\", \"created_at\", \"updated_at\""
        );
        assert_eq!(q.params, vec![json!("Acme")]);
    }

    #[test]
    fn insert_keeps_provided_pk() {
        let q = insert(
            TableName::Organizations.schema(),
            &payload(json!({"id": "org-1", "name": "Acme"})),
        );
        assert!(q.sql.starts_with("INSERT INTO \"organizations\" (\"id\", \"name\")"));
        assert_eq!(q.params.len(), 2);
    }

    #[test]
    fn insert_binds_null_for_missing_required_column() {
        let q = insert(TableName::Organizations.schema(), &payload(json!({})));
        assert_eq!(q.sql.matches("$1").count(), 1);
        assert_eq!(q.params, vec![Value::Null]);
    }

    #[test]
    fn update_touches_updated_at_and_filters_by_id() {
        let q = update(
            TableName::Organizations.schema(),
            &json!("org-1"),
            &payload(json!({"name": "Acme Corp"})),
        );
        assert_eq!(
            q.sql,
            "UPDATE \"organizations\" SET \"name\" = $1::text, \"updated_at\" = NOW() \
             WHERE \"id\" = $2::uuid RETURNING \"id\", \"name\", \"created_at\", \"updated_at\""
        );
        assert_eq!(q.params, vec![json!("Acme Corp"), json!("org-1")]);
    }

    #[test]
    fn update_ignores_pk_and_unknown_fields() {
        let q = update(
            TableName::Organizations.schema(),
            &json!("org-1"),
            &payload(json!({"id": "other", "bogus": 1, "name": "Acme"})),
        );
        assert!(!q.sql.contains("bogus"));
        assert_eq!(q.params, vec![json!("Acme"), json!("org-1")]);
    }

    #[test]
    fn delete_returns_row() {
        let q = delete(TableName::Organizations.schema(), &json!("org-1"));
        assert_eq!(
            q.sql,
            "DELETE FROM \"organizations\" WHERE \"id\" = $1::uuid \
             RETURNING \"id\", \"name\", \"created_at\", \"updated_at\""
        );
    }

    #[test]
    fn select_list_with_filters_and_order() {
        let q = select_list(
            TableName::Members.schema(),
            &[("status".into(), json!("active"))],
            Some(("email", false)),
            Some(100),
            Some(20),
            &[],
        );
        assert!(q.sql.contains("WHERE \"status\" = $1::text"));
        assert!(q.sql.contains("ORDER BY \"email\""));
        assert!(q.sql.ends_with("LIMIT 100 OFFSET 20"));
        assert_eq!(q.params, vec![json!("active")]);
    }

    #[test]
    fn select_list_unknown_order_falls_back_to_pk() {
        let q = select_list(TableName::Members.schema(), &[], Some(("bogus", true)), None, None, &[]);
        assert!(q.sql.contains("ORDER BY \"id\""));
        assert!(!q.sql.contains("DESC"));
    }

    #[test]
    fn select_list_numeric_column_selected_as_text() {
        let q = select_list(TableName::Payments.schema(), &[], None, None, None, &[]);
        assert!(q.sql.contains("\"amount\"::text"));
    }

    #[test]
    fn select_list_with_to_one_include() {
        let schema = TableName::Members.schema();
        let rel = schema.relation("organization").unwrap();
        let q = select_list(schema, &[], None, None, None, &[rel]);
        assert!(q.sql.contains("FROM \"members\" main"));
        assert!(q.sql.contains(
            "(SELECT row_to_json(sub) FROM (SELECT \"id\", \"name\", \"created_at\", \"updated_at\" \
             FROM \"organizations\" WHERE \"id\" = main.\"organization_id\") sub) AS \"organization\""
        ));
    }

    #[test]
    fn select_list_with_to_many_include() {
        let schema = TableName::Organizations.schema();
        let rel = schema.relation("members").unwrap();
        let q = select_list(schema, &[], None, None, None, &[rel]);
        assert!(q.sql.contains("json_agg(row_to_json(sub))"));
        assert!(q.sql.contains("WHERE \"organization_id\" = main.\"id\""));
    }
}

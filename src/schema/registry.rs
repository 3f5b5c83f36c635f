//! Collection descriptors. Every table, column, relation, and field rule the
//! backend knows about is declared here; nothing is created at runtime.

/// Primary key column shared by every collection.
pub const PK_COLUMN: &str = "id";

/// The closed set of collections. Unknown table names cannot be represented.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TableName {
    Organizations,
    Members,
    Roles,
    Groups,
    MemberGroups,
    Invitations,
    Payments,
    Notifications,
    Files,
    AuditLogs,
}

impl TableName {
    /// All collections, in FK dependency order (referenced tables first).
    pub const ALL: [TableName; 10] = [
        TableName::Organizations,
        TableName::Members,
        TableName::Roles,
        TableName::Groups,
        TableName::MemberGroups,
        TableName::Invitations,
        TableName::Payments,
        TableName::Notifications,
        TableName::Files,
        TableName::AuditLogs,
    ];

    /// SQL table name.
    pub fn as_str(&self) -> &'static str {
        match self {
            TableName::Organizations => "organizations",
            TableName::Members => "members",
            TableName::Roles => "roles",
            TableName::Groups => "groups",
            TableName::MemberGroups => "member_groups",
            TableName::Invitations => "invitations",
            TableName::Payments => "payments",
            TableName::Notifications => "notifications",
            TableName::Files => "files",
            TableName::AuditLogs => "audit_logs",
        }
    }

    /// URL path segment for the REST surface.
    pub fn path_segment(&self) -> &'static str {
        match self {
            TableName::MemberGroups => "member-groups",
            TableName::AuditLogs => "audit-logs",
            other => other.as_str(),
        }
    }

    /// Resolve a path segment to a collection. Closed lookup: anything not
    /// listed here is not a resource.
    pub fn from_path(segment: &str) -> Option<TableName> {
        TableName::ALL.iter().copied().find(|t| t.path_segment() == segment)
    }

    pub fn schema(&self) -> &'static TableSchema {
        match self {
            TableName::Organizations => &ORGANIZATIONS,
            TableName::Members => &MEMBERS,
            TableName::Roles => &ROLES,
            TableName::Groups => &GROUPS,
            TableName::MemberGroups => &MEMBER_GROUPS,
            TableName::Invitations => &INVITATIONS,
            TableName::Payments => &PAYMENTS,
            TableName::Notifications => &NOTIFICATIONS,
            TableName::Files => &FILES,
            TableName::AuditLogs => &AUDIT_LOGS,
        }
    }
}

impl std::fmt::Display for TableName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// SQL column type.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColumnKind {
    Uuid,
    Text,
    Timestamptz,
    Boolean,
    BigInt,
    Numeric,
    Jsonb,
}

impl ColumnKind {
    /// PostgreSQL type name, used for DDL and bind casts.
    pub fn sql_type(&self) -> &'static str {
        match self {
            ColumnKind::Uuid => "uuid",
            ColumnKind::Text => "text",
            ColumnKind::Timestamptz => "timestamptz",
            ColumnKind::Boolean => "boolean",
            ColumnKind::BigInt => "bigint",
            ColumnKind::Numeric => "numeric",
            ColumnKind::Jsonb => "jsonb",
        }
    }
}

/// Value format checked on top of the column type.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldFormat {
    Email,
    Uuid,
}

/// Validation applied to a field at the request boundary.
#[derive(Clone, Copy, Debug)]
pub struct FieldRule {
    pub required: bool,
    pub format: Option<FieldFormat>,
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
    pub pattern: Option<&'static str>,
    pub allowed: Option<&'static [&'static str]>,
    pub minimum: Option<f64>,
    pub maximum: Option<f64>,
}

impl FieldRule {
    pub const NONE: FieldRule = FieldRule {
        required: false,
        format: None,
        min_length: None,
        max_length: None,
        pattern: None,
        allowed: None,
        minimum: None,
        maximum: None,
    };

    pub const REQUIRED: FieldRule = FieldRule { required: true, ..FieldRule::NONE };
}

#[derive(Clone, Copy, Debug)]
pub struct ColumnDef {
    pub name: &'static str,
    pub kind: ColumnKind,
    pub nullable: bool,
    /// SQL default expression; columns with a default may be omitted on insert.
    pub default_sql: Option<&'static str>,
    pub rule: FieldRule,
}

impl ColumnDef {
    const fn new(name: &'static str, kind: ColumnKind) -> Self {
        ColumnDef {
            name,
            kind,
            nullable: false,
            default_sql: None,
            rule: FieldRule::NONE,
        }
    }

    const fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    const fn default_sql(mut self, expr: &'static str) -> Self {
        self.default_sql = Some(expr);
        self
    }

    const fn rule(mut self, rule: FieldRule) -> Self {
        self.rule = rule;
        self
    }

    pub fn has_default(&self) -> bool {
        self.default_sql.is_some()
    }
}

const fn id_column() -> ColumnDef {
    ColumnDef::new(PK_COLUMN, ColumnKind::Uuid).default_sql("gen_random_uuid()")
}

const fn created_at_column() -> ColumnDef {
    ColumnDef::new("created_at", ColumnKind::Timestamptz).default_sql("NOW()")
}

const fn updated_at_column() -> ColumnDef {
    ColumnDef::new("updated_at", ColumnKind::Timestamptz).default_sql("NOW()")
}

/// Direction of an embedded relation: to-one (we hold the FK) or to-many
/// (the related table holds a FK to us).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RelationKind {
    ToOne,
    ToMany,
}

/// An embeddable relation, addressed by name in `?include=`.
#[derive(Clone, Copy, Debug)]
pub struct RelationDef {
    pub name: &'static str,
    pub kind: RelationKind,
    pub target: TableName,
    /// Join column on this table (the FK for to-one, the PK for to-many).
    pub our_key: &'static str,
    /// Join column on the target (the PK for to-one, the FK for to-many).
    pub their_key: &'static str,
}

const fn to_one(name: &'static str, target: TableName, our_key: &'static str) -> RelationDef {
    RelationDef { name, kind: RelationKind::ToOne, target, our_key, their_key: PK_COLUMN }
}

const fn to_many(name: &'static str, target: TableName, their_key: &'static str) -> RelationDef {
    RelationDef { name, kind: RelationKind::ToMany, target, our_key: PK_COLUMN, their_key }
}

#[derive(Debug)]
pub struct TableSchema {
    pub name: &'static str,
    pub columns: &'static [ColumnDef],
    pub relations: &'static [RelationDef],
}

impl TableSchema {
    pub fn column(&self, name: &str) -> Option<&'static ColumnDef> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    pub fn relation(&self, name: &str) -> Option<&'static RelationDef> {
        self.relations.iter().find(|r| r.name == name)
    }
}

static ORGANIZATIONS: TableSchema = TableSchema {
    name: "organizations",
    columns: &[
        id_column(),
        ColumnDef::new("name", ColumnKind::Text).rule(FieldRule {
            required: true,
            max_length: Some(200),
            ..FieldRule::NONE
        }),
        created_at_column(),
        updated_at_column(),
    ],
    relations: &[
        to_many("members", TableName::Members, "organization_id"),
        to_many("groups", TableName::Groups, "organization_id"),
        to_many("roles", TableName::Roles, "organization_id"),
    ],
};

static MEMBERS: TableSchema = TableSchema {
    name: "members",
    columns: &[
        id_column(),
        ColumnDef::new("email", ColumnKind::Text).rule(FieldRule {
            required: true,
            format: Some(FieldFormat::Email),
            max_length: Some(320),
            ..FieldRule::NONE
        }),
        ColumnDef::new("name", ColumnKind::Text).nullable().rule(FieldRule {
            max_length: Some(200),
            ..FieldRule::NONE
        }),
        ColumnDef::new("status", ColumnKind::Text).default_sql("'pending'").rule(FieldRule {
            allowed: Some(&["active", "inactive", "pending"]),
            ..FieldRule::NONE
        }),
        ColumnDef::new("organization_id", ColumnKind::Uuid).nullable(),
        created_at_column(),
        updated_at_column(),
    ],
    relations: &[
        to_one("organization", TableName::Organizations, "organization_id"),
        to_many("payments", TableName::Payments, "member_id"),
        to_many("notifications", TableName::Notifications, "recipient_id"),
    ],
};

static ROLES: TableSchema = TableSchema {
    name: "roles",
    columns: &[
        id_column(),
        ColumnDef::new("name", ColumnKind::Text).rule(FieldRule {
            required: true,
            max_length: Some(100),
            ..FieldRule::NONE
        }),
        ColumnDef::new("description", ColumnKind::Text).nullable(),
        ColumnDef::new("organization_id", ColumnKind::Uuid).nullable(),
        created_at_column(),
        updated_at_column(),
    ],
    relations: &[to_one("organization", TableName::Organizations, "organization_id")],
};

static GROUPS: TableSchema = TableSchema {
    name: "groups",
    columns: &[
        id_column(),
        ColumnDef::new("name", ColumnKind::Text).rule(FieldRule {
            required: true,
            max_length: Some(100),
            ..FieldRule::NONE
        }),
        ColumnDef::new("description", ColumnKind::Text).nullable(),
        ColumnDef::new("organization_id", ColumnKind::Uuid).nullable(),
        created_at_column(),
        updated_at_column(),
    ],
    relations: &[
        to_one("organization", TableName::Organizations, "organization_id"),
        to_many("member_groups", TableName::MemberGroups, "group_id"),
    ],
};

static MEMBER_GROUPS: TableSchema = TableSchema {
    name: "member_groups",
    columns: &[
        id_column(),
        ColumnDef::new("member_id", ColumnKind::Uuid).rule(FieldRule {
            required: true,
            format: Some(FieldFormat::Uuid),
            ..FieldRule::NONE
        }),
        ColumnDef::new("group_id", ColumnKind::Uuid).rule(FieldRule {
            required: true,
            format: Some(FieldFormat::Uuid),
            ..FieldRule::NONE
        }),
        created_at_column(),
        updated_at_column(),
    ],
    relations: &[
        to_one("member", TableName::Members, "member_id"),
        to_one("group", TableName::Groups, "group_id"),
    ],
};

static INVITATIONS: TableSchema = TableSchema {
    name: "invitations",
    columns: &[
        id_column(),
        ColumnDef::new("email", ColumnKind::Text).rule(FieldRule {
            required: true,
            format: Some(FieldFormat::Email),
            max_length: Some(320),
            ..FieldRule::NONE
        }),
        ColumnDef::new("role_id", ColumnKind::Uuid).nullable(),
        ColumnDef::new("invited_by", ColumnKind::Uuid).nullable(),
        ColumnDef::new("status", ColumnKind::Text).default_sql("'pending'").rule(FieldRule {
            allowed: Some(&["pending", "accepted", "expired", "revoked"]),
            ..FieldRule::NONE
        }),
        ColumnDef::new("expires_at", ColumnKind::Timestamptz).nullable(),
        created_at_column(),
        updated_at_column(),
    ],
    relations: &[
        to_one("role", TableName::Roles, "role_id"),
        to_one("inviter", TableName::Members, "invited_by"),
    ],
};

static PAYMENTS: TableSchema = TableSchema {
    name: "payments",
    columns: &[
        id_column(),
        ColumnDef::new("member_id", ColumnKind::Uuid).nullable(),
        ColumnDef::new("amount", ColumnKind::Numeric).rule(FieldRule {
            required: true,
            minimum: Some(0.0),
            ..FieldRule::NONE
        }),
        ColumnDef::new("currency", ColumnKind::Text).default_sql("'usd'").rule(FieldRule {
            pattern: Some("^[a-z]{3}$"),
            ..FieldRule::NONE
        }),
        ColumnDef::new("status", ColumnKind::Text).default_sql("'pending'").rule(FieldRule {
            allowed: Some(&["pending", "succeeded", "failed", "refunded"]),
            ..FieldRule::NONE
        }),
        ColumnDef::new("description", ColumnKind::Text).nullable(),
        created_at_column(),
        updated_at_column(),
    ],
    relations: &[to_one("member", TableName::Members, "member_id")],
};

static NOTIFICATIONS: TableSchema = TableSchema {
    name: "notifications",
    columns: &[
        id_column(),
        ColumnDef::new("recipient_id", ColumnKind::Uuid).rule(FieldRule {
            required: true,
            format: Some(FieldFormat::Uuid),
            ..FieldRule::NONE
        }),
        ColumnDef::new("title", ColumnKind::Text).rule(FieldRule {
            required: true,
            max_length: Some(200),
            ..FieldRule::NONE
        }),
        ColumnDef::new("message", ColumnKind::Text).nullable(),
        ColumnDef::new("read", ColumnKind::Boolean).default_sql("false"),
        created_at_column(),
        updated_at_column(),
    ],
    relations: &[to_one("recipient", TableName::Members, "recipient_id")],
};

static FILES: TableSchema = TableSchema {
    name: "files",
    columns: &[
        id_column(),
        ColumnDef::new("name", ColumnKind::Text).rule(FieldRule {
            required: true,
            max_length: Some(255),
            ..FieldRule::NONE
        }),
        ColumnDef::new("path", ColumnKind::Text).rule(FieldRule::REQUIRED),
        ColumnDef::new("size_bytes", ColumnKind::BigInt).nullable().rule(FieldRule {
            minimum: Some(0.0),
            ..FieldRule::NONE
        }),
        ColumnDef::new("content_type", ColumnKind::Text).nullable(),
        ColumnDef::new("uploaded_by", ColumnKind::Uuid).nullable(),
        created_at_column(),
        updated_at_column(),
    ],
    relations: &[to_one("uploader", TableName::Members, "uploaded_by")],
};

static AUDIT_LOGS: TableSchema = TableSchema {
    name: "audit_logs",
    columns: &[
        id_column(),
        ColumnDef::new("actor_id", ColumnKind::Uuid).nullable(),
        ColumnDef::new("action", ColumnKind::Text).rule(FieldRule::REQUIRED),
        ColumnDef::new("entity", ColumnKind::Text).nullable(),
        ColumnDef::new("entity_id", ColumnKind::Text).nullable(),
        ColumnDef::new("details", ColumnKind::Jsonb).nullable(),
        created_at_column(),
        updated_at_column(),
    ],
    relations: &[to_one("actor", TableName::Members, "actor_id")],
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_segments_round_trip() {
        for table in TableName::ALL {
            assert_eq!(TableName::from_path(table.path_segment()), Some(table));
        }
        assert_eq!(TableName::from_path("widgets"), None);
        assert_eq!(TableName::from_path("member-groups"), Some(TableName::MemberGroups));
    }

    #[test]
    fn every_table_has_pk_and_timestamps() {
        for table in TableName::ALL {
            let schema = table.schema();
            let pk = schema.column(PK_COLUMN).unwrap();
            assert_eq!(pk.kind, ColumnKind::Uuid);
            assert!(pk.has_default());
            assert!(schema.has_column("created_at"));
            assert!(schema.has_column("updated_at"));
        }
    }

    #[test]
    fn relations_reference_real_columns() {
        for table in TableName::ALL {
            let schema = table.schema();
            for rel in schema.relations {
                assert!(schema.has_column(rel.our_key), "{}.{}", schema.name, rel.our_key);
                assert!(
                    rel.target.schema().has_column(rel.their_key),
                    "{} -> {}.{}",
                    schema.name,
                    rel.target,
                    rel.their_key
                );
                // Embedded keys must not shadow a real column in the response.
                assert!(!schema.has_column(rel.name), "{} include {}", schema.name, rel.name);
            }
        }
    }

    #[test]
    fn member_status_is_constrained() {
        let status = TableName::Members.schema().column("status").unwrap();
        assert!(status.rule.allowed.unwrap().contains(&"active"));
        assert_eq!(status.default_sql, Some("'pending'"));
    }
}

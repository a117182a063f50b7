use indexmap::IndexMap;

use crate::classify::PatternFamily;
use crate::generate::transforms::Transform;
use crate::generate::value::Record;

/// Immutable in-memory model of a statistics document: table name →
/// [`TableSpec`], in declaration order. Declaration order matters — the
/// scheduler breaks topological ties by it, which is what makes table
/// ordering reproducible across runs.
#[derive(Debug, Clone)]
pub struct SchemaProfile {
    pub tables: IndexMap<String, TableSpec>,
}

impl SchemaProfile {
    pub fn table(&self, name: &str) -> Option<&TableSpec> {
        self.tables.get(name)
    }

    /// Position of a table in declaration order.
    pub fn declaration_index(&self, name: &str) -> Option<usize> {
        self.tables.get_index_of(name)
    }

    pub fn table_count(&self) -> usize {
        self.tables.len()
    }
}

/// One table of the profile.
#[derive(Debug, Clone)]
pub struct TableSpec {
    pub name: String,
    pub is_code_table: bool,
    /// Reference rows, copied verbatim into the output. Empty for
    /// non-code tables.
    pub code_rows: Vec<Record>,
    /// Columns in declaration order. Empty for code tables.
    pub columns: Vec<ColumnSpec>,
    pub dependency: Option<DependencySpec>,
}

/// One column, with its kind resolved once at load time instead of being
/// re-inspected per generated value.
#[derive(Debug, Clone)]
pub struct ColumnSpec {
    pub name: String,
    pub declared_type: String,
    /// Raw per-column statistics; semantics depend on the kind
    /// (numeric bounds, categorical frequencies, date bounds).
    pub stats: serde_json::Map<String, serde_json::Value>,
    pub sample_data: Vec<String>,
    pub is_primary_key: bool,
    pub is_unique: bool,
    pub foreign_key: Option<ForeignKeyRef>,
    pub kind: ColumnKind,
}

impl ColumnSpec {
    /// Numeric stat lookup tolerant of both number and numeric-string
    /// encodings, which collectors emit interchangeably.
    pub fn stat_f64(&self, key: &str) -> Option<f64> {
        match self.stats.get(key)? {
            serde_json::Value::Number(n) => n.as_f64(),
            serde_json::Value::String(s) => s.parse().ok(),
            _ => None,
        }
    }

    pub fn stat_str(&self, key: &str) -> Option<&str> {
        self.stats.get(key)?.as_str()
    }
}

/// A foreign-key reference to another table's column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKeyRef {
    pub foreign_table: String,
    pub foreign_column: String,
}

/// Declared parent→child relationship with a per-parent cardinality range.
#[derive(Debug, Clone)]
pub struct DependencySpec {
    /// Parent table this table's records are anchored to.
    pub dep_table: String,
    /// Inclusive child-count range per parent anchor, parsed from the
    /// `"min:max"` wire form.
    pub min_children: u32,
    pub max_children: u32,
    /// Child column → how to derive it from the anchor record.
    pub columns: IndexMap<String, DependencyColumn>,
}

/// Derivation rule for one dependency-bound child column.
#[derive(Debug, Clone)]
pub struct DependencyColumn {
    /// Field of the anchor (parent) record to read.
    pub parent_field: String,
    /// Optional named transform applied to the anchor value. Resolved
    /// from the closed registry at load; unknown names are rejected there.
    pub transform: Option<Transform>,
}

/// The kind of a column, resolved once when the profile is loaded.
/// Synthesis dispatches on this tag exclusively.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnKind {
    /// Pick a value already present in the referenced parent column.
    ForeignKey {
        table: String,
        column: String,
    },
    /// Primary or unique key: random candidates checked against the
    /// uniqueness registry under a bounded retry.
    Key(KeyType),
    /// Column name matches a code table whose rows expose a `value` field.
    CodeTableBacked {
        table: String,
    },
    /// Delegated to the injected similar-data source, seeded with samples.
    LlmGenerated,
    /// Externally pinned or heuristically classified pattern family.
    Pattern(PatternFamily),
    Numeric {
        integer: bool,
    },
    Categorical,
    Date,
    Boolean,
    /// Long free text is deliberately unmodeled; a placeholder is emitted.
    LongText,
    /// No rule applies; the value is null.
    Unsupported,
}

/// Candidate shape for key-column generation, derived from the declared type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyType {
    Int,
    Decimal,
    Text,
    DateTime,
    /// Declared type has no key generator; every candidate attempt fails
    /// and the record is abandoned.
    Unsupported,
}

/// How the record generator picks the anchor among existing parent rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AnchorStrategy {
    /// The most recently generated parent record (source-compatible).
    #[default]
    Latest,
    /// A uniformly random parent record.
    Random,
}

impl AnchorStrategy {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "latest" => Some(AnchorStrategy::Latest),
            "random" => Some(AnchorStrategy::Random),
            _ => None,
        }
    }
}

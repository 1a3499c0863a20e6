//! Type definitions for database schema objects

use serde::{Deserialize, Serialize};

/// Represents a database table as reported by a schema provider
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableDefinition {
    pub name: String,
    pub columns: Vec<ColumnDefinition>,
    #[serde(default)]
    pub primary_keys: Vec<PrimaryKeyDefinition>,
    #[serde(default)]
    pub foreign_keys: Vec<ForeignKeyDefinition>,
    #[serde(default)]
    pub indexes: Vec<IndexDefinition>,
    #[serde(default)]
    pub create_script: String,
}

impl TableDefinition {
    /// Create a new table with the given name
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    /// Add a column to the table
    pub fn add_column(&mut self, column: ColumnDefinition) {
        self.columns.push(column);
    }

    /// Set the primary key for the table
    pub fn set_primary_key(&mut self, pk: PrimaryKeyDefinition) {
        self.primary_keys = vec![pk];
    }

    /// Add an index to the table
    pub fn add_index(&mut self, index: IndexDefinition) {
        self.indexes.push(index);
    }

    /// Add a foreign key to the table
    pub fn add_foreign_key(&mut self, fk: ForeignKeyDefinition) {
        self.foreign_keys.push(fk);
    }

    /// Only the first primary key takes part in comparisons.
    pub fn primary_key(&self) -> Option<&PrimaryKeyDefinition> {
        self.primary_keys.first()
    }
}

/// Represents a database column
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnDefinition {
    pub name: String,
    pub data_type: String,
    pub nullable: bool,
    #[serde(default)]
    pub max_length: Option<i64>,
    #[serde(default)]
    pub default: Option<String>,
    #[serde(default)]
    pub is_computed: bool,
    #[serde(default)]
    pub is_identity: bool,
}

impl ColumnDefinition {
    /// Create a new nullable column with the given name and type
    pub fn new(name: &str, data_type: &str) -> Self {
        Self {
            name: name.to_string(),
            data_type: data_type.to_string(),
            nullable: true,
            max_length: None,
            default: None,
            is_computed: false,
            is_identity: false,
        }
    }

    /// Set whether the column is nullable
    pub fn nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    /// Set a default value for the column
    pub fn default(mut self, default: &str) -> Self {
        self.default = Some(default.to_string());
        self
    }

    /// Set the maximum character length
    pub fn max_length(mut self, length: i64) -> Self {
        self.max_length = Some(length);
        self
    }

    fn normalized_default(&self) -> Option<String> {
        self.default
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_lowercase)
    }
}

/// Structural equality: names, types and defaults compare case-insensitively,
/// and an empty default is the same as no default.
impl PartialEq for ColumnDefinition {
    fn eq(&self, other: &Self) -> bool {
        self.name.eq_ignore_ascii_case(&other.name)
            && self.data_type.eq_ignore_ascii_case(&other.data_type)
            && self.nullable == other.nullable
            && self.max_length == other.max_length
            && self.normalized_default() == other.normalized_default()
            && self.is_computed == other.is_computed
            && self.is_identity == other.is_identity
    }
}

/// Represents a primary key constraint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrimaryKeyDefinition {
    pub name: String,
    pub columns: Vec<String>,
    #[serde(default)]
    pub create_script: Option<String>,
}

/// Recreate scripts are presentation and do not take part in equality.
impl PartialEq for PrimaryKeyDefinition {
    fn eq(&self, other: &Self) -> bool {
        self.name.eq_ignore_ascii_case(&other.name)
            && self.columns.len() == other.columns.len()
            && self
                .columns
                .iter()
                .zip(&other.columns)
                .all(|(a, b)| a.eq_ignore_ascii_case(b))
    }
}

/// Represents a foreign key constraint.
///
/// Composite keys carry their columns comma-joined in `column` and
/// `referenced_column`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForeignKeyDefinition {
    pub name: String,
    pub column: String,
    pub referenced_table: String,
    pub referenced_column: String,
}

impl PartialEq for ForeignKeyDefinition {
    fn eq(&self, other: &Self) -> bool {
        self.name.eq_ignore_ascii_case(&other.name)
            && self.column.eq_ignore_ascii_case(&other.column)
            && self.referenced_table.eq_ignore_ascii_case(&other.referenced_table)
            && self.referenced_column.eq_ignore_ascii_case(&other.referenced_column)
    }
}

/// Represents an index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexDefinition {
    pub name: String,
    pub columns: Vec<String>,
    pub is_unique: bool,
    #[serde(default)]
    pub index_type: Option<String>,
}

/// Whether a routine is a function or a procedure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoutineKind {
    Function,
    Procedure,
}

impl RoutineKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoutineKind::Function => "FUNCTION",
            RoutineKind::Procedure => "PROCEDURE",
        }
    }
}

impl std::fmt::Display for RoutineKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RoutineKind::Function => write!(f, "Function"),
            RoutineKind::Procedure => write!(f, "Procedure"),
        }
    }
}

/// A function or procedure. The definition text is fetched lazily.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutineDefinition {
    pub name: String,
    /// Argument list exactly as the provider reports it, e.g. `numeric, integer`
    pub arguments: String,
    #[serde(default)]
    pub definition: Option<String>,
}

pub type DbFunctionDefinition = RoutineDefinition;
pub type DbProcedureDefinition = RoutineDefinition;

impl RoutineDefinition {
    pub fn new(name: &str, arguments: &str) -> Self {
        Self {
            name: name.to_string(),
            arguments: arguments.to_string(),
            definition: None,
        }
    }

    pub fn with_definition(mut self, definition: &str) -> Self {
        self.definition = Some(definition.to_string());
        self
    }

    /// `name(arguments)`, the display form of the matching key
    pub fn signature(&self) -> String {
        format!("{}({})", self.name, self.arguments)
    }

    /// Case-insensitive matching key; overloads stay distinct.
    pub fn signature_key(&self) -> String {
        self.signature().to_lowercase()
    }
}

/// Represents a database view
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewDefinition {
    pub name: String,
    #[serde(default)]
    pub definition: Option<String>,
}

/// Represents a trigger on a table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerDefinition {
    pub name: String,
    pub table: String,
    #[serde(default)]
    pub definition: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_equality_is_structural() {
        let a = ColumnDefinition::new("Total", "NUMERIC").default("");
        let b = ColumnDefinition::new("total", "numeric");
        assert_eq!(a, b);

        let c = ColumnDefinition::new("total", "numeric").default("0");
        let d = ColumnDefinition::new("total", "numeric").default("  0 ");
        assert_eq!(c, d);
        assert_ne!(b, c);

        let e = ColumnDefinition::new("total", "numeric").nullable(false);
        assert_ne!(b, e);

        let mut f = b.clone();
        f.is_identity = true;
        assert_ne!(b, f);
    }

    #[test]
    fn test_signature_key_keeps_overloads_apart() {
        let one = RoutineDefinition::new("Calc_Tax", "numeric");
        let two = RoutineDefinition::new("calc_tax", "numeric, integer");

        assert_eq!(one.signature(), "Calc_Tax(numeric)");
        assert_eq!(one.signature_key(), "calc_tax(numeric)");
        assert_ne!(one.signature_key(), two.signature_key());
    }

    #[test]
    fn test_primary_key_equality_ignores_script() {
        let a = PrimaryKeyDefinition {
            name: "orders_pkey".to_string(),
            columns: vec!["id".to_string()],
            create_script: None,
        };
        let mut b = a.clone();
        b.name = "ORDERS_PKEY".to_string();
        b.create_script = Some("ALTER TABLE ...".to_string());
        assert_eq!(a, b);
    }
}

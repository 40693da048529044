//! Schema-constrained prompt assembly.
//!
//! The instruction template is configuration text, not logic: built-in
//! templates exist per dialect and any of them can be replaced by a file.

use crate::schema::Schema;
use crate::types::{AskError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Version tag of the built-in templates.
pub const TEMPLATE_VERSION: &str = "v1";

/// Placeholder replaced by the dialect name in file templates.
const DIALECT_PLACEHOLDER: &str = "{dialect}";

/// Target SQL dialect for generated statements.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SqlDialect {
    #[default]
    Sqlite,
    Postgres,
    #[serde(rename = "mysql")]
    MySql,
}

impl SqlDialect {
    /// Display name used inside prompts.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Sqlite => "SQLite",
            Self::Postgres => "PostgreSQL",
            Self::MySql => "MySQL",
        }
    }

    /// Engine-specific idioms the model tends to get wrong.
    fn idioms(&self) -> &'static str {
        match self {
            Self::Sqlite => {
                "- Random ordering: ORDER BY RANDOM()
- String concatenation: a || b
- Dates are TEXT in ISO-8601; use date(), strftime('%Y-%m', col), julianday()
- Row limits: LIMIT n
- No RIGHT JOIN or FULL OUTER JOIN before SQLite 3.39; prefer LEFT JOIN
- Case-insensitive match: col LIKE 'x%' (LIKE is case-insensitive for ASCII)"
            }
            Self::Postgres => {
                "- Random ordering: ORDER BY RANDOM()
- String concatenation: a || b or concat(a, b)
- Dates: date_trunc('month', col), col::date, NOW() - INTERVAL '7 days'
- Row limits: LIMIT n
- Case-insensitive match: col ILIKE 'x%'
- Quote identifiers with double quotes only when required"
            }
            Self::MySql => {
                "- Random ordering: ORDER BY RAND()
- String concatenation: CONCAT(a, b) (|| is logical OR)
- Dates: DATE_FORMAT(col, '%Y-%m'), DATE_SUB(NOW(), INTERVAL 7 DAY)
- Row limits: LIMIT n
- Quote identifiers with backticks only when required"
            }
        }
    }
}

impl fmt::Display for SqlDialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SqlDialect {
    type Err = AskError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sqlite" | "sqlite3" => Ok(Self::Sqlite),
            "postgres" | "postgresql" | "pg" => Ok(Self::Postgres),
            "mysql" | "mariadb" => Ok(Self::MySql),
            other => Err(AskError::config(format!("unknown SQL dialect '{}'", other))),
        }
    }
}

/// Fixed, versioned instruction block sent as the system message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    version: String,
    dialect: SqlDialect,
    text: String,
}

impl PromptTemplate {
    /// Built-in template for a dialect.
    pub fn builtin(dialect: SqlDialect) -> Self {
        let text = format!(
            r#"You are an expert SQL query generator for a {name} database. Given a database schema and a question, write ONE {name} statement that answers the question.

SCHEMA RULES:
1. Use ONLY the tables and columns listed in the schema. Never invent tables or columns.
2. The schema is JSON: each key is a table name, each value lists its columns in order.
3. Join tables only through columns that exist on both sides.

DIALECT: {name}
Use {name} syntax only, not generic SQL:
{idioms}

QUERY GUIDELINES:
- Select only the columns the question needs instead of SELECT *
- Use aggregate functions (COUNT, SUM, AVG) with GROUP BY for summaries
- For "latest" or "most recent": ORDER BY the date column DESC LIMIT 1
- For "top N": ORDER BY the relevant column DESC LIMIT N
- Use DISTINCT when duplicates must be removed
- When the question is ambiguous, choose the most common interpretation

OUTPUT:
- Exactly one statement starting with SELECT, INSERT, UPDATE or DELETE
- Terminate the statement with a semicolon
- No explanations, no comments, no markdown code fences, nothing before or after the statement"#,
            name = dialect.name(),
            idioms = dialect.idioms(),
        );

        Self {
            version: TEMPLATE_VERSION.to_string(),
            dialect,
            text,
        }
    }

    /// Template from custom text; `{dialect}` is replaced with the dialect name.
    pub fn custom(version: impl Into<String>, dialect: SqlDialect, text: &str) -> Self {
        Self {
            version: version.into(),
            dialect,
            text: text.replace(DIALECT_PLACEHOLDER, dialect.name()),
        }
    }

    /// Load a template file. The version is the file stem.
    ///
    /// # Errors
    ///
    /// Returns `AskError::ConfigError` if the file cannot be read or is empty
    pub fn from_file(path: &Path, dialect: SqlDialect) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            AskError::config(format!("cannot read template {}: {}", path.display(), e))
        })?;
        if text.trim().is_empty() {
            return Err(AskError::config(format!("template {} is empty", path.display())));
        }

        let version = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("custom")
            .to_string();

        Ok(Self::custom(version, dialect, text.trim()))
    }

    /// Template version tag.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Dialect this template targets.
    pub fn dialect(&self) -> SqlDialect {
        self.dialect
    }

    /// Instruction text.
    pub fn text(&self) -> &str {
        &self.text
    }
}

/// Immutable per-request payload for the language model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PromptRequest {
    /// System instructions (the template text)
    pub instructions: String,

    /// Serialized schema
    pub schema: String,

    /// User question, trimmed
    pub question: String,

    /// Template version the instructions came from
    pub template_version: String,
}

impl PromptRequest {
    /// User message sent alongside the instructions.
    pub fn user_message(&self) -> String {
        format!(
            "Schema:\n{}\n\nQuestion: {}\n\nSQL Query:",
            self.schema, self.question
        )
    }

    /// Full prompt as one block, for display and single-prompt APIs.
    pub fn render(&self) -> String {
        format!("{}\n\n{}", self.instructions, self.user_message())
    }
}

/// Combines the template, schema and question. Pure.
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    template: PromptTemplate,
}

impl PromptBuilder {
    /// Builder over a template.
    pub fn new(template: PromptTemplate) -> Self {
        Self { template }
    }

    /// Builder over the built-in template for a dialect.
    pub fn for_dialect(dialect: SqlDialect) -> Self {
        Self::new(PromptTemplate::builtin(dialect))
    }

    /// Template in use.
    pub fn template(&self) -> &PromptTemplate {
        &self.template
    }

    /// Assemble a request. Identical inputs give byte-identical output.
    ///
    /// # Errors
    ///
    /// Returns `AskError::JsonError` only if schema serialization fails
    pub fn build(&self, schema: &Schema, question: &str) -> Result<PromptRequest> {
        Ok(PromptRequest {
            instructions: self.template.text().to_string(),
            schema: schema.to_prompt_text()?,
            question: question.trim().to_string(),
            template_version: self.template.version().to_string(),
        })
    }
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self::for_dialect(SqlDialect::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::io::Write;

    fn customers() -> Schema {
        Schema::new().with_table("customers", ["customer_id", "name", "city"])
    }

    #[test]
    fn test_user_message_layout() {
        let request = PromptBuilder::default()
            .build(&customers(), "  list all customer names \n")
            .unwrap();

        assert_eq!(
            request.user_message(),
            "Schema:\n{\"customers\":[\"customer_id\",\"name\",\"city\"]}\n\nQuestion: list all customer names\n\nSQL Query:"
        );
        assert_eq!(request.template_version, TEMPLATE_VERSION);
    }

    #[test]
    fn test_builtin_templates_per_dialect() {
        // (dialect, idiom that must appear, idiom that must not)
        let cases = [
            (SqlDialect::Sqlite, "ORDER BY RANDOM()", "ORDER BY RAND()"),
            (SqlDialect::Postgres, "ILIKE", "ORDER BY RAND()"),
            (SqlDialect::MySql, "ORDER BY RAND()", "ILIKE"),
        ];

        for (dialect, present, absent) in cases {
            let template = PromptTemplate::builtin(dialect);
            let text = template.text();
            assert!(text.contains(dialect.name()), "{:?}", dialect);
            assert!(text.contains(present), "{:?} missing {}", dialect, present);
            assert!(!text.contains(absent), "{:?} contains {}", dialect, absent);
            assert!(text.contains("ONLY the tables and columns"));
            assert!(text.contains("semicolon"));
            assert!(text.contains("No explanations"));
        }
    }

    #[test]
    fn test_dialect_parsing() {
        assert_eq!("SQLite".parse::<SqlDialect>().unwrap(), SqlDialect::Sqlite);
        assert_eq!("postgresql".parse::<SqlDialect>().unwrap(), SqlDialect::Postgres);
        assert_eq!("mariadb".parse::<SqlDialect>().unwrap(), SqlDialect::MySql);
        assert!("oracle".parse::<SqlDialect>().is_err());
    }

    #[test]
    fn test_template_from_file_substitutes_dialect() {
        let mut file = tempfile::Builder::new()
            .prefix("strict-")
            .suffix(".txt")
            .tempfile()
            .unwrap();
        writeln!(file, "Write one {{dialect}} query. Nothing else.").unwrap();

        let template = PromptTemplate::from_file(file.path(), SqlDialect::Postgres).unwrap();
        assert_eq!(template.text(), "Write one PostgreSQL query. Nothing else.");
        assert!(template.version().starts_with("strict-"));

        let request = PromptBuilder::new(template)
            .build(&customers(), "how many?")
            .unwrap();
        assert_eq!(request.instructions, "Write one PostgreSQL query. Nothing else.");
    }

    #[test]
    fn test_template_from_empty_file_fails() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let err = PromptTemplate::from_file(file.path(), SqlDialect::Sqlite).unwrap_err();
        assert!(matches!(err, AskError::ConfigError(_)));
    }

    proptest! {
        #[test]
        fn prop_build_is_pure(
            tables in prop::collection::btree_map("[a-z_]{1,12}", prop::collection::vec("[a-z_]{1,10}", 0..6), 0..5),
            question in ".{0,80}",
        ) {
            let mut forward = Schema::new();
            for (name, cols) in &tables {
                forward.insert_table(name.clone(), cols.clone());
            }
            let mut reverse = Schema::new();
            for (name, cols) in tables.iter().rev() {
                reverse.insert_table(name.clone(), cols.clone());
            }

            let builder = PromptBuilder::default();
            let a = builder.build(&forward, &question).unwrap();
            let b = builder.build(&reverse, &question).unwrap();
            prop_assert_eq!(a.render(), b.render());
            prop_assert_eq!(a, b);
        }
    }
}

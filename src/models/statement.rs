// Job Statement Model
//
// A statement as submitted by the caller: the raw SQL text plus the declared
// SQL type taken from the caller's metadata. The declared type is independent
// of what the parser later decides the statement is.

use serde::{Deserialize, Serialize};

/// Declared SQL type of a submitted statement
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SqlType {
    Select,
    Create,
    Drop,
    Alter,
    Insert,
    Desc,
    Describe,
    Explain,
    Use,
    Show,
    Load,
    Unload,
    Set,
    Reset,
    Execute,
    AddJar,
    AddFile,
    Add,
    Print,
    /// CREATE TABLE ... AS SELECT
    Ctas,
    /// REPLACE TABLE ... AS SELECT
    Rtas,
    With,
    Unknown,
}

impl SqlType {
    /// Upper-case label used in explain records
    pub fn label(&self) -> &'static str {
        match self {
            SqlType::Select => "SELECT",
            SqlType::Create => "CREATE",
            SqlType::Drop => "DROP",
            SqlType::Alter => "ALTER",
            SqlType::Insert => "INSERT",
            SqlType::Desc => "DESC",
            SqlType::Describe => "DESCRIBE",
            SqlType::Explain => "EXPLAIN",
            SqlType::Use => "USE",
            SqlType::Show => "SHOW",
            SqlType::Load => "LOAD",
            SqlType::Unload => "UNLOAD",
            SqlType::Set => "SET",
            SqlType::Reset => "RESET",
            SqlType::Execute => "EXECUTE",
            SqlType::AddJar => "ADD_JAR",
            SqlType::AddFile => "ADD_FILE",
            SqlType::Add => "ADD",
            SqlType::Print => "PRINT",
            SqlType::Ctas => "CTAS",
            SqlType::Rtas => "RTAS",
            SqlType::With => "WITH",
            SqlType::Unknown => "UNKNOWN",
        }
    }

    /// Whether statements of this type ultimately write to a sink
    pub fn is_sink_modify(&self) -> bool {
        matches!(
            self,
            SqlType::Insert
                | SqlType::Select
                | SqlType::With
                | SqlType::Ctas
                | SqlType::Rtas
                | SqlType::Print
        )
    }

    /// Declared kinds that this engine version refuses to explain
    pub fn is_table_as_select(&self) -> bool {
        matches!(self, SqlType::Ctas | SqlType::Rtas)
    }

    /// Infer the declared type from the leading keywords of a statement
    ///
    /// Used when the caller submits a statement without type metadata.
    /// Anything unrecognized becomes `Unknown`.
    pub fn infer(sql: &str) -> Self {
        let upper = sql.trim_start().to_uppercase();
        let words: Vec<&str> = upper.split_whitespace().take(8).collect();
        let first = words.first().copied().unwrap_or("");
        let second = words.get(1).copied().unwrap_or("");
        let has_as = has_top_level_as(&upper);

        match first {
            "SELECT" => SqlType::Select,
            "WITH" => SqlType::With,
            "INSERT" => SqlType::Insert,
            "CREATE" => {
                let replaces = second == "OR" && words.get(2).copied() == Some("REPLACE");
                let table_word = if replaces { words.get(3) } else { words.get(1) };
                let is_table = table_word.copied() == Some("TABLE");
                match (is_table && has_as, replaces) {
                    (true, true) => SqlType::Rtas,
                    (true, false) => SqlType::Ctas,
                    _ => SqlType::Create,
                }
            }
            "REPLACE" if second == "TABLE" && has_as => SqlType::Rtas,
            "DROP" => SqlType::Drop,
            "ALTER" => SqlType::Alter,
            "DESC" => SqlType::Desc,
            "DESCRIBE" => SqlType::Describe,
            "EXPLAIN" => SqlType::Explain,
            "USE" => SqlType::Use,
            "SHOW" => SqlType::Show,
            "LOAD" => SqlType::Load,
            "UNLOAD" => SqlType::Unload,
            "SET" => SqlType::Set,
            "RESET" => SqlType::Reset,
            "EXECUTE" => SqlType::Execute,
            "ADD" => match second {
                "JAR" => SqlType::AddJar,
                "FILE" => SqlType::AddFile,
                _ => SqlType::Add,
            },
            "PRINT" => SqlType::Print,
            _ => SqlType::Unknown,
        }
    }
}

/// Whether `AS` appears as a word outside brackets, quotes and comments
///
/// A table-as-select carries its query after a top-level `AS`; computed
/// columns, watermarks and casts keep theirs inside the column list.
fn has_top_level_as(sql: &str) -> bool {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut word = String::new();
    let mut chars = sql.chars().peekable();

    while let Some(ch) = chars.next() {
        if let Some(q) = quote {
            if ch == q {
                quote = None;
            }
            continue;
        }
        if ch.is_alphanumeric() || ch == '_' {
            if depth == 0 {
                word.push(ch);
            }
            continue;
        }
        if word.eq_ignore_ascii_case("AS") {
            return true;
        }
        word.clear();

        match ch {
            '\'' | '"' | '`' => quote = Some(ch),
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            '-' if chars.peek() == Some(&'-') => {
                for c in chars.by_ref() {
                    if c == '\n' {
                        break;
                    }
                }
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut prev = ' ';
                for c in chars.by_ref() {
                    if prev == '*' && c == '/' {
                        break;
                    }
                    prev = c;
                }
            }
            _ => {}
        }
    }

    word.eq_ignore_ascii_case("AS")
}

/// One entry of a statement set
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct JobStatement {
    statement: String,
    sql_type: SqlType,
}

impl JobStatement {
    pub fn new(statement: impl Into<String>, sql_type: SqlType) -> Self {
        Self {
            statement: statement.into(),
            sql_type,
        }
    }

    /// Build a statement whose declared type is inferred from its text
    pub fn inferred(statement: impl Into<String>) -> Self {
        let statement = statement.into();
        let sql_type = SqlType::infer(&statement);
        Self { statement, sql_type }
    }

    pub fn statement(&self) -> &str {
        &self.statement
    }

    pub fn sql_type(&self) -> SqlType {
        self.sql_type
    }
}

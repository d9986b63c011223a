//! The four statement shapes accepted against `todos`, and their restricted grammars

use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use crate::error::{PipelineError, PipelineResult};
use crate::storage::{TaskFilter, TaskId, TaskPatch};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StatementKind {
    Select,
    Insert,
    Update,
    Delete,
}

impl StatementKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Select => "SELECT",
            Self::Insert => "INSERT",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for StatementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StatementKind {
    type Err = PipelineError;

    /// Parse a lowercased leading token
    fn from_str(token: &str) -> Result<Self, Self::Err> {
        match token {
            "select" => Ok(Self::Select),
            "insert" => Ok(Self::Insert),
            "update" => Ok(Self::Update),
            "delete" => Ok(Self::Delete),
            other => Err(PipelineError::UnsupportedStatement {
                found: other.to_string(),
            }),
        }
    }
}

/// Rows an UPDATE or DELETE applies to
#[derive(Clone, Debug, PartialEq)]
pub enum RowTarget {
    Matching(TaskFilter),
    /// `id = (SELECT id ... ORDER BY ... LIMIT 1)`: the earliest-created task
    Oldest,
}

#[derive(Clone, Debug, PartialEq)]
pub struct InsertStatement {
    pub title: String,
    pub completed: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SelectStatement {
    pub filter: Option<TaskFilter>,
    /// WHERE text that matched no supported shape and was dropped
    pub ignored_where: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct UpdateStatement {
    pub patch: TaskPatch,
    pub target: RowTarget,
}

#[derive(Clone, Debug, PartialEq)]
pub struct DeleteStatement {
    pub target: TaskFilter,
}

/// A statement parsed into one of its four supported shapes
#[derive(Clone, Debug, PartialEq)]
pub enum Statement {
    Select(SelectStatement),
    Insert(InsertStatement),
    Update(UpdateStatement),
    Delete(DeleteStatement),
}

impl Statement {
    pub fn kind(&self) -> StatementKind {
        match self {
            Self::Select(_) => StatementKind::Select,
            Self::Insert(_) => StatementKind::Insert,
            Self::Update(_) => StatementKind::Update,
            Self::Delete(_) => StatementKind::Delete,
        }
    }

    /// Dispatch on the leading keyword, then parse that kind's grammar
    pub fn parse(sql: &str) -> PipelineResult<Self> {
        let cleaned = clean_statement(sql);
        let kind = leading_kind(&cleaned)?;
        match kind {
            StatementKind::Select => parse_select(&cleaned).map(Self::Select),
            StatementKind::Insert => parse_insert(&cleaned).map(Self::Insert),
            StatementKind::Update => parse_update(&cleaned).map(Self::Update),
            StatementKind::Delete => parse_delete(&cleaned).map(Self::Delete),
        }
    }
}

/// Trim and drop trailing semicolons
pub fn clean_statement(sql: &str) -> String {
    sql.trim().trim_end_matches(';').trim_end().to_string()
}

/// First whitespace-delimited token, lowercased, as a statement kind
pub fn leading_kind(cleaned: &str) -> PipelineResult<StatementKind> {
    let lowered = cleaned.to_lowercase();
    let token = lowered.split_whitespace().next().unwrap_or("");
    token.parse()
}

fn insert_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?is)^insert\s+into\s+todos\s*\([^)]*\)\s*values\s*\(\s*'((?:[^']|'')*)'\s*,\s*(true|false)\s*\)$",
        )
        .expect("valid insert pattern")
    })
}

fn select_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?is)^select\s+.+?\s+from\s+todos\b(.*)$").expect("valid select pattern")
    })
}

fn select_where() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(concat!(
            r"(?is)^\s*where\s+((?:[^']|'(?:[^']|'')*'|')+?)",
            r"(?:\s+order\s+by\s+\w+(?:\s+(?:asc|desc))?(?:\s+limit\s+\d+)?|\s+limit\s+\d+)?\s*$",
        ))
        .expect("valid select where pattern")
    })
}

fn update_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?is)^update\s+todos\s+set\s+(\w+)\s*=\s*('(?:[^']|'')*'|[^'\s]+)(?:\s+where\s+(.+))?$",
        )
        .expect("valid update pattern")
    })
}

fn delete_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?is)^delete\s+from\s+todos(?:\s+where\s+(.+))?$").expect("valid delete pattern")
    })
}

fn id_shape() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^id\s*=\s*'?(\d+)'?$").expect("valid id shape"))
}

fn title_equals_shape() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?is)^title\s*=\s*'((?:[^']|'')*)'$").expect("valid title shape")
    })
}

fn title_like_shape() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?is)^(?:lower\s*\(\s*)?title(?:\s*\))?\s+i?like\s+'%?((?:[^'%]|'')*)%?'$")
            .expect("valid like shape")
    })
}

fn completed_shape() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^completed\s*=\s*(true|false)$").expect("valid completed shape")
    })
}

fn unescape(literal: &str) -> String {
    literal.replace("''", "'")
}

fn match_id(clause: &str) -> Option<TaskFilter> {
    let caps = id_shape().captures(clause)?;
    caps[1].parse::<i64>().ok().map(|id| TaskFilter::Id(TaskId(id)))
}

fn match_title_equals(clause: &str) -> Option<TaskFilter> {
    title_equals_shape()
        .captures(clause)
        .map(|caps| TaskFilter::TitleEquals(unescape(&caps[1])))
}

fn match_title_like(clause: &str) -> Option<TaskFilter> {
    title_like_shape()
        .captures(clause)
        .map(|caps| TaskFilter::TitleContains(unescape(&caps[1])))
}

fn match_completed(clause: &str) -> Option<TaskFilter> {
    completed_shape()
        .captures(clause)
        .map(|caps| TaskFilter::Completed(caps[1].eq_ignore_ascii_case("true")))
}

fn is_oldest_subquery(clause: &str) -> bool {
    let lowered = clause.to_lowercase();
    lowered.contains("order by") && lowered.contains("limit")
}

fn parse_insert(cleaned: &str) -> PipelineResult<InsertStatement> {
    let caps = insert_pattern().captures(cleaned).ok_or_else(|| {
        PipelineError::parse(
            StatementKind::Insert,
            "expected INSERT INTO todos (...) VALUES ('<title>', true|false)",
        )
    })?;
    Ok(InsertStatement {
        title: unescape(&caps[1]),
        completed: caps[2].eq_ignore_ascii_case("true"),
    })
}

fn parse_select(cleaned: &str) -> PipelineResult<SelectStatement> {
    let caps = select_pattern().captures(cleaned).ok_or_else(|| {
        PipelineError::parse(StatementKind::Select, "expected SELECT ... FROM todos [WHERE ...]")
    })?;
    let rest = caps.get(1).map_or("", |m| m.as_str());

    let Some(where_caps) = select_where().captures(rest) else {
        return Ok(SelectStatement {
            filter: None,
            ignored_where: None,
        });
    };
    let clause = where_caps[1].trim();

    let filter = match_title_like(clause)
        .or_else(|| match_title_equals(clause))
        .or_else(|| match_completed(clause));
    let ignored_where = filter.is_none().then(|| clause.to_string());
    Ok(SelectStatement {
        filter,
        ignored_where,
    })
}

fn parse_update(cleaned: &str) -> PipelineResult<UpdateStatement> {
    let caps = update_pattern().captures(cleaned).ok_or_else(|| {
        PipelineError::parse(
            StatementKind::Update,
            "expected UPDATE todos SET <column> = <value> WHERE <condition>",
        )
    })?;

    let clause = caps
        .get(3)
        .map(|m| m.as_str().trim())
        .ok_or(PipelineError::MissingWhere {
            kind: StatementKind::Update,
        })?;

    let column = caps[1].to_lowercase();
    let patch = build_patch(&column, &caps[2])?;

    let target = if let Some(filter) = match_id(clause)
        .or_else(|| match_title_equals(clause))
        .or_else(|| match_title_like(clause))
    {
        RowTarget::Matching(filter)
    } else if is_oldest_subquery(clause) {
        RowTarget::Oldest
    } else {
        return Err(PipelineError::UnsupportedWhere {
            kind: StatementKind::Update,
            clause: clause.to_string(),
        });
    };

    Ok(UpdateStatement { patch, target })
}

/// Assignment value: quoted text stays text; bare `true`/`false` become booleans
#[derive(Clone, Debug, PartialEq)]
enum SetValue {
    Bool(bool),
    Text(String),
}

fn parse_set_value(raw: &str) -> SetValue {
    if let Some(inner) = raw.strip_prefix('\'').and_then(|r| r.strip_suffix('\'')) {
        return SetValue::Text(unescape(inner));
    }
    match raw.to_lowercase().as_str() {
        "true" => SetValue::Bool(true),
        "false" => SetValue::Bool(false),
        _ => SetValue::Text(raw.to_string()),
    }
}

fn build_patch(column: &str, raw_value: &str) -> PipelineResult<TaskPatch> {
    let value = parse_set_value(raw_value);
    match (column, value) {
        ("title", SetValue::Text(title)) => Ok(TaskPatch {
            title: Some(title),
            completed: None,
        }),
        ("title", SetValue::Bool(b)) => Ok(TaskPatch {
            title: Some(b.to_string()),
            completed: None,
        }),
        ("completed", SetValue::Bool(b)) => Ok(TaskPatch {
            title: None,
            completed: Some(b),
        }),
        ("completed", SetValue::Text(text)) => Err(PipelineError::parse(
            StatementKind::Update,
            format!("completed must be true or false, got '{}'", text),
        )),
        (other, _) => Err(PipelineError::parse(
            StatementKind::Update,
            format!("column '{}' cannot be updated (allowed: title, completed)", other),
        )),
    }
}

fn parse_delete(cleaned: &str) -> PipelineResult<DeleteStatement> {
    let caps = delete_pattern().captures(cleaned).ok_or_else(|| {
        PipelineError::parse(StatementKind::Delete, "expected DELETE FROM todos WHERE <condition>")
    })?;

    let clause = caps
        .get(1)
        .map(|m| m.as_str().trim())
        .ok_or(PipelineError::MissingWhere {
            kind: StatementKind::Delete,
        })?;

    let target = match_id(clause)
        .or_else(|| match_title_equals(clause))
        .or_else(|| match_title_like(clause))
        .ok_or_else(|| PipelineError::UnsupportedWhere {
            kind: StatementKind::Delete,
            clause: clause.to_string(),
        })?;

    Ok(DeleteStatement { target })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dispatch_rejects_unknown_kind() {
        let err = Statement::parse("DROP TABLE todos").unwrap_err();
        assert_eq!(
            err,
            PipelineError::UnsupportedStatement {
                found: "drop".into()
            }
        );
        assert!(Statement::parse("").is_err());
    }

    #[test]
    fn test_parse_insert() {
        let stmt = Statement::parse(
            "INSERT INTO todos (title, completed) VALUES ('Call mom''s dentist', false);",
        )
        .unwrap();
        assert_eq!(
            stmt,
            Statement::Insert(InsertStatement {
                title: "Call mom's dentist".into(),
                completed: false
            })
        );
    }

    #[test]
    fn test_parse_insert_rejects_other_shapes() {
        for sql in [
            "INSERT INTO todos (title, completed) VALUES (buy milk, false)",
            "INSERT INTO todos (title) VALUES ('Buy milk')",
            "INSERT INTO tasks (title, completed) VALUES ('Buy milk', false)",
        ] {
            let err = Statement::parse(sql).unwrap_err();
            assert!(matches!(
                err,
                PipelineError::Parse {
                    kind: StatementKind::Insert,
                    ..
                }
            ));
        }
    }

    #[test]
    fn test_parse_select_shapes() {
        let cases = [
            ("SELECT * FROM todos", None),
            (
                "SELECT * FROM todos WHERE title LIKE '%milk%' ORDER BY created_at DESC",
                Some(TaskFilter::TitleContains("milk".into())),
            ),
            (
                "select id, title from todos where title = 'Buy milk'",
                Some(TaskFilter::TitleEquals("Buy milk".into())),
            ),
            (
                "SELECT * FROM todos WHERE completed = FALSE LIMIT 10",
                Some(TaskFilter::Completed(false)),
            ),
            (
                "SELECT * FROM todos WHERE LOWER(title) ILIKE '%Milk%'",
                Some(TaskFilter::TitleContains("Milk".into())),
            ),
        ];
        for (sql, expected) in cases {
            match Statement::parse(sql).unwrap() {
                Statement::Select(select) => {
                    assert_eq!(select.filter, expected, "{}", sql);
                    assert_eq!(select.ignored_where, None);
                }
                other => panic!("expected select, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_select_trailer_words_inside_literals() {
        let cases = [
            (
                "SELECT * FROM todos WHERE title LIKE '%speed limit fines%'",
                TaskFilter::TitleContains("speed limit fines".into()),
            ),
            (
                "SELECT * FROM todos WHERE title = 'Ask about order by phone'",
                TaskFilter::TitleEquals("Ask about order by phone".into()),
            ),
            (
                "SELECT * FROM todos WHERE title = 'Limit 5 coffees' ORDER BY created_at DESC LIMIT 5",
                TaskFilter::TitleEquals("Limit 5 coffees".into()),
            ),
        ];
        for (sql, expected) in cases {
            match Statement::parse(sql).unwrap() {
                Statement::Select(select) => {
                    assert_eq!(select.filter, Some(expected), "{}", sql);
                    assert_eq!(select.ignored_where, None);
                }
                other => panic!("expected select, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_select_unknown_where_is_ignored() {
        let cases = [
            ("SELECT * FROM todos WHERE created_at > now()", "created_at > now()"),
            ("SELECT * FROM todos WHERE title = 'mom's", "title = 'mom's"),
        ];
        for (sql, clause) in cases {
            match Statement::parse(sql).unwrap() {
                Statement::Select(select) => {
                    assert_eq!(select.filter, None);
                    assert_eq!(select.ignored_where.as_deref(), Some(clause));
                }
                other => panic!("expected select, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_parse_update_shapes() {
        let stmt = Statement::parse("UPDATE todos SET completed = true WHERE id = 3").unwrap();
        assert_eq!(
            stmt,
            Statement::Update(UpdateStatement {
                patch: TaskPatch {
                    title: None,
                    completed: Some(true)
                },
                target: RowTarget::Matching(TaskFilter::Id(TaskId(3))),
            })
        );

        let stmt =
            Statement::parse("UPDATE todos SET title = 'Buy bread' WHERE title LIKE '%milk%'")
                .unwrap();
        assert_eq!(
            stmt,
            Statement::Update(UpdateStatement {
                patch: TaskPatch {
                    title: Some("Buy bread".into()),
                    completed: None
                },
                target: RowTarget::Matching(TaskFilter::TitleContains("milk".into())),
            })
        );

        let stmt = Statement::parse(
            "UPDATE todos SET completed = true WHERE id = (SELECT id FROM todos ORDER BY created_at ASC LIMIT 1);",
        )
        .unwrap();
        assert_eq!(
            stmt,
            Statement::Update(UpdateStatement {
                patch: TaskPatch {
                    title: None,
                    completed: Some(true)
                },
                target: RowTarget::Oldest,
            })
        );
    }

    #[test]
    fn test_update_requires_where() {
        let err = Statement::parse("UPDATE todos SET completed = true").unwrap_err();
        assert_eq!(
            err,
            PipelineError::MissingWhere {
                kind: StatementKind::Update
            }
        );
    }

    #[test]
    fn test_update_rejects_unsupported_where_and_columns() {
        let err =
            Statement::parse("UPDATE todos SET completed = true WHERE completed = false").unwrap_err();
        assert!(matches!(err, PipelineError::UnsupportedWhere { .. }));

        let err = Statement::parse("UPDATE todos SET id = 4 WHERE id = 3").unwrap_err();
        assert!(matches!(err, PipelineError::Parse { .. }));

        let err = Statement::parse("UPDATE todos SET completed = 'yes' WHERE id = 3").unwrap_err();
        assert!(matches!(err, PipelineError::Parse { .. }));
    }

    #[test]
    fn test_delete_requires_where() {
        let err = Statement::parse("DELETE FROM todos").unwrap_err();
        assert_eq!(
            err,
            PipelineError::MissingWhere {
                kind: StatementKind::Delete
            }
        );
        assert!(err.to_string().contains("WHERE clause required"));
    }

    #[test]
    fn test_parse_delete_shapes() {
        let stmt = Statement::parse("DELETE FROM todos WHERE title = 'Call mom'").unwrap();
        assert_eq!(
            stmt,
            Statement::Delete(DeleteStatement {
                target: TaskFilter::TitleEquals("Call mom".into())
            })
        );

        let err = Statement::parse("DELETE FROM todos WHERE completed = true").unwrap_err();
        assert!(matches!(
            err,
            PipelineError::UnsupportedWhere {
                kind: StatementKind::Delete,
                ..
            }
        ));
    }
}

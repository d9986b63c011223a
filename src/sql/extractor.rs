//! Isolates the SQL statement inside a language model's free-text reply

use regex::Regex;
use std::sync::OnceLock;

/// Keywords scanned for, in this order, when no template matches
const STATEMENT_KEYWORDS: &[&str] = &["SELECT", "INSERT", "UPDATE", "DELETE"];

/// A statement head that looks like SQL rather than prose ("select the ...")
const STATEMENT_HEAD: &str =
    r"(?:select\s.+?\sfrom\s|insert\s+into\s|update\s+\w+\s+set\s|delete\s+from\s)";

fn code_fence() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)```(?:postgresql|postgres|psql|sqlite|mysql|sql)?")
            .expect("valid fence pattern")
    })
}

fn keyword_scanners() -> &'static [Regex] {
    static RE: OnceLock<Vec<Regex>> = OnceLock::new();
    RE.get_or_init(|| {
        STATEMENT_KEYWORDS
            .iter()
            .map(|k| Regex::new(&format!("(?i){}", k)).expect("valid keyword pattern"))
            .collect()
    })
}

/// Statement templates tried in order; capture group 1 is the statement
fn templates() -> &'static [Regex] {
    static RE: OnceLock<Vec<Regex>> = OnceLock::new();
    RE.get_or_init(|| {
        [
            // terminated by a semicolon outside quotes, may span lines
            format!(
                r"(?is)\b({}(?:[^;']|'(?:[^']|'')*'|')*);",
                STATEMENT_HEAD
            ),
            // starting its own line, plus any SQL continuation lines
            format!(
                r"(?im)^[ \t]*({}.*(?:\n[ \t]*(?:where|from|set|values|order|limit|and|or)\b.*)*)",
                STATEMENT_HEAD
            ),
            // after an introductory phrase such as "Here is the query:"
            format!(
                r"(?i)(?:here is|here's|the following|sql query|sql statement|query|sql)[^:\n]*:\s*({}[^\n]*)",
                STATEMENT_HEAD
            ),
        ]
        .iter()
        .map(|p| Regex::new(p).expect("valid statement template"))
        .collect()
    })
}

fn strip_trailing_semicolons(text: &str) -> String {
    text.trim().trim_end_matches(';').trim_end().to_string()
}

/// Best candidate SQL substring of `text`. Never fails; the result may still be invalid SQL.
pub fn extract_sql(text: &str) -> String {
    let cleaned = code_fence().replace_all(text, "");
    let cleaned = cleaned.trim();

    for template in templates() {
        if let Some(statement) = template.captures(cleaned).and_then(|c| c.get(1)) {
            let candidate = strip_trailing_semicolons(statement.as_str());
            if !candidate.is_empty() {
                return candidate;
            }
        }
    }

    for scanner in keyword_scanners() {
        if let Some(found) = scanner.find(cleaned) {
            return strip_trailing_semicolons(&cleaned[found.start()..]);
        }
    }

    strip_trailing_semicolons(cleaned)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_statement() {
        assert_eq!(extract_sql("SELECT * FROM todos;"), "SELECT * FROM todos");
        assert_eq!(extract_sql("  SELECT * FROM todos  "), "SELECT * FROM todos");
    }

    #[test]
    fn test_markdown_fences() {
        let reply = "```sql\nINSERT INTO todos (title, completed) VALUES ('Buy milk', false);\n```";
        assert_eq!(
            extract_sql(reply),
            "INSERT INTO todos (title, completed) VALUES ('Buy milk', false)"
        );
    }

    #[test]
    fn test_prose_preamble_and_commentary() {
        let reply = "Sure! Here is the query you asked for:\n\nDELETE FROM todos WHERE title LIKE '%milk%';\n\nThis removes every task mentioning milk.";
        assert_eq!(extract_sql(reply), "DELETE FROM todos WHERE title LIKE '%milk%'");
    }

    #[test]
    fn test_semicolon_inside_literal() {
        assert_eq!(
            extract_sql("INSERT INTO todos (title, completed) VALUES ('Buy milk; eggs', false);"),
            "INSERT INTO todos (title, completed) VALUES ('Buy milk; eggs', false)"
        );
        assert_eq!(
            extract_sql("Try this: UPDATE todos SET title = 'a;b' WHERE id = 2; it renames task 2"),
            "UPDATE todos SET title = 'a;b' WHERE id = 2"
        );
        // an unbalanced apostrophe still ends at the semicolon
        assert_eq!(
            extract_sql("INSERT INTO todos (title, completed) VALUES (mom's dentist, false); done"),
            "INSERT INTO todos (title, completed) VALUES (mom's dentist, false)"
        );
    }

    #[test]
    fn test_statement_on_own_line_without_semicolon() {
        let reply = "The statement is below\nUPDATE todos SET completed = true WHERE id = 3\nLet me know if you need more.";
        assert_eq!(extract_sql(reply), "UPDATE todos SET completed = true WHERE id = 3");
    }

    #[test]
    fn test_continuation_lines_without_semicolon() {
        let reply = "UPDATE todos SET completed = true\nWHERE id = 3\n\nThis marks task 3 as done.";
        assert_eq!(extract_sql(reply), "UPDATE todos SET completed = true\nWHERE id = 3");
    }

    #[test]
    fn test_intro_phrase_inline() {
        let reply = "Query: select * from todos where completed = false";
        assert_eq!(extract_sql(reply), "select * from todos where completed = false");
    }

    #[test]
    fn test_multiline_statement() {
        let reply = "```\nSELECT *\nFROM todos\nWHERE completed = true;\n```";
        assert_eq!(extract_sql(reply), "SELECT *\nFROM todos\nWHERE completed = true");
    }

    #[test]
    fn test_inline_fence_keeps_keyword() {
        assert_eq!(extract_sql("```SELECT * FROM todos```"), "SELECT * FROM todos");
    }

    #[test]
    fn test_keyword_scan_fallback() {
        assert_eq!(extract_sql("I think: delete it;;"), "delete it");
        assert_eq!(extract_sql("blah SELECT"), "SELECT");
    }

    #[test]
    fn test_last_resort_returns_text() {
        assert_eq!(extract_sql("no statement here;"), "no statement here");
        assert_eq!(extract_sql(""), "");
    }

    #[test]
    fn test_never_empty_when_keyword_present() {
        for text in ["select", "xx insert", "Update;", "uh... DELETE!", "```sql\nselect\n```"] {
            assert!(!extract_sql(text).is_empty(), "empty result for {:?}", text);
        }
    }
}

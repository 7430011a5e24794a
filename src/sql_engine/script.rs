//! SQL embedded in job scripts
//!
//! ETL job scripts keep their query in a triple-quoted string assigned on a
//! marker line:
//!
//! ```text
//! sql = """
//! INSERT INTO user_click
//! SELECT ... FROM user_event
//! """
//! ```

/// Marker used when the project config does not name one
pub const DEFAULT_MARKER: &str = "sql =";

const CLOSING_QUOTES: &str = "\"\"\"";

/// Lines after the first line containing `marker`, up to (not including) the
/// next line containing `"""`.
///
/// Returns `None` when the marker is absent or no line follows it.
pub fn extract_embedded_sql(content: &str, marker: &str) -> Option<String> {
    let mut lines = content.lines().skip_while(|line| !line.contains(marker));
    lines.next()?;

    let body: Vec<&str> = lines
        .take_while(|line| !line.contains(CLOSING_QUOTES))
        .collect();
    if body.is_empty() {
        return None;
    }

    Some(body.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_extracts_lines_between_marker_and_quotes() {
        let script = "import sys\nsql = \"\"\"\nSELECT *\nFROM t\n\"\"\"\nrun(sql)\n";
        assert_eq!(
            extract_embedded_sql(script, DEFAULT_MARKER),
            Some("SELECT *\nFROM t".to_string())
        );
    }

    #[test]
    fn test_unterminated_string_runs_to_end_of_file() {
        let script = "sql = \"\"\"\nSELECT 1\nFROM t";
        assert_eq!(
            extract_embedded_sql(script, DEFAULT_MARKER),
            Some("SELECT 1\nFROM t".to_string())
        );
    }

    #[test]
    fn test_missing_marker() {
        assert_eq!(extract_embedded_sql("print('hi')\n", DEFAULT_MARKER), None);
    }

    #[test]
    fn test_marker_without_body() {
        assert_eq!(extract_embedded_sql("sql = \"\"\"\n\"\"\"\n", DEFAULT_MARKER), None);
    }
}

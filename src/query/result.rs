//! Translation result
//!
//! Accumulates what the operator translators contribute: one filter
//! string, the selected wire columns, a row cap and the chain of
//! client-side transforms that finish what the server cannot express.

use std::fmt;
use std::sync::Arc;

use super::errors::{QueryError, QueryResult};
use crate::value::Value;

/// Client-side step applied to materialized rows after retrieval
pub type PostProcess = Arc<dyn Fn(Vec<Value>) -> QueryResult<Vec<Value>> + Send + Sync>;

/// Wire-level query descriptor plus post-processing chain
#[derive(Clone, Default)]
pub struct TranslationResult {
    filter: Option<String>,
    select_columns: Option<Vec<String>>,
    take_count: Option<u32>,
    post_processing: Vec<PostProcess>,
}

impl TranslationResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(&self) -> Option<&str> {
        self.filter.as_deref()
    }

    pub fn select_columns(&self) -> Option<&[String]> {
        self.select_columns.as_deref()
    }

    pub fn take_count(&self) -> Option<u32> {
        self.take_count
    }

    /// Number of registered post-processing steps
    pub fn post_processing_len(&self) -> usize {
        self.post_processing.len()
    }

    /// Adds a filter fragment, combining conjunctively with any existing one.
    ///
    /// A side is wrapped in parentheses when it has a top-level `or`, which
    /// is the only connective that binds looser than `and`.
    pub fn add_filter(&mut self, fragment: &str) -> QueryResult<()> {
        let fragment = fragment.trim();
        if fragment.is_empty() {
            return Err(QueryError::invalid_argument("filter text must not be empty"));
        }

        self.filter = Some(match self.filter.take() {
            None => fragment.to_string(),
            Some(existing) => format!("{} and {}", group_for_and(&existing), group_for_and(fragment)),
        });
        Ok(())
    }

    /// Appends wire column names, keeping first-seen order without duplicates
    pub fn add_columns<I, S>(&mut self, columns: I) -> QueryResult<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let selected = self.select_columns.get_or_insert_with(Vec::new);
        for column in columns {
            let column = column.into();
            if column.trim().is_empty() {
                return Err(QueryError::invalid_argument("column name must not be empty"));
            }
            if !selected.contains(&column) {
                selected.push(column);
            }
        }
        Ok(())
    }

    /// Caps the number of rows; the smallest cap wins
    pub fn set_take(&mut self, count: i64) -> QueryResult<()> {
        if count <= 0 {
            return Err(QueryError::invalid_argument(format!(
                "take count must be positive, got {}",
                count
            )));
        }
        let count = u32::try_from(count).map_err(|_| {
            QueryError::invalid_argument(format!("take count {} is out of range", count))
        })?;
        self.take_count = Some(self.take_count.map_or(count, |existing| existing.min(count)));
        Ok(())
    }

    /// Registers a transform applied after every transform already present
    pub fn push_post_process(&mut self, step: PostProcess) {
        self.post_processing.push(step);
    }

    /// Merges the contribution of an operator upstream of everything
    /// merged so far: its transforms run first.
    pub fn absorb_upstream(&mut self, upstream: TranslationResult) -> QueryResult<()> {
        if let Some(filter) = upstream.filter {
            self.add_filter(&filter)?;
        }
        if let Some(columns) = upstream.select_columns {
            self.add_columns(columns)?;
        }
        if let Some(take) = upstream.take_count {
            self.set_take(i64::from(take))?;
        }
        let mut chain = upstream.post_processing;
        chain.append(&mut self.post_processing);
        self.post_processing = chain;
        Ok(())
    }

    /// Runs the post-processing chain left to right
    pub fn post_process(&self, rows: Vec<Value>) -> QueryResult<Vec<Value>> {
        self.post_processing
            .iter()
            .try_fold(rows, |rows, step| step(rows))
    }

    /// Query parameters for the wire request
    pub fn query_parameters(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(filter) = &self.filter {
            params.push(("$filter", filter.clone()));
        }
        if let Some(columns) = &self.select_columns {
            params.push(("$select", columns.join(",")));
        }
        if let Some(take) = self.take_count {
            params.push(("$top", take.to_string()));
        }
        params
    }
}

impl fmt::Debug for TranslationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TranslationResult")
            .field("filter", &self.filter)
            .field("select_columns", &self.select_columns)
            .field("take_count", &self.take_count)
            .field("post_processing", &self.post_processing.len())
            .finish()
    }
}

fn group_for_and(fragment: &str) -> String {
    if has_top_level_or(fragment) {
        format!("({})", fragment)
    } else {
        fragment.to_string()
    }
}

/// True when `or` appears outside parentheses and string literals
pub(crate) fn has_top_level_or(fragment: &str) -> bool {
    let mut depth = 0usize;
    let mut in_quote = false;
    let mut word = String::new();

    for c in fragment.chars().chain(std::iter::once(' ')) {
        if in_quote {
            if c == '\'' {
                in_quote = false;
            }
            continue;
        }
        match c {
            '\'' => {
                in_quote = true;
                word.clear();
            }
            '(' | ')' | ' ' => {
                if depth == 0 && word == "or" {
                    return true;
                }
                word.clear();
                match c {
                    '(' => depth += 1,
                    ')' => depth = depth.saturating_sub(1),
                    _ => {}
                }
            }
            other => word.push(other),
        }
    }
    false
}

/// Removes parentheses that wrap the whole fragment
pub(crate) fn strip_outer_parens(fragment: &str) -> &str {
    let mut current = fragment.trim();
    while is_grouped(current) {
        current = current[1..current.len() - 1].trim();
    }
    current
}

/// True when one pair of parentheses wraps the whole fragment
pub(crate) fn is_grouped(fragment: &str) -> bool {
    fragment.starts_with('(') && fragment.ends_with(')') && closes_at_end(fragment)
}

/// Whether the opening parenthesis at index 0 is closed by the last char
fn closes_at_end(fragment: &str) -> bool {
    let mut depth = 0usize;
    let mut in_quote = false;
    let last = fragment.len() - 1;

    for (i, c) in fragment.char_indices() {
        if in_quote {
            if c == '\'' {
                in_quote = false;
            }
            continue;
        }
        match c {
            '\'' => in_quote = true,
            '(' => depth += 1,
            ')' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return i == last;
                }
            }
            _ => {}
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filters_combine_conjunctively() {
        let mut result = TranslationResult::new();
        result.add_filter("A eq 1").unwrap();
        result.add_filter("B eq 2").unwrap();
        assert_eq!(result.filter(), Some("A eq 1 and B eq 2"));
    }

    #[test]
    fn test_disjunctions_grouped_when_combined() {
        let mut result = TranslationResult::new();
        result.add_filter("A eq 1 or B eq 2").unwrap();
        result.add_filter("C eq 3").unwrap();
        assert_eq!(result.filter(), Some("(A eq 1 or B eq 2) and C eq 3"));
    }

    #[test]
    fn test_quoted_or_is_not_a_connective() {
        assert!(!has_top_level_or("Name eq 'this or that'"));
        assert!(!has_top_level_or("(A eq 1 or B eq 2)"));
        assert!(has_top_level_or("A eq 1 or B eq 2"));
        assert!(!has_top_level_or("Color eq 'x' and Word eq 'or'"));
    }

    #[test]
    fn test_empty_filter_rejected() {
        let mut result = TranslationResult::new();
        let err = result.add_filter("  ").unwrap_err();
        assert_eq!(err.code(), "TABLE_QUERY_INVALID_ARGUMENT");
    }

    #[test]
    fn test_take_keeps_smallest() {
        let mut result = TranslationResult::new();
        result.set_take(10).unwrap();
        result.set_take(3).unwrap();
        result.set_take(7).unwrap();
        assert_eq!(result.take_count(), Some(3));
        assert!(result.set_take(0).is_err());
        assert!(result.set_take(-4).is_err());
    }

    #[test]
    fn test_columns_deduplicated() {
        let mut result = TranslationResult::new();
        result.add_columns(["RowKey", "Area", "RowKey"]).unwrap();
        assert_eq!(result.select_columns().unwrap(), ["RowKey", "Area"]);
        assert!(result.add_columns([""]).is_err());
    }

    #[test]
    fn test_strip_outer_parens() {
        assert_eq!(strip_outer_parens("((A eq 1))"), "A eq 1");
        assert_eq!(strip_outer_parens("(A eq 1) and (B eq 2)"), "(A eq 1) and (B eq 2)");
        assert_eq!(strip_outer_parens("Name eq '(x)'"), "Name eq '(x)'");
        assert_eq!(strip_outer_parens("(Name eq ')')"), "Name eq ')'");
    }

    #[test]
    fn test_upstream_transforms_run_first() {
        let mut outer = TranslationResult::new();
        outer.push_post_process(Arc::new(|mut rows: Vec<Value>| -> QueryResult<Vec<Value>> {
            rows.push(Value::from("outer"));
            Ok(rows)
        }));

        let mut upstream = TranslationResult::new();
        upstream.push_post_process(Arc::new(|mut rows: Vec<Value>| -> QueryResult<Vec<Value>> {
            rows.push(Value::from("upstream"));
            Ok(rows)
        }));

        outer.absorb_upstream(upstream).unwrap();
        let rows = outer.post_process(Vec::new()).unwrap();
        assert_eq!(rows, vec![Value::from("upstream"), Value::from("outer")]);
    }

    #[test]
    fn test_query_parameters() {
        let mut result = TranslationResult::new();
        result.add_filter("PartitionKey eq 'Europe'").unwrap();
        result.add_columns(["RowKey", "Area"]).unwrap();
        result.set_take(5).unwrap();

        assert_eq!(
            result.query_parameters(),
            vec![
                ("$filter", "PartitionKey eq 'Europe'".to_string()),
                ("$select", "RowKey,Area".to_string()),
                ("$top", "5".to_string()),
            ]
        );
    }
}

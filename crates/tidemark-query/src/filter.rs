use regex::bytes::Regex;
use serde::Deserialize;
use thiserror::Error;

/// A declarative query filter as it arrives from the caller: logical
/// property, operator, literal value.
#[derive(Debug, Clone, Deserialize)]
pub struct Filter {
    pub property: String,
    pub op: FilterOp,
    pub value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterOp {
    Eq,
    NotEq,
    /// Pattern match; the literal compiles to a regex automaton.
    RegexEq,
    RegexNotEq,
    Lt,
    Gt,
}

#[derive(Debug, Error)]
pub enum FilterError {
    #[error("unknown filter property: {0}")]
    UnknownProperty(String),

    #[error("invalid filter pattern: {0}")]
    Pattern(#[from] regex::Error),
}

/// One filter resolved to a physical column, ready for repeated execution.
///
/// Immutable after compilation; the automaton is built once per query, not
/// per evaluated row.
#[derive(Debug)]
pub struct CompiledFilter {
    pub column: &'static str,
    pub op: FilterOp,
    pub value: Vec<u8>,
    pattern: Option<Regex>,
}

impl CompiledFilter {
    /// Evaluate this predicate against one raw column cell.
    ///
    /// This is the seam handed to the query executor; comparison operators
    /// work on raw bytes (lexicographic for the ordering pair), pattern
    /// operators run the compiled automaton.
    pub fn matches(&self, cell: &[u8]) -> bool {
        match self.op {
            FilterOp::Eq => cell == self.value.as_slice(),
            FilterOp::NotEq => cell != self.value.as_slice(),
            FilterOp::Lt => cell < self.value.as_slice(),
            FilterOp::Gt => cell > self.value.as_slice(),
            FilterOp::RegexEq => self.is_pattern_match(cell),
            FilterOp::RegexNotEq => !self.is_pattern_match(cell),
        }
    }

    fn is_pattern_match(&self, cell: &[u8]) -> bool {
        self.pattern.as_ref().is_some_and(|p| p.is_match(cell))
    }
}

/// Map a logical property to its physical column name.
///
/// This table is owned by the query layer and versioned with it; renaming a
/// column here without migrating stored batches breaks old queries.
fn column_for(property: &str) -> Option<&'static str> {
    Some(match property {
        "path" | "url" => "path",
        "name" | "event_name" => "name",
        "referrer" => "referrer",
        "country" => "country",
        "region" => "region",
        "city" => "city",
        "device" => "device",
        "browser" => "browser",
        "os" => "os",
        "screen_width" => "screen_width",
        "session_key" => "session_key",
        "utm_source" => "utm_source",
        "utm_medium" => "utm_medium",
        "utm_campaign" => "utm_campaign",
        "utm_term" => "utm_term",
        "utm_content" => "utm_content",
        _ => return None,
    })
}

/// Compile a filter list into column predicates, all-or-nothing.
///
/// An unknown property or an invalid pattern aborts the whole batch and
/// returns that error; no partial result list is ever produced.
pub fn compile_filters(filters: &[Filter]) -> Result<Vec<CompiledFilter>, FilterError> {
    let mut compiled = Vec::with_capacity(filters.len());
    for filter in filters {
        let column = column_for(&filter.property)
            .ok_or_else(|| FilterError::UnknownProperty(filter.property.clone()))?;
        let pattern = match filter.op {
            FilterOp::RegexEq | FilterOp::RegexNotEq => Some(Regex::new(&filter.value)?),
            _ => None,
        };
        compiled.push(CompiledFilter {
            column,
            op: filter.op,
            value: filter.value.clone().into_bytes(),
            pattern,
        });
    }
    Ok(compiled)
}

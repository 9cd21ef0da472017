//! PostgREST query building.
//!
//! Queries are rendered as URL query pairs: `select=...`, `col=op.value`,
//! `order=col.desc`, `limit`, `offset`.

/// A row filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    Eq(String, String),
    /// Membership in a value list, rendered as `in.(a,b,c)`.
    In(String, Vec<String>),
    /// Case-insensitive substring match.
    ILike(String, String),
}

impl Filter {
    pub fn eq(column: impl Into<String>, value: impl ToString) -> Self {
        Filter::Eq(column.into(), value.to_string())
    }

    pub fn in_list<I, V>(column: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: ToString,
    {
        Filter::In(
            column.into(),
            values.into_iter().map(|v| v.to_string()).collect(),
        )
    }

    /// Matches `text` anywhere in the column. PostgREST wildcards in `text` are dropped.
    pub fn contains_text(column: impl Into<String>, text: &str) -> Self {
        let cleaned: String = text
            .chars()
            .filter(|c| !matches!(c, '*' | '%' | ',' | '(' | ')'))
            .collect();
        Filter::ILike(column.into(), cleaned)
    }

    pub fn column(&self) -> &str {
        match self {
            Filter::Eq(column, _) | Filter::In(column, _) | Filter::ILike(column, _) => column,
        }
    }

    /// Renders the filter as a `(column, expression)` query pair.
    pub fn to_pair(&self) -> (String, String) {
        match self {
            Filter::Eq(column, value) => (column.clone(), format!("eq.{}", value)),
            Filter::In(column, values) => {
                let list: Vec<String> = values.iter().map(|v| quote_list_value(v)).collect();
                (column.clone(), format!("in.({})", list.join(",")))
            }
            Filter::ILike(column, text) => (column.clone(), format!("ilike.*{}*", text)),
        }
    }
}

/// Quotes a list value containing PostgREST reserved characters.
fn quote_list_value(value: &str) -> String {
    if value.contains([',', '(', ')', '.', ':', '"', ' ']) {
        format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
    } else {
        value.to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

/// A read against one table, with optional embedded resources.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectQuery {
    pub table: String,
    pub columns: String,
    pub filters: Vec<Filter>,
    pub order: Vec<(String, Direction)>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
    /// Ask the store for the exact total row count.
    pub count_exact: bool,
}

impl SelectQuery {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            columns: "*".to_string(),
            filters: Vec::new(),
            order: Vec::new(),
            limit: None,
            offset: None,
            count_exact: false,
        }
    }

    pub fn select(mut self, columns: impl Into<String>) -> Self {
        self.columns = columns.into();
        self
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn order(mut self, column: impl Into<String>, direction: Direction) -> Self {
        self.order.push((column.into(), direction));
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn count_exact(mut self) -> Self {
        self.count_exact = true;
        self
    }

    pub fn has_filter_on(&self, column: &str) -> bool {
        self.filters.iter().any(|f| f.column() == column)
    }

    pub fn to_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = vec![("select".to_string(), self.columns.clone())];
        pairs.extend(self.filters.iter().map(Filter::to_pair));

        if !self.order.is_empty() {
            let order: Vec<String> = self
                .order
                .iter()
                .map(|(column, direction)| match direction {
                    Direction::Asc => format!("{}.asc", column),
                    Direction::Desc => format!("{}.desc", column),
                })
                .collect();
            pairs.push(("order".to_string(), order.join(",")));
        }
        if let Some(limit) = self.limit {
            pairs.push(("limit".to_string(), limit.to_string()));
        }
        if let Some(offset) = self.offset {
            pairs.push(("offset".to_string(), offset.to_string()));
        }
        pairs
    }
}

/// Parses the total from a `Content-Range` header such as `0-11/26` or `*/0`.
pub fn parse_content_range_total(header: &str) -> Option<usize> {
    header.rsplit_once('/')?.1.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_listing_query() {
        let query = SelectQuery::new("products")
            .select("*,categories!inner(slug)")
            .filter(Filter::eq("categories.slug", "yu-gi-oh"))
            .filter(Filter::contains_text("name", "blue*eyes"))
            .order("created_at", Direction::Desc)
            .limit(12)
            .offset(24);

        assert_eq!(
            query.to_pairs(),
            vec![
                ("select".to_string(), "*,categories!inner(slug)".to_string()),
                ("categories.slug".to_string(), "eq.yu-gi-oh".to_string()),
                ("name".to_string(), "ilike.*blueeyes*".to_string()),
                ("order".to_string(), "created_at.desc".to_string()),
                ("limit".to_string(), "12".to_string()),
                ("offset".to_string(), "24".to_string()),
            ]
        );
    }

    #[test]
    fn test_in_list_quotes_reserved_values() {
        let filter = Filter::in_list("product_id", ["a1", "b,2"]);
        assert_eq!(
            filter.to_pair(),
            ("product_id".to_string(), "in.(a1,\"b,2\")".to_string())
        );
    }

    #[test]
    fn test_content_range_total() {
        assert_eq!(parse_content_range_total("0-11/26"), Some(26));
        assert_eq!(parse_content_range_total("*/0"), Some(0));
        assert_eq!(parse_content_range_total("0-11/*"), None);
        assert_eq!(parse_content_range_total("garbage"), None);
    }
}

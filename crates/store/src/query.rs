//! PostgREST-style query builder.
//!
//! A `TableQuery` is built by the services, rendered into query-string pairs
//! by the HTTP store, and evaluated in-process by the mock store. Rendering
//! is pure so it can be unit-tested without a backend.

use serde_json::Value;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Op {
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
    Like,
    In,
    IsNull,
}

impl Op {
    fn keyword(&self) -> &'static str {
        match self {
            Op::Eq => "eq",
            Op::Neq => "neq",
            Op::Gt => "gt",
            Op::Gte => "gte",
            Op::Lt => "lt",
            Op::Lte => "lte",
            Op::Like => "like",
            Op::In => "in",
            Op::IsNull => "is",
        }
    }
}

#[derive(Clone, Debug)]
pub struct Filter {
    pub column: String,
    pub op: Op,
    pub value: Value,
}

#[derive(Clone, Debug)]
pub struct TableQuery {
    pub table: String,
    pub select: Option<String>,
    pub filters: Vec<Filter>,
    pub order: Vec<(String, bool)>,
    pub range: Option<(u64, u64)>,
    pub count: bool,
}

impl TableQuery {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            select: None,
            filters: Vec::new(),
            order: Vec::new(),
            range: None,
            count: false,
        }
    }

    pub fn select(mut self, columns: impl Into<String>) -> Self {
        self.select = Some(columns.into());
        self
    }

    fn filter(mut self, column: impl Into<String>, op: Op, value: impl Into<Value>) -> Self {
        self.filters.push(Filter { column: column.into(), op, value: value.into() });
        self
    }

    pub fn eq(self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filter(column, Op::Eq, value)
    }

    pub fn neq(self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filter(column, Op::Neq, value)
    }

    pub fn gt(self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filter(column, Op::Gt, value)
    }

    pub fn gte(self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filter(column, Op::Gte, value)
    }

    pub fn lt(self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filter(column, Op::Lt, value)
    }

    pub fn lte(self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filter(column, Op::Lte, value)
    }

    /// SQL LIKE pattern; `%` wildcards.
    pub fn like(self, column: impl Into<String>, pattern: impl Into<String>) -> Self {
        self.filter(column, Op::Like, pattern.into())
    }

    pub fn in_list(self, column: impl Into<String>, values: Vec<Value>) -> Self {
        self.filter(column, Op::In, Value::Array(values))
    }

    pub fn is_null(self, column: impl Into<String>) -> Self {
        self.filter(column, Op::IsNull, Value::Null)
    }

    pub fn order(mut self, column: impl Into<String>) -> Self {
        self.order.push((column.into(), false));
        self
    }

    pub fn order_desc(mut self, column: impl Into<String>) -> Self {
        self.order.push((column.into(), true));
        self
    }

    /// Zero-based row window.
    pub fn range(mut self, offset: u64, limit: u64) -> Self {
        self.range = Some((offset, limit));
        self
    }

    /// Ask the backend for the exact total row count alongside the page.
    pub fn with_count(mut self) -> Self {
        self.count = true;
        self
    }

    /// Render into query-string pairs the REST endpoint understands.
    pub fn render(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        if let Some(select) = &self.select {
            pairs.push(("select".to_string(), select.clone()));
        }
        for f in &self.filters {
            let rhs = match f.op {
                Op::IsNull => "is.null".to_string(),
                Op::In => {
                    let items: Vec<String> = f
                        .value
                        .as_array()
                        .map(|a| a.iter().map(render_scalar).collect())
                        .unwrap_or_default();
                    format!("in.({})", items.join(","))
                }
                _ => format!("{}.{}", f.op.keyword(), render_scalar(&f.value)),
            };
            pairs.push((f.column.clone(), rhs));
        }
        if !self.order.is_empty() {
            let rendered: Vec<String> = self
                .order
                .iter()
                .map(|(col, desc)| if *desc { format!("{}.desc", col) } else { col.clone() })
                .collect();
            pairs.push(("order".to_string(), rendered.join(",")));
        }
        if let Some((offset, limit)) = self.range {
            pairs.push(("offset".to_string(), offset.to_string()));
            pairs.push(("limit".to_string(), limit.to_string()));
        }
        pairs
    }
}

fn render_scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn renders_filters_in_order() {
        let q = TableQuery::new("stations")
            .select("id,name,region")
            .eq("region", "Ashanti")
            .eq("active", true)
            .order("name")
            .range(0, 20);
        let pairs = q.render();
        assert_eq!(
            pairs,
            vec![
                ("select".to_string(), "id,name,region".to_string()),
                ("region".to_string(), "eq.Ashanti".to_string()),
                ("active".to_string(), "eq.true".to_string()),
                ("order".to_string(), "name".to_string()),
                ("offset".to_string(), "0".to_string()),
                ("limit".to_string(), "20".to_string()),
            ]
        );
    }

    #[test]
    fn renders_in_list_and_null_checks() {
        let q = TableQuery::new("violations")
            .in_list("status", vec![json!("open"), json!("under_review")])
            .is_null("resolved_at");
        let pairs = q.render();
        assert_eq!(pairs[0].1, "in.(open,under_review)");
        assert_eq!(pairs[1].1, "is.null");
    }

    #[test]
    fn renders_descending_order_and_comparisons() {
        let q = TableQuery::new("fuel_prices")
            .gte("price", 20.5)
            .order_desc("effective_from");
        let pairs = q.render();
        assert_eq!(pairs[0], ("price".to_string(), "gte.20.5".to_string()));
        assert_eq!(pairs[1], ("order".to_string(), "effective_from.desc".to_string()));
    }
}

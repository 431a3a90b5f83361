use crate::ast::Expr;
use crate::spec::OperationId;

/// The tail of a partially built pipeline and the columns it exposes.
///
/// Symbols are keyed by [`symbol_key`]: a field name, or the rendered
/// InfluxQL of a call such as `mean(value)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Cursor {
    pub id: OperationId,
    symbols: Vec<(String, String)>,
    /// Rendered `*` or `/regex/` when the cursor carries several fields
    /// split by `_field`.
    pub field_set: Option<String>,
}

impl Cursor {
    pub fn new(id: OperationId) -> Self {
        Cursor {
            id,
            symbols: Vec::new(),
            field_set: None,
        }
    }

    pub fn with_symbol(mut self, key: impl Into<String>, column: impl Into<String>) -> Self {
        self.bind(key, column);
        self
    }

    /// Bind a symbol, keeping the first column bound to it.
    pub fn bind(&mut self, key: impl Into<String>, column: impl Into<String>) {
        let key = key.into();
        if self.column(&key).is_none() {
            self.symbols.push((key, column.into()));
        }
    }

    pub fn column(&self, key: &str) -> Option<&str> {
        self.symbols
            .iter()
            .find(|(symbol, _)| symbol == key)
            .map(|(_, column)| column.as_str())
    }

    pub fn symbols(&self) -> impl Iterator<Item = (&str, &str)> {
        self.symbols.iter().map(|(k, c)| (k.as_str(), c.as_str()))
    }

    /// Fold the symbols of another cursor over the same operation into this one.
    pub fn merge(&mut self, other: Cursor) {
        for (key, column) in other.symbols {
            self.bind(key, column);
        }
    }
}

/// Lookup key for an expression in a cursor.
pub fn symbol_key(expr: &Expr) -> String {
    match expr {
        Expr::VarRef { name, .. } => name.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_first_binding() {
        let mut cursor = Cursor::new("filter0".into()).with_symbol("value", "_value");
        cursor.bind("value", "val0");
        cursor.merge(Cursor::new("filter0".into()).with_symbol("total", "total"));
        assert_eq!(cursor.column("value"), Some("_value"));
        assert_eq!(cursor.column("total"), Some("total"));
        assert_eq!(cursor.symbols().count(), 2);
    }

    #[test]
    fn keys_calls_by_rendering() {
        let call = Expr::call("mean", vec![Expr::var("value")]);
        assert_eq!(symbol_key(&call), "mean(value)");
        assert_eq!(symbol_key(&Expr::var("my field")), "my field");
    }
}

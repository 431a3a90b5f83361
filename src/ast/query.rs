use crate::ast::SelectStatement;

/// Complete query.
///
/// Statements are separated by semicolons and compiled left to right into a
/// single spec with one result per statement.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Query {
    pub statements: Vec<SelectStatement>,
}

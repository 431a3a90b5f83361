//! Output column naming.

use crate::ast::Expr;
use std::collections::HashMap;

/// Name of the time column: its alias, or `time`.
pub fn time_column(alias: Option<&str>) -> &str {
    alias.unwrap_or("time")
}

/// Resolve one unique name per field.
///
/// The time column is claimed first, then every alias. Remaining fields take
/// their generated name, with `_1`, `_2`, ... appended on a conflict.
pub fn column_names(time_alias: Option<&str>, fields: &[(Expr, Option<String>)]) -> Vec<String> {
    let mut taken: HashMap<String, usize> = HashMap::new();
    taken.insert(time_column(time_alias).to_string(), 1);

    let mut names: Vec<Option<String>> = fields.iter().map(|(_, alias)| alias.clone()).collect();
    for alias in names.iter().flatten() {
        taken.insert(alias.clone(), 1);
    }

    for (slot, (expr, _)) in names.iter_mut().zip(fields) {
        if slot.is_some() {
            continue;
        }
        let mut name = field_name(expr);
        if let Some(&start) = taken.get(&name) {
            let mut count = start;
            loop {
                let candidate = format!("{name}_{count}");
                if !taken.contains_key(&candidate) {
                    taken.insert(name, count + 1);
                    name = candidate;
                    break;
                }
                count += 1;
            }
        }
        *taken.entry(name.clone()).or_default() += 1;
        *slot = Some(name);
    }

    names.into_iter().flatten().collect()
}

/// Generated name of an unaliased field.
pub fn field_name(expr: &Expr) -> String {
    match expr {
        Expr::Call { name, .. } => name.clone(),
        Expr::Distinct(_) => "distinct".to_string(),
        Expr::Binary { .. } => {
            let mut names = Vec::new();
            binary_names(expr, &mut names);
            names.join("_")
        }
        Expr::Paren(inner) => field_name(inner),
        Expr::VarRef { name, .. } => name.clone(),
        _ => String::new(),
    }
}

fn binary_names(expr: &Expr, names: &mut Vec<String>) {
    match expr {
        Expr::VarRef { name, .. } => names.push(name.clone()),
        Expr::Call { name, .. } => names.push(name.clone()),
        Expr::Binary { lhs, rhs, .. } => {
            binary_names(lhs, names);
            binary_names(rhs, names);
        }
        Expr::Paren(inner) => binary_names(inner, names),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::BinOp;

    fn unaliased(exprs: Vec<Expr>) -> Vec<(Expr, Option<String>)> {
        exprs.into_iter().map(|expr| (expr, None)).collect()
    }

    #[test]
    fn generated_names() {
        let sum = Expr::binary(
            BinOp::Add,
            Expr::var("value"),
            Expr::Paren(Box::new(Expr::binary(
                BinOp::Multiply,
                Expr::call("max", vec![Expr::var("a")]),
                Expr::Integer(2),
            ))),
        );
        assert_eq!(field_name(&sum), "value_max");
        assert_eq!(field_name(&Expr::Distinct("host".into())), "distinct");
        assert_eq!(field_name(&Expr::Wildcard), "");
    }

    #[test]
    fn conflicts_are_numbered() {
        let fields = unaliased(vec![
            Expr::call("mean", vec![Expr::var("a")]),
            Expr::call("mean", vec![Expr::var("b")]),
            Expr::call("mean", vec![Expr::var("c")]),
        ]);
        assert_eq!(column_names(None, &fields), ["mean", "mean_1", "mean_2"]);
    }

    #[test]
    fn aliases_are_claimed_first() {
        let fields = vec![
            (Expr::call("mean", vec![Expr::var("a")]), None),
            (Expr::call("max", vec![Expr::var("b")]), Some("mean".to_string())),
        ];
        assert_eq!(column_names(None, &fields), ["mean_1", "mean"]);
    }

    #[test]
    fn time_is_reserved() {
        let fields = unaliased(vec![Expr::var("time2"), Expr::var("t")]);
        assert_eq!(column_names(Some("t"), &fields), ["time2", "t_1"]);
    }
}

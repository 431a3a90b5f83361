//! Constant folding over InfluxQL expressions.
//!
//! `now()` becomes the fixed instant of the current call, literal-only
//! arithmetic folds, and math functions over literals are evaluated.
//! Anything that cannot be folded is rebuilt with its reduced children.

use crate::ast::{BinOp, Expr};
use crate::duration::Duration;
use crate::transpiler::catalog::MathFunction;
use chrono::{DateTime, Utc};

pub fn reduce(expr: &Expr, now: DateTime<Utc>) -> Expr {
    match expr {
        Expr::Binary { op, lhs, rhs } => {
            let lhs = reduce(lhs, now);
            let rhs = reduce(rhs, now);
            fold_binary(*op, &lhs, &rhs).unwrap_or_else(|| Expr::binary(*op, lhs, rhs))
        }
        Expr::Paren(inner) => match reduce(inner, now) {
            binary @ Expr::Binary { .. } => Expr::Paren(Box::new(binary)),
            other => other,
        },
        Expr::Call { name, args } => reduce_call(name, args, now),
        other => other.clone(),
    }
}

fn reduce_call(name: &str, args: &[Expr], now: DateTime<Utc>) -> Expr {
    if name == "now" && args.is_empty() {
        return Expr::Time(now);
    }
    let args: Vec<Expr> = args.iter().map(|arg| reduce(arg, now)).collect();
    match MathFunction::from_name(name) {
        Some(math) if args.len() == math.arity() && args.iter().all(Expr::is_literal) => {
            let values: Option<Vec<f64>> = args.iter().map(as_float).collect();
            values
                .and_then(|values| math.eval(&values))
                .map(Expr::Number)
                .unwrap_or(Expr::Nil)
        }
        _ => Expr::call(name, args),
    }
}

fn as_float(expr: &Expr) -> Option<f64> {
    match expr {
        Expr::Integer(n) => Some(*n as f64),
        Expr::Number(n) => Some(*n),
        _ => None,
    }
}

fn fold_binary(op: BinOp, lhs: &Expr, rhs: &Expr) -> Option<Expr> {
    match (lhs, rhs) {
        (Expr::Integer(l), Expr::Integer(r)) => fold_integers(op, *l, *r),
        (Expr::Integer(_) | Expr::Number(_), Expr::Integer(_) | Expr::Number(_)) => {
            fold_floats(op, as_float(lhs)?, as_float(rhs)?)
        }
        (Expr::Duration(l), Expr::Duration(r)) => match op {
            BinOp::Add => l.checked_add(*r).map(Expr::Duration),
            BinOp::Subtract => l.checked_sub(*r).map(Expr::Duration),
            _ => compare(op, l, r),
        },
        (Expr::Duration(d), Expr::Integer(n)) => match op {
            BinOp::Multiply => d.checked_mul(*n).map(Expr::Duration),
            BinOp::Divide if *n == 0 => Some(Expr::Duration(Duration::ZERO)),
            BinOp::Divide => d.checked_div(*n).map(Expr::Duration),
            _ => None,
        },
        (Expr::Integer(n), Expr::Duration(d)) if op == BinOp::Multiply => {
            d.checked_mul(*n).map(Expr::Duration)
        }
        (Expr::Time(t), Expr::Duration(d)) => match op {
            BinOp::Add => t.checked_add_signed(d.to_time_delta()).map(Expr::Time),
            BinOp::Subtract => t.checked_sub_signed(d.to_time_delta()).map(Expr::Time),
            _ => None,
        },
        (Expr::Duration(d), Expr::Time(t)) if op == BinOp::Add => {
            t.checked_add_signed(d.to_time_delta()).map(Expr::Time)
        }
        (Expr::Time(l), Expr::Time(r)) => match op {
            BinOp::Subtract => (*l - *r)
                .num_nanoseconds()
                .map(|nanos| Expr::Duration(Duration::from_nanos(nanos))),
            _ => compare(op, l, r),
        },
        (Expr::String(l), Expr::String(r)) => match op {
            BinOp::Add => Some(Expr::String(format!("{l}{r}"))),
            BinOp::Equal => Some(Expr::Boolean(l == r)),
            BinOp::NotEqual => Some(Expr::Boolean(l != r)),
            _ => None,
        },
        (Expr::Boolean(l), Expr::Boolean(r)) => match op {
            BinOp::And => Some(Expr::Boolean(*l && *r)),
            BinOp::Or => Some(Expr::Boolean(*l || *r)),
            BinOp::Equal => Some(Expr::Boolean(l == r)),
            BinOp::NotEqual => Some(Expr::Boolean(l != r)),
            _ => None,
        },
        _ => None,
    }
}

fn fold_integers(op: BinOp, l: i64, r: i64) -> Option<Expr> {
    let folded = match op {
        BinOp::Add => Expr::Integer(l.wrapping_add(r)),
        BinOp::Subtract => Expr::Integer(l.wrapping_sub(r)),
        BinOp::Multiply => Expr::Integer(l.wrapping_mul(r)),
        BinOp::Divide if r == 0 => Expr::Number(0.0),
        BinOp::Divide => Expr::Number(l as f64 / r as f64),
        BinOp::Modulo if r == 0 => Expr::Integer(0),
        BinOp::Modulo => Expr::Integer(l.wrapping_rem(r)),
        _ => return compare(op, &l, &r),
    };
    Some(folded)
}

fn fold_floats(op: BinOp, l: f64, r: f64) -> Option<Expr> {
    let folded = match op {
        BinOp::Add => l + r,
        BinOp::Subtract => l - r,
        BinOp::Multiply => l * r,
        BinOp::Divide if r == 0.0 => 0.0,
        BinOp::Divide => l / r,
        BinOp::Modulo if r == 0.0 => 0.0,
        BinOp::Modulo => l % r,
        _ => return compare(op, &l, &r),
    };
    Some(Expr::Number(folded))
}

fn compare<T: PartialOrd>(op: BinOp, l: &T, r: &T) -> Option<Expr> {
    let result = match op {
        BinOp::Equal => l == r,
        BinOp::NotEqual => l != r,
        BinOp::LessThan => l < r,
        BinOp::LessEqual => l <= r,
        BinOp::GreaterThan => l > r,
        BinOp::GreaterEqual => l >= r,
        _ => return None,
    };
    Some(Expr::Boolean(result))
}

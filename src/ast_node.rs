//! The parsed expression tree and its canonical string form (spec §4.1).

use ptree::TreeItem;
use std::borrow::Cow;

/// A parsed expression node, before any operator resolution has happened.
///
/// `expr := field | number | string | call` (spec §4.1 grammar).
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Field(String),
    Int(i64),
    Double(f64),
    Str(String),
    Call { name: String, args: Vec<Expr> },
}

/// Renders `value` so a decimal point is always present, distinguishing a
/// double literal's canonical form from an integer of the same magnitude
/// (spec §4.1: "Numbers without a decimal point are integers; with a decimal
/// point, doubles").
fn format_double(value: f64) -> String {
    let s = format!("{value}");
    if s.contains('.') || s.contains('e') || s.contains("inf") || s.contains("NaN") {
        s
    } else {
        format!("{s}.0")
    }
}

fn quote_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            _ => out.push(c),
        }
    }
    out.push('"');
    out
}

/// A deterministic string form per node (spec §4.1 "Canonicalisation"), used
/// as the key for common-subexpression sharing in [`crate::builder`].
pub fn canonical_string(expr: &Expr) -> String {
    match expr {
        Expr::Field(name) => format!("@{name}"),
        Expr::Int(v) => v.to_string(),
        Expr::Double(v) => format_double(*v),
        Expr::Str(s) => quote_string(s),
        Expr::Call { name, args } => {
            let rendered: Vec<String> = args.iter().map(canonical_string).collect();
            format!("{name}({})", rendered.join(","))
        }
    }
}

impl TreeItem for Expr {
    type Child = Expr;

    fn write_self<W: std::io::Write>(&self, f: &mut W, _: &ptree::Style) -> std::io::Result<()> {
        match self {
            Expr::Field(name) => write!(f, "@{name}"),
            Expr::Int(v) => write!(f, "{v}"),
            Expr::Double(v) => write!(f, "{}", format_double(*v)),
            Expr::Str(s) => write!(f, "{}", quote_string(s)),
            Expr::Call { name, .. } => write!(f, "{name}"),
        }
    }

    fn children(&self) -> Cow<[Expr]> {
        match self {
            Expr::Call { args, .. } => Cow::from(args),
            _ => Cow::from(&[][..]),
        }
    }
}

impl Expr {
    /// Pretty-print the parse tree to stdout, for ad hoc debugging.
    pub fn print(&self) -> std::io::Result<()> {
        ptree::print_tree(self)
    }
}

#[cfg(test)]
mod __tests__ {
    use super::*;

    #[test]
    fn canonical_string_distinguishes_int_from_double() {
        assert_eq!(canonical_string(&Expr::Int(3)), "3");
        assert_eq!(canonical_string(&Expr::Double(3.0)), "3.0");
    }

    #[test]
    fn canonical_string_renders_call_with_field_and_literal_args() {
        let expr = Expr::Call {
            name: "ts_mean".to_string(),
            args: vec![Expr::Field("x".to_string()), Expr::Int(3)],
        };
        assert_eq!(canonical_string(&expr), "ts_mean(@x,3)");
    }

    #[test]
    fn canonical_string_is_identical_for_syntactically_identical_subexpressions() {
        let a = Expr::Call {
            name: "ts_mean".to_string(),
            args: vec![Expr::Field("x".to_string()), Expr::Int(2)],
        };
        let b = a.clone();
        assert_eq!(canonical_string(&a), canonical_string(&b));
    }
}

//! Constant folding for enum initializers.
//!
//! Only literals and the numeric operators JavaScript defines on them are
//! folded. Identifiers must already have been replaced by their values
//! (the lowering pass inlines earlier enum members before calling in here).

use crate::ast::{BinaryOp, Expr, ExprKind, UnaryOp};

/// A compile-time value of an enum member.
#[derive(Debug, Clone, PartialEq)]
pub enum ConstValue {
    Number(f64),
    String(String),
}

impl ConstValue {
    pub fn into_expr(self, span: crate::span::Span) -> Expr {
        match self {
            ConstValue::Number(n) => Expr::new(ExprKind::Number(n), span),
            ConstValue::String(s) => Expr::new(ExprKind::String(s), span),
        }
    }
}

/// Evaluate `expr` if it is a constant expression.
pub fn fold_constant(expr: &Expr) -> Option<ConstValue> {
    match &expr.kind {
        ExprKind::Number(n) => Some(ConstValue::Number(*n)),
        ExprKind::String(s) => Some(ConstValue::String(s.clone())),
        // Raw text is only the value when nothing needs unescaping
        ExprKind::Template { quasis, exprs } if exprs.is_empty() => match quasis.as_slice() {
            [raw] if !raw.contains('\\') => Some(ConstValue::String(raw.clone())),
            _ => None,
        },
        ExprKind::Unary { op, arg } => {
            let ConstValue::Number(n) = fold_constant(arg)? else {
                return None;
            };
            match op {
                UnaryOp::Minus => Some(ConstValue::Number(-n)),
                UnaryOp::Plus => Some(ConstValue::Number(n)),
                UnaryOp::BitNot => Some(ConstValue::Number(f64::from(!to_int32(n)))),
                _ => None,
            }
        }
        ExprKind::Binary { op, left, right } => {
            let left = fold_constant(left)?;
            let right = fold_constant(right)?;
            match (left, right) {
                (ConstValue::Number(l), ConstValue::Number(r)) => fold_numeric(*op, l, r).map(ConstValue::Number),
                (ConstValue::String(l), ConstValue::String(r)) if *op == BinaryOp::Add => {
                    Some(ConstValue::String(l + &r))
                }
                _ => None,
            }
        }
        _ => None,
    }
}

fn fold_numeric(op: BinaryOp, l: f64, r: f64) -> Option<f64> {
    let value = match op {
        BinaryOp::Add => l + r,
        BinaryOp::Sub => l - r,
        BinaryOp::Mul => l * r,
        BinaryOp::Div => l / r,
        // `%` on f64 truncates like JavaScript's remainder
        BinaryOp::Mod => l % r,
        BinaryOp::Pow => js_pow(l, r),
        BinaryOp::Shl => f64::from(to_int32(l).wrapping_shl(shift_count(r))),
        BinaryOp::Shr => f64::from(to_int32(l) >> shift_count(r)),
        BinaryOp::UShr => f64::from(to_uint32(l) >> shift_count(r)),
        BinaryOp::BitAnd => f64::from(to_int32(l) & to_int32(r)),
        BinaryOp::BitOr => f64::from(to_int32(l) | to_int32(r)),
        BinaryOp::BitXor => f64::from(to_int32(l) ^ to_int32(r)),
        _ => return None,
    };
    Some(value)
}

/// `Math.pow` differs from `powf` only for `(±1) ** ±Infinity`.
fn js_pow(base: f64, exponent: f64) -> f64 {
    if base.abs() == 1.0 && exponent.is_infinite() {
        return f64::NAN;
    }
    base.powf(exponent)
}

/// ECMAScript ToUint32.
pub fn to_uint32(n: f64) -> u32 {
    if !n.is_finite() {
        return 0;
    }
    n.trunc().rem_euclid(4_294_967_296.0) as u32
}

/// ECMAScript ToInt32.
pub fn to_int32(n: f64) -> i32 {
    to_uint32(n) as i32
}

fn shift_count(n: f64) -> u32 {
    to_uint32(n) & 31
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::span::Span;

    fn num(n: f64) -> Expr {
        Expr::new(ExprKind::Number(n), Span::default())
    }

    fn string(s: &str) -> Expr {
        Expr::new(ExprKind::String(s.to_string()), Span::default())
    }

    fn bin(op: BinaryOp, l: Expr, r: Expr) -> Expr {
        Expr::binary(op, l, r)
    }

    fn unary(op: UnaryOp, arg: Expr) -> Expr {
        Expr::new(
            ExprKind::Unary {
                op,
                arg: Box::new(arg),
            },
            Span::default(),
        )
    }

    fn fold_number(expr: &Expr) -> f64 {
        match fold_constant(expr) {
            Some(ConstValue::Number(n)) => n,
            other => panic!("expected a number, got {other:?}"),
        }
    }

    #[test]
    fn test_arithmetic() {
        assert_eq!(fold_number(&bin(BinaryOp::Add, num(3.3), num(1.0))), 4.3);
        assert_eq!(fold_number(&bin(BinaryOp::Mod, num(-7.0), num(2.0))), -1.0);
        assert_eq!(fold_number(&bin(BinaryOp::Pow, num(2.0), num(10.0))), 1024.0);
        assert!(fold_number(&bin(BinaryOp::Pow, num(1.0), num(f64::INFINITY))).is_nan());
        assert!(fold_number(&bin(BinaryOp::Div, num(0.0), num(0.0))).is_nan());
        assert_eq!(fold_number(&bin(BinaryOp::Div, num(1.0), num(0.0))), f64::INFINITY);
    }

    #[test]
    fn test_negative_zero() {
        let value = fold_number(&unary(UnaryOp::Minus, num(0.0)));
        assert_eq!(value, 0.0);
        assert!(value.is_sign_negative());
    }

    #[test]
    fn test_bitwise_uses_int32() {
        assert_eq!(fold_number(&bin(BinaryOp::Shl, num(1.0), num(31.0))), -2147483648.0);
        assert_eq!(fold_number(&bin(BinaryOp::Shl, num(1.0), num(32.0))), 1.0);
        assert_eq!(fold_number(&bin(BinaryOp::UShr, num(-1.0), num(0.0))), 4294967295.0);
        assert_eq!(fold_number(&bin(BinaryOp::Shr, num(-8.0), num(1.0))), -4.0);
        assert_eq!(fold_number(&bin(BinaryOp::BitOr, num(4294967297.5), num(0.0))), 1.0);
        assert_eq!(fold_number(&bin(BinaryOp::BitAnd, num(f64::NAN), num(1.0))), 0.0);
        assert_eq!(fold_number(&unary(UnaryOp::BitNot, num(0.0))), -1.0);
    }

    #[test]
    fn test_strings() {
        assert_eq!(
            fold_constant(&bin(BinaryOp::Add, string("a"), string("b"))),
            Some(ConstValue::String("ab".into()))
        );
        assert_eq!(fold_constant(&bin(BinaryOp::Add, string("a"), num(1.0))), None);
        assert_eq!(fold_constant(&bin(BinaryOp::Sub, string("a"), string("b"))), None);
        assert_eq!(fold_constant(&unary(UnaryOp::Minus, string("1"))), None);
    }

    #[test]
    fn test_non_constants() {
        let ident = Expr::ident("x", Span::default());
        assert_eq!(fold_constant(&bin(BinaryOp::Add, ident, num(1.0))), None);
        assert_eq!(fold_constant(&bin(BinaryOp::Lt, num(1.0), num(2.0))), None);
    }

    #[test]
    fn test_int32_conversions() {
        assert_eq!(to_int32(2147483648.0), -2147483648);
        assert_eq!(to_int32(-1.5), -1);
        assert_eq!(to_uint32(-1.0), 4294967295);
        assert_eq!(to_uint32(f64::INFINITY), 0);
    }
}

//! Expression tree for compiled equation bodies and its scalar interpreter.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    FloorDiv,
    Mod,
    Pow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
}

/// How a call handles arguments outside the function's mathematical domain.
///
/// `math.`-qualified calls raise, like the scalar `math` module. Bare and
/// `np.`/`numpy.` calls return the IEEE-754 result (`nan`, `±inf`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Domain {
    Ieee,
    Checked,
}

impl Domain {
    pub fn of(name: &str) -> Self {
        if name.starts_with("math.") {
            Domain::Checked
        } else {
            Domain::Ieee
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    Abs,
    Min,
    Max,
    Pow,
    Sqrt,
    Exp,
    Log,
    Log2,
    Log10,
    Sin,
    Cos,
    Tan,
    Tanh,
    Asin,
    Acos,
    Atan,
    Floor,
    Ceil,
    Round,
    Sign,
    Sigmoid,
    Clip,
    Where,
}

impl Builtin {
    /// Resolve a call target, ignoring an `np.`/`numpy.`/`math.` prefix.
    pub fn lookup(name: &str) -> Option<Self> {
        let f = match strip_namespace(name) {
            "abs" | "fabs" | "absolute" => Builtin::Abs,
            "min" | "minimum" => Builtin::Min,
            "max" | "maximum" => Builtin::Max,
            "pow" | "power" => Builtin::Pow,
            "sqrt" => Builtin::Sqrt,
            "exp" => Builtin::Exp,
            "log" => Builtin::Log,
            "log2" => Builtin::Log2,
            "log10" => Builtin::Log10,
            "sin" => Builtin::Sin,
            "cos" => Builtin::Cos,
            "tan" => Builtin::Tan,
            "tanh" => Builtin::Tanh,
            "asin" | "arcsin" => Builtin::Asin,
            "acos" | "arccos" => Builtin::Acos,
            "atan" | "arctan" => Builtin::Atan,
            "floor" => Builtin::Floor,
            "ceil" => Builtin::Ceil,
            "round" => Builtin::Round,
            "sign" => Builtin::Sign,
            "sigmoid" => Builtin::Sigmoid,
            "clip" => Builtin::Clip,
            "where" => Builtin::Where,
            _ => return None,
        };
        Some(f)
    }

    /// Accepted argument counts as an inclusive range.
    pub fn arity(self) -> (usize, usize) {
        match self {
            Builtin::Min | Builtin::Max => (2, usize::MAX),
            Builtin::Pow => (2, 2),
            Builtin::Log => (1, 2),
            Builtin::Clip | Builtin::Where => (3, 3),
            _ => (1, 1),
        }
    }

    pub fn apply(self, args: &[f64], domain: Domain) -> Result<f64, String> {
        let (min, max) = self.arity();
        if args.len() < min || args.len() > max {
            return Err(format!("{self:?} called with {} argument(s)", args.len()));
        }
        let checked = domain == Domain::Checked;
        let domain_error = |what: String| Err(format!("math domain error: {what}"));
        let x = args[0];
        let v = match self {
            Builtin::Abs => x.abs(),
            Builtin::Min => fold_nan(args, f64::min),
            Builtin::Max => fold_nan(args, f64::max),
            Builtin::Pow => {
                let y = args[1];
                if checked && ((x == 0.0 && y < 0.0) || (x < 0.0 && y.is_finite() && y.fract() != 0.0)) {
                    return domain_error(format!("pow({x}, {y})"));
                }
                x.powf(y)
            }
            Builtin::Sqrt => {
                if checked && x < 0.0 {
                    return domain_error(format!("sqrt({x})"));
                }
                x.sqrt()
            }
            Builtin::Exp => x.exp(),
            Builtin::Log => {
                let base = args.get(1).copied();
                if checked && (x <= 0.0 || base.map_or(false, |b| b <= 0.0 || b == 1.0)) {
                    return domain_error(format!("log({x})"));
                }
                match base {
                    Some(b) => x.ln() / b.ln(),
                    None => x.ln(),
                }
            }
            Builtin::Log2 | Builtin::Log10 => {
                if checked && x <= 0.0 {
                    return domain_error(format!("{self:?}({x})"));
                }
                if self == Builtin::Log2 {
                    x.log2()
                } else {
                    x.log10()
                }
            }
            Builtin::Sin => x.sin(),
            Builtin::Cos => x.cos(),
            Builtin::Tan => x.tan(),
            Builtin::Tanh => x.tanh(),
            Builtin::Asin | Builtin::Acos => {
                if checked && !(-1.0..=1.0).contains(&x) {
                    return domain_error(format!("{self:?}({x})"));
                }
                if self == Builtin::Asin {
                    x.asin()
                } else {
                    x.acos()
                }
            }
            Builtin::Atan => x.atan(),
            Builtin::Floor => x.floor(),
            Builtin::Ceil => x.ceil(),
            Builtin::Round => x.round_ties_even(),
            Builtin::Sign => {
                if x > 0.0 {
                    1.0
                } else if x < 0.0 {
                    -1.0
                } else {
                    x
                }
            }
            Builtin::Sigmoid => 1.0 / (1.0 + (-x).exp()),
            Builtin::Clip => x.max(args[1]).min(args[2]),
            Builtin::Where => {
                if truthy(x) {
                    args[1]
                } else {
                    args[2]
                }
            }
        };
        Ok(v)
    }
}

/// Reduce with `f`, propagating any `nan` operand.
fn fold_nan(args: &[f64], f: fn(f64, f64) -> f64) -> f64 {
    if args.iter().any(|a| a.is_nan()) {
        return f64::NAN;
    }
    args.iter().copied().reduce(f).unwrap_or(f64::NAN)
}

/// Named constants available to every equation.
pub fn lookup_constant(name: &str) -> Option<f64> {
    match strip_namespace(name) {
        "pi" => Some(std::f64::consts::PI),
        "e" => Some(std::f64::consts::E),
        "tau" => Some(std::f64::consts::TAU),
        "inf" => Some(f64::INFINITY),
        "nan" => Some(f64::NAN),
        "True" => Some(1.0),
        "False" => Some(0.0),
        _ => None,
    }
}

fn strip_namespace(name: &str) -> &str {
    ["np.", "numpy.", "math."]
        .iter()
        .find_map(|prefix| name.strip_prefix(prefix))
        .unwrap_or(name)
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Num(f64),
    /// Positional argument slot.
    Arg(usize),
    Neg(Box<Expr>),
    Not(Box<Expr>),
    Binary(BinOp, Box<Expr>, Box<Expr>),
    /// Chained comparison `a < b <= c`.
    Compare(Box<Expr>, Vec<(CmpOp, Expr)>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Cond {
        cond: Box<Expr>,
        then: Box<Expr>,
        otherwise: Box<Expr>,
    },
    Call(Builtin, Domain, Vec<Expr>),
}

fn truthy(x: f64) -> bool {
    x != 0.0
}

fn bool_value(b: bool) -> f64 {
    if b {
        1.0
    } else {
        0.0
    }
}

/// Floored division and modulo with the remainder taking the divisor's sign.
///
/// Built on `fmod` so results match CPython's `float_divmod` exactly; a zero divisor
/// gives the IEEE quotient and a `nan` remainder.
pub fn divmod(a: f64, b: f64) -> (f64, f64) {
    if b == 0.0 {
        return (a / b, f64::NAN);
    }
    let mut m = a % b;
    let mut div = (a - m) / b;
    if m != 0.0 {
        if (b < 0.0) != (m < 0.0) {
            m += b;
            div -= 1.0;
        }
    } else {
        m = 0.0_f64.copysign(b);
    }
    let floordiv = if div != 0.0 {
        let mut f = div.floor();
        if div - f > 0.5 {
            f += 1.0;
        }
        f
    } else {
        0.0_f64.copysign(a / b)
    };
    (floordiv, m)
}

impl Expr {
    /// Evaluate with `args` bound to the argument slots.
    pub fn eval(&self, args: &[f64]) -> Result<f64, String> {
        match self {
            Expr::Num(v) => Ok(*v),
            Expr::Arg(i) => args
                .get(*i)
                .copied()
                .ok_or_else(|| format!("argument slot {i} is not bound")),
            Expr::Neg(inner) => Ok(-inner.eval(args)?),
            Expr::Not(inner) => Ok(bool_value(!truthy(inner.eval(args)?))),
            Expr::Binary(op, lhs, rhs) => {
                let a = lhs.eval(args)?;
                let b = rhs.eval(args)?;
                Ok(match op {
                    BinOp::Add => a + b,
                    BinOp::Sub => a - b,
                    BinOp::Mul => a * b,
                    BinOp::Div => a / b,
                    BinOp::FloorDiv => divmod(a, b).0,
                    BinOp::Mod => divmod(a, b).1,
                    BinOp::Pow => a.powf(b),
                })
            }
            Expr::Compare(first, rest) => {
                let mut lhs = first.eval(args)?;
                for (op, expr) in rest {
                    let rhs = expr.eval(args)?;
                    let holds = match op {
                        CmpOp::Lt => lhs < rhs,
                        CmpOp::Le => lhs <= rhs,
                        CmpOp::Gt => lhs > rhs,
                        CmpOp::Ge => lhs >= rhs,
                        CmpOp::Eq => lhs == rhs,
                        CmpOp::Ne => lhs != rhs,
                    };
                    if !holds {
                        return Ok(0.0);
                    }
                    lhs = rhs;
                }
                Ok(1.0)
            }
            // `and`/`or` yield one of their operands
            Expr::And(lhs, rhs) => {
                let a = lhs.eval(args)?;
                if truthy(a) {
                    rhs.eval(args)
                } else {
                    Ok(a)
                }
            }
            Expr::Or(lhs, rhs) => {
                let a = lhs.eval(args)?;
                if truthy(a) {
                    Ok(a)
                } else {
                    rhs.eval(args)
                }
            }
            Expr::Cond {
                cond,
                then,
                otherwise,
            } => {
                if truthy(cond.eval(args)?) {
                    then.eval(args)
                } else {
                    otherwise.eval(args)
                }
            }
            Expr::Call(f, domain, params) => {
                let values = params
                    .iter()
                    .map(|p| p.eval(args))
                    .collect::<Result<Vec<_>, _>>()?;
                f.apply(&values, *domain)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn num(v: f64) -> Box<Expr> {
        Box::new(Expr::Num(v))
    }

    #[test]
    fn modulo_follows_divisor_sign() {
        let e = Expr::Binary(BinOp::Mod, num(-7.0), num(3.0));
        assert_eq!(e.eval(&[]).unwrap(), 2.0);
        let e = Expr::Binary(BinOp::FloorDiv, num(-7.0), num(2.0));
        assert_eq!(e.eval(&[]).unwrap(), -4.0);
    }

    #[test]
    fn floored_divmod_matches_fmod_based_results() {
        let floordiv = |a, b| Expr::Binary(BinOp::FloorDiv, num(a), num(b)).eval(&[]).unwrap();
        let modulo = |a, b| Expr::Binary(BinOp::Mod, num(a), num(b)).eval(&[]).unwrap();
        assert_eq!(floordiv(1.0, 0.1), 9.0);
        assert!((modulo(1.0, 0.1) - 0.09999999999999995).abs() < 1e-17);
        assert_eq!(modulo(5.0, f64::INFINITY), 5.0);
        assert_eq!(floordiv(5.0, f64::INFINITY), 0.0);
        assert_eq!(modulo(-5.0, f64::INFINITY), f64::INFINITY);
        assert_eq!(modulo(7.5, -2.0), -0.5);
        assert_eq!(floordiv(7.5, -2.0), -4.0);
        assert!(modulo(6.0, -3.0).is_sign_negative());
    }

    #[test]
    fn arithmetic_on_operands_follows_ieee() {
        let div = Expr::Binary(BinOp::Div, num(1.0), Box::new(Expr::Arg(0)));
        assert_eq!(div.eval(&[0.0]).unwrap(), f64::INFINITY);
        assert_eq!(div.eval(&[4.0]).unwrap(), 0.25);
        let floordiv = Expr::Binary(BinOp::FloorDiv, num(-1.0), Box::new(Expr::Arg(0)));
        assert_eq!(floordiv.eval(&[0.0]).unwrap(), f64::NEG_INFINITY);
        let modulo = Expr::Binary(BinOp::Mod, num(1.0), Box::new(Expr::Arg(0)));
        assert!(modulo.eval(&[0.0]).unwrap().is_nan());
        let pow = Expr::Binary(BinOp::Pow, Box::new(Expr::Arg(0)), num(1.0 / 3.0));
        assert!(pow.eval(&[-8.0]).unwrap().is_nan());
        let pow = Expr::Binary(BinOp::Pow, Box::new(Expr::Arg(0)), num(-1.0));
        assert_eq!(pow.eval(&[0.0]).unwrap(), f64::INFINITY);
        assert_eq!(pow.eval(&[-2.0]).unwrap(), -0.5);
    }

    #[test]
    fn unbound_slots_and_bad_call_arity_are_errors() {
        assert!(Expr::Arg(1).eval(&[1.0]).is_err());
        let call = Expr::Call(Builtin::Clip, Domain::Ieee, vec![Expr::Num(1.0)]);
        assert!(call.eval(&[]).is_err());
        assert!(Builtin::Max.apply(&[], Domain::Ieee).is_err());
    }

    #[test]
    fn boolean_operators_return_operands() {
        let e = Expr::Or(num(0.0), num(5.0));
        assert_eq!(e.eval(&[]).unwrap(), 5.0);
        let e = Expr::And(num(2.0), num(3.0));
        assert_eq!(e.eval(&[]).unwrap(), 3.0);
    }

    #[test]
    fn builtins_resolve_with_namespaces() {
        assert_eq!(Builtin::lookup("np.exp"), Some(Builtin::Exp));
        assert_eq!(Builtin::lookup("math.sqrt"), Some(Builtin::Sqrt));
        assert_eq!(Builtin::lookup("np.arctan"), Some(Builtin::Atan));
        assert_eq!(Builtin::lookup("eval"), None);
        assert_eq!(lookup_constant("np.pi"), Some(std::f64::consts::PI));
    }

    #[test]
    fn round_uses_bankers_rounding() {
        assert_eq!(Builtin::Round.apply(&[2.5], Domain::Ieee).unwrap(), 2.0);
        assert_eq!(Builtin::Round.apply(&[3.5], Domain::Ieee).unwrap(), 4.0);
    }

    #[test]
    fn min_and_max_propagate_nan() {
        assert!(Builtin::Max.apply(&[1.0, f64::NAN], Domain::Ieee).unwrap().is_nan());
        assert!(Builtin::Min.apply(&[f64::NAN, 1.0, 2.0], Domain::Ieee).unwrap().is_nan());
        assert_eq!(Builtin::Max.apply(&[1.0, 3.0, 2.0], Domain::Ieee).unwrap(), 3.0);
        assert_eq!(Builtin::Min.apply(&[1.0, -3.0], Domain::Ieee).unwrap(), -3.0);
    }

    #[test]
    fn checked_calls_raise_domain_errors() {
        assert_eq!(Domain::of("math.sqrt"), Domain::Checked);
        assert_eq!(Domain::of("np.sqrt"), Domain::Ieee);
        assert!(Builtin::Sqrt.apply(&[-1.0], Domain::Checked).is_err());
        assert!(Builtin::Log.apply(&[0.0], Domain::Checked).is_err());
        assert!(Builtin::Asin.apply(&[2.0], Domain::Checked).is_err());
        assert!(Builtin::Pow.apply(&[-8.0, 1.0 / 3.0], Domain::Checked).is_err());
        assert_eq!(Builtin::Pow.apply(&[-2.0, 2.0], Domain::Checked).unwrap(), 4.0);
    }

    #[test]
    fn unchecked_calls_return_ieee_values() {
        assert!(Builtin::Sqrt.apply(&[-1.0], Domain::Ieee).unwrap().is_nan());
        assert_eq!(Builtin::Log.apply(&[0.0], Domain::Ieee).unwrap(), f64::NEG_INFINITY);
        assert!(Builtin::Acos.apply(&[1.5], Domain::Ieee).unwrap().is_nan());
    }
}

use std::{
    cmp::Ordering,
    fmt::Display,
    ops::{Add, Div, Mul, Rem, Sub},
    rc::Rc,
};

/// Opaque reference to a struct record in the heap. Copying a handle aliases
/// the record.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HeapHandle(pub usize);

#[derive(Debug, Clone)]
pub enum Value {
    Nil,

    // Primitive
    Int(i64),
    Float(f64),
    Bool(bool),

    // Reference
    String(Rc<String>),
    Struct(HeapHandle),
}

impl Value {
    pub fn string(value: impl Into<String>) -> Self {
        Value::String(Rc::new(value.into()))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Bool(_) => "bool",
            Value::String(_) => "string",
            Value::Struct(_) => "struct",
        }
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    /// Truth value used by conditions and the `and`/`or`/`not` connectives.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Nil => false,
            Value::Int(n) => *n != 0,
            Value::Float(n) => *n != 0.0,
            Value::Bool(b) => *b,
            Value::String(s) => !s.is_empty(),
            Value::Struct(_) => true,
        }
    }

    fn as_float(&self) -> Option<f64> {
        match self {
            Value::Int(n) => Some(*n as f64),
            Value::Float(n) => Some(*n),
            _ => None,
        }
    }

    fn unsupported(op: &str, left: &Value, right: &Value) -> String {
        format!(
            "unsupported operand types for {}: {} and {}",
            op,
            left.type_name(),
            right.type_name()
        )
    }
}

// shortest round-trip digits; exponent form below 1e-4 and from 1e16
fn format_float(n: f64) -> String {
    if n.is_nan() {
        return "nan".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "inf" } else { "-inf" }.to_string();
    }

    let scientific = format!("{:e}", n);
    let (mantissa, exponent) = scientific.split_once('e').unwrap_or((&scientific, "0"));
    let exponent: i32 = exponent.parse().unwrap_or(0);

    if (-4..16).contains(&exponent) {
        let plain = n.to_string();
        if plain.contains('.') {
            plain
        } else {
            format!("{}.0", plain)
        }
    } else {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!("{}e{}{:02}", mantissa, sign, exponent.abs())
    }
}

// integer division rounding towards negative infinity
fn floor_div(left: i64, right: i64) -> Option<i64> {
    let quotient = left.checked_div(right)?;
    if left % right != 0 && ((left < 0) != (right < 0)) {
        Some(quotient - 1)
    } else {
        Some(quotient)
    }
}

// remainder taking the sign of the divisor
fn floor_rem(left: i64, right: i64) -> Option<i64> {
    let remainder = left.checked_rem(right)?;
    if remainder != 0 && ((remainder < 0) != (right < 0)) {
        Some(remainder + right)
    } else {
        Some(remainder)
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Nil, Self::Nil) => true,
            (Self::Int(l0), Self::Int(r0)) => l0 == r0,
            (Self::Bool(l0), Self::Bool(r0)) => l0 == r0,
            (Self::String(l0), Self::String(r0)) => l0 == r0,
            (Self::Struct(l0), Self::Struct(r0)) => l0 == r0,
            (l0, r0) => match (l0.as_float(), r0.as_float()) {
                (Some(l0), Some(r0)) => l0 == r0,
                _ => false,
            },
        }
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Self::Int(l0), Self::Int(r0)) => l0.partial_cmp(r0),
            (Self::Bool(l0), Self::Bool(r0)) => l0.partial_cmp(r0),
            (Self::String(l0), Self::String(r0)) => l0.partial_cmp(r0),
            (l0, r0) => l0.as_float()?.partial_cmp(&r0.as_float()?),
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),
            Value::Int(n) => write!(f, "{}", n),
            Value::Float(n) => write!(f, "{}", format_float(*n)),
            Value::Bool(b) => write!(f, "{}", b),
            Value::String(s) => write!(f, "{}", s),
            Value::Struct(handle) => write!(f, "<struct #{}>", handle.0),
        }
    }
}

impl Add for Value {
    type Output = Result<Value, String>;

    fn add(self, rhs: Self) -> Self::Output {
        match (&self, &rhs) {
            (Value::Int(left), Value::Int(right)) => left
                .checked_add(*right)
                .map(Value::Int)
                .ok_or_else(|| "integer overflow".to_string()),
            (Value::String(left), Value::String(right)) => {
                Ok(Value::string(format!("{}{}", left, right)))
            }
            _ => match (self.as_float(), rhs.as_float()) {
                (Some(left), Some(right)) => Ok(Value::Float(left + right)),
                _ => Err(Value::unsupported("+", &self, &rhs)),
            },
        }
    }
}

impl Sub for Value {
    type Output = Result<Value, String>;

    fn sub(self, rhs: Self) -> Self::Output {
        match (&self, &rhs) {
            (Value::Int(left), Value::Int(right)) => left
                .checked_sub(*right)
                .map(Value::Int)
                .ok_or_else(|| "integer overflow".to_string()),
            _ => match (self.as_float(), rhs.as_float()) {
                (Some(left), Some(right)) => Ok(Value::Float(left - right)),
                _ => Err(Value::unsupported("-", &self, &rhs)),
            },
        }
    }
}

impl Mul for Value {
    type Output = Result<Value, String>;

    fn mul(self, rhs: Self) -> Self::Output {
        match (&self, &rhs) {
            (Value::Int(left), Value::Int(right)) => left
                .checked_mul(*right)
                .map(Value::Int)
                .ok_or_else(|| "integer overflow".to_string()),
            _ => match (self.as_float(), rhs.as_float()) {
                (Some(left), Some(right)) => Ok(Value::Float(left * right)),
                _ => Err(Value::unsupported("*", &self, &rhs)),
            },
        }
    }
}

impl Div for Value {
    type Output = Result<Value, String>;

    fn div(self, rhs: Self) -> Self::Output {
        match (&self, &rhs) {
            (Value::Int(_), Value::Int(0)) => Err("division by zero".into()),
            (Value::Int(left), Value::Int(right)) => floor_div(*left, *right)
                .map(Value::Int)
                .ok_or_else(|| "integer overflow".to_string()),
            _ => match (self.as_float(), rhs.as_float()) {
                (Some(_), Some(right)) if right == 0.0 => Err("division by zero".into()),
                (Some(left), Some(right)) => Ok(Value::Float(left / right)),
                _ => Err(Value::unsupported("/", &self, &rhs)),
            },
        }
    }
}

impl Rem for Value {
    type Output = Result<Value, String>;

    fn rem(self, rhs: Self) -> Self::Output {
        match (&self, &rhs) {
            (Value::Int(_), Value::Int(0)) => Err("modulo by zero".into()),
            (Value::Int(left), Value::Int(right)) => floor_rem(*left, *right)
                .map(Value::Int)
                .ok_or_else(|| "integer overflow".to_string()),
            _ => match (self.as_float(), rhs.as_float()) {
                (Some(_), Some(right)) if right == 0.0 => Err("modulo by zero".into()),
                (Some(left), Some(right)) => {
                    let remainder = left % right;
                    if remainder != 0.0 && ((remainder < 0.0) != (right < 0.0)) {
                        Ok(Value::Float(remainder + right))
                    } else {
                        Ok(Value::Float(remainder))
                    }
                }
                _ => Err(Value::unsupported("%", &self, &rhs)),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_division_floors() {
        assert_eq!((Value::Int(7) / Value::Int(2)).unwrap(), Value::Int(3));
        assert_eq!((Value::Int(-7) / Value::Int(2)).unwrap(), Value::Int(-4));
        assert_eq!((Value::Int(7) / Value::Int(-2)).unwrap(), Value::Int(-4));
    }

    #[test]
    fn test_float_division_is_real() {
        assert_eq!((Value::Float(7.0) / Value::Int(2)).unwrap(), Value::Float(3.5));
    }

    #[test]
    fn test_remainder_follows_divisor_sign() {
        assert_eq!((Value::Int(7) % Value::Int(3)).unwrap(), Value::Int(1));
        assert_eq!((Value::Int(-7) % Value::Int(3)).unwrap(), Value::Int(2));
        assert_eq!((Value::Int(7) % Value::Int(-3)).unwrap(), Value::Int(-2));
    }

    #[test]
    fn test_division_by_zero() {
        assert_eq!((Value::Int(1) / Value::Int(0)).unwrap_err(), "division by zero");
        assert_eq!((Value::Int(1) % Value::Int(0)).unwrap_err(), "modulo by zero");
    }

    #[test]
    fn test_overflow_is_an_error() {
        assert_eq!(
            (Value::Int(i64::MAX) + Value::Int(1)).unwrap_err(),
            "integer overflow"
        );
    }

    #[test]
    fn test_string_concatenation() {
        assert_eq!(
            (Value::string("ab") + Value::string("cd")).unwrap(),
            Value::string("abcd")
        );
        assert!((Value::string("ab") + Value::Int(1)).is_err());
    }

    #[test]
    fn test_comparisons() {
        assert_eq!(Value::Int(1), Value::Float(1.0));
        assert_ne!(Value::Nil, Value::Int(0));
        assert!(Value::string("abc") < Value::string("abd"));
        assert_eq!(Value::Nil.partial_cmp(&Value::Int(1)), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::Float(3.0).to_string(), "3.0");
        assert_eq!(Value::Float(2.5).to_string(), "2.5");
        assert_eq!(Value::Int(-4).to_string(), "-4");
        assert_eq!(Value::Nil.to_string(), "nil");
    }

    #[test]
    fn test_float_display_switches_to_exponent() {
        assert_eq!(Value::Float(1e15).to_string(), "1000000000000000.0");
        assert_eq!(Value::Float(1e16).to_string(), "1e+16");
        assert_eq!(Value::Float(1e17).to_string(), "1e+17");
        assert_eq!(Value::Float(-2.5e20).to_string(), "-2.5e+20");
        assert_eq!(Value::Float(0.0001).to_string(), "0.0001");
        assert_eq!(Value::Float(0.000015).to_string(), "1.5e-05");
        assert_eq!(Value::Float(0.0).to_string(), "0.0");
    }
}

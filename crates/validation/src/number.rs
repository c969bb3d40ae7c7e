use std::cmp::Ordering;

/// `Number` holds the possible numeric types of the JSON value model,
/// under a single total ordering. It is the comparison kernel for integer
/// detection and for numeric and timestamp range checks.
#[derive(Debug, Copy, Clone)]
pub enum Number {
    Unsigned(u64),
    Signed(i64),
    Float(f64),
}
use Number::*;

impl From<&serde_json::Number> for Number {
    fn from(n: &serde_json::Number) -> Self {
        if let Some(n) = n.as_u64() {
            Unsigned(n)
        } else if let Some(n) = n.as_i64() {
            Signed(n)
        } else {
            Float(n.as_f64().unwrap())
        }
    }
}

impl Ord for Number {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Unsigned(lhs), Unsigned(rhs)) => lhs.cmp(rhs),
            (Unsigned(_), Signed(rhs)) if *rhs < 0 => Ordering::Greater,
            (Unsigned(lhs), Signed(rhs)) => lhs.cmp(&(*rhs as u64)),
            (Unsigned(lhs), Float(rhs)) => f64_cmp(&(*lhs as f64), rhs),

            (Signed(lhs), Unsigned(_)) if *lhs < 0 => Ordering::Less,
            (Signed(lhs), Unsigned(rhs)) => (*lhs as u64).cmp(rhs),
            (Signed(lhs), Signed(rhs)) => lhs.cmp(rhs),
            (Signed(lhs), Float(rhs)) => f64_cmp(&(*lhs as f64), rhs),

            (Float(lhs), Unsigned(rhs)) => f64_cmp(lhs, &(*rhs as f64)),
            (Float(lhs), Signed(rhs)) => f64_cmp(lhs, &(*rhs as f64)),
            (Float(lhs), Float(rhs)) => f64_cmp(lhs, rhs),
        }
    }
}

impl PartialOrd for Number {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Number {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}
impl Eq for Number {}

impl Number {
    pub fn is_float(&self) -> bool {
        matches!(self, Float(_))
    }
}

fn f64_cmp(lhs: &f64, rhs: &f64) -> Ordering {
    lhs.partial_cmp(rhs).unwrap_or_else(|| {
        // NaN is defined to be less-than any other value, and equal to
        // itself, in order to provide a total ordering.
        if lhs.is_nan() && rhs.is_nan() {
            Ordering::Equal
        } else if lhs.is_nan() {
            Ordering::Less
        } else {
            Ordering::Greater
        }
    })
}

#[cfg(test)]
mod test {
    use super::*;

    fn from(s: &str) -> Number {
        let n: serde_json::Number = serde_json::from_str(s).unwrap();
        Number::from(&n)
    }

    #[test]
    fn test_conversion() {
        assert_eq!(from("1234"), Unsigned(1234));
        assert_eq!(from("-1234"), Signed(-1234));
        assert_eq!(from("12.34"), Float(12.34));
        assert_eq!(from("18446744073709551615"), Unsigned(18446744073709551615));

        assert!(!from("1234").is_float());
        assert!(from("12.34").is_float());
        // A written fraction is a float even when it's integral.
        assert!(from("5.0").is_float());
    }

    #[test]
    fn test_ordering() {
        fn is_lt(lhs: Number, rhs: Number) {
            assert_eq!(lhs.cmp(&rhs), Ordering::Less);
            assert_eq!(rhs.cmp(&lhs), Ordering::Greater);
        }

        is_lt(Unsigned(10), Unsigned(11));
        is_lt(Signed(-11), Signed(-10));
        is_lt(Float(1.0), Float(1.1));
        is_lt(Unsigned(10), Float(10.1));
        is_lt(Signed(-10), Float(-9.9));
        is_lt(Signed(-1), Unsigned(0));
        is_lt(Signed(-20), Unsigned(10000000000000000000u64));

        assert_eq!(Unsigned(20), Signed(20));
        assert_eq!(Unsigned(20), Float(20.0));
        assert_eq!(Signed(-20), Float(-20.0));
    }
}

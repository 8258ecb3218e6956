//! Operator types for version constraints

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Comparison operators for version constraints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    /// Equal (=, == or no operator)
    Equal,
    /// Less than (<)
    LessThan,
    /// Less than or equal (<=)
    LessThanOrEqual,
    /// Greater than (>)
    GreaterThan,
    /// Greater than or equal (>=)
    GreaterThanOrEqual,
    /// Not equal (!=, !)
    NotEqual,
}

#[derive(Error, Debug)]
#[error("Invalid operator: {0}")]
pub struct InvalidOperatorError(pub String);

impl Operator {
    /// Get the string representation of the operator
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Equal => "=",
            Operator::LessThan => "<",
            Operator::LessThanOrEqual => "<=",
            Operator::GreaterThan => ">",
            Operator::GreaterThanOrEqual => ">=",
            Operator::NotEqual => "!=",
        }
    }

    /// Get all supported operators, longest first so prefix matching is greedy
    pub fn supported_operators() -> &'static [&'static str] {
        &["==", "!=", ">=", "<=", "=", "!", ">", "<"]
    }

    /// Split a leading operator off a comparator token.
    ///
    /// Returns `(Operator::Equal, token)` when the token has no operator.
    pub fn split_prefix(token: &str) -> (Operator, &str) {
        for op in Self::supported_operators() {
            if let Some(rest) = token.strip_prefix(op) {
                // Table entries are all valid operators
                if let Ok(operator) = op.parse() {
                    return (operator, rest);
                }
            }
        }
        (Operator::Equal, token)
    }
}

impl FromStr for Operator {
    type Err = InvalidOperatorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" | "=" | "==" => Ok(Operator::Equal),
            "<" => Ok(Operator::LessThan),
            "<=" => Ok(Operator::LessThanOrEqual),
            ">" => Ok(Operator::GreaterThan),
            ">=" => Ok(Operator::GreaterThanOrEqual),
            "!=" | "!" => Ok(Operator::NotEqual),
            _ => Err(InvalidOperatorError(s.to_string())),
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_str() {
        assert_eq!("==".parse::<Operator>().unwrap(), Operator::Equal);
        assert_eq!("!".parse::<Operator>().unwrap(), Operator::NotEqual);
        assert_eq!(">=".parse::<Operator>().unwrap(), Operator::GreaterThanOrEqual);
        assert!("~>".parse::<Operator>().is_err());
    }

    #[test]
    fn test_split_prefix() {
        assert_eq!(Operator::split_prefix(">=1.0.0"), (Operator::GreaterThanOrEqual, "1.0.0"));
        assert_eq!(Operator::split_prefix("<1.0.0"), (Operator::LessThan, "1.0.0"));
        assert_eq!(Operator::split_prefix("!1.0.0"), (Operator::NotEqual, "1.0.0"));
        assert_eq!(Operator::split_prefix("1.0.0"), (Operator::Equal, "1.0.0"));
        assert_eq!(Operator::split_prefix(">="), (Operator::GreaterThanOrEqual, ""));
    }
}

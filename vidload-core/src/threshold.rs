//! Threshold expressions in the k6 dialect: `p(95)<1000`, `rate<0.05`, `count>10`.
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ThresholdParseError {
    #[error("Threshold `{0}` has no comparison operator.")]
    MissingOperator(String),

    #[error("Threshold `{0}` uses an unknown comparison operator.")]
    UnknownOperator(String),

    #[error("Threshold `{0}` uses an unknown aggregation.")]
    UnknownAggregation(String),

    #[error("Threshold `{0}` has a percentile outside 0..=100.")]
    InvalidPercentile(String),

    #[error("Threshold `{0}` does not compare against a number.")]
    InvalidValue(String),
}

/// The statistic a threshold reads off a finalized series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Aggregation {
    Rate,
    Count,
    Avg,
    Min,
    Max,
    Med,
    Percentile(f64),
}

impl fmt::Display for Aggregation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Aggregation::Rate => f.write_str("rate"),
            Aggregation::Count => f.write_str("count"),
            Aggregation::Avg => f.write_str("avg"),
            Aggregation::Min => f.write_str("min"),
            Aggregation::Max => f.write_str("max"),
            Aggregation::Med => f.write_str("med"),
            Aggregation::Percentile(p) => write!(f, "p({p})"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
}

impl Comparison {
    pub fn holds(&self, lhs: f64, rhs: f64) -> bool {
        match self {
            Comparison::Lt => lhs < rhs,
            Comparison::Le => lhs <= rhs,
            Comparison::Gt => lhs > rhs,
            Comparison::Ge => lhs >= rhs,
            Comparison::Eq => lhs == rhs,
            Comparison::Ne => lhs != rhs,
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            Comparison::Lt => "<",
            Comparison::Le => "<=",
            Comparison::Gt => ">",
            Comparison::Ge => ">=",
            Comparison::Eq => "==",
            Comparison::Ne => "!=",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdExpr {
    pub aggregation: Aggregation,
    pub comparison: Comparison,
    pub value: f64,
}

impl ThresholdExpr {
    pub fn holds(&self, observed: f64) -> bool {
        self.comparison.holds(observed, self.value)
    }
}

impl FromStr for ThresholdExpr {
    type Err = ThresholdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let compact: String = s.chars().filter(|c| !c.is_whitespace()).collect();

        let op_idx = compact
            .find(&['<', '>', '=', '!'][..])
            .ok_or_else(|| ThresholdParseError::MissingOperator(s.to_string()))?;
        let (lhs, rest) = compact.split_at(op_idx);

        let (comparison, op_len) = match rest.as_bytes() {
            [b'<', b'=', ..] => (Comparison::Le, 2),
            [b'<', ..] => (Comparison::Lt, 1),
            [b'>', b'=', ..] => (Comparison::Ge, 2),
            [b'>', ..] => (Comparison::Gt, 1),
            [b'=', b'=', ..] => (Comparison::Eq, 2),
            [b'!', b'=', ..] => (Comparison::Ne, 2),
            _ => return Err(ThresholdParseError::UnknownOperator(s.to_string())),
        };

        let aggregation = parse_aggregation(lhs, s)?;

        let value: f64 = rest[op_len..]
            .parse()
            .map_err(|_| ThresholdParseError::InvalidValue(s.to_string()))?;
        if !value.is_finite() {
            return Err(ThresholdParseError::InvalidValue(s.to_string()));
        }

        Ok(Self {
            aggregation,
            comparison,
            value,
        })
    }
}

fn parse_aggregation(lhs: &str, original: &str) -> Result<Aggregation, ThresholdParseError> {
    let aggregation = match lhs {
        "rate" => Aggregation::Rate,
        "count" => Aggregation::Count,
        "avg" => Aggregation::Avg,
        "min" => Aggregation::Min,
        "max" => Aggregation::Max,
        "med" => Aggregation::Med,
        _ => {
            let percentile = lhs
                .strip_prefix("p(")
                .and_then(|p| p.strip_suffix(')'))
                .ok_or_else(|| ThresholdParseError::UnknownAggregation(original.to_string()))?
                .parse::<f64>()
                .map_err(|_| ThresholdParseError::UnknownAggregation(original.to_string()))?;

            if !(0. ..=100.).contains(&percentile) {
                return Err(ThresholdParseError::InvalidPercentile(original.to_string()));
            }
            Aggregation::Percentile(percentile)
        }
    };
    Ok(aggregation)
}

impl fmt::Display for ThresholdExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}{}",
            self.aggregation,
            self.comparison.as_str(),
            self.value
        )
    }
}

/// A threshold bound to the metric it judges.
#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdRule {
    pub metric: String,
    pub expr: ThresholdExpr,
}

impl ThresholdRule {
    pub fn new(metric: &str, expr: &str) -> Result<Self, ThresholdParseError> {
        Ok(Self {
            metric: metric.to_string(),
            expr: expr.parse()?,
        })
    }
}

impl fmt::Display for ThresholdRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.metric, self.expr)
    }
}

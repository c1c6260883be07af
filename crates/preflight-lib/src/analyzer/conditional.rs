//! Outcome conditionals
//!
//! A conditional compares an aggregate over the matching nodes against a
//! literal:
//!
//! ```text
//! <function>(<property>) <operator> <literal>     e.g. min(cpuCapacity) >= 4
//! <operator> <literal>                            shorthand for count()
//! ```
//!
//! Literals that parse as integers are integers; everything else is a
//! quantity string. `count()` compares as an integer, the other functions
//! compare as quantities, converting integer literals to quantities first.
//! Comparing a count with a non-integer literal is an error.

use super::aggregate::{aggregate, AggregateFunction, AggregateValue};
use crate::error::{ConditionalError, ConditionalErrorKind};
use crate::models::ClusterNode;
use crate::quantity::Quantity;
use std::cmp::Ordering;
use std::fmt;
use tracing::debug;

/// Comparison operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Equal,
    Less,
    Greater,
    LessOrEqual,
    GreaterOrEqual,
}

impl Operator {
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "=" | "==" | "===" => Some(Operator::Equal),
            "<" => Some(Operator::Less),
            ">" => Some(Operator::Greater),
            "<=" => Some(Operator::LessOrEqual),
            ">=" => Some(Operator::GreaterOrEqual),
            _ => None,
        }
    }

    /// Whether `actual <op> desired` holds given `actual.cmp(desired)`
    pub fn holds(self, ordering: Ordering) -> bool {
        match self {
            Operator::Equal => ordering == Ordering::Equal,
            Operator::Less => ordering == Ordering::Less,
            Operator::Greater => ordering == Ordering::Greater,
            Operator::LessOrEqual => ordering != Ordering::Greater,
            Operator::GreaterOrEqual => ordering != Ordering::Less,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Equal => "==",
            Operator::Less => "<",
            Operator::Greater => ">",
            Operator::LessOrEqual => "<=",
            Operator::GreaterOrEqual => ">=",
        }
    }
}

/// Right-hand side of a conditional
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Literal {
    Integer(i64),
    Quantity(String),
}

impl Literal {
    fn parse(token: &str) -> Self {
        token
            .parse::<i64>()
            .map(Literal::Integer)
            .unwrap_or_else(|_| Literal::Quantity(token.to_string()))
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Integer(n) => write!(f, "{}", n),
            Literal::Quantity(s) => f.write_str(s),
        }
    }
}

/// A parsed, non-empty conditional
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conditional {
    /// Function name as written; resolved at evaluation time
    pub function: String,
    pub property: String,
    pub operator: Operator,
    pub literal: Literal,
}

impl Conditional {
    pub fn parse(expression: &str) -> Result<Self, ConditionalError> {
        let fail = |kind| ConditionalError::new(expression, kind);

        let mut parts: Vec<&str> = expression.split_whitespace().collect();
        if parts.len() == 2 {
            parts.insert(0, "count()");
        }
        let &[call, operator, literal] = parts.as_slice() else {
            return Err(fail(ConditionalErrorKind::Malformed));
        };

        let operator = Operator::from_token(operator)
            .ok_or_else(|| fail(ConditionalErrorKind::UnknownOperator(operator.to_string())))?;

        let (function, property) = call
            .strip_suffix(')')
            .and_then(|c| c.split_once('('))
            .ok_or_else(|| fail(ConditionalErrorKind::Pattern))?;

        Ok(Self {
            function: function.to_string(),
            property: property.to_string(),
            operator,
            literal: Literal::parse(literal),
        })
    }

    /// Aggregate value the conditional compares against its literal
    pub fn actual(
        &self,
        matching: &[&ClusterNode],
    ) -> Result<AggregateValue, ConditionalErrorKind> {
        let function = AggregateFunction::from_name(&self.function)
            .ok_or_else(|| ConditionalErrorKind::UnknownFunction(self.function.clone()))?;
        Ok(aggregate(function, &self.property, matching))
    }

    pub fn evaluate(&self, matching: &[&ClusterNode]) -> Result<bool, ConditionalErrorKind> {
        let actual = self.actual(matching)?;
        let ordering = compare(actual, &self.literal, &self.property)?;
        Ok(self.operator.holds(ordering))
    }
}

impl fmt::Display for Conditional {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}({}) {} {}",
            self.function,
            self.property,
            self.operator.as_str(),
            self.literal
        )
    }
}

fn compare(
    actual: AggregateValue,
    desired: &Literal,
    property: &str,
) -> Result<Ordering, ConditionalErrorKind> {
    match (actual, desired) {
        (AggregateValue::Integer(actual), Literal::Integer(desired)) => Ok(actual.cmp(desired)),
        (AggregateValue::Integer(_), Literal::Quantity(desired)) => {
            Err(ConditionalErrorKind::TypeMismatch(desired.clone()))
        }
        (AggregateValue::NoValue, _) => Err(ConditionalErrorKind::NoValue(property.to_string())),
        (AggregateValue::Quantity(actual), Literal::Quantity(desired)) => {
            Ok(actual.cmp(&Quantity::parse(desired)?))
        }
        (AggregateValue::Quantity(actual), Literal::Integer(desired)) => {
            Ok(actual.cmp(&Quantity::parse(&desired.to_string())?))
        }
    }
}

/// Evaluate an outcome conditional over the matching nodes
///
/// The empty conditional is always true. `total_node_count` is the size of
/// the unfiltered node set.
pub fn evaluate_conditional(
    conditional: &str,
    matching: &[&ClusterNode],
    total_node_count: usize,
) -> Result<bool, ConditionalError> {
    if conditional.is_empty() {
        return Ok(true);
    }

    let parsed = Conditional::parse(conditional)?;
    let result = parsed
        .evaluate(matching)
        .map_err(|kind| ConditionalError::new(conditional, kind))?;

    debug!(
        conditional = %conditional,
        matching_nodes = matching.len(),
        total_nodes = total_node_count,
        result,
        "Evaluated conditional"
    );
    Ok(result)
}

//! Aggregate functions over the matching node set

use crate::models::ClusterNode;
use crate::quantity::Quantity;
use std::fmt;

/// Aggregate function named in a conditional
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateFunction {
    Count,
    Min,
    Max,
    Sum,
}

impl AggregateFunction {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "count" => Some(AggregateFunction::Count),
            "min" => Some(AggregateFunction::Min),
            "max" => Some(AggregateFunction::Max),
            "sum" => Some(AggregateFunction::Sum),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            AggregateFunction::Count => "count",
            AggregateFunction::Min => "min",
            AggregateFunction::Max => "max",
            AggregateFunction::Sum => "sum",
        }
    }
}

impl fmt::Display for AggregateFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Value produced by an aggregate function
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateValue {
    /// Result of `count()`
    Integer(i64),
    /// Result of `min`, `max` or `sum`
    Quantity(Quantity),
    /// `min`/`max` over nodes that all lack the property
    NoValue,
}

impl fmt::Display for AggregateValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AggregateValue::Integer(n) => write!(f, "{}", n),
            AggregateValue::Quantity(q) => write!(f, "{}", q),
            AggregateValue::NoValue => f.write_str("<none>"),
        }
    }
}

/// Compute `function(property)` over `nodes`
///
/// Nodes that do not report `property` are skipped. Unknown property names
/// behave as if no node reports them.
pub fn aggregate(
    function: AggregateFunction,
    property: &str,
    nodes: &[&ClusterNode],
) -> AggregateValue {
    let values = nodes.iter().filter_map(|node| node.lookup(property));

    match function {
        AggregateFunction::Count => {
            AggregateValue::Integer(i64::try_from(nodes.len()).unwrap_or(i64::MAX))
        }
        AggregateFunction::Sum => {
            AggregateValue::Quantity(values.fold(Quantity::zero(), |acc, q| acc + q))
        }
        AggregateFunction::Min => values
            .min()
            .map_or(AggregateValue::NoValue, AggregateValue::Quantity),
        AggregateFunction::Max => values
            .max()
            .map_or(AggregateValue::NoValue, AggregateValue::Quantity),
    }
}

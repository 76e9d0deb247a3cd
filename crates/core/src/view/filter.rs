//! Facet filtering over an in-memory list.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// An entity that can be bucketed by a single facet value.
pub trait Faceted {
    type Facet: Copy + Eq + fmt::Debug + Send + Sync;

    fn facet(&self) -> Self::Facet;
}

/// The selected facet: everything, or one value.
///
/// Serialized as `"All"` or as the facet's own string form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Filter<F> {
    #[default]
    All,
    Only(F),
}

impl<F: Eq> Filter<F> {
    #[must_use]
    pub fn matches(&self, facet: &F) -> bool {
        match self {
            Self::All => true,
            Self::Only(wanted) => wanted == facet,
        }
    }
}

/// Keep the items whose facet matches, preserving input order.
///
/// `Filter::All` returns every item.
#[must_use]
pub fn filter_by<T: Faceted>(items: &[T], filter: Filter<T::Facet>) -> Vec<&T> {
    items
        .iter()
        .filter(|item| filter.matches(&item.facet()))
        .collect()
}

impl<F: fmt::Display> fmt::Display for Filter<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str("All"),
            Self::Only(facet) => facet.fmt(f),
        }
    }
}

impl<F: FromStr> FromStr for Filter<F> {
    type Err = F::Err;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "All" {
            Ok(Self::All)
        } else {
            s.parse().map(Self::Only)
        }
    }
}

impl<F: fmt::Display> Serialize for Filter<F> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de, F> Deserialize<'de> for Filter<F>
where
    F: FromStr,
    F::Err: fmt::Display,
{
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::models::order::tests::order;
    use crate::types::OrderStatus;

    fn sample() -> Vec<crate::models::Order> {
        vec![
            order(1, OrderStatus::New),
            order(2, OrderStatus::Shipped),
            order(3, OrderStatus::New),
            order(4, OrderStatus::Issue),
        ]
    }

    #[test]
    fn test_all_is_identity() {
        let orders = sample();
        let ids: Vec<i32> = filter_by(&orders, Filter::All)
            .iter()
            .map(|o| o.id.as_i32())
            .collect();
        assert_eq!(ids, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_single_status_keeps_order() {
        let orders = sample();
        for status in OrderStatus::ALL {
            let picked = filter_by(&orders, Filter::Only(status));
            assert!(picked.iter().all(|o| o.status == status));
            let expected = orders.iter().filter(|o| o.status == status).count();
            assert_eq!(picked.len(), expected);
        }
        let ids: Vec<i32> = filter_by(&orders, Filter::Only(OrderStatus::New))
            .iter()
            .map(|o| o.id.as_i32())
            .collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[test]
    fn test_empty_input() {
        let orders: Vec<crate::models::Order> = Vec::new();
        assert!(filter_by(&orders, Filter::Only(OrderStatus::New)).is_empty());
    }

    #[test]
    fn test_wire_format() {
        let all: Filter<OrderStatus> = "All".parse().unwrap();
        assert_eq!(all, Filter::All);
        let shipped: Filter<OrderStatus> = serde_json::from_str("\"Shipped\"").unwrap();
        assert_eq!(shipped, Filter::Only(OrderStatus::Shipped));
        assert_eq!(serde_json::to_string(&shipped).unwrap(), "\"Shipped\"");
        assert!("Lost".parse::<Filter<OrderStatus>>().is_err());
    }
}

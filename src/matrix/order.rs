//! Deterministic ordering of axis values for table layout.

use std::collections::{BTreeMap, BTreeSet};

use super::OrderingError;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum AxisOrder {
    /// Plain string order.
    #[default]
    Lexicographic,
    /// Ascending weight, ties broken by string order. Every value must be listed.
    Weighted {
        axis: String,
        weights: BTreeMap<String, i64>,
    },
}

impl AxisOrder {
    pub fn weighted<I, K>(axis: impl Into<String>, weights: I) -> Self
    where
        I: IntoIterator<Item = (K, i64)>,
        K: Into<String>,
    {
        AxisOrder::Weighted {
            axis: axis.into(),
            weights: weights.into_iter().map(|(k, w)| (k.into(), w)).collect(),
        }
    }

    /// Weighted if a mapping was configured, lexicographic otherwise.
    pub fn from_weights(axis: &str, weights: Option<&BTreeMap<String, i64>>) -> Self {
        match weights {
            Some(w) => Self::weighted(axis, w.iter().map(|(k, v)| (k.clone(), *v))),
            None => AxisOrder::Lexicographic,
        }
    }

    /// Order the distinct values in `values`. The result depends only on the
    /// set of values, never on the order they were supplied in.
    pub fn sort<I, S>(&self, values: I) -> Result<Vec<String>, OrderingError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let distinct: BTreeSet<String> = values.into_iter().map(|v| v.as_ref().to_string()).collect();

        match self {
            AxisOrder::Lexicographic => Ok(distinct.into_iter().collect()),
            AxisOrder::Weighted { axis, weights } => {
                let mut ranked = Vec::with_capacity(distinct.len());
                for value in distinct {
                    let weight = *weights.get(&value).ok_or_else(|| OrderingError::UnknownValue {
                        axis: axis.clone(),
                        value: value.clone(),
                    })?;
                    ranked.push((weight, value));
                }
                ranked.sort();
                Ok(ranked.into_iter().map(|(_, v)| v).collect())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn versions() -> AxisOrder {
        AxisOrder::weighted("version", [("devel", 0), ("stable-2.1", 1), ("stable-1.9", 2)])
    }

    #[test]
    fn test_weighted_order() {
        let sorted = versions().sort(["stable-1.9", "devel", "stable-2.1"]).unwrap();
        assert_eq!(sorted, vec!["devel", "stable-2.1", "stable-1.9"]);
    }

    #[test]
    fn test_order_ignores_arrival_order_and_duplicates() {
        let order = versions();
        let a = order.sort(["stable-2.1", "devel", "devel"]).unwrap();
        let b = order.sort(["devel", "stable-2.1"]).unwrap();
        assert_eq!(a, b);

        let lex = AxisOrder::Lexicographic;
        assert_eq!(
            lex.sort(["ol-7.2", "centos-6", "rhel-7.2"]).unwrap(),
            lex.sort(["rhel-7.2", "ol-7.2", "centos-6", "ol-7.2"]).unwrap()
        );
    }

    #[test]
    fn test_equal_weights_break_ties_by_name() {
        let order = AxisOrder::weighted("platform", [("b", 1), ("a", 1), ("c", 0)]);
        assert_eq!(order.sort(["a", "b", "c"]).unwrap(), vec!["c", "a", "b"]);
    }

    #[test]
    fn test_unknown_value_is_an_error() {
        let err = versions().sort(["devel", "stable-3.0"]).unwrap_err();
        assert_eq!(
            err,
            OrderingError::UnknownValue {
                axis: "version".to_string(),
                value: "stable-3.0".to_string()
            }
        );
    }

    #[test]
    fn test_from_weights_without_mapping_is_lexicographic() {
        assert_eq!(AxisOrder::from_weights("platform", None), AxisOrder::Lexicographic);
    }
}

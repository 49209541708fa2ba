//! Serving list-valued batches with one query per distinct argument set.

use std::collections::HashMap;

use super::batch::BatchResult;
use super::params::Param;
use crate::finder::FinderError;

/// Rows returned per parent when a child field gives no limit.
pub const DEFAULT_GROUP_LIMIT: usize = 1000;

/// The per-parent row cap for a child field's `limit` argument.
pub fn group_limit(limit: Option<i32>) -> usize {
    match limit {
        Some(n) if n > 0 => (n as usize).min(DEFAULT_GROUP_LIMIT),
        _ => DEFAULT_GROUP_LIMIT,
    }
}

/// Answer a batch of parameter records.
///
/// Records that share `where` and `limit` are grouped; `query` runs once
/// per group with that group's parent keys and must return one row list
/// per key, in key order. Each list is cut to the group's limit. A failed
/// group fails only the records in it.
pub fn param_group_query<K, W, T, F>(params: &[Param<K, W>], mut query: F) -> BatchResult<Vec<T>>
where
    K: Clone,
    F: FnMut(&[K], Option<&W>, usize) -> Result<Vec<Vec<T>>, FinderError>,
{
    let mut groups: Vec<Vec<usize>> = Vec::new();
    let mut index: HashMap<(&str, Option<i32>), usize> = HashMap::new();
    for (i, p) in params.iter().enumerate() {
        let g = *index.entry((p.filter.json(), p.limit)).or_insert_with(|| {
            groups.push(Vec::new());
            groups.len() - 1
        });
        groups[g].push(i);
    }

    let mut out: Vec<Result<Vec<T>, FinderError>> =
        (0..params.len()).map(|_| Ok(Vec::new())).collect();
    for members in groups {
        let first = &params[members[0]];
        let limit = group_limit(first.limit);
        let keys: Vec<K> = members.iter().map(|&i| params[i].key.clone()).collect();
        match query(&keys, first.filter.get(), limit) {
            Ok(rows) if rows.len() == keys.len() => {
                for (&i, mut rows) in members.iter().zip(rows) {
                    rows.truncate(limit);
                    out[i] = Ok(rows);
                }
            }
            Ok(rows) => {
                let err = FinderError::Backend(format!(
                    "grouped query returned {} row lists for {} keys",
                    rows.len(),
                    keys.len()
                ));
                for &i in &members {
                    out[i] = Err(err.clone());
                }
            }
            Err(err) => {
                for &i in &members {
                    out[i] = Err(err.clone());
                }
            }
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::RouteFilter;

    fn typed(route_type: i32) -> Option<RouteFilter> {
        Some(RouteFilter {
            route_type: Some(route_type),
            ..Default::default()
        })
    }

    #[test]
    fn limit_normalization() {
        assert_eq!(group_limit(None), DEFAULT_GROUP_LIMIT);
        assert_eq!(group_limit(Some(0)), DEFAULT_GROUP_LIMIT);
        assert_eq!(group_limit(Some(-4)), DEFAULT_GROUP_LIMIT);
        assert_eq!(group_limit(Some(3)), 3);
        assert_eq!(group_limit(Some(5000)), DEFAULT_GROUP_LIMIT);
    }

    #[test]
    fn one_query_per_group_in_key_order() {
        let params = vec![
            Param::new(1_i64).with_filter(typed(3)),
            Param::new(2_i64).with_filter(typed(1)),
            Param::new(3_i64).with_filter(typed(3)),
            Param::new(4_i64).with_filter(typed(3)).with_limit(Some(1)),
        ];
        let mut calls = Vec::new();
        let out = param_group_query(&params, |keys, filter, limit| {
            calls.push((keys.to_vec(), filter.and_then(|f| f.route_type), limit));
            Ok(keys.iter().map(|k| vec![*k * 10, *k * 10 + 1]).collect())
        })
        .unwrap();

        assert_eq!(
            calls,
            vec![
                (vec![1, 3], Some(3), 1000),
                (vec![2], Some(1), 1000),
                (vec![4], Some(3), 1),
            ]
        );
        assert_eq!(out[0], Ok(vec![10, 11]));
        assert_eq!(out[1], Ok(vec![20, 21]));
        assert_eq!(out[2], Ok(vec![30, 31]));
        assert_eq!(out[3], Ok(vec![40]));
    }

    #[test]
    fn group_failure_stays_in_group() {
        let params = vec![
            Param::new(1_i64).with_filter(typed(3)),
            Param::new(2_i64).with_filter(typed(1)),
        ];
        let out = param_group_query(&params, |keys, filter, _| {
            if filter.and_then(|f| f.route_type) == Some(1) {
                Err(FinderError::InvalidQuery("bad".into()))
            } else {
                Ok(keys.iter().map(|_| vec!["ok"]).collect())
            }
        })
        .unwrap();
        assert_eq!(out[0], Ok(vec!["ok"]));
        assert!(out[1].is_err());
    }
}

//! cartesian-product expansion of swept parameters
//!
//! A parameter whose value is a list marks a sweep: every candidate must be
//! explored in combination with all other sweeps. Expansion order is fixed by
//! the map's key order, so the run counter assigned to a given combination is
//! reproducible across invocations with identical input.

use crate::config::{ParamMap, ParamValue, Scalar};
use std::collections::BTreeMap;

/// first swept entry in key order, if any
/// shared by the expansion below and the up-front sweep-counting pass
pub fn first_swept(params: &ParamMap) -> Option<(&str, &[Scalar])> {
    params
        .iter()
        .find_map(|(key, value)| value.as_sweep().map(|sweep| (key.as_str(), sweep)))
}

/// the swept parameters as textual candidate lists, list order preserved
pub fn varied(params: &ParamMap) -> BTreeMap<String, Vec<String>> {
    params
        .iter()
        .filter_map(|(key, value)| {
            value.as_sweep().map(|sweep| {
                let rendered = sweep.iter().map(Scalar::to_string).collect();
                (key.clone(), rendered)
            })
        })
        .collect()
}

/// total number of combinations the expansion will produce
pub fn combination_count(params: &ParamMap) -> u64 {
    params
        .values()
        .filter_map(ParamValue::as_sweep)
        .map(|sweep| sweep.len() as u64)
        .product()
}

/// expand the first swept entry recursively, invoking `action` exactly once
/// per fully-scalar combination; the first swept key varies slowest
pub fn explore<E, F>(params: &ParamMap, action: &mut F) -> Result<(), E>
where
    F: FnMut(&ParamMap) -> Result<(), E>,
{
    match first_swept(params) {
        None => action(params),
        Some((key, sweep)) => {
            let key = key.to_owned();
            let sweep = sweep.to_vec();
            let mut child = params.clone();
            for candidate in sweep {
                child.insert(key.clone(), ParamValue::Scalar(candidate));
                explore(&child, action)?;
            }
            Ok(())
        }
    }
}

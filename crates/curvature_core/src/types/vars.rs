//! Variable-set alignment for sparse gradients and hessians.
//!
//! AD values store derivatives as sparse sorted maps keyed by variable name
//! (and by canonical name pair for second order). Combining two values with
//! different variable sets walks both maps once, `O(|V1| + |V2|)`, treating
//! absent entries as exactly `0.0`. All helpers here are commutative in the
//! bit-exact sense required by the algebra: swapping operands (with their
//! scale factors) never changes the result.

use std::collections::BTreeMap;

/// Sparse first-order coefficients keyed by variable name.
pub(crate) type GradMap = BTreeMap<String, f64>;

/// Sparse second-order coefficients keyed by canonical (sorted) name pair.
///
/// The entry at `(u, v)` with `u <= v` holds the actual second derivative
/// with respect to `u` and `v`; the symmetric mirror is implied.
pub(crate) type HessMap = BTreeMap<(String, String), f64>;

/// Canonicalise a variable pair so the lexicographically smaller name leads.
pub(crate) fn pair_key(u: &str, v: &str) -> (String, String) {
    if u <= v {
        (u.to_string(), v.to_string())
    } else {
        (v.to_string(), u.to_string())
    }
}

/// `fa * a + fb * b` over the union variable set.
pub(crate) fn merge_grad(a: &GradMap, b: &GradMap, fa: f64, fb: f64) -> GradMap {
    let mut out = GradMap::new();
    for (name, &ga) in a {
        let gb = b.get(name).copied().unwrap_or(0.0);
        out.insert(name.clone(), fa * ga + fb * gb);
    }
    for (name, &gb) in b {
        if !a.contains_key(name) {
            out.insert(name.clone(), fa * 0.0 + fb * gb);
        }
    }
    out
}

/// `fa * a + fb * b` over the union pair set.
pub(crate) fn merge_hess(a: &HessMap, b: &HessMap, fa: f64, fb: f64) -> HessMap {
    let mut out = HessMap::new();
    for (key, &ha) in a {
        let hb = b.get(key).copied().unwrap_or(0.0);
        out.insert(key.clone(), fa * ha + fb * hb);
    }
    for (key, &hb) in b {
        if !a.contains_key(key) {
            out.insert(key.clone(), fa * 0.0 + fb * hb);
        }
    }
    out
}

/// Accumulate `factor * (g ⊗ g)` into `out` (canonical entries).
///
/// Contributes `factor * g[u] * g[v]` to the second derivative at `(u, v)`.
pub(crate) fn accumulate_outer(out: &mut HessMap, g: &GradMap, factor: f64) {
    if factor == 0.0 {
        return;
    }
    for (u, &gu) in g {
        for (v, &gv) in g.range(u.clone()..) {
            *out.entry((u.clone(), v.clone())).or_insert(0.0) += factor * gu * gv;
        }
    }
}

/// Accumulate `factor * (g1 ⊗ g2 + g2 ⊗ g1)` into `out` (canonical entries).
///
/// Contributes `factor * (g1[u]*g2[v] + g2[u]*g1[v])` at `(u, v)`; on the
/// diagonal this is `2 * factor * g1[u] * g2[u]`. The sum inside the
/// parentheses is symmetric under operand swap, keeping multiplication
/// bit-identically commutative.
pub(crate) fn accumulate_cross(out: &mut HessMap, g1: &GradMap, g2: &GradMap, factor: f64) {
    if factor == 0.0 {
        return;
    }
    let mut names: Vec<&String> = g1.keys().chain(g2.keys()).collect();
    names.sort();
    names.dedup();
    for (i, u) in names.iter().enumerate() {
        let g1u = g1.get(*u).copied().unwrap_or(0.0);
        let g2u = g2.get(*u).copied().unwrap_or(0.0);
        for v in &names[i..] {
            let g1v = g1.get(*v).copied().unwrap_or(0.0);
            let g2v = g2.get(*v).copied().unwrap_or(0.0);
            let term = g1u * g2v + g2u * g1v;
            if term != 0.0 {
                *out.entry(((*u).clone(), (*v).clone())).or_insert(0.0) += factor * term;
            }
        }
    }
}

/// Coefficient equality over the union variable set (absent entries zero).
pub(crate) fn grad_eq(a: &GradMap, b: &GradMap) -> bool {
    a.iter()
        .all(|(name, &ga)| ga == b.get(name).copied().unwrap_or(0.0))
        && b.iter()
            .all(|(name, &gb)| gb == a.get(name).copied().unwrap_or(0.0))
}

/// Coefficient equality over the union pair set (absent entries zero).
pub(crate) fn hess_eq(a: &HessMap, b: &HessMap) -> bool {
    a.iter()
        .all(|(key, &ha)| ha == b.get(key).copied().unwrap_or(0.0))
        && b.iter()
            .all(|(key, &hb)| hb == a.get(key).copied().unwrap_or(0.0))
}

/// Serde representation for pair-keyed hessian maps.
///
/// JSON objects require string keys, so the map round-trips as a sequence of
/// `((u, v), value)` entries instead.
pub(crate) mod hess_serde {
    use super::HessMap;
    use serde::de::Deserializer;
    use serde::ser::Serializer;
    use serde::{Deserialize, Serialize};

    pub(crate) fn serialize<S: Serializer>(map: &HessMap, s: S) -> Result<S::Ok, S::Error> {
        let entries: Vec<(&(String, String), &f64)> = map.iter().collect();
        entries.serialize(s)
    }

    pub(crate) fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<HessMap, D::Error> {
        let entries: Vec<((String, String), f64)> = Vec::deserialize(d)?;
        Ok(entries.into_iter().collect())
    }
}

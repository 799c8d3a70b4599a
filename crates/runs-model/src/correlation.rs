//! Pearson correlation between command tokens and a per-run scalar.

use std::collections::BTreeSet;

use crate::command::Command;

/// Pearson correlation coefficient of two equally long samples.
///
/// Returns `None` for fewer than two samples or when either sample has zero variance.
pub fn pearson(xs: &[f64], ys: &[f64]) -> Option<f64> {
    if xs.len() != ys.len() || xs.len() < 2 {
        return None;
    }
    let n = xs.len() as f64;
    let mean_x = xs.iter().sum::<f64>() / n;
    let mean_y = ys.iter().sum::<f64>() / n;

    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (x, y) in xs.iter().zip(ys) {
        let dx = x - mean_x;
        let dy = y - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    if var_x == 0.0 || var_y == 0.0 {
        return None;
    }
    Some(cov / (var_x.sqrt() * var_y.sqrt()))
}

/// Rank every option token by how strongly its presence correlates with `values`.
///
/// `samples` pairs each run's command with its scalar; the result is sorted by
/// descending absolute coefficient. Tokens present in every run (or none) carry
/// no signal and are omitted.
pub fn rank_options(samples: &[(Command, f64)]) -> Vec<(String, f64)> {
    let tokens: BTreeSet<&str> = samples.iter().flat_map(|(c, _)| c.options()).collect();
    let values: Vec<f64> = samples.iter().map(|(_, v)| *v).collect();

    let mut ranked: Vec<(String, f64)> = tokens
        .into_iter()
        .filter_map(|token| {
            let indicator: Vec<f64> = samples
                .iter()
                .map(|(c, _)| if c.options().any(|t| t == token) { 1.0 } else { 0.0 })
                .collect();
            pearson(&indicator, &values).map(|r| (token.to_string(), r))
        })
        .collect();

    ranked.sort_by(|a, b| b.1.abs().total_cmp(&a.1.abs()).then_with(|| a.0.cmp(&b.0)));
    ranked
}

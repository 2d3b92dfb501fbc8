//! Optimizer-specific keyword argument completion

use std::collections::BTreeMap;

use serde_json::{json, Value};

/// Fill family-specific defaults into the optimizer kwargs
///
/// Keys already present are never overwritten. Unknown optimizer names pass
/// through untouched; the single authority check on the optimizer family
/// belongs to the downstream consumer, not here.
pub fn complete_kwargs(optimizer_name: &str, kwargs: &mut BTreeMap<String, Value>) {
    let defaults: &[(&str, Value)] = match optimizer_name {
        "sgd" => &[("momentum", json!(0.9))],
        "lars" => &[
            ("momentum", json!(0.9)),
            ("eta", json!(1e-3)),
            ("clip_lr", json!(false)),
            ("exclude_bias_n_norm", json!(false)),
        ],
        "adamw" => &[("betas", json!([0.9, 0.999]))],
        _ => &[],
    };

    for (key, value) in defaults {
        kwargs
            .entry((*key).to_string())
            .or_insert_with(|| value.clone());
    }
}

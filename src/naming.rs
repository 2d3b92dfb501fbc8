//! Deterministic experiment name composition
//!
//! Suffix rules live in a single registry iterated in declared order, so the
//! composed name is a pure function of the base name, the enabled flags and
//! the hyperparameter values. Adding a naming rule for a new method is a
//! registry entry, not a new branch.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::config::NameFlags;

/// Values a suffix rule may draw from
pub struct NamerInput<'a> {
    /// Active self-supervised method
    pub method: &'a str,
    /// Per-device batch size
    pub batch_size: usize,
    /// Method-specific hyperparameters
    pub method_kwargs: &'a BTreeMap<String, Value>,
}

struct SuffixRule {
    enabled: fn(&NameFlags) -> bool,
    /// Methods the rule applies to; `None` means any
    methods: Option<&'static [&'static str]>,
    render: fn(&NamerInput) -> Option<String>,
}

const TEMPERATURE_METHODS: &[&str] = &["simclr", "dhel", "dcl", "sigmoid"];

/// Suffix registry, iterated top to bottom
static SUFFIX_RULES: &[SuffixRule] = &[
    SuffixRule {
        enabled: |f| f.add_method,
        methods: None,
        render: |input| Some(format!("_{}", input.method)),
    },
    SuffixRule {
        enabled: |f| f.add_batch_size,
        methods: None,
        render: |input| Some(format!("_bsz{}", input.batch_size)),
    },
    SuffixRule {
        enabled: |f| f.add_weight,
        methods: None,
        render: |input| kwarg_suffix(input, "_w", "weight"),
    },
    SuffixRule {
        enabled: |f| f.add_temperature,
        methods: Some(TEMPERATURE_METHODS),
        render: |input| kwarg_suffix(input, "_t", "temperature"),
    },
    SuffixRule {
        enabled: |f| f.add_bias,
        methods: Some(&["sigmoid"]),
        render: |input| kwarg_suffix(input, "_b", "bias"),
    },
    SuffixRule {
        enabled: |f| f.add_pred_hidden_dim,
        methods: Some(&["simsiam"]),
        render: |input| kwarg_suffix(input, "_pred", "pred_hidden_dim"),
    },
    SuffixRule {
        enabled: |f| f.add_sim_loss_weight,
        methods: Some(&["vicreg"]),
        render: |input| kwarg_suffix(input, "_sim", "sim_loss_weight"),
    },
    SuffixRule {
        enabled: |f| f.add_var_loss_weight,
        methods: Some(&["vicreg"]),
        render: |input| kwarg_suffix(input, "_var", "var_loss_weight"),
    },
    SuffixRule {
        enabled: |f| f.add_cov_loss_weight,
        methods: Some(&["vicreg"]),
        render: |input| kwarg_suffix(input, "_cov", "cov_loss_weight"),
    },
];

fn kwarg_suffix(input: &NamerInput, prefix: &str, key: &str) -> Option<String> {
    input
        .method_kwargs
        .get(key)
        .map(|value| format!("{prefix}{}", render_value(value)))
}

fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Compose the experiment name from the base name and the enabled flags
///
/// A flag that is enabled but inapplicable to the active method, or whose
/// value field is absent, contributes no suffix.
pub fn compose_name(base_name: &str, flags: &NameFlags, input: &NamerInput) -> String {
    let mut name = base_name.to_string();
    for rule in SUFFIX_RULES {
        if !(rule.enabled)(flags) {
            continue;
        }
        if let Some(methods) = rule.methods {
            if !methods.contains(&input.method) {
                continue;
            }
        }
        if let Some(suffix) = (rule.render)(input) {
            name.push_str(&suffix);
        }
    }
    name
}

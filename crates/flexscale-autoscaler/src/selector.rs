//! Reduce per-metric recommendations to one.

use flexscale_api::{Behavior, SelectPolicy};

/// Apply the select policy of the rules matching the recommendations'
/// direction (scale-up rules if any recommendation exceeds `replicas`).
pub fn select_recommendation(behavior: &Behavior, replicas: i32, recommendations: &[i32]) -> i32 {
    let rules = behavior.selection_rules(replicas, recommendations);
    apply_select_policy(rules.select_policy, replicas, recommendations)
}

/// `Max` and `Min` pick the extremum; `Disabled` keeps `replicas`. An empty
/// recommendation list also keeps `replicas`.
pub fn apply_select_policy(policy: SelectPolicy, replicas: i32, recommendations: &[i32]) -> i32 {
    let selected = match policy {
        SelectPolicy::Max => recommendations.iter().copied().max(),
        SelectPolicy::Min => recommendations.iter().copied().min(),
        SelectPolicy::Disabled => None,
    };
    selected.unwrap_or(replicas)
}

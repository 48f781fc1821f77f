//! # Replacement Policy Selection Tests

use pretty_assertions::assert_eq;
use rstest::rstest;
use simtopo_core::core::units::cache::policies::{
    CachePolicyConfig, GeometryOverride, PolicyKind, PolicyKnobs, ReplacementPolicySelector,
    DEFAULT_BYPASS_PROBABILITY,
};

#[test]
fn emissary_splits_ways_with_default_preserve() {
    let selection = ReplacementPolicySelector::select("Emissary-LRU", 8, None, &PolicyKnobs::default());
    assert_eq!(
        selection.policy,
        CachePolicyConfig::EmissaryLru {
            preserve_ways: 6,
            lru_ways: 2,
            flush_period_cycles: None,
        }
    );
    assert!(selection.geometry.is_none());
    assert!(selection.mismatches.is_empty());
}

#[test]
fn emissary_carries_flush_period() {
    let knobs = PolicyKnobs {
        flush_period_cycles: Some(100_000),
        ..PolicyKnobs::default()
    };
    let selection = ReplacementPolicySelector::select("LRUEmissary", 16, Some(4), &knobs);
    assert_eq!(
        selection.policy,
        CachePolicyConfig::EmissaryLru {
            preserve_ways: 4,
            lru_ways: 12,
            flush_period_cycles: Some(100_000),
        }
    );
}

#[test]
fn repeated_selection_builds_equal_descriptors() {
    let knobs = PolicyKnobs::default();
    let first = ReplacementPolicySelector::select("Emissary-LRU", 8, Some(2), &knobs);
    let second = ReplacementPolicySelector::select("Emissary-LRU", 8, Some(2), &knobs);
    assert_eq!(first, second);
}

#[test]
fn foreign_parameters_are_reported_and_dropped() {
    let knobs = PolicyKnobs {
        flush_period_cycles: Some(10),
        bypass_probability: Some(50),
    };
    let selection = ReplacementPolicySelector::select("LRU", 8, Some(2), &knobs);
    assert_eq!(selection.policy, CachePolicyConfig::Lru);
    let ignored: Vec<_> = selection.mismatches.iter().map(|m| m.parameter).collect();
    assert_eq!(
        ignored,
        vec!["preserve_ways", "flush_period_cycles", "bypass_probability"]
    );
    assert!(selection.mismatches.iter().all(|m| m.policy == PolicyKind::Lru));
}

#[test]
fn bip_defaults_and_clamps_probability() {
    let default = ReplacementPolicySelector::select("BIP", 8, None, &PolicyKnobs::default());
    assert_eq!(
        default.policy,
        CachePolicyConfig::Bip {
            bypass_probability: DEFAULT_BYPASS_PROBABILITY
        }
    );

    let knobs = PolicyKnobs {
        bypass_probability: Some(250),
        ..PolicyKnobs::default()
    };
    let clamped = ReplacementPolicySelector::select("BIP", 8, None, &knobs);
    assert_eq!(
        clamped.policy,
        CachePolicyConfig::Bip {
            bypass_probability: 100
        }
    );
}

#[test]
fn opt_requests_oracle_geometry() {
    let selection = ReplacementPolicySelector::select("OPT", 8, None, &PolicyKnobs::default());
    assert_eq!(selection.policy, CachePolicyConfig::Opt);
    assert_eq!(selection.geometry, Some(GeometryOverride::OracleBaseline));
}

#[rstest]
#[case("LRU", PolicyKind::Lru, "LRURP")]
#[case("LIP", PolicyKind::Lip, "LIPRP")]
#[case("SBIP", PolicyKind::Sbip, "SBIPRP")]
#[case("MLP", PolicyKind::MlpLinear, "MLPLINRP")]
#[case("MLP-Linear", PolicyKind::MlpLinear, "MLPLINRP")]
#[case("ARC", PolicyKind::Lru, "LRURP")]
#[case("lru", PolicyKind::Lru, "LRURP")]
fn names_map_to_policy_classes(
    #[case] name: &str,
    #[case] kind: PolicyKind,
    #[case] class: &str,
) {
    let selection = ReplacementPolicySelector::select(name, 8, None, &PolicyKnobs::default());
    assert_eq!(selection.policy.kind(), kind);
    assert_eq!(selection.policy.engine_class(), class);
}

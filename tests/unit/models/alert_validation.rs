//! Load-time validation of alert definitions, including the JSON shapes a
//! configuration store hands back.

use barsentry::models::alert::{
    AlertDefinition, AlertPolicy, CorrelationMode, CorrelationPolicy, FlipPolicy, FlipRule,
    ThresholdPolicy,
};
use barsentry::models::bar::Timeframe;

fn base(policy: AlertPolicy) -> AlertDefinition {
    AlertDefinition {
        id: 7,
        owner: "tests".to_string(),
        symbols: vec!["EURUSD".to_string()],
        timeframes: vec![Timeframe::M30, Timeframe::H1],
        policy,
        cooldown_secs: 0,
        enabled: true,
    }
}

fn threshold_policy() -> AlertPolicy {
    AlertPolicy::Threshold(ThresholdPolicy {
        buy_min: 80.0,
        sell_max: 20.0,
        margin: 5.0,
        min_alignment: None,
        style: Default::default(),
    })
}

#[test]
fn symbol_and_timeframe_counts_are_bounded() {
    let mut def = base(threshold_policy());
    assert!(def.validate().is_ok());

    def.symbols = Vec::new();
    assert!(def.validate().is_err());

    def.symbols = (0..4).map(|i| format!("SYM{}", i)).collect();
    assert!(def.validate().is_err());

    def.symbols = vec!["EURUSD".to_string()];
    def.timeframes = vec![
        Timeframe::M1,
        Timeframe::M5,
        Timeframe::M15,
        Timeframe::M30,
    ];
    assert!(def.validate().is_err());
}

#[test]
fn threshold_bounds_and_alignment() {
    let mut def = base(AlertPolicy::Threshold(ThresholdPolicy {
        buy_min: 120.0,
        sell_max: 20.0,
        margin: 5.0,
        min_alignment: None,
        style: Default::default(),
    }));
    assert!(def.validate().is_err());

    // min_alignment cannot exceed the timeframe count.
    def.policy = AlertPolicy::Threshold(ThresholdPolicy {
        buy_min: 80.0,
        sell_max: 20.0,
        margin: 5.0,
        min_alignment: Some(3),
        style: Default::default(),
    });
    assert!(def.validate().is_err());
}

#[test]
fn ema_cross_requires_fast_below_slow() {
    let def = base(AlertPolicy::Flip(FlipPolicy {
        rule: FlipRule::EmaCross { fast: 26, slow: 12 },
        lookback: 3,
        secondary_gate: None,
    }));
    assert!(def.validate().is_err());
}

#[test]
fn correlation_needs_exactly_two_symbols() {
    let mut def = base(AlertPolicy::Correlation(CorrelationPolicy {
        mode: CorrelationMode::Threshold {
            rsi_period: 14,
            overbought: 70.0,
            oversold: 30.0,
            neutral_band: 10.0,
        },
    }));
    assert!(def.validate().is_err());

    def.symbols = vec!["USDCAD".to_string(), "WTICOUSD".to_string()];
    assert!(def.validate().is_ok());
}

#[test]
fn rolling_bounds_are_checked() {
    let mut def = base(AlertPolicy::Correlation(CorrelationPolicy {
        mode: CorrelationMode::Rolling {
            window: 2,
            strong: 0.8,
            weak: 0.3,
            expected_sign: barsentry::models::alert::ExpectedSign::Negative,
        },
    }));
    def.symbols = vec!["USDCAD".to_string(), "WTICOUSD".to_string()];
    assert!(def.validate().is_err());

    def.policy = AlertPolicy::Correlation(CorrelationPolicy {
        mode: CorrelationMode::Rolling {
            window: 20,
            strong: 0.3,
            weak: 0.8,
            expected_sign: barsentry::models::alert::ExpectedSign::Negative,
        },
    });
    assert!(def.validate().is_err());
}

#[test]
fn policies_deserialize_from_tagged_json() {
    let json = r#"{
        "id": 12,
        "owner": "ops",
        "symbols": ["USDCAD"],
        "timeframes": ["30m"],
        "policy": {
            "type": "flip",
            "rule": { "rule": "ema_cross", "fast": 12, "slow": 26 }
        },
        "cooldown_secs": 1800,
        "enabled": true
    }"#;
    let def: AlertDefinition = serde_json::from_str(json).unwrap();
    assert!(def.validate().is_ok());
    match &def.policy {
        AlertPolicy::Flip(p) => {
            assert_eq!(p.lookback, 3); // default
            assert!(matches!(p.rule, FlipRule::EmaCross { fast: 12, slow: 26 }));
        }
        other => panic!("unexpected policy: {:?}", other),
    }
}

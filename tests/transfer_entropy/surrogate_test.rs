// SPDX-FileCopyrightText: 2025-2026 Carlson Büth <code@cbueth.de>
//
// SPDX-License-Identifier: MIT OR Apache-2.0

use approx::assert_relative_eq;

use loopte::config::TeConfig;
use loopte::estimators::transfer_entropy::{KernelTransferEntropy, surrogate_threshold};

use crate::test_helpers::coupled_pair;

#[test]
fn coupled_pair_exceeds_surrogate_threshold() {
    let (x, y) = coupled_pair(170, 1, 0.3, 21);
    let config = TeConfig::new(1, 150, 12);
    let te = KernelTransferEntropy::new(x.view(), y.view(), config).unwrap();

    let value = te.estimate().unwrap().value;
    let stats = te.surrogates(8, 99).unwrap();
    assert_eq!(stats.values.len(), 8);
    assert!(stats.values.iter().all(|v| *v >= 0.0));
    assert!(
        value > stats.threshold(3.0),
        "te {value} vs surrogate mean {} ± {}",
        stats.mean,
        stats.std_dev
    );
}

#[test]
fn surrogates_are_reproducible() {
    let (x, y) = coupled_pair(130, 1, 0.5, 22);
    let config = TeConfig::new(1, 120, 8);
    let a = surrogate_threshold(x.view(), y.view(), config, 4, 5).unwrap();
    let b = surrogate_threshold(x.view(), y.view(), config, 4, 5).unwrap();
    assert_eq!(a, b);

    let mean = a.values.iter().sum::<f64>() / 4.0;
    assert_relative_eq!(a.mean, mean, max_relative = 1e-12);
    assert_relative_eq!(a.threshold(0.0), a.mean);
}

#[test]
fn zero_surrogates_is_rejected() {
    let (x, y) = coupled_pair(130, 1, 0.5, 23);
    assert!(surrogate_threshold(x.view(), y.view(), TeConfig::new(1, 120, 8), 0, 1).is_err());
}

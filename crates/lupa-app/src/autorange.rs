// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::model::Lookback;
use anyhow::Result;

pub const AUTO_RANGE_TARGET: u64 = 10_000;

pub fn detect_lookback<F>(mut probe: F) -> (Lookback, u64)
where
    F: FnMut(Lookback) -> Result<u64>,
{
    let mut best = (Lookback::narrowest(), 0);
    for lookback in Lookback::ALL {
        let count = match probe(lookback) {
            Ok(count) => count,
            Err(_) => continue,
        };
        if count >= AUTO_RANGE_TARGET {
            return (lookback, count);
        }
        if count > best.1 {
            best = (lookback, count);
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::detect_lookback;
    use crate::model::Lookback;
    use anyhow::bail;

    fn scripted(counts: [u64; 5]) -> impl FnMut(Lookback) -> anyhow::Result<u64> {
        move |lookback| {
            let index = Lookback::ALL
                .iter()
                .position(|entry| *entry == lookback)
                .expect("lookback is in the ordered set");
            Ok(counts[index])
        }
    }

    #[test]
    fn first_duration_reaching_target_wins() {
        let mut probes = Vec::new();
        let result = detect_lookback(|lookback| {
            probes.push(lookback);
            scripted([0, 50, 12_000, 50_000, 100_000])(lookback)
        });
        assert_eq!(result, (Lookback::OneDay, 12_000));
        assert_eq!(
            probes,
            vec![Lookback::FiveMinutes, Lookback::OneHour, Lookback::OneDay],
        );
    }

    #[test]
    fn falls_back_to_best_observed_count() {
        let result = detect_lookback(scripted([0, 3, 7, 2, 1]));
        assert_eq!(result, (Lookback::OneDay, 7));
    }

    #[test]
    fn all_zero_counts_default_to_narrowest() {
        let result = detect_lookback(scripted([0, 0, 0, 0, 0]));
        assert_eq!(result, (Lookback::FiveMinutes, 0));
    }

    #[test]
    fn failed_probe_is_skipped_not_fatal() {
        let result = detect_lookback(|lookback| {
            if lookback == Lookback::OneHour {
                bail!("probe failed");
            }
            scripted([0, 99_999, 8, 2, 1])(lookback)
        });
        assert_eq!(result, (Lookback::OneDay, 8));
    }

    #[test]
    fn total_probe_failure_yields_narrowest_with_zero() {
        let result = detect_lookback(|_| bail!("backend down"));
        assert_eq!(result, (Lookback::FiveMinutes, 0));
    }
}

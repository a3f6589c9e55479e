//! Property tests for the indicator, signal and reconciliation engines.

mod common;

use algolog::domain::indicator::{self, macd::calculate_macd, rsi::calculate_rsi, IndicatorParams};
use algolog::domain::reconcile::reconcile;
use algolog::domain::signal::{label, SignalThresholds};
use approx::assert_abs_diff_eq;
use common::*;
use proptest::prelude::*;

fn closes_strategy(min: usize, max: usize) -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(1.0f64..1000.0, min..max)
}

fn small_params() -> impl Strategy<Value = IndicatorParams> {
    (1usize..8, 1usize..6, 0usize..6, 1usize..6, 1usize..8).prop_map(
        |(rsi_period, ma_short, extra, macd_fast, macd_extra)| IndicatorParams {
            rsi_period,
            ma_short,
            ma_long: ma_short + extra,
            macd_fast,
            macd_slow: macd_fast + macd_extra,
        },
    )
}

fn history_strategy() -> impl Strategy<Value = Vec<(u32, f64, bool)>> {
    prop::collection::vec((1u32..60, 50.0f64..150.0, any::<bool>()), 0..40)
}

fn history_rows(events: &[(u32, f64, bool)]) -> Vec<algolog::domain::signal::SignalRow> {
    let start = date(2024, 1, 1);
    events
        .iter()
        .map(|&(offset, close, buy)| {
            let day = start + chrono::Duration::days(offset as i64);
            signal_row(
                "HDFCBANK.NS",
                &day.format("%Y-%m-%d").to_string(),
                Some(close),
                if buy { "BUY" } else { "SELL" },
            )
        })
        .collect()
}

proptest! {
    #[test]
    fn rsi_stays_in_range(closes in closes_strategy(2, 120), period in 1usize..20) {
        for value in calculate_rsi(&closes, period).into_iter().flatten() {
            prop_assert!((0.0..=100.0).contains(&value), "rsi {} out of range", value);
        }
    }

    #[test]
    fn rsi_undefined_before_period(closes in closes_strategy(1, 60), period in 1usize..20) {
        let rsi = calculate_rsi(&closes, period);
        prop_assert_eq!(rsi.len(), closes.len());
        for (i, value) in rsi.iter().enumerate() {
            prop_assert_eq!(value.is_some(), i + 1 >= period);
        }
    }

    #[test]
    fn macd_non_negative_on_rising_closes(
        start in 1.0f64..500.0,
        steps in prop::collection::vec(0.01f64..10.0, 1..80),
    ) {
        let mut closes = vec![start];
        for step in steps {
            let last = closes[closes.len() - 1];
            closes.push(last + step);
        }
        for value in calculate_macd(&closes, 12, 26) {
            prop_assert!(value >= -1e-9, "macd {} negative on rising closes", value);
        }
    }

    #[test]
    fn indicator_rows_follow_warmup(closes in closes_strategy(1, 80), params in small_params()) {
        let bars = bars_from_closes("TCS.NS", "2024-01-01", &closes);
        let series = indicator::compute("TCS.NS", &bars, &params).unwrap();

        let expected = closes.len().saturating_sub(params.warmup() - 1);
        prop_assert_eq!(series.len(), expected);
        if let Some(first) = series.records.first() {
            prop_assert_eq!(first.date, bars[params.warmup() - 1].date);
        }
    }

    #[test]
    fn no_signal_inside_band(
        closes in closes_strategy(5, 80),
        buy_below in 5.0f64..45.0,
        width in 1.0f64..50.0,
    ) {
        let thresholds = SignalThresholds { buy_below, sell_above: buy_below + width };
        let params = IndicatorParams { rsi_period: 3, ma_short: 2, ma_long: 4, macd_fast: 2, macd_slow: 4 };
        let bars = bars_from_closes("TCS.NS", "2024-01-01", &closes);
        let series = indicator::compute("TCS.NS", &bars, &params).unwrap();
        let signals = label(&series, &thresholds);

        for record in &signals.records {
            prop_assert!(record.rsi < thresholds.buy_below || record.rsi > thresholds.sell_above);
        }
        let fired = series
            .records
            .iter()
            .filter(|r| r.rsi < thresholds.buy_below || r.rsi > thresholds.sell_above)
            .count();
        prop_assert_eq!(signals.len(), fired);
    }

    #[test]
    fn reconcile_is_deterministic(events in history_strategy()) {
        let rows = history_rows(&events);
        prop_assert_eq!(reconcile("HDFCBANK.NS", &rows), reconcile("HDFCBANK.NS", &rows));
    }

    #[test]
    fn trades_bounded_by_signal_counts(events in history_strategy()) {
        let rows = history_rows(&events);
        let buys = events.iter().filter(|e| e.2).count();
        let sells = events.len() - buys;

        let rec = reconcile("HDFCBANK.NS", &rows);
        prop_assert!(rec.ledger.len() <= buys);
        prop_assert!(rec.ledger.len() <= sells);
        prop_assert!(rec.ledger.winning_trades() <= rec.ledger.len());

        let summary = rec.summary(0.0, Default::default());
        prop_assert!((0.0..=1.0).contains(&summary.win_ratio));
    }

    #[test]
    fn trades_never_overlap(events in history_strategy()) {
        let rec = reconcile("HDFCBANK.NS", &history_rows(&events));
        for pair in rec.ledger.trades.windows(2) {
            prop_assert!(pair[0].exit_date <= pair[1].entry_date);
        }
        for trade in &rec.ledger.trades {
            prop_assert!(trade.entry_date <= trade.exit_date);
        }
    }

    #[test]
    fn profit_is_sum_of_exits_minus_entries(events in history_strategy()) {
        let rec = reconcile("HDFCBANK.NS", &history_rows(&events));
        let expected: f64 = rec
            .ledger
            .trades
            .iter()
            .map(|t| t.exit_price - t.entry_price)
            .sum();
        assert_abs_diff_eq!(rec.ledger.total_profit(), expected, epsilon = 1e-9);
    }
}

#[test]
fn constant_closes_give_zero_rsi() {
    let rsi = calculate_rsi(&[250.0; 30], 14);
    for value in rsi.into_iter().flatten() {
        assert_abs_diff_eq!(value, 0.0);
    }
}

#[test]
fn short_series_yields_no_rows() {
    let params = IndicatorParams::default();
    let bars = generate_bars("TCS.NS", "2024-01-01", params.ma_long - 1, 100.0);
    let series = indicator::compute("TCS.NS", &bars, &params).unwrap();
    assert!(series.is_empty());
}

use std::path::PathBuf;

use pretty_assertions::assert_eq;
use return_risk_core::loader::{
    load_percent_scaled_columns, load_percent_scaled_table, load_return_series,
    ColumnSpec, DateLayout, LoaderOptions,
};
use return_risk_core::{Period, RiskError};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("data")
        .join(name)
}

// ===========================================================================
// Level files -> return series
// ===========================================================================

#[test]
fn test_close_prices_to_monthly_returns() {
    let s = load_return_series(fixture("prices.csv"), "Close", "Stock").unwrap();
    assert_eq!(s.name(), "Stock");
    assert_eq!(s.len(), 5);
    assert_eq!(s.periods()[0], Period::new(2020, 2).unwrap());
    assert_eq!(
        s.returns(),
        &[dec!(-0.05), dec!(-0.1), dec!(0.1), dec!(0.05), dec!(0.05)]
    );
}

#[test]
fn test_missing_column_is_format_error() {
    let err = load_return_series(fixture("prices.csv"), "Adj Close", "Stock").unwrap_err();
    match err {
        RiskError::Format { reason, .. } => assert!(reason.contains("Adj Close")),
        other => panic!("expected format error, got {:?}", other),
    }
}

// ===========================================================================
// Percent-formatted files -> fractional tables
// ===========================================================================

#[test]
fn test_hedge_fund_indices_scaled_to_fractions() {
    let table = load_percent_scaled_table(fixture("hfi_sample.csv")).unwrap();
    assert_eq!(
        table.names().collect::<Vec<_>>(),
        vec!["Convertible Arbitrage", "Distressed Securities", "Global Macro"]
    );
    assert_eq!(table.periods().len(), 24);
    assert_eq!(table.periods()[0], Period::new(1997, 1).unwrap());

    let ca = table.column("Convertible Arbitrage").unwrap();
    assert_eq!(ca.returns()[0], dec!(0.0119));
    let aug_98 = ca
        .iter()
        .find(|o| o.period == Period::new(1998, 8).unwrap())
        .unwrap();
    assert_eq!(aug_98.value, dec!(-0.0415));
}

#[test]
fn test_percent_round_trip_is_exact() {
    let table = load_percent_scaled_table(fixture("hfi_sample.csv")).unwrap();
    let gm = table.column("Global Macro").unwrap();
    let restored: Vec<Decimal> = gm.returns().iter().map(|r| r * dec!(100)).collect();
    assert_eq!(restored[0], dec!(5.45));
    assert_eq!(restored[2], dec!(-0.14));
    assert_eq!(restored[23], dec!(1.96));
}

#[test]
fn test_size_portfolios_with_compact_dates() {
    let options = LoaderOptions {
        delimiter: ',',
        date_layout: DateLayout::YearMonthCompact,
    };
    let table = load_percent_scaled_columns(
        fixture("ffme_sample.csv"),
        &[
            ColumnSpec::new("Lo 10", "SmallCap"),
            ColumnSpec::new("Hi 10", "LargeCap"),
        ],
        &options,
    )
    .unwrap();

    assert_eq!(table.names().collect::<Vec<_>>(), vec!["SmallCap", "LargeCap"]);
    assert_eq!(table.periods()[0], Period::new(1926, 7).unwrap());
    assert_eq!(table.column("SmallCap").unwrap().returns()[0], dec!(-0.0145));
    assert_eq!(table.column("LargeCap").unwrap().returns()[5], dec!(0.0279));
}

#[test]
fn test_missing_file_is_io_error() {
    assert!(matches!(
        load_percent_scaled_table(fixture("does_not_exist.csv")),
        Err(RiskError::Io(_))
    ));
}

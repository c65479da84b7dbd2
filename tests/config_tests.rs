use std::io::Write;

use crossarb::domain::Symbol;
use crossarb::error::{ConfigError, Error};
use crossarb::infrastructure::config::logging::LogFormat;
use crossarb::infrastructure::config::settings::Config;
use crossarb::port::Delivery;
use rust_decimal_macros::dec;
use tempfile::NamedTempFile;

const FULL: &str = r#"
[logging]
level = "debug"
format = "json"

[venues.maker]
name = "alpha"
delivery = "push"

[venues.maker.paper]
initial_price = "30000"
half_spread = "5"
seed = 7

[venues.taker]
name = "beta"
delivery = "poll"
poll_interval_ms = 250

[quotes]
staleness_bound_push_ms = 1500
staleness_bound_poll_ms = 600

[execution]
maker_order_timeout_ms = 3000
taker_order_timeout_ms = 2000
status_retry_attempts = 5
unwind_on_taker_failure = false
drift_tolerance = "0.0001"

[[symbols]]
symbol = "BTC"
long_threshold = "12"
short_threshold = "8"
order_quantity = "0.01"
max_position = "0.1"
max_venue_position = "0.05"

[[symbols]]
symbol = "ETH"
long_threshold = "1"
short_threshold = "1"
order_quantity = "0.1"
max_position = "1"
imbalance_limit = "0.15"
"#;

fn write_config(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("create temp config");
    file.write_all(contents.as_bytes()).expect("write temp config");
    file
}

#[test]
fn full_config_loads_from_file() {
    let file = write_config(FULL);
    let config = Config::load(file.path()).unwrap();

    assert_eq!(config.logging.format, LogFormat::Json);
    assert_eq!(config.venues.maker.name, "alpha");
    assert_eq!(config.venues.maker.paper.seed, Some(7));
    assert_eq!(config.venues.taker.delivery, Delivery::Poll);
    assert_eq!(config.venues.taker.poll_interval_ms, 250);
    assert_eq!(config.symbols.len(), 2);

    let engine = config.engine_config(&[]).unwrap();
    assert_eq!(engine.lifecycle.status_retry_attempts, 5);
    assert!(!engine.cycle.unwind_on_taker_failure);
    assert_eq!(engine.quote_age.poll, Some(std::time::Duration::from_millis(600)));

    let btc = &engine.symbols[0];
    assert_eq!(btc.params.thresholds.long, dec!(12));
    assert_eq!(btc.params.thresholds.short, dec!(8));
    assert_eq!(btc.limits.max_venue_position, dec!(0.05));
    assert_eq!(btc.limits.drift_tolerance, dec!(0.0001));

    let eth = &engine.symbols[1];
    assert_eq!(eth.params.imbalance_limit, dec!(0.15));
}

#[test]
fn symbol_filter_selects_subset() {
    let config = Config::parse_toml(FULL).unwrap();
    let engine = config.engine_config(&[Symbol::from("eth")]).unwrap();
    assert_eq!(engine.symbols.len(), 1);
    assert_eq!(engine.symbols[0].params.symbol, Symbol::from("ETH"));
}

#[test]
fn missing_file_is_read_error() {
    let err = Config::load("/nonexistent/crossarb.toml").unwrap_err();
    assert!(matches!(err, Error::Config(ConfigError::ReadFile(_))));
}

#[test]
fn malformed_toml_is_parse_error() {
    let err = Config::parse_toml("[[symbols]\nsymbol = ").unwrap_err();
    assert!(matches!(err, Error::Config(ConfigError::Parse(_))));
}

#[test]
fn zero_timeout_is_rejected() {
    let toml = FULL.replace("maker_order_timeout_ms = 3000", "maker_order_timeout_ms = 0");
    let err = Config::parse_toml(&toml).unwrap_err();
    assert!(matches!(
        err,
        Error::Config(ConfigError::InvalidValue {
            field: "maker_order_timeout_ms",
            ..
        })
    ));
}

#[test]
fn duplicate_symbol_is_rejected() {
    let toml = FULL.replace("symbol = \"ETH\"", "symbol = \"btc\"");
    let err = Config::parse_toml(&toml).unwrap_err();
    assert!(err.to_string().contains("configured twice"));
}

#[test]
fn fill_probability_must_be_a_probability() {
    let toml = FULL.replace("seed = 7", "seed = 7\nfill_probability = 1.5");
    let err = Config::parse_toml(&toml).unwrap_err();
    assert!(err.to_string().contains("fill_probability"));
}

#[test]
fn unknown_delivery_mode_fails_to_parse() {
    let toml = FULL.replace("delivery = \"poll\"", "delivery = \"carrier-pigeon\"");
    assert!(Config::parse_toml(&toml).is_err());
}

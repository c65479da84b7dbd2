//! Spread signal detection between the maker and taker books.

use serde::Serialize;

use super::{Direction, Price, Quote};

/// Minimum spreads required to open a cycle in each direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Thresholds {
    pub long: Price,
    pub short: Price,
}

/// A detected spread opportunity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Signal {
    pub direction: Direction,
    /// The spread that triggered the signal.
    pub spread: Price,
    /// Price the maker leg rests at (maker bid for buys, maker ask for sells).
    pub maker_price: Price,
    /// Taker touch used to hedge (taker bid for sells, taker ask for buys).
    pub taker_price: Price,
}

/// Spreads in both directions for a pair of quotes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Spreads {
    /// `taker.bid - maker.bid`: buy on maker, sell on taker.
    pub long: Price,
    /// `maker.ask - taker.ask`: sell on maker, buy on taker.
    pub short: Price,
}

impl Spreads {
    #[must_use]
    pub fn between(maker: &Quote, taker: &Quote) -> Self {
        Self {
            long: taker.bid.price - maker.bid.price,
            short: maker.ask.price - taker.ask.price,
        }
    }
}

/// Evaluate the entry condition.
///
/// When both directions qualify the larger spread wins; an exact tie goes to
/// long-maker.
#[must_use]
pub fn evaluate(maker: &Quote, taker: &Quote, thresholds: Thresholds) -> Option<Signal> {
    let spreads = Spreads::between(maker, taker);
    let long = spreads.long >= thresholds.long;
    let short = spreads.short >= thresholds.short;

    let direction = match (long, short) {
        (true, true) if spreads.short > spreads.long => Direction::ShortMaker,
        (true, _) => Direction::LongMaker,
        (false, true) => Direction::ShortMaker,
        (false, false) => return None,
    };

    Some(match direction {
        Direction::LongMaker => Signal {
            direction,
            spread: spreads.long,
            maker_price: maker.bid.price,
            taker_price: taker.bid.price,
        },
        Direction::ShortMaker => Signal {
            direction,
            spread: spreads.short,
            maker_price: maker.ask.price,
            taker_price: taker.ask.price,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{PriceLevel, QuoteSource};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn quote(venue: &str, bid: Decimal, ask: Decimal) -> Quote {
        Quote::new(
            venue,
            "BTC",
            PriceLevel::new(bid, dec!(1)),
            PriceLevel::new(ask, dec!(1)),
            QuoteSource::Push,
        )
    }

    fn thresholds(long: Decimal, short: Decimal) -> Thresholds {
        Thresholds { long, short }
    }

    #[test]
    fn long_signal_when_taker_bid_above_maker_bid() {
        let maker = quote("maker", dec!(100), dec!(101));
        let taker = quote("taker", dec!(112), dec!(113));
        let signal = evaluate(&maker, &taker, thresholds(dec!(10), dec!(10))).unwrap();

        assert_eq!(signal.direction, Direction::LongMaker);
        assert_eq!(signal.spread, dec!(12));
        assert_eq!(signal.maker_price, dec!(100));
        assert_eq!(signal.taker_price, dec!(112));
    }

    #[test]
    fn threshold_is_inclusive() {
        let maker = quote("maker", dec!(100), dec!(101));
        let taker = quote("taker", dec!(110), dec!(111));
        let signal = evaluate(&maker, &taker, thresholds(dec!(10), dec!(10)));
        assert_eq!(signal.map(|s| s.direction), Some(Direction::LongMaker));
    }

    #[test]
    fn short_signal_when_maker_ask_above_taker_ask() {
        let maker = quote("maker", dec!(119), dec!(120));
        let taker = quote("taker", dec!(104), dec!(105));
        let signal = evaluate(&maker, &taker, thresholds(dec!(50), dec!(10))).unwrap();

        assert_eq!(signal.direction, Direction::ShortMaker);
        assert_eq!(signal.spread, dec!(15));
        assert_eq!(signal.maker_price, dec!(120));
        assert_eq!(signal.taker_price, dec!(105));
    }

    #[test]
    fn both_directions_prefer_larger_spread() {
        // long = 105 - 100 = 5, short = 130 - 110 = 20
        let maker = quote("maker", dec!(100), dec!(130));
        let taker = quote("taker", dec!(105), dec!(110));
        let signal = evaluate(&maker, &taker, thresholds(dec!(1), dec!(1))).unwrap();
        assert_eq!(signal.direction, Direction::ShortMaker);
    }

    #[test]
    fn exact_tie_prefers_long() {
        // long = 110 - 100 = 10, short = 120 - 110 = 10
        let maker = quote("maker", dec!(100), dec!(120));
        let taker = quote("taker", dec!(110), dec!(110));
        let signal = evaluate(&maker, &taker, thresholds(dec!(5), dec!(5))).unwrap();
        assert_eq!(signal.direction, Direction::LongMaker);
    }

    #[test]
    fn no_signal_below_thresholds() {
        let maker = quote("maker", dec!(100), dec!(101));
        let taker = quote("taker", dec!(101), dec!(102));
        assert!(evaluate(&maker, &taker, thresholds(dec!(10), dec!(10))).is_none());
    }
}

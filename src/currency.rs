use std::collections::HashMap;
use std::fmt;

/// The fixed set of currencies the app knows about. Rates are expressed relative to USD.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Currency {
    Usd,
    Eur,
    Jpy,
    Cny,
    Myr,
    Twd,
    Sgd,
    Gbp,
}

impl Currency {
    /// Selector order in the UI.
    pub const ALL: [Currency; 8] = [
        Currency::Usd,
        Currency::Eur,
        Currency::Jpy,
        Currency::Cny,
        Currency::Myr,
        Currency::Twd,
        Currency::Sgd,
        Currency::Gbp,
    ];

    pub fn code(self) -> &'static str {
        match self {
            Currency::Usd => "USD",
            Currency::Eur => "EUR",
            Currency::Jpy => "JPY",
            Currency::Cny => "CNY",
            Currency::Myr => "MYR",
            Currency::Twd => "TWD",
            Currency::Sgd => "SGD",
            Currency::Gbp => "GBP",
        }
    }

    /// Offline rate used at startup and whenever a fetched value is unusable.
    pub fn default_rate(self) -> f64 {
        match self {
            Currency::Usd => 1.0,
            Currency::Eur => 0.85,
            Currency::Jpy => 110.0,
            Currency::Cny => 6.5,
            Currency::Myr => 4.2,
            Currency::Twd => 28.0,
            Currency::Sgd => 1.35,
            Currency::Gbp => 0.75,
        }
    }

    pub fn index(self) -> usize {
        Currency::ALL
            .iter()
            .position(|c| *c == self)
            .unwrap_or_default()
    }

    pub fn from_index(index: usize) -> Option<Currency> {
        Currency::ALL.get(index).copied()
    }

    /// Comma-joined codes, e.g. for the `symbols` query parameter.
    pub fn joined_codes() -> String {
        Currency::ALL
            .iter()
            .map(|c| c.code())
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

pub const DEFAULT_AS_OF: &str = "built-in defaults";

/// One complete set of rates. Replaced wholesale, never patched in place.
#[derive(Debug, Clone, PartialEq)]
pub struct RateSnapshot {
    rates: HashMap<Currency, f64>,
    pub as_of: String,
    pub is_live: bool,
}

impl RateSnapshot {
    /// Builds a snapshot, filling every currency missing from `rates` with its default.
    pub fn new(mut rates: HashMap<Currency, f64>, as_of: impl Into<String>, is_live: bool) -> Self {
        for currency in Currency::ALL {
            rates
                .entry(currency)
                .or_insert_with(|| currency.default_rate());
        }
        Self {
            rates,
            as_of: as_of.into(),
            is_live,
        }
    }

    pub fn rate(&self, currency: Currency) -> f64 {
        self.rates
            .get(&currency)
            .copied()
            .unwrap_or_else(|| currency.default_rate())
    }

    #[cfg(test)]
    pub fn rates(&self) -> &HashMap<Currency, f64> {
        &self.rates
    }
}

impl Default for RateSnapshot {
    fn default() -> Self {
        RateSnapshot::new(HashMap::new(), DEFAULT_AS_OF, false)
    }
}

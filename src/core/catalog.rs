//! Static instrument catalog

use serde::Serialize;
use std::fmt::Display;

/// Display grouping for an instrument. Has no effect on how prices are fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Primary,
    Secondary,
    Supplementary,
}

impl Category {
    pub const ALL: [Category; 3] = [
        Category::Primary,
        Category::Secondary,
        Category::Supplementary,
    ];

    /// Section heading used by the table renderer.
    pub fn label(&self) -> &'static str {
        match self {
            Category::Primary => "PRIMARY (Price Strip)",
            Category::Secondary => "SECONDARY (Extended Table)",
            Category::Supplementary => "SUPPLEMENTARY",
        }
    }
}

impl Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Category::Primary => "primary",
                Category::Secondary => "secondary",
                Category::Supplementary => "supplementary",
            }
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstrumentSpec {
    pub name: &'static str,
    /// Provider symbol, e.g. `EURUSD=X`.
    pub lookup_key: &'static str,
    pub decimals: u32,
    pub category: Category,
    pub note: Option<&'static str>,
}

impl InstrumentSpec {
    pub const fn new(
        name: &'static str,
        lookup_key: &'static str,
        decimals: u32,
        category: Category,
    ) -> Self {
        InstrumentSpec {
            name,
            lookup_key,
            decimals,
            category,
            note: None,
        }
    }

    pub const fn with_note(mut self, note: &'static str) -> Self {
        self.note = Some(note);
        self
    }
}

/// Instruments tracked by the daily signal check, in display order.
pub const INSTRUMENTS: &[InstrumentSpec] = &[
    InstrumentSpec::new("DXY", "DX-Y.NYB", 2, Category::Primary),
    InstrumentSpec::new("EUR/USD", "EURUSD=X", 4, Category::Primary),
    InstrumentSpec::new("XAU/USD", "GC=F", 0, Category::Primary)
        .with_note("Gold futures front month"),
    InstrumentSpec::new("USD/JPY", "JPY=X", 2, Category::Primary),
    InstrumentSpec::new("GBP/USD", "GBPUSD=X", 4, Category::Secondary),
    InstrumentSpec::new("AUD/USD", "AUDUSD=X", 4, Category::Secondary),
    InstrumentSpec::new("USD/CHF", "CHF=X", 4, Category::Secondary),
    InstrumentSpec::new("US10Y", "^TNX", 3, Category::Secondary)
        .with_note("10Y yield, already in percent"),
    InstrumentSpec::new("Brent", "BZ=F", 2, Category::Secondary).with_note("Brent front month"),
    InstrumentSpec::new("S&P500", "^GSPC", 2, Category::Supplementary),
    InstrumentSpec::new("VIX", "^VIX", 2, Category::Supplementary),
    InstrumentSpec::new("BTC/USD", "BTC-USD", 0, Category::Supplementary),
];

/// Large-cap US universe the advice model and similarity matrix are built over.
pub const DEFAULT_UNIVERSE: &[&str] = &[
    "AAPL", "MSFT", "GOOGL", "AMZN", "TSLA", "NVDA", "META", "BRK.B", "JPM", "JNJ",
    "V", "PG", "UNH", "XOM", "HD", "MA", "ABBV", "PFE", "KO", "PEP",
    "COST", "MRK", "DIS", "WMT", "CVX", "BAC", "TMO", "LLY", "AVGO", "MCD",
    "NFLX", "AMD", "INTC", "CMCSA", "ADBE", "CSCO", "HON", "TXN", "IBM", "GS",
    "PYPL", "SBUX", "ISRG", "C", "GE", "BLK", "AXP", "CAT", "BA", "MDT",
    "DE", "LMT", "MMM", "GILD", "LOW", "T", "F", "GM", "NKE", "VRTX",
    "SO", "D", "DUK", "SPGI", "NEE", "SCHW", "USB", "PLD", "RTX", "CI",
    "MO", "CB", "ADI", "TGT", "BDX", "ZTS", "SYK", "EOG", "NOW", "CME",
    "PNC", "EL", "ICE", "TFC", "AON", "FDX", "EW", "APD", "PSA", "CL",
    "ROP", "COF", "MAR", "DG", "KLAC", "IDXX", "ITW", "KMB", "ECL", "PH",
    "AIG", "HUM", "MNST", "TT", "ORLY", "SYY", "VFC", "TRV", "DLR", "OTIS",
    "PCAR", "CTAS", "HCA", "AMP", "PAYX", "WELL", "MSCI", "FIS", "STZ", "MTD",
    "MCHP", "FTNT", "CDW", "DOV", "AME", "XYL", "WST", "RMD", "BRO", "CHD",
];

pub fn default_universe() -> Vec<String> {
    DEFAULT_UNIVERSE.iter().map(|s| s.to_string()).collect()
}

/// Canonical ticker form used for fetching and as similarity-matrix keys.
pub fn normalize_symbol(symbol: &str) -> String {
    symbol.trim().to_ascii_uppercase()
}

/// Normalize, drop blanks and deduplicate, preserving first-seen order.
pub fn normalize_symbols<I, S>(symbols: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = std::collections::HashSet::new();
    symbols
        .into_iter()
        .map(|s| normalize_symbol(s.as_ref()))
        .filter(|s| !s.is_empty() && seen.insert(s.clone()))
        .collect()
}

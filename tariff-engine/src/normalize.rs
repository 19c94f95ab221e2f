//! Turns raw tokens scraped from pricing pages into typed quantities.
//!
//! Tokens arrive decorated (`"5GB"`, `"200,-"`, `"€ 12,50"`) or as words
//! (`"Unlimited"`). The normalizer strips the decoration and parses the first
//! numeric substring, or recognises a competitor's "no limit" keyword.
//!
//! ```
//! use tariff_common::Quantity;
//! use tariff_engine::normalize::normalize_quantity;
//!
//! assert_eq!(normalize_quantity("12,-").unwrap(), Quantity::Measured(12.0));
//! assert_eq!(normalize_quantity(" Unlimited ").unwrap(), Quantity::Unlimited);
//! assert!(normalize_quantity("free").is_err());
//! ```

use regex::Regex;
use std::sync::LazyLock;
use tariff_common::Quantity;
use thiserror::Error;

static NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)(?:[.,](\d+))?").expect("constant pattern"));
static INTEGER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+").expect("constant pattern"));

/// Keywords every competitor uses for an unbounded allowance.
pub const DEFAULT_UNLIMITED_KEYWORDS: &[&str] = &["unlimited"];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NormalizeError {
    #[error("no numeric value in {token:?}")]
    NoNumber { token: String },
}

#[derive(Debug, Clone)]
pub struct Normalizer {
    unlimited_keywords: Vec<String>,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new(std::iter::empty::<&str>())
    }
}

impl Normalizer {
    /// Default keywords plus the competitor-specific `extra` ones.
    pub fn new<I, S>(extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut unlimited_keywords: Vec<String> = DEFAULT_UNLIMITED_KEYWORDS
            .iter()
            .map(|k| k.to_string())
            .collect();
        for k in extra {
            let k = k.as_ref().trim().to_lowercase();
            if !k.is_empty() && !unlimited_keywords.contains(&k) {
                unlimited_keywords.push(k);
            }
        }
        Self { unlimited_keywords }
    }

    /// A token is unlimited when it is a keyword, or mentions one and carries
    /// no figure. `"5 GB + unlimited calls"` is a 5.
    pub fn is_unlimited(&self, token: &str) -> bool {
        let t = token.trim().to_lowercase();
        let has_figure = NUMBER.is_match(&t);
        self.unlimited_keywords
            .iter()
            .any(|k| t == *k || (!has_figure && t.contains(k.as_str())))
    }

    /// Normalise an allowance token. Wire sentinels map back to their tags, so
    /// feeding a normalised value back in returns it unchanged.
    pub fn quantity(&self, token: &str) -> Result<Quantity, NormalizeError> {
        if self.is_unlimited(token) {
            return Ok(Quantity::Unlimited);
        }
        let value = first_number(token).ok_or_else(|| NormalizeError::NoNumber {
            token: token.to_string(),
        })?;
        Ok(Quantity::from_wire(Some(value)))
    }

    /// Parse a decorated price label. Prices are never unlimited.
    pub fn price(&self, token: &str) -> Result<f64, NormalizeError> {
        first_number(token).ok_or_else(|| NormalizeError::NoNumber {
            token: token.to_string(),
        })
    }
}

/// Normalise with the default keyword set.
pub fn normalize_quantity(token: &str) -> Result<Quantity, NormalizeError> {
    Normalizer::default().quantity(token)
}

/// First decimal number in `s`. A comma or dot followed by digits is a decimal
/// separator; a `-` opening the token makes it negative.
pub fn first_number(s: &str) -> Option<f64> {
    let s = s.trim();
    let caps = NUMBER.captures(s)?;
    let whole = caps.get(1)?;
    let value: f64 = match caps.get(2) {
        Some(frac) => format!("{}.{}", whole.as_str(), frac.as_str()).parse().ok()?,
        None => whole.as_str().parse().ok()?,
    };
    if whole.start() == 1 && s.starts_with('-') {
        Some(-value)
    } else {
        Some(value)
    }
}

/// First run of ASCII digits in `s`, as an integer.
pub fn first_integer(s: &str) -> Option<u64> {
    INTEGER.find(s)?.as_str().parse().ok()
}

//! # Money Formatting
//!
//! Turns raw [`Money`] into display strings. Pricing never formats;
//! the Cart's `*_formatted` accessors call a [`MoneyFormatter`] last.

use rusty_money::{iso::Currency, Findable, Money as RustyMoney};

use cart_core::Money;

/// Renders an amount for display.
pub trait MoneyFormatter {
    /// `locale` is an ISO-4217 code; `international` asks for the
    /// code-prefixed form ("USD 10.00").
    fn format(&self, amount: Money, locale: &str, international: bool) -> String;
}

impl<F> MoneyFormatter for F
where
    F: Fn(Money, &str, bool) -> String,
{
    fn format(&self, amount: Money, locale: &str, international: bool) -> String {
        self(amount, locale, international)
    }
}

/// Currency-aware formatter backed by `rusty-money`.
///
/// Unknown currency codes fall back to the plain `Money` display.
#[derive(Debug, Clone, Copy, Default)]
pub struct CurrencyFormatter;

impl CurrencyFormatter {
    pub fn new() -> Self {
        CurrencyFormatter
    }
}

impl MoneyFormatter for CurrencyFormatter {
    fn format(&self, amount: Money, locale: &str, international: bool) -> String {
        let code = locale.trim().to_uppercase();
        let Some(currency) = Currency::find(&code) else {
            return amount.to_string();
        };

        let money = RustyMoney::from_minor(amount.cents(), currency);
        if international {
            format!("{} {}", currency.iso_alpha_code, money.amount())
        } else {
            format!("{}", money)
        }
    }
}

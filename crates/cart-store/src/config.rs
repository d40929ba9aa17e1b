//! # Cart Configuration
//!
//! Storage keys, pricing policy and display settings for carts.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     CART_TAX_RATE=0.0825                                               │
//! │     CART_LOCALE=EUR                                                    │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/engine/cart.toml (Linux)                                 │
//! │     ~/Library/Application Support/com.cart.engine/cart.toml (macOS)    │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     no tax, clamp at zero, USD                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # cart.toml
//! [storage]
//! key_prefix = "cart_"
//! instance_key = "cart.instance"
//! default_instance = "default"
//!
//! [pricing]
//! tax_rate = 0.0825
//! discount_policy = "clamp_at_zero"  # clamp_at_zero | allow_negative
//!
//! [format]
//! locale = "USD"
//! international = false
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info, warn};

use cart_core::{DiscountPolicy, PricingEngine, TaxRate, DEFAULT_INSTANCE};

use crate::error::{CartError, CartResult};

// =============================================================================
// Storage Settings
// =============================================================================

/// Where carts live in the key/value store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageSettings {
    /// Prepended to the instance name to form the blob key.
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,

    /// Key remembering the caller's selected instance.
    #[serde(default = "default_instance_key")]
    pub instance_key: String,

    /// Instance used when nothing was selected yet.
    #[serde(default = "default_instance")]
    pub default_instance: String,
}

fn default_key_prefix() -> String {
    "cart_".to_string()
}

fn default_instance_key() -> String {
    "cart.instance".to_string()
}

fn default_instance() -> String {
    DEFAULT_INSTANCE.to_string()
}

impl Default for StorageSettings {
    fn default() -> Self {
        StorageSettings {
            key_prefix: default_key_prefix(),
            instance_key: default_instance_key(),
            default_instance: default_instance(),
        }
    }
}

impl StorageSettings {
    /// Blob key for `instance`.
    pub fn cart_key(&self, instance: &str) -> String {
        format!("{}{}", self.key_prefix, instance)
    }
}

// =============================================================================
// Pricing Settings
// =============================================================================

/// Tax and discount behavior.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PricingSettings {
    /// Decimal fraction, e.g. 0.0825 for 8.25%.
    #[serde(default)]
    pub tax_rate: f64,

    #[serde(default)]
    pub discount_policy: DiscountPolicy,
}

// =============================================================================
// Format Settings
// =============================================================================

/// How formatted amounts render.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormatSettings {
    /// ISO-4217 currency code.
    #[serde(default = "default_locale")]
    pub locale: String,

    /// Render "USD 10.00" instead of "$10.00".
    #[serde(default)]
    pub international: bool,
}

fn default_locale() -> String {
    "USD".to_string()
}

impl Default for FormatSettings {
    fn default() -> Self {
        FormatSettings {
            locale: default_locale(),
            international: false,
        }
    }
}

// =============================================================================
// Main Cart Configuration
// =============================================================================

/// Complete cart configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CartConfig {
    #[serde(default)]
    pub storage: StorageSettings,

    #[serde(default)]
    pub pricing: PricingSettings,

    #[serde(default)]
    pub format: FormatSettings,
}

impl CartConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (cart.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> CartResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading cart config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load cart config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> CartResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| CartError::ConfigSaveFailed("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| CartError::ConfigSaveFailed(e.to_string()))?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents).map_err(|e| CartError::ConfigSaveFailed(e.to_string()))?;

        info!(?path, "Cart config saved");
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> CartResult<()> {
        let rate = self.pricing.tax_rate;
        if !rate.is_finite() || !(0.0..1.0).contains(&rate) {
            return Err(CartError::InvalidConfig(format!(
                "tax_rate must be a fraction in [0, 1), got: {}",
                rate
            )));
        }

        if self.storage.key_prefix.is_empty() {
            return Err(CartError::InvalidConfig("key_prefix must not be empty".into()));
        }
        if self.storage.instance_key.is_empty() {
            return Err(CartError::InvalidConfig("instance_key must not be empty".into()));
        }
        if self.storage.default_instance.trim().is_empty() {
            return Err(CartError::InvalidConfig(
                "default_instance must not be empty".into(),
            ));
        }
        if self.format.locale.trim().is_empty() {
            return Err(CartError::InvalidConfig("locale must not be empty".into()));
        }

        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    /// Applies `CART_*` overrides read through `lookup`.
    fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(rate) = lookup("CART_TAX_RATE") {
            match rate.parse::<f64>() {
                Ok(r) => {
                    debug!(tax_rate = r, "Overriding tax rate from environment");
                    self.pricing.tax_rate = r;
                }
                Err(_) => warn!(value = %rate, "Ignoring unparsable CART_TAX_RATE"),
            }
        }

        if let Some(policy) = lookup("CART_DISCOUNT_POLICY") {
            match policy.parse() {
                Ok(p) => self.pricing.discount_policy = p,
                Err(_) => warn!(value = %policy, "Unknown discount policy in environment"),
            }
        }

        if let Some(prefix) = lookup("CART_KEY_PREFIX") {
            self.storage.key_prefix = prefix;
        }

        if let Some(key) = lookup("CART_INSTANCE_KEY") {
            self.storage.instance_key = key;
        }

        if let Some(instance) = lookup("CART_DEFAULT_INSTANCE") {
            self.storage.default_instance = instance;
        }

        if let Some(locale) = lookup("CART_LOCALE") {
            debug!(locale = %locale, "Overriding locale from environment");
            self.format.locale = locale;
        }

        if let Some(flag) = lookup("CART_INTERNATIONAL_FORMAT") {
            match flag.to_lowercase().as_str() {
                "1" | "true" | "yes" => self.format.international = true,
                "0" | "false" | "no" => self.format.international = false,
                _ => warn!(value = %flag, "Ignoring unparsable CART_INTERNATIONAL_FORMAT"),
            }
        }
    }

    /// Returns the default config file path.
    pub fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "cart", "engine")
            .map(|dirs| dirs.config_dir().join("cart.toml"))
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    pub fn tax_rate(&self) -> TaxRate {
        TaxRate::from_fraction(self.pricing.tax_rate)
    }

    /// Pricing engine for these settings.
    pub fn engine(&self) -> PricingEngine {
        PricingEngine::new(self.tax_rate(), self.pricing.discount_policy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = CartConfig::default();
        assert_eq!(config.storage.key_prefix, "cart_");
        assert_eq!(config.storage.instance_key, "cart.instance");
        assert_eq!(config.storage.default_instance, "default");
        assert_eq!(config.pricing.discount_policy, DiscountPolicy::ClampAtZero);
        assert_eq!(config.format.locale, "USD");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = CartConfig::default();

        config.pricing.tax_rate = 1.0;
        assert!(config.validate().unwrap_err().is_config_error());

        config.pricing.tax_rate = -0.01;
        assert!(config.validate().is_err());

        config.pricing.tax_rate = f64::NAN;
        assert!(config.validate().is_err());

        config.pricing.tax_rate = 0.0825;
        assert!(config.validate().is_ok());

        config.storage.key_prefix = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: CartConfig = toml::from_str(
            r#"
            [pricing]
            tax_rate = 0.1
            discount_policy = "allow_negative"
            "#,
        )
        .unwrap();

        assert_eq!(config.tax_rate().bps(), 1000);
        assert_eq!(config.pricing.discount_policy, DiscountPolicy::AllowNegative);
        assert_eq!(config.storage, StorageSettings::default());
        assert_eq!(config.format.locale, "USD");
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            ("CART_TAX_RATE", "0.0825"),
            ("CART_KEY_PREFIX", "shop_"),
            ("CART_LOCALE", "EUR"),
            ("CART_INTERNATIONAL_FORMAT", "true"),
            ("CART_DISCOUNT_POLICY", "bogus"),
        ]
        .into_iter()
        .collect();

        let mut config = CartConfig::default();
        config.apply_overrides(|name| vars.get(name).map(|v| v.to_string()));

        assert_eq!(config.tax_rate().bps(), 825);
        assert_eq!(config.storage.cart_key("default"), "shop_default");
        assert_eq!(config.format.locale, "EUR");
        assert!(config.format.international);
        // Unknown values are ignored.
        assert_eq!(config.pricing.discount_policy, DiscountPolicy::ClampAtZero);
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = std::env::temp_dir().join(format!("cart-config-{}", std::process::id()));
        let path = dir.join("cart.toml");

        let mut config = CartConfig::default();
        config.pricing.tax_rate = 0.05;
        config.format.locale = "GBP".to_string();
        config.save(Some(path.clone())).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("[storage]"));
        assert!(contents.contains("[pricing]"));

        let loaded: CartConfig = toml::from_str(&contents).unwrap();
        assert_eq!(loaded, config);

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_engine_from_config() {
        let mut config = CartConfig::default();
        config.pricing.tax_rate = 0.10;
        let engine = config.engine();
        assert_eq!(engine.tax_rate, TaxRate::from_bps(1000));
        assert_eq!(engine.discount_policy, DiscountPolicy::ClampAtZero);
    }
}

//! Lookup tables consulted by the validators.
//!
//! The icon catalog is a trait so host applications can supply their own
//! icon set; [`BuiltinIcons`] covers the Font Awesome identifiers a
//! credential manager typically shows.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::KeeperError;

/// A set of permitted icon identifiers.
pub trait IconCatalog: Send + Sync {
    /// True if `icon` is a permitted identifier.
    fn contains(&self, icon: &str) -> bool;
}

/// Font Awesome identifiers, sorted for binary search.
const FONT_AWESOME_ICONS: &[&str] = &[
    "fa-address-book",
    "fa-address-card",
    "fa-amazon",
    "fa-apple",
    "fa-at",
    "fa-bank",
    "fa-barcode",
    "fa-bitcoin",
    "fa-bookmark",
    "fa-briefcase",
    "fa-building",
    "fa-calendar",
    "fa-car",
    "fa-certificate",
    "fa-cloud",
    "fa-code",
    "fa-credit-card",
    "fa-database",
    "fa-desktop",
    "fa-dropbox",
    "fa-envelope",
    "fa-facebook",
    "fa-file",
    "fa-fingerprint",
    "fa-gamepad",
    "fa-github",
    "fa-gitlab",
    "fa-globe",
    "fa-google",
    "fa-graduation-cap",
    "fa-heart",
    "fa-home",
    "fa-hospital",
    "fa-id-badge",
    "fa-id-card",
    "fa-instagram",
    "fa-key",
    "fa-laptop",
    "fa-linkedin",
    "fa-lock",
    "fa-microsoft",
    "fa-mobile",
    "fa-money",
    "fa-paypal",
    "fa-phone",
    "fa-plane",
    "fa-server",
    "fa-shield",
    "fa-shopping-cart",
    "fa-sticky-note",
    "fa-telegram",
    "fa-terminal",
    "fa-twitter",
    "fa-university",
    "fa-unlock",
    "fa-user",
    "fa-users",
    "fa-wallet",
    "fa-wifi",
];

/// The built-in Font Awesome catalog.
#[derive(Debug, Default, Clone, Copy)]
pub struct BuiltinIcons;

impl BuiltinIcons {
    /// Every identifier in the catalog.
    pub fn all() -> &'static [&'static str] {
        FONT_AWESOME_ICONS
    }
}

impl IconCatalog for BuiltinIcons {
    fn contains(&self, icon: &str) -> bool {
        FONT_AWESOME_ICONS.binary_search(&icon).is_ok()
    }
}

impl IconCatalog for HashSet<String> {
    fn contains(&self, icon: &str) -> bool {
        HashSet::contains(self, icon)
    }
}

/// Kinds of value a field can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    Text,
    Password,
    Email,
    Url,
    Phone,
    Number,
    Date,
    Note,
    Otp,
}

impl ValueType {
    /// All recognized value types.
    pub const ALL: [ValueType; 9] = [
        ValueType::Text,
        ValueType::Password,
        ValueType::Email,
        ValueType::Url,
        ValueType::Phone,
        ValueType::Number,
        ValueType::Date,
        ValueType::Note,
        ValueType::Otp,
    ];

    /// Stable lowercase name, as persisted.
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueType::Text => "text",
            ValueType::Password => "password",
            ValueType::Email => "email",
            ValueType::Url => "url",
            ValueType::Phone => "phone",
            ValueType::Number => "number",
            ValueType::Date => "date",
            ValueType::Note => "note",
            ValueType::Otp => "otp",
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ValueType {
    type Err = KeeperError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ValueType::ALL
            .iter()
            .copied()
            .find(|value_type| value_type.as_str() == s)
            .ok_or_else(|| KeeperError::Validation(format!("value type not found: {}", s)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_catalog_is_sorted() {
        let mut sorted = FONT_AWESOME_ICONS.to_vec();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted, FONT_AWESOME_ICONS);
    }

    #[test]
    fn test_builtin_lookup() {
        assert!(BuiltinIcons.contains("fa-bank"));
        assert!(BuiltinIcons.contains("fa-wifi"));
        assert!(!BuiltinIcons.contains("bank"));
        assert!(!BuiltinIcons.contains(""));
    }

    #[test]
    fn test_custom_catalog() {
        let catalog: HashSet<String> = ["bank-icon".to_string()].into_iter().collect();
        assert!(IconCatalog::contains(&catalog, "bank-icon"));
        assert!(!IconCatalog::contains(&catalog, "fa-bank"));
    }

    #[test]
    fn test_value_type_names_parse_back() {
        for value_type in ValueType::ALL {
            assert_eq!(value_type.as_str().parse::<ValueType>().unwrap(), value_type);
        }
        assert!("PASSWORD".parse::<ValueType>().is_err());
        assert!("".parse::<ValueType>().is_err());
    }

    #[test]
    fn test_value_type_serde_matches_display() {
        let json = serde_json::to_string(&ValueType::Otp).unwrap();
        assert_eq!(json, "\"otp\"");
    }
}

//! Human-readable descriptions for test identifiers.
//!
//! The catalog is immutable once built: a fixed built-in table, optionally
//! layered with entries from [`CatalogConfig`]. Unknown identifiers get a
//! deterministic `"<kind> test: <id>"` fallback.

use std::collections::BTreeMap;

use crate::core::config::CatalogConfig;

/// Built-in descriptions for the storefront UI suites.
const BUILTIN_DESCRIPTIONS: &[(&str, &str)] = &[
    ("Login", "Sign in with valid credentials and land on the inventory page"),
    ("LoginLockedOut", "Sign in with a locked-out account shows the lockout error"),
    ("LoginInvalid", "Sign in with a wrong password shows the credentials error"),
    ("AddItem", "Add a product to the cart and verify the cart badge count"),
    ("RemoveItem", "Remove a product from the cart and verify the cart is updated"),
    ("SortByPrice", "Sort the inventory by price, low to high"),
    ("SortByName", "Sort the inventory by name, Z to A"),
    ("ProductDetails", "Open a product page and verify name, price and image"),
    ("Checkout", "Complete checkout with shipping details and verify the order summary"),
    ("CheckoutMissingInfo", "Checkout without a postal code shows the validation error"),
    ("ContinueShopping", "Return from the cart to the inventory page"),
    ("ResetAppState", "Reset app state from the side menu clears the cart"),
    ("Logout", "Sign out from the side menu and return to the login page"),
];

/// Read-only mapping from test identifier to description.
#[derive(Debug, Clone)]
pub struct DescriptionCatalog {
    entries: BTreeMap<String, String>,
    default_kind: String,
}

impl Default for DescriptionCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

impl DescriptionCatalog {
    /// The built-in table with the default `"UI"` fallback kind.
    #[must_use]
    pub fn builtin() -> Self {
        Self::from_config(&CatalogConfig::default())
    }

    /// Built-in table overlaid with configured descriptions.
    #[must_use]
    pub fn from_config(config: &CatalogConfig) -> Self {
        let mut entries: BTreeMap<String, String> = BUILTIN_DESCRIPTIONS
            .iter()
            .map(|(id, desc)| ((*id).to_string(), (*desc).to_string()))
            .collect();
        entries.extend(
            config
                .descriptions
                .iter()
                .map(|(id, desc)| (id.clone(), desc.clone())),
        );
        Self {
            entries,
            default_kind: config.default_kind.clone(),
        }
    }

    /// Exact-match lookup with the deterministic fallback.
    #[must_use]
    pub fn lookup(&self, test_id: &str) -> String {
        self.entries.get(test_id).map_or_else(
            || format!("{} test: {test_id}", self.default_kind),
            Clone::clone,
        )
    }
}

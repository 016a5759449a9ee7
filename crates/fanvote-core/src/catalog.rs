//! Vote package and gift catalog.
//!
//! Packages are read-only catalog rows fetched before a purchase; gifts are a
//! fixed list of priced items sent through the gift procedure.

use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, Result};
use crate::transaction::rounded_unit_price;

/// A purchasable bundle of votes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VotePackage {
    /// Catalog identifier.
    pub id: String,

    /// Number of votes granted.
    pub votes: i64,

    /// Total price in minor currency units.
    pub price: i64,

    /// Discount relative to buying single votes, for display.
    #[serde(default)]
    pub discount_percentage: u8,

    /// Inactive packages are listed nowhere and cannot be bought.
    pub is_active: bool,

    /// Display order (ascending).
    #[serde(default)]
    pub sort_order: i32,
}

impl VotePackage {
    /// Create an active package.
    #[must_use]
    pub fn new(id: impl Into<String>, votes: i64, price: i64) -> Self {
        Self {
            id: id.into(),
            votes,
            price,
            discount_percentage: 0,
            is_active: true,
            sort_order: 0,
        }
    }

    /// Whether the package can be bought right now.
    #[must_use]
    pub fn is_purchasable(&self) -> bool {
        self.is_active && self.votes > 0 && self.price >= 0
    }

    /// Price of one vote, rounded half up.
    #[must_use]
    pub fn unit_price(&self) -> i64 {
        rounded_unit_price(self.price, self.votes)
    }
}

/// The packages seeded into a fresh backend.
#[must_use]
pub fn default_vote_packages() -> Vec<VotePackage> {
    let package = |id: &str, votes, price, discount_percentage, sort_order| VotePackage {
        id: id.to_string(),
        votes,
        price,
        discount_percentage,
        is_active: true,
        sort_order,
    };

    vec![
        package("single", 1, 100, 0, 1),
        package("bundle-10", 10, 950, 5, 2),
        package("bundle-50", 50, 4500, 10, 3),
        package("bundle-100", 100, 8500, 15, 4),
        VotePackage {
            is_active: false,
            ..package("launch-promo", 25, 2000, 20, 5)
        },
    ]
}

/// A giftable item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GiftType {
    /// Catalog identifier passed to the gift procedure.
    pub id: String,

    /// Display name.
    pub name: String,

    /// Price in minor currency units.
    pub price: i64,

    /// Points credited to the candidate and the sender.
    pub points: i64,
}

/// The fixed list of gifts a fan can send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GiftCatalog {
    gifts: Vec<GiftType>,
}

impl GiftCatalog {
    /// Build a catalog from a list of gifts.
    #[must_use]
    pub fn new(gifts: Vec<GiftType>) -> Self {
        Self { gifts }
    }

    /// The standard gift catalog.
    #[must_use]
    pub fn standard() -> Self {
        let gift = |id: &str, name: &str, price, points| GiftType {
            id: id.to_string(),
            name: name.to_string(),
            price,
            points,
        };

        Self::new(vec![
            gift("rose", "Rose", 100, 1),
            gift("heart", "Heart", 500, 5),
            gift("star", "Star", 1000, 12),
            gift("crown", "Crown", 5000, 65),
            gift("diamond", "Diamond", 10000, 140),
        ])
    }

    /// Look up a gift by id.
    #[must_use]
    pub fn find(&self, id: &str) -> Option<&GiftType> {
        self.gifts.iter().find(|g| g.id == id)
    }

    /// Look up a gift by id, failing for unknown ids.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::UnknownGift` if no gift has this id.
    pub fn require(&self, id: &str) -> Result<&GiftType> {
        self.find(id).ok_or_else(|| LedgerError::UnknownGift {
            gift_type: id.to_string(),
        })
    }

    /// All gifts, in catalog order.
    #[must_use]
    pub fn gifts(&self) -> &[GiftType] {
        &self.gifts
    }
}

impl Default for GiftCatalog {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_price_rounds_half_up() {
        assert_eq!(VotePackage::new("p", 3, 1000).unit_price(), 333);
        assert_eq!(VotePackage::new("p", 2, 5).unit_price(), 3);
        assert_eq!(VotePackage::new("p", 10, 950).unit_price(), 95);
    }

    #[test]
    fn inactive_or_empty_packages_are_not_purchasable() {
        let mut package = VotePackage::new("p", 10, 950);
        assert!(package.is_purchasable());

        package.is_active = false;
        assert!(!package.is_purchasable());

        let empty = VotePackage::new("zero", 0, 100);
        assert!(!empty.is_purchasable());
    }

    #[test]
    fn default_packages_have_one_inactive_entry() {
        let packages = default_vote_packages();
        assert_eq!(packages.iter().filter(|p| !p.is_active).count(), 1);
    }

    #[test]
    fn standard_catalog_lookup() {
        let catalog = GiftCatalog::standard();
        assert_eq!(catalog.find("crown").map(|g| g.price), Some(5000));
        assert!(catalog.find("yacht").is_none());
        assert!(matches!(
            catalog.require("yacht"),
            Err(LedgerError::UnknownGift { .. })
        ));
    }

    #[test]
    fn package_deserializes_without_optional_fields() {
        let package: VotePackage = serde_json::from_value(serde_json::json!({
            "id": "bundle-10",
            "votes": 10,
            "price": 950,
            "is_active": true
        }))
        .unwrap();

        assert_eq!(package.discount_percentage, 0);
        assert_eq!(package.sort_order, 0);
    }
}

use crate::domain::amount::BaseUnits;
use crate::error::{CheckoutError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Stable identifier of a catalog item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub u32);

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for ItemId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

/// A purchasable item. Immutable once the catalog is built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogItem {
    pub id: ItemId,
    pub name: String,
    pub description: String,
    /// Price in payment-token base units.
    pub price: BaseUnits,
}

/// Read-only list of purchasable items keyed by id.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    items: BTreeMap<ItemId, CatalogItem>,
}

impl Catalog {
    /// Builds a catalog, rejecting duplicate ids.
    pub fn from_items(items: impl IntoIterator<Item = CatalogItem>) -> Result<Self> {
        let mut map = BTreeMap::new();
        for item in items {
            let id = item.id;
            if map.insert(id, item).is_some() {
                return Err(CheckoutError::DuplicateItem(id));
            }
        }
        Ok(Self { items: map })
    }

    /// The laboratory test catalog the checkout ships with (18-decimal token).
    pub fn lab_tests() -> Self {
        let entries = [
            (1, "Haemoglobin Test", "Measures haemoglobin in your blood.", 500_000_000_000_000_000),
            (2, "Blood Sugar Test", "Measures your blood glucose level.", 750_000_000_000_000_000),
            (3, "Blood Urea Test", "Measures the urea content of your blood.", 1_250_000_000_000_000_000),
            (4, "Serum Bilirubin Test", "Measures serum bilirubin in your blood.", 2_000_000_000_000_000_000),
            (5, "HDL Cholesterol Test", "Measures your HDL cholesterol.", 1_750_000_000_000_000_000),
            (6, "LDL Cholesterol Test", "Measures your LDL cholesterol.", 2_000_000_000_000_000_000),
        ];

        let items = entries
            .into_iter()
            .map(|(id, name, description, price)| {
                (
                    ItemId(id),
                    CatalogItem {
                        id: ItemId(id),
                        name: name.to_string(),
                        description: description.to_string(),
                        price: BaseUnits(price),
                    },
                )
            })
            .collect();

        Self { items }
    }

    pub fn get(&self, id: ItemId) -> Option<&CatalogItem> {
        self.items.get(&id)
    }

    /// Looks up the price of `id`, failing if the catalog has no such item.
    pub fn price_of(&self, id: ItemId) -> Result<BaseUnits> {
        self.get(id)
            .map(|item| item.price)
            .ok_or(CheckoutError::UnknownItem(id))
    }

    /// Items in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = &CatalogItem> {
        self.items.values()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

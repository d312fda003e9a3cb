use crate::domain::amount::BaseUnits;
use crate::domain::catalog::{Catalog, CatalogItem, ItemId};
use crate::error::{CheckoutError, Result};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::Read;

#[derive(Debug, Deserialize)]
struct CatalogRecord {
    id: u32,
    name: String,
    #[serde(default)]
    description: String,
    price: Decimal,
}

/// Reads catalog items from CSV with the header `id,name,description,price`.
///
/// Prices are human-readable decimals and are scaled to base units using the
/// token's decimal places.
pub struct CatalogReader<R: Read> {
    reader: csv::Reader<R>,
    decimals: u32,
}

impl<R: Read> CatalogReader<R> {
    pub fn new(source: R, decimals: u32) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader, decimals }
    }

    /// Lazily reads and converts each row.
    pub fn items(self) -> impl Iterator<Item = Result<CatalogItem>> {
        let decimals = self.decimals;
        self.reader
            .into_deserialize()
            .map(move |result| -> Result<CatalogItem> {
                let record: CatalogRecord = result.map_err(CheckoutError::from)?;
                Ok(CatalogItem {
                    id: ItemId(record.id),
                    name: record.name,
                    description: record.description,
                    price: BaseUnits::from_decimal(record.price, decimals)?,
                })
            })
    }

    /// Reads the whole source into a catalog, stopping at the first bad row.
    pub fn read_catalog(self) -> Result<Catalog> {
        let items = self.items().collect::<Result<Vec<_>>>()?;
        Catalog::from_items(items)
    }
}

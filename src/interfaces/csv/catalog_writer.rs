use crate::domain::catalog::Catalog;
use crate::error::Result;
use serde::Serialize;
use std::io::Write;

#[derive(Serialize)]
struct CatalogRow<'a> {
    id: u32,
    name: &'a str,
    price: String,
    description: &'a str,
}

/// Writes the catalog as CSV with human-readable prices.
pub struct CatalogWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> CatalogWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    pub fn write_catalog(&mut self, catalog: &Catalog, decimals: u32) -> Result<()> {
        for item in catalog.iter() {
            self.writer.serialize(CatalogRow {
                id: item.id.0,
                name: &item.name,
                price: item.price.format_units(decimals),
                description: &item.description,
            })?;
        }
        self.writer.flush()?;
        Ok(())
    }
}

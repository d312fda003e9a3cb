use crate::domain::amount::BaseUnits;
use crate::domain::catalog::{Catalog, ItemId};
use crate::error::{CheckoutError, Result};

/// Sums the catalog prices of `selection` in base units.
///
/// Fails with [`CheckoutError::UnknownItem`] if an id has no catalog entry and
/// with [`CheckoutError::AmountOverflow`] if the sum does not fit.
pub fn compute_total<'a>(
    selection: impl IntoIterator<Item = &'a ItemId>,
    catalog: &Catalog,
) -> Result<BaseUnits> {
    selection
        .into_iter()
        .try_fold(BaseUnits::ZERO, |total, id| {
            let price = catalog.price_of(*id)?;
            total.checked_add(price).ok_or(CheckoutError::AmountOverflow)
        })
}

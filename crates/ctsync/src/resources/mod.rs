//! Resource kinds the engine knows how to synchronize.

mod category;
mod product;
mod tax_category;

pub use category::CategoryResource;
pub use product::{PriceCompositeId, ProductResource};
pub use tax_category::{TaxCategoryResource, TaxRateIdentity};

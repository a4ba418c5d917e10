//! Catalog browsing commands.

use clap::Subcommand;

use velorm_storefront::Storefront;
use velorm_storefront::error::Result;

use crate::output;

#[derive(Subcommand)]
pub enum CatalogAction {
    /// List active products
    Products,
    /// Show one product
    Product {
        /// Product slug
        slug: String,
    },
    /// List categories
    Categories,
}

pub async fn run(storefront: &Storefront, action: CatalogAction) -> Result<()> {
    let currency = storefront.config.currency;
    match action {
        CatalogAction::Products => {
            let (products, categories) = tokio::try_join!(
                storefront.client.get_products(),
                storefront.client.get_categories()
            )?;
            let active: Vec<_> = products.iter().filter(|p| p.is_active()).collect();
            output::products(&active, &categories, currency);
        }
        CatalogAction::Product { slug } => {
            let (product, categories) = tokio::try_join!(
                storefront.client.get_product_by_slug(&slug),
                storefront.client.get_categories()
            )?;
            output::product_detail(&product, &categories, currency);
        }
        CatalogAction::Categories => {
            let categories = storefront.client.get_categories().await?;
            output::categories(&categories);
        }
    }
    Ok(())
}

//! Cart commands.
//!
//! The cart lives on the server; every command fetches it first so the
//! local mirror is current before it is changed.
//!
//! # Usage
//!
//! ```bash
//! velorm cart                 # show the cart
//! velorm cart add rooh-gulab  # add one unit by product slug
//! velorm cart inc <product-id>
//! velorm cart dec <product-id>   # removes the item at quantity 1
//! velorm cart remove <product-id>
//! ```

use chrono::Utc;
use clap::Subcommand;

use velorm_core::{CartAction as Action, ProductId};
use velorm_storefront::Storefront;
use velorm_storefront::error::Result;

use crate::output;

#[derive(Subcommand)]
pub enum CartAction {
    /// Show the cart
    Show,
    /// Add a product by slug
    Add {
        /// Product slug
        slug: String,
    },
    /// Increase a product's quantity by one
    Inc {
        /// Product id
        product_id: String,
    },
    /// Decrease a product's quantity by one, removing it at one
    Dec {
        /// Product id
        product_id: String,
    },
    /// Remove a product
    Remove {
        /// Product id
        product_id: String,
    },
}

pub async fn run(storefront: &Storefront, action: Option<CartAction>) -> Result<()> {
    let user_id = storefront.effective_user_id().await;
    storefront.cart.fetch_cart(&user_id).await?;

    match action.unwrap_or(CartAction::Show) {
        CartAction::Show => {}
        CartAction::Add { slug } => {
            let product = storefront.client.get_product_by_slug(&slug).await?;
            let payload = product.add_to_cart_payload(Utc::now());
            storefront
                .cart
                .add_to_cart(&product.id, &user_id, Some(&payload))
                .await?;
            output::line(&format!("Added {} to cart", product.name));
        }
        CartAction::Inc { product_id } => {
            storefront
                .cart
                .update_cart_item(&ProductId::new(product_id), &user_id, Action::Inc)
                .await?;
        }
        CartAction::Dec { product_id } => {
            storefront
                .cart
                .decrement_or_remove(&ProductId::new(product_id), &user_id)
                .await?;
        }
        CartAction::Remove { product_id } => {
            storefront
                .cart
                .remove_from_cart(&ProductId::new(product_id), &user_id)
                .await?;
        }
    }

    let items = storefront.cart.items().await;
    let totals = storefront
        .cart
        .totals(storefront.config.shipping_fee, storefront.config.currency)
        .await?;
    output::cart(&items, &totals, storefront.config.currency);
    Ok(())
}

//! Checkout command.
//!
//! Payment is cash on delivery; there is nothing else to choose.

use clap::Args;

use velorm_storefront::Storefront;
use velorm_storefront::checkout::CheckoutForm;
use velorm_storefront::error::Result;

use crate::output;

#[derive(Args)]
pub struct CheckoutArgs {
    #[arg(long)]
    first_name: String,

    #[arg(long, default_value = "")]
    last_name: String,

    #[arg(long, default_value = "")]
    email: String,

    /// Contact number
    #[arg(long, default_value = "")]
    contact: String,

    /// Street address
    #[arg(long)]
    address: String,

    #[arg(long)]
    city: String,

    #[arg(long, default_value = "")]
    postal_code: String,

    #[arg(long, default_value = "")]
    landmark: String,
}

impl From<CheckoutArgs> for CheckoutForm {
    fn from(args: CheckoutArgs) -> Self {
        Self {
            first_name: args.first_name,
            last_name: args.last_name,
            email: args.email,
            contact: args.contact,
            address: args.address,
            city: args.city,
            postal_code: args.postal_code,
            landmark: args.landmark,
        }
    }
}

pub async fn run(storefront: &Storefront, args: CheckoutArgs) -> Result<()> {
    let mut form = CheckoutForm::from(args);
    if let Some(user) = storefront.auth.user().await {
        if form.email.trim().is_empty() {
            form.email = user.email.unwrap_or_default();
        }
        if form.contact.trim().is_empty() {
            form.contact = user.contact.unwrap_or_default();
        }
    }

    let user_id = storefront.effective_user_id().await;
    storefront.cart.fetch_cart(&user_id).await?;
    let totals = storefront
        .cart
        .totals(storefront.config.shipping_fee, storefront.config.currency)
        .await?;

    let confirmation = storefront.place_order(&form).await?;
    output::order_placed(&confirmation, &totals);
    Ok(())
}

//! Order history command.

use velorm_storefront::Storefront;
use velorm_storefront::error::Result;

use crate::output;

pub async fn run(storefront: &Storefront) -> Result<()> {
    let user_id = storefront.effective_user_id().await;
    let orders = storefront.orders.fetch_orders(&user_id).await?;
    output::orders(&orders, storefront.config.currency);
    Ok(())
}

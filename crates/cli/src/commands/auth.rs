//! Session commands.
//!
//! # Usage
//!
//! ```bash
//! velorm auth send-otp 9876543210
//! velorm auth verify 9876543210 123456
//! velorm auth profile --name "Asha Rao" --email asha@example.com
//! velorm auth whoami
//! velorm auth logout
//! ```

use clap::Subcommand;
use secrecy::SecretString;

use velorm_storefront::Storefront;
use velorm_storefront::error::{Result, StoreError};

use crate::output;

#[derive(Subcommand)]
pub enum AuthAction {
    /// Send a one-time password to a contact number
    SendOtp {
        /// Contact number
        contact: String,
    },
    /// Verify a one-time password and sign in
    Verify {
        /// Contact number the OTP was sent to
        contact: String,
        /// The one-time password
        otp: String,
    },
    /// Update the signed-in user's profile
    Profile {
        /// Display name
        #[arg(short, long)]
        name: String,

        /// Email address
        #[arg(short, long, default_value = "")]
        email: String,

        /// Contact number (defaults to the current one)
        #[arg(short, long)]
        contact: Option<String>,
    },
    /// Show the signed-in user
    Whoami,
    /// Sign out
    Logout,
}

pub async fn run(storefront: &Storefront, action: AuthAction) -> Result<()> {
    match action {
        AuthAction::SendOtp { contact } => {
            storefront.auth.send_otp(&contact).await?;
            output::line(&format!("OTP sent to {contact}"));
        }
        AuthAction::Verify { contact, otp } => {
            let user = storefront
                .auth
                .verify_otp(&contact, SecretString::from(otp))
                .await?;
            output::line(&format!("Signed in as {}", user.display_name()));
        }
        AuthAction::Profile {
            name,
            email,
            contact,
        } => {
            let current = storefront.auth.user().await.ok_or_else(|| {
                StoreError::Unauthorized("Sign in before updating your profile".to_string())
            })?;
            let contact = contact.or(current.contact).unwrap_or_default();
            let user = storefront
                .auth
                .update_profile(&name, &email, &contact)
                .await?;
            output::user(&user, storefront.config.currency);
        }
        AuthAction::Whoami => match storefront.auth.user().await {
            Some(user) => output::user(&user, storefront.config.currency),
            None => output::line(&format!(
                "Browsing as guest {}",
                storefront.effective_user_id().await
            )),
        },
        AuthAction::Logout => {
            storefront.auth.logout().await?;
            output::line("Signed out");
        }
    }
    Ok(())
}

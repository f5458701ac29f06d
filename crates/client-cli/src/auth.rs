//! Account commands: register, login, logout, whoami

use anyhow::Result;
use shared::{LoginRequest, RegisterRequest, UserInfo};

use crate::api::{ApiClient, ApiError};
use crate::config::Config;

pub async fn register(server_url: &str, req: RegisterRequest) -> Result<()> {
    let client = ApiClient::new(server_url, None);
    let user = client.register(&req).await?;

    println!("\x1b[1;32m✅ Registered {} account\x1b[0m", user.role);
    print_user(&user);
    println!("Run '\x1b[1mscholar login --email {}\x1b[0m' to sign in", user.email);
    Ok(())
}

/// Log in and store the issued token in the config file
pub async fn login(
    config: &mut Config,
    server_url: &str,
    email: String,
    password: String,
) -> Result<()> {
    let client = ApiClient::new(server_url, None);
    let resp = client.login(&LoginRequest { email, password }).await?;

    config.remote.token = Some(resp.token.token);
    config.save()?;

    println!("\x1b[1;32m✅ Login successful!\x1b[0m");
    print_user(&resp.user);
    println!("\x1b[90mToken expires at {}\x1b[0m", resp.token.expires_at);
    Ok(())
}

/// Revoke the token on the server and forget it locally
pub async fn logout(config: &mut Config, server_url: &str, token: Option<String>) -> Result<()> {
    if token.is_some() {
        let client = ApiClient::new(server_url, token);
        match client.logout().await {
            Ok(resp) => tracing::debug!("Server: {}", resp.message),
            // Already expired or revoked on the server side
            Err(e) if e.status() == Some(reqwest::StatusCode::UNAUTHORIZED) => {
                tracing::debug!("Token was no longer valid: {}", e)
            }
            Err(e) => return Err(e.into()),
        }
    }

    config.remote.token = None;
    config.save()?;
    println!("\x1b[32m✅ Logged out successfully\x1b[0m");
    Ok(())
}

/// Show current login status
pub async fn whoami(server_url: &str, token: Option<String>) -> Result<()> {
    let client = ApiClient::new(server_url, token);
    match client.me().await {
        Ok(user) => {
            println!("\x1b[32m✓ Logged in\x1b[0m");
            println!("Server: {}", server_url);
            print_user(&user);
        }
        Err(ApiError::NotLoggedIn) => {
            println!("\x1b[33m✗ Not logged in\x1b[0m");
            println!("Run '\x1b[1mscholar login\x1b[0m' to authenticate");
        }
        Err(e) if e.status() == Some(reqwest::StatusCode::UNAUTHORIZED) => {
            println!("\x1b[33m✗ Session expired or revoked\x1b[0m");
            println!("Run '\x1b[1mscholar login\x1b[0m' to authenticate");
        }
        Err(e) => return Err(e.into()),
    }
    Ok(())
}

fn print_user(user: &UserInfo) {
    println!("ID:    {}", user.id);
    println!("Name:  {}", user.full_name.as_deref().unwrap_or("-"));
    println!("Email: {}", user.email);
    println!("Role:  {}", user.role);
}

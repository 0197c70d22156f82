//! TOML file configuration structures.
//!
//! These structs directly map to the `payrec-config.toml` file format.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use url::Url;

/// Root configuration structure as read from the TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileConfig {
    pub server: ServerConfig,
    pub gateway: GatewayConfig,
    pub shop: ShopConfig,
}

/// Server configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// The address and port to listen on (e.g., "0.0.0.0:8080").
    #[serde(default = "default_listen_addr")]
    pub listen: SocketAddr,
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8080))
}

/// Payment-gateway configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Base URL of the gateway checkout API.
    pub base_url: Url,
    /// API key sent with outbound gateway calls.
    pub api_key: String,
    /// Merchant account identifier at the gateway.
    pub merchant_account: String,
    /// HMAC key for verifying inbound result submissions. When unset,
    /// inbound submissions are accepted unsigned.
    #[serde(default)]
    pub hmac_key: Option<String>,
}

/// Host shop configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShopConfig {
    /// Human-readable shop name.
    pub name: String,
    /// Secret used to sign outbound state-change notifications.
    pub secret: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_parsing() {
        let toml_str = r#"
[server]
listen = "127.0.0.1:3000"

[gateway]
base_url = "https://checkout-test.example.com/v71/"
api_key = "test-api-key"
merchant_account = "TestMerchant"
hmac_key = "gateway-hmac-key"

[shop]
name = "Test Store"
secret = "secret123"
"#;
        let config: FileConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.server.listen.port(), 3000);
        assert_eq!(config.gateway.merchant_account, "TestMerchant");
        assert_eq!(config.gateway.hmac_key.as_deref(), Some("gateway-hmac-key"));
        assert_eq!(config.shop.name, "Test Store");
    }

    #[test]
    fn test_listen_and_hmac_key_are_optional() {
        let toml_str = r#"
[server]

[gateway]
base_url = "https://checkout-test.example.com/v71/"
api_key = "test-api-key"
merchant_account = "TestMerchant"

[shop]
name = "Test Store"
secret = "secret123"
"#;
        let config: FileConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.server.listen.port(), 8080);
        assert!(config.gateway.hmac_key.is_none());
    }
}

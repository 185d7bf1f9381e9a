use std::time::Duration;

use klabis_hal::client::HalClient;
use klabis_hal::config::ClientConfig;
use tempfile::TempDir;

#[tokio::test]
async fn test_saved_config_loads_back() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("nested").join("config.toml");

    let mut config = ClientConfig {
        base_url: "https://klabis.example".to_string(),
        behind_api_prefix: false,
        access_token: Some("secret".to_string()),
        ..ClientConfig::default()
    };
    config.stale.options_secs = 60;
    config.save_to(&path).await.unwrap();

    let loaded = ClientConfig::load_from(&path).await.unwrap();
    assert_eq!(loaded, config);
    assert_eq!(loaded.stale.options(), Duration::from_secs(60));
    assert!(!loaded.api_paths().behind_prefix());

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}

#[tokio::test]
async fn test_partial_file_uses_defaults() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("config.toml");
    tokio::fs::write(&path, "base_url = \"http://localhost:9000\"\n").await.unwrap();

    let loaded = ClientConfig::load_from(&path).await.unwrap();
    assert_eq!(loaded.base_url, "http://localhost:9000");
    assert_eq!(loaded.api_prefix, "/api");
    assert_eq!(loaded.stale, ClientConfig::default().stale);
}

#[tokio::test]
async fn test_missing_file_yields_defaults() {
    let temp = TempDir::new().unwrap();
    let loaded = ClientConfig::load_with_optional(Some(temp.path().join("absent.toml"))).await.unwrap();
    assert_eq!(loaded, ClientConfig::default());
}

#[tokio::test]
async fn test_invalid_files_rejected() {
    let temp = TempDir::new().unwrap();

    let malformed = temp.path().join("malformed.toml");
    tokio::fs::write(&malformed, "base_url = [").await.unwrap();
    assert!(ClientConfig::load_from(&malformed).await.is_err());

    let bad_url = temp.path().join("bad_url.toml");
    tokio::fs::write(&bad_url, "base_url = \"not a url\"\n").await.unwrap();
    assert!(ClientConfig::load_from(&bad_url).await.is_err());
}

#[test]
fn test_client_from_config_validates() {
    let config = ClientConfig {
        api_prefix: "api/".to_string(),
        ..ClientConfig::default()
    };
    assert!(HalClient::from_config(&config, None).is_err());
    assert!(HalClient::from_config(&ClientConfig::default(), None).is_ok());
}

use std::collections::HashMap;

use tw_domain::{ServerConfig, TransportKind};

// The config layer parses the `servers` section of the user config as a
// name -> ServerConfig map; make sure that shape round-trips.
#[test]
fn servers_section_parses_as_map() {
    let raw = r#"{
        "echo": {
            "transport": "stdio",
            "command": "echo-server",
            "cwd": "/srv/echo"
        },
        "remote": {
            "transport": "http",
            "url": "https://tools.example.com/rpc",
            "headers": { "x-api-key": "abc123" },
            "timeoutMs": 10000
        }
    }"#;
    let servers: HashMap<String, ServerConfig> = serde_json::from_str(raw).unwrap();
    assert_eq!(servers.len(), 2);

    let echo = &servers["echo"];
    assert_eq!(echo.transport, TransportKind::Stdio);
    assert_eq!(echo.cwd.as_deref().unwrap().to_str(), Some("/srv/echo"));
    assert!(echo.url.is_none());

    let remote = &servers["remote"];
    assert_eq!(remote.transport, TransportKind::Http);
    assert_eq!(remote.timeout_ms, Some(10_000));
}

#[test]
fn default_config_is_stdio_without_command() {
    let cfg = ServerConfig::default();
    assert_eq!(cfg.transport, TransportKind::Stdio);
    assert!(cfg.command.is_none());
    assert!(cfg.args.is_empty());
    assert!(cfg.timeout_ms.is_none());
}

use pwice::config::{Config, GatewayConfig};

pub const TEST_MODEL: &str = "gemini-test";
pub const TEST_KEY: &str = "test-key";

/// Path of the streaming endpoint for the test model
#[allow(dead_code)]
pub fn stream_path() -> String {
    format!("/v1beta/models/{}:streamGenerateContent", TEST_MODEL)
}

/// Gateway settings pointing at a mock server
#[allow(dead_code)]
pub fn gateway_config(api_base: &str) -> GatewayConfig {
    GatewayConfig {
        api_key: Some(TEST_KEY.to_string()),
        api_base: api_base.to_string(),
        model: TEST_MODEL.to_string(),
        request_timeout_seconds: 5,
        ..Default::default()
    }
}

/// Full configuration pointing at a mock server
#[allow(dead_code)]
pub fn config(api_base: &str) -> Config {
    let mut config = Config::default();
    config.gateway = gateway_config(api_base);
    config.chat.reply_timeout_seconds = 5;
    config
}

/// SSE body carrying one text fragment per event
#[allow(dead_code)]
pub fn sse_body(fragments: &[&str]) -> String {
    fragments
        .iter()
        .map(|text| {
            let chunk = serde_json::json!({
                "candidates": [{
                    "content": { "role": "model", "parts": [{ "text": text }] }
                }]
            });
            format!("data: {}\r\n\r\n", chunk)
        })
        .collect()
}

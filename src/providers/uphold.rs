use anyhow::{Result, anyhow};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::core::currency::{CurrencyRateProvider, Pair};

pub const DEFAULT_BASE_URL: &str = "https://api.uphold.com";

/// Reads the ask price of `BASE-TARGET` tickers.
pub struct UpholdTickerProvider {
    base_url: String,
    client: reqwest::Client,
}

impl UpholdTickerProvider {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("fxview/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(UpholdTickerProvider {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }
}

/// Prices arrive as decimal strings; numbers are accepted too.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Price {
    Text(String),
    Number(f64),
}

impl Price {
    fn to_f64(&self) -> Option<f64> {
        match self {
            Price::Text(s) => s.trim().parse().ok(),
            Price::Number(n) => Some(*n),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TickerResponse {
    ask: Price,
}

#[async_trait]
impl CurrencyRateProvider for UpholdTickerProvider {
    #[instrument(name = "UpholdTickerFetch", skip(self), fields(pair = %pair))]
    async fn get_rate(&self, pair: &Pair) -> Result<f64> {
        let url = format!("{}/v0/ticker/{}", self.base_url, pair);
        debug!("Requesting ticker from {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| anyhow!("Request error: {} for currency pair: {}", e, pair))?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "HTTP error: {} for currency pair: {}",
                response.status(),
                pair
            ));
        }

        let text = response.text().await?;

        let data: TickerResponse = serde_json::from_str(&text)
            .map_err(|e| anyhow!("Failed to parse JSON response for {}: {}", pair, e))?;

        match data.ask.to_f64() {
            Some(ask) if ask.is_finite() && ask > 0.0 => Ok(ask),
            _ => Err(anyhow!("Invalid ask price for currency pair: {}", pair)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::currency::Currency;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn create_mock_server(pair: &str, status: u16, body: &str) -> MockServer {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("/v0/ticker/{pair}")))
            .respond_with(ResponseTemplate::new(status).set_body_string(body))
            .mount(&mock_server)
            .await;
        mock_server
    }

    fn usd_eur() -> Pair {
        Pair::new(Currency::Usd, Currency::Eur)
    }

    #[tokio::test]
    async fn test_successful_rate_fetch() {
        let body = r#"{"ask": "0.92", "bid": "0.91", "currency": "EUR"}"#;
        let mock_server = create_mock_server("USD-EUR", 200, body).await;
        let provider = UpholdTickerProvider::new(&mock_server.uri()).unwrap();

        let rate = provider
            .get_rate(&usd_eur())
            .await
            .expect("Failed to get rate");
        assert_eq!(rate, 0.92);
    }

    #[tokio::test]
    async fn test_numeric_ask_is_accepted() {
        let body = r#"{"ask": 1.2345}"#;
        let mock_server = create_mock_server("USD-EUR", 200, body).await;
        let provider = UpholdTickerProvider::new(&format!("{}/", mock_server.uri())).unwrap();

        assert_eq!(provider.get_rate(&usd_eur()).await.unwrap(), 1.2345);
    }

    #[tokio::test]
    async fn test_api_error_response() {
        let mock_server = create_mock_server("USD-EUR", 500, "").await;
        let provider = UpholdTickerProvider::new(&mock_server.uri()).unwrap();

        let result = provider.get_rate(&usd_eur()).await;
        assert_eq!(
            result.unwrap_err().to_string(),
            "HTTP error: 500 Internal Server Error for currency pair: USD-EUR"
        );
    }

    #[tokio::test]
    async fn test_malformed_response() {
        let body = r#"{"price": "0.92"}"#;
        let mock_server = create_mock_server("USD-EUR", 200, body).await;
        let provider = UpholdTickerProvider::new(&mock_server.uri()).unwrap();

        let result = provider.get_rate(&usd_eur()).await;
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Failed to parse JSON response for USD-EUR")
        );
    }

    #[tokio::test]
    async fn test_zero_ask_is_rejected() {
        let body = r#"{"ask": "0", "bid": "0", "currency": "EUR"}"#;
        let mock_server = create_mock_server("USD-EUR", 200, body).await;
        let provider = UpholdTickerProvider::new(&mock_server.uri()).unwrap();

        let result = provider.get_rate(&usd_eur()).await;
        assert_eq!(
            result.unwrap_err().to_string(),
            "Invalid ask price for currency pair: USD-EUR"
        );
    }
}

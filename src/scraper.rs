use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use tracing::debug;

use crate::error::FetchError;

/// Anything that can turn a URL into raw page text.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String, FetchError>;
}

const SAMPLE_CONTENTS: [&str; 6] = [
    "E-commerce platform offering innovative digital solutions for modern businesses. Transform your online presence with our cutting-edge technology and expert guidance. Join thousands of satisfied customers who trust our proven methodology.",
    "Professional consulting services specializing in business transformation. Our experienced team helps companies solve complex challenges and achieve sustainable growth through strategic planning and implementation.",
    "Educational technology platform revolutionizing online learning experiences. Interactive courses, expert instructors, and personalized learning paths designed for professional development and skill enhancement.",
    "Marketing automation software that streamlines your campaigns and maximizes ROI. Advanced analytics, seamless integrations, and intuitive workflows for businesses of all sizes.",
    "Health and wellness solutions promoting better lifestyle choices. Evidence-based programs, nutritional guidance, and fitness tracking tools to help you achieve your wellness goals.",
    "Financial services platform offering comprehensive investment and wealth management solutions. Expert advisors, secure transactions, and transparent fee structures for your financial success.",
];

/// Stand-in fetcher: sleeps a random latency, fails now and then, and
/// returns one of a few canned page texts.
pub struct SimulatedFetcher {
    min_delay: Duration,
    max_delay: Duration,
    failure_rate: f64,
}

impl SimulatedFetcher {
    pub fn new(min_delay: Duration, max_delay: Duration, failure_rate: f64) -> Self {
        Self {
            min_delay,
            max_delay,
            failure_rate: failure_rate.clamp(0.0, 1.0),
        }
    }
}

impl Default for SimulatedFetcher {
    fn default() -> Self {
        Self::new(Duration::from_millis(1000), Duration::from_millis(3000), 0.10)
    }
}

#[async_trait]
impl Fetcher for SimulatedFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        // Roll everything up front; the rng must not live across the await.
        let (delay, fails, pick) = {
            let mut rng = rand::thread_rng();
            let delay = if self.max_delay > self.min_delay {
                rng.gen_range(self.min_delay..self.max_delay)
            } else {
                self.min_delay
            };
            let fails = rng.gen_bool(self.failure_rate);
            (delay, fails, rng.gen_range(0..SAMPLE_CONTENTS.len()))
        };

        debug!("Simulated fetch of {} ({} ms)", url, delay.as_millis());
        tokio::time::sleep(delay).await;

        if fails {
            return Err(FetchError::Simulated);
        }
        Ok(SAMPLE_CONTENTS[pick].to_string())
    }
}

/// Real network fetch: plain GET, body returned as text. No per-request timeout.
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("ccmeta/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        debug!("Fetching {}", url);
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::Http(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16(), url.to_string()));
        }

        response
            .text()
            .await
            .map_err(|e| FetchError::Http(e.to_string()))
    }
}

use crate::domain::Chronicle;
use crate::error::{Result, ScrapeError};
use crate::infrastructure::scrapers::html::css;
use crate::infrastructure::scrapers::races::is_rate_limited;
use reqwest::{Client, StatusCode};
use scraper::Html;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};

enum Fetched {
    Page(String),
    Limited,
}

pub struct WikiClient {
    client: Client,
    base_url: String,
    wait: Duration,
}

impl WikiClient {
    pub fn new(client: Client, base_url: &str, wait: Duration) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            wait,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// GET a page body. A rate-limited answer is retried once after
    /// sleeping twice the configured wait.
    pub async fn fetch_page(&self, url: &str) -> Result<String> {
        if let Fetched::Page(body) = self.get_once(url).await? {
            return Ok(body);
        }

        let backoff = self.wait * 2;
        warn!("Rate limited on {url}, reloading in {:?}", backoff);
        sleep(backoff).await;

        match self.get_once(url).await? {
            Fetched::Page(body) => Ok(body),
            Fetched::Limited => Err(ScrapeError::RateLimited(url.to_string())),
        }
    }

    async fn get_once(&self, url: &str) -> Result<Fetched> {
        let response = self.client.get(url).send().await?;
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            return Ok(Fetched::Limited);
        }
        if status == StatusCode::NOT_FOUND {
            return Err(ScrapeError::NotFound(url.to_string()));
        }
        if !status.is_success() {
            return Err(ScrapeError::Http {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body = response.text().await?;
        if is_rate_limited(&body) {
            return Ok(Fetched::Limited);
        }
        Ok(Fetched::Page(body))
    }

    /// Raw bytes of a binary resource such as an icon.
    pub async fn download(&self, url: &str) -> Result<Vec<u8>> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ScrapeError::Http {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        Ok(response.bytes().await?.to_vec())
    }

    /// Selects the server (and optionally the chronicle) for the session.
    /// The session cookie stays in the client's cookie store.
    pub async fn switch_server(&self, chronicle: &Chronicle, with_chronicle: bool) -> Result<()> {
        let root = format!("{}/", self.base_url);
        let page = self.fetch_page(&root).await?;
        let token = csrf_token(&page)
            .ok_or_else(|| ScrapeError::Parse(format!("no csrf token on {root}")))?;

        let server_id = chronicle.server_id.to_string();
        self.post_form(
            "/wiki/profile/set-server",
            &token,
            &[("_csrf", token.as_str()), ("server_id", server_id.as_str())],
        )
        .await?;

        if with_chronicle {
            self.post_form(
                "/wiki/profile/set-chronicles",
                &token,
                &[("_csrf", token.as_str()), ("chronicle", chronicle.url_segment())],
            )
            .await?;
        }

        info!("Switched wiki session to {chronicle}");
        sleep(self.wait).await;
        Ok(())
    }

    async fn post_form(&self, path: &str, token: &str, form: &[(&str, &str)]) -> Result<()> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .post(&url)
            .header("X-CSRF-Token", token)
            .header("X-Requested-With", "XMLHttpRequest")
            .form(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ScrapeError::Http {
                status: status.as_u16(),
                url,
            });
        }
        Ok(())
    }
}

fn csrf_token(page: &str) -> Option<String> {
    let document = Html::parse_document(page);
    document
        .select(css!(r#"meta[name="csrf-token"]"#))
        .next()
        .and_then(|meta| meta.value().attr("content"))
        .map(str::to_string)
        .filter(|t| !t.is_empty())
}

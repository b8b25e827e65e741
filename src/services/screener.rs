use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use reqwest::{Client, header};
use serde::{Deserialize, Serialize};

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                          (KHTML, like Gecko) Chrome/122.0.0.0 Safari/537.36";

static TOP_RATIOS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?s)<ul[^>]*\bid="top-ratios"[^>]*>(.*?)</ul>"#).unwrap());
static LIST_ITEM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<li\b[^>]*>(.*?)</li>").unwrap());
static NAME_SPAN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)<span[^>]*\bclass="[^"]*\bname\b[^"]*"[^>]*>(.*?)</span>"#).unwrap()
});
static NUMBER_SPAN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)<span[^>]*\bclass="[^"]*\bnumber\b[^"]*"[^>]*>(.*?)</span>"#).unwrap()
});
static ABOUT_PARAGRAPH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?s)<(?:div|section)[^>]*(?:class|id)="[^"]*(?:company-background|about|background)[^"]*"[^>]*>.*?<p[^>]*>(.*?)</p>"#,
    )
    .unwrap()
});
static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").unwrap());
static SPACES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// HTTP session against screener.in: company search plus the company page.
#[derive(Clone)]
pub struct ScreenerClient {
    http: Client,
    base_url: String,
}

impl ScreenerClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, String> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
            ),
        );
        headers.insert(
            header::ACCEPT_LANGUAGE,
            header::HeaderValue::from_static("en-US,en;q=0.9"),
        );

        let http = Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .cookie_store(true)
            .timeout(timeout)
            .build()
            .map_err(|e| e.to_string())?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Loads the home page once so later requests carry the site's cookies.
    pub async fn prime(&self) {
        match self.http.get(&self.base_url).send().await {
            Ok(_) => tracing::info!("screener session initialised"),
            Err(e) => tracing::warn!("could not prime screener session: {}", e),
        }
    }

    async fn search(&self, company_name: &str) -> Result<Option<SearchHit>, String> {
        let url = format!("{}/api/company/search/", self.base_url);
        let res = self
            .http
            .get(url)
            .query(&[("q", company_name), ("v", "3"), ("fts", "1")])
            .header(header::ACCEPT, "application/json, text/javascript, */*; q=0.01")
            .header("X-Requested-With", "XMLHttpRequest")
            .header(header::REFERER, format!("{}/", self.base_url))
            .send()
            .await
            .map_err(describe_error)?;

        if !res.status().is_success() {
            return Err(format!("HTTP error from screener.in: {}", res.status()));
        }

        let hits = res.json::<Vec<SearchHit>>().await.map_err(|e| e.to_string())?;
        Ok(hits.into_iter().next())
    }

    async fn fetch_page(&self, path: &str) -> Result<String, String> {
        let url = format!("{}{}", self.base_url, path);
        let res = self
            .http
            .get(url)
            .header(header::REFERER, format!("{}/", self.base_url))
            .send()
            .await
            .map_err(describe_error)?;

        if !res.status().is_success() {
            return Err(format!("HTTP error from screener.in: {}", res.status()));
        }

        res.text().await.map_err(|e| e.to_string())
    }

    /// Looks the company up and scrapes its page. Failures are reported in
    /// the `error` field rather than returned.
    pub async fn stock_details(&self, company_name: &str) -> StockDetails {
        let mut details = StockDetails::empty(company_name);

        let hit = match self.search(company_name).await {
            Ok(Some(hit)) => hit,
            Ok(None) => {
                details.error = Some(format!(
                    "No company found matching \"{company_name}\" on screener.in"
                ));
                return details;
            }
            Err(e) => {
                details.error = Some(e);
                return details;
            }
        };

        if let Some(name) = hit.name {
            details.company_name = name;
        }

        let html = match self.fetch_page(&hit.url).await {
            Ok(html) => html,
            Err(e) => {
                details.error = Some(e);
                return details;
            }
        };

        details.fill_from_page(&html);
        tracing::info!(
            "{}: price={:?} high={:?} low={:?} mkt_cap={:?}",
            details.company_name,
            details.price,
            details.high,
            details.low,
            details.market_cap
        );
        details
    }

    pub async fn quote(&self, company_name: &str) -> PriceQuote {
        let details = self.stock_details(company_name).await;
        PriceQuote {
            success: details.success,
            company_name: details.company_name,
            price: details.price,
            error: details.error,
        }
    }

    /// Quotes each name in turn, pausing between requests.
    pub async fn quote_many(&self, company_names: &[String], delay: Duration) -> Vec<PriceQuote> {
        let mut out = Vec::with_capacity(company_names.len());
        for (i, name) in company_names.iter().enumerate() {
            out.push(self.quote(name).await);
            if i + 1 < company_names.len() {
                tokio::time::sleep(delay).await;
            }
        }
        out
    }
}

fn describe_error(e: reqwest::Error) -> String {
    if e.is_timeout() {
        "Request to screener.in timed out".to_string()
    } else if e.is_connect() {
        format!("Connection error reaching screener.in: {e}")
    } else {
        e.to_string()
    }
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    #[serde(default)]
    name: Option<String>,
    url: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PriceQuote {
    pub company_name: String,
    pub price: Option<f64>,
    pub success: bool,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StockDetails {
    pub company_name: String,
    pub price: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub market_cap: Option<String>,
    pub roe: Option<String>,
    pub roce: Option<String>,
    pub description: String,
    pub success: bool,
    pub error: Option<String>,
}

impl StockDetails {
    fn empty(company_name: &str) -> Self {
        Self {
            company_name: company_name.to_string(),
            price: None,
            high: None,
            low: None,
            market_cap: None,
            roe: None,
            roce: None,
            description: String::new(),
            success: false,
            error: None,
        }
    }

    fn fill_from_page(&mut self, html: &str) {
        let ratios = top_ratios(html);

        self.price = extract_price(html, &ratios);
        (self.high, self.low) = extract_high_low(&ratios);

        self.market_cap = ratios
            .iter()
            .find(|(k, _)| {
                let k = k.to_lowercase();
                k.contains("market cap") || k.contains("mkt cap")
            })
            .map(|(_, v)| v.clone());
        self.roe = ratio_named(&ratios, "ROE");
        self.roce = ratio_named(&ratios, "ROCE");
        self.description = extract_description(html);

        if self.price.is_some() {
            self.success = true;
        } else {
            self.error = Some("Could not extract current price from screener.in page".to_string());
        }
    }
}

fn ratio_named(ratios: &[(String, String)], name: &str) -> Option<String> {
    ratios
        .iter()
        .find(|(k, _)| k.trim().eq_ignore_ascii_case(name))
        .map(|(_, v)| v.clone())
}

fn text_of(fragment: &str) -> String {
    let stripped = TAG.replace_all(fragment, " ");
    let decoded = stripped.replace("&nbsp;", " ").replace("&amp;", "&");
    SPACES.replace_all(decoded.trim(), " ").into_owned()
}

/// `"₹ 1,234 / 900"` -> 1234.0
pub fn parse_number(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .chars()
        .filter(|c| *c != '₹' && *c != ',' && !c.is_whitespace())
        .collect();
    cleaned
        .split('/')
        .next()?
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}

/// Label/value pairs of the `top-ratios` list, in page order. Values made of
/// several numbers are joined with `" / "`.
pub fn top_ratios(html: &str) -> Vec<(String, String)> {
    let Some(list) = TOP_RATIOS.captures(html) else {
        return Vec::new();
    };

    LIST_ITEM
        .captures_iter(&list[1])
        .filter_map(|item| {
            let body = &item[1];
            let label = text_of(&NAME_SPAN.captures(body)?[1]);
            let values: Vec<String> = NUMBER_SPAN
                .captures_iter(body)
                .map(|c| text_of(&c[1]))
                .collect();
            Some((label, values.join(" / ")))
        })
        .collect()
}

fn extract_price(html: &str, ratios: &[(String, String)]) -> Option<f64> {
    if let Some(price) = ratios
        .iter()
        .find(|(k, _)| k.contains("Current Price"))
        .and_then(|(_, v)| parse_number(v))
    {
        return Some(price);
    }

    NUMBER_SPAN
        .captures_iter(html)
        .filter_map(|c| parse_number(&text_of(&c[1])))
        .find(|v| *v > 0.5 && *v < 1_000_000.0)
}

fn extract_high_low(ratios: &[(String, String)]) -> (Option<f64>, Option<f64>) {
    let Some((_, raw)) = ratios.iter().find(|(k, _)| {
        let k = k.to_lowercase();
        k.contains("high") && k.contains("low")
    }) else {
        return (None, None);
    };

    let mut parts = raw.split('/').map(str::trim);
    let high = parts.next().and_then(parse_number);
    let low = parts.next().and_then(parse_number);
    (high, low)
}

fn extract_description(html: &str) -> String {
    ABOUT_PARAGRAPH
        .captures_iter(html)
        .map(|c| text_of(&c[1]))
        .find(|t| t.len() > 20)
        .unwrap_or_default()
}

use std::sync::LazyLock;
use std::time::Duration;

use chrono::NaiveDate;
use regex::Regex;
use reqwest::{Client, header};
use serde::Serialize;

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                          (KHTML, like Gecko) Chrome/122.0.0.0 Safari/537.36";

static DETAIL_ITEM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?s)<div[^>]*class="[^"]*ipoDetails_detailItem[^"]*"[^>]*>.*?<div[^>]*class="[^"]*bodySmall[^"]*"[^>]*>(.*?)</div>.*?<div[^>]*class="[^"]*bodyBaseHeavy[^"]*"[^>]*>(.*?)</div>"#,
    )
    .unwrap()
});
static SUBSCRIPTION_ROW: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)<div[^>]*class="[^"]*subscription_row__[^"]*"[^>]*>(.*?)</div>"#).unwrap()
});
static SUBSCRIPTION_TOTAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)<div[^>]*class="[^"]*subscription_totalRow[^"]*"[^>]*>(.*?)</div>"#).unwrap()
});
static SCHEDULE_STEP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)<div[^>]*class="[^"]*ipoSchedule_stepInfoContainer[^"]*"[^>]*>(.*?)</div>"#)
        .unwrap()
});
static SPAN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?s)<span([^>]*)>(.*?)</span>"#).unwrap());
static NUMBER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+\.?\d*").unwrap());
static SHORT_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{1,2})\s+([A-Za-z]{3})\S*\s+'?(\d{2,4})").unwrap());
static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").unwrap());

/// Fetches Groww IPO pages. Groww renders the IPO data server side, so a
/// plain GET is enough.
#[derive(Clone)]
pub struct GrowwScraper {
    http: Client,
}

impl GrowwScraper {
    pub fn new(timeout: Duration) -> Result<Self, String> {
        let http = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| e.to_string())?;
        Ok(Self { http })
    }

    async fn fetch(&self, url: &str) -> Result<String, String> {
        let res = self
            .http
            .get(url)
            .header(
                header::ACCEPT,
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            )
            .header(header::ACCEPT_LANGUAGE, "en-US,en;q=0.9")
            .send()
            .await
            .map_err(|e| e.to_string())?;

        if !res.status().is_success() {
            return Err(format!("Groww returned {}", res.status()));
        }
        res.text().await.map_err(|e| e.to_string())
    }

    /// Scrapes one IPO page. A failed fetch still comes back as `success`
    /// with a warning so the user can fill the form in by hand.
    pub async fn scrape_ipo(&self, url: &str) -> GrowwIpo {
        tracing::info!("fetching Groww page {}", url);

        match self.fetch(url).await {
            Ok(html) => parse_ipo_page(&html),
            Err(e) => {
                tracing::error!("error scraping Groww: {}", e);
                GrowwIpo {
                    warning: Some(format!("Scraping failed: {e}. Please fill in manually.")),
                    error: Some(e),
                    success: true,
                    ..GrowwIpo::default()
                }
            }
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct GrowwIpo {
    pub listed_on: Option<String>,
    pub issue_price: Option<String>,
    pub listing_price: Option<String>,
    pub issue_size: Option<String>,
    pub qib_subscription: Option<String>,
    pub nii_subscription: Option<String>,
    pub rii_subscription: Option<String>,
    pub total_subscription: Option<String>,
    pub success: bool,
    pub error: Option<String>,
    pub warning: Option<String>,
}

fn text_of(fragment: &str) -> String {
    TAG.replace_all(fragment, "").trim().to_string()
}

fn spans(fragment: &str) -> Vec<(String, String)> {
    SPAN.captures_iter(fragment)
        .map(|c| (c[1].to_string(), text_of(&c[2])))
        .collect()
}

/// `"19 Feb 2025"` -> `"19-02-2025"`. Text that does not look like a date is
/// returned as is.
pub fn format_listing_date(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    let Some(c) = SHORT_DATE.captures(raw) else {
        return Some(raw.to_string());
    };

    let year = if c[3].len() == 2 {
        format!("20{}", &c[3])
    } else {
        c[3].to_string()
    };

    let normalized = format!("{} {} {}", &c[1], &c[2], year);
    match NaiveDate::parse_from_str(&normalized, "%d %b %Y") {
        Ok(date) => Some(date.format("%d-%m-%Y").to_string()),
        Err(_) => Some(raw.to_string()),
    }
}

fn numbers(raw: &str) -> Vec<String> {
    let cleaned = raw.replace(',', "");
    NUMBER
        .find_iter(&cleaned)
        .map(|m| m.as_str().to_string())
        .collect()
}

pub fn parse_ipo_page(html: &str) -> GrowwIpo {
    let details: Vec<(String, String)> = DETAIL_ITEM
        .captures_iter(html)
        .map(|c| (text_of(&c[1]), text_of(&c[2])))
        .filter(|(k, v)| !k.is_empty() && !v.is_empty() && k != "IPO document")
        .collect();
    let detail = |keys: &[&str]| {
        keys.iter()
            .find_map(|key| details.iter().find(|(k, _)| k == key).map(|(_, v)| v.clone()))
    };

    let mut subscription: Vec<(String, String)> = SUBSCRIPTION_ROW
        .captures_iter(html)
        .filter_map(|c| {
            let row = spans(&c[1]);
            if row.len() < 2 {
                return None;
            }
            let label = row.first()?.1.clone();
            let value = row.last()?.1.clone();
            (!label.is_empty() && !value.is_empty()).then_some((label, value))
        })
        .collect();
    if let Some(total) = SUBSCRIPTION_TOTAL.captures(html) {
        let row = spans(&total[1]);
        if row.len() >= 2 {
            if let Some((_, value)) = row.last() {
                subscription.push(("Total".to_string(), value.clone()));
            }
        }
    }

    let schedule: Vec<(String, String)> = SCHEDULE_STEP
        .captures_iter(html)
        .filter_map(|c| {
            let row = spans(&c[1]);
            let date = row.iter().find(|(attrs, _)| attrs.contains("bodyBase"))?;
            let label = row.iter().find(|(attrs, _)| attrs.contains("bodyBaseHeavy"))?;
            Some((label.1.clone(), date.1.clone()))
        })
        .collect();

    let mut ipo = GrowwIpo {
        success: true,
        ..GrowwIpo::default()
    };

    ipo.listed_on = ["Tentative listing date", "Listing date", "Listed on", "Listing Date"]
        .iter()
        .find_map(|key| schedule.iter().find(|(k, _)| k == key))
        .and_then(|(_, date)| format_listing_date(date));

    // "₹674 - ₹708" keeps the upper end of the band
    ipo.issue_price = detail(&["Price range", "Issue Price"]).and_then(|raw| numbers(&raw).pop());
    ipo.listing_price = detail(&["Listing Price", "List Price"])
        .and_then(|raw| numbers(&raw).into_iter().next());
    ipo.issue_size = detail(&["Issue size", "Issue Size"]).map(|s| s.trim().to_string());

    for (label, value) in subscription {
        let l = label.to_lowercase();
        if l.contains("qualified") || l.contains("qib") {
            ipo.qib_subscription = Some(value);
        } else if l.contains("non-institutional") || l.contains("nii") {
            ipo.nii_subscription = Some(value);
        } else if l.contains("retail") || l.contains("rii") {
            ipo.rii_subscription = Some(value);
        } else if l == "total" {
            ipo.total_subscription = Some(value);
        }
    }

    let mut missing = Vec::new();
    if ipo.listed_on.is_none() {
        missing.push("listing date");
    }
    if ipo.issue_price.is_none() {
        missing.push("issue price");
    }
    if ipo.issue_size.is_none() {
        missing.push("issue size");
    }

    if missing.len() == 3 && ipo.qib_subscription.is_none() {
        ipo.warning = Some(
            "Could not auto-scrape any data from Groww. The page structure may have changed - please fill in manually."
                .to_string(),
        );
    } else if !missing.is_empty() {
        ipo.warning = Some(format!(
            "Could not scrape: {}. Please fill in manually.",
            missing.join(", ")
        ));
    }

    ipo
}

use std::time::Duration;

use reqwest::Client;
use serde_json::{Value, json};

use super::alert_engine::AlertRecord;

const BOT_NAME: &str = "IPO Tracker Bot";
const AVATAR_URL: &str = "https://cdn-icons-png.flaticon.com/512/2830/2830284.png";
const GREEN: u32 = 0x2ECC71;
const RED: u32 = 0xE74C3C;

/// Posts alert embeds and batch summaries to a Discord webhook.
#[derive(Clone)]
pub struct DiscordNotifier {
    http: Client,
    webhook_url: Option<String>,
}

impl DiscordNotifier {
    pub fn new(webhook_url: Option<String>) -> Self {
        let http = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            http,
            webhook_url: webhook_url.filter(|u| !u.trim().is_empty()),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.webhook_url.is_some()
    }

    async fn post(&self, payload: &Value) -> Result<(), String> {
        let Some(url) = &self.webhook_url else {
            return Err("DISCORD_WEBHOOK_URL is not set".to_string());
        };

        let res = self
            .http
            .post(url)
            .json(payload)
            .send()
            .await
            .map_err(|e| e.to_string())?;

        if !res.status().is_success() {
            return Err(format!("Discord webhook returned {}", res.status()));
        }
        Ok(())
    }

    /// Returns whether the webhook accepted the message.
    pub async fn send_alert(&self, alert: &AlertRecord) -> bool {
        match self.post(&alert_payload(alert)).await {
            Ok(()) => {
                tracing::info!("Discord alert sent for {}", alert.company_name);
                true
            }
            Err(e) => {
                tracing::error!("failed to send Discord alert for {}: {}", alert.company_name, e);
                false
            }
        }
    }

    pub async fn send_summary(&self, checked: usize, sent: usize) {
        if !self.is_configured() {
            return;
        }
        if let Err(e) = self.post(&summary_payload(checked, sent)).await {
            tracing::warn!("failed to send Discord summary: {}", e);
        }
    }
}

fn signed_pct(pct: Option<f64>) -> String {
    match pct {
        Some(p) if p >= 0.0 => format!("+{p:.2}%"),
        Some(p) => format!("{p:.2}%"),
        None => "N/A".to_string(),
    }
}

pub fn alert_payload(alert: &AlertRecord) -> Value {
    let color = if alert.all_gains() { GREEN } else { RED };

    let mut fields = vec![
        json!({ "name": "📈 CMP", "value": format!("₹{}", alert.cmp), "inline": true }),
        json!({
            "name": "🏭 Sector",
            "value": alert.sector.as_deref().filter(|s| !s.is_empty()).unwrap_or("—"),
            "inline": true
        }),
    ];

    if let Some(price) = alert.issue_price {
        fields.push(json!({
            "name": "💰 Issue Price",
            "value": format!("₹{} | {}", price, signed_pct(alert.pct_vs_issue)),
            "inline": true
        }));
    }

    if let Some(price) = alert.listing_price {
        fields.push(json!({
            "name": "🏁 Listing Price",
            "value": format!("₹{} | {}", price, signed_pct(alert.pct_vs_listing)),
            "inline": true
        }));
    }

    let reasons = alert.reason_lines().join("\n");
    if !reasons.is_empty() {
        fields.push(json!({ "name": "⚠️ Alert Reasons", "value": reasons, "inline": false }));
    }

    json!({
        "username": BOT_NAME,
        "avatar_url": AVATAR_URL,
        "embeds": [{
            "title": format!("🚨 IPO Alert - {}", alert.company_name),
            "color": color,
            "fields": fields,
            "footer": { "text": "IPO Tracker | Powered by Screener.in" }
        }]
    })
}

pub fn summary_payload(checked: usize, sent: usize) -> Value {
    json!({
        "username": BOT_NAME,
        "content": format!(
            "✅ **Daily Alert Check Complete**\n• Stocks checked: **{checked}**\n• Alerts triggered: **{sent}**"
        ),
    })
}

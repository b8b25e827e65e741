use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use mongodb::{Database, bson::doc};
use serde::Serialize;
use thiserror::Error;
use tokio::time;

use crate::{
    AppState,
    models::{AlertRule, Ipo},
};

use super::{
    alert_engine::{self, AlertRecord, CmpMap},
    discord::DiscordNotifier,
    rule_resolver::{self, RuleBook, RuleError},
    screener::ScreenerClient,
};

#[async_trait]
pub trait AlertStore: Send + Sync {
    async fn list_portfolio_ipos(&self) -> Result<Vec<Ipo>, String>;
    async fn list_rules(&self) -> Result<Vec<AlertRule>, String>;
}

#[async_trait]
pub trait PriceSource: Send + Sync {
    async fn fetch_price(&self, company_name: &str) -> Result<f64, String>;
}

#[async_trait]
pub trait AlertSink: Send + Sync {
    async fn send(&self, alert: &AlertRecord) -> bool;
    async fn send_summary(&self, checked: usize, sent: usize);
}

#[derive(Debug, Error)]
pub enum BatchError {
    #[error("storage error: {0}")]
    Storage(String),

    #[error("invalid alert rules: {0}")]
    Rules(#[from] RuleError),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchSummary {
    pub ipos_checked: usize,
    pub cmp_fetched: usize,
    pub alerts_triggered: usize,
    pub alerts_sent: usize,
}

/// One pass over every portfolio holding: load, price, evaluate, notify.
///
/// Rules are validated before any price is fetched, so an invalid rule set
/// aborts the run without sending anything. Holdings are evaluated against
/// their owner's rules.
pub async fn run_batch(
    store: &dyn AlertStore,
    prices: &dyn PriceSource,
    sink: &dyn AlertSink,
    delay: Duration,
) -> Result<BatchSummary, BatchError> {
    tracing::info!("starting IPO alert check");

    let ipos = store.list_portfolio_ipos().await.map_err(BatchError::Storage)?;
    if ipos.is_empty() {
        tracing::info!("no portfolio IPOs found");
        return Ok(BatchSummary::default());
    }

    let rules = store.list_rules().await.map_err(BatchError::Storage)?;
    let books = rule_resolver::books_by_user(&rules)?;

    let cmp_map = collect_prices(prices, &ipos, delay).await;

    let empty = RuleBook::default();
    let alerts: Vec<AlertRecord> = ipos
        .iter()
        .filter_map(|ipo| {
            let book = books.get(&ipo.user_id).unwrap_or(&empty);
            alert_engine::evaluate_ipo(ipo, book, &cmp_map)
        })
        .collect();

    let mut sent = 0;
    for alert in &alerts {
        if sink.send(alert).await {
            sent += 1;
        }
    }
    sink.send_summary(ipos.len(), sent).await;

    let summary = BatchSummary {
        ipos_checked: ipos.len(),
        cmp_fetched: cmp_map.len(),
        alerts_triggered: alerts.len(),
        alerts_sent: sent,
    };
    tracing::info!(
        "alert check complete: {} IPOs checked, {} prices, {} triggered, {} sent",
        summary.ipos_checked,
        summary.cmp_fetched,
        summary.alerts_triggered,
        summary.alerts_sent
    );
    Ok(summary)
}

/// Fetches each distinct company once, in first-seen order, pausing between
/// lookups. Failed lookups are logged and left out of the map.
async fn collect_prices(prices: &dyn PriceSource, ipos: &[Ipo], delay: Duration) -> CmpMap {
    let mut seen = HashSet::new();
    let names: Vec<&str> = ipos
        .iter()
        .map(|ipo| ipo.company_name.as_str())
        .filter(|name| seen.insert(name.to_lowercase()))
        .collect();

    tracing::info!("gathering CMP for {} companies", names.len());

    let mut cmp_map = CmpMap::new();
    for (i, name) in names.iter().enumerate() {
        if i > 0 && !delay.is_zero() {
            time::sleep(delay).await;
        }
        match prices.fetch_price(name).await {
            Ok(price) => cmp_map.insert(name, price),
            Err(e) => tracing::warn!("could not fetch CMP for {}: {}", name, e),
        }
    }
    cmp_map
}

pub struct MongoAlertStore {
    db: Database,
}

impl MongoAlertStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl AlertStore for MongoAlertStore {
    async fn list_portfolio_ipos(&self) -> Result<Vec<Ipo>, String> {
        let ipos = self.db.collection::<Ipo>("ipos");
        let mut cursor = ipos
            .find(doc! { "portfolio": true }, None)
            .await
            .map_err(|e| e.to_string())?;

        let mut out = Vec::new();
        while let Some(item) = cursor.next().await {
            out.push(item.map_err(|e| e.to_string())?);
        }
        Ok(out)
    }

    async fn list_rules(&self) -> Result<Vec<AlertRule>, String> {
        let rules = self.db.collection::<AlertRule>("alert_rules");
        let opts = mongodb::options::FindOptions::builder()
            .sort(doc! { "created_at": 1 })
            .build();
        let mut cursor = rules
            .find(doc! {}, opts)
            .await
            .map_err(|e| e.to_string())?;

        let mut out = Vec::new();
        while let Some(item) = cursor.next().await {
            out.push(item.map_err(|e| e.to_string())?);
        }
        Ok(out)
    }
}

#[async_trait]
impl PriceSource for ScreenerClient {
    async fn fetch_price(&self, company_name: &str) -> Result<f64, String> {
        let quote = self.quote(company_name).await;
        match quote.price {
            Some(price) if quote.success => Ok(price),
            _ => Err(quote.error.unwrap_or_else(|| "no price".to_string())),
        }
    }
}

#[async_trait]
impl AlertSink for DiscordNotifier {
    async fn send(&self, alert: &AlertRecord) -> bool {
        self.send_alert(alert).await
    }

    async fn send_summary(&self, checked: usize, sent: usize) {
        DiscordNotifier::send_summary(self, checked, sent).await
    }
}

/// Runs the batch against the live collaborators held in `state`.
pub async fn run_with_state(state: &AppState) -> Result<BatchSummary, BatchError> {
    let store = MongoAlertStore::new(state.db.clone());
    let delay = Duration::from_millis(state.settings.scrape_delay_ms);
    run_batch(&store, &state.screener, &state.notifier, delay).await
}

/// Re-runs the batch on a fixed interval. A run finishes before the next
/// tick is taken, so runs never overlap.
pub fn spawn_alert_scheduler(state: AppState, every: Duration) {
    tokio::spawn(async move {
        let mut interval = time::interval(every);
        interval.set_missed_tick_behavior(time::MissedTickBehavior::Delay);

        loop {
            interval.tick().await;

            if let Err(e) = run_with_state(&state).await {
                tracing::error!("scheduled alert check failed: {}", e);
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RuleScope;
    use mongodb::bson::oid::ObjectId;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeStore {
        ipos: Vec<Ipo>,
        rules: Vec<AlertRule>,
        fail: bool,
    }

    #[async_trait]
    impl AlertStore for FakeStore {
        async fn list_portfolio_ipos(&self) -> Result<Vec<Ipo>, String> {
            if self.fail {
                return Err("connection refused".to_string());
            }
            Ok(self.ipos.clone())
        }

        async fn list_rules(&self) -> Result<Vec<AlertRule>, String> {
            Ok(self.rules.clone())
        }
    }

    #[derive(Default)]
    struct FakePrices {
        prices: HashMap<String, f64>,
        calls: Mutex<Vec<String>>,
    }

    impl FakePrices {
        fn with(prices: &[(&str, f64)]) -> Self {
            Self {
                prices: prices.iter().map(|(n, p)| (n.to_string(), *p)).collect(),
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl PriceSource for FakePrices {
        async fn fetch_price(&self, company_name: &str) -> Result<f64, String> {
            self.calls.lock().unwrap().push(company_name.to_string());
            self.prices
                .get(company_name)
                .copied()
                .ok_or_else(|| format!("no quote for {company_name}"))
        }
    }

    #[derive(Default)]
    struct FakeSink {
        reject: Vec<String>,
        sent: Mutex<Vec<String>>,
        summary: Mutex<Option<(usize, usize)>>,
    }

    #[async_trait]
    impl AlertSink for FakeSink {
        async fn send(&self, alert: &AlertRecord) -> bool {
            if self.reject.contains(&alert.company_name) {
                return false;
            }
            self.sent.lock().unwrap().push(alert.company_name.clone());
            true
        }

        async fn send_summary(&self, checked: usize, sent: usize) {
            *self.summary.lock().unwrap() = Some((checked, sent));
        }
    }

    fn holding(user: &str, company: &str, issue: &str) -> Ipo {
        let mut ipo = Ipo::new(user, company);
        ipo.portfolio = true;
        ipo.issue_price = Some(issue.to_string());
        ipo
    }

    fn rule(user: &str, scope: RuleScope, gain: Option<f64>, loss: Option<f64>) -> AlertRule {
        AlertRule {
            id: ObjectId::new(),
            user_id: user.to_string(),
            scope,
            gain_pct: gain,
            loss_pct: loss,
            created_at: 0,
            updated_at: None,
        }
    }

    #[tokio::test]
    async fn sends_one_alert_per_triggered_holding() {
        let store = FakeStore {
            ipos: vec![
                holding("u1", "Acme", "100"),
                holding("u1", "Beta", "100"),
                holding("u1", "Gamma", "100"),
            ],
            ..FakeStore::default()
        };
        let prices = FakePrices::with(&[("Acme", 120.0), ("Beta", 101.0), ("Gamma", 70.0)]);
        let sink = FakeSink::default();

        let summary = run_batch(&store, &prices, &sink, Duration::ZERO).await.unwrap();

        assert_eq!(
            summary,
            BatchSummary { ipos_checked: 3, cmp_fetched: 3, alerts_triggered: 2, alerts_sent: 2 }
        );
        assert_eq!(*sink.sent.lock().unwrap(), vec!["Acme", "Gamma"]);
        assert_eq!(*sink.summary.lock().unwrap(), Some((3, 2)));
    }

    #[tokio::test]
    async fn fetches_each_company_once() {
        let store = FakeStore {
            ipos: vec![
                holding("u1", "Acme", "100"),
                holding("u2", "acme", "90"),
                holding("u2", "Beta", "100"),
            ],
            ..FakeStore::default()
        };
        let prices = FakePrices::with(&[("Acme", 120.0), ("Beta", 100.0)]);
        let sink = FakeSink::default();

        let summary = run_batch(&store, &prices, &sink, Duration::ZERO).await.unwrap();

        assert_eq!(*prices.calls.lock().unwrap(), vec!["Acme", "Beta"]);
        assert_eq!(summary.alerts_triggered, 2);
    }

    #[tokio::test]
    async fn failed_price_lookup_skips_only_that_company() {
        let store = FakeStore {
            ipos: vec![holding("u1", "Acme", "100"), holding("u1", "Delisted", "100")],
            ..FakeStore::default()
        };
        let prices = FakePrices::with(&[("Acme", 50.0)]);
        let sink = FakeSink::default();

        let summary = run_batch(&store, &prices, &sink, Duration::ZERO).await.unwrap();

        assert_eq!(summary.cmp_fetched, 1);
        assert_eq!(summary.alerts_sent, 1);
    }

    #[tokio::test]
    async fn failed_send_does_not_stop_the_rest() {
        let store = FakeStore {
            ipos: vec![holding("u1", "Acme", "100"), holding("u1", "Beta", "100")],
            ..FakeStore::default()
        };
        let prices = FakePrices::with(&[("Acme", 150.0), ("Beta", 150.0)]);
        let sink = FakeSink { reject: vec!["Acme".to_string()], ..FakeSink::default() };

        let summary = run_batch(&store, &prices, &sink, Duration::ZERO).await.unwrap();

        assert_eq!(summary.alerts_triggered, 2);
        assert_eq!(summary.alerts_sent, 1);
        assert_eq!(*sink.sent.lock().unwrap(), vec!["Beta"]);
    }

    #[tokio::test]
    async fn holdings_use_their_owners_rules() {
        let store = FakeStore {
            ipos: vec![holding("u1", "Acme", "100"), holding("u2", "Acme", "100")],
            rules: vec![rule("u2", RuleScope::Base, Some(50.0), Some(-50.0))],
            ..FakeStore::default()
        };
        let prices = FakePrices::with(&[("Acme", 120.0)]);
        let sink = FakeSink::default();

        let summary = run_batch(&store, &prices, &sink, Duration::ZERO).await.unwrap();

        // u1 falls back to +15%, u2 needs +50%
        assert_eq!(summary.alerts_triggered, 1);
    }

    #[tokio::test]
    async fn invalid_rules_abort_before_any_fetch_or_send() {
        let store = FakeStore {
            ipos: vec![holding("u1", "Acme", "100")],
            rules: vec![rule(
                "u1",
                RuleScope::Company { company_name: "Acme".to_string() },
                Some(20.0),
                None,
            )],
            ..FakeStore::default()
        };
        let prices = FakePrices::with(&[("Acme", 200.0)]);
        let sink = FakeSink::default();

        let err = run_batch(&store, &prices, &sink, Duration::ZERO).await.unwrap_err();

        assert!(matches!(err, BatchError::Rules(RuleError::MissingThreshold { .. })));
        assert!(prices.calls.lock().unwrap().is_empty());
        assert!(sink.sent.lock().unwrap().is_empty());
        assert_eq!(*sink.summary.lock().unwrap(), None);
    }

    #[tokio::test]
    async fn storage_failure_aborts_the_batch() {
        let store = FakeStore { fail: true, ..FakeStore::default() };
        let prices = FakePrices::default();
        let sink = FakeSink::default();

        let err = run_batch(&store, &prices, &sink, Duration::ZERO).await.unwrap_err();

        assert!(matches!(err, BatchError::Storage(_)));
        assert_eq!(*sink.summary.lock().unwrap(), None);
    }

    #[tokio::test]
    async fn no_holdings_means_no_summary() {
        let store = FakeStore::default();
        let prices = FakePrices::default();
        let sink = FakeSink::default();

        let summary = run_batch(&store, &prices, &sink, Duration::ZERO).await.unwrap();

        assert_eq!(summary, BatchSummary::default());
        assert_eq!(*sink.summary.lock().unwrap(), None);
    }
}

use std::time::Duration;

use serde::Serialize;

use crate::{models::Ipo, AppState};

use super::{
    alert_engine::{percentage_change, round2, CmpMap},
    ipos_service,
};

#[derive(Debug, Clone, Serialize)]
pub struct HoldingView {
    pub id: String,
    pub company_name: String,
    pub sector: String,
    pub sector_id: Option<String>,
    pub shares: f64,
    pub buy_price: f64,
    pub cmp: Option<f64>,
    pub invested: f64,
    pub current_value: Option<f64>,
    pub pct_change: Option<f64>,
    pub issue_price: Option<String>,
    pub listing_price: Option<String>,
    pub listed_on: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PortfolioSummary {
    pub companies: Vec<HoldingView>,
    pub total_invested: f64,
    pub total_current_value: f64,
    pub total_pct_change: f64,
}

/// Values each holding at its CMP. Holdings without a price still count
/// towards the invested total but add nothing to the current value.
pub fn summarize(ipos: &[Ipo], cmp_map: &CmpMap) -> PortfolioSummary {
    let mut total_invested = 0.0;
    let mut total_current_value = 0.0;

    let companies: Vec<HoldingView> = ipos
        .iter()
        .map(|ipo| {
            let shares = ipo.no_of_shares.unwrap_or(0.0);
            let buy_price = ipo.buy_price.unwrap_or(0.0);
            let cmp = cmp_map.get(&ipo.company_name).filter(|p| *p != 0.0);

            let invested = shares * buy_price;
            let current_value = cmp.map(|p| shares * p);
            let pct_change = cmp.and_then(|p| percentage_change(p, Some(buy_price)));

            total_invested += invested;
            total_current_value += current_value.unwrap_or(0.0);

            HoldingView {
                id: ipo.id.to_hex(),
                company_name: ipo.company_name.clone(),
                sector: ipo
                    .sector_name
                    .clone()
                    .filter(|s| !s.is_empty())
                    .unwrap_or_else(|| "—".to_string()),
                sector_id: ipo.sector_id.clone(),
                shares,
                buy_price,
                cmp,
                invested,
                current_value,
                pct_change,
                issue_price: ipo.issue_price.clone(),
                listing_price: ipo.listing_price.clone(),
                listed_on: ipo.listed_on.clone(),
            }
        })
        .collect();

    let total_pct_change =
        percentage_change(total_current_value, Some(total_invested)).unwrap_or(0.0);

    PortfolioSummary {
        companies,
        total_invested: round2(total_invested),
        total_current_value: round2(total_current_value),
        total_pct_change,
    }
}

pub async fn portfolio_summary(state: &AppState, user_id: &str) -> Result<PortfolioSummary, String> {
    let holdings = ipos_service::list_user_ipos(state, user_id, true).await?;
    if holdings.is_empty() {
        return Ok(summarize(&[], &CmpMap::new()));
    }

    let names: Vec<String> = holdings.iter().map(|h| h.company_name.clone()).collect();
    let delay = Duration::from_millis(state.settings.scrape_delay_ms);
    let quotes = state.screener.quote_many(&names, delay).await;

    // keyed by the name we asked for, not the name screener.in matched
    let cmp_map: CmpMap = names
        .iter()
        .zip(quotes)
        .filter_map(|(name, q)| q.price.map(|p| (name, p)))
        .collect();

    Ok(summarize(&holdings, &cmp_map))
}

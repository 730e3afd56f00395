use std::{sync::Arc, time::Duration};

use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, error, info, instrument, warn};
use tracing_futures::Instrument;

use crate::{
    card::Card,
    page::{Element, Page},
    price_client::{PriceResponse, PriceSource},
};

pub const MARKER_CLASS: &str = "crypto-card";
pub const SYMBOL_ATTR: &str = "data-symbol";
pub const ICON_ATTR: &str = "data-icon";
pub const DEFAULT_ICON: &str = "chip";
pub const REFRESH_INTERVAL: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// No element carried an identifier; nothing was fetched.
    Idle,
    Rendered { cards: usize },
    Failed,
}

/// Polls the price source and rewrites every price card on the page.
pub struct PriceUpdater<S> {
    page: Page,
    source: Arc<S>,
}

impl<S> Clone for PriceUpdater<S> {
    fn clone(&self) -> Self {
        Self {
            page: self.page.clone(),
            source: Arc::clone(&self.source),
        }
    }
}

fn is_card(el: &Element) -> bool {
    el.has_class(MARKER_CLASS)
}

fn icon_label(el: &Element) -> &str {
    el.attribute(ICON_ATTR).unwrap_or(DEFAULT_ICON)
}

impl<S: PriceSource> PriceUpdater<S> {
    pub fn new(page: Page, source: S) -> Self {
        Self {
            page,
            source: Arc::new(source),
        }
    }

    /// Distinct identifiers of the cards currently on the page, first-seen order.
    pub fn identifiers(&self) -> Vec<String> {
        self.page.read(|elements| {
            let mut ids: Vec<String> = Vec::new();
            for id in elements
                .iter()
                .filter(|el| is_card(el))
                .filter_map(|el| el.attribute(SYMBOL_ATTR))
            {
                if !ids.iter().any(|seen| seen == id) {
                    ids.push(id.to_string());
                }
            }
            ids
        })
    }

    #[instrument(name = "price_cycle", skip(self))]
    pub async fn run_cycle(&self) -> CycleOutcome {
        let ids = self.identifiers();
        if ids.is_empty() {
            debug!("no identifiers on page");
            return CycleOutcome::Idle;
        }
        debug!(ids = %ids.join(","), "requesting prices");

        let prices = match self.source.fetch_usd(&ids).await {
            Ok(prices) => prices,
            Err(e) => {
                error!(error = %e, "Error fetching crypto prices");
                return CycleOutcome::Failed;
            }
        };
        if prices.is_empty() {
            warn!("price service returned no quotes");
        } else {
            debug!(quotes = prices.len(), "fetched prices");
        }

        let cards = self.render(&prices);
        info!(cards, "rendered price cards");
        CycleOutcome::Rendered { cards }
    }

    fn render(&self, prices: &PriceResponse) -> usize {
        self.page.update(|elements| {
            let mut cards = 0;
            for el in elements.iter_mut().filter(|el| is_card(el)) {
                let Some(symbol) = el.attribute(SYMBOL_ATTR) else {
                    continue;
                };
                let usd = prices.usd(symbol);
                debug!(symbol, icon = icon_label(el), usd, "render card");

                el.content = Card::new(symbol, usd).render();
                cards += 1;
            }
            cards
        })
    }

    /// Run one cycle now and another every [`REFRESH_INTERVAL`], forever.
    pub async fn run(self) {
        self.run_every(REFRESH_INTERVAL).await
    }

    /// Each tick spawns its own cycle, so a slow request never delays the
    /// next one and cycles may overlap.
    pub async fn run_every(self, period: Duration) {
        let mut tick = interval(period);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut cycle: u64 = 0;

        loop {
            tick.tick().await;
            cycle += 1;

            let updater = self.clone();
            let span = tracing::info_span!("cycle", cycle);
            tokio::spawn(async move { updater.run_cycle().await }.instrument(span));
        }
    }
}

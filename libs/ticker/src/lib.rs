mod card;
mod html;
mod page;
mod price_client;

pub mod updater;

pub use card::{Card, PLACEHOLDER, format_price};
pub use page::{Element, Page};
pub use price_client::{DEFAULT_BASE_API, FetchError, PriceClient, PriceResponse, PriceSource};
pub use updater::{CycleOutcome, PriceUpdater};

//! diverse.direct product listings.

pub mod models;

use async_trait::async_trait;
use pollwatch::error::FetchError;
use pollwatch::notification::{Notification, NotificationKind};
use pollwatch::source::{FeedSource, Snapshot};
use reqwest::Client;

use crate::utils::{non_blank, send_for_json};
pub use models::Product;
use models::ItemsResponse;

impl Product {
    /// `price`, or `price => salePrice` while on sale.
    pub fn price_text(&self) -> String {
        match self.sale_price.as_deref().and_then(non_blank) {
            Some(sale) => format!("{} => {}", self.price, sale),
            None => self.price.clone(),
        }
    }
}

impl Snapshot for Product {
    fn to_notification(&self, entity_id: &str, kind: NotificationKind) -> Notification {
        let mut notification = Notification::new(kind, entity_id, self.title.clone())
            .with_url(self.url.clone())
            .with_field("Price", self.price_text());
        if let Some(circle) = non_blank(&self.circle) {
            notification = notification.with_author(circle);
        }
        if let Some(thumbnail) = non_blank(&self.thumbnail) {
            notification = notification.with_image(thumbnail);
        }
        notification
    }

    fn summary(&self) -> String {
        format!("{} ({})", self.title, self.price_text())
    }
}

/// Newest-first product feed.
pub struct DiverseFeed {
    client: Client,
    base_url: String,
}

impl DiverseFeed {
    pub const BASE_URL: &str = "https://diverse.direct";

    pub fn new(client: Client) -> Self {
        Self {
            client,
            base_url: Self::BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl FeedSource for DiverseFeed {
    type Snapshot = Product;

    fn kind(&self) -> &'static str {
        "diverse.direct"
    }

    async fn fetch_page(&self, page: u32) -> Result<Vec<(String, Product)>, FetchError> {
        let request = self
            .client
            .get(format!("{}/wp-json/dd-front/v1/items", self.base_url))
            .query(&[("page", page)]);
        let response: ItemsResponse = send_for_json(request).await?;
        Ok(response
            .data
            .into_iter()
            .map(|product| (product.id.to_string(), product))
            .collect())
    }
}

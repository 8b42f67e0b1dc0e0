use serde::{Deserialize, Serialize};

/// `GET /wp-json/dd-front/v1/items` response.
#[derive(Debug, Clone, Deserialize)]
pub struct ItemsResponse {
    pub data: Vec<Product>,
}

/// One product listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: i64,
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub thumbnail: String,
    #[serde(default)]
    pub circle: String,
    #[serde(default)]
    pub price: String,
    #[serde(default)]
    pub sale_price: Option<String>,
    #[serde(default)]
    pub is_sale: bool,
    #[serde(default)]
    pub newly: bool,
}

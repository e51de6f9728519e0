use serde::Serialize;

pub const UNKNOWN_TITLE: &str = "Unknown Title";
pub const UNKNOWN_PRICE: &str = "N/A";

/// A product picked from the affiliate API for one announcement.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Product {
    pub product_id: Option<String>,
    pub title: String,
    pub image_url: Option<String>,
    pub detail_url: Option<String>,
    pub sale_price: String,
    pub sale_price_currency: Option<String>,
    pub discount: Option<String>,
}

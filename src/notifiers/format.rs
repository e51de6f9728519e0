//! Turns a [`Product`] into an [`Announcement`].

use html_escape::{encode_double_quoted_attribute, encode_text};

use crate::domain::product::{Product, UNKNOWN_PRICE};
use crate::notifiers::{Announcement, ParseMode};

const MAX_TITLE_CHARS: usize = 200;

fn shorten(title: &str) -> String {
    if title.chars().count() <= MAX_TITLE_CHARS {
        return title.to_string();
    }
    let mut short: String = title.chars().take(MAX_TITLE_CHARS - 1).collect();
    short.push('…');
    short
}

fn price_label(product: &Product) -> String {
    if product.sale_price == UNKNOWN_PRICE {
        return UNKNOWN_PRICE.to_string();
    }
    match product.sale_price_currency.as_deref() {
        Some(currency) if !currency.eq_ignore_ascii_case("USD") => {
            format!("{} {currency}", product.sale_price)
        }
        _ => format!("${}", product.sale_price),
    }
}

/// Legacy Markdown has no escaping inside entities, so markup characters
/// are dropped from the title.
fn markdown_safe(text: &str) -> String {
    text.chars()
        .filter(|c| !matches!(c, '*' | '_' | '`' | '[' | ']'))
        .collect()
}

fn render_html(product: &Product) -> String {
    let mut text = format!(
        "<b>{}</b>\n\n💲Price: {}",
        encode_text(&shorten(&product.title)),
        encode_text(&price_label(product))
    );
    if let Some(discount) = &product.discount {
        text.push_str(&format!("\n🏷 Discount: {}", encode_text(discount)));
    }
    if let Some(url) = &product.detail_url {
        text.push_str(&format!(
            "\n<a href=\"{}\">🔗 Buy Now</a>",
            encode_double_quoted_attribute(url)
        ));
    }
    text
}

fn render_markdown(product: &Product) -> String {
    let mut text = format!(
        "🔥 *{}*\n💲 Price: {}",
        markdown_safe(&shorten(&product.title)),
        markdown_safe(&price_label(product))
    );
    if let Some(discount) = &product.discount {
        text.push_str(&format!("\n🏷 Discount: {}", markdown_safe(discount)));
    }
    if let Some(url) = &product.detail_url {
        let url = url.replace(')', "%29");
        text.push_str(&format!("\n🔗 [View Product]({url})"));
    }
    text
}

pub fn format_announcement(product: &Product, mode: ParseMode) -> Announcement {
    let text = match mode {
        ParseMode::Html => render_html(product),
        ParseMode::Markdown => render_markdown(product),
    };
    Announcement {
        text,
        image_url: product.image_url.clone(),
    }
}

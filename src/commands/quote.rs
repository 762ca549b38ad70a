use anyhow::{Context, Result};
use std::time::Duration;
use tracing::info;

use crate::{cli::QuoteArgs, services::ClientService, AppCtx};
use autoshort_api::client::quote::{BookLevel, QuoteRequest, QuoteSnapshot};

pub async fn handle(args: QuoteArgs, ctx: &AppCtx) -> Result<()> {
    let service = ClientService::new(
        ctx.settings_store.as_ref(),
        &ctx.session_cache,
        ctx.verbose,
    );
    let client = service.connect(Duration::from_secs(args.login_timeout))?;

    let request = QuoteRequest {
        code: args.code,
        class: args.class,
    };
    info!(code = %request.code, class = ?request.class, "Fetching quote ...");

    let quote = client
        .get_quote(&request)
        .await
        .with_context(|| format!("Failed to get the quote of {}", request.code))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&quote)?);
    } else {
        print_book(&quote);
    }
    Ok(())
}

fn print_book(quote: &QuoteSnapshot) {
    info!(
        ticker = quote.short_ticker.as_deref().unwrap_or_default(),
        last = ?quote.last,
        best_bid = ?quote.best_bid().map(|level| level.price),
        best_ask = ?quote.best_ask().map(|level| level.price),
        "Quote"
    );

    println!("{}", format_levels("Bids", &quote.bids));
    println!("{}", format_levels("Asks", &quote.asks));
}

fn format_levels(title: &str, levels: &[BookLevel]) -> String {
    let mut out = format!("{title} ({})", levels.len());
    for level in levels {
        out.push_str(&format!("\n  {:>12.3} x {}", level.price, level.size));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_levels() {
        let levels = vec![
            BookLevel {
                price: 99.5,
                size: 10.0,
            },
            BookLevel {
                price: 100.0,
                size: 2.5,
            },
        ];
        assert_eq!(
            format_levels("Bids", &levels),
            "Bids (2)\n        99.500 x 10\n       100.000 x 2.5"
        );
        assert_eq!(format_levels("Asks", &[]), "Asks (0)");
    }
}

use anyhow::{bail, Result};
use futures_util::{pin_mut, StreamExt};
use tokio::signal::ctrl_c;
use tracing::{info, warn};

use crate::{cli::ListenArgs, services::ClientService, AppCtx};
use autoshort_api::client::stream::{StreamEvent, StreamListener};

pub async fn handle(args: ListenArgs, ctx: &AppCtx) -> Result<()> {
    let service = ClientService::new(
        ctx.settings_store.as_ref(),
        &ctx.session_cache,
        ctx.verbose,
    );
    let Some(endpoint) = service.stream_endpoint(args.endpoint)? else {
        bail!("No websocket endpoint configured, set \"WEBSOCKET\" or pass --endpoint");
    };

    info!(%endpoint, "Listening, press Ctrl-C to stop");
    let listener = StreamListener::new(endpoint);
    let events = listener.events();
    pin_mut!(events);

    loop {
        let event = tokio::select! {
            _ = ctrl_c() => {
                info!("Stopped listening");
                return Ok(());
            }
            event = events.next() => event,
        };

        match event {
            Some(Ok(StreamEvent::Connected)) => info!("Stream connected ✅"),
            Some(Ok(StreamEvent::Frame(payload))) => println!("{payload}"),
            Some(Ok(StreamEvent::Closed(reason))) => {
                warn!(?reason, "Stream closed by server");
            }
            Some(Err(e)) => return Err(e.into()),
            None => return Ok(()),
        }
    }
}

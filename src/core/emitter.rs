//! Writes a stream of menu items as one JSON array, chunk by chunk.
//!
//! The body is `[`, the items separated by commas, then `]`. Each chunk is a
//! complete item, so a client can render dishes as they arrive. If the item
//! stream fails midway the byte stream ends with an error instead of `]`;
//! by then the status line is gone and the connection is simply cut.

use crate::core::schema;
use crate::domain::model::MenuItem;
use crate::utils::error::{MenuError, Result};
use axum::body::Bytes;
use futures::stream::{self, BoxStream, Stream, StreamExt};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmissionMode {
    /// Write each item as soon as it and everything before it is ready.
    #[default]
    Incremental,
    /// Enrich the whole batch first, then write.
    Buffered,
}

enum Phase {
    Open,
    Items { wrote_any: bool },
    Done,
}

pub fn json_array_stream(
    items: BoxStream<'static, Result<MenuItem>>,
) -> impl Stream<Item = Result<Bytes>> + Send + 'static {
    stream::unfold((items, Phase::Open), |(mut items, phase)| async move {
        match phase {
            Phase::Open => Some((
                Ok(Bytes::from_static(b"[")),
                (items, Phase::Items { wrote_any: false }),
            )),
            Phase::Items { wrote_any } => match items.next().await {
                Some(Ok(item)) => match encode_item(&item, wrote_any) {
                    Ok(chunk) => Some((Ok(chunk), (items, Phase::Items { wrote_any: true }))),
                    Err(e) => Some((Err(delivery_failed(e)), (items, Phase::Done))),
                },
                Some(Err(e)) => Some((Err(delivery_failed(e)), (items, Phase::Done))),
                None => Some((Ok(Bytes::from_static(b"]")), (items, Phase::Done))),
            },
            Phase::Done => None,
        }
    })
}

fn encode_item(item: &MenuItem, needs_separator: bool) -> Result<Bytes> {
    schema::validate_item(item).map_err(|violation| MenuError::DeliveryFailed {
        message: format!("item {} failed schema check: {}", item.name, violation),
    })?;

    let mut chunk = Vec::with_capacity(item.menu_image.b64_json.len() + 256);
    if needs_separator {
        chunk.push(b',');
    }
    serde_json::to_writer(&mut chunk, item)?;
    Ok(Bytes::from(chunk))
}

fn delivery_failed(err: MenuError) -> MenuError {
    let err = match err {
        MenuError::DeliveryFailed { .. } => err,
        other => MenuError::DeliveryFailed {
            message: other.to_string(),
        },
    };
    tracing::error!("Menu stream aborted mid-response: {}", err);
    err
}

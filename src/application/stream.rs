//! Datastar SSE responses for the tag-posts component.

use std::convert::Infallible;

use async_stream::stream;
use axum::response::{
    IntoResponse, Response,
    sse::{Event, Sse},
};
use datastar::prelude::{ElementPatchMode, PatchElements};

/// One `datastar-patch-elements` event morphing `selector` into `html`.
pub fn morph_event(html: String, selector: &str) -> Event {
    PatchElements::new(html)
        .selector(selector)
        .mode(ElementPatchMode::Outer)
        .write_as_axum_sse_event()
}

/// Ordered element patches sent as a single finite SSE response.
#[derive(Default)]
pub struct PatchStream {
    events: Vec<Event>,
}

impl PatchStream {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn morph(mut self, html: String, selector: &str) -> Self {
        self.events.push(morph_event(html, selector));
        self
    }

    pub fn into_response(self) -> Response {
        let events = self.events;
        Sse::new(stream! {
            for event in events {
                yield Ok::<_, Infallible>(event);
            }
        })
        .into_response()
    }
}

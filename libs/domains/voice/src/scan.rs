use tracing::trace;

use crate::engine::VectorEngine;
use crate::error::VoiceResult;
use crate::models::{Cursor, ScrollRequest, ScrolledPoint};

/// Lazy, cursor-driven walk over every point of a collection.
///
/// Only payloads are fetched. A page is requested on each call to
/// [`next_page`](Self::next_page), so a scan is abandoned simply by not
/// asking for more. Points written or removed while a scan is running may
/// or may not be seen.
pub struct PayloadScan<'a, E: VectorEngine + ?Sized> {
    engine: &'a E,
    collection: &'a str,
    page_size: u32,
    cursor: Option<Cursor>,
    finished: bool,
    pages_read: usize,
}

impl<'a, E: VectorEngine + ?Sized> PayloadScan<'a, E> {
    pub fn new(engine: &'a E, collection: &'a str, page_size: u32) -> Self {
        Self {
            engine,
            collection,
            page_size,
            cursor: None,
            finished: false,
            pages_read: 0,
        }
    }

    /// Fetch the next page, or `None` once the engine reported no further cursor.
    ///
    /// A failed request leaves the position unchanged, so the same page can
    /// be asked for again.
    pub async fn next_page(&mut self) -> VoiceResult<Option<Vec<ScrolledPoint>>> {
        if self.finished {
            return Ok(None);
        }

        let request = ScrollRequest {
            page_size: self.page_size,
            cursor: self.cursor.clone(),
        };
        let page = self.engine.scroll(self.collection, request).await?;

        self.pages_read += 1;
        self.finished = page.next_cursor.is_none();
        self.cursor = page.next_cursor;
        trace!(
            page = self.pages_read,
            points = page.points.len(),
            finished = self.finished,
            "Scan page"
        );

        Ok(Some(page.points))
    }

    /// Rewind to the start of the collection.
    pub fn restart(&mut self) {
        self.cursor = None;
        self.finished = false;
        self.pages_read = 0;
    }

    pub fn pages_read(&self) -> usize {
        self.pages_read
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Drain the remaining pages, folding the speaker label of every point into `acc`.
    ///
    /// Points without a usable `speaker` label are skipped.
    pub async fn fold_speakers<A, F>(&mut self, init: A, mut f: F) -> VoiceResult<A>
    where
        F: FnMut(A, &str) -> A,
    {
        let mut acc = init;
        while let Some(points) = self.next_page().await? {
            for point in &points {
                match point.speaker() {
                    Some(speaker) => acc = f(acc, speaker),
                    None => trace!(id = %point.id, "Skipping point without speaker label"),
                }
            }
        }
        Ok(acc)
    }
}

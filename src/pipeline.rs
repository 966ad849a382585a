use std::sync::Arc;

use crate::annotate::AnnotatedDocument;
use crate::citation;
use crate::error::Result;
use crate::fetch::DocumentFetcher;
use crate::highlight;
use crate::locate;
use crate::pdf::LayoutSource;
use crate::types::Rgb;

/// Result of a successful highlight run.
#[derive(Debug)]
pub struct HighlightOutcome {
    pub document_name: String,
    pub highlights: usize,
    pub pdf: Vec<u8>,
}

/// Turns a cited chat response into an annotated copy of the cited PDF.
#[derive(Clone)]
pub struct Pipeline {
    fetcher: Arc<dyn DocumentFetcher>,
    layouts: Arc<dyn LayoutSource>,
    color: Rgb,
}

impl Pipeline {
    pub fn new(fetcher: Arc<dyn DocumentFetcher>, layouts: Arc<dyn LayoutSource>, color: Rgb) -> Self {
        Self { fetcher, layouts, color }
    }

    /// Parse, fetch, highlight every cited line that exists, serialize.
    ///
    /// Cited lines that are not on the page are skipped. Any error aborts
    /// the run; nothing partially annotated is returned.
    pub fn highlight(&self, response: &str) -> Result<HighlightOutcome> {
        let citation = citation::parse_citation(response)?;
        tracing::info!(
            document = %citation.document_name,
            lines = citation.references.len(),
            "highlighting citation"
        );

        let bytes = self.fetcher.fetch(&citation.document_name)?;
        let mut document = AnnotatedDocument::load(&bytes)?;
        let mut highlights = 0;

        for page in citation.pages() {
            if !document.contains_page(page) {
                tracing::warn!(
                    page,
                    pages = document.page_count(),
                    "cited page is not in the document"
                );
                continue;
            }

            let layout = self.layouts.page_layout(&bytes, page)?;
            let available = locate::line_count(&layout);
            let (present, missing): (Vec<u32>, Vec<u32>) = citation
                .lines_on(page)
                .partition(|&line| line as usize <= available);
            if !missing.is_empty() {
                tracing::debug!(page, available, skipped = missing.len(), "cited lines past the end of the page");
            }

            let mut added = 0;
            for line in present {
                let boxes = locate::locate(&layout, line as usize);
                if boxes.is_empty() {
                    tracing::debug!(page, line, "no text line found, skipping");
                    continue;
                }
                let annotation = highlight::build(&boxes, self.color)?;
                document.attach(page, &annotation)?;
                added += 1;
            }
            tracing::debug!(page, added, "page done");
            highlights += added;
        }

        let pdf = document.into_bytes()?;
        tracing::info!(document = %citation.document_name, highlights, bytes = pdf.len(), "highlighted document ready");
        Ok(HighlightOutcome { document_name: citation.document_name, highlights, pdf })
    }
}

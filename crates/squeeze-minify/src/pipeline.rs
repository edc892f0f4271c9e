//! Compression pipeline applied to every completed unit

use crate::compressor::{Compressor, Stage};
use crate::css::CssCompressor;
use crate::html::{self, IntertagCompressor, Segment};
use crate::js::JsCompressor;
use squeeze_core::CompressionOptions;
use std::borrow::Cow;
use std::sync::Arc;
use tracing::warn;

/// HTML, CSS and JS compression stages behind a fixed set of toggles
///
/// A stage runs only if it is both enabled in the options and has a
/// compressor plugged in. The pipeline holds no per-call state and can be
/// shared between any number of writers.
#[derive(Debug, Clone)]
pub struct CompressorPipeline {
    options: CompressionOptions,
    html: Option<Arc<dyn Compressor>>,
    css: Option<Arc<dyn Compressor>>,
    js: Option<Arc<dyn Compressor>>,
}

impl Default for CompressorPipeline {
    fn default() -> Self {
        Self::new(CompressionOptions::default())
    }
}

impl CompressorPipeline {
    /// Pipeline with the built-in compressor for every stage
    pub fn new(options: CompressionOptions) -> Self {
        Self {
            options,
            html: Some(Arc::new(IntertagCompressor)),
            css: Some(Arc::new(CssCompressor::default())),
            js: Some(Arc::new(JsCompressor::default())),
        }
    }

    /// Pipeline with no compressors plugged in
    pub fn bare(options: CompressionOptions) -> Self {
        Self {
            options,
            html: None,
            css: None,
            js: None,
        }
    }

    /// Plug `compressor` into `stage`, replacing the current one
    pub fn with_compressor(mut self, stage: Stage, compressor: impl Compressor + 'static) -> Self {
        *self.slot(stage) = Some(Arc::new(compressor));
        self
    }

    /// Remove the compressor from `stage`
    pub fn without(mut self, stage: Stage) -> Self {
        *self.slot(stage) = None;
        self
    }

    fn slot(&mut self, stage: Stage) -> &mut Option<Arc<dyn Compressor>> {
        match stage {
            Stage::Html => &mut self.html,
            Stage::Css => &mut self.css,
            Stage::Js => &mut self.js,
        }
    }

    /// Options the pipeline was built with
    pub fn options(&self) -> CompressionOptions {
        self.options
    }

    /// The compressor that will run for `stage`, if the stage is active
    fn active(&self, stage: Stage) -> Option<&dyn Compressor> {
        let (enabled, compressor) = match stage {
            Stage::Html => (self.options.remove_intertag_spaces, &self.html),
            Stage::Css => (self.options.compress_css, &self.css),
            Stage::Js => (self.options.compress_js, &self.js),
        };
        compressor.as_deref().filter(|_| enabled)
    }

    /// Whether `stage` will modify its fragments
    pub fn is_active(&self, stage: Stage) -> bool {
        self.active(stage).is_some()
    }

    /// Compress one completed unit of output
    ///
    /// Never fails: a fragment its stage cannot handle is emitted unchanged.
    pub fn transform(&self, text: &str) -> String {
        let (html, css, js) = (
            self.active(Stage::Html),
            self.active(Stage::Css),
            self.active(Stage::Js),
        );
        if html.is_none() && css.is_none() && js.is_none() {
            return text.to_string();
        }

        let mut out = String::with_capacity(text.len());
        let mut after_comment = false;
        for segment in html::segments(text) {
            let piece = match segment {
                Segment::Markup(markup) => {
                    let piece = apply(Stage::Html, html, markup);
                    if html.is_some() && after_comment {
                        trim_leading_intertag(piece)
                    } else {
                        piece
                    }
                }
                Segment::Comment(comment) => {
                    if html.is_some() {
                        trim_trailing_intertag(&mut out);
                    }
                    Cow::Borrowed(comment)
                }
                Segment::Style(style) => apply(Stage::Css, css, style),
                Segment::Script {
                    content,
                    javascript: true,
                } => apply(Stage::Js, js, content),
                Segment::Script { content, .. } => Cow::Borrowed(content),
                Segment::Protected(raw) => Cow::Borrowed(raw),
            };
            after_comment = matches!(segment, Segment::Comment(c) if c.ends_with("-->"));
            out.push_str(&piece);
        }
        out
    }
}

/// Drop whitespace between a tag at the end of `out` and a following comment
fn trim_trailing_intertag(out: &mut String) {
    let kept = out.trim_end_matches(html::is_intertag_space);
    if kept.ends_with('>') {
        out.truncate(kept.len());
    }
}

/// Drop whitespace between a preceding comment and a tag opening `piece`
fn trim_leading_intertag(piece: Cow<'_, str>) -> Cow<'_, str> {
    let rest = piece.trim_start_matches(html::is_intertag_space);
    if !rest.starts_with('<') || rest.len() == piece.len() {
        return piece;
    }
    let skip = piece.len() - rest.len();
    match piece {
        Cow::Borrowed(b) => Cow::Borrowed(&b[skip..]),
        Cow::Owned(mut o) => {
            o.drain(..skip);
            Cow::Owned(o)
        }
    }
}

fn apply<'a>(stage: Stage, compressor: Option<&dyn Compressor>, fragment: &'a str) -> Cow<'a, str> {
    let Some(compressor) = compressor else {
        return Cow::Borrowed(fragment);
    };
    match compressor.compress(fragment) {
        Ok(compressed) => Cow::Owned(compressed),
        Err(e) => {
            warn!(
                stage = %stage,
                error = %e,
                bytes = fragment.len(),
                "Compression failed, passing fragment through unchanged"
            );
            Cow::Borrowed(fragment)
        }
    }
}

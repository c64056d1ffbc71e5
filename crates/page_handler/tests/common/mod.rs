#![allow(dead_code, reason = "Each integration test uses a different subset of helpers")]

use anyhow::{Result, bail};
use dom::{LayoutRect, NodeKey, StaticDocument, Viewport};
use hit_region::Coordinate;
use page_handler::{
    EngineConfig, HighlightColor, HitmapSettings, Overlay, OverlayFrame, PageContext, PageNotice,
    RecordingOverlay,
};
use tokio::sync::mpsc::{self, UnboundedReceiver};

pub type TestPage = PageContext<StaticDocument, RecordingOverlay>;

pub struct Fixture {
    pub page: TestPage,
    pub notices: UnboundedReceiver<PageNotice>,
    pub body: NodeKey,
    pub button: NodeKey,
    pub badge: NodeKey,
}

pub fn init_logging() {
    let _log_init: Result<(), _> = env_logger::builder()
        .filter_level(log::LevelFilter::Debug)
        .is_test(true)
        .try_init();
}

/// 100x100 page: a `#go` button covering `[0,60)²` and a plain badge painted
/// over its `[50,60)²` corner.
pub fn document() -> Result<(StaticDocument, NodeKey, NodeKey, NodeKey)> {
    let mut doc = StaticDocument::new(Viewport::new(100, 100));
    let body = doc.append_element(NodeKey::ROOT, "body", &[])?;
    doc.set_layout(body, LayoutRect::new(0, 0, 100, 100))?;
    let button = doc.append_element(body, "button", &[("id", "go"), ("class", "cta")])?;
    doc.set_layout(button, LayoutRect::new(0, 0, 60, 60))?;
    doc.append_text(button, "Go")?;
    let badge = doc.append_element(body, "div", &[("id", "badge")])?;
    doc.set_layout(badge, LayoutRect::new(50, 50, 10, 10))?;
    Ok((doc, body, button, badge))
}

pub fn fixture_with(settings: HitmapSettings, config: EngineConfig) -> Result<Fixture> {
    init_logging();
    let (doc, body, button, badge) = document()?;
    let (notice_tx, notices) = mpsc::unbounded_channel();
    let page = PageContext::new(doc, RecordingOverlay::new(), settings, config, notice_tx);
    Ok(Fixture {
        page,
        notices,
        body,
        button,
        badge,
    })
}

pub fn fixture() -> Result<Fixture> {
    fixture_with(HitmapSettings::default(), EngineConfig::new())
}

/// Overlay whose draws start failing after `working_draws` successes.
#[derive(Debug, Default)]
pub struct FlakyOverlay {
    inner: RecordingOverlay,
    working_draws: usize,
    failed_draws: usize,
}

impl FlakyOverlay {
    pub fn new(working_draws: usize) -> Self {
        Self {
            working_draws,
            ..Self::default()
        }
    }

    pub fn frame(&self) -> Option<&OverlayFrame> {
        self.inner.frame()
    }

    pub fn failed_draws(&self) -> usize {
        self.failed_draws
    }
}

impl Overlay for FlakyOverlay {
    fn draw(&mut self, coords: &[Coordinate], color: &HighlightColor, opacity: f64) -> Result<()> {
        if self.inner.draw_count() >= self.working_draws {
            self.failed_draws += 1;
            bail!("surface lost");
        }
        self.inner.draw(coords, color, opacity)
    }

    fn clear(&mut self) {
        self.inner.clear();
    }
}

/// The standard page drawn through a `FlakyOverlay`.
pub fn flaky_page(
    working_draws: usize,
) -> Result<(PageContext<StaticDocument, FlakyOverlay>, UnboundedReceiver<PageNotice>)> {
    init_logging();
    let (doc, ..) = document()?;
    let (notice_tx, notices) = mpsc::unbounded_channel();
    let page = PageContext::new(
        doc,
        FlakyOverlay::new(working_draws),
        HitmapSettings::default(),
        EngineConfig::new(),
        notice_tx,
    );
    Ok((page, notices))
}

/// Run the in-flight pass (if any) to completion.
pub fn settle<O: Overlay>(page: &mut PageContext<StaticDocument, O>) {
    while page.run_chunk() {}
}

/// Notices queued so far.
pub fn drain(notices: &mut UnboundedReceiver<PageNotice>) -> Vec<PageNotice> {
    let mut out = Vec::new();
    while let Ok(notice) = notices.try_recv() {
        out.push(notice);
    }
    out
}

/// Wait for the first notice matching `wanted`, discarding the others.
pub async fn wait_for(
    notices: &mut UnboundedReceiver<PageNotice>,
    wanted: impl Fn(&PageNotice) -> bool,
) -> Option<PageNotice> {
    while let Some(notice) = notices.recv().await {
        if wanted(&notice) {
            return Some(notice);
        }
    }
    None
}

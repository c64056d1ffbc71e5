//! `hitmap`: sample a JSON page scene and print the hit region of one element.

use crate::args::{CliOptions, USAGE, parse_args};
use crate::render::render_grid;
use anyhow::{Context as _, Result, anyhow, bail};
use dom::{HostDocument as _, ObservedDocument as _, Scene, StaticDocument, Viewport};
use env_logger::{Builder, Env};
use hit_region::SamplingStats;
use log::info;
use page_handler::telemetry::perf_counters_json;
use page_handler::{
    ConfigStore as _, EngineConfig, HitmapSettings, JsonFileStore, PageContext, PageNotice,
    RecordingOverlay,
};
use std::env;
use std::io::{Write, stderr, stdout};
use tokio::fs;
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tokio::task;

mod args;
mod render;

async fn load_settings(options: &CliOptions) -> Result<HitmapSettings> {
    let mut settings = match &options.settings {
        Some(path) => JsonFileStore::open(path).await?.load().await?,
        None => HitmapSettings::default(),
    };
    if let Some(resolution) = options.resolution {
        settings.sampling_resolution = resolution;
    }
    Ok(settings.validated())
}

/// Outcome of the pass, taken from the page's notices.
fn pass_outcome(notices: &mut UnboundedReceiver<PageNotice>) -> Result<SamplingStats> {
    let mut outcome = Err(anyhow!("no sampling pass ran"));
    while let Ok(notice) = notices.try_recv() {
        match notice {
            PageNotice::SelectionFailed { reason, .. } => bail!(reason),
            PageNotice::PassCompleted(stats) => outcome = Ok(stats),
            PageNotice::PassAborted {
                reason,
                suggested_resolution: Some(suggested),
            } => bail!("sampling {reason}; try --resolution {suggested}"),
            PageNotice::PassAborted { reason, .. } => bail!("sampling {reason}"),
            PageNotice::PassStarted { .. }
            | PageNotice::Progress(_)
            | PageNotice::Drawn { .. }
            | PageNotice::Cleared => {}
        }
    }
    outcome
}

fn write_report(
    out: &mut impl Write,
    options: &CliOptions,
    page: &PageContext<StaticDocument, RecordingOverlay>,
    stats: &SamplingStats,
) -> Result<()> {
    let viewport = page.document().viewport();
    let region = page
        .visualized()
        .map(|element| page.hit_region_of(element))
        .unwrap_or_default();
    writeln!(
        out,
        "{}: {} clickable points at {}px resolution",
        options.identifier,
        region.len(),
        stats.resolution
    )?;
    writeln!(
        out,
        "sampled {}/{} points in {:?}: {} hits, {} misses, {} empty, {} failed; {} elements",
        stats.sampled,
        stats.total,
        stats.duration,
        stats.hits,
        stats.misses,
        stats.empty,
        stats.failures,
        stats.elements
    )?;
    if let Some(frame) = page.overlay().frame() {
        writeln!(out, "highlight #{} at opacity {}", frame.color, frame.opacity)?;
    }
    write!(out, "{}", render_grid(&region, viewport, stats.resolution))?;
    if options.list_coordinates {
        for coord in &region {
            writeln!(out, "{coord}")?;
        }
    }
    Ok(())
}

async fn run(options: &CliOptions) -> Result<()> {
    let source = fs::read_to_string(&options.scene)
        .await
        .with_context(|| format!("failed to read {}", options.scene.display()))?;
    let mut doc = Scene::from_json(&source)?.build()?;
    let scene_viewport = doc.viewport();
    doc.set_viewport(Viewport::new(
        options.width.unwrap_or(scene_viewport.width),
        options.height.unwrap_or(scene_viewport.height),
    ));

    let settings = load_settings(options).await?;
    let config = EngineConfig::from_env();
    let (notice_tx, mut notices) = mpsc::unbounded_channel();
    let mut page = PageContext::new(doc, RecordingOverlay::new(), settings, config, notice_tx);

    page.select(&options.identifier);
    while page.run_chunk() {
        task::yield_now().await;
    }
    let stats = pass_outcome(&mut notices)?;
    info!("{}", perf_counters_json(page.counters()));
    write_report(&mut stdout().lock(), options, &page, &stats)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let _log_init: Result<(), _> = Builder::from_env(Env::default().filter_or("RUST_LOG", "warn"))
        .try_init();
    let options = match parse_args(env::args().skip(1)) {
        Ok(options) => options,
        Err(err) => {
            drop(writeln!(stderr(), "{USAGE}"));
            return Err(err);
        }
    };
    run(&options).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context as _;
    use page_handler::ElementIdentifier;

    const DEMO: &str = include_str!("../scenes/demo.json");

    fn options(identifier: &str) -> CliOptions {
        CliOptions {
            scene: "scenes/demo.json".into(),
            identifier: ElementIdentifier::parse(identifier),
            resolution: Some(50),
            width: None,
            height: None,
            settings: None,
            list_coordinates: true,
        }
    }

    fn sample(identifier: &str) -> Result<(String, Result<SamplingStats>)> {
        let doc = Scene::from_json(DEMO)?.build()?;
        let settings = HitmapSettings {
            sampling_resolution: 50,
            ..HitmapSettings::default()
        };
        let (notice_tx, mut notices) = mpsc::unbounded_channel();
        let mut page = PageContext::new(
            doc,
            RecordingOverlay::new(),
            settings,
            EngineConfig::new(),
            notice_tx,
        );
        let opts = options(identifier);
        page.select(&opts.identifier);
        while page.run_chunk() {}
        let outcome = pass_outcome(&mut notices);
        let mut out = Vec::new();
        if let Ok(stats) = &outcome {
            write_report(&mut out, &opts, &page, stats)?;
        }
        Ok((String::from_utf8(out)?, outcome))
    }

    #[test]
    fn report_shows_the_uncovered_corner() -> Result<()> {
        let (report, outcome) = sample("go")?;
        assert_eq!(outcome?.hits, 3);
        assert!(report.starts_with("id \"go\": 3 clickable points at 50px resolution\n"));
        assert!(report.contains("\n##\n#.\n0,0\n50,0\n0,50\n"));
        Ok(())
    }

    #[test]
    fn unknown_elements_fail() -> Result<()> {
        let (report, outcome) = sample("#nowhere")?;
        assert!(report.is_empty());
        let err = outcome.err().context("expected a selection failure")?;
        assert!(err.to_string().contains("no element matches"));
        Ok(())
    }
}

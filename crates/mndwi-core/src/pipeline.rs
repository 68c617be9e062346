//! Pipeline orchestrator: upload → AOI → composites → index → classes → map.

use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::aoi::{Aoi, Session};
use crate::catalog::Catalog;
use crate::classify::{ClassHistogram, ClassScheme, GapPolicy};
use crate::composite::Compositor;
use crate::config::{default_anchor_date, CloudThreshold, ViewerConfig};
use crate::error::Result;
use crate::eval::Evaluator;
use crate::expr::ImageExpr;
use crate::geometry::ParsedUpload;
use crate::index::IndexEngine;
use crate::layers::{build_layers, DateProducts, Layer, VisBundle};
use crate::map::{render, MapDocument, MapView};
use crate::palette::AccessibilityMode;
use crate::window::{DateWindow, DATE_FORMAT};

// ── Request ───────────────────────────────────────────────────────────────────

/// User inputs of one map refresh.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapRequest {
    pub cloud_threshold: CloudThreshold,
    pub initial_date: NaiveDate,
    pub updated_date: NaiveDate,
    pub mode: AccessibilityMode,
    pub gap_policy: GapPolicy,
}

impl MapRequest {
    /// Both dates default to today minus the ingestion delay.
    pub fn defaults(config: &ViewerConfig) -> Self {
        Self::anchored(config, default_anchor_date())
    }

    pub fn anchored(config: &ViewerConfig, anchor: NaiveDate) -> Self {
        Self {
            cloud_threshold: config.cloud_threshold,
            initial_date: anchor,
            updated_date: anchor,
            mode: AccessibilityMode::default(),
            gap_policy: config.gap_policy,
        }
    }
}

// ── Plan ──────────────────────────────────────────────────────────────────────

/// Everything needed to render or evaluate a map, still deferred.
#[derive(Debug, Clone)]
pub struct MapPlan {
    pub aoi: Arc<Aoi>,
    pub initial: DateProducts,
    pub updated: DateProducts,
    pub layers: Vec<Layer>,
    pub view: MapView,
    pub mode: AccessibilityMode,
    pub scheme: ClassScheme,
}

/// Class counts of one anchor date.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DateStats {
    #[serde(serialize_with = "serialize_date")]
    pub anchor: NaiveDate,
    pub scenes_window: DateWindow,
    pub valid_pixels: usize,
    pub histogram: ClassHistogram,
}

fn serialize_date<S: serde::Serializer>(d: &NaiveDate, s: S) -> std::result::Result<S::Ok, S::Error> {
    s.collect_str(&d.format(DATE_FORMAT))
}

// ── Orchestrator ──────────────────────────────────────────────────────────────

pub struct MndwiPipeline {
    config: ViewerConfig,
    compositor: Compositor,
    index: IndexEngine,
}

impl MndwiPipeline {
    pub fn new(config: ViewerConfig) -> Self {
        let compositor = Compositor::from_config(&config);
        let index = IndexEngine::new(&config.bands);
        Self { config, compositor, index }
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    /// Composite, masked index and classes for one anchor date.
    pub fn products(
        &self,
        anchor: NaiveDate,
        cloud: CloudThreshold,
        aoi: &Arc<Aoi>,
        scheme: &ClassScheme,
    ) -> DateProducts {
        let window = DateWindow::new(anchor, self.config.lookback_days);
        let composite = self.compositor.describe(cloud, window, aoi);
        let index = self.index.describe(&composite).masked;
        let classified = ImageExpr::classify(&index, scheme.clone());
        DateProducts { anchor, composite, index, classified }
    }

    /// Build the deferred map for `request` over `upload`.
    ///
    /// The session remembers the centroid of the latest upload that had one,
    /// so an empty upload keeps the previous view centre.
    pub fn plan(&self, request: &MapRequest, upload: ParsedUpload, session: &mut Session) -> MapPlan {
        session.absorb(&upload);
        let aoi = Arc::new(Aoi::resolve(upload, self.config.fallback_point));
        let scheme = ClassScheme::mndwi(request.gap_policy);

        let initial = self.products(request.initial_date, request.cloud_threshold, &aoi, &scheme);
        let updated = self.products(request.updated_date, request.cloud_threshold, &aoi, &scheme);

        let vis = VisBundle::new(&self.config.bands.true_color, &request.mode.palette());
        let layers = build_layers(&initial, &updated, &vis);
        let view = MapView::from_centroid(session.last_centroid(), &self.config);

        info!(
            initial = %request.initial_date,
            updated = %request.updated_date,
            cloud = %request.cloud_threshold,
            mode = %request.mode,
            fallback = aoi.is_fallback(),
            "map planned"
        );

        MapPlan { aoi, initial, updated, layers, view, mode: request.mode, scheme }
    }

    /// Register every layer of `plan` with the catalog.
    pub fn render<C: Catalog + ?Sized>(&self, plan: &MapPlan, catalog: &C) -> Result<MapDocument> {
        Ok(render(catalog, &plan.layers, plan.view, plan.mode)?)
    }

    /// Evaluate the masked index of each distinct anchor date and count
    /// pixels per class.
    pub fn stats<C: Catalog + ?Sized>(&self, plan: &MapPlan, catalog: &C) -> Result<Vec<DateStats>> {
        let evaluator = Evaluator::new(catalog);
        let mut dates = vec![&plan.initial];
        if plan.updated.anchor != plan.initial.anchor {
            dates.push(&plan.updated);
        }

        let mut out = Vec::with_capacity(dates.len());
        for products in dates {
            let image = evaluator.evaluate(&products.index)?;
            let histogram = image
                .first_band()
                .map(|(_, band)| ClassHistogram::tally(band, &plan.scheme))
                .unwrap_or_default();
            out.push(DateStats {
                anchor: products.anchor,
                scenes_window: products.composite.root_query().window,
                valid_pixels: image.valid_pixels(),
                histogram,
            });
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::parse_uploads;

    const SQUARE: &str = r#"{"type":"FeatureCollection","features":[{"type":"Feature","geometry":
        {"type":"Polygon","coordinates":[[[106.0,-7.0],[107.0,-7.0],[107.0,-6.0],[106.0,-6.0],[106.0,-7.0]]]}}]}"#;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn plan_with_equal_dates_has_three_layers() {
        let pipeline = MndwiPipeline::new(ViewerConfig::default());
        let request = MapRequest::anchored(pipeline.config(), date(2024, 1, 10));
        let mut session = Session::new();
        let plan = pipeline.plan(&request, ParsedUpload::default(), &mut session);
        assert_eq!(plan.layers.len(), 3);
        assert!(plan.aoi.is_fallback());
        assert_eq!(plan.view.zoom, 4);
    }

    #[test]
    fn plan_windows_end_on_anchor() {
        let pipeline = MndwiPipeline::new(ViewerConfig::default());
        let mut request = MapRequest::anchored(pipeline.config(), date(2024, 1, 15));
        request.initial_date = date(2024, 1, 1);
        let plan = pipeline.plan(&request, ParsedUpload::default(), &mut Session::new());
        let w = plan.initial.composite.root_query().window;
        assert_eq!((w.start, w.end), (date(2023, 12, 25), date(2024, 1, 1)));
        assert_eq!(plan.layers.len(), 6);
    }

    #[test]
    fn view_follows_last_upload_centroid() {
        let pipeline = MndwiPipeline::new(ViewerConfig::default());
        let request = MapRequest::anchored(pipeline.config(), date(2024, 1, 10));
        let mut session = Session::new();

        let plan = pipeline.plan(&request, parse_uploads([SQUARE]).unwrap(), &mut session);
        assert_eq!(plan.view.zoom, 12);
        assert!((plan.view.center.lat + 6.5).abs() < 1e-9);
        assert!((plan.view.center.lon - 106.5).abs() < 1e-9);

        // A later empty upload falls back for the AOI but keeps the view.
        let plan = pipeline.plan(&request, ParsedUpload::default(), &mut session);
        assert!(plan.aoi.is_fallback());
        assert_eq!(plan.view.zoom, 12);
    }

    #[test]
    fn request_carries_config_defaults() {
        let config = ViewerConfig { gap_policy: GapPolicy::NoDataClass, ..Default::default() };
        let r = MapRequest::anchored(&config, date(2024, 5, 1));
        assert_eq!(r.cloud_threshold.get(), 85);
        assert_eq!(r.gap_policy, GapPolicy::NoDataClass);
        assert_eq!(r.mode, AccessibilityMode::Normal);
    }
}

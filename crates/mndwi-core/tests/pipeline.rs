//! End-to-end runs of the pipeline against the in-memory catalog.
use chrono::NaiveDate;

use mndwi_core::aoi::Session;
use mndwi_core::catalog::memory::SyntheticSpec;
use mndwi_core::catalog::Catalog;
use mndwi_core::classify::GapPolicy;
use mndwi_core::coords::LatLon;
use mndwi_core::error::{CatalogError, Error, GeometryError};
use mndwi_core::eval::Evaluator;
use mndwi_core::geometry::ParsedUpload;
use mndwi_core::layers::LayerKind;
use mndwi_core::pipeline::MapPlan;
use mndwi_core::raster::Grid;
use mndwi_core::{
    parse_uploads, AccessibilityMode, CloudThreshold, InMemoryCatalog, MapRequest, MndwiPipeline,
    ViewerConfig,
};

const SQUARE: &str = r#"{
    "type": "FeatureCollection",
    "features": [{
        "type": "Feature",
        "properties": {"name": "lake district"},
        "geometry": {
            "type": "Polygon",
            "coordinates": [[[27.5, 35.5], [28.5, 35.5], [28.5, 36.5], [27.5, 36.5], [27.5, 35.5]]]
        }
    }]
}"#;

/// Allowed distance between the map centre and the polygon centroid.
const CENTROID_TOLERANCE_M: f64 = 1.0;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn request(pipeline: &MndwiPipeline, initial: NaiveDate, updated: NaiveDate) -> MapRequest {
    let mut r = MapRequest::anchored(pipeline.config(), updated);
    r.initial_date = initial;
    // Synthetic cloud cover is drawn from [0, 100), so 100 keeps every scene.
    r.cloud_threshold = CloudThreshold::new(100).unwrap();
    r
}

fn catalog_for(plan: &MapPlan, seed: u64) -> InMemoryCatalog {
    let grid = Grid::new(16, 16, 27.5, 28.5, 35.5, 36.5);
    let windows = vec![
        plan.initial.composite.root_query().window,
        plan.updated.composite.root_query().window,
    ];
    InMemoryCatalog::synthetic(&SyntheticSpec::new(seed, grid, windows))
}

#[test]
fn same_dates_render_three_overlays() {
    let pipeline = MndwiPipeline::new(ViewerConfig::default());
    let req = request(&pipeline, date(2024, 1, 10), date(2024, 1, 10));
    let plan = pipeline.plan(&req, parse_uploads([SQUARE]).unwrap(), &mut Session::new());
    let catalog = catalog_for(&plan, 1);

    let doc = pipeline.render(&plan, &catalog).unwrap();
    let names: Vec<&str> = doc.overlays.iter().map(|o| o.name.as_str()).collect();
    assert_eq!(names, ["Satellite Imagery", "Raw mndwi", "Reclassified mndwi"]);
    assert!(doc.layer_control);
    assert_eq!(doc.base_layers.len(), 2);
    assert!(doc.overlays.iter().all(|o| o.tile_url.starts_with("memory://COPERNICUS/S2_SR/maps/")));
    assert!(doc.overlays.iter().all(|o| !o.center_tile_url.contains('{')));
}

#[test]
fn different_dates_render_six_dated_overlays() {
    let pipeline = MndwiPipeline::new(ViewerConfig::default());
    let req = request(&pipeline, date(2024, 1, 1), date(2024, 1, 15));
    let plan = pipeline.plan(&req, parse_uploads([SQUARE]).unwrap(), &mut Session::new());
    let catalog = catalog_for(&plan, 2);

    let doc = pipeline.render(&plan, &catalog).unwrap();
    assert_eq!(doc.overlays.len(), 6);
    assert_eq!(doc.overlays[0].name, "Initial Satellite Imagery: 2024-01-01");
    assert_eq!(doc.overlays[5].name, "Updated Reclassified mndwi: 2024-01-15");
    assert_eq!(doc.overlays[3].kind, LayerKind::RawIndex);
    // Distinct dates give distinct map ids.
    assert_ne!(doc.overlays[0].map_id, doc.overlays[1].map_id);
}

#[test]
fn stats_count_water_and_land_classes() {
    let pipeline = MndwiPipeline::new(ViewerConfig::default());
    let req = request(&pipeline, date(2024, 1, 10), date(2024, 1, 10));
    let plan = pipeline.plan(&req, parse_uploads([SQUARE]).unwrap(), &mut Session::new());
    let catalog = catalog_for(&plan, 3);

    let stats = pipeline.stats(&plan, &catalog).unwrap();
    assert_eq!(stats.len(), 1);
    let h = &stats[0].histogram;
    assert_eq!(h.total(), 256);
    // The central lake has a negative index and is masked.
    assert!(h.masked > 0);
    assert_eq!(h.classes[1], 0);
    assert!(h.classes[2] > 0);
    assert!(h.classes[5] > 0);
    assert_eq!(stats[0].valid_pixels, 256 - h.masked);
}

#[test]
fn no_data_class_absorbs_gaps() {
    let config = ViewerConfig { gap_policy: GapPolicy::NoDataClass, ..Default::default() };
    let pipeline = MndwiPipeline::new(config);
    let req = request(&pipeline, date(2024, 1, 10), date(2024, 1, 10));
    let plan = pipeline.plan(&req, parse_uploads([SQUARE]).unwrap(), &mut Session::new());
    let catalog = catalog_for(&plan, 3);

    let h = &pipeline.stats(&plan, &catalog).unwrap()[0].histogram;
    assert_eq!(h.unclassified, 0);
}

#[test]
fn empty_window_yields_empty_images() {
    let pipeline = MndwiPipeline::new(ViewerConfig::default());
    let january = request(&pipeline, date(2024, 1, 10), date(2024, 1, 10));
    let plan = pipeline.plan(&january, parse_uploads([SQUARE]).unwrap(), &mut Session::new());
    let catalog = catalog_for(&plan, 4);

    let june = request(&pipeline, date(2024, 6, 10), date(2024, 6, 10));
    let plan = pipeline.plan(&june, parse_uploads([SQUARE]).unwrap(), &mut Session::new());

    let image = Evaluator::new(&catalog).evaluate(&plan.updated.classified).unwrap();
    assert!(image.is_empty());
    let stats = pipeline.stats(&plan, &catalog).unwrap();
    assert_eq!(stats[0].valid_pixels, 0);
    assert_eq!(stats[0].histogram.total(), 0);

    // Rendering still succeeds: the empty image is a valid layer.
    assert_eq!(pipeline.render(&plan, &catalog).unwrap().overlays.len(), 3);
}

#[test]
fn fallback_point_masks_every_pixel() {
    let pipeline = MndwiPipeline::new(ViewerConfig::default());
    let req = request(&pipeline, date(2024, 1, 10), date(2024, 1, 10));
    let plan = pipeline.plan(&req, ParsedUpload::default(), &mut Session::new());
    assert!(plan.aoi.is_fallback());
    let catalog = catalog_for(&plan, 5);

    let scenes = catalog.query(plan.updated.composite.root_query()).unwrap();
    assert!(!scenes.is_empty());
    let stats = pipeline.stats(&plan, &catalog).unwrap();
    assert_eq!(stats[0].valid_pixels, 0);
}

#[test]
fn catalog_outage_aborts_render() {
    let pipeline = MndwiPipeline::new(ViewerConfig::default());
    let req = request(&pipeline, date(2024, 1, 10), date(2024, 1, 10));
    let plan = pipeline.plan(&req, parse_uploads([SQUARE]).unwrap(), &mut Session::new());
    let catalog = catalog_for(&plan, 6).with_outage("authentication expired");

    let err = pipeline.render(&plan, &catalog).unwrap_err();
    assert!(matches!(err, Error::Catalog(CatalogError::Unavailable(_))));
    assert!(pipeline.stats(&plan, &catalog).is_err());
}

#[test]
fn line_string_upload_is_rejected() {
    let doc = r#"{"type":"FeatureCollection","features":[{"type":"Feature",
        "geometry":{"type":"LineString","coordinates":[[27.0,36.0],[28.0,36.5]]}}]}"#;
    let err = parse_uploads([doc]).unwrap_err();
    assert!(matches!(err, GeometryError::UnsupportedType { ref kind, .. } if kind == "LineString"));
}

#[test]
fn view_centres_on_upload_centroid() {
    let pipeline = MndwiPipeline::new(ViewerConfig::default());
    let req = request(&pipeline, date(2024, 1, 10), date(2024, 1, 10));
    let mut session = Session::new();

    let plan = pipeline.plan(&req, parse_uploads([SQUARE]).unwrap(), &mut session);
    let catalog = catalog_for(&plan, 7);
    let doc = pipeline.render(&plan, &catalog).unwrap();

    assert_eq!(doc.view.zoom, 12);
    assert!(doc.view.center.distance_m(LatLon::new(36.0, 28.0)) < CENTROID_TOLERANCE_M);
}

#[test]
fn palette_mode_reaches_vis_and_legend() {
    let pipeline = MndwiPipeline::new(ViewerConfig::default());
    let mut req = request(&pipeline, date(2024, 1, 10), date(2024, 1, 10));
    req.mode = AccessibilityMode::BanjirTinggi;
    let plan = pipeline.plan(&req, parse_uploads([SQUARE]).unwrap(), &mut Session::new());
    let catalog = catalog_for(&plan, 8);

    let doc = pipeline.render(&plan, &catalog).unwrap();
    let raw = &doc.overlays[1];
    assert_eq!(raw.vis.palette.as_ref().unwrap()[0], "#407de0");
    assert_eq!(doc.legends.classes[4].color, "#3d50ca");

    let json = serde_json::to_value(&doc).unwrap();
    assert_eq!(json["legends"]["mode"], "Banjir Tinggi");
}

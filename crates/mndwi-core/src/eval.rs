//! Materialization of deferred image expressions against a catalog.
use tracing::{debug, warn};

use crate::catalog::Catalog;
use crate::classify::classify_image;
use crate::composite::reduce_median;
use crate::error::Result;
use crate::expr::ImageExpr;
use crate::image::Image;
use crate::index::{mask_below, normalized_difference};

/// Walks an expression tree, querying the catalog at the leaves.
pub struct Evaluator<'a, C: Catalog + ?Sized> {
    catalog: &'a C,
}

impl<'a, C: Catalog + ?Sized> Evaluator<'a, C> {
    pub fn new(catalog: &'a C) -> Self {
        Self { catalog }
    }

    pub fn evaluate(&self, expr: &ImageExpr) -> Result<Image> {
        debug!(depth = expr.depth(), expr = %expr, "evaluating expression");
        self.eval_node(expr)
    }

    fn eval_node(&self, expr: &ImageExpr) -> Result<Image> {
        match expr {
            ImageExpr::Composite(c) => {
                let scenes = self.catalog.query(&c.query)?;
                debug!(query = %c.query, scenes = scenes.len(), "collection filtered");
                if scenes.is_empty() {
                    warn!(query = %c.query, "no scenes matched; composite is empty");
                }
                Ok(reduce_median(&scenes, &c.query.aoi.clip_mask(), c.scale)?)
            }
            ImageExpr::NormalizedDifference { source, positive, negative } => {
                let img = self.eval_node(source)?;
                Ok(normalized_difference(&img, positive, negative)?)
            }
            ImageExpr::MaskBelow { source, threshold } => {
                let img = self.eval_node(source)?;
                Ok(mask_below(&img, *threshold))
            }
            ImageExpr::Classify { source, scheme } => {
                let img = self.eval_node(source)?;
                Ok(classify_image(&img, scheme))
            }
        }
    }
}

//! Deferred image expressions.
//!
//! Building an expression touches nothing: it only records how an image is
//! derived. Pixels exist once an [`Evaluator`](crate::eval::Evaluator) (or the
//! catalog's renderer) materializes the expression, and only then does an
//! empty collection show up as an empty image.
use std::fmt;
use std::sync::Arc;

use crate::catalog::CollectionQuery;
use crate::classify::ClassScheme;

/// Filtered collection, clipped to the query AOI, divided by `scale`, and
/// reduced by per-band median.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionExpr {
    pub query: CollectionQuery,
    pub scale: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ImageExpr {
    Composite(CollectionExpr),
    /// `(positive - negative) / (positive + negative)` as band `nd`.
    NormalizedDifference {
        source: Arc<ImageExpr>,
        positive: String,
        negative: String,
    },
    /// Mask every pixel below `threshold`.
    MaskBelow { source: Arc<ImageExpr>, threshold: f32 },
    Classify { source: Arc<ImageExpr>, scheme: ClassScheme },
}

impl ImageExpr {
    pub fn composite(query: CollectionQuery, scale: f32) -> Arc<Self> {
        Arc::new(ImageExpr::Composite(CollectionExpr { query, scale }))
    }

    pub fn normalized_difference(source: &Arc<Self>, positive: &str, negative: &str) -> Arc<Self> {
        Arc::new(ImageExpr::NormalizedDifference {
            source: Arc::clone(source),
            positive: positive.to_string(),
            negative: negative.to_string(),
        })
    }

    pub fn mask_below(source: &Arc<Self>, threshold: f32) -> Arc<Self> {
        Arc::new(ImageExpr::MaskBelow { source: Arc::clone(source), threshold })
    }

    pub fn classify(source: &Arc<Self>, scheme: ClassScheme) -> Arc<Self> {
        Arc::new(ImageExpr::Classify { source: Arc::clone(source), scheme })
    }

    /// The expression this one is derived from, if any.
    pub fn source(&self) -> Option<&Arc<ImageExpr>> {
        match self {
            ImageExpr::Composite(_) => None,
            ImageExpr::NormalizedDifference { source, .. }
            | ImageExpr::MaskBelow { source, .. }
            | ImageExpr::Classify { source, .. } => Some(source),
        }
    }

    /// The collection query at the root of the chain.
    pub fn root_query(&self) -> &CollectionQuery {
        match self {
            ImageExpr::Composite(c) => &c.query,
            ImageExpr::NormalizedDifference { source, .. }
            | ImageExpr::MaskBelow { source, .. }
            | ImageExpr::Classify { source, .. } => source.root_query(),
        }
    }

    /// Number of steps from the collection to this expression, inclusive.
    pub fn depth(&self) -> usize {
        1 + self.source().map_or(0, |s| s.depth())
    }
}

impl fmt::Display for ImageExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageExpr::Composite(c) => write!(f, "median(clip({}) / {})", c.query, c.scale),
            ImageExpr::NormalizedDifference { source, positive, negative } => {
                write!(f, "nd({positive}, {negative}; {source})")
            }
            ImageExpr::MaskBelow { source, threshold } => write!(f, "mask({source} >= {threshold})"),
            ImageExpr::Classify { source, scheme } => {
                write!(f, "classify[{} rules, {:?}]({source})", scheme.rules.len(), scheme.gap_policy)
            }
        }
    }
}

/// Raw search-option checkboxes as a user selects them.
///
/// Several combinations are contradictory; [`DetectionStrategy::from_flags`]
/// collapses them into the one strategy the cascade search actually runs.
/// `Default` is the "unset all flags" state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DetectionFlags {
    /// Downscale the image per search level instead of zooming features.
    pub scale_image: bool,
    /// Return only the largest object found.
    pub biggest_object: bool,
    /// Stop at the first acceptable scale; only meaningful with `biggest_object`.
    pub rough_search: bool,
    /// Reject regions with too few or too many edges before matching.
    pub edge_pruning: bool,
}

impl DetectionFlags {
    // Which checkboxes a UI should leave enabled given the current selection.

    pub fn biggest_object_enabled(&self) -> bool {
        !(self.scale_image || self.edge_pruning)
    }

    pub fn rough_search_enabled(&self) -> bool {
        self.biggest_object
    }

    pub fn edge_pruning_enabled(&self) -> bool {
        !(self.biggest_object || self.scale_image)
    }

    pub fn scale_image_enabled(&self) -> bool {
        !(self.biggest_object || self.edge_pruning)
    }
}

/// The single, internally consistent search strategy handed to the cascade.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DetectionStrategy {
    ScaleByResize,
    BiggestObject {
        rough_search: bool,
    },
    EdgePruning,
    /// Multi-object search with no special option.
    #[default]
    Exhaustive,
}

impl DetectionStrategy {
    /// Strategy used to bootstrap tracking, regardless of user flags.
    pub const TRACKING_BOOTSTRAP: DetectionStrategy =
        DetectionStrategy::BiggestObject { rough_search: false };

    /// Resolves raw flags by priority: scale-by-resize, then biggest object
    /// (with rough search if requested), then edge pruning, then exhaustive.
    pub fn from_flags(flags: DetectionFlags) -> Self {
        if flags.scale_image {
            DetectionStrategy::ScaleByResize
        } else if flags.biggest_object {
            DetectionStrategy::BiggestObject {
                rough_search: flags.rough_search,
            }
        } else if flags.edge_pruning {
            DetectionStrategy::EdgePruning
        } else {
            DetectionStrategy::Exhaustive
        }
    }

    /// At most one result is returned.
    pub fn is_single_object(&self) -> bool {
        matches!(self, DetectionStrategy::BiggestObject { .. })
    }
}

impl From<DetectionFlags> for DetectionStrategy {
    fn from(flags: DetectionFlags) -> Self {
        Self::from_flags(flags)
    }
}

impl std::fmt::Display for DetectionStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DetectionStrategy::ScaleByResize => write!(f, "scale-image"),
            DetectionStrategy::BiggestObject { rough_search: true } => {
                write!(f, "biggest-object+rough-search")
            }
            DetectionStrategy::BiggestObject { rough_search: false } => write!(f, "biggest-object"),
            DetectionStrategy::EdgePruning => write!(f, "edge-pruning"),
            DetectionStrategy::Exhaustive => write!(f, "exhaustive"),
        }
    }
}

//! Data models for the load estimation.
//!
//! This module defines the fundamental data structures:
//! - `Container`: The vehicle or pallet with its weight cap and clearance gap
//! - `BoxType`: One kind of box with a requested and a fitted quantity
//! - `PackingResult`: The annotated box types plus weight and fill totals
//!
//! All structures implement the traits from the `types` module.

use thiserror::Error;

use crate::types::{Dimensional, Dimensions, Weighted, validation};

/// Validation error for container data.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("Invalid dimension: {0}")]
    InvalidDimension(String),
    #[error("Invalid gap: {0}")]
    InvalidGap(String),
}

/// Validates container dimensions.
fn validate_container_dims(dims: Dimensions) -> Result<(), ValidationError> {
    validation::validate_dimension(dims.length, "Container length")
        .and_then(|_| validation::validate_dimension(dims.width, "Container width"))
        .and_then(|_| validation::validate_dimension(dims.height, "Container height"))
        .map_err(ValidationError::InvalidDimension)
}

/// Represents the space boxes are loaded into.
///
/// # Fields
/// * `dims` - Inner dimensions (length, width, height)
/// * `max_weight` - Maximum total payload in kg
/// * `gap` - Clearance added to every box on each axis
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Container {
    pub dims: Dimensions,
    pub max_weight: f64,
    pub gap: f64,
}

impl Container {
    /// Creates a new container with validation.
    ///
    /// Only the geometry is checked here. A negative `max_weight` is accepted
    /// and simply means that nothing with weight can be loaded.
    ///
    /// # Returns
    /// `Ok(Container)` for valid values, otherwise `Err(ValidationError)`
    pub fn new(dims: Dimensions, max_weight: f64, gap: f64) -> Result<Self, ValidationError> {
        let container = Self {
            dims,
            max_weight,
            gap,
        };
        container.validate()?;
        Ok(container)
    }

    /// Checks the geometry of an already constructed container.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_container_dims(self.dims)?;
        validation::validate_gap(self.gap).map_err(ValidationError::InvalidGap)
    }

    /// Calculates the total volume of the container.
    pub fn total_volume(&self) -> f64 {
        self.dims.volume()
    }

    /// Calculates the fill efficiency for a given loaded volume in percent.
    ///
    /// Returns 0.0 for containers without positive volume.
    pub fn efficiency_percent(&self, used_volume: f64) -> f64 {
        let total = self.total_volume();
        if total <= 0.0 || !total.is_finite() {
            return 0.0;
        }
        (used_volume / total * 100.0).max(0.0)
    }
}

impl Dimensional for Container {
    fn dimensions(&self) -> Dimensions {
        self.dims
    }
}

/// Requested quantity of a box type.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Target {
    /// Load at most this many units.
    Count(u64),
    /// Load as many units as fit.
    Unbounded,
}

impl Target {
    /// Builds a bounded target from a signed count. Negative counts request nothing.
    pub fn from_signed(raw: i64) -> Self {
        Self::Count(u64::try_from(raw).unwrap_or(0))
    }

    /// Limits `count` to the requested quantity.
    pub fn cap(&self, count: u64) -> u64 {
        match self {
            Self::Count(limit) => count.min(*limit),
            Self::Unbounded => count,
        }
    }

    /// Returns the bounded count, `None` for unbounded targets.
    pub fn as_count(&self) -> Option<u64> {
        match self {
            Self::Count(limit) => Some(*limit),
            Self::Unbounded => None,
        }
    }
}

/// One kind of box to be loaded.
///
/// # Fields
/// * `index` - Position in the caller's input, used to restore display order
/// * `name` - Opaque label chosen by the caller
/// * `dims` - Dimensions (length, width, height) without gap
/// * `unit_weight` - Weight of one unit in kg
/// * `target` - Requested quantity
/// * `actual` - Fitted quantity, filled in by the estimator
#[derive(Clone, Debug, PartialEq)]
pub struct BoxType {
    pub index: usize,
    pub name: String,
    pub dims: Dimensions,
    pub unit_weight: f64,
    pub target: Target,
    pub actual: u64,
}

impl BoxType {
    /// Creates a box type with no units fitted yet.
    pub fn new(
        index: usize,
        name: impl Into<String>,
        dims: Dimensions,
        unit_weight: f64,
        target: Target,
    ) -> Self {
        Self {
            index,
            name: name.into(),
            dims,
            unit_weight,
            target,
            actual: 0,
        }
    }

    /// Number of requested units that did not fit.
    ///
    /// # Returns
    /// `Some(target - actual)` for bounded targets, `None` when unbounded
    pub fn shortfall(&self) -> Option<u64> {
        self.target
            .as_count()
            .map(|limit| limit.saturating_sub(self.actual))
    }
}

impl Dimensional for BoxType {
    fn dimensions(&self) -> Dimensions {
        self.dims
    }
}

impl Weighted for BoxType {
    fn weight(&self) -> f64 {
        self.unit_weight
    }
}

/// Result of a load estimation.
#[derive(Clone, Debug, PartialEq)]
pub struct PackingResult {
    /// Annotated box types in processing order (descending volume).
    pub box_types: Vec<BoxType>,
    pub total_weight: f64,
    pub used_volume: f64,
    pub efficiency: f64,
    /// Height still free after the last consumed layer.
    pub remaining_height: f64,
}

impl PackingResult {
    /// Creates the result for an estimation without any box types.
    pub fn empty(container: &Container) -> Self {
        Self {
            box_types: Vec::new(),
            total_weight: 0.0,
            used_volume: 0.0,
            efficiency: 0.0,
            remaining_height: container.dims.height.max(0.0),
        }
    }

    /// Indicates whether every bounded request was fully satisfied.
    pub fn is_complete(&self) -> bool {
        self.box_types
            .iter()
            .all(|b| b.shortfall().is_none_or(|missing| missing == 0))
    }

    /// Total number of fitted units across all types.
    pub fn total_actual(&self) -> u64 {
        self.box_types
            .iter()
            .fold(0u64, |acc, b| acc.saturating_add(b.actual))
    }

    /// Number of box types with at least one fitted unit.
    pub fn packed_type_count(&self) -> usize {
        self.box_types.iter().filter(|b| b.actual > 0).count()
    }

    /// Re-sorts the box types into the caller's original order.
    pub fn in_input_order(mut self) -> Self {
        self.box_types.sort_by_key(|b| b.index);
        self
    }
}

//! Common types and traits for box geometry.
//!
//! This module defines the reusable dimension type and the small trait
//! abstractions shared by containers and box types.

/// Axis-aligned extent of a box or container.
///
/// All three components share one length unit (the service does not care
/// which one, as long as containers and boxes agree).
///
/// # Examples
/// ```ignore
/// let pallet = Dimensions::new(120.0, 80.0, 150.0);
/// let carton = Dimensions::new(40.0, 30.0, 25.0).padded(0.5);
/// assert!(carton.fits_within(&pallet, 0.0));
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Dimensions {
    pub length: f64,
    pub width: f64,
    pub height: f64,
}

impl Dimensions {
    /// Creates a new dimension triple.
    ///
    /// # Parameters
    /// * `length` - Extent along the length axis
    /// * `width` - Extent along the width axis
    /// * `height` - Extent along the height (stacking) axis
    #[inline]
    pub const fn new(length: f64, width: f64, height: f64) -> Self {
        Self {
            length,
            width,
            height,
        }
    }

    /// Converts to tuple format for API compatibility.
    #[inline]
    pub const fn as_tuple(&self) -> (f64, f64, f64) {
        (self.length, self.width, self.height)
    }

    /// Creates from tuple format.
    #[inline]
    pub const fn from_tuple(tuple: (f64, f64, f64)) -> Self {
        Self::new(tuple.0, tuple.1, tuple.2)
    }

    /// Calculates the volume (product of all components).
    #[inline]
    pub fn volume(&self) -> f64 {
        self.length * self.width * self.height
    }

    /// Returns the dimensions grown by `gap` on every axis.
    ///
    /// This is the effective footprint a box claims once handling clearance
    /// is reserved around it.
    #[inline]
    pub fn padded(&self, gap: f64) -> Self {
        Self::new(self.length + gap, self.width + gap, self.height + gap)
    }

    /// Checks if all components are positive and finite.
    #[inline]
    pub fn is_valid_dimension(&self) -> bool {
        self.length > 0.0
            && self.width > 0.0
            && self.height > 0.0
            && self.length.is_finite()
            && self.width.is_finite()
            && self.height.is_finite()
    }

    /// Checks if the extent fits within another one (component-wise <=).
    ///
    /// # Parameters
    /// * `container` - The outer extent (e.g., container dimensions)
    /// * `tolerance` - Numerical tolerance for the comparison
    #[inline]
    pub fn fits_within(&self, container: &Self, tolerance: f64) -> bool {
        self.length <= container.length + tolerance
            && self.width <= container.width + tolerance
            && self.height <= container.height + tolerance
    }
}

impl From<(f64, f64, f64)> for Dimensions {
    #[inline]
    fn from(tuple: (f64, f64, f64)) -> Self {
        Self::from_tuple(tuple)
    }
}

impl From<Dimensions> for (f64, f64, f64) {
    #[inline]
    fn from(dims: Dimensions) -> Self {
        dims.as_tuple()
    }
}

/// Trait for objects with a spatial extent.
pub trait Dimensional {
    /// Returns the dimensions of the object.
    fn dimensions(&self) -> Dimensions;

    /// Calculates the volume.
    fn volume(&self) -> f64 {
        self.dimensions().volume()
    }
}

/// Trait for objects with weight.
pub trait Weighted {
    /// Returns the weight per unit in kg.
    fn weight(&self) -> f64;
}

/// Validation functions shared by the model constructors.
pub mod validation {

    /// Validates a single container dimension.
    ///
    /// # Parameters
    /// * `value` - The value to validate
    /// * `name` - Name of the dimension for error messages
    ///
    /// # Returns
    /// `Ok(())` for valid values, otherwise error text
    pub fn validate_dimension(value: f64, name: &str) -> Result<(), String> {
        if value.is_nan() {
            return Err(format!("{} must not be NaN", name));
        }
        if value.is_infinite() {
            return Err(format!("{} must not be infinite", name));
        }
        if value <= 0.0 {
            return Err(format!("{} must be positive, got: {}", name, value));
        }
        Ok(())
    }

    /// Validates the clearance gap. Zero is allowed, negative is not.
    pub fn validate_gap(value: f64) -> Result<(), String> {
        if !value.is_finite() {
            return Err(format!("Gap must be a finite number, got: {}", value));
        }
        if value < 0.0 {
            return Err(format!("Gap must not be negative, got: {}", value));
        }
        Ok(())
    }
}

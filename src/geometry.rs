//! Geometrische Hilfsfunktionen für die Rasterzählung im Container.
//!
//! Dieses Modul zählt, wie viele achsenparallele, nicht rotierte Objekte in
//! einem gleichmäßigen Raster entlang jeder Achse Platz finden. Der Abstand
//! (Gap) ist hier unbekannt: Aufrufer übergeben bereits gepolsterte Maße.

use crate::types::Dimensions;

/// Zählt, wie oft ein Objekt entlang einer Achse hintereinander passt.
///
/// # Parameter
/// * `available` - Verfügbare Länge der Achse
/// * `size` - Länge des Objekts auf dieser Achse
///
/// # Rückgabewert
/// `floor(available / size)`, oder 0 bei nicht positiven bzw. ungültigen Werten
pub fn axis_count(available: f64, size: f64) -> u64 {
    if size <= 0.0 || !size.is_finite() || available <= 0.0 || available.is_nan() {
        return 0;
    }
    // `as` sättigt bei sehr großen Quotienten statt zu überlaufen
    (available / size).floor() as u64
}

/// Maximale Anzahl eines Objekttyps in einem Container (reines 3-Achsen-Raster).
///
/// Gibt 0 zurück, wenn eine Objektkante nicht positiv ist oder eine Kante
/// die entsprechende Containerkante überschreitet.
///
/// # Parameter
/// * `container` - Innenmaße des Containers
/// * `item` - Effektive Objektmaße (Gap bereits addiert)
///
/// # Beispiel
/// ```ignore
/// let count = fit(Dimensions::new(100.0, 100.0, 100.0), Dimensions::new(10.0, 10.0, 10.0));
/// assert_eq!(count, 1000);
/// ```
pub fn fit(container: Dimensions, item: Dimensions) -> u64 {
    if !item.is_valid_dimension() || !item.fits_within(&container, 0.0) {
        return 0;
    }

    axis_count(container.length, item.length)
        .saturating_mul(axis_count(container.width, item.width))
        .saturating_mul(axis_count(container.height, item.height))
}

/// Anzahl der Objekte in einer einzigen Schicht (Länge × Breite).
///
/// # Parameter
/// * `container` - Innenmaße des Containers
/// * `item` - Effektive Objektmaße (Gap bereits addiert)
pub fn per_layer(container: Dimensions, item: Dimensions) -> u64 {
    axis_count(container.length, item.length).saturating_mul(axis_count(container.width, item.width))
}

/// Anzahl ganzer Schichten, die in die verbleibende Höhe passen.
pub fn layers_within(remaining_height: f64, layer_height: f64) -> u64 {
    axis_count(remaining_height, layer_height)
}

/// Anzahl der angebrochenen Schichten, die `count` Objekte belegen.
///
/// Eine nur teilweise gefüllte letzte Schicht zählt als volle Schicht.
pub fn layers_used(count: u64, per_layer: u64) -> u64 {
    if per_layer == 0 {
        return 0;
    }
    count.div_ceil(per_layer)
}

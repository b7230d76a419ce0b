//! Schätzlogik für die Beladung eines Containers mit Kisten.
//!
//! Dieses Modul implementiert zwei deterministische Heuristiken:
//! - Einzeltyp: reines 3-Achsen-Raster über [`geometry::fit`]
//! - Mehrere Typen: schichtweises Befüllen der Containerhöhe, größte Kisten
//!   zuerst, mit Kürzung auf das zulässige Gesamtgewicht
//!
//! Es gibt keine Rotation und keine gemischten Schichten. Jede Schicht gehört
//! genau einem Kistentyp.

use log::debug;
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

use crate::geometry;
use crate::model::{BoxType, Container, PackingResult, ValidationError};
use crate::types::{Dimensional, Dimensions, Weighted};

/// Konfiguration für die Schätzung.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct EstimatorConfig {
    /// Abstand, der verwendet wird, wenn eine Anfrage keinen angibt
    pub default_gap: f64,
    /// Kürzt auch im Einzeltyp-Modus auf das zulässige Gesamtgewicht
    pub enforce_weight_in_single: bool,
}

impl EstimatorConfig {
    pub const DEFAULT_GAP: f64 = 0.5;
    pub const DEFAULT_ENFORCE_WEIGHT_IN_SINGLE: bool = true;

    /// Erstellt einen Builder für benutzerdefinierte Konfiguration.
    pub fn builder() -> EstimatorConfigBuilder {
        EstimatorConfigBuilder::default()
    }
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            default_gap: Self::DEFAULT_GAP,
            enforce_weight_in_single: Self::DEFAULT_ENFORCE_WEIGHT_IN_SINGLE,
        }
    }
}

/// Builder-Pattern für EstimatorConfig.
#[derive(Clone, Debug, Default)]
pub struct EstimatorConfigBuilder {
    config: EstimatorConfig,
}

impl EstimatorConfigBuilder {
    /// Setzt den Standardabstand.
    pub fn default_gap(mut self, gap: f64) -> Self {
        self.config.default_gap = gap;
        self
    }

    /// Legt fest, ob der Einzeltyp-Modus das Gewichtslimit beachtet.
    pub fn enforce_weight_in_single(mut self, enforce: bool) -> Self {
        self.config.enforce_weight_in_single = enforce;
        self
    }

    /// Erstellt die finale Konfiguration.
    pub fn build(self) -> EstimatorConfig {
        self.config
    }
}

/// Fehler, die eine Schätzung abbrechen.
///
/// "Passt nicht" ist kein Fehler, sondern `actual = 0`.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EstimateError {
    #[error("Invalid container geometry: {0}")]
    InvalidGeometry(#[from] ValidationError),
}

/// Gründe, warum ein Kistentyp keine Einheit beitragen konnte.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SkipReason {
    InvalidDimensions,
    InvalidWeight,
    ExceedsFootprint,
    NoHeightLeft,
    WeightLimitReached,
}

impl SkipReason {
    pub fn code(&self) -> &'static str {
        match self {
            SkipReason::InvalidDimensions => "invalid_dimensions",
            SkipReason::InvalidWeight => "invalid_weight",
            SkipReason::ExceedsFootprint => "exceeds_footprint",
            SkipReason::NoHeightLeft => "no_height_left",
            SkipReason::WeightLimitReached => "weight_limit_reached",
        }
    }
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::InvalidDimensions => {
                write!(f, "Box dimensions must all be positive")
            }
            SkipReason::InvalidWeight => write!(f, "Box weight must not be negative"),
            SkipReason::ExceedsFootprint => {
                write!(
                    f,
                    "Box (including gap) does not fit the container floor in at least one dimension"
                )
            }
            SkipReason::NoHeightLeft => {
                write!(f, "Not enough container height left for a single layer")
            }
            SkipReason::WeightLimitReached => {
                write!(f, "Container weight limit leaves no room for another unit")
            }
        }
    }
}

/// Ereignisse während der Mehrtyp-Schätzung, geeignet für SSE.
#[derive(Clone, Debug, Serialize, ToSchema)]
#[serde(tag = "type")]
pub enum PackEvent {
    /// Ein Kistentyp wird als Nächstes bearbeitet.
    TypeStarted { index: usize, name: String },
    /// Ein Kistentyp hat Einheiten (oder bewusst null) erhalten.
    TypePacked {
        index: usize,
        name: String,
        actual: u64,
        per_layer: u64,
        layers_used: u64,
        weight_limited: bool,
        remaining_height: f64,
        total_weight: f64,
    },
    /// Ein Kistentyp wurde übersprungen.
    TypeSkipped {
        index: usize,
        name: String,
        reason_code: String,
        reason_text: String,
    },
    /// Schätzung abgeschlossen.
    Finished {
        packed_types: usize,
        total_weight: f64,
        efficiency: f64,
    },
}

/// Ergebnis eines einzelnen Faltungsschritts.
#[derive(Clone, Copy, Debug, PartialEq)]
enum Placement {
    Packed {
        count: u64,
        per_layer: u64,
        layers_used: u64,
        weight_limited: bool,
    },
    Skipped(SkipReason),
}

impl Placement {
    fn count(&self) -> u64 {
        match self {
            Placement::Packed { count, .. } => *count,
            Placement::Skipped(_) => 0,
        }
    }
}

/// Akkumulator der Schichtheuristik.
///
/// Jeder Schritt erzeugt einen neuen Zustand; nichts wird in-place verändert.
#[derive(Clone, Copy, Debug, PartialEq)]
struct PackState {
    remaining_height: f64,
    used_weight: f64,
    used_volume: f64,
}

impl PackState {
    fn new(container: &Container) -> Self {
        Self {
            remaining_height: container.dims.height,
            used_weight: 0.0,
            used_volume: 0.0,
        }
    }

    /// Platziert so viele ganze Schichten eines Typs wie möglich.
    fn place(self, container: &Container, box_type: &BoxType) -> (Self, Placement) {
        if !box_type.dims.is_valid_dimension() {
            return (self, Placement::Skipped(SkipReason::InvalidDimensions));
        }
        let unit_weight = box_type.weight();
        if unit_weight.is_nan() || unit_weight < 0.0 {
            return (self, Placement::Skipped(SkipReason::InvalidWeight));
        }

        let effective = box_type.dims.padded(container.gap);
        let per_layer = geometry::per_layer(container.dims, effective);
        if per_layer == 0 {
            return (self, Placement::Skipped(SkipReason::ExceedsFootprint));
        }

        let layers = geometry::layers_within(self.remaining_height, effective.height);
        if layers == 0 {
            return (self, Placement::Skipped(SkipReason::NoHeightLeft));
        }

        let requested = box_type.target.cap(per_layer.saturating_mul(layers));
        let count = trim_to_weight(requested, unit_weight, self.used_weight, container.max_weight);
        if count == 0 && requested > 0 {
            return (self, Placement::Skipped(SkipReason::WeightLimitReached));
        }

        // Angebrochene Schichten verbrauchen ihre volle Höhe
        let layers_used = geometry::layers_used(count, per_layer);
        let next = Self {
            remaining_height: self.remaining_height - layers_used as f64 * effective.height,
            used_weight: self.used_weight + count as f64 * unit_weight,
            used_volume: self.used_volume + count as f64 * box_type.dims.volume(),
        };

        (
            next,
            Placement::Packed {
                count,
                per_layer,
                layers_used,
                weight_limited: count < requested,
            },
        )
    }
}

/// Größte Anzahl `k <= candidate` mit `used_weight + k * unit_weight <= max_weight`.
///
/// Entspricht dem schrittweisen Herunterzählen, wird aber geschlossen berechnet
/// und anschließend gegen Rundungsfehler nachjustiert.
///
/// # Parameter
/// * `candidate` - Geometrisch mögliche und angefragte Anzahl
/// * `unit_weight` - Gewicht pro Einheit (nicht negativ)
/// * `used_weight` - Bereits verbrauchtes Gewicht
/// * `max_weight` - Zulässiges Gesamtgewicht
pub fn trim_to_weight(candidate: u64, unit_weight: f64, used_weight: f64, max_weight: f64) -> u64 {
    let fits = |k: u64| used_weight + k as f64 * unit_weight <= max_weight;

    if candidate == 0 || fits(candidate) {
        return candidate;
    }
    // Ohne positives Stückgewicht ändert Herunterzählen nichts an der Bedingung
    if unit_weight <= 0.0 || unit_weight.is_nan() {
        return 0;
    }

    let headroom = (max_weight - used_weight) / unit_weight;
    let mut count = if headroom.is_finite() && headroom > 0.0 {
        (headroom.floor() as u64).min(candidate)
    } else {
        0
    };
    while count > 0 && !fits(count) {
        count -= 1;
    }
    while count < candidate && fits(count + 1) {
        count += 1;
    }
    count
}

/// Schichtweise Schätzung für mehrere Kistentypen.
///
/// Validiert den Container nicht; ungültige Geometrie führt zu `actual = 0`.
/// Für den validierten Einstieg siehe [`compute_multi`].
///
/// # Parameter
/// * `container` - Container mit Gewichtslimit und Abstand
/// * `box_types` - Kistentypen mit Zielmengen
///
/// # Rückgabewert
/// `PackingResult` mit Typen in absteigender Volumenreihenfolge
pub fn pack(container: &Container, box_types: Vec<BoxType>) -> PackingResult {
    pack_with_progress(container, box_types, |_| {})
}

/// Wie [`pack`], ruft aber für jeden Schritt ein Callback auf.
pub fn pack_with_progress(
    container: &Container,
    box_types: Vec<BoxType>,
    mut on_event: impl FnMut(&PackEvent),
) -> PackingResult {
    if box_types.is_empty() {
        on_event(&PackEvent::Finished {
            packed_types: 0,
            total_weight: 0.0,
            efficiency: 0.0,
        });
        return PackingResult::empty(container);
    }

    // Stabile Sortierung: gleiche Volumina behalten die Eingabereihenfolge
    let mut box_types = box_types;
    box_types.sort_by(|a, b| b.volume().total_cmp(&a.volume()));

    let capacity = box_types.len();
    let (state, packed) = box_types.into_iter().fold(
        (PackState::new(container), Vec::with_capacity(capacity)),
        |(state, mut packed), mut box_type| {
            on_event(&PackEvent::TypeStarted {
                index: box_type.index,
                name: box_type.name.clone(),
            });
            let (next, placement) = state.place(container, &box_type);
            box_type.actual = placement.count();

            match placement {
                Placement::Packed {
                    count,
                    per_layer,
                    layers_used,
                    weight_limited,
                } => {
                    debug!(
                        "Type '{}': {} units, {} per layer, {} layers, {:.2} height left",
                        box_type.name, count, per_layer, layers_used, next.remaining_height
                    );
                    on_event(&PackEvent::TypePacked {
                        index: box_type.index,
                        name: box_type.name.clone(),
                        actual: count,
                        per_layer,
                        layers_used,
                        weight_limited,
                        remaining_height: next.remaining_height,
                        total_weight: next.used_weight,
                    });
                }
                Placement::Skipped(reason) => {
                    debug!("Type '{}' skipped: {}", box_type.name, reason.code());
                    on_event(&PackEvent::TypeSkipped {
                        index: box_type.index,
                        name: box_type.name.clone(),
                        reason_code: reason.code().to_string(),
                        reason_text: reason.to_string(),
                    });
                }
            }

            packed.push(box_type);
            (next, packed)
        },
    );

    let result = PackingResult {
        box_types: packed,
        total_weight: state.used_weight,
        used_volume: state.used_volume,
        efficiency: container.efficiency_percent(state.used_volume),
        remaining_height: state.remaining_height,
    };
    on_event(&PackEvent::Finished {
        packed_types: result.packed_type_count(),
        total_weight: result.total_weight,
        efficiency: result.efficiency,
    });
    result
}

/// Validierter Einstieg für den Mehrtyp-Modus.
///
/// # Rückgabewert
/// `Err(EstimateError::InvalidGeometry)` bei ungültigem Container
pub fn compute_multi(
    container: &Container,
    box_types: Vec<BoxType>,
) -> Result<PackingResult, EstimateError> {
    compute_multi_with_progress(container, box_types, |_| {})
}

/// Validierter Mehrtyp-Modus mit Live-Progress Callback.
pub fn compute_multi_with_progress(
    container: &Container,
    box_types: Vec<BoxType>,
    on_event: impl FnMut(&PackEvent),
) -> Result<PackingResult, EstimateError> {
    container.validate()?;
    Ok(pack_with_progress(container, box_types, on_event))
}

/// Ergebnis des Einzeltyp-Modus.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SingleEstimate {
    /// Rein geometrische Kapazität ohne Gewichtslimit
    pub capacity: u64,
    /// Gemeldete Anzahl (ggf. auf das Gewichtslimit gekürzt)
    pub count: u64,
    pub total_weight: f64,
    pub efficiency: f64,
    /// `true`, wenn das Gewichtslimit die Anzahl reduziert hat
    pub weight_limited: bool,
}

/// Einzeltyp-Modus: so viele Kisten eines Typs wie passen.
///
/// Nutzt ausschließlich das 3-Achsen-Raster. Ob zusätzlich auf das
/// Gewichtslimit gekürzt wird, bestimmt `config.enforce_weight_in_single`.
///
/// # Parameter
/// * `container` - Container mit Gewichtslimit und Abstand
/// * `item` - Kistenmaße ohne Abstand
/// * `unit_weight` - Gewicht pro Kiste
/// * `config` - Schätzkonfiguration
pub fn compute_single(
    container: &Container,
    item: Dimensions,
    unit_weight: f64,
    config: &EstimatorConfig,
) -> Result<SingleEstimate, EstimateError> {
    container.validate()?;

    let capacity = geometry::fit(container.dims, item.padded(container.gap));
    let valid_weight = !unit_weight.is_nan() && unit_weight >= 0.0;
    let count = if !valid_weight {
        0
    } else if config.enforce_weight_in_single {
        trim_to_weight(capacity, unit_weight, 0.0, container.max_weight)
    } else {
        capacity
    };

    let used_volume = if count > 0 {
        count as f64 * item.volume()
    } else {
        0.0
    };

    Ok(SingleEstimate {
        capacity,
        count,
        total_weight: count as f64 * unit_weight.max(0.0),
        efficiency: container.efficiency_percent(used_volume),
        weight_limited: valid_weight && count < capacity,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Target;

    fn container(dims: (f64, f64, f64), max_weight: f64, gap: f64) -> Container {
        Container::new(Dimensions::from_tuple(dims), max_weight, gap).unwrap()
    }

    fn box_type(index: usize, dims: (f64, f64, f64), weight: f64, target: Target) -> BoxType {
        BoxType::new(
            index,
            format!("Type {}", index + 1),
            Dimensions::from_tuple(dims),
            weight,
            target,
        )
    }

    fn naive_trim(candidate: u64, unit_weight: f64, used: f64, max: f64) -> u64 {
        let mut fit = candidate;
        while fit > 0 && used + fit as f64 * unit_weight > max {
            fit -= 1;
        }
        fit
    }

    #[test]
    fn weight_bound_cube_scenario() {
        let cont = container((100.0, 100.0, 100.0), 500.0, 0.0);
        let result = pack(
            &cont,
            vec![box_type(0, (10.0, 10.0, 10.0), 1.0, Target::Count(999_999))],
        );

        assert_eq!(result.box_types[0].actual, 500);
        assert!((result.total_weight - 500.0).abs() < 1e-9);
        assert!((result.used_volume - 500_000.0).abs() < 1e-9);
        assert!((result.efficiency - 50.0).abs() < 1e-9);
        // 500 Einheiten à 100 pro Schicht belegen 5 Schichten
        assert!((result.remaining_height - 50.0).abs() < 1e-9);
    }

    #[test]
    fn oversized_footprint_never_fits() {
        let cont = container((50.0, 50.0, 50.0), 1_000.0, 1.0);
        for target in [Target::Count(1), Target::Count(100), Target::Unbounded] {
            let result = pack(&cont, vec![box_type(0, (60.0, 10.0, 10.0), 0.0, target)]);
            assert_eq!(result.box_types[0].actual, 0);
            assert_eq!(result.remaining_height, 50.0);
        }
    }

    #[test]
    fn heavy_unit_is_trimmed_to_zero() {
        let cont = container((100.0, 100.0, 100.0), 10.0, 0.0);
        let result = pack(
            &cont,
            vec![box_type(0, (10.0, 10.0, 10.0), 11.0, Target::Count(5))],
        );
        assert_eq!(result.box_types[0].actual, 0);
        assert_eq!(result.total_weight, 0.0);
        assert_eq!(result.remaining_height, 100.0);
    }

    #[test]
    fn larger_types_are_processed_first() {
        let cont = container((10.0, 10.0, 10.0), 1_000.0, 0.0);
        let result = pack(
            &cont,
            vec![
                box_type(0, (5.0, 5.0, 2.0), 1.0, Target::Unbounded),
                box_type(1, (5.0, 5.0, 5.0), 1.0, Target::Count(1)),
            ],
        );

        let order: Vec<usize> = result.box_types.iter().map(|b| b.index).collect();
        assert_eq!(order, vec![1, 0]);
    }

    #[test]
    fn partial_layer_consumes_full_height() {
        let cont = container((10.0, 10.0, 10.0), 1_000.0, 0.0);
        let result = pack(
            &cont,
            vec![
                box_type(0, (5.0, 5.0, 5.0), 1.0, Target::Count(1)),
                box_type(1, (5.0, 5.0, 2.0), 1.0, Target::Unbounded),
            ],
        )
        .in_input_order();

        // Der große Typ belegt eine Schicht von 4 Plätzen mit nur 1 Einheit;
        // für den kleinen bleiben 5 Höheneinheiten = 2 Schichten à 4.
        assert_eq!(result.box_types[0].actual, 1);
        assert_eq!(result.box_types[1].actual, 8);
        assert!((result.remaining_height - 1.0).abs() < 1e-9);
    }

    #[test]
    fn equal_volumes_keep_input_order() {
        let cont = container((20.0, 20.0, 10.0), 1_000.0, 0.0);
        let result = pack(
            &cont,
            vec![
                box_type(0, (10.0, 10.0, 10.0), 1.0, Target::Unbounded),
                box_type(1, (10.0, 10.0, 10.0), 1.0, Target::Unbounded),
            ],
        );

        assert_eq!(result.box_types[0].index, 0);
        assert_eq!(result.box_types[0].actual, 4);
        assert_eq!(result.box_types[1].index, 1);
        assert_eq!(result.box_types[1].actual, 0);
    }

    #[test]
    fn empty_list_yields_empty_result() {
        let cont = container((10.0, 10.0, 10.0), 100.0, 0.0);
        let result = pack(&cont, Vec::new());
        assert!(result.box_types.is_empty());
        assert_eq!(result.total_weight, 0.0);
        assert_eq!(result.efficiency, 0.0);
    }

    #[test]
    fn zero_height_container_packs_nothing() {
        let flat = Container {
            dims: Dimensions::new(100.0, 100.0, 0.0),
            max_weight: 1_000.0,
            gap: 0.0,
        };
        let result = pack(
            &flat,
            vec![
                box_type(0, (10.0, 10.0, 10.0), 1.0, Target::Unbounded),
                box_type(1, (1.0, 1.0, 1.0), 1.0, Target::Count(3)),
            ],
        );
        assert!(result.box_types.iter().all(|b| b.actual == 0));
        assert_eq!(result.efficiency, 0.0);
    }

    #[test]
    fn degenerate_boxes_are_skipped() {
        let cont = container((100.0, 100.0, 100.0), 1_000.0, 1.0);
        let mut events = Vec::new();
        let result = pack_with_progress(
            &cont,
            vec![
                box_type(0, (-5.0, -5.0, 10.0), 1.0, Target::Unbounded),
                box_type(1, (10.0, 10.0, 0.0), 1.0, Target::Unbounded),
                box_type(2, (10.0, 10.0, 10.0), -1.0, Target::Unbounded),
            ],
            |evt| events.push(evt.clone()),
        );

        assert_eq!(result.total_actual(), 0);
        let codes: Vec<String> = events
            .iter()
            .filter_map(|evt| match evt {
                PackEvent::TypeSkipped { reason_code, .. } => Some(reason_code.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(codes.len(), 3);
        assert!(codes.contains(&"invalid_weight".to_string()));
        assert_eq!(
            codes
                .iter()
                .filter(|code| code.as_str() == "invalid_dimensions")
                .count(),
            2
        );
    }

    #[test]
    fn actual_never_exceeds_target() {
        let cont = container((120.0, 80.0, 200.0), 10_000.0, 0.5);
        let result = pack(
            &cont,
            vec![
                box_type(0, (40.0, 30.0, 25.0), 12.0, Target::Count(7)),
                box_type(1, (20.0, 20.0, 20.0), 3.0, Target::Count(0)),
                box_type(2, (10.0, 10.0, 10.0), 0.5, Target::Count(50)),
            ],
        );

        for b in &result.box_types {
            if let Target::Count(limit) = b.target {
                assert!(b.actual <= limit, "{} exceeds its target", b.name);
            }
        }
        assert!(result.efficiency >= 0.0 && result.efficiency <= 100.0);
    }

    #[test]
    fn weight_cap_holds_across_types() {
        let cont = container((100.0, 100.0, 100.0), 37.5, 0.0);
        let result = pack(
            &cont,
            vec![
                box_type(0, (20.0, 20.0, 20.0), 7.0, Target::Unbounded),
                box_type(1, (10.0, 10.0, 10.0), 2.5, Target::Unbounded),
                box_type(2, (5.0, 5.0, 5.0), 0.3, Target::Unbounded),
            ],
        );

        assert!(result.total_weight <= cont.max_weight);
        let summed: f64 = result
            .box_types
            .iter()
            .map(|b| b.actual as f64 * b.unit_weight)
            .sum();
        assert!((summed - result.total_weight).abs() < 1e-9);
    }

    #[test]
    fn raising_weight_cap_is_monotone() {
        let types = vec![
            box_type(0, (30.0, 20.0, 20.0), 9.0, Target::Count(40)),
            box_type(1, (10.0, 10.0, 15.0), 2.0, Target::Count(200)),
            box_type(2, (5.0, 5.0, 5.0), 0.25, Target::Unbounded),
        ];

        let mut previous_weight = 0.0;
        let mut previous_total = 0;
        for max_weight in [0.0, 5.0, 50.0, 120.5, 500.0, 5_000.0] {
            let cont = container((100.0, 60.0, 80.0), max_weight, 0.5);
            let result = pack(&cont, types.clone());
            assert!(result.total_weight >= previous_weight);
            assert!(result.total_actual() >= previous_total);
            previous_weight = result.total_weight;
            previous_total = result.total_actual();
        }
    }

    #[test]
    fn packing_is_deterministic() {
        let cont = container((100.0, 60.0, 80.0), 300.0, 0.5);
        let types = vec![
            box_type(0, (10.0, 10.0, 10.0), 1.0, Target::Count(30)),
            box_type(1, (10.0, 10.0, 10.0), 2.0, Target::Count(30)),
            box_type(2, (25.0, 20.0, 10.0), 4.0, Target::Unbounded),
        ];

        assert_eq!(pack(&cont, types.clone()), pack(&cont, types));
    }

    #[test]
    fn trim_matches_decrement_loop() {
        let weights = [0.0, 0.1, 0.3, 1.0, 2.5, 7.0, 1e6];
        let caps = [-1.0, 0.0, 0.3, 1.0, 10.0, 99.9, 1e9];
        for &unit_weight in &weights {
            for &max_weight in &caps {
                for used in [0.0, 0.2, 5.0] {
                    for candidate in [0u64, 1, 3, 17, 1_000] {
                        assert_eq!(
                            trim_to_weight(candidate, unit_weight, used, max_weight),
                            naive_trim(candidate, unit_weight, used, max_weight),
                            "candidate={candidate} w={unit_weight} used={used} max={max_weight}"
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn compute_multi_rejects_invalid_container() {
        let bad = Container {
            dims: Dimensions::new(100.0, 0.0, 100.0),
            max_weight: 10.0,
            gap: 0.0,
        };
        let err = compute_multi(&bad, vec![box_type(0, (1.0, 1.0, 1.0), 1.0, Target::Unbounded)])
            .unwrap_err();
        assert!(matches!(err, EstimateError::InvalidGeometry(_)));
    }

    #[test]
    fn progress_ends_with_finished_event() {
        let cont = container((10.0, 10.0, 10.0), 100.0, 0.0);
        let mut events = Vec::new();
        let result = compute_multi_with_progress(
            &cont,
            vec![box_type(0, (5.0, 5.0, 5.0), 1.0, Target::Count(3))],
            |evt| events.push(evt.clone()),
        )
        .unwrap();

        assert_eq!(result.box_types[0].actual, 3);
        let tags: Vec<String> = events
            .iter()
            .map(|evt| serde_json::to_value(evt).unwrap()["type"].as_str().unwrap().to_owned())
            .collect();
        assert_eq!(tags, vec!["TypeStarted", "TypePacked", "Finished"]);
        assert!(matches!(
            &events[0],
            PackEvent::TypeStarted { index: 0, .. }
        ));
        assert!(matches!(
            events.last(),
            Some(PackEvent::Finished { packed_types: 1, .. })
        ));
    }

    #[test]
    fn every_type_is_announced_before_its_outcome() {
        let cont = container((10.0, 10.0, 10.0), 100.0, 0.0);
        let mut events = Vec::new();
        pack_with_progress(
            &cont,
            vec![
                box_type(0, (2.0, 2.0, 2.0), 1.0, Target::Count(1)),
                box_type(1, (20.0, 20.0, 20.0), 1.0, Target::Count(1)),
            ],
            |evt| events.push(evt.clone()),
        );

        assert_eq!(events.len(), 5);
        // Larger volume first: the oversized type is started and skipped before the small one
        assert!(matches!(&events[0], PackEvent::TypeStarted { index: 1, .. }));
        assert!(matches!(&events[1], PackEvent::TypeSkipped { index: 1, .. }));
        assert!(matches!(&events[2], PackEvent::TypeStarted { index: 0, .. }));
        assert!(matches!(&events[3], PackEvent::TypePacked { index: 0, actual: 1, .. }));
        assert!(matches!(&events[4], PackEvent::Finished { .. }));
    }

    #[test]
    fn single_mode_counts_grid() {
        let cont = container((100.0, 100.0, 100.0), 1e9, 0.0);
        let estimate = compute_single(
            &cont,
            Dimensions::new(10.0, 10.0, 10.0),
            1.0,
            &EstimatorConfig::default(),
        )
        .unwrap();

        assert_eq!(estimate.capacity, 1000);
        assert_eq!(estimate.count, 1000);
        assert!(!estimate.weight_limited);
        assert!((estimate.total_weight - 1000.0).abs() < 1e-9);
        assert!((estimate.efficiency - 100.0).abs() < 1e-9);
    }

    #[test]
    fn single_mode_enforces_weight_by_default() {
        let cont = container((100.0, 100.0, 100.0), 500.0, 0.0);
        let estimate = compute_single(
            &cont,
            Dimensions::new(10.0, 10.0, 10.0),
            1.0,
            &EstimatorConfig::default(),
        )
        .unwrap();

        assert_eq!(estimate.capacity, 1000);
        assert_eq!(estimate.count, 500);
        assert!(estimate.weight_limited);
        assert!((estimate.efficiency - 50.0).abs() < 1e-9);
    }

    #[test]
    fn single_mode_can_ignore_weight() {
        let cont = container((100.0, 100.0, 100.0), 500.0, 0.0);
        let config = EstimatorConfig::builder()
            .enforce_weight_in_single(false)
            .build();
        let estimate =
            compute_single(&cont, Dimensions::new(10.0, 10.0, 10.0), 1.0, &config).unwrap();

        assert_eq!(estimate.count, 1000);
        assert!((estimate.total_weight - 1000.0).abs() < 1e-9);
        assert!(!estimate.weight_limited);
    }

    #[test]
    fn single_mode_applies_gap() {
        let cont = container((100.0, 100.0, 100.0), 1e9, 0.5);
        let estimate = compute_single(
            &cont,
            Dimensions::new(10.0, 10.0, 10.0),
            0.0,
            &EstimatorConfig::default(),
        )
        .unwrap();
        assert_eq!(estimate.count, 9 * 9 * 9);
        assert_eq!(estimate.total_weight, 0.0);
    }

    #[test]
    fn single_mode_rejects_invalid_container() {
        let bad = Container {
            dims: Dimensions::new(-1.0, 10.0, 10.0),
            max_weight: 10.0,
            gap: 0.0,
        };
        let result = compute_single(
            &bad,
            Dimensions::new(1.0, 1.0, 1.0),
            1.0,
            &EstimatorConfig::default(),
        );
        assert!(matches!(result, Err(EstimateError::InvalidGeometry(_))));
    }

    #[test]
    fn single_mode_negative_weight_fits_nothing() {
        let cont = container((10.0, 10.0, 10.0), 100.0, 0.0);
        let estimate = compute_single(
            &cont,
            Dimensions::new(1.0, 1.0, 1.0),
            -2.0,
            &EstimatorConfig::default(),
        )
        .unwrap();
        assert_eq!(estimate.capacity, 1000);
        assert_eq!(estimate.count, 0);
        assert_eq!(estimate.efficiency, 0.0);
    }
}

//! Descriptions of the data a component accepts or provides.
//!
//! An [`ExchangeItem`] pairs a [`Quantity`] (what is exchanged, in which unit) with an
//! [`ElementSet`] (where it is exchanged). The internals of element sets, such as their
//! geometry, are the concern of the components themselves; the engine only uses these
//! descriptions to decide whether two items can be linked.

use crate::component::ComponentId;
use crate::values::ValueKind;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Unit of a quantity with its conversion to SI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Unit {
    pub id: String,
    #[serde(default = "default_conversion_factor")]
    pub conversion_factor_to_si: f64,
    #[serde(default)]
    pub offset_to_si: f64,
}

fn default_conversion_factor() -> f64 {
    1.0
}

impl Unit {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            conversion_factor_to_si: 1.0,
            offset_to_si: 0.0,
        }
    }
}

/// A semantic type and unit of exchanged values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quantity {
    pub id: String,
    #[serde(default)]
    pub description: String,
    pub unit: Unit,
    pub value_kind: ValueKind,
}

impl Quantity {
    /// A scalar quantity.
    pub fn scalar(id: &str, unit: &str) -> Self {
        Self {
            id: id.to_string(),
            description: String::new(),
            unit: Unit::new(unit),
            value_kind: ValueKind::Scalar,
        }
    }

    /// A vector quantity.
    pub fn vector(id: &str, unit: &str) -> Self {
        Self {
            value_kind: ValueKind::Vector,
            ..Self::scalar(id, unit)
        }
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ElementType {
    /// Elements without a spatial reference, e.g. a lumped catchment.
    IdBased,
    Point,
    Polyline,
    Polygon,
}

/// The set of locations values are exchanged for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementSet {
    pub id: String,
    #[serde(default)]
    pub description: String,
    pub element_type: ElementType,
    pub element_count: usize,
}

impl ElementSet {
    pub fn new(id: &str, element_type: ElementType, element_count: usize) -> Self {
        Self {
            id: id.to_string(),
            description: String::new(),
            element_type,
            element_count,
        }
    }

    /// An id based element set with a single element.
    pub fn single(id: &str) -> Self {
        Self::new(id, ElementType::IdBased, 1)
    }
}

/// Whether an exchange item is consumed or produced by its component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItemRole {
    Input,
    Output,
}

/// An input or output slot on a component.
///
/// Items remember the component that declared them. A group re-exposes the items of its
/// children unchanged so a link made against a group item can always be traced back to the
/// child that owns it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExchangeItem {
    pub component: ComponentId,
    pub role: ItemRole,
    pub quantity: Quantity,
    pub element_set: ElementSet,
}

impl ExchangeItem {
    pub fn input(component: &str, quantity: Quantity, element_set: ElementSet) -> Self {
        Self {
            component: component.to_string(),
            role: ItemRole::Input,
            quantity,
            element_set,
        }
    }

    pub fn output(component: &str, quantity: Quantity, element_set: ElementSet) -> Self {
        Self {
            component: component.to_string(),
            role: ItemRole::Output,
            quantity,
            element_set,
        }
    }

    /// Returns true if both descriptions refer to the same slot of the same component.
    ///
    /// Descriptive fields such as units are ignored.
    pub fn same_slot(&self, other: &ExchangeItem) -> bool {
        self.component == other.component
            && self.role == other.role
            && self.quantity.id == other.quantity.id
            && self.element_set.id == other.element_set.id
    }
}

impl fmt::Display for ExchangeItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}@{}",
            self.component, self.quantity.id, self.element_set.id
        )
    }
}

/// Decides whether an output item can feed an input item.
///
/// Groups delegate this question so that applications can plug in richer checks, such as unit
/// conversion or spatial mapping, without changing the link bookkeeping.
pub trait LinkCompatibility: Send + Sync + fmt::Debug {
    fn is_compatible(&self, source: &ExchangeItem, target: &ExchangeItem) -> bool;
}

/// The default compatibility check.
///
/// The source must be an output and the target an input, exchanging the same quantity in the
/// same unit and value kind, over element sets with the same number of elements.
#[derive(Debug, Clone, Default)]
pub struct MatchingQuantity;

impl LinkCompatibility for MatchingQuantity {
    fn is_compatible(&self, source: &ExchangeItem, target: &ExchangeItem) -> bool {
        source.role == ItemRole::Output
            && target.role == ItemRole::Input
            && source.quantity.id == target.quantity.id
            && source.quantity.unit.id == target.quantity.unit.id
            && source.quantity.value_kind == target.quantity.value_kind
            && source.element_set.element_count == target.element_set.element_count
    }
}

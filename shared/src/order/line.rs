//! Order line model
//!
//! An [`OrderLine`] is one purchasable entry in a cart. Lines are created
//! from a [`LineCandidate`] (a product picked from the catalog with its
//! customizations) and edited in place through a [`LinePatch`].

use super::status::PreparationStatus;
use super::types::{LocalId, RemoteLineId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Separator between hashed fields, so ("ab","c") and ("a","bc") differ
const FIELD_SEP: u8 = 0x1f;

// ============================================================================
// Line Kind & Selections
// ============================================================================

/// Pricing class of a line
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum LineKind {
    /// Catalog product, subject to normal pricing and discounts
    #[default]
    Regular,
    /// Loyalty reward, free of charge
    Reward,
    /// Deal bundle with an externally set price
    Deal,
}

/// A selected variation option and its price delta
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PricedOption {
    pub option_id: String,
    #[serde(default)]
    pub price_delta: Decimal,
}

impl PricedOption {
    pub fn new(option_id: impl Into<String>, price_delta: Decimal) -> Self {
        Self {
            option_id: option_id.into(),
            price_delta,
        }
    }
}

/// Addon with its own count
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SelectedAddon {
    pub addon_id: String,
    pub quantity: u32,
    #[serde(default)]
    pub unit_price: Decimal,
}

/// Extra topping or side
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SelectedExtra {
    pub extra_id: String,
    #[serde(default)]
    pub price: Decimal,
}

/// Variation group id → selected options (one element for single-choice groups)
pub type VariationSelections = BTreeMap<String, Vec<PricedOption>>;

// ============================================================================
// Line Candidate
// ============================================================================

/// A product about to be added to the cart
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LineCandidate {
    pub product_id: String,
    pub name: String,
    /// Base unit price actually charged (after any item-level discount)
    pub unit_price: Decimal,
    /// Base unit price before item-level discount (defaults to `unit_price`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_unit_price: Option<Decimal>,
    #[serde(default)]
    pub selected_variations: VariationSelections,
    #[serde(default)]
    pub selected_addons: Vec<SelectedAddon>,
    #[serde(default)]
    pub selected_extras: Vec<SelectedExtra>,
    #[serde(default)]
    pub excluded_option_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default)]
    pub kind: LineKind,
    /// Quantity is a weight in kg
    #[serde(default)]
    pub weight_tracked: bool,
    /// Itemized per-unit tax supplied by the catalog
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_tax: Option<Decimal>,
}

impl LineCandidate {
    pub fn new(product_id: impl Into<String>, name: impl Into<String>, unit_price: Decimal) -> Self {
        Self {
            product_id: product_id.into(),
            name: name.into(),
            unit_price,
            original_unit_price: None,
            selected_variations: BTreeMap::new(),
            selected_addons: Vec::new(),
            selected_extras: Vec::new(),
            excluded_option_ids: Vec::new(),
            notes: None,
            kind: LineKind::Regular,
            weight_tracked: false,
            item_tax: None,
        }
    }

    pub fn with_original_price(mut self, price: Decimal) -> Self {
        self.original_unit_price = Some(price);
        self
    }

    pub fn with_variation(mut self, group_id: impl Into<String>, options: Vec<PricedOption>) -> Self {
        self.selected_variations.insert(group_id.into(), options);
        self
    }

    pub fn with_addon(mut self, addon_id: impl Into<String>, quantity: u32, unit_price: Decimal) -> Self {
        self.selected_addons.push(SelectedAddon {
            addon_id: addon_id.into(),
            quantity,
            unit_price,
        });
        self
    }

    pub fn with_extra(mut self, extra_id: impl Into<String>, price: Decimal) -> Self {
        self.selected_extras.push(SelectedExtra {
            extra_id: extra_id.into(),
            price,
        });
        self
    }

    pub fn with_excluded(mut self, option_id: impl Into<String>) -> Self {
        self.excluded_option_ids.push(option_id.into());
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn with_kind(mut self, kind: LineKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_item_tax(mut self, tax: Decimal) -> Self {
        self.item_tax = Some(tax);
        self
    }

    pub fn weighed(mut self) -> Self {
        self.weight_tracked = true;
        self
    }

    /// Canonical duplicate-detection key of this candidate
    pub fn line_key(&self) -> String {
        compute_line_key(
            &self.product_id,
            &self.selected_variations,
            &self.selected_addons,
            &self.selected_extras,
            &self.excluded_option_ids,
            self.notes.as_deref(),
        )
    }
}

/// Generate the content-addressed key that decides whether two lines merge
///
/// The key covers:
/// - product_id
/// - selected variation options (group id + option ids, sorted)
/// - addons (addon id + count, sorted)
/// - extras and excluded options (sorted)
/// - notes, trimmed (blank notes count as no notes)
///
/// Prices are not part of the key.
pub fn compute_line_key(
    product_id: &str,
    variations: &VariationSelections,
    addons: &[SelectedAddon],
    extras: &[SelectedExtra],
    excluded: &[String],
    notes: Option<&str>,
) -> String {
    use sha2::{Digest, Sha256};

    let mut hasher = Sha256::new();

    hasher.update(b"p");
    hasher.update(product_id.as_bytes());
    hasher.update([FIELD_SEP]);

    // BTreeMap iterates groups in sorted order already
    for (group_id, options) in variations {
        let mut ids: Vec<&str> = options.iter().map(|o| o.option_id.as_str()).collect();
        ids.sort_unstable();
        hasher.update(b"v");
        hasher.update(group_id.as_bytes());
        for id in ids {
            hasher.update([FIELD_SEP]);
            hasher.update(id.as_bytes());
        }
        hasher.update([FIELD_SEP]);
    }

    let mut addon_ids: Vec<(&str, u32)> = addons
        .iter()
        .map(|a| (a.addon_id.as_str(), a.quantity))
        .collect();
    addon_ids.sort_unstable();
    for (id, quantity) in addon_ids {
        hasher.update(b"a");
        hasher.update(id.as_bytes());
        hasher.update(quantity.to_be_bytes());
        hasher.update([FIELD_SEP]);
    }

    let mut extra_ids: Vec<&str> = extras.iter().map(|e| e.extra_id.as_str()).collect();
    extra_ids.sort_unstable();
    for id in extra_ids {
        hasher.update(b"e");
        hasher.update(id.as_bytes());
        hasher.update([FIELD_SEP]);
    }

    let mut excluded_ids: Vec<&str> = excluded.iter().map(String::as_str).collect();
    excluded_ids.sort_unstable();
    for id in excluded_ids {
        hasher.update(b"x");
        hasher.update(id.as_bytes());
        hasher.update([FIELD_SEP]);
    }

    if let Some(notes) = notes.map(str::trim).filter(|n| !n.is_empty()) {
        hasher.update(b"n");
        hasher.update(notes.as_bytes());
    }

    let result = hasher.finalize();
    hex::encode(&result[..16])
}

// ============================================================================
// Order Line
// ============================================================================

/// One product entry in a cart
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderLine {
    pub local_id: LocalId,
    /// Empty until the line is persisted remotely; several ids for merged duplicates
    #[serde(default)]
    pub remote_line_ids: Vec<RemoteLineId>,
    pub product_id: String,
    pub name: String,
    pub unit_price: Decimal,
    pub original_unit_price: Decimal,
    pub quantity: Decimal,
    #[serde(default)]
    pub selected_variations: VariationSelections,
    #[serde(default)]
    pub selected_addons: Vec<SelectedAddon>,
    #[serde(default)]
    pub selected_extras: Vec<SelectedExtra>,
    #[serde(default)]
    pub excluded_option_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default)]
    pub kind: LineKind,
    #[serde(default)]
    pub preparation_status: PreparationStatus,
    #[serde(default)]
    pub weight_tracked: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_tax: Option<Decimal>,
    /// Canonical duplicate-detection key (see [`compute_line_key`])
    pub line_key: String,
}

impl OrderLine {
    pub fn from_candidate(
        local_id: LocalId,
        candidate: LineCandidate,
        quantity: Decimal,
        status: PreparationStatus,
    ) -> Self {
        let line_key = candidate.line_key();
        Self {
            local_id,
            remote_line_ids: Vec::new(),
            product_id: candidate.product_id,
            name: candidate.name,
            original_unit_price: candidate.original_unit_price.unwrap_or(candidate.unit_price),
            unit_price: candidate.unit_price,
            quantity,
            selected_variations: candidate.selected_variations,
            selected_addons: candidate.selected_addons,
            selected_extras: candidate.selected_extras,
            excluded_option_ids: candidate.excluded_option_ids,
            notes: candidate.notes,
            kind: candidate.kind,
            preparation_status: status,
            weight_tracked: candidate.weight_tracked,
            item_tax: candidate.item_tax,
            line_key,
        }
    }

    /// Per-unit price delta of all selected variations, extras and addons
    pub fn modifiers_total(&self) -> Decimal {
        let variations: Decimal = self
            .selected_variations
            .values()
            .flatten()
            .map(|o| o.price_delta)
            .sum();
        let extras: Decimal = self.selected_extras.iter().map(|e| e.price).sum();
        let addons: Decimal = self
            .selected_addons
            .iter()
            .map(|a| a.unit_price * Decimal::from(a.quantity))
            .sum();
        variations + extras + addons
    }

    /// Only regular lines merge with duplicates
    pub fn is_mergeable(&self) -> bool {
        self.kind == LineKind::Regular
    }

    pub fn has_remote_ids(&self) -> bool {
        !self.remote_line_ids.is_empty()
    }

    /// Smallest quantity a line may hold after a decrement
    pub fn min_quantity(&self) -> Decimal {
        if self.weight_tracked {
            Decimal::ZERO
        } else {
            Decimal::ONE
        }
    }

    /// Whether `quantity` satisfies the line's quantity invariant
    pub fn accepts_quantity(&self, quantity: Decimal) -> bool {
        if self.weight_tracked {
            quantity > Decimal::ZERO
        } else {
            quantity >= Decimal::ONE
        }
    }

    pub fn refresh_line_key(&mut self) {
        self.line_key = compute_line_key(
            &self.product_id,
            &self.selected_variations,
            &self.selected_addons,
            &self.selected_extras,
            &self.excluded_option_ids,
            self.notes.as_deref(),
        );
    }

    /// Replace the patched fields in place and recompute the line key
    ///
    /// A quantity that would break the line's quantity invariant is ignored.
    pub fn apply_patch(&mut self, patch: LinePatch) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(price) = patch.unit_price {
            self.unit_price = price;
        }
        if let Some(price) = patch.original_unit_price {
            self.original_unit_price = price;
        }
        if let Some(quantity) = patch.quantity
            && self.accepts_quantity(quantity)
        {
            self.quantity = quantity;
        }
        if let Some(variations) = patch.selected_variations {
            self.selected_variations = variations;
        }
        if let Some(addons) = patch.selected_addons {
            self.selected_addons = addons;
        }
        if let Some(extras) = patch.selected_extras {
            self.selected_extras = extras;
        }
        if let Some(excluded) = patch.excluded_option_ids {
            self.excluded_option_ids = excluded;
        }
        if let Some(notes) = patch.notes {
            self.notes = notes;
        }
        self.refresh_line_key();
    }
}

/// Field replacements for an already-added line
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LinePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit_price: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_unit_price: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected_variations: Option<VariationSelections>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected_addons: Option<Vec<SelectedAddon>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected_extras: Option<Vec<SelectedExtra>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub excluded_option_ids: Option<Vec<String>>,
    /// `Some(None)` clears the notes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<Option<String>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn burger() -> LineCandidate {
        LineCandidate::new("p-burger", "Burger", Decimal::new(1250, 2))
            .with_variation(
                "size",
                vec![PricedOption::new("large", Decimal::new(200, 2))],
            )
            .with_addon("cheese", 2, Decimal::new(50, 2))
            .with_excluded("onion")
    }

    #[test]
    fn test_key_stable_across_calls() {
        assert_eq!(burger().line_key(), burger().line_key());
        assert_eq!(burger().line_key().len(), 32);
    }

    #[test]
    fn test_key_ignores_selection_order_and_note_whitespace() {
        let a = burger()
            .with_extra("bacon", Decimal::ONE)
            .with_extra("egg", Decimal::ONE)
            .with_notes("no salt");
        let b = burger()
            .with_extra("egg", Decimal::ONE)
            .with_extra("bacon", Decimal::ONE)
            .with_notes("  no salt ");
        assert_eq!(a.line_key(), b.line_key());
    }

    #[test]
    fn test_key_differs_on_customization() {
        let base = burger().line_key();
        assert_ne!(base, burger().with_notes("well done").line_key());
        assert_ne!(base, burger().with_excluded("pickles").line_key());
        assert_ne!(
            base,
            burger().with_addon("cheese", 1, Decimal::ZERO).line_key()
        );
        let mut other_product = burger();
        other_product.product_id = "p-chicken".into();
        assert_ne!(base, other_product.line_key());
    }

    #[test]
    fn test_blank_notes_equal_no_notes() {
        assert_eq!(burger().line_key(), burger().with_notes("   ").line_key());
    }

    #[test]
    fn test_modifiers_total() {
        let line = OrderLine::from_candidate(
            LocalId(1),
            burger().with_extra("bacon", Decimal::new(150, 2)),
            Decimal::ONE,
            PreparationStatus::Pending,
        );
        // 2.00 size + 1.50 bacon + 2 × 0.50 cheese
        assert_eq!(line.modifiers_total(), Decimal::new(450, 2));
        assert_eq!(line.original_unit_price, line.unit_price);
    }

    #[test]
    fn test_patch_recomputes_key_and_guards_quantity() {
        let mut line = OrderLine::from_candidate(
            LocalId(1),
            burger(),
            Decimal::from(2),
            PreparationStatus::Pending,
        );
        let before = line.line_key.clone();
        line.apply_patch(LinePatch {
            notes: Some(Some("extra crispy".into())),
            quantity: Some(Decimal::ZERO),
            ..Default::default()
        });
        assert_ne!(line.line_key, before);
        assert_eq!(line.quantity, Decimal::from(2));
        assert_eq!(line.notes.as_deref(), Some("extra crispy"));
    }

    #[test]
    fn test_weight_lines_accept_fractional_quantity() {
        let line = OrderLine::from_candidate(
            LocalId(3),
            LineCandidate::new("p-cheese", "Cheese", Decimal::from(18)).weighed(),
            Decimal::new(250, 3),
            PreparationStatus::NotTracked,
        );
        assert!(line.accepts_quantity(Decimal::new(1, 3)));
        assert!(!line.accepts_quantity(Decimal::ZERO));
        assert_eq!(line.min_quantity(), Decimal::ZERO);
    }
}

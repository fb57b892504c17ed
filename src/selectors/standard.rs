//! The configurator's standard selectors, addressable by name.

use super::Selector;
use crate::reducers::{price_lines, PriceLine};
use crate::state::{Catalog, Pricing, Progress, SelectionSet, Selections, State};
use crate::types::Discount;
use serde::Serialize;
use std::sync::Arc;

/// A reason the current step cannot be completed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ValidationIssue {
    pub field: String,
    pub message: String,
}

impl ValidationIssue {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Everything the quote summary panel renders.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct QuoteSummary {
    pub package: Option<String>,
    pub lines: Vec<PriceLine>,
    pub subtotal: u64,
    pub discount: Option<Discount>,
    pub final_price: u64,
    pub item_count: usize,
    pub progress_percentage: u8,
}

/// Standard selector set.
///
/// Region selectors hand out the state's own sub-trees; the rest are
/// combined selectors layered on top of them.
pub struct Selectors {
    pub selections: Arc<Selector<Selections>>,
    pub pricing: Arc<Selector<Pricing>>,
    pub progress: Arc<Selector<Progress>>,
    pub catalog: Arc<Selector<Catalog>>,
    pub selected_item_count: Arc<Selector<usize>>,
    pub price_breakdown: Arc<Selector<Vec<PriceLine>>>,
    pub subtotal: Arc<Selector<u64>>,
    pub final_price: Arc<Selector<u64>>,
    pub progress_percentage: Arc<Selector<u8>>,
    pub validation_errors: Arc<Selector<Vec<ValidationIssue>>>,
    pub can_proceed: Arc<Selector<bool>>,
    pub quote_summary: Arc<Selector<QuoteSummary>>,
}

impl Selectors {
    /// Names accepted by [`Selectors::evaluate`].
    pub const NAMES: [&'static str; 8] = [
        "selected_item_count",
        "price_breakdown",
        "subtotal",
        "final_price",
        "progress_percentage",
        "validation_errors",
        "can_proceed",
        "quote_summary",
    ];

    pub fn new() -> Self {
        let selections = Arc::new(Selector::region("selections", |s: &State| {
            Arc::clone(&s.selections)
        }));
        let pricing = Arc::new(Selector::region("pricing", |s: &State| Arc::clone(&s.pricing)));
        let progress = Arc::new(Selector::region("progress", |s: &State| {
            Arc::clone(&s.progress)
        }));
        let catalog = Arc::new(Selector::region("catalog", |s: &State| Arc::clone(&s.catalog)));

        let selected_item_count = Arc::new(Selector::combine(
            "selected_item_count",
            (Arc::clone(&selections),),
            |(selections,)| {
                selections.set_member_count()
                    + usize::from(selections.package.is_some())
                    + usize::from(selections.emergency_tier.is_some())
            },
        ));

        let price_breakdown = Arc::new(Selector::combine(
            "price_breakdown",
            (Arc::clone(&selections), Arc::clone(&catalog)),
            |(selections, catalog)| price_lines(selections, catalog),
        ));

        let subtotal = Arc::new(Selector::combine(
            "subtotal",
            (Arc::clone(&price_breakdown),),
            |(lines,)| lines.iter().map(|line| line.amount).sum::<u64>(),
        ));

        let final_price = Arc::new(Selector::combine(
            "final_price",
            (Arc::clone(&pricing),),
            |(pricing,)| {
                let discount = pricing.discount.as_ref().map_or(0, |d| d.amount);
                pricing.total_price.saturating_sub(discount)
            },
        ));

        let progress_percentage = Arc::new(Selector::combine(
            "progress_percentage",
            (Arc::clone(&progress),),
            |(progress,)| {
                let total = u64::from(progress.total_steps.max(1));
                let step = u64::from(progress.current_step.min(progress.total_steps));
                ((step * 100 + total / 2) / total) as u8
            },
        ));

        let validation_errors = Arc::new(Selector::combine(
            "validation_errors",
            (
                Arc::clone(&selections),
                Arc::clone(&catalog),
                Arc::clone(&progress),
            ),
            |(selections, catalog, progress)| validate(selections, catalog, progress),
        ));

        let can_proceed = Arc::new(Selector::combine(
            "can_proceed",
            (Arc::clone(&validation_errors),),
            |(issues,)| issues.is_empty(),
        ));

        let quote_summary = Arc::new(Selector::combine(
            "quote_summary",
            (
                Arc::clone(&selections),
                Arc::clone(&pricing),
                Arc::clone(&price_breakdown),
                Arc::clone(&final_price),
                Arc::clone(&progress_percentage),
            ),
            |(selections, pricing, lines, final_price, percentage)| QuoteSummary {
                package: selections.package.clone(),
                lines: (**lines).clone(),
                subtotal: lines.iter().map(|line| line.amount).sum(),
                discount: pricing.discount.clone(),
                final_price: **final_price,
                item_count: selections.set_member_count()
                    + usize::from(selections.package.is_some())
                    + usize::from(selections.emergency_tier.is_some()),
                progress_percentage: **percentage,
            },
        ));

        Self {
            selections,
            pricing,
            progress,
            catalog,
            selected_item_count,
            price_breakdown,
            subtotal,
            final_price,
            progress_percentage,
            validation_errors,
            can_proceed,
            quote_summary,
        }
    }

    /// Evaluate a derived selector by name, as JSON.
    ///
    /// Returns `None` for names outside [`Selectors::NAMES`].
    pub fn evaluate(&self, name: &str, state: &Arc<State>) -> Option<serde_json::Value> {
        let value = match name {
            "selected_item_count" => serde_json::to_value(*self.selected_item_count.select(state)),
            "price_breakdown" => serde_json::to_value(&*self.price_breakdown.select(state)),
            "subtotal" => serde_json::to_value(*self.subtotal.select(state)),
            "final_price" => serde_json::to_value(*self.final_price.select(state)),
            "progress_percentage" => serde_json::to_value(*self.progress_percentage.select(state)),
            "validation_errors" => serde_json::to_value(&*self.validation_errors.select(state)),
            "can_proceed" => serde_json::to_value(*self.can_proceed.select(state)),
            "quote_summary" => serde_json::to_value(&*self.quote_summary.select(state)),
            _ => return None,
        };
        value.ok()
    }
}

impl Default for Selectors {
    fn default() -> Self {
        Self::new()
    }
}

fn validate(selections: &Selections, catalog: &Catalog, progress: &Progress) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();

    match selections.package.as_deref() {
        None => issues.push(ValidationIssue::new("package", "Select a package")),
        Some(id) if !catalog.is_empty() && catalog.package(id).is_none() => {
            issues.push(ValidationIssue::new("package", format!("Unknown package '{id}'")))
        }
        Some(_) => {}
    }

    if progress.current_step >= 2 && selections.service_area.is_none() {
        issues.push(ValidationIssue::new("service_area", "Select a service area"));
    }

    if catalog.is_empty() {
        return issues;
    }

    if let Some(area) = selections.service_area.as_deref() {
        if catalog.service_area(area).is_none() {
            issues.push(ValidationIssue::new(
                "service_area",
                format!("Unknown service area '{area}'"),
            ));
        }
    }
    if let Some(tier) = selections.emergency_tier.as_deref() {
        if catalog.emergency_tier(tier).is_none() {
            issues.push(ValidationIssue::new(
                "emergency_tier",
                format!("Unknown emergency tier '{tier}'"),
            ));
        }
    }
    for set in SelectionSet::ALL {
        for id in selections.set(set).iter() {
            if catalog.item(set, id).is_none() {
                issues.push(ValidationIssue::new(
                    set.as_str(),
                    format!("Unknown selection '{id}'"),
                ));
            }
        }
    }

    issues
}

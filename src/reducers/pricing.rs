//! Price recomputation and discounts.

use super::derive;
use crate::actions::Action;
use crate::error::{Result, StoreError};
use crate::state::{Catalog, Pricing, SelectionSet, Selections, State};
use crate::types::Discount;
use serde::Serialize;
use std::sync::Arc;

/// Where a price line comes from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceSource {
    Package,
    Selection(SelectionSet),
    Emergency,
    ServiceArea,
}

/// One priced entry of a quote.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PriceLine {
    pub source: PriceSource,
    pub id: String,
    pub name: String,
    pub amount: u64,
}

/// Itemize the current selections against the catalog.
///
/// Ids the catalog does not know contribute nothing.
pub fn price_lines(selections: &Selections, catalog: &Catalog) -> Vec<PriceLine> {
    let mut lines = Vec::new();

    if let Some(package) = selections.package.as_deref().and_then(|id| catalog.package(id)) {
        lines.push(PriceLine {
            source: PriceSource::Package,
            id: package.id.clone(),
            name: package.name.clone(),
            amount: package.base_price,
        });
    }

    for set in SelectionSet::ALL {
        for id in selections.set(set).iter() {
            if let Some(item) = catalog.item(set, id) {
                lines.push(PriceLine {
                    source: PriceSource::Selection(set),
                    id: item.id.clone(),
                    name: item.name.clone(),
                    amount: item.price,
                });
            }
        }
    }

    if let Some(tier) = selections
        .emergency_tier
        .as_deref()
        .and_then(|id| catalog.emergency_tier(id))
    {
        lines.push(PriceLine {
            source: PriceSource::Emergency,
            id: tier.id.clone(),
            name: tier.name.clone(),
            amount: tier.price,
        });
    }

    if let Some(area) = selections
        .service_area
        .as_deref()
        .and_then(|id| catalog.service_area(id))
    {
        if area.surcharge > 0 {
            lines.push(PriceLine {
                source: PriceSource::ServiceArea,
                id: area.id.clone(),
                name: area.name.clone(),
                amount: area.surcharge,
            });
        }
    }

    lines
}

pub(super) fn reduce(state: &Arc<State>, action: &Action) -> Result<Arc<State>> {
    let pricing = &state.pricing;
    let next = match action {
        Action::CalculatePrice => {
            let total_price = price_lines(&state.selections, &state.catalog)
                .iter()
                .map(|line| line.amount)
                .sum();
            if total_price == pricing.total_price {
                return Ok(Arc::clone(state));
            }
            tracing::debug!(from = pricing.total_price, to = total_price, "price recalculated");
            Pricing {
                total_price,
                ..(**pricing).clone()
            }
        }
        Action::ApplyDiscount { code, amount } => {
            if code.trim().is_empty() {
                return Err(StoreError::reducer(action.kind(), "empty discount code"));
            }
            let discount = Discount {
                code: code.clone(),
                amount: *amount,
            };
            if pricing.discount.as_ref() == Some(&discount) {
                return Ok(Arc::clone(state));
            }
            Pricing {
                discount: Some(discount),
                ..(**pricing).clone()
            }
        }
        Action::RemoveDiscount => {
            if pricing.discount.is_none() {
                return Ok(Arc::clone(state));
            }
            Pricing {
                discount: None,
                ..(**pricing).clone()
            }
        }
        _ => return Ok(Arc::clone(state)),
    };

    Ok(derive(state, |s| s.pricing = Arc::new(next)))
}

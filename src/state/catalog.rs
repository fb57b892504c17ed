//! Read-only reference data the configurator prices against.

use super::SelectionSet;
use serde::{Deserialize, Serialize};

/// Anything in the catalog addressed by an opaque string id.
pub trait Identified {
    fn id(&self) -> &str;
}

/// A priced catalog entry (feature, add-on, component, service option, tier).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogItem {
    pub id: String,
    pub name: String,
    pub price: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl CatalogItem {
    pub fn new(id: impl Into<String>, name: impl Into<String>, price: u64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            price,
            description: None,
        }
    }
}

/// A base package the quote is built on.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Package {
    pub id: String,
    pub name: String,
    pub base_price: u64,
    #[serde(default)]
    pub included_features: Vec<String>,
}

impl Package {
    pub fn new(id: impl Into<String>, name: impl Into<String>, base_price: u64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            base_price,
            included_features: Vec::new(),
        }
    }
}

/// A service area with an optional travel surcharge.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceArea {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub surcharge: u64,
}

impl ServiceArea {
    pub fn new(id: impl Into<String>, name: impl Into<String>, surcharge: u64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            surcharge,
        }
    }
}

impl Identified for CatalogItem {
    fn id(&self) -> &str {
        &self.id
    }
}

impl Identified for Package {
    fn id(&self) -> &str {
        &self.id
    }
}

impl Identified for ServiceArea {
    fn id(&self) -> &str {
        &self.id
    }
}

/// Reference data loaded from the catalog boundary.
///
/// Append-only: loading more data only adds unseen ids, existing entries are
/// kept until the catalog is explicitly replaced.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Catalog {
    pub packages: Vec<Package>,
    pub features: Vec<CatalogItem>,
    pub addons: Vec<CatalogItem>,
    pub components: Vec<CatalogItem>,
    pub hvac: Vec<CatalogItem>,
    pub appliances: Vec<CatalogItem>,
    pub contacts: Vec<CatalogItem>,
    pub emergency_tiers: Vec<CatalogItem>,
    pub service_areas: Vec<ServiceArea>,
}

impl Catalog {
    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
            && self.emergency_tiers.is_empty()
            && self.service_areas.is_empty()
            && SelectionSet::ALL.iter().all(|set| self.items(*set).is_empty())
    }

    /// Items backing a set-valued selection.
    pub fn items(&self, set: SelectionSet) -> &[CatalogItem] {
        match set {
            SelectionSet::Features => &self.features,
            SelectionSet::Addons => &self.addons,
            SelectionSet::Components => &self.components,
            SelectionSet::Hvac => &self.hvac,
            SelectionSet::Appliances => &self.appliances,
            SelectionSet::Contacts => &self.contacts,
        }
    }

    pub fn item(&self, set: SelectionSet, id: &str) -> Option<&CatalogItem> {
        self.items(set).iter().find(|item| item.id == id)
    }

    pub fn package(&self, id: &str) -> Option<&Package> {
        self.packages.iter().find(|p| p.id == id)
    }

    pub fn emergency_tier(&self, id: &str) -> Option<&CatalogItem> {
        self.emergency_tiers.iter().find(|t| t.id == id)
    }

    pub fn service_area(&self, id: &str) -> Option<&ServiceArea> {
        self.service_areas.iter().find(|a| a.id == id)
    }

    /// Merge `incoming` into a copy of this catalog.
    ///
    /// Returns `None` when `incoming` carries no unseen ids.
    pub fn merged(&self, incoming: &Catalog) -> Option<Catalog> {
        let mut next = self.clone();
        let mut added = 0;
        added += append_new(&mut next.packages, &incoming.packages);
        added += append_new(&mut next.features, &incoming.features);
        added += append_new(&mut next.addons, &incoming.addons);
        added += append_new(&mut next.components, &incoming.components);
        added += append_new(&mut next.hvac, &incoming.hvac);
        added += append_new(&mut next.appliances, &incoming.appliances);
        added += append_new(&mut next.contacts, &incoming.contacts);
        added += append_new(&mut next.emergency_tiers, &incoming.emergency_tiers);
        added += append_new(&mut next.service_areas, &incoming.service_areas);

        (added > 0).then_some(next)
    }
}

fn append_new<T: Identified + Clone>(target: &mut Vec<T>, incoming: &[T]) -> usize {
    let mut added = 0;
    for item in incoming {
        if !target.iter().any(|existing| existing.id() == item.id()) {
            target.push(item.clone());
            added += 1;
        }
    }
    added
}

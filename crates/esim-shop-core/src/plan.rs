//! Data plans and the catalog checkout resolves them from.

use serde::{Deserialize, Serialize};

/// Identifier of the generic plan used when a requested plan is unknown.
pub const FALLBACK_PLAN_ID: &str = "default";

/// An eSIM data plan as sold in the storefront.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
    /// Catalog identifier (e.g. `japan-3gb`).
    pub id: String,
    /// Display name.
    pub name: String,
    /// Data allowance label (e.g. `3GB`).
    pub data: String,
    /// Validity label (e.g. `15 days`).
    pub duration: String,
    /// Price in cents.
    pub price_cents: i64,
    /// Countries or regions covered; never empty.
    pub countries: Vec<String>,
    /// Flag glyph shown next to the name.
    pub flag: String,
}

impl Plan {
    #[allow(clippy::too_many_arguments)]
    fn new(
        id: &str,
        name: &str,
        data: &str,
        duration: &str,
        price_cents: i64,
        countries: &[&str],
        flag: &str,
    ) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            data: data.to_string(),
            duration: duration.to_string(),
            price_cents,
            countries: countries.iter().map(ToString::to_string).collect(),
            flag: flag.to_string(),
        }
    }

    /// The generic plan offered when the requested one cannot be resolved.
    #[must_use]
    pub fn fallback() -> Self {
        Self::new(
            FALLBACK_PLAN_ID,
            "eSIM Data Plan",
            "3GB",
            "15 days",
            1999,
            &["Global"],
            "🌎",
        )
    }

    /// Price formatted as dollars, e.g. `$19.99`.
    #[must_use]
    pub fn price_formatted(&self) -> String {
        format_cents(self.price_cents)
    }
}

/// Format an amount in cents as dollars with two decimals.
#[must_use]
pub fn format_cents(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    format!("{sign}${}.{:02}", abs / 100, abs % 100)
}

/// The set of plans checkout can start from.
#[derive(Debug, Clone)]
pub struct PlanCatalog {
    plans: Vec<Plan>,
    fallback: Plan,
}

impl PlanCatalog {
    /// A catalog over the given plans with the standard fallback.
    #[must_use]
    pub fn new(plans: Vec<Plan>) -> Self {
        Self {
            plans,
            fallback: Plan::fallback(),
        }
    }

    /// All plans offered for direct checkout.
    #[must_use]
    pub fn plans(&self) -> &[Plan] {
        &self.plans
    }

    /// Look a plan up by id without falling back.
    #[must_use]
    pub fn get(&self, plan_id: &str) -> Option<&Plan> {
        self.plans.iter().find(|p| p.id == plan_id)
    }

    /// Resolve the plan a checkout starts from.
    ///
    /// Missing or unknown identifiers resolve to the fallback plan; this never fails.
    #[must_use]
    pub fn resolve(&self, plan_id: Option<&str>) -> Plan {
        match plan_id.and_then(|id| self.get(id)) {
            Some(plan) => plan.clone(),
            None => {
                tracing::debug!(plan_id = ?plan_id, "Plan not in catalog, using fallback plan");
                self.fallback.clone()
            }
        }
    }
}

impl Default for PlanCatalog {
    fn default() -> Self {
        Self::new(vec![
            Plan::new(
                "japan-3gb",
                "Japan Travel",
                "3GB",
                "15 days",
                1999,
                &["Japan"],
                "🇯🇵",
            ),
            Plan::new(
                "global-10gb",
                "Global Plus",
                "10GB",
                "30 days",
                5999,
                &["Global (170+ countries)"],
                "🌎",
            ),
            Plan::new(
                "us-5gb",
                "US Travel",
                "5GB",
                "15 days",
                2499,
                &["United States"],
                "🇺🇸",
            ),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_known_plan() {
        let catalog = PlanCatalog::default();
        let plan = catalog.resolve(Some("global-10gb"));
        assert_eq!(plan.name, "Global Plus");
        assert_eq!(plan.price_cents, 5999);
    }

    #[test]
    fn unknown_or_missing_plan_falls_back() {
        let catalog = PlanCatalog::default();
        assert_eq!(catalog.resolve(Some("mars-1tb")).id, FALLBACK_PLAN_ID);
        assert_eq!(catalog.resolve(None), Plan::fallback());
        assert!(catalog.get("mars-1tb").is_none());
    }

    #[test]
    fn every_plan_covers_somewhere() {
        let catalog = PlanCatalog::default();
        assert!(catalog.plans().iter().all(|p| !p.countries.is_empty()));
        assert!(!Plan::fallback().countries.is_empty());
    }

    #[test]
    fn cents_formatting() {
        assert_eq!(format_cents(1999), "$19.99");
        assert_eq!(format_cents(200), "$2.00");
        assert_eq!(format_cents(5), "$0.05");
        assert_eq!(format_cents(-150), "-$1.50");
        assert_eq!(Plan::fallback().price_formatted(), "$19.99");
    }
}

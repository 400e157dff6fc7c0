/// Plan catalog
///
/// Immutable registry of subscription plans, their prices and quota limits.
/// The catalog is built once at startup, validated at construction (every
/// [`PlanId`] present exactly once, every [`ResourceKind`] limited on every
/// plan, exactly one trial plan) and then shared read-only through `Arc`
/// without locking.
///
/// # Built-in Plans
///
/// | plan         | $/mo | $/yr | logos     | brand assets | downloads | projects  |
/// |--------------|------|------|-----------|--------------|-----------|-----------|
/// | trial        | 0    | 0    | 100       | 75           | 200       | 25        |
/// | free         | 0    | 0    | 15        | 10           | 20        | 5         |
/// | starter      | 19   | 190  | 100       | 75           | 200       | 25        |
/// | professional | 49   | 490  | 500       | 400          | 1000      | 100       |
/// | agency       | 99   | 990  | unlimited | unlimited    | unlimited | unlimited |
///
/// | plan         | seats     | AI queue | white-label | analytics  |
/// |--------------|-----------|----------|-------------|------------|
/// | trial        | 3         | priority | no          | advanced   |
/// | free         | 1         | standard | no          | basic      |
/// | starter      | 3         | priority | no          | advanced   |
/// | professional | 10        | priority | yes         | advanced   |
/// | agency       | unlimited | priority | yes         | enterprise |
///
/// # Example
///
/// ```
/// use brandai_shared::catalog::PlanCatalog;
/// use brandai_shared::models::plan::{Limit, PlanId, ResourceKind};
///
/// let catalog = PlanCatalog::builtin();
/// let free = catalog.get("free").unwrap();
/// assert_eq!(catalog.limit_for(free, ResourceKind::LogoGeneration), Limit::Bounded(15));
/// assert_eq!(catalog.default_trial_plan().id, PlanId::Trial);
/// assert!(catalog.get("platinum").is_err());
/// ```

use crate::models::plan::{
    AiProcessing, AnalyticsTier, Feature, Limit, Plan, PlanFeatures, PlanId, PlanPrice, PlanView,
    ResourceKind,
};
use std::collections::BTreeMap;

/// Catalog lookup and construction errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CatalogError {
    /// No plan with this identifier
    #[error("Plan not found: {0}")]
    PlanNotFound(String),

    /// A plan identifier has no catalog entry
    #[error("Catalog is missing plan {0}")]
    MissingPlan(PlanId),

    /// A plan identifier appears more than once
    #[error("Catalog lists plan {0} more than once")]
    DuplicatePlan(PlanId),

    /// A plan has no limit for a resource kind
    #[error("Plan {plan} has no limit for {kind}")]
    MissingLimit { plan: PlanId, kind: ResourceKind },

    /// The trial flag is not set on exactly the trial plan
    #[error("Exactly the trial plan must be flagged as trial")]
    TrialMisconfigured,
}

/// Read-only plan registry
#[derive(Debug, Clone)]
pub struct PlanCatalog {
    /// Plans in `PlanId::ALL` order
    plans: [Plan; 5],
}

fn slot(id: PlanId) -> usize {
    match id {
        PlanId::Trial => 0,
        PlanId::Free => 1,
        PlanId::Starter => 2,
        PlanId::Professional => 3,
        PlanId::Agency => 4,
    }
}

impl PlanCatalog {
    /// Builds a catalog from plan definitions
    ///
    /// # Errors
    ///
    /// Returns a [`CatalogError`] describing the first structural problem found
    pub fn new(plans: Vec<Plan>) -> Result<Self, CatalogError> {
        let mut by_id: BTreeMap<PlanId, Plan> = BTreeMap::new();

        for plan in plans {
            for kind in ResourceKind::ALL {
                if !plan.limits.contains_key(&kind) {
                    return Err(CatalogError::MissingLimit { plan: plan.id, kind });
                }
            }
            if plan.is_trial != (plan.id == PlanId::Trial) {
                return Err(CatalogError::TrialMisconfigured);
            }
            let id = plan.id;
            if by_id.insert(id, plan).is_some() {
                return Err(CatalogError::DuplicatePlan(id));
            }
        }

        let mut ordered = Vec::with_capacity(PlanId::ALL.len());
        for id in PlanId::ALL {
            let plan = by_id.remove(&id).ok_or(CatalogError::MissingPlan(id))?;
            ordered.push(plan);
        }

        let plans: [Plan; 5] = ordered
            .try_into()
            .map_err(|_| CatalogError::TrialMisconfigured)?;

        tracing::debug!(plans = plans.len(), "Plan catalog loaded");

        Ok(PlanCatalog { plans })
    }

    /// The built-in product catalog
    pub fn builtin() -> Self {
        let starter_features = PlanFeatures {
            collaborators: Limit::Bounded(3),
            ai_processing: AiProcessing::Priority,
            white_label: false,
            analytics: AnalyticsTier::Advanced,
        };
        let starter_highlights = [
            "100 logo generations/month",
            "75 brand assets/month",
            "200 downloads/month",
            "25 projects",
            "All templates",
            "Priority AI processing",
            "HD downloads",
            "Basic analytics",
        ];

        PlanCatalog {
            plans: [
                plan(
                    PlanId::Trial,
                    "Trial",
                    "Full starter features while you evaluate",
                    (0, 0),
                    [100, 75, 200, 25].map(Limit::Bounded),
                    true,
                )
                .with_features(starter_features)
                .with_copy(&starter_highlights, &["Moves to Free when the trial ends"]),
                plan(
                    PlanId::Free,
                    "Free",
                    "Perfect for getting started",
                    (0, 0),
                    [15, 10, 20, 5].map(Limit::Bounded),
                    false,
                )
                .with_copy(
                    &[
                        "15 logo generations/month",
                        "10 brand assets/month",
                        "20 downloads/month",
                        "5 projects",
                        "Basic templates",
                        "Standard AI processing",
                    ],
                    &[
                        "Watermarked downloads",
                        "No collaboration features",
                        "Limited export formats",
                    ],
                ),
                plan(
                    PlanId::Starter,
                    "Starter",
                    "Great for small businesses",
                    (19, 190),
                    [100, 75, 200, 25].map(Limit::Bounded),
                    false,
                )
                .with_features(starter_features)
                .with_copy(&starter_highlights, &["Up to 3 collaborators"])
                .marked_popular(),
                plan(
                    PlanId::Professional,
                    "Professional",
                    "For growing businesses",
                    (49, 490),
                    [500, 400, 1000, 100].map(Limit::Bounded),
                    false,
                )
                .with_features(PlanFeatures {
                    collaborators: Limit::Bounded(10),
                    ai_processing: AiProcessing::Priority,
                    white_label: true,
                    analytics: AnalyticsTier::Advanced,
                })
                .with_copy(
                    &[
                        "500 logo generations/month",
                        "400 brand assets/month",
                        "1000 downloads/month",
                        "100 projects",
                        "All templates + premium",
                        "Priority AI processing",
                        "White-label options",
                        "Advanced analytics",
                        "Version history",
                        "Brand consistency checker",
                    ],
                    &["Up to 10 collaborators"],
                ),
                plan(
                    PlanId::Agency,
                    "Agency",
                    "For agencies & enterprises",
                    (99, 990),
                    [Limit::Unlimited; 4],
                    false,
                )
                .with_features(PlanFeatures {
                    collaborators: Limit::Unlimited,
                    ai_processing: AiProcessing::Priority,
                    white_label: true,
                    analytics: AnalyticsTier::Enterprise,
                })
                .with_copy(
                    &[
                        "Unlimited generations",
                        "Unlimited brand assets",
                        "Unlimited downloads",
                        "Unlimited projects",
                        "Custom templates",
                        "Priority AI processing",
                        "Full white-label",
                        "Enterprise analytics",
                        "Custom integrations",
                        "Dedicated support",
                    ],
                    &[],
                ),
            ],
        }
    }

    /// Looks up a plan by its wire identifier
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::PlanNotFound` for unknown identifiers
    pub fn get(&self, plan_id: &str) -> Result<&Plan, CatalogError> {
        PlanId::parse(plan_id)
            .map(|id| self.plan(id))
            .ok_or_else(|| CatalogError::PlanNotFound(plan_id.to_string()))
    }

    /// Looks up a plan by typed identifier
    pub fn plan(&self, id: PlanId) -> &Plan {
        &self.plans[slot(id)]
    }

    /// Plan granted at signup
    pub fn default_trial_plan(&self) -> &Plan {
        self.plan(PlanId::Trial)
    }

    /// Plan an elapsed trial falls back to
    pub fn free_plan(&self) -> &Plan {
        self.plan(PlanId::Free)
    }

    /// Limit for a resource kind on a plan
    pub fn limit_for(&self, plan: &Plan, kind: ResourceKind) -> Limit {
        plan.limit(kind)
    }

    /// Whether a plan includes a gated feature
    pub fn has_feature(&self, id: PlanId, feature: Feature) -> bool {
        self.plan(id).has_feature(feature)
    }

    /// Feature set of a plan
    pub fn features_for(&self, id: PlanId) -> PlanFeatures {
        self.plan(id).features
    }

    /// All plans in display order
    pub fn plans(&self) -> impl Iterator<Item = &Plan> {
        self.plans.iter()
    }

    /// Display views of all plans
    pub fn views(&self) -> Vec<PlanView> {
        self.plans.iter().map(PlanView::from).collect()
    }
}

fn plan(
    id: PlanId,
    name: &str,
    description: &str,
    (monthly, yearly): (u32, u32),
    limits: [Limit; 4],
    is_trial: bool,
) -> Plan {
    Plan {
        id,
        name: name.to_string(),
        description: description.to_string(),
        price: PlanPrice { monthly, yearly },
        limits: ResourceKind::ALL.into_iter().zip(limits).collect(),
        features: PlanFeatures::default(),
        highlights: Vec::new(),
        limitations: Vec::new(),
        popular: false,
        is_trial,
    }
}

impl Plan {
    fn with_features(mut self, features: PlanFeatures) -> Self {
        self.features = features;
        self
    }

    fn with_copy(mut self, highlights: &[&str], limitations: &[&str]) -> Self {
        self.highlights = highlights.iter().map(|line| line.to_string()).collect();
        self.limitations = limitations.iter().map(|line| line.to_string()).collect();
        self
    }

    fn marked_popular(mut self) -> Self {
        self.popular = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_catalog_is_valid() {
        let builtin = PlanCatalog::builtin();
        let rebuilt = PlanCatalog::new(builtin.plans().cloned().collect());
        assert!(rebuilt.is_ok(), "{:?}", rebuilt.err());
    }

    #[test]
    fn test_builtin_free_limits() {
        let catalog = PlanCatalog::builtin();
        let free = catalog.free_plan();
        assert_eq!(free.limit(ResourceKind::LogoGeneration), Limit::Bounded(15));
        assert_eq!(free.limit(ResourceKind::BrandAsset), Limit::Bounded(10));
        assert_eq!(free.limit(ResourceKind::Download), Limit::Bounded(20));
        assert_eq!(free.limit(ResourceKind::Project), Limit::Bounded(5));
    }

    #[test]
    fn test_builtin_professional_and_agency() {
        let catalog = PlanCatalog::builtin();
        let pro = catalog.get("professional").unwrap();
        assert_eq!(pro.price.monthly, 49);
        assert_eq!(pro.price.yearly, 490);
        assert_eq!(catalog.limit_for(pro, ResourceKind::LogoGeneration), Limit::Bounded(500));

        let agency = catalog.plan(PlanId::Agency);
        for kind in ResourceKind::ALL {
            assert!(agency.limit(kind).is_unlimited());
        }
    }

    #[test]
    fn test_plan_lookup_by_typed_id_matches() {
        let catalog = PlanCatalog::builtin();
        for id in PlanId::ALL {
            assert_eq!(catalog.plan(id).id, id);
        }
    }

    #[test]
    fn test_unknown_plan() {
        let catalog = PlanCatalog::builtin();
        assert_eq!(
            catalog.get("premium").unwrap_err(),
            CatalogError::PlanNotFound("premium".to_string())
        );
    }

    #[test]
    fn test_new_rejects_missing_plan() {
        let plans: Vec<Plan> = PlanCatalog::builtin()
            .plans()
            .filter(|p| p.id != PlanId::Starter)
            .cloned()
            .collect();
        assert_eq!(
            PlanCatalog::new(plans).unwrap_err(),
            CatalogError::MissingPlan(PlanId::Starter)
        );
    }

    #[test]
    fn test_new_rejects_duplicate_plan() {
        let mut plans: Vec<Plan> = PlanCatalog::builtin().plans().cloned().collect();
        plans.push(plans[1].clone());
        assert_eq!(
            PlanCatalog::new(plans).unwrap_err(),
            CatalogError::DuplicatePlan(PlanId::Free)
        );
    }

    #[test]
    fn test_new_rejects_missing_limit() {
        let mut plans: Vec<Plan> = PlanCatalog::builtin().plans().cloned().collect();
        plans[3].limits.remove(&ResourceKind::Download);
        assert_eq!(
            PlanCatalog::new(plans).unwrap_err(),
            CatalogError::MissingLimit {
                plan: PlanId::Professional,
                kind: ResourceKind::Download,
            }
        );
    }

    #[test]
    fn test_new_rejects_second_trial() {
        let mut plans: Vec<Plan> = PlanCatalog::builtin().plans().cloned().collect();
        plans[1].is_trial = true;
        assert_eq!(PlanCatalog::new(plans).unwrap_err(), CatalogError::TrialMisconfigured);
    }

    #[test]
    fn test_views_serialize() {
        let views = PlanCatalog::builtin().views();
        assert_eq!(views.len(), 5);

        let json = serde_json::to_value(&views[4]).unwrap();
        assert_eq!(json["planId"], "agency");
        assert_eq!(json["limits"]["logoGeneration"], "unlimited");
        assert_eq!(json["price"]["monthly"], 99);
        assert_eq!(json["features"]["collaborators"], "unlimited");
        assert_eq!(json["features"]["analytics"], "enterprise");
        assert_eq!(json["popular"], false);
        assert_eq!(json["limitations"], serde_json::json!([]));
    }

    #[test]
    fn test_builtin_features() {
        let catalog = PlanCatalog::builtin();

        let free = catalog.features_for(PlanId::Free);
        assert_eq!(free.collaborators, Limit::Bounded(1));
        assert_eq!(free.ai_processing, AiProcessing::Standard);
        assert!(!catalog.has_feature(PlanId::Free, Feature::PriorityProcessing));
        assert!(!catalog.has_feature(PlanId::Free, Feature::AdvancedAnalytics));

        assert_eq!(catalog.features_for(PlanId::Starter).collaborators, Limit::Bounded(3));
        assert!(catalog.has_feature(PlanId::Starter, Feature::PriorityProcessing));
        assert!(!catalog.has_feature(PlanId::Starter, Feature::WhiteLabel));

        assert_eq!(
            catalog.features_for(PlanId::Professional).collaborators,
            Limit::Bounded(10)
        );
        assert!(catalog.has_feature(PlanId::Professional, Feature::WhiteLabel));
        assert!(!catalog.has_feature(PlanId::Professional, Feature::EnterpriseAnalytics));

        assert!(catalog.features_for(PlanId::Agency).collaborators.is_unlimited());
        assert!(catalog.has_feature(PlanId::Agency, Feature::EnterpriseAnalytics));

        assert_eq!(
            catalog.features_for(PlanId::Trial),
            catalog.features_for(PlanId::Starter)
        );
    }

    #[test]
    fn test_builtin_pricing_copy() {
        let catalog = PlanCatalog::builtin();

        let popular: Vec<PlanId> = catalog.plans().filter(|p| p.popular).map(|p| p.id).collect();
        assert_eq!(popular, vec![PlanId::Starter]);

        let free = catalog.free_plan();
        assert_eq!(free.highlights.len(), 6);
        assert!(free.limitations.contains(&"Watermarked downloads".to_string()));
        assert!(catalog.plan(PlanId::Agency).limitations.is_empty());
    }
}

/// Plan, limit, and resource types
///
/// Plans are identified by the typed [`PlanId`] enum so an unknown plan can
/// only appear at the string boundary (`PlanId::parse`), never inside an
/// account record. Quota limits use the [`Limit`] sum type instead of a
/// numeric sentinel.
///
/// # Example
///
/// ```
/// use brandai_shared::models::plan::{Limit, PlanId, ResourceKind};
///
/// assert_eq!(PlanId::parse("professional"), Some(PlanId::Professional));
/// assert_eq!(PlanId::parse("gold"), None);
///
/// let limit = Limit::Bounded(15);
/// assert!(limit.allows(14, 1));
/// assert!(!limit.allows(15, 1));
/// assert!(Limit::Unlimited.allows(u32::MAX, 1));
///
/// assert_eq!(ResourceKind::LogoGeneration.as_str(), "logoGeneration");
/// ```

use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// Subscription plan identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanId {
    /// Time-bounded plan granted at signup
    Trial,

    /// No-cost plan (where elapsed trials land)
    Free,

    /// Starter plan ($19/month)
    Starter,

    /// Professional plan ($49/month)
    Professional,

    /// Agency plan ($99/month, unlimited usage)
    Agency,
}

impl PlanId {
    /// Every plan, in display order
    pub const ALL: [PlanId; 5] = [
        PlanId::Trial,
        PlanId::Free,
        PlanId::Starter,
        PlanId::Professional,
        PlanId::Agency,
    ];

    /// Converts plan to its wire identifier
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanId::Trial => "trial",
            PlanId::Free => "free",
            PlanId::Starter => "starter",
            PlanId::Professional => "professional",
            PlanId::Agency => "agency",
        }
    }

    /// Parses plan from its wire identifier (case-insensitive)
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "trial" => Some(PlanId::Trial),
            "free" => Some(PlanId::Free),
            "starter" => Some(PlanId::Starter),
            "professional" => Some(PlanId::Professional),
            "agency" => Some(PlanId::Agency),
            _ => None,
        }
    }
}

impl fmt::Display for PlanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Consumable resource gated by plan quotas
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ResourceKind {
    /// Logo generation requests
    LogoGeneration,

    /// Brand assets (slogans, banners, mission statements, ...)
    BrandAsset,

    /// Asset downloads
    Download,

    /// Projects created
    Project,
}

impl ResourceKind {
    /// Every resource kind
    pub const ALL: [ResourceKind; 4] = [
        ResourceKind::LogoGeneration,
        ResourceKind::BrandAsset,
        ResourceKind::Download,
        ResourceKind::Project,
    ];

    /// Wire identifier
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::LogoGeneration => "logoGeneration",
            ResourceKind::BrandAsset => "brandAsset",
            ResourceKind::Download => "download",
            ResourceKind::Project => "project",
        }
    }

    /// Human-readable name
    pub fn label(&self) -> &'static str {
        match self {
            ResourceKind::LogoGeneration => "Logo generations",
            ResourceKind::BrandAsset => "Brand assets",
            ResourceKind::Download => "Downloads",
            ResourceKind::Project => "Projects",
        }
    }

    /// Parses a wire identifier
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "logoGeneration" => Some(ResourceKind::LogoGeneration),
            "brandAsset" => Some(ResourceKind::BrandAsset),
            "download" => Some(ResourceKind::Download),
            "project" => Some(ResourceKind::Project),
            _ => None,
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Quota limit for one resource kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Limit {
    /// No cap
    Unlimited,

    /// At most `n` units per billing period
    Bounded(u32),
}

impl Limit {
    /// Whether `amount` more units fit on top of `used`
    pub fn allows(&self, used: u32, amount: u32) -> bool {
        match self {
            Limit::Unlimited => true,
            Limit::Bounded(max) => u64::from(used) + u64::from(amount) <= u64::from(*max),
        }
    }

    /// Units left after `used`, or `None` when unlimited
    pub fn remaining(&self, used: u32) -> Option<u32> {
        match self {
            Limit::Unlimited => None,
            Limit::Bounded(max) => Some(max.saturating_sub(used)),
        }
    }

    /// Returns true for [`Limit::Unlimited`]
    pub fn is_unlimited(&self) -> bool {
        matches!(self, Limit::Unlimited)
    }
}

impl fmt::Display for Limit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Limit::Unlimited => f.write_str("unlimited"),
            Limit::Bounded(n) => write!(f, "{}", n),
        }
    }
}

// Serialized as a number, or the string "unlimited", matching the display contract.
impl Serialize for Limit {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Limit::Unlimited => serializer.serialize_str("unlimited"),
            Limit::Bounded(n) => serializer.serialize_u32(*n),
        }
    }
}

/// AI processing queue a plan's jobs run on
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AiProcessing {
    #[default]
    Standard,
    Priority,
}

/// Analytics tier, ordered from least to most capable
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalyticsTier {
    #[default]
    Basic,
    Advanced,
    Enterprise,
}

/// Capability gated by plan, checked with [`PlanFeatures::allows`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Feature {
    PriorityProcessing,
    WhiteLabel,
    AdvancedAnalytics,
    EnterpriseAnalytics,
}

impl Feature {
    pub const ALL: [Feature; 4] = [
        Feature::PriorityProcessing,
        Feature::WhiteLabel,
        Feature::AdvancedAnalytics,
        Feature::EnterpriseAnalytics,
    ];
}

/// Non-consumable entitlements of a plan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanFeatures {
    /// Seats, owner included
    pub collaborators: Limit,

    pub ai_processing: AiProcessing,
    pub white_label: bool,
    pub analytics: AnalyticsTier,
}

impl Default for PlanFeatures {
    fn default() -> Self {
        PlanFeatures {
            collaborators: Limit::Bounded(1),
            ai_processing: AiProcessing::Standard,
            white_label: false,
            analytics: AnalyticsTier::Basic,
        }
    }
}

impl PlanFeatures {
    /// Whether the feature set includes `feature`
    pub fn allows(&self, feature: Feature) -> bool {
        match feature {
            Feature::PriorityProcessing => self.ai_processing == AiProcessing::Priority,
            Feature::WhiteLabel => self.white_label,
            Feature::AdvancedAnalytics => self.analytics >= AnalyticsTier::Advanced,
            Feature::EnterpriseAnalytics => self.analytics >= AnalyticsTier::Enterprise,
        }
    }
}

/// Billing cycle chosen for a plan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BillingCycle {
    /// Billed and reset every month
    #[default]
    Monthly,

    /// Billed and reset every twelve months
    Yearly,
}

impl BillingCycle {
    /// Length of one quota period, in months
    pub fn months(&self) -> u32 {
        match self {
            BillingCycle::Monthly => 1,
            BillingCycle::Yearly => 12,
        }
    }
}

/// Plan prices in whole US dollars
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanPrice {
    /// Price per month
    pub monthly: u32,

    /// Price per year
    pub yearly: u32,
}

impl PlanPrice {
    /// Price charged for one cycle
    pub fn for_cycle(&self, cycle: BillingCycle) -> u32 {
        match cycle {
            BillingCycle::Monthly => self.monthly,
            BillingCycle::Yearly => self.yearly,
        }
    }
}

/// Immutable catalog entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    /// Plan identifier
    pub id: PlanId,

    /// Display name
    pub name: String,

    /// Short marketing description
    pub description: String,

    /// Monthly and yearly price
    pub price: PlanPrice,

    /// Quota per resource kind
    pub limits: BTreeMap<ResourceKind, Limit>,

    /// Seats and gated capabilities
    pub features: PlanFeatures,

    /// Selling points shown on the pricing page
    pub highlights: Vec<String>,

    /// Restrictions shown on the pricing page
    pub limitations: Vec<String>,

    /// Highlighted as the recommended plan
    pub popular: bool,

    /// Whether this is the signup trial plan
    pub is_trial: bool,
}

impl Plan {
    /// Limit for a resource kind (unlisted kinds are treated as zero)
    pub fn limit(&self, kind: ResourceKind) -> Limit {
        self.limits.get(&kind).copied().unwrap_or(Limit::Bounded(0))
    }

    /// Whether the plan includes a gated feature
    pub fn has_feature(&self, feature: Feature) -> bool {
        self.features.allows(feature)
    }
}

/// Read-only plan view for display
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanView {
    /// Wire identifier of the plan
    pub plan_id: PlanId,

    /// Display name
    pub name: String,

    pub description: String,

    /// Prices
    pub price: PlanPrice,

    /// Quota per resource kind
    pub limits: BTreeMap<ResourceKind, Limit>,

    pub features: PlanFeatures,
    pub highlights: Vec<String>,
    pub limitations: Vec<String>,
    pub popular: bool,
}

impl From<&Plan> for PlanView {
    fn from(plan: &Plan) -> Self {
        PlanView {
            plan_id: plan.id,
            name: plan.name.clone(),
            description: plan.description.clone(),
            price: plan.price,
            limits: plan.limits.clone(),
            features: plan.features,
            highlights: plan.highlights.clone(),
            limitations: plan.limitations.clone(),
            popular: plan.popular,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_id_round_trip_names() {
        for plan in PlanId::ALL {
            assert_eq!(PlanId::parse(plan.as_str()), Some(plan));
        }
        assert_eq!(PlanId::parse("  Professional "), Some(PlanId::Professional));
        assert_eq!(PlanId::parse("premium"), None);
    }

    #[test]
    fn test_resource_kind_parse() {
        assert_eq!(ResourceKind::parse("brandAsset"), Some(ResourceKind::BrandAsset));
        assert_eq!(ResourceKind::parse("brand_asset"), None);
    }

    #[test]
    fn test_limit_allows_boundary() {
        let limit = Limit::Bounded(15);
        assert!(limit.allows(0, 15));
        assert!(!limit.allows(0, 16));
        assert!(!limit.allows(15, 1));
        assert!(limit.allows(15, 0));
    }

    #[test]
    fn test_limit_allows_does_not_overflow() {
        let limit = Limit::Bounded(u32::MAX);
        assert!(!limit.allows(u32::MAX, 1));
    }

    #[test]
    fn test_limit_remaining() {
        assert_eq!(Limit::Bounded(10).remaining(3), Some(7));
        assert_eq!(Limit::Bounded(10).remaining(12), Some(0));
        assert_eq!(Limit::Unlimited.remaining(1_000), None);
    }

    #[test]
    fn test_limit_serialization() {
        assert_eq!(serde_json::to_string(&Limit::Bounded(15)).unwrap(), "15");
        assert_eq!(serde_json::to_string(&Limit::Unlimited).unwrap(), "\"unlimited\"");
    }

    #[test]
    fn test_feature_tiers() {
        let advanced = PlanFeatures {
            analytics: AnalyticsTier::Advanced,
            ..Default::default()
        };
        assert!(advanced.allows(Feature::AdvancedAnalytics));
        assert!(!advanced.allows(Feature::EnterpriseAnalytics));
        assert!(!advanced.allows(Feature::PriorityProcessing));

        let enterprise = PlanFeatures {
            analytics: AnalyticsTier::Enterprise,
            ai_processing: AiProcessing::Priority,
            white_label: true,
            collaborators: Limit::Unlimited,
        };
        for feature in Feature::ALL {
            assert!(enterprise.allows(feature), "{:?}", feature);
        }
    }

    #[test]
    fn test_features_serialization() {
        let json = serde_json::to_value(PlanFeatures::default()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "collaborators": 1,
                "aiProcessing": "standard",
                "whiteLabel": false,
                "analytics": "basic"
            })
        );
    }

    #[test]
    fn test_price_for_cycle() {
        let price = PlanPrice { monthly: 19, yearly: 190 };
        assert_eq!(price.for_cycle(BillingCycle::Monthly), 19);
        assert_eq!(price.for_cycle(BillingCycle::Yearly), 190);
    }
}

//! Simulated eSIM provisioning client.
//!
//! Stands in for a carrier provisioning API during development: it
//! authenticates, keeps an in-memory list of profiles, and walks them through
//! the `pending -> active <-> inactive` lifecycle after a fixed delay per call.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Default delay applied to every simulated call.
pub const DEFAULT_LATENCY: Duration = Duration::from_millis(500);

/// Price charged by [`SimulatedProvisioner::purchase_plan`].
pub const PLAN_PRICE: &str = "9.99";

/// Currency of [`PLAN_PRICE`].
pub const PLAN_CURRENCY: &str = "USD";

/// Validity of a newly purchased profile.
const PURCHASED_PROFILE_VALIDITY_DAYS: u64 = 30;

/// Usage reported for the last five days, oldest first.
const DAILY_USAGE: [&str; 5] = ["0.2 GB", "0.5 GB", "0.8 GB", "1.3 GB", "1.0 GB"];

/// Errors returned by the provisioning client.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProvisioningError {
    /// A call was made before [`SimulatedProvisioner::authenticate`] succeeded.
    #[error("not authenticated")]
    NotAuthenticated,

    /// Client id or secret was empty.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// No profile with this id.
    #[error("profile not found: {id}")]
    ProfileNotFound {
        /// The profile id.
        id: String,
    },

    /// The purchase carried no payment method.
    #[error("invalid payment details")]
    InvalidPaymentDetails,

    /// The profile is already active.
    #[error("profile is already active: {id}")]
    AlreadyActive {
        /// The profile id.
        id: String,
    },

    /// The profile is already inactive.
    #[error("profile is already inactive: {id}")]
    AlreadyInactive {
        /// The profile id.
        id: String,
    },

    /// The profile's status does not allow the change.
    #[error("cannot change profile {id} while {status}")]
    InvalidTransition {
        /// The profile id.
        id: String,
        /// Its current status.
        status: ProfileStatus,
    },

    /// The network is not offered for the profile.
    #[error("unknown network: {id}")]
    UnknownNetwork {
        /// The network id.
        id: String,
    },
}

/// Lifecycle state of a profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileStatus {
    /// Purchased but never activated.
    Pending,
    /// In use.
    Active,
    /// Switched off.
    Inactive,
}

impl fmt::Display for ProfileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pending => "pending",
            Self::Active => "active",
            Self::Inactive => "inactive",
        })
    }
}

/// An eSIM profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    /// Profile id, e.g. `prof_001`.
    pub id: String,
    /// Display name.
    pub name: String,
    /// SIM card identifier.
    pub iccid: String,
    /// Lifecycle state.
    pub status: ProfileStatus,
    /// Data left, e.g. `1.2 GB`.
    pub data_remaining: String,
    /// Last day of validity.
    pub expiry_date: NaiveDate,
    /// Countries covered.
    pub countries: Vec<String>,
    /// Network chosen with [`SimulatedProvisioner::set_preferred_network`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_network: Option<String>,
}

/// How a purchase is paid.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentDetails {
    /// Payment method reference; must not be blank.
    pub method: String,
}

/// Receipt for a purchased plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseReceipt {
    /// Transaction id, e.g. `txn_...`.
    pub transaction_id: String,
    /// Amount charged.
    pub amount: String,
    /// Currency of `amount`.
    pub currency: String,
    /// When the purchase completed.
    pub timestamp: DateTime<Utc>,
}

/// Result of a purchase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Purchase {
    /// The new, pending profile.
    pub profile: Profile,
    /// The receipt.
    pub receipt: PurchaseReceipt,
}

/// One day of data usage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyUsage {
    /// The day.
    pub date: NaiveDate,
    /// Data used that day.
    pub usage: String,
}

/// Data usage for a profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataUsage {
    /// The profile.
    pub profile_id: String,
    /// Plan allowance.
    pub total_data: String,
    /// Data used so far.
    pub used_data: String,
    /// Data left.
    pub remaining_data: String,
    /// Usage over the last few days, oldest first.
    pub usage_by_day: Vec<DailyUsage>,
    /// Last day of validity.
    pub expiry_date: NaiveDate,
}

/// A carrier network a profile can roam on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Network {
    /// Network id, e.g. `net_001`.
    pub id: String,
    /// Carrier name.
    pub name: String,
    /// Signal quality label.
    pub signal_strength: String,
    /// Whether the carrier recommends it.
    pub preferred: bool,
}

/// In-memory provisioning client.
#[derive(Debug)]
pub struct SimulatedProvisioner {
    latency: Duration,
    token: Option<String>,
    profiles: Vec<Profile>,
    loaded: bool,
}

impl Default for SimulatedProvisioner {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedProvisioner {
    /// Create a provisioner with [`DEFAULT_LATENCY`].
    #[must_use]
    pub fn new() -> Self {
        Self::with_latency(DEFAULT_LATENCY)
    }

    /// Create a provisioner that waits `latency` on every call.
    #[must_use]
    pub fn with_latency(latency: Duration) -> Self {
        Self {
            latency,
            token: None,
            profiles: Vec::new(),
            loaded: false,
        }
    }

    /// Whether [`Self::authenticate`] has succeeded.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    /// Exchange client credentials for an access token.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisioningError::InvalidCredentials`] if either value is blank.
    pub async fn authenticate(
        &mut self,
        client_id: &str,
        client_secret: &str,
    ) -> Result<String, ProvisioningError> {
        self.delay().await;

        if client_id.trim().is_empty() || client_secret.trim().is_empty() {
            tracing::warn!("Provisioning authentication rejected");
            return Err(ProvisioningError::InvalidCredentials);
        }

        let token = format!("tok_{}", random_suffix());
        self.token = Some(token.clone());
        tracing::info!(client_id = %client_id, "Provisioning client authenticated");
        Ok(token)
    }

    /// List the account's profiles. The first call loads the account's
    /// existing profiles; later calls also include purchases.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisioningError::NotAuthenticated`] before authentication.
    pub async fn fetch_profiles(&mut self) -> Result<Vec<Profile>, ProvisioningError> {
        self.ensure_authenticated()?;
        self.delay().await;

        if !self.loaded {
            let mut seeded = seed_profiles();
            seeded.append(&mut self.profiles);
            self.profiles = seeded;
            self.loaded = true;
        }

        tracing::debug!(count = self.profiles.len(), "Fetched profiles");
        Ok(self.profiles.clone())
    }

    /// Activate a pending or inactive profile.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisioningError::AlreadyActive`] for active profiles and
    /// [`ProvisioningError::ProfileNotFound`] for unknown ids.
    pub async fn activate_profile(&mut self, id: &str) -> Result<Profile, ProvisioningError> {
        self.ensure_authenticated()?;
        self.profile(id)?;
        self.delay().await;

        let profile = self.profile_mut(id)?;
        if profile.status == ProfileStatus::Active {
            return Err(ProvisioningError::AlreadyActive { id: id.to_string() });
        }
        profile.status = ProfileStatus::Active;

        tracing::info!(profile_id = %id, "Profile activated");
        Ok(profile.clone())
    }

    /// Deactivate an active profile.
    ///
    /// # Errors
    ///
    /// - [`ProvisioningError::AlreadyInactive`] for inactive profiles
    /// - [`ProvisioningError::InvalidTransition`] for pending profiles
    /// - [`ProvisioningError::ProfileNotFound`] for unknown ids
    pub async fn deactivate_profile(&mut self, id: &str) -> Result<Profile, ProvisioningError> {
        self.ensure_authenticated()?;
        self.profile(id)?;
        self.delay().await;

        let profile = self.profile_mut(id)?;
        match profile.status {
            ProfileStatus::Active => profile.status = ProfileStatus::Inactive,
            ProfileStatus::Inactive => {
                return Err(ProvisioningError::AlreadyInactive { id: id.to_string() })
            }
            status @ ProfileStatus::Pending => {
                return Err(ProvisioningError::InvalidTransition {
                    id: id.to_string(),
                    status,
                })
            }
        }

        tracing::info!(profile_id = %id, "Profile deactivated");
        Ok(profile.clone())
    }

    /// Buy a plan for `country_code`, creating a pending profile.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisioningError::InvalidPaymentDetails`] if the payment
    /// method is blank.
    pub async fn purchase_plan(
        &mut self,
        country_code: &str,
        plan_id: &str,
        payment: &PaymentDetails,
    ) -> Result<Purchase, ProvisioningError> {
        self.ensure_authenticated()?;
        if payment.method.trim().is_empty() {
            return Err(ProvisioningError::InvalidPaymentDetails);
        }
        self.delay().await;

        let now = Utc::now();
        let expiry_date = now
            .date_naive()
            .checked_add_days(Days::new(PURCHASED_PROFILE_VALIDITY_DAYS))
            .unwrap_or(NaiveDate::MAX);
        let profile = Profile {
            id: format!("prof_{}", &random_suffix()[..4]),
            name: format!("{country_code} Plan"),
            iccid: format!("89910000{:011}", Ulid::new().random() % 100_000_000_000),
            status: ProfileStatus::Pending,
            data_remaining: "2.0 GB".to_string(),
            expiry_date,
            countries: vec![country_code.to_string()],
            preferred_network: None,
        };
        self.profiles.push(profile.clone());

        let receipt = PurchaseReceipt {
            transaction_id: format!("txn_{}", &random_suffix()[..8]),
            amount: PLAN_PRICE.to_string(),
            currency: PLAN_CURRENCY.to_string(),
            timestamp: now,
        };

        tracing::info!(
            profile_id = %profile.id,
            plan_id = %plan_id,
            transaction_id = %receipt.transaction_id,
            "Plan purchased"
        );

        Ok(Purchase { profile, receipt })
    }

    /// Data usage for a profile over the last five days.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisioningError::ProfileNotFound`] for unknown ids.
    pub async fn check_data_usage(&self, id: &str) -> Result<DataUsage, ProvisioningError> {
        self.ensure_authenticated()?;
        let profile = self.profile(id)?;
        self.delay().await;

        let today = Utc::now().date_naive();
        let usage_by_day = DAILY_USAGE
            .iter()
            .zip((0..5u64).rev())
            .map(|(usage, days_ago)| DailyUsage {
                date: today.checked_sub_days(Days::new(days_ago)).unwrap_or(today),
                usage: (*usage).to_string(),
            })
            .collect();

        Ok(DataUsage {
            profile_id: profile.id.clone(),
            total_data: "5.0 GB".to_string(),
            used_data: "3.8 GB".to_string(),
            remaining_data: profile.data_remaining.clone(),
            usage_by_day,
            expiry_date: profile.expiry_date,
        })
    }

    /// Networks the profile can roam on.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisioningError::ProfileNotFound`] for unknown ids.
    pub async fn available_networks(&self, id: &str) -> Result<Vec<Network>, ProvisioningError> {
        self.ensure_authenticated()?;
        self.profile(id)?;
        self.delay().await;
        Ok(networks())
    }

    /// Pin a profile to one of its available networks.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisioningError::ProfileNotFound`] or
    /// [`ProvisioningError::UnknownNetwork`].
    pub async fn set_preferred_network(
        &mut self,
        id: &str,
        network_id: &str,
    ) -> Result<Profile, ProvisioningError> {
        self.ensure_authenticated()?;
        self.profile(id)?;
        if !networks().iter().any(|n| n.id == network_id) {
            return Err(ProvisioningError::UnknownNetwork {
                id: network_id.to_string(),
            });
        }
        self.delay().await;

        let profile = self.profile_mut(id)?;
        profile.preferred_network = Some(network_id.to_string());
        tracing::info!(profile_id = %id, network_id = %network_id, "Preferred network set");
        Ok(profile.clone())
    }

    /// Rename a profile.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisioningError::ProfileNotFound`] for unknown ids.
    pub async fn rename_profile(
        &mut self,
        id: &str,
        name: &str,
    ) -> Result<Profile, ProvisioningError> {
        self.ensure_authenticated()?;
        self.profile(id)?;
        self.delay().await;

        let profile = self.profile_mut(id)?;
        profile.name = name.to_string();
        Ok(profile.clone())
    }

    /// Delete a profile.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisioningError::ProfileNotFound`] for unknown ids.
    pub async fn delete_profile(&mut self, id: &str) -> Result<(), ProvisioningError> {
        self.ensure_authenticated()?;
        self.profile(id)?;
        self.delay().await;

        self.profiles.retain(|p| p.id != id);
        tracing::info!(profile_id = %id, "Profile deleted");
        Ok(())
    }

    fn ensure_authenticated(&self) -> Result<(), ProvisioningError> {
        if self.is_authenticated() {
            Ok(())
        } else {
            Err(ProvisioningError::NotAuthenticated)
        }
    }

    fn profile(&self, id: &str) -> Result<&Profile, ProvisioningError> {
        self.profiles
            .iter()
            .find(|p| p.id == id)
            .ok_or_else(|| ProvisioningError::ProfileNotFound { id: id.to_string() })
    }

    fn profile_mut(&mut self, id: &str) -> Result<&mut Profile, ProvisioningError> {
        self.profiles
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| ProvisioningError::ProfileNotFound { id: id.to_string() })
    }

    async fn delay(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }
}

fn random_suffix() -> String {
    Ulid::new().to_string().to_lowercase().chars().rev().collect()
}

fn seeded_profile(
    id: &str,
    name: &str,
    iccid: &str,
    status: ProfileStatus,
    data_remaining: &str,
    expiry_date: NaiveDate,
    countries: &[&str],
) -> Profile {
    Profile {
        id: id.to_string(),
        name: name.to_string(),
        iccid: iccid.to_string(),
        status,
        data_remaining: data_remaining.to_string(),
        expiry_date,
        countries: countries.iter().map(ToString::to_string).collect(),
        preferred_network: None,
    }
}

fn seed_profiles() -> Vec<Profile> {
    let date = |y, m, d| NaiveDate::from_ymd_opt(y, m, d).unwrap_or(NaiveDate::MAX);
    vec![
        seeded_profile(
            "prof_001",
            "Global Traveler",
            "8991000012345678901",
            ProfileStatus::Active,
            "1.2 GB",
            date(2025, 12, 31),
            &["USA", "Japan", "UK", "Australia"],
        ),
        seeded_profile(
            "prof_002",
            "Business Europe",
            "8991000087654321098",
            ProfileStatus::Inactive,
            "5.0 GB",
            date(2025, 10, 15),
            &["Germany", "France", "Italy", "Spain"],
        ),
        seeded_profile(
            "prof_003",
            "Asia Pacific",
            "8991000056789012345",
            ProfileStatus::Pending,
            "3.0 GB",
            date(2025, 11, 20),
            &["Japan", "Singapore", "Thailand", "Australia"],
        ),
    ]
}

fn networks() -> Vec<Network> {
    [
        ("net_001", "Global Connect", "Excellent", true),
        ("net_002", "WorldTel", "Good", false),
        ("net_003", "RoamFree", "Fair", false),
    ]
    .into_iter()
    .map(|(id, name, signal, preferred)| Network {
        id: id.to_string(),
        name: name.to_string(),
        signal_strength: signal.to_string(),
        preferred,
    })
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn signed_in() -> SimulatedProvisioner {
        let mut provisioner = SimulatedProvisioner::with_latency(Duration::ZERO);
        provisioner.authenticate("client-id", "client-secret").await.unwrap();
        provisioner.fetch_profiles().await.unwrap();
        provisioner
    }

    #[tokio::test]
    async fn rejects_blank_credentials() {
        let mut provisioner = SimulatedProvisioner::with_latency(Duration::ZERO);
        assert_eq!(
            provisioner.authenticate("client-id", "").await,
            Err(ProvisioningError::InvalidCredentials)
        );
        assert!(!provisioner.is_authenticated());
    }

    #[tokio::test]
    async fn calls_require_authentication() {
        let mut provisioner = SimulatedProvisioner::with_latency(Duration::ZERO);
        assert_eq!(
            provisioner.fetch_profiles().await,
            Err(ProvisioningError::NotAuthenticated)
        );
        assert_eq!(
            provisioner.activate_profile("prof_001").await,
            Err(ProvisioningError::NotAuthenticated)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn fetch_seeds_three_profiles() {
        let mut provisioner = SimulatedProvisioner::new();
        let token = provisioner.authenticate("client-id", "client-secret").await.unwrap();
        assert!(token.starts_with("tok_"));

        let profiles = provisioner.fetch_profiles().await.unwrap();
        let statuses: Vec<_> = profiles.iter().map(|p| (p.id.as_str(), p.status)).collect();
        assert_eq!(
            statuses,
            vec![
                ("prof_001", ProfileStatus::Active),
                ("prof_002", ProfileStatus::Inactive),
                ("prof_003", ProfileStatus::Pending),
            ]
        );
    }

    #[tokio::test]
    async fn activation_rules() {
        let mut provisioner = signed_in().await;

        let activated = provisioner.activate_profile("prof_003").await.unwrap();
        assert_eq!(activated.status, ProfileStatus::Active);
        let activated = provisioner.activate_profile("prof_002").await.unwrap();
        assert_eq!(activated.status, ProfileStatus::Active);
        assert_eq!(
            provisioner.activate_profile("prof_001").await,
            Err(ProvisioningError::AlreadyActive { id: "prof_001".into() })
        );
        assert_eq!(
            provisioner.activate_profile("prof_999").await,
            Err(ProvisioningError::ProfileNotFound { id: "prof_999".into() })
        );
    }

    #[tokio::test]
    async fn deactivation_rules() {
        let mut provisioner = signed_in().await;

        let deactivated = provisioner.deactivate_profile("prof_001").await.unwrap();
        assert_eq!(deactivated.status, ProfileStatus::Inactive);
        assert_eq!(
            provisioner.deactivate_profile("prof_002").await,
            Err(ProvisioningError::AlreadyInactive { id: "prof_002".into() })
        );
        assert_eq!(
            provisioner.deactivate_profile("prof_003").await,
            Err(ProvisioningError::InvalidTransition {
                id: "prof_003".into(),
                status: ProfileStatus::Pending,
            })
        );
    }

    #[tokio::test]
    async fn purchase_adds_pending_profile() {
        let mut provisioner = signed_in().await;
        let payment = PaymentDetails {
            method: "card".into(),
        };

        let purchase = provisioner.purchase_plan("JP", "japan-3gb", &payment).await.unwrap();

        assert_eq!(purchase.profile.status, ProfileStatus::Pending);
        assert_eq!(purchase.profile.name, "JP Plan");
        assert_eq!(purchase.profile.countries, vec!["JP".to_string()]);
        assert_eq!(purchase.profile.iccid.len(), 19);
        assert_eq!(purchase.receipt.amount, "9.99");
        assert_eq!(purchase.receipt.currency, "USD");
        assert!(purchase.receipt.transaction_id.starts_with("txn_"));

        let profiles = provisioner.fetch_profiles().await.unwrap();
        assert_eq!(profiles.len(), 4);
        assert!(profiles.iter().any(|p| p.id == purchase.profile.id));
    }

    #[tokio::test]
    async fn purchase_requires_payment_method() {
        let mut provisioner = signed_in().await;
        assert_eq!(
            provisioner
                .purchase_plan("JP", "japan-3gb", &PaymentDetails::default())
                .await,
            Err(ProvisioningError::InvalidPaymentDetails)
        );
    }

    #[tokio::test]
    async fn usage_reports_profile_remaining() {
        let provisioner = signed_in().await;

        let usage = provisioner.check_data_usage("prof_002").await.unwrap();

        assert_eq!(usage.remaining_data, "5.0 GB");
        assert_eq!(usage.usage_by_day.len(), 5);
        assert!(usage.usage_by_day.windows(2).all(|w| w[0].date < w[1].date));
        assert_eq!(usage.usage_by_day[4].date, Utc::now().date_naive());
    }

    #[tokio::test]
    async fn network_preference_rename_and_delete() {
        let mut provisioner = signed_in().await;

        assert_eq!(provisioner.available_networks("prof_001").await.unwrap().len(), 3);
        let profile = provisioner.set_preferred_network("prof_001", "net_002").await.unwrap();
        assert_eq!(profile.preferred_network.as_deref(), Some("net_002"));
        assert_eq!(
            provisioner.set_preferred_network("prof_001", "net_404").await,
            Err(ProvisioningError::UnknownNetwork { id: "net_404".into() })
        );

        let renamed = provisioner.rename_profile("prof_001", "Holiday").await.unwrap();
        assert_eq!(renamed.name, "Holiday");

        provisioner.delete_profile("prof_001").await.unwrap();
        assert_eq!(
            provisioner.check_data_usage("prof_001").await,
            Err(ProvisioningError::ProfileNotFound { id: "prof_001".into() })
        );
    }
}

//! Dashboard views: login, member dashboard, billing, admin analytics.
//!
//! Each view loads its data through the shared [`ApiClient`] inside a
//! [`ViewScope`] and derives the handful of values it displays. A failed
//! fetch is logged and leaves its section empty; only login reports failures
//! to the user.

use thiserror::Error;

use crate::dashboard::api::ApiClient;
use crate::dashboard::scope::ViewScope;
use crate::dashboard::types::{
    AdminStats, BillingRecord, Member, MemberId, MembershipPlan, Recommendation, WeeklySchedule,
};

/// Number of recommendations the dashboard asks for.
pub const DASHBOARD_TOP_N: u32 = 5;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoginError {
    #[error("Please enter your email")]
    EmptyEmail,

    #[error("Member not found. Try: member1@gym.com")]
    NotFound,

    #[error("Connection error. Make sure backend is running.")]
    Connection,
}

/// First member whose email matches, ignoring case.
pub fn find_member_by_email<'a>(members: &'a [Member], email: &str) -> Option<&'a Member> {
    let wanted = email.to_lowercase();
    members.iter().find(|m| m.email.to_lowercase() == wanted)
}

/// Look a member up by email. There is no password check.
pub async fn login(client: &ApiClient, email: &str) -> Result<MemberId, LoginError> {
    if email.is_empty() {
        return Err(LoginError::EmptyEmail);
    }

    let members = client.members().await.map_err(|e| {
        tracing::error!(error = %e, "Login lookup failed");
        LoginError::Connection
    })?;

    find_member_by_email(&members, email)
        .map(|m| m.member_id)
        .ok_or(LoginError::NotFound)
}

/// Log a failed section fetch and fall back to an empty section.
fn or_empty<T: Default, E: std::fmt::Display>(result: Result<T, E>, what: &str) -> T {
    result.unwrap_or_else(|e| {
        tracing::error!(error = %e, "Error fetching {}", what);
        T::default()
    })
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DashboardView {
    pub member: Option<Member>,
    pub recommendations: Vec<Recommendation>,
    pub weekly_schedule: WeeklySchedule,
}

impl DashboardView {
    /// Load the member dashboard. `None` if the view was torn down first.
    pub async fn load(client: &ApiClient, member_id: MemberId, scope: &ViewScope) -> Option<Self> {
        let (member, recommendations, weekly_schedule) = scope
            .run(async {
                tokio::join!(
                    client.member(member_id),
                    client.recommendations(member_id, DASHBOARD_TOP_N),
                    client.weekly_schedule(member_id),
                )
            })
            .await?;

        Some(Self {
            member: member
                .map_err(|e| tracing::error!(error = %e, "Error fetching member"))
                .ok(),
            recommendations: or_empty(recommendations, "recommendations"),
            weekly_schedule: or_empty(weekly_schedule, "schedule"),
        })
    }

    pub fn bmi(&self) -> Option<f64> {
        self.member.as_ref().and_then(Member::bmi)
    }
}

/// What the billing page offers for a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanAction {
    Current,
    Upgrade,
    Downgrade,
}

impl PlanAction {
    pub fn label(self) -> &'static str {
        match self {
            PlanAction::Current => "Current",
            PlanAction::Upgrade => "Upgrade",
            PlanAction::Downgrade => "Downgrade",
        }
    }
}

/// Place every plan relative to the member's current level. Plans listed
/// after the current one are upgrades; when the current level is not among
/// the plans, every plan is an upgrade.
pub fn plan_actions(plans: &[MembershipPlan], current_level: Option<&str>) -> Vec<PlanAction> {
    let current_index =
        current_level.and_then(|level| plans.iter().position(|p| p.plan_name == level));

    plans
        .iter()
        .enumerate()
        .map(|(index, plan)| {
            if Some(plan.plan_name.as_str()) == current_level {
                PlanAction::Current
            } else {
                match current_index {
                    Some(current) if current >= index => PlanAction::Downgrade,
                    _ => PlanAction::Upgrade,
                }
            }
        })
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BillingView {
    pub member: Option<Member>,
    pub history: Vec<BillingRecord>,
    pub plans: Vec<MembershipPlan>,
}

impl BillingView {
    /// Load the billing page. `None` if the view was torn down first.
    pub async fn load(client: &ApiClient, member_id: MemberId, scope: &ViewScope) -> Option<Self> {
        let (member, history, plans) = scope
            .run(async {
                tokio::join!(
                    client.member(member_id),
                    client.billing(member_id),
                    client.plans(),
                )
            })
            .await?;

        Some(Self {
            member: member
                .map_err(|e| tracing::error!(error = %e, "Error fetching member"))
                .ok(),
            history: or_empty(history, "billing"),
            plans: or_empty(plans, "plans"),
        })
    }

    pub fn membership_level(&self) -> Option<&str> {
        self.member.as_ref()?.membership_level.as_deref()
    }

    pub fn current_plan(&self) -> Option<&MembershipPlan> {
        let level = self.membership_level()?;
        self.plans.iter().find(|p| p.plan_name == level)
    }

    pub fn plan_options(&self) -> Vec<(&MembershipPlan, PlanAction)> {
        self.plans
            .iter()
            .zip(plan_actions(&self.plans, self.membership_level()))
            .collect()
    }
}

/// A background job shown on the admin page. Display data only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduledJob {
    pub name: &'static str,
    pub status: &'static str,
    pub description: &'static str,
    pub schedule: &'static str,
}

pub const SCHEDULED_JOBS: &[ScheduledJob] = &[
    ScheduledJob {
        name: "Monthly Billing Generator",
        status: "Deployed",
        description: "Generates monthly billing for all active members",
        schedule: "1st of every month at 12:00 AM",
    },
    ScheduledJob {
        name: "Daily Stats Aggregator",
        status: "Planned",
        description: "Calculates and caches daily statistics for faster dashboard loading",
        schedule: "Daily at midnight",
    },
    ScheduledJob {
        name: "Membership Expiration Alerts",
        status: "Planned",
        description: "Sends email alerts for memberships expiring within 7 days",
        schedule: "Weekly on Mondays at 9:00 AM",
    },
    ScheduledJob {
        name: "Class Capacity Monitor",
        status: "Planned",
        description: "Monitors class capacities and flags under-utilized classes",
        schedule: "Hourly",
    },
];

/// Share of one membership tier.
#[derive(Debug, Clone, PartialEq)]
pub struct TierShare {
    pub name: String,
    pub count: u64,
    pub percent: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AdminView {
    pub stats: AdminStats,
}

impl AdminView {
    /// Load admin stats. Stats stay zeroed when the fetch fails; `None` if
    /// the view was torn down first.
    pub async fn load(client: &ApiClient, scope: &ViewScope) -> Option<Self> {
        let stats = scope.run(client.admin_stats()).await?;
        Some(Self {
            stats: or_empty(stats, "admin stats"),
        })
    }

    /// Active members as a percentage of all members, one decimal.
    pub fn active_percentage(&self) -> f64 {
        let AdminStats {
            total_members,
            active_members,
            ..
        } = self.stats;
        if active_members == 0 || total_members == 0 {
            return 0.0;
        }
        round1(active_members as f64 / total_members as f64 * 100.0)
    }

    /// (active, inactive) member counts.
    pub fn status_split(&self) -> (u64, u64) {
        let active = self.stats.active_members;
        (active, self.stats.total_members.saturating_sub(active))
    }

    pub fn tier_shares(&self) -> Vec<TierShare> {
        let total: u64 = self.stats.membership_tiers.iter().map(|t| t.count).sum();
        self.stats
            .membership_tiers
            .iter()
            .map(|tier| TierShare {
                name: tier.name.clone(),
                count: tier.count,
                percent: if total == 0 {
                    0.0
                } else {
                    (tier.count as f64 / total as f64 * 100.0).round()
                },
            })
            .collect()
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

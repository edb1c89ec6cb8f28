//! Records returned by the backend REST API.
//!
//! The backend does no schema validation, so every field beyond an id is
//! optional or defaulted and unknown fields are ignored. Money values arrive
//! as numbers or as decimal strings depending on the backend's serializer.

use serde::de::{self, Deserializer, MapAccess, Visitor};
use serde::{Deserialize, Serialize};
use std::fmt;

pub type MemberId = u64;

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrText {
    Number(f64),
    Text(String),
}

impl NumberOrText {
    fn into_f64<E: de::Error>(self) -> Result<f64, E> {
        match self {
            NumberOrText::Number(n) => Ok(n),
            NumberOrText::Text(s) => s.trim().parse().map_err(E::custom),
        }
    }
}

fn lenient_f64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    NumberOrText::deserialize(deserializer)?.into_f64()
}

fn lenient_opt_f64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    Option::<NumberOrText>::deserialize(deserializer)?
        .map(NumberOrText::into_f64)
        .transpose()
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Member {
    pub member_id: MemberId,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub join_date: Option<String>,
    #[serde(default)]
    pub membership_level: Option<String>,
    #[serde(default)]
    pub membership_status: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_f64")]
    pub height_cm: Option<f64>,
    #[serde(default, deserialize_with = "lenient_opt_f64")]
    pub weight_kg: Option<f64>,
    #[serde(default)]
    pub age: Option<u32>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub preferred_time_slot: Option<String>,
    #[serde(default)]
    pub preferred_days: Option<String>,
}

impl Member {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name).trim().to_string()
    }

    /// Body mass index to one decimal. `None` when height or weight is
    /// missing or zero.
    pub fn bmi(&self) -> Option<f64> {
        let height = self.height_cm.filter(|h| *h > 0.0)?;
        let weight = self.weight_kg.filter(|w| *w > 0.0)?;
        let meters = height / 100.0;
        Some(round1(weight / (meters * meters)))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BillingRecord {
    #[serde(default)]
    pub billing_id: Option<u64>,
    #[serde(default)]
    pub billing_date: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub amount: f64,
    #[serde(default)]
    pub payment_method: Option<String>,
    #[serde(default)]
    pub payment_status: Option<String>,
    #[serde(default)]
    pub next_billing_date: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MembershipPlan {
    #[serde(default)]
    pub plan_id: Option<u64>,
    pub plan_name: String,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub monthly_fee: f64,
    #[serde(default)]
    pub features: Option<String>,
    #[serde(default)]
    pub class_access_limit: Option<u32>,
}

impl MembershipPlan {
    /// "N classes per week" for a positive limit, otherwise unlimited.
    pub fn class_access_label(&self) -> String {
        match self.class_access_limit {
            Some(limit) if limit > 0 => format!("{} classes per week", limit),
            _ => "Unlimited classes".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    #[serde(default)]
    pub class_name: String,
    #[serde(default, deserialize_with = "lenient_opt_f64")]
    pub match_percentage: Option<f64>,
    #[serde(default)]
    pub instructor: Option<String>,
    #[serde(default)]
    pub difficulty: Option<String>,
    #[serde(default)]
    pub duration: Option<u32>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub reasons: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct RecommendationsEnvelope {
    #[serde(default)]
    pub recommendations: Vec<Recommendation>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScheduleSlot {
    #[serde(default)]
    pub time: String,
    #[serde(default)]
    pub class_name: String,
    #[serde(default)]
    pub room: Option<String>,
    #[serde(default)]
    pub spots_left: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ScheduleDay {
    pub day: String,
    pub classes: Vec<ScheduleSlot>,
}

/// Weekly schedule, days kept in the order the backend sent them.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WeeklySchedule {
    pub days: Vec<ScheduleDay>,
}

impl WeeklySchedule {
    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    pub fn total_classes(&self) -> usize {
        self.days.iter().map(|d| d.classes.len()).sum()
    }
}

impl<'de> Deserialize<'de> for WeeklySchedule {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct DaysVisitor;

        impl<'de> Visitor<'de> for DaysVisitor {
            type Value = WeeklySchedule;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of day name to scheduled classes")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut days = Vec::new();
                while let Some((day, classes)) = map.next_entry::<String, Vec<ScheduleSlot>>()? {
                    days.push(ScheduleDay { day, classes });
                }
                Ok(WeeklySchedule { days })
            }
        }

        deserializer.deserialize_map(DaysVisitor)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct WeeklyScheduleEnvelope {
    #[serde(default)]
    pub weekly_schedule: WeeklySchedule,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TierCount {
    pub name: String,
    #[serde(default)]
    pub count: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PopularClass {
    pub name: String,
    #[serde(default)]
    pub bookings: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub time: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdminStats {
    pub total_members: u64,
    pub active_members: u64,
    pub new_this_month: u64,
    #[serde(deserialize_with = "lenient_f64")]
    pub monthly_revenue: f64,
    #[serde(deserialize_with = "lenient_f64")]
    pub outstanding: f64,
    pub total_classes: u64,
    #[serde(deserialize_with = "lenient_f64")]
    pub avg_attendance: f64,
    pub membership_tiers: Vec<TierCount>,
    pub popular_classes: Vec<PopularClass>,
    pub recent_activity: Vec<Activity>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_sparse_member_deserializes() {
        let member: Member =
            serde_json::from_value(json!({"member_id": 1, "email": "member1@gym.com"})).unwrap();
        assert_eq!(member.member_id, 1);
        assert_eq!(member.email, "member1@gym.com");
        assert_eq!(member.membership_level, None);
        assert_eq!(member.bmi(), None);
    }

    #[test]
    fn test_bmi() {
        let member = Member {
            height_cm: Some(180.0),
            weight_kg: Some(81.0),
            ..Member::default()
        };
        assert_eq!(member.bmi(), Some(25.0));

        let member = Member {
            height_cm: Some(165.0),
            weight_kg: Some(60.0),
            ..Member::default()
        };
        assert_eq!(member.bmi(), Some(22.0));

        let member = Member {
            height_cm: Some(0.0),
            weight_kg: Some(60.0),
            ..Member::default()
        };
        assert_eq!(member.bmi(), None);
    }

    #[test]
    fn test_money_as_number_or_string() {
        let plan: MembershipPlan = serde_json::from_value(json!({
            "plan_name": "Premium",
            "monthly_fee": "49.99",
            "class_access_limit": null
        }))
        .unwrap();
        assert_eq!(plan.monthly_fee, 49.99);
        assert_eq!(plan.class_access_label(), "Unlimited classes");

        let bill: BillingRecord =
            serde_json::from_value(json!({"amount": 29.5, "payment_status": "Paid"})).unwrap();
        assert_eq!(bill.amount, 29.5);

        let bad = serde_json::from_value::<BillingRecord>(json!({"amount": "lots"}));
        assert!(bad.is_err());
    }

    #[test]
    fn test_class_access_label() {
        let plan = MembershipPlan {
            plan_name: "Basic".into(),
            class_access_limit: Some(4),
            ..MembershipPlan::default()
        };
        assert_eq!(plan.class_access_label(), "4 classes per week");

        let plan = MembershipPlan {
            class_access_limit: Some(0),
            ..plan
        };
        assert_eq!(plan.class_access_label(), "Unlimited classes");
    }

    #[test]
    fn test_weekly_schedule_keeps_day_order() {
        let envelope: WeeklyScheduleEnvelope = serde_json::from_str(
            r#"{"member_id": 1, "weekly_schedule": {
                "Wednesday": [{"time": "18:00", "class_name": "Spin", "room": "Studio B", "spots_left": 4}],
                "Monday": [{"time": "07:00", "class_name": "Yoga"}],
                "Friday": []
            }}"#,
        )
        .unwrap();

        let days: Vec<&str> = envelope
            .weekly_schedule
            .days
            .iter()
            .map(|d| d.day.as_str())
            .collect();
        assert_eq!(days, ["Wednesday", "Monday", "Friday"]);
        assert_eq!(envelope.weekly_schedule.total_classes(), 2);
        assert_eq!(envelope.weekly_schedule.days[0].classes[0].spots_left, Some(4));
    }

    #[test]
    fn test_admin_stats_defaults() {
        let stats: AdminStats = serde_json::from_value(json!({
            "total_members": 50,
            "active_members": 45,
            "monthly_revenue": 8450.5,
            "membership_tiers": [{"name": "Basic", "count": 20}]
        }))
        .unwrap();
        assert_eq!(stats.total_members, 50);
        assert_eq!(stats.outstanding, 0.0);
        assert_eq!(stats.membership_tiers.len(), 1);
        assert!(stats.recent_activity.is_empty());
    }
}

//! Plain-text rendering of dashboard views for the terminal client.

use std::fmt::{self, Write};

use crate::dashboard::views::{AdminView, BillingView, DashboardView, SCHEDULED_JOBS};

fn money(amount: f64) -> String {
    format!("${:.2}", amount)
}

fn or_dash(value: Option<&str>) -> &str {
    value.unwrap_or("-")
}

pub fn dashboard(view: &DashboardView) -> Result<String, fmt::Error> {
    let mut out = String::new();

    match &view.member {
        Some(member) => {
            writeln!(out, "Welcome back, {}", member.full_name())?;
            writeln!(
                out,
                "Membership: {} ({})",
                or_dash(member.membership_level.as_deref()),
                or_dash(member.membership_status.as_deref())
            )?;
        }
        None => writeln!(out, "Welcome back")?,
    }

    // A member without height or weight still gets a BMI line.
    match view.bmi() {
        Some(bmi) => writeln!(out, "BMI: {:.1}", bmi)?,
        None => writeln!(out, "BMI: 0")?,
    }

    writeln!(out)?;
    writeln!(out, "Recommended classes")?;
    if view.recommendations.is_empty() {
        writeln!(out, "  No recommendations yet")?;
    }
    for rec in &view.recommendations {
        write!(out, "  {}", rec.class_name)?;
        if let Some(pct) = rec.match_percentage {
            write!(out, " ({:.0}% match)", pct)?;
        }
        if let Some(instructor) = &rec.instructor {
            write!(out, " with {}", instructor)?;
        }
        writeln!(out)?;
        for reason in &rec.reasons {
            writeln!(out, "    - {}", reason)?;
        }
    }

    writeln!(out)?;
    writeln!(out, "This week")?;
    if view.weekly_schedule.is_empty() {
        writeln!(out, "  No classes scheduled")?;
    }
    for day in &view.weekly_schedule.days {
        writeln!(out, "  {}", day.day)?;
        for slot in &day.classes {
            write!(out, "    {} {}", slot.time, slot.class_name)?;
            if let Some(room) = &slot.room {
                write!(out, " @ {}", room)?;
            }
            if let Some(spots) = slot.spots_left {
                write!(out, " ({} spots left)", spots)?;
            }
            writeln!(out)?;
        }
    }

    Ok(out)
}

pub fn billing(view: &BillingView) -> Result<String, fmt::Error> {
    let mut out = String::new();

    match view.current_plan() {
        Some(plan) => writeln!(
            out,
            "Current plan: {} at {}/month, {}",
            plan.plan_name,
            money(plan.monthly_fee),
            plan.class_access_label()
        )?,
        None => writeln!(
            out,
            "Current plan: {}",
            or_dash(view.membership_level())
        )?,
    }

    writeln!(out)?;
    writeln!(out, "Plans")?;
    for (plan, action) in view.plan_options() {
        writeln!(
            out,
            "  [{}] {} {}/month",
            action.label(),
            plan.plan_name,
            money(plan.monthly_fee)
        )?;
        if let Some(features) = &plan.features {
            writeln!(out, "      {}", features)?;
        }
    }

    writeln!(out)?;
    writeln!(out, "Billing history")?;
    if view.history.is_empty() {
        writeln!(out, "  No billing records")?;
    }
    for record in &view.history {
        writeln!(
            out,
            "  {}  {}  {}  {}",
            or_dash(record.billing_date.as_deref()),
            money(record.amount),
            or_dash(record.payment_method.as_deref()),
            or_dash(record.payment_status.as_deref())
        )?;
    }

    Ok(out)
}

pub fn admin(view: &AdminView) -> Result<String, fmt::Error> {
    let mut out = String::new();
    let stats = &view.stats;
    let (active, inactive) = view.status_split();

    writeln!(out, "Total members:    {}", stats.total_members)?;
    writeln!(
        out,
        "Active members:   {} ({}%)",
        stats.active_members,
        view.active_percentage()
    )?;
    writeln!(out, "New this month:   {}", stats.new_this_month)?;
    writeln!(out, "Monthly revenue:  {}", money(stats.monthly_revenue))?;
    writeln!(out, "Outstanding:      {}", money(stats.outstanding))?;
    writeln!(out, "Total classes:    {}", stats.total_classes)?;
    writeln!(out, "Avg attendance:   {}", stats.avg_attendance)?;

    writeln!(out)?;
    writeln!(out, "Member status: {} active, {} inactive", active, inactive)?;

    writeln!(out)?;
    writeln!(out, "Membership tiers")?;
    for share in view.tier_shares() {
        writeln!(out, "  {:<12} {:>5} ({}%)", share.name, share.count, share.percent)?;
    }

    writeln!(out)?;
    writeln!(out, "Popular classes")?;
    for class in &stats.popular_classes {
        writeln!(out, "  {:<20} {} bookings", class.name, class.bookings)?;
    }

    writeln!(out)?;
    writeln!(out, "Recent activity")?;
    for activity in &stats.recent_activity {
        writeln!(
            out,
            "  {} {}: {} ({})",
            activity.icon, activity.title, activity.description, activity.time
        )?;
    }

    writeln!(out)?;
    writeln!(out, "Scheduled jobs")?;
    for job in SCHEDULED_JOBS {
        writeln!(out, "  {} [{}] {}", job.name, job.status, job.schedule)?;
        writeln!(out, "      {}", job.description)?;
    }

    Ok(out)
}

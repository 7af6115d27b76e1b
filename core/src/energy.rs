//! Energy-expenditure model: Mifflin-St Jeor BMR, activity-scaled TDEE, and
//! the goal-adjusted calorie target derived onto each profile.

use chrono::NaiveDate;

use crate::models::{ActivityLevel, DailyStats, Gender, Goal, UserProfile};

const CUT_DEFICIT: f64 = 400.0;
const BULK_SURPLUS: f64 = 300.0;

#[must_use]
pub fn calculate_bmr(weight_kg: f64, height_cm: f64, age: u32, gender: Gender) -> i64 {
    let base = 10.0 * weight_kg + 6.25 * height_cm - 5.0 * f64::from(age);
    let bmr = match gender {
        Gender::Male => base + 5.0,
        Gender::Female => base - 161.0,
    };
    bmr.round() as i64
}

#[must_use]
pub fn activity_multiplier(level: ActivityLevel) -> f64 {
    match level {
        ActivityLevel::Sedentary => 1.2,
        ActivityLevel::Light => 1.375,
        ActivityLevel::Moderate => 1.55,
        ActivityLevel::Active => 1.725,
        ActivityLevel::VeryActive => 1.9,
    }
}

#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn calculate_tdee(bmr: i64, level: ActivityLevel) -> i64 {
    (bmr as f64 * activity_multiplier(level)).round() as i64
}

#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn calculate_target_calories(tdee: i64, goal: Goal) -> i64 {
    let tdee = tdee as f64;
    let target = match goal {
        Goal::Cut => tdee - CUT_DEFICIT,
        Goal::Maintain => tdee,
        Goal::Bulk => tdee + BULK_SURPLUS,
    };
    target.round() as i64
}

/// Recompute `tdee` and `target_calories` from the profile's own fields.
#[must_use]
pub fn derive_targets(mut profile: UserProfile) -> UserProfile {
    let bmr = calculate_bmr(profile.weight, profile.height, profile.age, profile.gender);
    profile.tdee = calculate_tdee(bmr, profile.activity_level);
    profile.target_calories = calculate_target_calories(profile.tdee, profile.goal);
    profile
}

/// Why a daily-stats save left the live profile alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NotToday,
    NoWeight,
    WeightUnchanged,
    ProfileMissing,
}

/// Outcome of applying a daily-stats write to the live profile.
#[derive(Debug, Clone, PartialEq)]
pub enum Recalculation {
    Updated(UserProfile),
    Skipped(SkipReason),
}

impl Recalculation {
    #[must_use]
    pub fn profile(&self) -> Option<&UserProfile> {
        match self {
            Recalculation::Updated(profile) => Some(profile),
            Recalculation::Skipped(_) => None,
        }
    }
}

/// Decide whether `stats` should move the profile's live energy targets.
///
/// Only a weight logged for `today` that differs from the stored weight
/// counts. Past dates are history only.
#[must_use]
#[allow(clippy::float_cmp)]
pub fn recalculate_for_stats(
    profile: &UserProfile,
    stats: &DailyStats,
    today: NaiveDate,
) -> Recalculation {
    if stats.date != today {
        return Recalculation::Skipped(SkipReason::NotToday);
    }
    let Some(weight) = stats.weight.filter(|w| w.is_finite() && *w > 0.0) else {
        return Recalculation::Skipped(SkipReason::NoWeight);
    };
    if weight == profile.weight {
        return Recalculation::Skipped(SkipReason::WeightUnchanged);
    }
    let updated = UserProfile {
        weight,
        ..profile.clone()
    };
    Recalculation::Updated(derive_targets(updated))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn profile() -> UserProfile {
        derive_targets(UserProfile {
            id: "u1".to_string(),
            name: "Sam".to_string(),
            avatar: None,
            height: 180.0,
            weight: 80.0,
            age: 25,
            gender: Gender::Male,
            activity_level: ActivityLevel::Sedentary,
            goal: Goal::Cut,
            tdee: 0,
            target_calories: 0,
        })
    }

    fn stats(day: &str, weight: Option<f64>) -> DailyStats {
        DailyStats {
            id: String::new(),
            date: date(day),
            weight,
            body_fat: None,
            note: None,
        }
    }

    #[test]
    fn test_bmr_male() {
        assert_eq!(calculate_bmr(80.0, 180.0, 25, Gender::Male), 1805);
    }

    #[test]
    fn test_bmr_female() {
        assert_eq!(calculate_bmr(55.0, 160.0, 30, Gender::Female), 1239);
    }

    #[test]
    fn test_bmr_rounds_to_nearest() {
        // 10*70.37 + 6.25*171 - 5*40 + 5 = 1577.45
        assert_eq!(calculate_bmr(70.37, 171.0, 40, Gender::Male), 1577);
        // 10*70.41 + 6.25*171 - 5*40 + 5 = 1577.85
        assert_eq!(calculate_bmr(70.41, 171.0, 40, Gender::Male), 1578);
    }

    #[test]
    fn test_tdee_multipliers() {
        assert_eq!(calculate_tdee(1500, ActivityLevel::Sedentary), 1800);
        assert_eq!(calculate_tdee(2000, ActivityLevel::Active), 3450);
        assert_eq!(calculate_tdee(2000, ActivityLevel::Light), 2750);
        assert_eq!(calculate_tdee(2000, ActivityLevel::Moderate), 3100);
        assert_eq!(calculate_tdee(2000, ActivityLevel::VeryActive), 3800);
    }

    #[test]
    fn test_target_calories() {
        assert_eq!(calculate_target_calories(2000, Goal::Cut), 1600);
        assert_eq!(calculate_target_calories(2000, Goal::Maintain), 2000);
        assert_eq!(calculate_target_calories(2000, Goal::Bulk), 2300);
    }

    #[test]
    fn test_derive_targets() {
        let p = profile();
        // BMR 1805 * 1.2 = 2166, cut -> 1766
        assert_eq!(p.tdee, 2166);
        assert_eq!(p.target_calories, 1766);
    }

    #[test]
    fn test_recalculate_today_new_weight() {
        let today = date("2024-06-15");
        let result = recalculate_for_stats(&profile(), &stats("2024-06-15", Some(78.0)), today);
        let updated = result.profile().unwrap();
        // BMR = 780 + 1125 - 125 + 5 = 1785; TDEE = 2142; cut -> 1742
        assert!((updated.weight - 78.0).abs() < f64::EPSILON);
        assert_eq!(updated.tdee, 2142);
        assert_eq!(updated.target_calories, 1742);
        assert_eq!(updated.height, 180.0);
    }

    #[test]
    fn test_recalculate_skips_past_date() {
        let today = date("2024-06-15");
        assert_eq!(
            recalculate_for_stats(&profile(), &stats("2024-06-14", Some(78.0)), today),
            Recalculation::Skipped(SkipReason::NotToday)
        );
    }

    #[test]
    fn test_recalculate_skips_unchanged_or_missing_weight() {
        let today = date("2024-06-15");
        assert_eq!(
            recalculate_for_stats(&profile(), &stats("2024-06-15", Some(80.0)), today),
            Recalculation::Skipped(SkipReason::WeightUnchanged)
        );
        assert_eq!(
            recalculate_for_stats(&profile(), &stats("2024-06-15", None), today),
            Recalculation::Skipped(SkipReason::NoWeight)
        );
    }

    #[test]
    fn test_recalculate_ignores_unusable_weight() {
        let today = date("2024-06-15");
        for weight in [f64::NAN, f64::INFINITY, -50.0, 0.0] {
            assert_eq!(
                recalculate_for_stats(&profile(), &stats("2024-06-15", Some(weight)), today),
                Recalculation::Skipped(SkipReason::NoWeight),
                "weight {weight}"
            );
        }
    }
}

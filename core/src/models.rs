use std::fmt;
use std::str::FromStr;

use anyhow::{Result, bail};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Male,
    Female,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityLevel {
    Sedentary,
    Light,
    Moderate,
    Active,
    VeryActive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Goal {
    Cut,
    Maintain,
    Bulk,
}

impl FromStr for Gender {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "male" | "m" => Ok(Gender::Male),
            "female" | "f" => Ok(Gender::Female),
            _ => bail!("Invalid gender '{s}'. Use: male, female"),
        }
    }
}

impl FromStr for ActivityLevel {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "sedentary" => Ok(ActivityLevel::Sedentary),
            "light" => Ok(ActivityLevel::Light),
            "moderate" => Ok(ActivityLevel::Moderate),
            "active" => Ok(ActivityLevel::Active),
            "very_active" => Ok(ActivityLevel::VeryActive),
            _ => bail!(
                "Invalid activity level '{s}'. Use: sedentary, light, moderate, active, very-active"
            ),
        }
    }
}

impl FromStr for Goal {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "cut" => Ok(Goal::Cut),
            "maintain" => Ok(Goal::Maintain),
            "bulk" => Ok(Goal::Bulk),
            _ => bail!("Invalid goal '{s}'. Use: cut, maintain, bulk"),
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Gender::Male => "male",
            Gender::Female => "female",
        })
    }
}

impl fmt::Display for ActivityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ActivityLevel::Sedentary => "sedentary",
            ActivityLevel::Light => "light",
            ActivityLevel::Moderate => "moderate",
            ActivityLevel::Active => "active",
            ActivityLevel::VeryActive => "very-active",
        })
    }
}

impl fmt::Display for Goal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Goal::Cut => "cut",
            Goal::Maintain => "maintain",
            Goal::Bulk => "bulk",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    pub name: String,
    /// Base64 data URL for the profile photo.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    /// Centimetres.
    pub height: f64,
    /// Kilograms.
    pub weight: f64,
    pub age: u32,
    pub gender: Gender,
    pub activity_level: ActivityLevel,
    pub goal: Goal,
    /// Derived; see [`crate::energy`].
    #[serde(default)]
    pub tdee: i64,
    /// Derived; see [`crate::energy`].
    #[serde(default)]
    pub target_calories: i64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Macros {
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
}

impl Macros {
    #[must_use]
    pub fn sum<'a>(items: impl IntoIterator<Item = &'a Macros>) -> Macros {
        items.into_iter().fold(Macros::default(), |acc, m| Macros {
            calories: acc.calories + m.calories,
            protein: acc.protein + m.protein,
            carbs: acc.carbs + m.carbs,
            fat: acc.fat + m.fat,
        })
    }

    /// Every value is a finite, non-negative number.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        [self.calories, self.protein, self.carbs, self.fat]
            .iter()
            .all(|v| v.is_finite() && *v >= 0.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ingredient {
    /// Ingredient name, usually with its weight ("rice 150g").
    pub name: String,
    #[serde(flatten)]
    pub macros: Macros,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoodLogItem {
    pub id: String,
    pub name: String,
    #[serde(flatten)]
    pub macros: Macros,
    /// Milliseconds since the Unix epoch.
    #[serde(default)]
    pub timestamp: i64,
    pub date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ingredients: Option<Vec<Ingredient>>,
}

impl FoodLogItem {
    /// Replace the macro totals with the sum of the ingredient breakdown, if any.
    #[must_use]
    pub fn totals_from_ingredients(mut self) -> Self {
        if let Some(ingredients) = &self.ingredients {
            self.macros = Macros::sum(ingredients.iter().map(|i| &i.macros));
        }
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkoutLogItem {
    pub id: String,
    pub exercise: String,
    pub sets: u32,
    pub reps: u32,
    /// Kilograms.
    pub weight: f64,
    pub date: NaiveDate,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub timestamp: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BodyCheckItem {
    pub id: String,
    pub date: NaiveDate,
    pub image: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(default)]
    pub timestamp: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedFoodItem {
    pub id: String,
    pub name: String,
    #[serde(flatten)]
    pub macros: Macros,
    #[serde(default)]
    pub times_used: u32,
}

/// A food to remember in the personal database; id and usage count are
/// assigned by the store.
#[derive(Debug, Clone)]
pub struct NewSavedFood {
    pub name: String,
    pub macros: Macros,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyStats {
    /// Composite `userId_date`; regenerated on every save.
    #[serde(default)]
    pub id: String,
    pub date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body_fat: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl DailyStats {
    #[must_use]
    pub fn composite_id(user_id: &str, date: NaiveDate) -> String {
        format!("{user_id}_{}", date.format("%Y-%m-%d"))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DailySummary {
    pub date: NaiveDate,
    pub consumed: Macros,
    pub target_calories: i64,
    pub remaining_calories: f64,
    pub food_logs: Vec<FoodLogItem>,
    pub workouts: Vec<WorkoutLogItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<DailyStats>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub users_imported: usize,
    pub food_logs_imported: usize,
    pub workouts_imported: usize,
    pub body_checks_imported: usize,
    pub saved_foods_imported: usize,
    pub daily_stats_imported: usize,
    /// Snapshot version as found in the file, before migration.
    pub source_version: u32,
}

/// Input for the external nutrition estimator: free text, a photo, or both.
#[derive(Debug, Clone, Default)]
pub struct FoodEstimateRequest {
    pub text: Option<String>,
    /// Base64 data URL.
    pub image: Option<String>,
}

/// Structured answer from the nutrition estimator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoodEstimate {
    pub name: String,
    #[serde(flatten)]
    pub macros: Macros,
    #[serde(default)]
    pub ingredients: Vec<Ingredient>,
}

/// One exercise suggested by the workout estimator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkoutSuggestion {
    pub exercise: String,
    pub sets: u32,
    pub reps: u32,
    #[serde(default)]
    pub weight: f64,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Per-macro slack allowed between a food log's totals and its ingredients.
pub const MACRO_TOLERANCE: f64 = 0.5;

/// Check that a food log's totals agree with its ingredient breakdown.
pub fn validate_food_log(item: &FoodLogItem) -> Result<()> {
    if item.name.trim().is_empty() {
        bail!("Food name must not be empty");
    }
    let m = &item.macros;
    if !m.is_valid() {
        bail!("Macro values must be finite and non-negative");
    }
    if let Some(ingredients) = &item.ingredients {
        if let Some(bad) = ingredients.iter().find(|i| !i.macros.is_valid()) {
            bail!("Ingredient '{}' has an invalid macro value", bad.name);
        }
        let sum = Macros::sum(ingredients.iter().map(|i| &i.macros));
        let checks = [
            ("calories", m.calories, sum.calories),
            ("protein", m.protein, sum.protein),
            ("carbs", m.carbs, sum.carbs),
            ("fat", m.fat, sum.fat),
        ];
        for (label, total, parts) in checks {
            if (total - parts).abs() > MACRO_TOLERANCE {
                bail!("Food '{}' {label} total {total} does not match ingredient sum {parts}", item.name);
            }
        }
    }
    Ok(())
}

pub fn validate_profile(profile: &UserProfile) -> Result<()> {
    if profile.name.trim().is_empty() {
        bail!("Profile name must not be empty");
    }
    if !is_positive(profile.height) {
        bail!("Height must be greater than 0");
    }
    if !is_positive(profile.weight) {
        bail!("Weight must be greater than 0");
    }
    if profile.age == 0 {
        bail!("Age must be greater than 0");
    }
    Ok(())
}

/// Reject weights and body-fat readings that cannot be stored as JSON numbers
/// or make no physical sense.
pub fn validate_daily_stats(stats: &DailyStats) -> Result<()> {
    if stats.weight.is_some_and(|w| !is_positive(w)) {
        bail!("Weight must be a positive number");
    }
    if stats
        .body_fat
        .is_some_and(|bf| !(0.0..=100.0).contains(&bf))
    {
        bail!("Body fat must be between 0 and 100");
    }
    Ok(())
}

fn is_positive(v: f64) -> bool {
    v.is_finite() && v > 0.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn ingredient(name: &str, calories: f64, protein: f64) -> Ingredient {
        Ingredient {
            name: name.to_string(),
            macros: Macros {
                calories,
                protein,
                carbs: 10.0,
                fat: 1.0,
            },
        }
    }

    #[test]
    fn test_profile_wire_names() {
        let value = json!({
            "id": "u1",
            "name": "Ann",
            "height": 165.0,
            "weight": 60.0,
            "age": 30,
            "gender": "female",
            "activityLevel": "very_active",
            "goal": "cut",
            "tdee": 2100,
            "targetCalories": 1700
        });
        let profile: UserProfile = serde_json::from_value(value.clone()).unwrap();
        assert_eq!(profile.activity_level, ActivityLevel::VeryActive);
        assert_eq!(profile.target_calories, 1700);
        assert_eq!(serde_json::to_value(&profile).unwrap(), value);
    }

    #[test]
    fn test_food_log_flattens_macros() {
        let item = FoodLogItem {
            id: "f1".to_string(),
            name: "Oats".to_string(),
            macros: Macros {
                calories: 150.0,
                protein: 5.0,
                carbs: 27.0,
                fat: 3.0,
            },
            timestamp: 0,
            date: date("2024-06-15"),
            image: None,
            ingredients: None,
        };
        let value = serde_json::to_value(&item).unwrap();
        assert_eq!(value["calories"], 150.0);
        assert_eq!(value["date"], "2024-06-15");
        assert!(value.get("image").is_none());
    }

    #[test]
    fn test_parse_enums() {
        assert_eq!("Very-Active".parse::<ActivityLevel>().unwrap(), ActivityLevel::VeryActive);
        assert_eq!("f".parse::<Gender>().unwrap(), Gender::Female);
        assert_eq!("BULK".parse::<Goal>().unwrap(), Goal::Bulk);
        assert!("lazy".parse::<ActivityLevel>().is_err());
    }

    #[test]
    fn test_composite_id() {
        assert_eq!(
            DailyStats::composite_id("u1", date("2024-06-05")),
            "u1_2024-06-05"
        );
    }

    #[test]
    fn test_totals_from_ingredients() {
        let item = FoodLogItem {
            id: "f1".to_string(),
            name: "Bowl".to_string(),
            macros: Macros::default(),
            timestamp: 0,
            date: date("2024-06-15"),
            image: None,
            ingredients: Some(vec![ingredient("rice", 200.0, 4.0), ingredient("egg", 70.0, 6.0)]),
        }
        .totals_from_ingredients();
        assert!((item.macros.calories - 270.0).abs() < 0.01);
        assert!((item.macros.protein - 10.0).abs() < 0.01);
        assert!((item.macros.carbs - 20.0).abs() < 0.01);
        validate_food_log(&item).unwrap();
    }

    #[test]
    fn test_validate_food_log_mismatch() {
        let mut item = FoodLogItem {
            id: "f1".to_string(),
            name: "Bowl".to_string(),
            macros: Macros::default(),
            timestamp: 0,
            date: date("2024-06-15"),
            image: None,
            ingredients: Some(vec![ingredient("rice", 200.0, 4.0)]),
        }
        .totals_from_ingredients();
        item.macros.calories += 50.0;
        let err = validate_food_log(&item).unwrap_err();
        assert!(err.to_string().contains("calories"));
    }

    #[test]
    fn test_validate_profile() {
        let mut profile = UserProfile {
            id: "u1".to_string(),
            name: "Ann".to_string(),
            avatar: None,
            height: 165.0,
            weight: 60.0,
            age: 30,
            gender: Gender::Female,
            activity_level: ActivityLevel::Light,
            goal: Goal::Maintain,
            tdee: 0,
            target_calories: 0,
        };
        validate_profile(&profile).unwrap();
        profile.weight = 0.0;
        assert!(validate_profile(&profile).is_err());
        profile.weight = f64::INFINITY;
        assert!(validate_profile(&profile).is_err());
        profile.weight = 60.0;
        profile.height = f64::NAN;
        assert!(validate_profile(&profile).is_err());
    }

    #[test]
    fn test_validate_food_log_rejects_non_finite() {
        let mut item = FoodLogItem {
            id: "f1".to_string(),
            name: "Oats".to_string(),
            macros: Macros {
                calories: f64::NAN,
                protein: 5.0,
                carbs: 27.0,
                fat: 3.0,
            },
            timestamp: 0,
            date: date("2024-06-15"),
            image: None,
            ingredients: None,
        };
        assert!(validate_food_log(&item).is_err());
        item.macros.calories = f64::INFINITY;
        assert!(validate_food_log(&item).is_err());
        item.macros.calories = 150.0;
        item.macros.fat = -1.0;
        assert!(validate_food_log(&item).is_err());
        item.macros.fat = 3.0;
        validate_food_log(&item).unwrap();
    }

    #[test]
    fn test_validate_food_log_rejects_bad_ingredient() {
        let mut bad = ingredient("rice", 200.0, 4.0);
        bad.macros.protein = f64::NAN;
        let item = FoodLogItem {
            id: "f1".to_string(),
            name: "Bowl".to_string(),
            macros: Macros {
                calories: 200.0,
                protein: 4.0,
                carbs: 10.0,
                fat: 1.0,
            },
            timestamp: 0,
            date: date("2024-06-15"),
            image: None,
            ingredients: Some(vec![bad]),
        };
        let err = validate_food_log(&item).unwrap_err();
        assert!(err.to_string().contains("rice"));
    }

    #[test]
    fn test_validate_daily_stats() {
        let mut stats = DailyStats {
            id: String::new(),
            date: date("2024-06-15"),
            weight: Some(80.0),
            body_fat: Some(18.0),
            note: None,
        };
        validate_daily_stats(&stats).unwrap();
        for weight in [f64::NAN, f64::INFINITY, -50.0, 0.0] {
            stats.weight = Some(weight);
            assert!(validate_daily_stats(&stats).is_err(), "weight {weight}");
        }
        stats.weight = None;
        validate_daily_stats(&stats).unwrap();
        stats.body_fat = Some(f64::NAN);
        assert!(validate_daily_stats(&stats).is_err());
        stats.body_fat = Some(120.0);
        assert!(validate_daily_stats(&stats).is_err());
    }
}

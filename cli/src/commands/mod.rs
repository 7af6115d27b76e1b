mod backup;
mod body;
mod food;
mod helpers;
mod profile;
mod saved;
mod settings;
mod stats;
mod summary;
mod workout;

pub(crate) use backup::{cmd_backup_export, cmd_backup_restore};
pub(crate) use body::{cmd_body_add, cmd_body_delete, cmd_body_list};
pub(crate) use food::{FoodInput, cmd_food_delete, cmd_food_edit, cmd_food_list, cmd_food_log};
pub(crate) use profile::{
    ProfileInput, cmd_profile_create, cmd_profile_delete, cmd_profile_list, cmd_profile_logout,
    cmd_profile_show, cmd_profile_switch, cmd_profile_update,
};
pub(crate) use saved::{cmd_saved_add, cmd_saved_delete, cmd_saved_list};
pub(crate) use settings::{SettingsChange, cmd_settings_set, cmd_settings_show};
pub(crate) use stats::{cmd_stats_delete, cmd_stats_list, cmd_stats_set, cmd_stats_show};
pub(crate) use summary::{cmd_history, cmd_summary};
pub(crate) use workout::{cmd_workout_add, cmd_workout_delete, cmd_workout_list};

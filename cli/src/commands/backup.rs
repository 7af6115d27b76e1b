use std::path::Path;

use anyhow::{Context, Result};

use nutritrack_core::service::TrackerService;

use super::helpers::print_json;

/// Write the whole store as a backup file, or to stdout when no path is given.
pub(crate) fn cmd_backup_export(svc: &TrackerService, output: Option<&Path>) -> Result<()> {
    let text = svc.export_json()?;
    match output {
        Some(path) => {
            std::fs::write(path, &text)
                .with_context(|| format!("Failed to write backup: {}", path.display()))?;
            eprintln!("Backup written to {}", path.display());
        }
        None => println!("{text}"),
    }
    Ok(())
}

/// Replace every collection with the contents of a backup file.
pub(crate) fn cmd_backup_restore(svc: &TrackerService, path: &Path, json: bool) -> Result<()> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read backup: {}", path.display()))?;
    let summary = svc
        .restore_json(&text)
        .with_context(|| format!("Failed to restore {}", path.display()))?;

    if json {
        return print_json(&summary);
    }

    println!(
        "Restored backup (format v{}) from {}",
        summary.source_version,
        path.display()
    );
    println!("  Profiles:     {}", summary.users_imported);
    println!("  Food logs:    {}", summary.food_logs_imported);
    println!("  Workouts:     {}", summary.workouts_imported);
    println!("  Body checks:  {}", summary.body_checks_imported);
    println!("  Saved foods:  {}", summary.saved_foods_imported);
    println!("  Daily stats:  {}", summary.daily_stats_imported);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_export_then_restore_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("backup.json");

        let source = TrackerService::new_in_memory().unwrap();
        cmd_backup_export(&source, Some(path.as_path())).unwrap();
        assert!(path.exists());

        let target = TrackerService::new_in_memory().unwrap();
        cmd_backup_restore(&target, &path, true).unwrap();
    }

    #[test]
    fn test_restore_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let svc = TrackerService::new_in_memory().unwrap();
        assert!(cmd_backup_restore(&svc, &dir.path().join("nope.json"), false).is_err());
    }
}

// Repair a settings file from the latest backup
//
// Run with: cargo run --example repair_from_backup

use serde_json::json;
use settings_repair::{
    JsonFileSettingsStore, RepairConfig, RepairOutcome, RunOptions, SettingsCache,
    SettingsCacheMirror, SettingsRepair,
};
use std::path::Path;
use std::sync::Arc;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let content = Path::new("./example_content");
    std::fs::create_dir_all(content.join("data"))?;

    // Backups taken while 2.16 was installed and 2.17 had not run yet
    let backup = json!({
        "meta": {"exported_on": 1543622400000u64, "version": "2.16.4"},
        "data": {
            "settings": [
                {"key": "title", "value": "My Blog", "type": "blog"},
                {"key": "is_private", "value": "true", "type": "private"},
                {"key": "force_i18n", "value": "true", "type": "blog"},
                {"key": "amp", "value": "true", "type": "blog"}
            ],
            "migrations": [{"version": "2.15"}, {"version": "2.16"}]
        }
    });
    std::fs::write(
        content.join("data/ghost.2018-11-30.json"),
        serde_json::to_string_pretty(&backup)?,
    )?;

    // Live table after the faulty migration flipped the flags
    let live = json!([
        {"id": 1, "key": "title", "value": "My Blog", "type": "blog"},
        {"id": 2, "key": "is_private", "value": "false", "type": "private"},
        {"id": 3, "key": "force_i18n", "value": "false", "type": "blog"},
        {"id": 4, "key": "amp", "value": "true", "type": "blog"}
    ]);
    let settings_path = content.join("settings.json");
    std::fs::write(&settings_path, serde_json::to_string_pretty(&live)?)?;

    println!("📦 settings-repair example\n");

    let store = JsonFileSettingsStore::new(&settings_path);
    let cache = Arc::new(SettingsCacheMirror::new());
    cache.populate(&store.load()?)?;

    let config = RepairConfig::builder().content_path(content).build();
    let repair = SettingsRepair::new(config, cache.clone());

    match repair.run(&store, &RunOptions::internal())? {
        RepairOutcome::Repaired { backup, reverted } => {
            println!("✅ Repaired from {}", backup.display());
            for key in &reverted {
                let cached = cache.get(key)?.map(|entry| entry.value);
                println!("   {key} -> {cached:?}");
            }
        }
        other => println!("ℹ️  Nothing to do: {other:?}"),
    }

    println!("\n📁 Settings file: {}", settings_path.display());
    println!("{}", std::fs::read_to_string(&settings_path)?);

    Ok(())
}

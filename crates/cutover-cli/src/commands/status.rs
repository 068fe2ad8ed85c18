use std::path::Path;

use cutover_state::StateStore;

pub fn status(config_path: &Path) -> anyhow::Result<()> {
    let (config, _) = super::load_config(config_path)?;
    let db = config.state_db_path();
    if !db.exists() {
        println!("No deployment recorded for {}", config.service.name);
        return Ok(());
    }

    let store = StateStore::open(&db)?;
    let Some(live) = store.live()? else {
        println!("No deployment recorded for {}", config.service.name);
        return Ok(());
    };

    println!("Service: {}", config.service.name);
    println!("  Live slot: {}", live.slot);
    println!("  Version:   {}", live.version);
    println!("  Port:      {}", config.slots.port(live.slot));
    println!("  Updated:   {}", live.updated_at.to_rfc3339());
    if let Some(last) = store.recent_records(1)?.into_iter().next() {
        println!(
            "  Last:      {} {} -> {} (slot {} -> {})",
            last.kind,
            last.previous_version.as_deref().unwrap_or("-"),
            last.new_version,
            last.previous_slot,
            last.new_slot
        );
    }
    Ok(())
}

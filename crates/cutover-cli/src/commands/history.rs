use std::path::Path;

use cutover_state::Ledger;

pub fn history(config_path: &Path, limit: usize) -> anyhow::Result<()> {
    let (config, _) = super::load_config(config_path)?;
    let lines = Ledger::new(config.ledger_path()).tail(limit)?;
    if lines.is_empty() {
        println!("No deployments yet");
    }
    for line in lines {
        println!("{line}");
    }
    Ok(())
}

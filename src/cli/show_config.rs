//! Show-config command

pub fn run() -> anyhow::Result<()> {
    let config = super::load_config()?;
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}

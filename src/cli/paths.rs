//! CLI subcommand: `hopbox paths`
//!
//! Prints the resolved config location and the host directories a Seatbelt
//! profile would be given.

use anyhow::Result;

use crate::config::Config;
use crate::paths::Paths;
use crate::sandbox::HostDirs;

pub fn run(config: &Config) -> Result<()> {
    let paths = Paths::resolve()?;

    println!("hopbox Paths");
    println!("============");
    println!();
    println!("Config:     {}", paths.config_dir.display());
    println!("  config.toml:    {}", paths.config_file().display());
    println!("  loaded from:    {}", config.path.display());
    println!();

    match HostDirs::resolve() {
        Ok(dirs) => {
            println!("Profile parameters:");
            println!("  TMP_DIR:        {}", dirs.tmp.display());
            println!("  HOME_DIR:       {}", dirs.home.display());
            println!("  CACHE_DIR:      {}", dirs.cache.display());
        }
        Err(e) => println!("Profile parameters: unavailable ({})", e),
    }

    Ok(())
}

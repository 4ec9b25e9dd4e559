use anyhow::{bail, Result};
use vhash_core::app;
use vhash_core::cache::{default_cache_path, SqliteCache};

use crate::CacheArgs;

pub fn run(args: &CacheArgs) -> Result<()> {
    let path = args.cache.clone().unwrap_or_else(default_cache_path);
    let cache = SqliteCache::init(&path)?;

    if let Some(target) = &args.find {
        return cache_find(&cache, target);
    }
    if let Some(target) = &args.del {
        app::cache_del(&cache, target)?;
        return Ok(());
    }
    if args.clear {
        cache.clear()?;
        return Ok(());
    }
    if args.prune {
        cache.prune(args.prune_period)?;
        return Ok(());
    }

    bail!("cache requires one of --find, --del, --clear, --prune");
}

fn cache_find(cache: &SqliteCache, target: &std::path::Path) -> Result<()> {
    match app::cache_find(cache, target)? {
        Some(hash) => {
            println!("FILE: {}", target.display());
            println!("HASH: 0x{:016x}", hash);
        }
        None => {
            println!("FILE: {}", target.display());
            println!("HASH: not cached");
        }
    }
    Ok(())
}

//! # Config File Tests
//!
//! Loading terrain configs from TOML files on disk.

use std::fs;
use std::path::PathBuf;

use strata_terrain::{TerrainConfig, TerrainError, TerrainGenerator};

fn temp_config(name: &str, text: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("strata_terrain_{}_{name}.toml", std::process::id()));
    fs::write(&path, text).expect("temp dir is writable");
    path
}

/// Test: A partial config file overrides only what it names.
#[test]
fn test_load_partial_file() {
    let path = temp_config(
        "partial",
        r#"
[constants]
water_level = 0.35

[cache]
fbm_memo_capacity = 512

[snow]
elevation_threshold = 0.8
"#,
    );
    let config = TerrainConfig::load(&path).expect("valid config");
    let _ = fs::remove_file(&path);

    assert_eq!(config.constants.water_level, 0.35);
    assert_eq!(config.cache.fbm_memo_capacity, 512);
    assert_eq!(config.snow.elevation_threshold, 0.8);
    assert_eq!(config.river, TerrainConfig::default().river);

    let generator = TerrainGenerator::with_config(42.0, 64, config).expect("valid seed");
    let tile = generator.sample(0, 0);
    assert!((0.0..=1.0).contains(&tile.height));
}

/// Test: Bad values in a file are rejected with the field name.
#[test]
fn test_load_rejects_bad_values() {
    let path = temp_config("bad", "[lake]\nmin_height = 0.9\nmax_height = 0.4\n");
    let result = TerrainConfig::load(&path);
    let _ = fs::remove_file(&path);

    match result {
        Err(TerrainError::InvalidConfig { field, .. }) => assert_eq!(field, "lake.max_height"),
        other => panic!("expected invalid config, got {other:?}"),
    }
}

/// Test: Raising the water level floods everything below it.
#[test]
fn test_water_level_floods_lowland() {
    let mut flooded = TerrainConfig::default();
    flooded.constants.water_level = 0.6;
    let dry = TerrainGenerator::new(42.0, 0).expect("valid seed");
    let wet = TerrainGenerator::with_config(42.0, 0, flooded).expect("valid seed");

    for i in 0..200 {
        let (x, y) = (i * 97, i * 31);
        let before = dry.compute(x, y);
        let after = wet.compute(x, y);
        assert_eq!(before.continent, after.continent);
        if after.height < 0.6 {
            assert!(after.is_water(), "({x}, {y}) at {} stayed dry", after.height);
        }
    }
}

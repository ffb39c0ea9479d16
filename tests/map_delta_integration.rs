//! Map delta integration tests
//!
//! Exercises the patch path the way a map load uses it: resolve shared
//! templates, apply per-map module deltas, and verify the shared registry
//! never observes the customization.

use std::fs;
use std::path::PathBuf;

use unitsmith::content::{load_content, ContentLoader};
use unitsmith::core::config::{ContentConfig, LoadPolicy};
use unitsmith::templates::{
    apply_patches, AttributeValue, ModuleKind, ModuleSpec, PatchOp, TemplateRegistry,
};

const RULES: &str = r#"
[[templates]]
id = "Tank"

[templates.attributes]
HitPoints = 100

[[templates.modules]]
kind = "draw"
name = "TankDraw"

[[templates]]
id = "EliteTank"
parent = "Tank"

[templates.attributes]
HitPoints = 150
"#;

fn loaded_registry() -> TemplateRegistry {
    let mut registry = TemplateRegistry::new();
    let loader = ContentLoader::new(LoadPolicy::Strict);
    loader.load_str(&mut registry, RULES).unwrap();
    registry
}

fn scratch_dir(label: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("unitsmith_{}_{}", label, std::process::id()));
    if dir.exists() {
        fs::remove_dir_all(&dir).unwrap();
    }
    fs::create_dir_all(&dir).unwrap();
    dir
}

#[test]
fn test_draw_swap_scenario() {
    let registry = loaded_registry();
    let elite = registry.resolve("EliteTank").unwrap();

    let patched = apply_patches(
        &elite,
        &[
            PatchOp::Remove("TankDraw".to_string()),
            PatchOp::Add(ModuleSpec::named(ModuleKind::Draw, "EliteTankDraw")),
        ],
    )
    .unwrap();

    let draws: Vec<Option<&str>> = patched
        .modules(ModuleKind::Draw)
        .iter()
        .map(|m| m.name.as_deref())
        .collect();
    assert_eq!(draws, vec![Some("EliteTankDraw")]);
    assert_eq!(
        patched.attributes().get("HitPoints"),
        Some(&AttributeValue::Integer(150))
    );
}

#[test]
fn test_patched_values_never_reach_the_registry() {
    let registry = loaded_registry();
    let loader = ContentLoader::new(LoadPolicy::Strict);

    let overrides = loader
        .load_delta_str(
            &registry,
            r#"
[[patches]]
target = "EliteTank"

[[patches.ops]]
op = "remove"
name = "TankDraw"
"#,
        )
        .unwrap();

    assert!(overrides.get("EliteTank").unwrap().modules(ModuleKind::Draw).is_empty());

    // Resolving through the registry still yields the unpatched template,
    // for this map and any other consumer.
    let shared = registry.resolve("EliteTank").unwrap();
    assert_eq!(shared.modules(ModuleKind::Draw).len(), 1);
}

#[test]
fn test_full_load_with_delta_directory() {
    let dir = scratch_dir("deltas");
    let rules_dir = dir.join("rules");
    let map_dir = dir.join("map");
    fs::create_dir_all(&rules_dir).unwrap();
    fs::create_dir_all(&map_dir).unwrap();

    fs::write(rules_dir.join("tanks.toml"), RULES).unwrap();
    // Two delta files; lexical order means 10_ applies before 20_.
    fs::write(
        map_dir.join("10_strip.toml"),
        r#"
[[patches]]
target = "EliteTank"

[[patches.ops]]
op = "remove"
name = "TankDraw"
"#,
    )
    .unwrap();
    fs::write(
        map_dir.join("20_redress.toml"),
        r#"
[[patches]]
target = "EliteTank"

[[patches.ops]]
op = "add"

[patches.ops.module]
kind = "draw"
name = "SnowTankDraw"
"#,
    )
    .unwrap();

    let config = ContentConfig::new()
        .with_rule_dir(&rules_dir)
        .with_map_delta_dir(&map_dir);
    let loaded = load_content(&config).unwrap();

    let effective = loaded
        .overrides
        .effective(&loaded.registry, "EliteTank")
        .unwrap();
    let draws: Vec<Option<&str>> = effective
        .modules(ModuleKind::Draw)
        .iter()
        .map(|m| m.name.as_deref())
        .collect();
    assert_eq!(draws, vec![Some("SnowTankDraw")]);

    // Untouched templates fall through to the shared value.
    let tank = loaded.overrides.effective(&loaded.registry, "Tank").unwrap();
    assert_eq!(tank.modules(ModuleKind::Draw).len(), 1);

    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_stale_patch_aborts_strict_map_load() {
    let registry = loaded_registry();
    let loader = ContentLoader::new(LoadPolicy::Strict);

    let result = loader.load_delta_str(
        &registry,
        r#"
[[patches]]
target = "EliteTank"

[[patches.ops]]
op = "remove"
name = "RenamedLongAgo"
"#,
    );
    assert!(result.is_err());
}

#[test]
fn test_lenient_map_load_keeps_good_patches() {
    let registry = loaded_registry();
    let loader = ContentLoader::new(LoadPolicy::Lenient);

    let overrides = loader
        .load_delta_str(
            &registry,
            r#"
[[patches]]
target = "EliteTank"

[[patches.ops]]
op = "remove"
name = "RenamedLongAgo"

[[patches]]
target = "Tank"

[[patches.ops]]
op = "add"

[patches.ops.module]
kind = "client_update"
name = "MapBeacon"
"#,
        )
        .unwrap();

    // The stale patch was skipped, the valid one applied.
    assert!(overrides.get("EliteTank").is_none());
    assert_eq!(
        overrides.get("Tank").unwrap().modules(ModuleKind::ClientUpdate).len(),
        1
    );
}

#[test]
fn test_replace_changes_family_through_delta() {
    let registry = loaded_registry();
    let loader = ContentLoader::new(LoadPolicy::Strict);

    let overrides = loader
        .load_delta_str(
            &registry,
            r#"
[[patches]]
target = "Tank"

[[patches.ops]]
op = "replace"
name = "TankDraw"

[patches.ops.module]
kind = "client_update"
name = "TankGhost"
"#,
        )
        .unwrap();

    let patched = overrides.get("Tank").unwrap();
    assert!(patched.modules(ModuleKind::Draw).is_empty());
    assert_eq!(
        patched.modules(ModuleKind::ClientUpdate)[0].name.as_deref(),
        Some("TankGhost")
    );
}

use super::*;
use serde_json::json;

#[test]
fn canonical_json_sorts_nested_keys() {
    let value = json!({ "b": 1, "a": { "z": true, "m": [ { "y": 2, "x": 1 } ] } });
    let canonical = canonical_json(&value).expect("canonicalize");
    assert_eq!(canonical, r#"{"a":{"m":[{"x":1,"y":2}],"z":true},"b":1}"#);
}

#[test]
fn genome_id_ignores_field_insertion_order() {
    let first = AgentConfig::from_value(json!({
        "name": "scout",
        "directive": "Explore.",
        "traits": { "speed": 3, "caution": 0.5 },
    }))
    .expect("first config");
    let second = AgentConfig::from_value(json!({
        "traits": { "caution": 0.5, "speed": 3 },
        "directive": "Explore.",
        "name": "scout",
    }))
    .expect("second config");

    let a = compute_genome_id(&first, "fp", GENOME_STATE_VERSION).expect("genome a");
    let b = compute_genome_id(&second, "fp", GENOME_STATE_VERSION).expect("genome b");
    assert_eq!(a, b);
    assert_eq!(a.len(), 64);
}

#[test]
fn genome_id_depends_on_code_and_version() {
    let config = config("scout");
    let base = compute_genome_id(&config, "fp-1", 1).expect("base");
    assert_ne!(base, compute_genome_id(&config, "fp-2", 1).expect("other code"));
    assert_ne!(base, compute_genome_id(&config, "fp-1", 2).expect("other version"));
    assert_eq!(base, compute_genome_id(&config, "fp-1", 1).expect("same inputs"));
}

#[test]
fn item_ids_are_content_addressed() {
    let a = Item::plain("pebble", 1.5).expect("item");
    let b = Item::plain("pebble", 1.5).expect("item");
    let c = Item::plain("pebble", 2.0).expect("item");
    assert_eq!(a.id, b.id);
    assert_ne!(a.id, c.id);
}

#[test]
fn digest_bytes_decode_hex_ids_and_hash_others() {
    let id = sha256_hex(b"anything");
    let bytes = genome_digest_bytes(&id);
    assert_eq!(hex::encode(bytes), id);
    assert_eq!(
        genome_digest_bytes(SESSION_END_GENOME_ID),
        genome_digest_bytes(SESSION_END_GENOME_ID)
    );
}

#[test]
fn generate_name_is_deterministic() {
    let genome = organism("org-1", "scout").genome_id().to_string();
    let first = generate_name(&genome);
    for _ in 0..10 {
        assert_eq!(generate_name(&genome), first);
    }
    assert_eq!(first.split(' ').count(), 3);
}

#[test]
fn culture_follows_first_digest_byte() {
    assert_eq!(Culture::from_byte(0), Culture::Sylvan);
    assert_eq!(Culture::from_byte(63), Culture::Sylvan);
    assert_eq!(Culture::from_byte(64), Culture::Littoral);
    assert_eq!(Culture::from_byte(191), Culture::Lithic);
    assert_eq!(Culture::from_byte(255), Culture::Ember);
}

#[test]
fn hybrid_name_is_deterministic_and_ordered() {
    let a = organism("org-1", "scout").genome_id().to_string();
    let b = organism("org-2", "keeper").genome_id().to_string();
    assert_eq!(generate_hybrid_name(&a, &b), generate_hybrid_name(&a, &b));
    assert_eq!(generate_hybrid_name(&a, &b).split(' ').count(), 3);
}

#[test]
fn archetype_is_derived_from_genome() {
    let organism = organism("org-1", "scout");
    assert_eq!(
        organism.archetype(),
        Archetype::from_genome(organism.genome_id())
    );
    for archetype in Archetype::ALL {
        assert!(archetype.appendage_capacity() <= 2);
        assert!((1..=5).contains(&archetype.pocket_capacity()));
    }
}

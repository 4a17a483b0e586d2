//! Deterministic designations derived from genome ids.
//!
//! `generate_name` partitions the first digest byte into four equal ranges
//! to pick a culture, then indexes that culture's tables with later bytes.
//! Hybrids take the genus from parent A's culture and the species from
//! parent B's, keyed off a digest of both parent ids.

use serde::{Deserialize, Serialize};

use super::identity::{genome_digest_bytes, sha256_hex};

struct NameTable {
    genera: &'static [&'static str],
    species: &'static [&'static str],
    titles: &'static [&'static str],
}

static SYLVAN: NameTable = NameTable {
    genera: &[
        "Quercus", "Betula", "Fagus", "Taxus", "Alnus", "Sorbus", "Acer", "Larix", "Picea",
        "Tilia", "Fraxinus", "Salix",
    ],
    species: &[
        "umbrosa", "frondosa", "radicans", "silvestris", "nemoralis", "virens", "muscosa",
        "serotina", "lignosa", "folialis",
    ],
    titles: &["Warden", "Grovekeeper", "Seedling", "Elder", "Rootbound", "Canopy"],
};

static LITTORAL: NameTable = NameTable {
    genera: &[
        "Halimeda", "Ulva", "Fucus", "Porphyra", "Codium", "Laminaria", "Padina", "Caulerpa",
        "Sargassum", "Zostera",
    ],
    species: &[
        "marina", "salina", "fluitans", "littoralis", "pelagica", "undulata", "spumosa",
        "tidalis", "abyssalis",
    ],
    titles: &["Tidecaller", "Drifter", "Shoalborn", "Current", "Brine", "Harbor"],
};

static LITHIC: NameTable = NameTable {
    genera: &[
        "Quarzum", "Feldspar", "Basaltum", "Micaceus", "Obsidia", "Granitum", "Calcitus",
        "Gypsa", "Dolomia", "Pyritus", "Schistus",
    ],
    species: &[
        "durissima", "cristallina", "stratosa", "fracta", "metallica", "petraea",
        "granulosa", "lamellata",
    ],
    titles: &["Bedrock", "Shardling", "Cairn", "Vein", "Monolith", "Scree"],
};

static EMBER: NameTable = NameTable {
    genera: &[
        "Ignis", "Cinder", "Fulgor", "Pyra", "Scintilla", "Flamma", "Ardor", "Favilla", "Calor",
    ],
    species: &[
        "ardens", "candens", "fervida", "rutilans", "fumosa", "torrida", "lucens", "volcanica",
        "solaris", "incendia",
    ],
    titles: &["Kindler", "Spark", "Forgeborn", "Ashwalker", "Beacon", "Smolder"],
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Culture {
    Sylvan,
    Littoral,
    Lithic,
    Ember,
}

impl Culture {
    /// Four equal ranges over the byte value: 0-63, 64-127, 128-191, 192-255.
    pub fn from_byte(byte: u8) -> Self {
        match byte / 64 {
            0 => Culture::Sylvan,
            1 => Culture::Littoral,
            2 => Culture::Lithic,
            _ => Culture::Ember,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Culture::Sylvan => "sylvan",
            Culture::Littoral => "littoral",
            Culture::Lithic => "lithic",
            Culture::Ember => "ember",
        }
    }

    fn table(&self) -> &'static NameTable {
        match self {
            Culture::Sylvan => &SYLVAN,
            Culture::Littoral => &LITTORAL,
            Culture::Lithic => &LITHIC,
            Culture::Ember => &EMBER,
        }
    }
}

fn pick(table: &'static [&'static str], hi: u8, lo: u8) -> &'static str {
    let index = usize::from(u16::from_be_bytes([hi, lo])) % table.len();
    table[index]
}

pub fn culture_of(genome_id: &str) -> Culture {
    Culture::from_byte(genome_digest_bytes(genome_id)[0])
}

/// Human-readable designation: `"<Title> <Genus> <species>"`.
pub fn generate_name(genome_id: &str) -> String {
    let bytes = genome_digest_bytes(genome_id);
    let table = Culture::from_byte(bytes[0]).table();
    let genus = pick(table.genera, bytes[1], bytes[2]);
    let species = pick(table.species, bytes[3], bytes[4]);
    let title = pick(table.titles, bytes[30], bytes[31]);
    format!("{title} {genus} {species}")
}

/// Designation for a conjugation child. Order matters: `(a, b)` and `(b, a)`
/// generally yield different names.
pub fn generate_hybrid_name(parent_a: &str, parent_b: &str) -> String {
    let key = genome_digest_bytes(&sha256_hex(format!("{parent_a}{parent_b}").as_bytes()));
    let table_a = culture_of(parent_a).table();
    let table_b = culture_of(parent_b).table();
    let genus = pick(table_a.genera, key[0], key[1]);
    let species = pick(table_b.species, key[2], key[3]);
    let title = pick(table_a.titles, key[30], key[31]);
    format!("{title} {genus} {species}")
}

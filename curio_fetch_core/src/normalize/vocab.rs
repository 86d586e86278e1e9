//! Canonical vocabulary mappings
//!
//! Every source reports age ratings in its own scheme; these tables map
//! them onto the canonical certification strings used by game collections,
//! so entries from different sources agree.

/// Canonical ESRB certification strings, in the order the game schema
/// offers them.
pub const ESRB_RATINGS: [&str; 8] = [
    "Unrated",
    "Adults Only",
    "Mature",
    "Teen",
    "Everyone 10+",
    "Everyone",
    "Early Childhood",
    "Pending",
];

/// Map an ESRB short code to its canonical string.
pub fn esrb_from_code(code: &str) -> Option<&'static str> {
    match code.trim() {
        "AO" => Some("Adults Only"),
        "M" => Some("Mature"),
        "T" => Some("Teen"),
        "E10+" | "E10" => Some("Everyone 10+"),
        "E" => Some("Everyone"),
        "EC" => Some("Early Childhood"),
        "RP" => Some("Pending"),
        "U" | "UR" | "NR" => Some("Unrated"),
        _ => None,
    }
}

/// Map an age-rating record from the IGDB v4 schema.
///
/// Category 1 is ESRB, category 2 is PEGI; the rating value is an index
/// into the service's combined rating enum.
pub fn igdb_age_rating(category: u64, rating: u64) -> Option<String> {
    match category {
        1 => match rating {
            6 => Some("Pending"),
            7 => Some("Early Childhood"),
            8 => Some("Everyone"),
            9 => Some("Everyone 10+"),
            10 => Some("Teen"),
            11 => Some("Mature"),
            12 => Some("Adults Only"),
            _ => None,
        }
        .map(str::to_string),
        2 => pegi_from_index(rating),
        _ => None,
    }
}

/// Map a PEGI enum index (1 through 5) to its label.
pub fn pegi_from_index(rating: u64) -> Option<String> {
    let age = match rating {
        1 => 3,
        2 => 7,
        3 => 12,
        4 => 16,
        5 => 18,
        _ => return None,
    };
    Some(format!("PEGI {age}"))
}

/// Map a rating name as reported in free text, for sources that spell the
/// scheme out per entry.
pub fn rating_from_name(system: &str, value: &str) -> Option<String> {
    match system {
        "ESRB Rating" | "ESRB" => esrb_from_code(value)
            .map(str::to_string)
            .or_else(|| canonical_esrb(value)),
        "PEGI Rating" | "PEGI" => {
            let trimmed = value.trim();
            if trimmed.starts_with("PEGI") {
                Some(trimmed.to_string())
            } else {
                trimmed.parse::<u64>().ok().map(|age| format!("PEGI {age}"))
            }
        }
        _ => None,
    }
}

fn canonical_esrb(value: &str) -> Option<String> {
    let needle = value.trim();
    ESRB_RATINGS
        .iter()
        .find(|r| r.eq_ignore_ascii_case(needle))
        .map(|r| r.to_string())
}

//! # Lot Names
//!
//! Product names handed out by the name generator: one lowercase Cyrillic
//! letter followed by four digits, e.g. `к0427`. Uniqueness is checked by
//! the caller against stored products.

use rand::Rng;

/// Letters a generated name may start with.
pub const LOT_NAME_LETTERS: &str = "абвгдежзийклмнопрстуфхцчшщэюя";

/// Candidates tried before the generator gives up.
pub const LOT_NAME_ATTEMPTS: u32 = 100;

/// Draws one candidate name.
pub fn random_lot_name<R: Rng + ?Sized>(rng: &mut R) -> String {
    let letters = LOT_NAME_LETTERS.chars().count();
    let letter = LOT_NAME_LETTERS
        .chars()
        .nth(rng.gen_range(0..letters))
        .unwrap_or('а');
    let number: u16 = rng.gen_range(0..10_000);
    format!("{}{:04}", letter, number)
}

/// Whether `name` has the generated shape.
pub fn is_lot_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if LOT_NAME_LETTERS.contains(c) => {}
        _ => return false,
    }
    let digits: Vec<char> = chars.collect();
    digits.len() == 4 && digits.iter().all(char::is_ascii_digit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_generated_names_have_lot_shape() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..500 {
            let name = random_lot_name(&mut rng);
            assert!(is_lot_name(&name), "bad name {}", name);
        }
    }

    #[test]
    fn test_is_lot_name() {
        assert!(is_lot_name("к0427"));
        assert!(is_lot_name("я9999"));
        assert!(!is_lot_name("k0427"));
        assert!(!is_lot_name("к427"));
        assert!(!is_lot_name("к04270"));
        assert!(!is_lot_name("ъ0427"));
        assert!(!is_lot_name(""));
    }
}

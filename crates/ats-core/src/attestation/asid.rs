//! ASID derivation — self-certifying attestation identifiers.
//!
//! An ASID is derived from the subject/predicate/context/actor seeds of the
//! attestation it names: a vanity slug taken from the first subject plus a
//! short content hash. Collisions are handled by the caller retrying with an
//! incremented attempt counter, which feeds the hash.

use sha2::{Digest, Sha256};

/// Prefix shared by all attestation identifiers.
pub const ASID_PREFIX: &str = "AS";

/// Maximum length of the vanity slug portion.
const SLUG_MAX: usize = 12;

/// Number of hash bytes rendered into the identifier (hex doubles this).
const HASH_BYTES: usize = 4;

/// Derive an ASID from the four seed strings and a retry attempt counter.
///
/// The same seeds with the same attempt always produce the same identifier;
/// bumping `attempt` produces a fresh candidate for collision retry.
pub fn generate(subject: &str, predicate: &str, context: &str, actor: &str, attempt: u32) -> String {
    let mut hasher = Sha256::new();
    hasher.update(subject.as_bytes());
    hasher.update([0x1f]);
    hasher.update(predicate.as_bytes());
    hasher.update([0x1f]);
    hasher.update(context.as_bytes());
    hasher.update([0x1f]);
    hasher.update(actor.as_bytes());
    hasher.update([0x1f]);
    hasher.update(attempt.to_be_bytes());

    let digest = hasher.finalize();
    let short = hex::encode(&digest[..HASH_BYTES]);

    let slug = vanity_slug(subject);
    if slug.is_empty() {
        format!("{}-{}", ASID_PREFIX, short)
    } else {
        format!("{}-{}-{}", ASID_PREFIX, slug, short)
    }
}

/// Reduce a subject to its vanity form: uppercase alphanumerics and dashes,
/// truncated to a readable length.
fn vanity_slug(subject: &str) -> String {
    let mut slug = String::with_capacity(SLUG_MAX);
    for c in subject.chars() {
        if slug.len() >= SLUG_MAX {
            break;
        }
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_uppercase());
        } else if (c == '-' || c == '_' || c.is_whitespace()) && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    slug.trim_matches('-').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic() {
        let a = generate("LUKE", "operates_in", "rebellion", "imperial-records", 0);
        let b = generate("LUKE", "operates_in", "rebellion", "imperial-records", 0);
        assert_eq!(a, b);
    }

    #[test]
    fn attempt_changes_id() {
        let a = generate("LUKE", "_", "_", "", 0);
        let b = generate("LUKE", "_", "_", "", 1);
        assert_ne!(a, b);
        assert!(a.starts_with("AS-LUKE-"));
        assert!(b.starts_with("AS-LUKE-"));
    }

    #[test]
    fn seeds_change_id() {
        let a = generate("LUKE", "pilot", "rebellion", "", 0);
        let b = generate("LUKE", "pilot", "empire", "", 0);
        assert_ne!(a, b);
    }

    #[test]
    fn slug_sanitized() {
        let id = generate("john doe & co", "_", "_", "", 0);
        assert!(id.starts_with("AS-JOHN-DOE-"));

        let unicode = generate("日本語", "_", "_", "", 0);
        // No ASCII alphanumerics to slug; falls back to hash-only form
        assert!(unicode.starts_with("AS-"));
        assert_eq!(unicode.matches('-').count(), 1);
    }

    #[test]
    fn slug_truncated() {
        let id = generate("VERYLONGSUBJECTNAMEINDEED", "_", "_", "", 0);
        let slug = id.split('-').nth(1).unwrap();
        assert!(slug.len() <= 12);
    }
}

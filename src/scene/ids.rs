use uuid::Uuid;

/// Produce an id that `in_use` does not already know about.
///
/// Ids are random v4 UUIDs in simple (hex) form, prefixed with a letter so
/// they remain valid identifiers for renderer-side lookups.
pub fn generate(in_use: impl Fn(&str) -> bool) -> String {
    loop {
        let candidate = format!("h{}", Uuid::new_v4().simple());
        if !in_use(&candidate) {
            return candidate;
        }
        log::warn!("generated id {candidate} collided with an existing object; retrying");
    }
}

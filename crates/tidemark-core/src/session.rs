use sha2::{Digest, Sha256};

/// Compute the session key for a visitor fingerprint on a site.
///
/// Formula: `sha256(fingerprint + site_id)[0..8]` encoded as 16 hex chars.
///
/// The fingerprint is whatever stable visitor token the transport layer
/// derived (hashed IP + user agent, client-side id, ...); this function only
/// guarantees that the same (fingerprint, site) pair always lands on the same
/// key, so repeated hits within the session window collapse into one visit.
pub fn compute_session_key(fingerprint: &str, site_id: &str) -> String {
    let input = format!("{}{}", fingerprint, site_id);
    let hash = Sha256::digest(input.as_bytes());
    // First 8 bytes → 16 hex characters.
    hex::encode(&hash[..8])
}

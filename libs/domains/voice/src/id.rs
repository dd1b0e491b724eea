use uuid::Uuid;

/// Mint a fresh point identifier.
///
/// Random UUID v4 (122 random bits), independent of the point's content and
/// never reused: every upsert path calls this once per point.
pub fn new_point_id() -> Uuid {
    Uuid::new_v4()
}

use uuid::Uuid;

pub const COURSE: &str = "CRS";
pub const SECTION: &str = "SEC";
pub const MODULE: &str = "MOD";
pub const LESSON: &str = "LES";
pub const VIDEO: &str = "VID";
pub const ENROLLMENT: &str = "ENR";
pub const PROGRESS: &str = "PRG";
pub const CERTIFICATE: &str = "CERT";
// User ids carry no prefix.
pub const USER: &str = "";

/// new_id
///
/// Prefix followed by the first six hex characters of a v4 UUID, upper-cased (e.g. `CRS1F4A0B`).
pub fn new_id(prefix: &str) -> String {
    let uuid = Uuid::new_v4().simple().to_string();
    format!("{}{}", prefix, uuid[..6].to_uppercase())
}

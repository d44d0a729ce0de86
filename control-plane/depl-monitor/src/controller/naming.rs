use crate::store::ObjectKey;

/// Suffix appended to a MonDepl name to name its Deployment. Changing it
/// orphans every Deployment created under the old convention.
pub const UNDERLYING_SUFFIX: &str = "-underlying";

pub fn underlying_name(name: &str) -> String {
    format!("{name}{UNDERLYING_SUFFIX}")
}

/// Key of the Deployment managed for the MonDepl at `key`. Same namespace.
pub fn underlying_key(key: &ObjectKey) -> ObjectKey {
    ObjectKey::new(key.namespace.clone(), underlying_name(&key.name))
}

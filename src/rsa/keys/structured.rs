use crate::rsa::keys::{Key, KeyError};

pub fn to_json(key: &Key) -> Result<String, KeyError> {
    Ok(serde_json::to_string_pretty(key)?)
}

pub fn from_json(data: &str) -> Result<Key, KeyError> {
    Ok(serde_json::from_str(data)?)
}

pub fn to_yaml(key: &Key) -> Result<String, KeyError> {
    Ok(serde_yaml::to_string(key)?)
}

pub fn from_yaml(data: &str) -> Result<Key, KeyError> {
    Ok(serde_yaml::from_str(data)?)
}

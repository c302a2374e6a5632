use super::SYSTEM_SCHEME;
use crate::error::DispatchError;

/// Stateless singleton addressed as `system://<Suffix>`.
///
/// Has no backing record and no property API; its type is `System<Suffix>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemObject {
    type_name: String,
    path: String,
}

impl SystemObject {
    pub fn new(path: &str) -> Result<Self, DispatchError> {
        let suffix = path
            .strip_prefix(SYSTEM_SCHEME)
            .filter(|rest| !rest.contains('/'))
            .ok_or_else(|| DispatchError::InvalidArgument(format!("path: '{path}'")))?;
        Ok(Self {
            type_name: format!("System{suffix}"),
            path: path.to_string(),
        })
    }

    #[must_use]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }
}

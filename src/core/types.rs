use super::{PassivationError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Stable key of one stateful instance across passivate/activate/remove cycles.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BeanId(String);

impl BeanId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Filesystem-safe rendering of the identifier (lowercase hex of its bytes).
    pub fn to_file_stem(&self) -> String {
        self.0.bytes().map(|b| format!("{:02x}", b)).collect()
    }

    pub fn from_file_stem(stem: &str) -> Option<Self> {
        if stem.len() % 2 != 0 || !stem.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        let bytes = stem
            .as_bytes()
            .chunks(2)
            .map(|pair| {
                std::str::from_utf8(pair)
                    .ok()
                    .and_then(|digits| u8::from_str_radix(digits, 16).ok())
            })
            .collect::<Option<Vec<u8>>>()?;
        String::from_utf8(bytes).ok().map(Self)
    }
}

impl fmt::Display for BeanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BeanId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for BeanId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Declared module version of a bean, e.g. `2.1` or `3.0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ModuleVersion {
    pub major: u16,
    pub minor: u16,
}

impl ModuleVersion {
    /// First version written with the structured frame layout.
    pub const STRUCTURED: ModuleVersion = ModuleVersion::new(3, 0);

    pub const fn new(major: u16, minor: u16) -> Self {
        Self { major, minor }
    }
}

impl Default for ModuleVersion {
    fn default() -> Self {
        Self::STRUCTURED
    }
}

impl fmt::Display for ModuleVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

impl FromStr for ModuleVersion {
    type Err = PassivationError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || PassivationError::Registration(format!("Invalid module version '{}'", s));
        let (major, minor) = s.trim().split_once('.').unwrap_or((s.trim(), "0"));
        Ok(Self {
            major: major.parse().map_err(|_| invalid())?,
            minor: minor.parse().map_err(|_| invalid())?,
        })
    }
}

/// Bean-level metadata supplied by the enclosing container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BeanMetaData {
    /// Logical bean name, used in log lines.
    pub name: String,
    /// Registered type name of the bean class.
    pub type_name: String,
    pub module_version: ModuleVersion,
    /// Registered type names of the interceptor classes, in chain order.
    pub interceptor_types: Vec<String>,
}

impl BeanMetaData {
    pub fn new(
        name: impl Into<String>,
        type_name: impl Into<String>,
        module_version: ModuleVersion,
    ) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            module_version,
            interceptor_types: Vec::new(),
        }
    }

    pub fn with_interceptors<I, S>(mut self, interceptor_types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.interceptor_types = interceptor_types.into_iter().map(Into::into).collect();
        self
    }

    pub fn expected_interceptor_count(&self) -> usize {
        self.interceptor_types.len()
    }
}

/// Binding of the bean to its extended persistence context.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistenceContextBinding {
    pub binding_id: String,
    pub unit_names: Vec<String>,
}

impl PersistenceContextBinding {
    pub fn new(binding_id: impl Into<String>) -> Self {
        Self {
            binding_id: binding_id.into(),
            unit_names: Vec::new(),
        }
    }

    pub fn with_unit(mut self, unit_name: impl Into<String>) -> Self {
        self.unit_names.push(unit_name.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    Passivate,
    Activate,
    Remove,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Passivate => "passivate",
            Self::Activate => "activate",
            Self::Remove => "remove",
        };
        f.write_str(name)
    }
}

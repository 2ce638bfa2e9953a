use crate::core::Value;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapturedField {
    pub name: String,
    pub value: Value,
}

/// Field values declared by one class level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapturedClass {
    pub class_name: String,
    pub fields: Vec<CapturedField>,
}

/// Serialized form of one object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CapturedObject {
    /// Native value copy of a serializable type.
    Native { type_name: String, bytes: Vec<u8> },
    /// Field-by-field snapshot, concrete class level first.
    Reconstructed {
        type_name: String,
        fields_by_class: Vec<CapturedClass>,
    },
}

impl CapturedObject {
    pub fn type_name(&self) -> &str {
        match self {
            Self::Native { type_name, .. } | Self::Reconstructed { type_name, .. } => type_name,
        }
    }

    pub fn is_native(&self) -> bool {
        matches!(self, Self::Native { .. })
    }

    pub fn field(&self, class_name: &str, field_name: &str) -> Option<&Value> {
        match self {
            Self::Native { .. } => None,
            Self::Reconstructed {
                fields_by_class, ..
            } => fields_by_class
                .iter()
                .find(|class| class.class_name == class_name)?
                .fields
                .iter()
                .find(|field| field.name == field_name)
                .map(|field| &field.value),
        }
    }

    /// Every captured `(class, field)` pair, in restore order.
    pub fn field_paths(&self) -> Vec<(&str, &str)> {
        match self {
            Self::Native { .. } => Vec::new(),
            Self::Reconstructed {
                fields_by_class, ..
            } => fields_by_class
                .iter()
                .flat_map(|class| {
                    class
                        .fields
                        .iter()
                        .map(move |field| (class.class_name.as_str(), field.name.as_str()))
                })
                .collect(),
        }
    }
}

//! Explicit registry of objects and fields.

use crate::error::{DestinationError, DestinationResult};
use syncport_protocol::{Field, Object};

/// An object together with the fields it exposes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectDefinition {
    /// The object.
    pub object: Object,
    /// Known fields, in display order.
    pub fields: Vec<Field>,
    lookup_keys: Vec<String>,
}

impl ObjectDefinition {
    /// Creates a definition with no fields.
    #[must_use]
    pub fn new(object: Object) -> Self {
        Self {
            object,
            fields: Vec::new(),
            lookup_keys: Vec::new(),
        }
    }

    /// Adds a field.
    #[must_use]
    pub fn field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    /// Adds a key that can be used to look an existing record up.
    ///
    /// When no lookup keys are set, the identifier fields are used.
    #[must_use]
    pub fn lookup_key(mut self, key: impl Into<String>) -> Self {
        self.lookup_keys.push(key.into());
        self
    }

    /// The object's API name.
    pub fn name(&self) -> &str {
        &self.object.object_api_name
    }

    /// Returns the field with the given API name.
    pub fn get_field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.field_api_name == name)
    }

    /// Returns true if `name` is a known field.
    pub fn is_known_field(&self, name: &str) -> bool {
        self.get_field(name).is_some()
    }

    /// Fields flagged as identifiers.
    pub fn identifier_fields(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter().filter(|f| f.identifier)
    }

    /// Keys used to confirm a record exists before an update.
    pub fn lookup_keys(&self) -> Vec<&str> {
        if self.lookup_keys.is_empty() {
            self.identifier_fields()
                .map(|f| f.field_api_name.as_str())
                .collect()
        } else {
            self.lookup_keys.iter().map(String::as_str).collect()
        }
    }
}

/// Objects a destination knows about, keyed by API name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectRegistry {
    objects: Vec<ObjectDefinition>,
}

impl ObjectRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an object, replacing any definition with the same name.
    #[must_use]
    pub fn with(mut self, definition: ObjectDefinition) -> Self {
        self.objects.retain(|d| d.name() != definition.name());
        self.objects.push(definition);
        self
    }

    /// Looks an object up by API name.
    pub fn get(&self, name: &str) -> Option<&ObjectDefinition> {
        self.objects.iter().find(|d| d.name() == name)
    }

    /// Looks an object up, failing with [`DestinationError::UnknownObject`].
    pub fn require(&self, name: &str) -> DestinationResult<&ObjectDefinition> {
        self.get(name)
            .ok_or_else(|| DestinationError::UnknownObject(name.to_string()))
    }

    /// All registered objects, in registration order.
    pub fn objects(&self) -> Vec<Object> {
        self.objects.iter().map(|d| d.object.clone()).collect()
    }

    /// Number of registered objects.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use syncport_protocol::FieldType;

    fn user() -> ObjectDefinition {
        ObjectDefinition::new(Object::new("user", "Users"))
            .field(Field::new("userID", "User ID", FieldType::String).identifier())
            .field(Field::new("email", "Email", FieldType::String).identifier())
            .field(Field::new("name", "Name", FieldType::String).required())
    }

    #[test]
    fn lookup_keys_default_to_identifiers() {
        assert_eq!(user().lookup_keys(), vec!["userID", "email"]);

        let explicit = user().lookup_key("email");
        assert_eq!(explicit.lookup_keys(), vec!["email"]);
    }

    #[test]
    fn require_unknown_object() {
        let registry = ObjectRegistry::new().with(user());
        assert!(registry.require("user").is_ok());
        let err = registry.require("company").unwrap_err();
        assert!(matches!(err, DestinationError::UnknownObject(ref n) if n == "company"));
    }

    #[test]
    fn with_replaces_same_name() {
        let registry = ObjectRegistry::new()
            .with(user())
            .with(ObjectDefinition::new(Object::new("user", "People")));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.objects()[0].label, "People");
    }

    #[test]
    fn known_fields() {
        let def = user();
        assert!(def.is_known_field("name"));
        assert!(!def.is_known_field("plan_tier"));
        assert_eq!(def.get_field("name").map(|f| f.required), Some(true));
    }
}

//! Catalog introspection queries and the column type lookup table.

use std::collections::HashMap;
use syncport_protocol::{Field, FieldType};

pub(crate) const LIST_TABLES: &str = "\
    SELECT table_schema::text, table_name::text \
    FROM information_schema.tables \
    WHERE table_schema NOT IN ('pg_catalog', 'information_schema') \
    ORDER BY table_schema, table_name";

pub(crate) const LIST_CONSTRAINTS: &str = "\
    SELECT ccu.column_name::text, tc.constraint_type::text \
    FROM information_schema.constraint_column_usage ccu \
    JOIN information_schema.table_constraints tc \
      ON tc.constraint_schema = ccu.constraint_schema \
     AND tc.constraint_name = ccu.constraint_name \
     AND tc.table_schema = ccu.table_schema \
     AND tc.table_name = ccu.table_name \
    WHERE tc.table_schema = $1::text AND tc.table_name = $2::text";

pub(crate) const LIST_COLUMNS: &str = "\
    SELECT column_name::text, \
           data_type::text, \
           is_nullable = 'YES', \
           is_updatable = 'YES', \
           COALESCE(column_default LIKE 'nextval(%', false) OR is_identity = 'YES' OR is_generated = 'ALWAYS' \
    FROM information_schema.columns \
    WHERE table_schema = $1::text AND table_name = $2::text \
    ORDER BY ordinal_position";

/// Maps an `information_schema.columns.data_type` to a field type.
///
/// Returns the element type and whether the column is an array. Unmapped
/// types are strings.
pub fn field_type_for(data_type: &str) -> (FieldType, bool) {
    let field_type = match data_type {
        "boolean" => FieldType::Boolean,
        "smallint" | "integer" | "bigint" => FieldType::Integer,
        "real" | "double precision" => FieldType::Float,
        "numeric" => FieldType::Decimal,
        "date" => FieldType::Date,
        "timestamp with time zone" | "timestamp without time zone" => FieldType::DateTime,
        _ => FieldType::String,
    };
    (field_type, data_type == "ARRAY")
}

/// One row of [`LIST_COLUMNS`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ColumnInfo {
    pub name: String,
    pub data_type: String,
    pub nullable: bool,
    pub updatable: bool,
    pub generated: bool,
}

impl ColumnInfo {
    /// Builds the field for this column; `constraints` are the constraint
    /// types that cover it.
    pub(crate) fn into_field(self, constraints: &HashMap<String, Vec<String>>) -> Field {
        let identifier = constraints.get(&self.name).is_some_and(|kinds| {
            kinds
                .iter()
                .any(|k| k == "UNIQUE" || k == "PRIMARY KEY")
        });
        let (field_type, array) = field_type_for(&self.data_type);

        Field {
            label: self.name.clone(),
            field_api_name: self.name,
            identifier,
            required: !self.nullable && !self.generated,
            createable: !self.generated,
            updateable: self.updatable && !self.generated,
            array,
            field_type,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column(name: &str, data_type: &str) -> ColumnInfo {
        ColumnInfo {
            name: name.into(),
            data_type: data_type.into(),
            nullable: true,
            updatable: true,
            generated: false,
        }
    }

    #[test]
    fn type_lookup_table() {
        assert_eq!(field_type_for("boolean"), (FieldType::Boolean, false));
        assert_eq!(field_type_for("bigint"), (FieldType::Integer, false));
        assert_eq!(field_type_for("double precision"), (FieldType::Float, false));
        assert_eq!(field_type_for("numeric"), (FieldType::Decimal, false));
        assert_eq!(field_type_for("date"), (FieldType::Date, false));
        assert_eq!(
            field_type_for("timestamp without time zone"),
            (FieldType::DateTime, false)
        );
        assert_eq!(field_type_for("ARRAY"), (FieldType::String, true));
        assert_eq!(field_type_for("character varying"), (FieldType::String, false));
        assert_eq!(field_type_for("uuid"), (FieldType::String, false));
    }

    #[test]
    fn constraints_mark_identifiers() {
        let constraints = HashMap::from([
            ("email".to_string(), vec!["UNIQUE".to_string()]),
            ("org_id".to_string(), vec!["FOREIGN KEY".to_string()]),
        ]);

        let email = column("email", "text").into_field(&constraints);
        assert!(email.identifier);
        assert_eq!(email.label, "email");

        let org = column("org_id", "integer").into_field(&constraints);
        assert!(!org.identifier);
        assert_eq!(org.field_type, FieldType::Integer);
    }

    #[test]
    fn serial_columns_are_not_createable() {
        let mut id = column("id", "integer");
        id.nullable = false;
        id.generated = true;

        let field = id.into_field(&HashMap::new());
        assert!(!field.createable);
        assert!(!field.updateable);
        assert!(!field.required);

        let mut name = column("name", "text");
        name.nullable = false;
        assert!(name.into_field(&HashMap::new()).required);
    }
}

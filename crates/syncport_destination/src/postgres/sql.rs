//! SQL statement generation for batch writes.
//!
//! Every statement binds the identifier as `$1` followed by the other columns
//! in plan order, so one parameter list serves insert, update and upsert.

use crate::destination::WritePlan;
use pg_escape::quote_identifier;
use syncport_protocol::{Field, FieldType, Operation};

/// Builds the prepared statement for a [`WritePlan`].
///
/// Table and column names are quoted; `schema.table` names are quoted per
/// part. The upsert form requires a unique constraint on the identifier
/// column.
///
/// # Example
///
/// ```rust
/// use syncport_destination::{StatementBuilder, WritePlan};
/// use syncport_protocol::{Field, FieldType, Object, Operation};
///
/// let plan = WritePlan::new(
///     Object::new("public.customers", "public.customers"),
///     Operation::Upsert,
///     Field::new("email", "email", FieldType::String),
///     vec![Field::new("name", "name", FieldType::String)],
/// );
/// let sql = StatementBuilder::new(&plan).build();
/// assert!(sql.ends_with("ON CONFLICT (email) DO UPDATE SET name = EXCLUDED.name"));
/// ```
#[derive(Debug, Clone, Copy)]
pub struct StatementBuilder<'a> {
    plan: &'a WritePlan,
}

impl<'a> StatementBuilder<'a> {
    /// Creates a builder for a plan.
    pub fn new(plan: &'a WritePlan) -> Self {
        Self { plan }
    }

    /// Quoted table name.
    pub fn table(&self) -> String {
        quote_qualified(self.plan.object_name())
    }

    /// Column names in parameter order.
    pub fn columns(&self) -> Vec<&'a str> {
        self.plan
            .all_fields()
            .map(|f| f.field_api_name.as_str())
            .collect()
    }

    /// Builds the statement for the plan's operation.
    pub fn build(&self) -> String {
        match self.plan.operation {
            Operation::Insert => self.insert(),
            Operation::Update => self.update(),
            Operation::Upsert => self.upsert(),
        }
    }

    fn insert(&self) -> String {
        let columns = self
            .plan
            .all_fields()
            .map(|f| quote_identifier(&f.field_api_name).into_owned())
            .collect::<Vec<_>>()
            .join(", ");
        let values = self
            .plan
            .all_fields()
            .enumerate()
            .map(|(i, f)| placeholder(i + 1, f))
            .collect::<Vec<_>>()
            .join(", ");

        format!("INSERT INTO {} ({columns}) VALUES ({values})", self.table())
    }

    fn upsert(&self) -> String {
        let key = quote_identifier(self.plan.identifier_column());
        let updates: Vec<String> = self
            .plan
            .other_columns()
            .map(|name| {
                let column = quote_identifier(name);
                format!("{column} = EXCLUDED.{column}")
            })
            .collect();

        if updates.is_empty() {
            format!("{} ON CONFLICT ({key}) DO NOTHING", self.insert())
        } else {
            format!(
                "{} ON CONFLICT ({key}) DO UPDATE SET {}",
                self.insert(),
                updates.join(", ")
            )
        }
    }

    fn update(&self) -> String {
        let key = quote_identifier(self.plan.identifier_column());
        let key_param = placeholder(1, &self.plan.identifier);

        let assignments = if self.plan.columns.is_empty() {
            // Touch the key so a missing row still reports zero rows.
            format!("{key} = {key_param}")
        } else {
            self.plan
                .columns
                .iter()
                .enumerate()
                .map(|(i, f)| {
                    format!(
                        "{} = {}",
                        quote_identifier(&f.field_api_name),
                        placeholder(i + 2, f)
                    )
                })
                .collect::<Vec<_>>()
                .join(", ")
        };

        format!(
            "UPDATE {} SET {assignments} WHERE {key} = {key_param}",
            self.table()
        )
    }
}

/// Placeholder for parameter `index`, cast through text for types that have
/// no lossless JSON representation.
fn placeholder(index: usize, field: &Field) -> String {
    if field.array {
        return format!("${index}");
    }
    match field.field_type {
        FieldType::Decimal => format!("${index}::text::numeric"),
        FieldType::Date => format!("${index}::text::date"),
        FieldType::DateTime => format!("${index}::text::timestamptz"),
        _ => format!("${index}"),
    }
}

/// Splits `schema.table`; names without a schema are in `public`.
pub(crate) fn split_object_name(name: &str) -> (&str, &str) {
    name.split_once('.').unwrap_or(("public", name))
}

fn quote_qualified(name: &str) -> String {
    match name.split_once('.') {
        Some((schema, table)) => format!("{}.{}", quote_identifier(schema), quote_identifier(table)),
        None => quote_identifier(name).into_owned(),
    }
}

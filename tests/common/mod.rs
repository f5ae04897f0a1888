//! Shared record types for integration tests

#![allow(dead_code)]

pub mod filter;

use aerotable::mapping::{FieldDef, FieldType, TableRecord};
use aerotable::value::Value;

/// Country keyed by continent and name
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Country {
    pub continent: String,
    pub name: String,
    pub area: f64,
    pub population: i64,
    pub is_exists: bool,
}

impl Country {
    pub fn new(continent: &str, name: &str, area: f64, is_exists: bool) -> Self {
        Self {
            continent: continent.to_string(),
            name: name.to_string(),
            area,
            is_exists,
            ..Self::default()
        }
    }
}

impl TableRecord for Country {
    fn type_name() -> &'static str {
        "Country"
    }

    fn fields() -> Vec<FieldDef<Self>> {
        vec![
            FieldDef::new(
                "Continent",
                FieldType::String,
                |c: &Country| c.continent.clone().into(),
                |c: &mut Country, v: Value| {
                    c.continent = v.try_into()?;
                    Ok(())
                },
            )
            .partition_key(),
            FieldDef::new(
                "Name",
                FieldType::String,
                |c: &Country| c.name.clone().into(),
                |c: &mut Country, v: Value| {
                    c.name = v.try_into()?;
                    Ok(())
                },
            )
            .row_key(),
            FieldDef::new(
                "Area",
                FieldType::Double,
                |c: &Country| c.area.into(),
                |c: &mut Country, v: Value| {
                    c.area = v.try_into()?;
                    Ok(())
                },
            ),
            FieldDef::new(
                "Population",
                FieldType::Int64,
                |c: &Country| c.population.into(),
                |c: &mut Country, v: Value| {
                    c.population = v.try_into()?;
                    Ok(())
                },
            ),
            FieldDef::new(
                "IsExists",
                FieldType::Bool,
                |c: &Country| c.is_exists.into(),
                |c: &mut Country, v: Value| {
                    c.is_exists = v.try_into()?;
                    Ok(())
                },
            ),
        ]
    }
}

/// Record with no key role and no conventional key names
#[derive(Debug, Default, Clone)]
pub struct Keyless {
    pub label: String,
}

impl TableRecord for Keyless {
    fn type_name() -> &'static str {
        "Keyless"
    }

    fn fields() -> Vec<FieldDef<Self>> {
        vec![FieldDef::new(
            "Label",
            FieldType::String,
            |k: &Keyless| k.label.clone().into(),
            |k: &mut Keyless, v: Value| {
                k.label = v.try_into()?;
                Ok(())
            },
        )]
    }
}

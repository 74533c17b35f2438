//! XSD datatype to entity value coercion

use graphlens_core::{AttributeDataType, EntityValue};

const XSD: &str = "http://www.w3.org/2001/XMLSchema#";

const NUMERIC: &[&str] = &[
    "byte",
    "decimal",
    "double",
    "float",
    "int",
    "integer",
    "long",
    "negativeInteger",
    "nonNegativeInteger",
    "nonPositiveInteger",
    "positiveInteger",
    "short",
    "unsignedByte",
    "unsignedInt",
    "unsignedLong",
    "unsignedShort",
];

const DATES: &[&str] = &["date", "dateTime", "dateTimeStamp"];

/// Data type reported for a literal's datatype IRI
///
/// Missing and unknown datatypes are strings.
pub fn data_type(datatype: Option<&str>) -> AttributeDataType {
    let Some(local) = datatype.and_then(|d| d.strip_prefix(XSD)) else {
        return AttributeDataType::String;
    };
    if NUMERIC.contains(&local) {
        AttributeDataType::Number
    } else if DATES.contains(&local) {
        AttributeDataType::Date
    } else if local == "boolean" {
        AttributeDataType::Boolean
    } else {
        AttributeDataType::String
    }
}

/// Coerce a literal; invalid numbers and dates are kept as `NaN` and
/// invalid dates
pub fn coerce(value: &str, datatype: Option<&str>) -> EntityValue {
    match data_type(datatype) {
        AttributeDataType::Number => EntityValue::number_from_str(value),
        AttributeDataType::Date => EntityValue::date_from_str(value),
        AttributeDataType::Boolean => EntityValue::Boolean(matches!(value.trim(), "true" | "1")),
        AttributeDataType::String => EntityValue::String(value.to_string()),
    }
}

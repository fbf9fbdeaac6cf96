//! Account configuration reader.
//!
//! Turns the loosely typed account configuration into a [`ModuleConfig`].
//! Attributes are read independently: a malformed attribute is dropped and
//! reported while the others still apply. Missing configuration means
//! "block nothing".

use std::collections::BTreeSet;

use serde_json::{Map, Value};

use crate::error::ConfigShapeError;

use super::config::{Attribute, AttributeRule, Attributes, Conditions, ModuleConfig, Override};
use super::media_types::MediaType;

const ATTRIBUTES_FIELD: &str = "attributes";
const BLOCKED_FIELD: &str = "blocked";
const ACTION_OVERRIDES_FIELD: &str = "action-overrides";
const CONDITIONS_FIELD: &str = "conditions";
const BIDDERS_FIELD: &str = "bidders";
const MEDIA_TYPES_FIELD: &str = "media-types";
const OVERRIDE_FIELD: &str = "override";
const CATEGORY_TAXONOMY_FIELD: &str = "category-taxonomy";

/// Module configuration plus the attributes that had to be dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedModuleConfig {
    pub config: ModuleConfig,
    pub errors: Vec<ConfigShapeError>,
}

/// Element type of a blocked-values list.
trait BlockedValue: Sized {
    const EXPECTED: &'static str;

    fn from_json(value: &Value) -> Option<Self>;
}

impl BlockedValue for String {
    const EXPECTED: &'static str = "string";

    fn from_json(value: &Value) -> Option<Self> {
        value.as_str().map(str::to_string)
    }
}

impl BlockedValue for i32 {
    const EXPECTED: &'static str = "integer";

    fn from_json(value: &Value) -> Option<Self> {
        value.as_i64().and_then(|n| i32::try_from(n).ok())
    }
}

/// Read the module's account configuration.
///
/// # Errors
///
/// Returns [`ConfigShapeError::NotAnObject`] when `attributes` is present but
/// not an object. Problems inside a single attribute are collected into
/// [`ParsedModuleConfig::errors`] instead.
pub fn parse_module_config(
    account_config: Option<&Value>,
) -> Result<ParsedModuleConfig, ConfigShapeError> {
    let attributes = match account_config.and_then(|config| config.get(ATTRIBUTES_FIELD)) {
        None | Some(Value::Null) => return Ok(ParsedModuleConfig::default()),
        Some(Value::Object(attributes)) => attributes,
        Some(_) => return Err(not_an_object(ATTRIBUTES_FIELD)),
    };

    for key in attributes.keys() {
        if Attribute::from_field_name(key).is_none() {
            log::debug!("Ignoring unknown blocking attribute '{}'", key);
        }
    }

    let mut parsed = ParsedModuleConfig::default();
    let mut errors = Vec::new();
    let target = &mut parsed.config.attributes;

    for attribute in Attribute::ALL {
        let Some(value) = non_null(attributes, attribute.field_name()) else {
            continue;
        };
        let path = child(ATTRIBUTES_FIELD, attribute.field_name());

        let outcome = match attribute {
            Attribute::Badv => parse_rule(&path, value).map(|rule| target.badv = Some(rule)),
            Attribute::Bapp => parse_rule(&path, value).map(|rule| target.bapp = Some(rule)),
            Attribute::Battr => parse_rule(&path, value).map(|rule| target.battr = Some(rule)),
            Attribute::Btype => parse_rule(&path, value).map(|rule| target.btype = Some(rule)),
            Attribute::Bcat => parse_rule(&path, value).and_then(|rule| {
                let cattax = parse_category_taxonomy(&path, value)?;
                target.bcat = Some(rule);
                target.cattax = cattax;
                Ok(())
            }),
        };

        if let Err(error) = outcome {
            log::warn!("Ignoring {} blocking rule: {}", attribute, error);
            errors.push(error);
        }
    }

    parsed.errors = errors;
    Ok(parsed)
}

fn child(path: &str, field: &str) -> String {
    format!("{path}.{field}")
}

fn element(path: &str, index: usize) -> String {
    format!("{path}[{index}]")
}

fn parse_rule<T: BlockedValue>(
    path: &str,
    value: &Value,
) -> Result<AttributeRule<T>, ConfigShapeError> {
    match value {
        Value::Array(_) => Ok(AttributeRule::blocked(parse_values(path, value)?)),
        Value::Object(object) => {
            let default_blocked = non_null(object, BLOCKED_FIELD)
                .map(|blocked| parse_values(&child(path, BLOCKED_FIELD), blocked))
                .transpose()?;
            let overrides = match non_null(object, ACTION_OVERRIDES_FIELD) {
                Some(overrides) => {
                    parse_action_overrides(&child(path, ACTION_OVERRIDES_FIELD), overrides)?
                }
                None => Vec::new(),
            };

            Ok(AttributeRule {
                default_blocked,
                overrides,
            })
        }
        _ => Err(not_an_object(path)),
    }
}

fn parse_category_taxonomy(path: &str, value: &Value) -> Result<Option<i32>, ConfigShapeError> {
    let Some(cattax) = value
        .as_object()
        .and_then(|object| non_null(object, CATEGORY_TAXONOMY_FIELD))
    else {
        return Ok(None);
    };

    i32::from_json(cattax)
        .map(Some)
        .ok_or_else(|| ConfigShapeError::UnexpectedType {
            field: child(path, CATEGORY_TAXONOMY_FIELD),
            expected: i32::EXPECTED,
        })
}

/// `action-overrides` is either `{"blocked": [...]}` or the list itself.
fn parse_action_overrides<T: BlockedValue>(
    path: &str,
    value: &Value,
) -> Result<Vec<Override<T>>, ConfigShapeError> {
    match value {
        Value::Array(_) => parse_override_list(path, value),
        Value::Object(object) => match non_null(object, BLOCKED_FIELD) {
            Some(list) => parse_override_list(&child(path, BLOCKED_FIELD), list),
            None => Ok(Vec::new()),
        },
        _ => Err(not_an_object(path)),
    }
}

fn parse_override_list<T: BlockedValue>(
    path: &str,
    value: &Value,
) -> Result<Vec<Override<T>>, ConfigShapeError> {
    let items = value.as_array().ok_or_else(|| not_an_array(path))?;

    items
        .iter()
        .enumerate()
        .map(|(index, item)| parse_override(&element(path, index), item))
        .collect()
}

fn parse_override<T: BlockedValue>(
    path: &str,
    value: &Value,
) -> Result<Override<T>, ConfigShapeError> {
    let object = value.as_object().ok_or_else(|| not_an_object(path))?;

    let conditions_path = child(path, CONDITIONS_FIELD);
    let conditions = required(object, CONDITIONS_FIELD, &conditions_path)?;
    let conditions = parse_conditions(&conditions_path, conditions)?;

    let values_path = child(path, OVERRIDE_FIELD);
    let values = required(object, OVERRIDE_FIELD, &values_path)?;
    let values = parse_values(&values_path, values)?;

    Ok(Override::new(conditions, values))
}

fn parse_conditions(path: &str, value: &Value) -> Result<Conditions, ConfigShapeError> {
    let object = value.as_object().ok_or_else(|| not_an_object(path))?;

    let bidders = non_null(object, BIDDERS_FIELD)
        .map(|bidders| {
            parse_values::<String>(&child(path, BIDDERS_FIELD), bidders)
                .map(|names| names.into_iter().collect::<BTreeSet<_>>())
        })
        .transpose()?;

    let media_types = non_null(object, MEDIA_TYPES_FIELD)
        .map(|media_types| parse_media_types(&child(path, MEDIA_TYPES_FIELD), media_types))
        .transpose()?;

    Ok(Conditions::new(bidders, media_types))
}

fn parse_media_types(path: &str, value: &Value) -> Result<BTreeSet<MediaType>, ConfigShapeError> {
    parse_values::<String>(path, value)?
        .into_iter()
        .map(|name| {
            name.parse::<MediaType>()
                .map_err(|()| ConfigShapeError::UnknownMediaType {
                    field: path.to_string(),
                    value: name,
                })
        })
        .collect()
}

fn parse_values<T: BlockedValue>(path: &str, value: &Value) -> Result<Vec<T>, ConfigShapeError> {
    let items = value.as_array().ok_or_else(|| not_an_array(path))?;

    items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            T::from_json(item).ok_or_else(|| ConfigShapeError::UnexpectedType {
                field: element(path, index),
                expected: T::EXPECTED,
            })
        })
        .collect()
}

fn not_an_object(path: &str) -> ConfigShapeError {
    ConfigShapeError::NotAnObject {
        field: path.to_string(),
    }
}

fn not_an_array(path: &str) -> ConfigShapeError {
    ConfigShapeError::NotAnArray {
        field: path.to_string(),
    }
}

/// Non-null `field` of `object`, or a missing-field error for `path`.
fn required<'a>(
    object: &'a Map<String, Value>,
    field: &str,
    path: &str,
) -> Result<&'a Value, ConfigShapeError> {
    non_null(object, field).ok_or_else(|| ConfigShapeError::Missing {
        field: path.to_string(),
    })
}

fn non_null<'a>(object: &'a Map<String, Value>, field: &str) -> Option<&'a Value> {
    object.get(field).filter(|value| !value.is_null())
}

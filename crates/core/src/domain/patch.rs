//! Decode boundary for selection patches proposed by the chat advisor.
//!
//! Agent output is untrusted. Every recognized key is coerced or ignored on
//! its own; a bad field never rejects the rest of the patch. The result is
//! always merged over `Selections::default()`, so applying the same patch
//! twice yields the same record.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::selections::{CmsTier, SelectionField, Selections};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdjustmentKind {
    /// Value was outside the field bounds and was clamped.
    Clamped,
    /// Value had a convertible type (float, numeric string, "true").
    Coerced,
    /// Value had an unusable type; the default was kept.
    Ignored,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchAdjustment {
    pub field: SelectionField,
    pub kind: AdjustmentKind,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchDecode {
    pub selections: Selections,
    pub applied: Vec<SelectionField>,
    pub adjustments: Vec<PatchAdjustment>,
    pub ignored_keys: Vec<String>,
}

pub fn decode_agent_patch(payload: &Map<String, Value>) -> PatchDecode {
    let mut decode = PatchDecode {
        selections: Selections::default(),
        applied: Vec::new(),
        adjustments: Vec::new(),
        ignored_keys: Vec::new(),
    };

    for (key, value) in payload {
        let Some(field) = SelectionField::from_wire(key) else {
            decode.ignored_keys.push(key.clone());
            continue;
        };

        let accepted = match field {
            SelectionField::CmsType => {
                read_cms_tier(field, value, &mut decode.adjustments).map(|tier| {
                    decode.selections.cms_type = tier;
                })
            }
            SelectionField::UserAuth => read_flag(field, value, &mut decode.adjustments)
                .map(|flag| decode.selections.user_auth = flag),
            SelectionField::PaymentGateway => read_flag(field, value, &mut decode.adjustments)
                .map(|flag| decode.selections.payment_gateway = flag),
            counted => read_count(counted, value, &mut decode.adjustments)
                .map(|count| set_count(&mut decode.selections, counted, count)),
        };

        match accepted {
            Some(()) => decode.applied.push(field),
            None => decode.adjustments.push(PatchAdjustment {
                field,
                kind: AdjustmentKind::Ignored,
                detail: format!("unsupported value {value}; kept default"),
            }),
        }
    }

    decode.applied.sort();
    decode
}

fn set_count(selections: &mut Selections, field: SelectionField, count: u32) {
    match field {
        SelectionField::DesignTier => {
            selections.design_tier = u8::try_from(count).unwrap_or(selections.design_tier)
        }
        SelectionField::StandardPages => selections.standard_pages = count,
        SelectionField::ComplexPages => selections.complex_pages = count,
        SelectionField::SystemPages => selections.system_pages = count,
        SelectionField::Products => selections.products = count,
        SelectionField::Apis => selections.apis = count,
        SelectionField::CmsType | SelectionField::UserAuth | SelectionField::PaymentGateway => {}
    }
}

fn read_count(
    field: SelectionField,
    value: &Value,
    adjustments: &mut Vec<PatchAdjustment>,
) -> Option<u32> {
    let (min, max) = field.bounds()?;
    let (raw, converted) = read_integer(value)?;
    if converted {
        adjustments.push(PatchAdjustment {
            field,
            kind: AdjustmentKind::Coerced,
            detail: format!("converted {value} to {raw}"),
        });
    }

    let clamped = raw.clamp(i64::from(min), i64::from(max));
    if clamped != raw {
        adjustments.push(PatchAdjustment {
            field,
            kind: AdjustmentKind::Clamped,
            detail: format!("{raw} clamped to {clamped}"),
        });
    }
    u32::try_from(clamped).ok()
}

/// Returns the integer and whether a type conversion was needed.
fn read_integer(value: &Value) -> Option<(i64, bool)> {
    match value {
        Value::Number(number) => {
            if let Some(integer) = number.as_i64() {
                return Some((integer, false));
            }
            if let Some(unsigned) = number.as_u64() {
                return Some((i64::try_from(unsigned).unwrap_or(i64::MAX), false));
            }
            let float = number.as_f64().filter(|float| float.is_finite())?;
            Some((float.round() as i64, true))
        }
        Value::String(raw) => {
            let trimmed = raw.trim();
            if let Ok(integer) = trimmed.parse::<i64>() {
                return Some((integer, true));
            }
            let float = trimmed.parse::<f64>().ok().filter(|float| float.is_finite())?;
            Some((float.round() as i64, true))
        }
        _ => None,
    }
}

fn read_flag(
    field: SelectionField,
    value: &Value,
    adjustments: &mut Vec<PatchAdjustment>,
) -> Option<bool> {
    match value {
        Value::Bool(flag) => Some(*flag),
        Value::String(raw) => {
            let flag = match raw.trim().to_ascii_lowercase().as_str() {
                "true" => true,
                "false" => false,
                _ => return None,
            };
            adjustments.push(PatchAdjustment {
                field,
                kind: AdjustmentKind::Coerced,
                detail: format!("converted {value} to {flag}"),
            });
            Some(flag)
        }
        _ => None,
    }
}

fn read_cms_tier(
    field: SelectionField,
    value: &Value,
    adjustments: &mut Vec<PatchAdjustment>,
) -> Option<CmsTier> {
    match value {
        Value::String(raw) => CmsTier::from_wire(raw),
        Value::Number(number) => {
            let tier = CmsTier::from_wire(&number.as_u64()?.to_string())?;
            adjustments.push(PatchAdjustment {
                field,
                kind: AdjustmentKind::Coerced,
                detail: format!("converted {value} to \"{}\"", tier.wire_value()),
            });
            Some(tier)
        }
        _ => None,
    }
}

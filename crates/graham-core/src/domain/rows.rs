use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// A provider-supplied row: a free-text display name and ordered value points.
///
/// Deserialisation is lenient. Missing names and value lists become `None`
/// and empty, and amounts may arrive as numbers or numeric strings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FinancialRow {
    #[serde(default, deserialize_with = "lenient_name")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient_values")]
    pub values: Vec<ValuePoint>,
}

impl FinancialRow {
    pub fn new(name: impl Into<String>, amounts: impl IntoIterator<Item = f64>) -> Self {
        Self {
            name: Some(name.into()),
            values: amounts.into_iter().map(ValuePoint::new).collect(),
        }
    }

    /// Build a row from one loosely structured JSON value.
    pub fn from_value(value: &Value) -> Self {
        let Some(object) = value.as_object() else {
            return Self::default();
        };

        let name = object
            .get("name")
            .and_then(Value::as_str)
            .map(str::to_owned);
        let values = object
            .get("values")
            .and_then(Value::as_array)
            .map(|points| points.iter().map(ValuePoint::from_value).collect())
            .unwrap_or_default();

        Self { name, values }
    }

    /// The first value point's amount, if the row has one.
    pub fn first_amount(&self) -> Option<f64> {
        self.values.first().and_then(|point| point.amount)
    }
}

/// One value point of a [`FinancialRow`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ValuePoint {
    #[serde(default, deserialize_with = "lenient_amount")]
    pub amount: Option<f64>,
}

impl ValuePoint {
    pub const fn new(amount: f64) -> Self {
        Self {
            amount: Some(amount),
        }
    }

    fn from_value(value: &Value) -> Self {
        Self {
            amount: value.get("amount").and_then(amount_from_value),
        }
    }
}

fn amount_from_value(value: &Value) -> Option<f64> {
    let amount = match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().replace(',', "").parse::<f64>().ok(),
        _ => None,
    }?;
    amount.is_finite().then_some(amount)
}

fn lenient_name<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value.as_str().map(str::to_owned))
}

fn lenient_values<'de, D>(deserializer: D) -> Result<Vec<ValuePoint>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value
        .as_array()
        .map(|points| points.iter().map(ValuePoint::from_value).collect())
        .unwrap_or_default())
}

fn lenient_amount<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(amount_from_value(&value))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn parses_well_formed_row() {
        let row = FinancialRow::from_value(&json!({
            "name": "Earning Per Share (Rp)",
            "values": [{"amount": 123.4}, {"amount": 99.0}]
        }));

        assert_eq!(row.name.as_deref(), Some("Earning Per Share (Rp)"));
        assert_eq!(row.first_amount(), Some(123.4));
    }

    #[test]
    fn malformed_fields_degrade_to_empty() {
        let row = FinancialRow::from_value(&json!({"name": 7, "values": "n/a"}));
        assert_eq!(row, FinancialRow::default());

        let not_object = FinancialRow::from_value(&json!(["EPS"]));
        assert_eq!(not_object, FinancialRow::default());
    }

    #[test]
    fn string_amounts_are_accepted() {
        let row = FinancialRow::from_value(&json!({
            "name": "Market Cap",
            "values": [{"amount": "1,250,000.5"}]
        }));
        assert_eq!(row.first_amount(), Some(1_250_000.5));

        let junk = FinancialRow::from_value(&json!({
            "name": "Market Cap",
            "values": [{"amount": "-"}]
        }));
        assert_eq!(junk.first_amount(), None);
    }

    #[test]
    fn serde_path_matches_value_path() {
        let raw = json!({"name": "BVPS", "values": [{"amount": "4500"}, {}]});
        let via_serde: FinancialRow = serde_json::from_value(raw.clone()).expect("row");
        assert_eq!(via_serde, FinancialRow::from_value(&raw));
    }
}

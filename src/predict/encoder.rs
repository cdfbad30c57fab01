use crate::error::PredictError;
use serde::{Deserialize, Serialize};

/// Maps category strings to dense integer codes. Classes are kept sorted so a
/// value's code is its position in the vocabulary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelEncoder {
    pub field: String,
    pub classes: Vec<String>,
}

impl LabelEncoder {
    pub fn fit<'a>(field: &str, values: impl IntoIterator<Item = &'a str>) -> Self {
        let mut classes: Vec<String> = values.into_iter().map(str::to_string).collect();
        classes.sort();
        classes.dedup();
        Self {
            field: field.to_string(),
            classes,
        }
    }

    pub fn transform(&self, value: &str) -> Result<usize, PredictError> {
        self.classes
            .binary_search_by(|c| c.as_str().cmp(value))
            .map_err(|_| PredictError::UnknownCategory {
                field: self.field_name(),
                value: value.to_string(),
            })
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    fn field_name(&self) -> &'static str {
        match self.field.as_str() {
            "city" => "city",
            "region" => "region",
            "crop" => "crop",
            _ => "category",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_follow_sorted_vocabulary() {
        let enc = LabelEncoder::fit("city", ["Курск", "Азов", "Курск", "Воронеж"]);
        assert_eq!(enc.len(), 3);
        assert_eq!(enc.transform("Азов").unwrap(), 0);
        assert_eq!(enc.transform("Воронеж").unwrap(), 1);
        assert_eq!(enc.transform("Курск").unwrap(), 2);
    }

    #[test]
    fn unseen_value_is_unknown_category() {
        let enc = LabelEncoder::fit("region", ["Курская область"]);
        match enc.transform("Марс") {
            Err(PredictError::UnknownCategory { field, value }) => {
                assert_eq!(field, "region");
                assert_eq!(value, "Марс");
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}

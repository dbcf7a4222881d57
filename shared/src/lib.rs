use serde::{Deserialize, Serialize};
use std::time::Duration;
use strum::{
    AsRefStr, Display, EnumCount, EnumIter, EnumString, IntoEnumIterator, IntoStaticStr,
};

/// Vegetable classes in the order the model was trained on. The classifier
/// output is mapped onto this list by position, so the declaration order is
/// part of the model contract.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Display,
    AsRefStr,
    IntoStaticStr,
    EnumIter,
    EnumCount,
    EnumString,
)]
pub enum Vegetable {
    Bean,
    #[strum(serialize = "Bitter_Gourd")]
    BitterGourd,
    #[strum(serialize = "Bottle_Gourd")]
    BottleGourd,
    Brinjal,
    Broccoli,
    Cabbage,
    Capsicum,
    Carrot,
    Cauliflower,
    Cucumber,
    Papaya,
    Potato,
    Pumpkin,
    Radish,
    Tomato,
}

impl Vegetable {
    pub const COUNT: usize = <Self as EnumCount>::COUNT;

    pub fn from_index(index: usize) -> Option<Self> {
        Self::iter().nth(index)
    }

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn labels() -> Vec<&'static str> {
        Self::iter().map(|v| v.label()).collect()
    }

    pub fn label(self) -> &'static str {
        self.into()
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct IdentifyResponse {
    pub prediction: String,
    pub preprocessing_time: String,
    pub inference_time: String,
}

impl IdentifyResponse {
    pub fn new(prediction: Vegetable, preprocessing: Duration, inference: Duration) -> Self {
        Self {
            prediction: prediction.to_string(),
            preprocessing_time: format_seconds(preprocessing),
            inference_time: format_seconds(inference),
        }
    }
}

/// Error body returned by the service. A prediction that was computed before
/// a later step failed is kept alongside the error.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(flatten)]
    pub partial: Option<IdentifyResponse>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            partial: None,
        }
    }
}

pub fn format_seconds(duration: Duration) -> String {
    format!("{:.4} seconds", duration.as_secs_f64())
}

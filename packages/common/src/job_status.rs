#[cfg(feature = "sea-orm")]
use sea_orm::prelude::StringLen;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Where a survey job currently stands.
///
/// The set is fixed and carries no transition graph: any value may follow any
/// other. The string forms are stored verbatim and must keep their casing.
///
/// When the `sea-orm` feature is enabled, this enum can be used directly in SeaORM entities.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema,
)]
#[cfg_attr(
    feature = "sea-orm",
    derive(sea_orm::DeriveActiveEnum, sea_orm::EnumIter),
    sea_orm(rs_type = "String", db_type = "String(StringLen::None)")
)]
pub enum JobStatus {
    #[default]
    #[serde(rename = "On Hold/Pending")]
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "On Hold/Pending"))]
    OnHoldPending,
    #[serde(rename = "Needs Fieldwork")]
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "Needs Fieldwork"))]
    NeedsFieldwork,
    #[serde(rename = "Fieldwork Complete/Needs Office Work")]
    #[cfg_attr(
        feature = "sea-orm",
        sea_orm(string_value = "Fieldwork Complete/Needs Office Work")
    )]
    FieldworkComplete,
    #[serde(rename = "To Be Printed/Packaged")]
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "To Be Printed/Packaged"))]
    ToBePrinted,
    #[serde(rename = "Survey Complete/Invoice Sent/Unpaid")]
    #[cfg_attr(
        feature = "sea-orm",
        sea_orm(string_value = "Survey Complete/Invoice Sent/Unpaid")
    )]
    InvoiceSent,
    #[serde(rename = "Set/Flag Pins")]
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "Set/Flag Pins"))]
    SetFlagPins,
    #[serde(rename = "Completed/To Be Filed")]
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "Completed/To Be Filed"))]
    CompletedToBeFiled,
    #[serde(rename = "Ongoing Site Plan")]
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "Ongoing Site Plan"))]
    OngoingSitePlan,
}

impl JobStatus {
    /// All possible status values, in display order.
    pub const ALL: &'static [JobStatus] = &[
        Self::OnHoldPending,
        Self::NeedsFieldwork,
        Self::FieldworkComplete,
        Self::ToBePrinted,
        Self::InvoiceSent,
        Self::SetFlagPins,
        Self::CompletedToBeFiled,
        Self::OngoingSitePlan,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OnHoldPending => "On Hold/Pending",
            Self::NeedsFieldwork => "Needs Fieldwork",
            Self::FieldworkComplete => "Fieldwork Complete/Needs Office Work",
            Self::ToBePrinted => "To Be Printed/Packaged",
            Self::InvoiceSent => "Survey Complete/Invoice Sent/Unpaid",
            Self::SetFlagPins => "Set/Flag Pins",
            Self::CompletedToBeFiled => "Completed/To Be Filed",
            Self::OngoingSitePlan => "Ongoing Site Plan",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error when parsing an unknown job status string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseJobStatusError {
    invalid: String,
}

impl fmt::Display for ParseJobStatusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Invalid status '{}'. Valid values: {}",
            self.invalid,
            JobStatus::ALL
                .iter()
                .map(|s| s.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        )
    }
}

impl std::error::Error for ParseJobStatusError {}

impl FromStr for JobStatus {
    type Err = ParseJobStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        JobStatus::ALL
            .iter()
            .copied()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| ParseJobStatusError {
                invalid: s.to_string(),
            })
    }
}

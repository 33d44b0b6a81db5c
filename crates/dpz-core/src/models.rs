//! Pore-water-pressure generation models understood by DEEPSOIL.
//!
//! Each model writes the shared dissipation group first, then its own
//! required group. The first required key is always [`MODEL_KEY`], filled with
//! the model tag rather than a table cell.

use crate::domain::{DpzError, DpzResult};
use serde::Serialize;
use std::fmt::{Display, Formatter};

pub const MODEL_KEY: &str = "PWP_MODEL";

pub const DISSIPATION_PARAMETERS: [&str; 3] = ["RU", "CV", "CV_EXPONENT"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum PwpModel {
    VuceticDobry,
    GreenMitchellPolito,
    ParkAhn,
    BerrillDavis,
    Matasovic,
}

impl PwpModel {
    pub const ALL: [PwpModel; 5] = [
        Self::VuceticDobry,
        Self::GreenMitchellPolito,
        Self::ParkAhn,
        Self::BerrillDavis,
        Self::Matasovic,
    ];

    pub const fn code(self) -> &'static str {
        match self {
            Self::VuceticDobry => "sand-Vucetic-Dobry",
            Self::GreenMitchellPolito => "sand-Green-Mitchell-Polito",
            Self::ParkAhn => "sand-Park-Ahn",
            Self::BerrillDavis => "sand-Berrill-Davis",
            Self::Matasovic => "clay-Matasovic",
        }
    }

    /// Short selector used by older parameter tables.
    pub const fn short_code(self) -> &'static str {
        match self {
            Self::VuceticDobry => "S_VD",
            Self::GreenMitchellPolito => "S_GMP",
            Self::ParkAhn => "S_PA",
            Self::BerrillDavis => "S_BD",
            Self::Matasovic => "C_M",
        }
    }

    pub const fn tag(self) -> &'static str {
        match self {
            Self::VuceticDobry => "VD",
            Self::GreenMitchellPolito => "GMP",
            Self::ParkAhn => "PA",
            Self::BerrillDavis => "BD",
            Self::Matasovic => "MATASOVIC",
        }
    }

    pub const fn required_parameters(self) -> &'static [&'static str] {
        match self {
            Self::VuceticDobry => &[
                MODEL_KEY, "PWP_F1", "PWP_P", "PWP_F2", "PWP_S", "PWP_G", "PWP_V",
            ],
            Self::GreenMitchellPolito => &[MODEL_KEY, "PEC", "PWP_G"],
            Self::ParkAhn => &[MODEL_KEY, "PA_ALPHA", "PA_BETA", "PA_DTH"],
            Self::BerrillDavis => &[MODEL_KEY, "BD_ALPHA", "BD_BETA"],
            Self::Matasovic => &[
                MODEL_KEY, "PWP_S", "PWP_R", "PWP_A", "PWP_B", "PWP_C", "PWP_D", "PWP_G",
            ],
        }
    }

    /// Keys of the inserted parameter line, in write order.
    pub fn parameter_keys(self) -> impl Iterator<Item = &'static str> {
        DISSIPATION_PARAMETERS
            .iter()
            .copied()
            .chain(self.required_parameters().iter().copied())
    }

    pub fn from_code(code: &str) -> DpzResult<Self> {
        let normalized = code.trim();
        Self::ALL
            .into_iter()
            .find(|model| {
                model.code().eq_ignore_ascii_case(normalized)
                    || model.short_code().eq_ignore_ascii_case(normalized)
            })
            .ok_or_else(|| {
                DpzError::unknown_model(
                    "MODEL.UNKNOWN",
                    format!(
                        "unknown PWP model '{}'; expected one of {}",
                        normalized,
                        Self::ALL.map(Self::code).join(", ")
                    ),
                )
            })
    }
}

impl Display for PwpModel {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

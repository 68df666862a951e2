use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::{Idempotent, Weight};
use crate::errors::HgError;

/// Boolean semiring: `plus` is `or`, `times` is `and`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BooleanWeight(pub bool);

impl Weight for BooleanWeight {
    const NAME: &'static str = "boolean";

    fn zero() -> Self {
        BooleanWeight(false)
    }

    fn one() -> Self {
        BooleanWeight(true)
    }

    fn plus(&self, other: &Self) -> Self {
        BooleanWeight(self.0 || other.0)
    }

    fn times(&self, other: &Self) -> Self {
        BooleanWeight(self.0 && other.0)
    }

    fn is_zero(&self) -> bool {
        !self.0
    }

    fn is_one(&self) -> bool {
        self.0
    }
}

impl Idempotent for BooleanWeight {
    fn is_better(&self, other: &Self) -> bool {
        self.0 && !other.0
    }
}

impl fmt::Display for BooleanWeight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(if self.0 { "1" } else { "0" })
    }
}

impl FromStr for BooleanWeight {
    type Err = HgError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "1" | "true" => Ok(BooleanWeight(true)),
            "0" | "false" => Ok(BooleanWeight(false)),
            other => Err(HgError::file_format(
                "invalid-weight",
                "boolean weights are written 0, 1, true or false",
            )
            .with_context("text", other)),
        }
    }
}

//! Lab findings and the release rule.
//!
//! The ledger does not analyse samples. It receives typing and screening
//! results as immutable facts and decides what they mean for the unit:
//!
//! - any screening `Failed` or `Indeterminate` → quarantine
//! - otherwise, every result `Passed` and at least one screening → release
//! - otherwise → keep testing
//!
//! Conflicting typing results are reported as [`DataQualityWarning`]s and
//! never change the verdict.

use crate::types::Provenance;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Outcome recorded on a single lab finding.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResultStatus {
    /// Not yet resulted
    Pending,
    /// Acceptable
    Passed,
    /// Reactive or otherwise unacceptable
    Failed,
    /// Resulted, but inconclusive
    Indeterminate,
}

impl ResultStatus {
    /// Whether this status blocks release outright.
    #[must_use]
    pub const fn is_disqualifying(self) -> bool {
        matches!(self, Self::Failed | Self::Indeterminate)
    }
}

/// ABO group.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AboGroup {
    /// Group A
    A,
    /// Group B
    B,
    /// Group AB
    AB,
    /// Group O
    O,
}

/// Rh(D) factor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RhFactor {
    /// Rh(D) positive
    Positive,
    /// Rh(D) negative
    Negative,
}

/// ABO/Rh blood type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BloodType {
    /// ABO group
    pub abo: AboGroup,
    /// Rh factor
    pub rh: RhFactor,
}

impl BloodType {
    /// Creates a blood type
    #[must_use]
    pub const fn new(abo: AboGroup, rh: RhFactor) -> Self {
        Self { abo, rh }
    }
}

impl fmt::Display for BloodType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let abo = match self.abo {
            AboGroup::A => "A",
            AboGroup::B => "B",
            AboGroup::AB => "AB",
            AboGroup::O => "O",
        };
        let rh = match self.rh {
            RhFactor::Positive => '+',
            RhFactor::Negative => '-',
        };
        write!(f, "{abo}{rh}")
    }
}

/// ABO/Rh determination for a unit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypingResult {
    /// Method used (e.g. "forward-grouping", "gel-card")
    pub method: String,
    /// Reported blood type
    pub blood_type: BloodType,
    /// Result status
    pub status: ResultStatus,
    /// Who produced it, where and when
    pub provenance: Provenance,
}

impl TypingResult {
    /// Creates a typing result
    #[must_use]
    pub fn new(
        method: impl Into<String>,
        blood_type: BloodType,
        status: ResultStatus,
        provenance: Provenance,
    ) -> Self {
        Self {
            method: method.into(),
            blood_type,
            status,
            provenance,
        }
    }
}

/// Error returned for an empty test code.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Test code cannot be empty")]
pub struct EmptyTestCodeError;

/// Infectious-disease test code, e.g. `HBsAg` or `HIV`.
///
/// Codes compare case-insensitively, so `hiv` and `HIV` are the same test.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TestCode(String);

impl TestCode {
    /// Creates a test code, trimming surrounding whitespace.
    ///
    /// # Errors
    ///
    /// Returns [`EmptyTestCodeError`] if nothing is left after trimming.
    pub fn new(code: impl AsRef<str>) -> Result<Self, EmptyTestCodeError> {
        let code = code.as_ref().trim();
        if code.is_empty() {
            return Err(EmptyTestCodeError);
        }
        Ok(Self(code.to_string()))
    }

    /// The code as entered.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl PartialEq for TestCode {
    fn eq(&self, other: &Self) -> bool {
        self.0.eq_ignore_ascii_case(&other.0)
    }
}

impl Eq for TestCode {}

impl fmt::Display for TestCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for TestCode {
    type Err = EmptyTestCodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// Infectious-disease screening outcome for a unit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreeningResult {
    /// Which test
    pub test_code: TestCode,
    /// Result status
    pub status: ResultStatus,
    /// Who produced it, where and when
    pub provenance: Provenance,
}

impl ScreeningResult {
    /// Creates a screening result
    #[must_use]
    pub const fn new(test_code: TestCode, status: ResultStatus, provenance: Provenance) -> Self {
        Self {
            test_code,
            status,
            provenance,
        }
    }
}

/// Release criteria on top of the fixed quarantine/release rule.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleasePolicy {
    /// Require at least one typing result before release.
    pub require_typing: bool,
}

/// Data-quality finding surfaced to the caller alongside an evaluation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataQualityWarning {
    /// Typing results disagree on the unit's blood type.
    ConflictingTyping {
        /// Distinct blood types reported, sorted
        reported: Vec<BloodType>,
    },
}

impl fmt::Display for DataQualityWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConflictingTyping { reported } => {
                let types: Vec<String> = reported.iter().map(ToString::to_string).collect();
                write!(f, "conflicting typing results: {}", types.join(", "))
            },
        }
    }
}

/// What the attached results say about the unit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Verdict {
    /// Every result passed; release the unit.
    Release,
    /// At least one screening failed or was indeterminate.
    Quarantine {
        /// Screening tests that disqualified the unit
        failing: Vec<TestCode>,
    },
    /// Not enough passing results yet.
    Pending,
}

/// Verdict plus any data-quality warnings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Evaluation {
    /// The verdict
    pub verdict: Verdict,
    /// Non-blocking findings
    pub warnings: Vec<DataQualityWarning>,
}

/// Lab results attached to one unit.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabResults {
    /// Typing results, in the order recorded
    pub typing: Vec<TypingResult>,
    /// Screening results, in the order recorded; at most one per test code
    pub screening: Vec<ScreeningResult>,
}

impl LabResults {
    /// Whether a screening result for `code` is already attached.
    #[must_use]
    pub fn has_screening(&self, code: &TestCode) -> bool {
        self.screening.iter().any(|r| &r.test_code == code)
    }

    /// Whether nothing has been attached yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.typing.is_empty() && self.screening.is_empty()
    }

    /// Apply the release rule.
    #[must_use]
    pub fn evaluate(&self, policy: ReleasePolicy) -> Evaluation {
        Evaluation {
            verdict: self.verdict(policy),
            warnings: self.warnings(),
        }
    }

    fn verdict(&self, policy: ReleasePolicy) -> Verdict {
        let failing: Vec<TestCode> = self
            .screening
            .iter()
            .filter(|r| r.status.is_disqualifying())
            .map(|r| r.test_code.clone())
            .collect();
        if !failing.is_empty() {
            return Verdict::Quarantine { failing };
        }

        // Screening is mandatory; typing only when the policy says so.
        if self.screening.is_empty() || (policy.require_typing && self.typing.is_empty()) {
            return Verdict::Pending;
        }

        let all_passed = self
            .typing
            .iter()
            .map(|r| r.status)
            .chain(self.screening.iter().map(|r| r.status))
            .all(|s| s == ResultStatus::Passed);

        if all_passed { Verdict::Release } else { Verdict::Pending }
    }

    fn warnings(&self) -> Vec<DataQualityWarning> {
        let mut reported: Vec<BloodType> = self.typing.iter().map(|r| r.blood_type).collect();
        reported.sort_unstable();
        reported.dedup();

        if reported.len() > 1 {
            vec![DataQualityWarning::ConflictingTyping { reported }]
        } else {
            Vec::new()
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::types::{FacilityId, StaffId};
    use chrono::Utc;

    fn provenance() -> Provenance {
        Provenance::new(FacilityId::new(), StaffId::new(), Utc::now())
    }

    fn screen(code: &str, status: ResultStatus) -> ScreeningResult {
        ScreeningResult::new(TestCode::new(code).unwrap(), status, provenance())
    }

    fn typing(blood_type: BloodType, status: ResultStatus) -> TypingResult {
        TypingResult::new("gel-card", blood_type, status, provenance())
    }

    const O_NEG: BloodType = BloodType::new(AboGroup::O, RhFactor::Negative);
    const A_POS: BloodType = BloodType::new(AboGroup::A, RhFactor::Positive);

    #[test]
    fn no_results_is_pending() {
        let results = LabResults::default();
        assert_eq!(results.evaluate(ReleasePolicy::default()).verdict, Verdict::Pending);
    }

    #[test]
    fn passing_typing_without_screening_does_not_release() {
        let results = LabResults {
            typing: vec![typing(O_NEG, ResultStatus::Passed)],
            screening: vec![],
        };
        assert_eq!(results.evaluate(ReleasePolicy::default()).verdict, Verdict::Pending);
    }

    #[test]
    fn passing_screening_releases_without_typing_by_default() {
        let results = LabResults {
            typing: vec![],
            screening: vec![screen("HBsAg", ResultStatus::Passed), screen("HIV", ResultStatus::Passed)],
        };
        assert_eq!(results.evaluate(ReleasePolicy::default()).verdict, Verdict::Release);

        let strict = ReleasePolicy { require_typing: true };
        assert_eq!(results.evaluate(strict).verdict, Verdict::Pending);
    }

    #[test]
    fn failed_or_indeterminate_screen_quarantines() {
        let results = LabResults {
            typing: vec![typing(O_NEG, ResultStatus::Passed)],
            screening: vec![
                screen("HBsAg", ResultStatus::Failed),
                screen("HIV", ResultStatus::Passed),
                screen("HCV", ResultStatus::Indeterminate),
            ],
        };

        let Verdict::Quarantine { failing } = results.evaluate(ReleasePolicy::default()).verdict else {
            panic!("expected quarantine");
        };
        let codes: Vec<_> = failing.iter().map(TestCode::as_str).collect();
        assert_eq!(codes, vec!["HBsAg", "HCV"]);
    }

    #[test]
    fn pending_result_blocks_release() {
        let results = LabResults {
            typing: vec![typing(O_NEG, ResultStatus::Pending)],
            screening: vec![screen("HIV", ResultStatus::Passed)],
        };
        assert_eq!(results.evaluate(ReleasePolicy::default()).verdict, Verdict::Pending);
    }

    #[test]
    fn failed_typing_blocks_release_but_does_not_quarantine() {
        let results = LabResults {
            typing: vec![typing(O_NEG, ResultStatus::Failed)],
            screening: vec![screen("HIV", ResultStatus::Passed)],
        };
        assert_eq!(results.evaluate(ReleasePolicy::default()).verdict, Verdict::Pending);
    }

    #[test]
    fn conflicting_typing_warns_but_still_releases() {
        let results = LabResults {
            typing: vec![typing(O_NEG, ResultStatus::Passed), typing(A_POS, ResultStatus::Passed)],
            screening: vec![screen("HIV", ResultStatus::Passed)],
        };

        let evaluation = results.evaluate(ReleasePolicy::default());
        assert_eq!(evaluation.verdict, Verdict::Release);
        assert_eq!(
            evaluation.warnings,
            vec![DataQualityWarning::ConflictingTyping {
                reported: vec![A_POS, O_NEG],
            }]
        );
        assert!(evaluation.warnings[0].to_string().contains("O-"));
    }

    #[test]
    fn test_codes_compare_case_insensitively() {
        let results = LabResults {
            typing: vec![],
            screening: vec![screen("HIV", ResultStatus::Passed)],
        };
        assert!(results.has_screening(&TestCode::new("hiv").unwrap()));
        assert!(!results.has_screening(&TestCode::new("HCV").unwrap()));
    }

    #[test]
    fn blank_test_code_is_rejected() {
        assert_eq!(TestCode::new("  "), Err(EmptyTestCodeError));
        assert_eq!("HBsAg".parse::<TestCode>().unwrap().as_str(), "HBsAg");
    }
}

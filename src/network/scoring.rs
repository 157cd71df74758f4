use std::sync::Arc;

use crate::error::Result;
use crate::math::matrix::Matrix;

/// Outcome of scoring one `(output, target)` pair.
///
/// Predicates either answer pass/fail directly or report a number. A number
/// counts as correct when it is truthy: anything other than zero or NaN.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Score {
    Pass(bool),
    Error(f64),
}

impl Score {
    pub fn is_correct(&self) -> bool {
        match *self {
            Score::Pass(pass) => pass,
            Score::Error(error) => error != 0.0 && !error.is_nan(),
        }
    }
}

impl From<bool> for Score {
    fn from(pass: bool) -> Self {
        Score::Pass(pass)
    }
}

impl From<f64> for Score {
    fn from(error: f64) -> Self {
        Score::Error(error)
    }
}

/// Scoring predicate shared by training-accuracy tracking and `Network::test`.
/// Behavioral, so never persisted with the network.
pub type ScoreFn = Arc<dyn Fn(&Matrix, &Matrix) -> Result<Score> + Send + Sync>;

/// Rounds outputs to the nearest integer and compares them to the target.
pub fn rounded_equals() -> ScoreFn {
    Arc::new(|output: &Matrix, target: &Matrix| Ok(Score::Pass(output.round().equals(target)?)))
}

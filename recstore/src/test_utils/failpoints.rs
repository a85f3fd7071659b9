use fail::FailScenario;

use crate::error::ErrorKind;
use crate::failpoints::{ALL_FAILPOINTS, failpoint_argument};

/// Client failpoints that stay active for as long as the scenario is alive.
///
/// ```ignore
/// let scenario = StoreFailScenario::setup()
///     .fail_with(PUT_RECORD__BEFORE_WRITE, ErrorKind::ConnectionFailed)
///     .fail(CREATE_INDEX__BEFORE_CREATE);
/// ```
///
/// Dropping it turns every failpoint it activated back off.
pub struct StoreFailScenario<'a> {
    _scenario: FailScenario<'a>,
    active: Vec<&'static str>,
}

impl<'a> StoreFailScenario<'a> {
    pub fn setup() -> StoreFailScenario<'a> {
        Self {
            _scenario: FailScenario::setup(),
            active: Vec::new(),
        }
    }

    /// Makes `failpoint` fail with the kind the client uses by default at that point.
    pub fn fail(self, failpoint: &'static str) -> Self {
        self.activate(failpoint, "return".to_string())
    }

    /// Makes `failpoint` fail with `kind`.
    ///
    /// Panics when `kind` cannot be injected through a failpoint.
    pub fn fail_with(self, failpoint: &'static str, kind: ErrorKind) -> Self {
        let Some(argument) = failpoint_argument(kind) else {
            panic!("{kind:?} cannot be injected through a failpoint");
        };

        self.activate(failpoint, format!("return({argument})"))
    }

    pub fn teardown(self) {
        drop(self);
    }

    fn activate(mut self, failpoint: &'static str, action: String) -> Self {
        assert!(
            ALL_FAILPOINTS.contains(&failpoint),
            "`{failpoint}` is not a record store failpoint"
        );

        fail::cfg(failpoint, &action).unwrap();
        self.active.push(failpoint);

        self
    }
}

impl Drop for StoreFailScenario<'_> {
    fn drop(&mut self) {
        for failpoint in self.active.iter() {
            fail::cfg(*failpoint, "off").unwrap()
        }
    }
}

//! Named failpoints checked by [`crate::client::RecordStoreClient`] before every store call.
//!
//! They are inert unless the `failpoints` feature is enabled and a failpoint is configured
//! through the `fail` crate. The optional failpoint argument selects the error kind, see
//! [`failpoint_argument`].

use fail::fail_point;

#[cfg(feature = "failpoints")]
use crate::bail;
use crate::error::{ErrorKind, StoreResult};

pub const CREATE_INDEX__BEFORE_CREATE: &str = "create_index.before_create";
pub const PUT_RECORD__BEFORE_WRITE: &str = "put_record.before_write";
pub const GET_BY_KEY__BEFORE_READ: &str = "get_by_key.before_read";
pub const GET_BY_INDEXED_FIELD__BEFORE_QUERY: &str = "get_by_indexed_field.before_query";

/// Every failpoint the client checks.
pub const ALL_FAILPOINTS: &[&str] = &[
    CREATE_INDEX__BEFORE_CREATE,
    PUT_RECORD__BEFORE_WRITE,
    GET_BY_KEY__BEFORE_READ,
    GET_BY_INDEXED_FIELD__BEFORE_QUERY,
];

/// Failpoint arguments and the error kind each one injects.
const KIND_ARGUMENTS: &[(&str, ErrorKind)] = &[
    ("connection", ErrorKind::ConnectionFailed),
    ("write", ErrorKind::WriteFailed),
    ("query", ErrorKind::QueryFailed),
    ("not_found", ErrorKind::RecordNotFound),
    ("index_exists", ErrorKind::IndexAlreadyExists),
];

/// Returns an error when the failpoint `name` is active.
///
/// `default_kind` is used when the failpoint carries no argument or an unknown one.
#[cfg_attr(not(feature = "failpoints"), allow(unused_variables))]
pub fn store_fail_point(name: &str, default_kind: ErrorKind) -> StoreResult<()> {
    fail_point!(name, |argument| {
        let kind = argument
            .as_deref()
            .and_then(kind_from_argument)
            .unwrap_or(default_kind);

        bail!(
            kind,
            "an error occurred in a fail point",
            format!("the failpoint '{name}' returned an error")
        );
    });

    Ok(())
}

/// Returns the failpoint argument injecting `kind`, if `kind` can be injected.
pub fn failpoint_argument(kind: ErrorKind) -> Option<&'static str> {
    KIND_ARGUMENTS
        .iter()
        .find(|(_, candidate)| *candidate == kind)
        .map(|(argument, _)| *argument)
}

#[cfg_attr(not(feature = "failpoints"), allow(dead_code))]
fn kind_from_argument(argument: &str) -> Option<ErrorKind> {
    KIND_ARGUMENTS
        .iter()
        .find(|(candidate, _)| *candidate == argument)
        .map(|(_, kind)| *kind)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_argument_maps_back_to_its_kind() {
        for (argument, kind) in KIND_ARGUMENTS {
            assert_eq!(failpoint_argument(*kind), Some(*argument));
            assert_eq!(kind_from_argument(argument), Some(*kind));
        }

        assert_eq!(failpoint_argument(ErrorKind::InvalidKey), None);
        assert_eq!(kind_from_argument("unknown"), None);
    }
}
